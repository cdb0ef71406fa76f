//! Targeting values published by the Limelight
//!
//! The camera publishes into the `limelight` NetworkTables table; the table
//! itself is owned elsewhere. This module only reads three entries from it,
//! through the [`TelemetryTable`] trait, so any store can sit behind it.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the table the camera publishes into.
pub const LIMELIGHT_TABLE: &str = "limelight";

/// Horizontal offset from crosshair to target (degrees).
pub const KEY_TX: &str = "tx";
/// Vertical offset from crosshair to target (degrees).
pub const KEY_TY: &str = "ty";
/// Target area (percent of image).
pub const KEY_TA: &str = "ta";

/// Read-only view of a key/value telemetry store.
pub trait TelemetryTable {
    /// Current value under `key`, `None` if it was never published.
    fn get(&self, key: &str) -> Option<f64>;
}

impl<T: TelemetryTable + ?Sized> TelemetryTable for &T {
    fn get(&self, key: &str) -> Option<f64> {
        (**self).get(key)
    }
}

impl<T: TelemetryTable + ?Sized> TelemetryTable for Arc<T> {
    fn get(&self, key: &str) -> Option<f64> {
        (**self).get(key)
    }
}

impl<T: TelemetryTable + ?Sized> TelemetryTable for Box<T> {
    fn get(&self, key: &str) -> Option<f64> {
        (**self).get(key)
    }
}

impl TelemetryTable for HashMap<String, f64> {
    fn get(&self, key: &str) -> Option<f64> {
        HashMap::get(self, key).copied()
    }
}

/// In-process table. Clones share the same entries, so one handle can
/// publish while another reads.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    entries: Arc<RwLock<HashMap<String, f64>>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, key: &str, value: f64) {
        self.entries.write().insert(key.to_string(), value);
    }

    pub fn remove(&self, key: &str) -> Option<f64> {
        self.entries.write().remove(key)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl TelemetryTable for MemoryTable {
    fn get(&self, key: &str) -> Option<f64> {
        self.entries.read().get(key).copied()
    }
}

/// `tx` / `ty` / `ta` accessors. Every call re-reads the table; missing
/// entries read as NaN.
#[derive(Debug, Clone)]
pub struct TelemetryReader<T> {
    table: T,
}

impl<T: TelemetryTable> TelemetryReader<T> {
    pub fn new(table: T) -> Self {
        Self { table }
    }

    pub fn x(&self) -> f64 {
        self.read(KEY_TX)
    }

    pub fn y(&self) -> f64 {
        self.read(KEY_TY)
    }

    pub fn area(&self) -> f64 {
        self.read(KEY_TA)
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    fn read(&self, key: &str) -> f64 {
        self.table.get(key).unwrap_or(f64::NAN)
    }
}
