use tracing::warn;

use crate::config::RegistrationConfig;
use crate::registration::{HandshakeOutcome, RegistrationClient};
use crate::telemetry::{TelemetryReader, TelemetryTable};

/// Limelight camera seen through the Pi proxy.
///
/// Construction registers with the proxy once, then gives access to the
/// targeting values. A failed registration only leaves a log line and a
/// non-`Registered` [`registration`](Self::registration); the accessors keep
/// returning NaN until something publishes into the table.
#[derive(Debug)]
pub struct Limelight<T> {
    reader: TelemetryReader<T>,
    registration: HandshakeOutcome,
}

impl<T: TelemetryTable> Limelight<T> {
    pub fn new(config: RegistrationConfig, table: T) -> Self {
        let registration = RegistrationClient::new(config).register();
        if !registration.is_registered() {
            warn!("Limelight telemetry will stay empty until the proxy forwards NetworkTables traffic");
        }
        Self {
            reader: TelemetryReader::new(table),
            registration,
        }
    }

    /// Registers with the proxy named by `HALSIMWS_HOST`.
    pub fn from_env(table: T) -> Self {
        Self::new(RegistrationConfig::from_env(), table)
    }

    pub fn registration(&self) -> &HandshakeOutcome {
        &self.registration
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_registered()
    }

    pub fn x(&self) -> f64 {
        self.reader.x()
    }

    pub fn y(&self) -> f64 {
        self.reader.y()
    }

    pub fn area(&self) -> f64 {
        self.reader.area()
    }

    pub fn reader(&self) -> &TelemetryReader<T> {
        &self.reader
    }
}
