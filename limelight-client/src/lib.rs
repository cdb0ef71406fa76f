//! Limelight client - robot side of the Limelight proxy bridge
//!
//! The robot simulator cannot reach the Limelight camera directly: a proxy on
//! the Raspberry Pi forwards the camera's NetworkTables traffic, but it first
//! needs to learn where our NetworkTables server lives. This crate provides:
//! - the one-shot registration handshake with that proxy (port 5899)
//! - read access to the `tx` / `ty` / `ta` targeting values once they flow
//! - the `Limelight` facade doing both at construction time

pub mod config;
pub mod error;
pub mod limelight;
pub mod registration;
pub mod telemetry;

pub use config::{RegistrationConfig, DEFAULT_HOST, HOST_ENV_VAR, REGISTRATION_PORT};
pub use error::RegistrationError;
pub use limelight::Limelight;
pub use registration::{HandshakeOutcome, RegistrationClient};
pub use telemetry::{MemoryTable, TelemetryReader, TelemetryTable, LIMELIGHT_TABLE};
