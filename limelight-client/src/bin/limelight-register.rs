//! Registers this machine's NetworkTables server with the Limelight proxy.
//!
//! Usage: `limelight-register [host]` - the host defaults to `$HALSIMWS_HOST`.
//! Exits with status 1 when the proxy did not accept the registration.

use anyhow::Result;
use limelight_client::{HandshakeOutcome, RegistrationClient, RegistrationConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(host) => RegistrationConfig::new(host),
        None => RegistrationConfig::from_env(),
    };
    info!("Registering with Limelight proxy at {}", config);

    match RegistrationClient::new(config).register() {
        HandshakeOutcome::Registered => Ok(()),
        _ => std::process::exit(1),
    }
}
