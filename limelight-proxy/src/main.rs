//! Entry point: load config, check socat, open camera tunnels, then serve
//! registrations until Ctrl-C.

use anyhow::{Context, Result};
use limelight_proxy::config::load_config;
use limelight_proxy::state::new_state;
use limelight_proxy::{RegistrationServer, SocatLauncher, TunnelManager};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // .env is optional

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await;

    let launcher = SocatLauncher::locate(&cfg).context("socat is required")?;
    launcher.check().context("socat self-check failed")?;
    info!("using {}", launcher.binary().display());

    let mut manager = TunnelManager::new(launcher);
    manager
        .start_camera_tunnels(&cfg)
        .context("Failed to open tunnels into the Limelight")?;
    let tunnels = new_state(manager);

    let listener = TcpListener::bind(cfg.registration_addr())
        .await
        .with_context(|| format!("cannot listen on {}", cfg.registration_addr()))?;

    let server = RegistrationServer::new(tunnels.clone(), cfg.nt_tunnel_port);
    server
        .run(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("cannot listen for Ctrl-C ({}), running until killed", e);
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("registration listener failed")?;

    tunnels.lock().stop_all();
    Ok(())
}
