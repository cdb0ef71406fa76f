//! Registration listener
//!
//! Robot code connects to the registration port to say "my NetworkTables
//! server is here". The proxy then (re)points the NT tunnel at the caller
//! and answers `0`, or `!: <reason>` if the tunnel could not be started.

use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task;
use tracing::{error, info, warn};

use crate::state::Shared;
use crate::tunnels::{TunnelId, TunnelManager, TunnelSpec};

/// Success answer, sent without a trailing newline.
pub const ACCEPTED: &[u8] = b"0";

pub struct RegistrationServer {
    tunnels: Shared<TunnelManager>,
    nt_port: u16,
    nt_tunnel: Option<TunnelId>,
}

impl RegistrationServer {
    pub fn new(tunnels: Shared<TunnelManager>, nt_port: u16) -> Self {
        Self {
            tunnels,
            nt_port,
            nt_tunnel: None,
        }
    }

    /// Current NT tunnel, if a robot has registered.
    pub fn nt_tunnel(&self) -> Option<&TunnelId> {
        self.nt_tunnel.as_ref()
    }

    /// Swaps the NT tunnel over to `ip` and builds the answer for the robot.
    pub fn register_peer(&mut self, ip: IpAddr) -> Vec<u8> {
        let (response, tunnel) = swap_nt_tunnel(&self.tunnels, self.nt_tunnel.take(), ip, self.nt_port);
        self.nt_tunnel = tunnel;
        response
    }

    /// [`register_peer`](Self::register_peer) on the blocking pool: stopping
    /// the previous tunnel can take the whole SIGTERM grace period.
    pub async fn answer(&mut self, ip: IpAddr) -> Vec<u8> {
        let tunnels = self.tunnels.clone();
        let previous = self.nt_tunnel.take();
        let nt_port = self.nt_port;

        match task::spawn_blocking(move || swap_nt_tunnel(&tunnels, previous, ip, nt_port)).await {
            Ok((response, tunnel)) => {
                self.nt_tunnel = tunnel;
                response
            }
            Err(e) => {
                error!("NT tunnel swap did not complete: {}", e);
                format!("!: {}\n", e).into_bytes()
            }
        }
    }

    /// Serves one registration; the connection is closed afterwards.
    pub async fn handle(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        let response = self.answer(peer.ip()).await;
        if let Err(e) = stream.write_all(&response).await {
            warn!("could not answer {}: {}", peer, e);
            return;
        }
        if let Err(e) = stream.shutdown().await {
            warn!("could not close connection from {}: {}", peer, e);
        }
    }

    /// Accepts registrations one at a time until `shutdown` completes.
    pub async fn run<F>(mut self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("waiting for registrations on {}", listener.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("registration listener shutting down");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.handle(stream, peer).await,
                    Err(e) => {
                        error!("accept failed: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Stops `previous` (if any) and starts the NT tunnel to `ip`.
/// Returns the answer for the robot and the new tunnel id.
fn swap_nt_tunnel(
    tunnels: &Shared<TunnelManager>,
    previous: Option<TunnelId>,
    ip: IpAddr,
    nt_port: u16,
) -> (Vec<u8>, Option<TunnelId>) {
    info!("registering NetworkTables server located at {}", ip);
    let mut tunnels = tunnels.lock();

    if let Some(previous) = previous {
        info!("stopping the previous NT tunnel...");
        if let Err(e) = tunnels.stop(&previous) {
            warn!("failed to stop the previous NT tunnel: {}", e);
        }
    }

    match tunnels.start(TunnelSpec::to_peer(nt_port, ip, nt_port)) {
        Ok(id) => (ACCEPTED.to_vec(), Some(id)),
        Err(e) => {
            error!("Failed to start the network tables tunnel: {}", e);
            (format!("!: {}\n", e).into_bytes(), None)
        }
    }
}
