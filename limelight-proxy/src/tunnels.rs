/*!
 * TUNNELS - socat process supervision
 *
 * Each tunnel is one `socat tcp-listen:<port>,fork,reuseaddr tcp:<target>`
 * child. The manager keeps track of them so the NT tunnel can be swapped
 * when a new robot registers, and so nothing outlives the proxy.
 *
 * Launching goes through `TunnelLauncher` so tests can run without socat.
 */

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ProxyConfig;

/// Where socat usually lives on a Romi Pi image.
pub const SOCAT_CANDIDATES: &[&str] = &["/usr/bin/socat", "/home/pi/socat"];

/// How long a tunnel gets after SIGTERM before it is killed outright.
pub const STOP_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("Tunnel not found: {0}")]
    NotFound(String),
    #[error("cannot find socat in {0}, try running: sudo apt-get install socat")]
    SocatMissing(String),
    #[error("socat is not found or not allowed to execute ({0}), try running: sudo apt-get install socat")]
    SocatBroken(String),
    #[error("Failed to start tunnel {spec}: {source}")]
    StartFailed {
        spec: String,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type TunnelId = String;

/// Listen locally on `listen_port`, forward every connection to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSpec {
    pub listen_port: u16,
    pub target: String,
}

impl TunnelSpec {
    pub fn new(listen_port: u16, target: impl Into<String>) -> Self {
        Self {
            listen_port,
            target: target.into(),
        }
    }

    /// Tunnel to `ip:port` (IPv6 addresses get bracketed).
    pub fn to_peer(listen_port: u16, ip: IpAddr, port: u16) -> Self {
        Self::new(listen_port, SocketAddr::new(ip, port).to_string())
    }

    pub fn socat_args(&self) -> [String; 2] {
        [
            format!("tcp-listen:{},fork,reuseaddr", self.listen_port),
            format!("tcp:{}", self.target),
        ]
    }
}

impl std::fmt::Display for TunnelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.listen_port, self.target)
    }
}

/// A started tunnel process.
pub trait RunningTunnel: Send {
    /// Stops the tunnel and waits for it to exit.
    fn terminate(&mut self) -> Result<(), TunnelError>;
}

pub trait TunnelLauncher: Send {
    fn launch(&self, spec: &TunnelSpec) -> Result<Box<dyn RunningTunnel>, TunnelError>;
}

/// Launches tunnels as socat children.
#[derive(Debug, Clone)]
pub struct SocatLauncher {
    binary: PathBuf,
    grace: Duration,
}

impl SocatLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            grace: STOP_GRACE,
        }
    }

    /// Overrides the SIGTERM grace period used when stopping tunnels.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Uses the configured binary, or the first existing candidate.
    pub fn locate(cfg: &ProxyConfig) -> Result<Self, TunnelError> {
        if let Some(path) = &cfg.socat {
            return Ok(Self::new(path));
        }
        SOCAT_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Self::new)
            .ok_or_else(|| TunnelError::SocatMissing(SOCAT_CANDIDATES.join(" or ")))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Runs `socat -V`; the binary must exist and exit successfully.
    pub fn check(&self) -> Result<(), TunnelError> {
        let status = Command::new(&self.binary)
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| TunnelError::SocatBroken(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(TunnelError::SocatBroken(status.to_string()))
        }
    }

    pub fn command_line(&self, spec: &TunnelSpec) -> String {
        let [listen, target] = spec.socat_args();
        format!("{} {} {}", self.binary.display(), listen, target)
    }
}

struct ChildTunnel {
    child: Child,
    grace: Duration,
}

impl ChildTunnel {
    fn new(child: Child, grace: Duration) -> Self {
        Self { child, grace }
    }

    /// SIGTERM lets socat take down the children it forked per connection.
    #[cfg(unix)]
    fn request_stop(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Err(e) = kill(Pid::from_raw(self.child.id() as i32), Signal::SIGTERM) {
            warn!("SIGTERM to socat pid {} failed: {}", self.child.id(), e);
        }
    }

    #[cfg(not(unix))]
    fn request_stop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("failed to stop socat pid {}: {}", self.child.id(), e);
        }
    }

    fn force_kill(&mut self) -> Result<(), TunnelError> {
        match self.child.kill() {
            Ok(()) => {}
            // exited in the meantime
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e.into()),
        }
        self.child.wait()?;
        Ok(())
    }
}

impl RunningTunnel for ChildTunnel {
    fn terminate(&mut self) -> Result<(), TunnelError> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }

        self.request_stop();
        let deadline = Instant::now() + self.grace;
        loop {
            match self.child.try_wait()? {
                Some(status) => {
                    debug!("socat pid {} exited: {}", self.child.id(), status);
                    return Ok(());
                }
                None if Instant::now() >= deadline => {
                    warn!("socat pid {} still running after {:?}, force killing", self.child.id(), self.grace);
                    return self.force_kill();
                }
                None => std::thread::sleep(Duration::from_millis(50)),
            }
        }
    }
}

impl TunnelLauncher for SocatLauncher {
    fn launch(&self, spec: &TunnelSpec) -> Result<Box<dyn RunningTunnel>, TunnelError> {
        let child = Command::new(&self.binary)
            .args(spec.socat_args())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| TunnelError::StartFailed {
                spec: spec.to_string(),
                source,
            })?;
        Ok(Box::new(ChildTunnel::new(child, self.grace)))
    }
}

/// Snapshot of a running tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelInfo {
    pub id: TunnelId,
    pub spec: TunnelSpec,
    pub started_at: String,
}

struct Tunnel {
    info: TunnelInfo,
    process: Box<dyn RunningTunnel>,
}

pub struct TunnelManager {
    launcher: Box<dyn TunnelLauncher>,
    tunnels: Vec<Tunnel>,
}

impl TunnelManager {
    pub fn new<L: TunnelLauncher + 'static>(launcher: L) -> Self {
        Self {
            launcher: Box::new(launcher),
            tunnels: Vec::new(),
        }
    }

    pub fn start(&mut self, spec: TunnelSpec) -> Result<TunnelId, TunnelError> {
        info!("connections to port {} will be forwarded to {}", spec.listen_port, spec.target);
        let process = self.launcher.launch(&spec)?;

        let id = Uuid::new_v4().to_string();
        let started_at = OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        self.tunnels.push(Tunnel {
            info: TunnelInfo {
                id: id.clone(),
                spec,
                started_at,
            },
            process,
        });
        Ok(id)
    }

    /// Permanent tunnels into the camera, one per forwarded port.
    pub fn start_camera_tunnels(&mut self, cfg: &ProxyConfig) -> Result<Vec<TunnelId>, TunnelError> {
        cfg.limelight_ports
            .iter()
            .map(|&port| {
                self.start(TunnelSpec::new(port, format!("{}:{}", cfg.limelight_address, port)))
            })
            .collect()
    }

    pub fn stop(&mut self, id: &str) -> Result<(), TunnelError> {
        let idx = self
            .tunnels
            .iter()
            .position(|t| t.info.id == id)
            .ok_or_else(|| TunnelError::NotFound(id.to_string()))?;
        let mut tunnel = self.tunnels.remove(idx);
        tunnel.process.terminate()?;
        info!("stopped tunnel {}", tunnel.info.spec);
        Ok(())
    }

    pub fn stop_all(&mut self) {
        if self.tunnels.is_empty() {
            return;
        }
        info!("stopping tunnels");
        for mut tunnel in self.tunnels.drain(..) {
            if let Err(e) = tunnel.process.terminate() {
                warn!("failed to stop tunnel {}: {}", tunnel.info.spec, e);
            }
        }
        info!("tunnels stopped");
    }

    pub fn list(&self) -> Vec<TunnelInfo> {
        self.tunnels.iter().map(|t| t.info.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&TunnelInfo> {
        self.tunnels.iter().map(|t| &t.info).find(|info| info.id == id)
    }

    pub fn len(&self) -> usize {
        self.tunnels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tunnels.is_empty()
    }
}

impl Drop for TunnelManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}
