/*!
 * LIMELIGHT PROXY - Raspberry Pi side of the Limelight bridge
 *
 * ROLE :
 * Runs on the Romi's Raspberry Pi, next to the Limelight camera.
 * - permanent socat tunnels so the camera's web UI / streams are reachable
 * - registration listener (5899): the robot simulator announces itself and
 *   gets an NT tunnel (1735) pointing back at its NetworkTables server
 */

pub mod config;
pub mod server;
pub mod state;
pub mod tunnels;

pub use config::{load_config, ProxyConfig};
pub use server::RegistrationServer;
pub use tunnels::{SocatLauncher, TunnelError, TunnelLauncher, TunnelManager, TunnelSpec};
