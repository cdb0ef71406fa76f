//! Robot client against the real registration listener, with socat replaced
//! by a recording launcher.

use limelight_client::{HandshakeOutcome, RegistrationClient, RegistrationConfig};
use limelight_devkit::LogCapture;
use limelight_proxy::state::new_state;
use limelight_proxy::tunnels::RunningTunnel;
use limelight_proxy::{RegistrationServer, TunnelError, TunnelLauncher, TunnelManager, TunnelSpec};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct RecordingLauncher {
    launched: Arc<Mutex<Vec<TunnelSpec>>>,
    stopped: Arc<Mutex<usize>>,
    refuse: bool,
}

struct RecordedTunnel {
    stopped: Arc<Mutex<usize>>,
}

impl RunningTunnel for RecordedTunnel {
    fn terminate(&mut self) -> Result<(), TunnelError> {
        *self.stopped.lock() += 1;
        Ok(())
    }
}

impl TunnelLauncher for RecordingLauncher {
    fn launch(&self, spec: &TunnelSpec) -> Result<Box<dyn RunningTunnel>, TunnelError> {
        if self.refuse {
            return Err(TunnelError::StartFailed {
                spec: spec.to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "socat refused"),
            });
        }
        self.launched.lock().push(spec.clone());
        Ok(Box::new(RecordedTunnel {
            stopped: Arc::clone(&self.stopped),
        }))
    }
}

async fn register(port: u16) -> (HandshakeOutcome, LogCapture) {
    tokio::task::spawn_blocking(move || {
        let logs = LogCapture::new();
        let config = RegistrationConfig::new("127.0.0.1").with_port(port);
        let outcome = logs.run(|| RegistrationClient::new(config).register());
        (outcome, logs)
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_robot_registers_and_gets_nt_tunnel() {
    let launcher = RecordingLauncher::default();
    let tunnels = new_state(TunnelManager::new(launcher.clone()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = RegistrationServer::new(tunnels.clone(), 1735);
    let serving = tokio::spawn(server.run(listener, async move {
        stop_rx.await.ok();
    }));

    let (outcome, logs) = register(port).await;
    assert_eq!(outcome, HandshakeOutcome::Registered);
    assert!(logs.contains("Registered with Limelight proxy"));
    assert_eq!(*launcher.launched.lock(), vec![TunnelSpec::new(1735, "127.0.0.1:1735")]);

    // a second registration swaps the NT tunnel
    let (outcome, _) = register(port).await;
    assert!(outcome.is_registered());
    assert_eq!(*launcher.stopped.lock(), 1);
    assert_eq!(tunnels.lock().len(), 1);

    stop_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();

    tunnels.lock().stop_all();
    assert_eq!(*launcher.stopped.lock(), 2);
}

#[tokio::test]
async fn test_robot_sees_proxy_failure_message() {
    let launcher = RecordingLauncher {
        refuse: true,
        ..RecordingLauncher::default()
    };
    let tunnels = new_state(TunnelManager::new(launcher));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = RegistrationServer::new(tunnels, 1735);
    let serving = tokio::spawn(server.run(listener, async move {
        stop_rx.await.ok();
    }));

    let (outcome, logs) = register(port).await;
    match outcome {
        HandshakeOutcome::Rejected { lines } => {
            assert_eq!(lines.len(), 1);
            assert!(lines[0].starts_with("!: "));
            assert!(lines[0].contains("socat refused"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert!(logs.contains("Registration rejected by proxy"));

    stop_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();
}
