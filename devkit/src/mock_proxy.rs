/*!
Mock Limelight proxy for development without a Raspberry Pi

Listens on an ephemeral loopback port, accepts a fixed number of
registrations and answers each one with a scripted reply.
*/

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// What the mock sends back to a registering client.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Write these bytes, then close the connection.
    Send(Vec<u8>),
    /// Close the connection without writing anything.
    Close,
}

impl Reply {
    /// The real proxy's success answer: a lone `0`.
    pub fn accept() -> Self {
        Reply::Send(b"0".to_vec())
    }

    pub fn text(text: &str) -> Self {
        Reply::Send(text.as_bytes().to_vec())
    }
}

pub struct MockProxy {
    addr: SocketAddr,
    peers: Arc<Mutex<Vec<SocketAddr>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockProxy {
    /// Serves a single registration.
    pub fn start(reply: Reply) -> Result<Self> {
        Self::serve(vec![reply])
    }

    /// Serves one registration per reply, in order, then stops listening.
    pub fn serve(replies: Vec<Reply>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind mock proxy")?;
        let addr = listener.local_addr().context("mock proxy address")?;
        let peers = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&peers);
        let handle = thread::spawn(move || {
            for reply in replies {
                let (mut stream, peer) = match listener.accept() {
                    Ok(conn) => conn,
                    Err(e) => {
                        log::error!("❌ [MOCK] accept failed: {}", e);
                        return;
                    }
                };
                seen.lock().push(peer);
                log::info!("📥 [MOCK] registration from {}", peer);

                if let Reply::Send(bytes) = reply {
                    if let Err(e) = stream.write_all(&bytes) {
                        log::warn!("⚠️ [MOCK] reply to {} failed: {}", peer, e);
                    }
                }
                // dropping the stream closes the connection
            }
        });

        log::info!("🚀 [MOCK] Limelight proxy listening on {}", addr);
        Ok(Self {
            addr,
            peers,
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of registrations accepted so far.
    pub fn connection_count(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn peers(&self) -> Vec<SocketAddr> {
        self.peers.lock().clone()
    }

    /// Waits until every scripted reply has been served.
    pub fn join(mut self) -> Result<usize> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("mock proxy thread panicked"))?;
        }
        Ok(self.connection_count())
    }
}

/// A loopback port nobody listens on (bound, then released).
pub fn refused_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind probe listener")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpStream;

    #[test]
    fn test_mock_sends_scripted_reply() {
        let proxy = MockProxy::start(Reply::text("0\n")).unwrap();
        let mut stream = TcpStream::connect(proxy.addr()).unwrap();
        let mut answer = String::new();
        stream.read_to_string(&mut answer).unwrap();
        assert_eq!(answer, "0\n");
        assert_eq!(proxy.join().unwrap(), 1);
    }

    #[test]
    fn test_mock_close_sends_nothing() {
        let proxy = MockProxy::start(Reply::Close).unwrap();
        let mut stream = TcpStream::connect(proxy.addr()).unwrap();
        let mut answer = Vec::new();
        stream.read_to_end(&mut answer).unwrap();
        assert!(answer.is_empty());
        assert_eq!(proxy.join().unwrap(), 1);
    }

    #[test]
    fn test_mock_serves_replies_in_order() {
        let proxy = MockProxy::serve(vec![Reply::accept(), Reply::text("busy\n")]).unwrap();
        for expected in ["0", "busy\n"] {
            let mut stream = TcpStream::connect(proxy.addr()).unwrap();
            let mut answer = String::new();
            stream.read_to_string(&mut answer).unwrap();
            assert_eq!(answer, expected);
        }
        assert_eq!(proxy.join().unwrap(), 2);
    }

    #[test]
    fn test_refused_port_refuses() {
        let port = refused_port().unwrap();
        assert!(TcpStream::connect(("127.0.0.1", port)).is_err());
    }
}
