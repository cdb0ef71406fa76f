/*!
Test harness for the Limelight bridge

Bundles mock proxies and log capture so a test reads as: script the proxy,
run the code under test, assert on the outcome and the log.
*/

use crate::log_capture::LogCapture;
use crate::mock_proxy::{MockProxy, Reply};
use anyhow::Result;

pub struct TestHarness {
    logs: LogCapture,
    proxies: Vec<MockProxy>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        env_logger::try_init().ok(); // mock proxy chatter, visible with RUST_LOG

        Self {
            logs: LogCapture::new(),
            proxies: Vec::new(),
        }
    }

    /// Starts a mock proxy answering one registration; returns its port.
    pub fn proxy(&mut self, reply: Reply) -> Result<u16> {
        let proxy = MockProxy::start(reply)?;
        let port = proxy.port();
        self.proxies.push(proxy);
        Ok(port)
    }

    /// Runs `f` while capturing its `tracing` output.
    pub fn run<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.logs.run(f)
    }

    pub fn logs(&self) -> &LogCapture {
        &self.logs
    }

    /// Registrations received by all proxies started through this harness.
    pub fn registrations(&self) -> usize {
        self.proxies.iter().map(MockProxy::connection_count).sum()
    }

    /// Fails unless the log contains `needle`.
    pub fn assert_logged(&self, needle: &str) -> Result<()> {
        if self.logs.contains(needle) {
            Ok(())
        } else {
            anyhow::bail!("expected log line containing {:?}, got:\n{}", needle, self.logs.contents())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_counts_registrations() {
        let mut harness = TestHarness::new();
        let port = harness.proxy(Reply::accept()).unwrap();
        let stream = std::net::TcpStream::connect(("127.0.0.1", port)).unwrap();
        drop(stream);

        for _ in 0..50 {
            if harness.registrations() == 1 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(harness.registrations(), 1);
    }

    #[test]
    fn test_assert_logged() {
        let harness = TestHarness::new();
        harness.run(|| tracing::warn!("proxy missing"));
        assert!(harness.assert_logged("proxy missing").is_ok());
        assert!(harness.assert_logged("never said").is_err());
    }
}
