/*!
# Limelight DevKit - test support for the Limelight bridge

Helpers shared by the client and proxy test suites:
- Scripted mock proxy (answers registrations without a Pi)
- Capture of `tracing` output for assertions on log lines
- Harness tying both together
*/

pub mod log_capture;
pub mod mock_proxy;
pub mod test_utils;

pub use log_capture::LogCapture;
pub use mock_proxy::{refused_port, MockProxy, Reply};
pub use test_utils::TestHarness;
