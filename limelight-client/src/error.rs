use std::io;

/// Ways a registration attempt can fail.
///
/// None of these ever leave the constructor of [`crate::Limelight`]: they are
/// logged and folded into a [`crate::HandshakeOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Server not found in registration: {host} ({message})")]
    HostUnresolvable { host: String, message: String },

    #[error("I/O error in registration with {endpoint}: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Registration rejected by proxy: failed to set up forwarding on the Pi for Limelight NetworkTables traffic")]
    Rejected { lines: Vec<String> },
}
