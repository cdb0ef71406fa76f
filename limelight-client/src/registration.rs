//! Registration handshake with the Limelight proxy
//!
//! Wire exchange (client-initiated, one shot):
//! 1. connect to `<host>:5899`
//! 2. the proxy answers one line of text
//! 3. `0` means the NetworkTables tunnel is up; anything else is an error
//!    message, possibly spread over several lines until the proxy hangs up
//!
//! The attempt is best-effort: a missing Pi must not keep the robot code from
//! starting, so every failure is logged and returned as a value.

use std::io::{self, BufRead, BufReader};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info};

use crate::config::RegistrationConfig;
use crate::error::RegistrationError;

/// Result of one registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Proxy answered `0`.
    Registered,
    /// Proxy answered something else; every line it sent, in order.
    Rejected { lines: Vec<String> },
    /// Host name could not be resolved.
    HostUnreachable { host: String, message: String },
    /// Connect, read or reset failure.
    IoFailure { message: String },
}

impl HandshakeOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, HandshakeOutcome::Registered)
    }
}

impl From<RegistrationError> for HandshakeOutcome {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::HostUnresolvable { host, message } => {
                HandshakeOutcome::HostUnreachable { host, message }
            }
            RegistrationError::Io { source, .. } => HandshakeOutcome::IoFailure {
                message: source.to_string(),
            },
            RegistrationError::Rejected { lines } => HandshakeOutcome::Rejected { lines },
        }
    }
}

/// Performs the handshake against a configured proxy.
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    config: RegistrationConfig,
}

impl RegistrationClient {
    pub fn new(config: RegistrationConfig) -> Self {
        Self { config }
    }

    /// Client for the proxy named by `HALSIMWS_HOST`.
    pub fn from_env() -> Self {
        Self::new(RegistrationConfig::from_env())
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Registers our NetworkTables server with the proxy.
    ///
    /// Never fails: the outcome is logged and handed back. Blocks the calling
    /// thread for as long as the proxy takes to answer.
    pub fn register(&self) -> HandshakeOutcome {
        self.settle(self.try_register())
    }

    /// Same exchange as [`register`](Self::register), with the failure as an error.
    pub fn try_register(&self) -> Result<(), RegistrationError> {
        let addrs = self.resolve()?;
        debug!("Connecting to Limelight proxy at {} ({} addresses)", self.config, addrs.len());

        let stream = TcpStream::connect(&addrs[..]).map_err(|source| self.io_error(source))?;
        // stream and reader are dropped (closed) on every return below
        self.interpret(BufReader::new(stream))
    }

    fn interpret<R: BufRead>(&self, reader: R) -> Result<(), RegistrationError> {
        read_response(&mut LineReader::new(reader)).map_err(|e| match e {
            ResponseError::Io(source) => self.io_error(source),
            ResponseError::Rejected(lines) => RegistrationError::Rejected { lines },
        })
    }

    /// Logs the attempt's result and folds it into an outcome.
    fn settle(&self, result: Result<(), RegistrationError>) -> HandshakeOutcome {
        match result {
            Ok(()) => {
                info!("Registered with Limelight proxy at {}", self.config);
                HandshakeOutcome::Registered
            }
            Err(e) => {
                error!("{}", e);
                e.into()
            }
        }
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, RegistrationError> {
        let host = self.config.host.as_str();
        let addrs: Vec<SocketAddr> = (host, self.config.port)
            .to_socket_addrs()
            .map_err(|e| RegistrationError::HostUnresolvable {
                host: host.to_string(),
                message: e.to_string(),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(RegistrationError::HostUnresolvable {
                host: host.to_string(),
                message: "no addresses returned".to_string(),
            });
        }
        Ok(addrs)
    }

    fn io_error(&self, source: io::Error) -> RegistrationError {
        RegistrationError::Io {
            endpoint: self.config.endpoint(),
            source,
        }
    }
}

#[derive(Debug)]
enum ResponseError {
    Io(io::Error),
    Rejected(Vec<String>),
}

impl From<io::Error> for ResponseError {
    fn from(e: io::Error) -> Self {
        ResponseError::Io(e)
    }
}

/// Interprets the proxy's answer. Stops reading right after an accepting `0`;
/// otherwise logs and collects every line until the proxy closes the stream.
fn read_response<R: BufRead>(lines: &mut LineReader<R>) -> Result<(), ResponseError> {
    let Some(first) = lines.next_line()? else {
        error!("Limelight proxy closed the connection without answering");
        return Err(ResponseError::Rejected(Vec::new()));
    };

    if first.as_bytes() == b"0" {
        return Ok(());
    }

    error!("{}", first);
    let mut collected = vec![first];
    while let Some(line) = lines.next_line()? {
        error!("{}", line);
        collected.push(line);
    }
    Err(ResponseError::Rejected(collected))
}

/// Splits a byte stream into text lines ended by `\n`, `\r`, `\r\n` or end
/// of stream.
///
/// After a `\r` the following `\n` is only skipped on the next read, so an
/// answer of `0\r` never waits for more bytes.
struct LineReader<R> {
    inner: R,
    skip_lf: bool,
}

impl<R: BufRead> LineReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, skip_lf: false }
    }

    /// Next line without its terminator; `None` at end of stream.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        if self.skip_lf {
            self.skip_lf = false;
            if self.fill()?.first() == Some(&b'\n') {
                self.inner.consume(1);
            }
        }

        let mut buf = Vec::new();
        let mut read_any = false;
        loop {
            let available = self.fill()?;
            if available.is_empty() {
                break;
            }
            read_any = true;
            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(i) => {
                    let terminator = available[i];
                    buf.extend_from_slice(&available[..i]);
                    self.inner.consume(i + 1);
                    self.skip_lf = terminator == b'\r';
                    return Ok(Some(decode(buf)));
                }
                None => {
                    let n = available.len();
                    buf.extend_from_slice(available);
                    self.inner.consume(n);
                }
            }
        }
        Ok(read_any.then(|| decode(buf)))
    }

    fn fill(&mut self) -> io::Result<&[u8]> {
        loop {
            match self.inner.fill_buf() {
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.inner.fill_buf()
    }
}

fn decode(buf: Vec<u8>) -> String {
    String::from_utf8_lossy(&buf).into_owned()
}
