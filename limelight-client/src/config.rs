//! Where to find the Limelight proxy
//!
//! The simulator exports the Pi's address as `HALSIMWS_HOST`. Reading it is
//! done once, into a plain value, so the rest of the crate never touches the
//! process environment.

use std::fmt;

/// Port on which the proxy waits for NetworkTables registrations.
pub const REGISTRATION_PORT: u16 = 5899;

/// Environment variable naming the coprocessor host.
pub const HOST_ENV_VAR: &str = "HALSIMWS_HOST";

/// Host used when `HALSIMWS_HOST` is unset (the simulator then runs locally).
pub const DEFAULT_HOST: &str = "localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

impl RegistrationConfig {
    /// Registration against `host` on the well-known port.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: REGISTRATION_PORT,
        }
    }

    /// Overrides the port (tests bind the mock proxy on an ephemeral port).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Reads the host from `HALSIMWS_HOST`, falling back to `localhost`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(HOST_ENV_VAR) {
            Some(host) if !host.trim().is_empty() => Self::new(host.trim()),
            _ => Self::default(),
        }
    }

    /// `host:port`, as used in log lines.
    pub fn endpoint(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RegistrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistrationConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5899);
    }

    #[test]
    fn test_lookup_uses_host_variable() {
        let config = RegistrationConfig::from_lookup(|name| {
            assert_eq!(name, "HALSIMWS_HOST");
            Some("sim-host".to_string())
        });
        assert_eq!(config.host, "sim-host");
        assert_eq!(config.port, REGISTRATION_PORT);
        assert_eq!(config.endpoint(), "sim-host:5899");
    }

    #[test]
    fn test_blank_host_falls_back_to_default() {
        let config = RegistrationConfig::from_lookup(|_| Some("   ".to_string()));
        assert_eq!(config, RegistrationConfig::default());

        let config = RegistrationConfig::from_lookup(|_| None);
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn test_with_port() {
        let config = RegistrationConfig::new("10.7.14.2").with_port(40123);
        assert_eq!(config.to_string(), "10.7.14.2:40123");
    }
}
