//! Error types for the session engine.
//!
//! Transport failures are terminal for the current connection and feed the
//! reconnect loop; configuration misuse is surfaced at construction time.

use std::time::Duration;

use thiserror::Error;

/// Convenience type alias for Results using [`SessionError`].
pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// Top-level session errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// I/O error during connect, read or write.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS setup or handshake error.
    #[error("tls error: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    /// The configured network name is not a valid TLS server name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// The socket did not open, or the welcome numeric never arrived,
    /// within the connect timeout window.
    #[error("no session established within {0:?}")]
    ConnectTimeout(Duration),

    /// A keepalive ping went unanswered within the ping timeout window.
    #[error("ping timeout: no PONG within {0:?}")]
    PingTimeout(Duration),

    /// A line exceeded the maximum allowed length.
    #[error("line too long: {0} bytes")]
    LineTooLong(usize),

    /// The server closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The session worker has terminated; the handle is no longer usable.
    #[error("session terminated")]
    Terminated,

    /// Invalid configuration (construction-time misuse).
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Whether this error is a normal network outage that the reconnect
    /// loop recovers from, as opposed to misuse.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SessionError::Config(_) | SessionError::Terminated)
    }
}

/// Errors detected when validating a [`Config`](crate::config::Config).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The network address was empty.
    #[error("network address must not be empty")]
    MissingNetwork,

    /// The nick was empty.
    #[error("nick must not be empty")]
    MissingNick,

    /// The port was zero.
    #[error("port must be non-zero")]
    InvalidPort,

    /// An IP version pin other than 4 or 6.
    #[error("invalid IP version: {0} (expected 4 or 6)")]
    InvalidIpVersion(u8),

    /// A zero interval that must be positive.
    #[error("interval `{0}` must be positive")]
    ZeroInterval(&'static str),
}
