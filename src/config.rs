//! Session configuration.
//!
//! All knobs the engine exposes: server address, identity, TLS, and the
//! timing parameters that drive the keepalive, flood-control and reconnect
//! behavior. Loadable from TOML; every timing field has a serde default so
//! a minimal config is just `network`, `port` and `nick`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Explicit address-family pin for host resolution.
///
/// When absent, a literal IP address decides its own family and hostnames
/// use whatever the resolver returns first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum IpVersion {
    /// IPv4 only.
    V4,
    /// IPv6 only.
    V6,
}

impl TryFrom<u8> for IpVersion {
    type Error = ConfigError;

    fn try_from(value: u8) -> std::result::Result<Self, ConfigError> {
        match value {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            other => Err(ConfigError::InvalidIpVersion(other)),
        }
    }
}

impl From<IpVersion> for u8 {
    fn from(value: IpVersion) -> u8 {
        match value {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

/// Configuration for one IRC session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server hostname or literal IP address.
    pub network: String,
    /// Server port.
    pub port: u16,
    /// Nickname to register with.
    pub nick: String,
    /// Real name / description sent in USER.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Server password (PASS), if required.
    #[serde(default)]
    pub password: Option<String>,
    /// Wrap the connection in TLS.
    #[serde(default)]
    pub tls: bool,
    /// Skip TLS certificate verification (for self-signed test servers).
    #[serde(default)]
    pub tls_insecure: bool,
    /// Optional address-family pin (`4` or `6` in TOML).
    #[serde(default)]
    pub ip_version: Option<IpVersion>,
    /// Window for socket open plus welcome numeric.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Pause between a connection ending and the next attempt.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// Keepalive PING cadence.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    /// How long an unanswered keepalive PING is tolerated.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,
    /// Minimum spacing between queued outgoing messages (flood control).
    #[serde(default = "default_send_spacing")]
    pub send_spacing_msecs: u64,
    /// Per-channel history ring capacity.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Record the bot's own `say` output in channel history.
    #[serde(default = "default_log_own_messages")]
    pub log_own_messages: bool,
}

fn default_realname() -> String {
    "slirc-session".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_ping_interval() -> u64 {
    120
}

fn default_ping_timeout() -> u64 {
    60
}

fn default_send_spacing() -> u64 {
    1000
}

fn default_log_capacity() -> usize {
    200
}

fn default_log_own_messages() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: "127.0.0.1".to_string(),
            port: 6667,
            nick: "slirc".to_string(),
            realname: default_realname(),
            password: None,
            tls: false,
            tls_insecure: false,
            ip_version: None,
            connect_timeout_secs: default_connect_timeout(),
            reconnect_delay_secs: default_reconnect_delay(),
            ping_interval_secs: default_ping_interval(),
            ping_timeout_secs: default_ping_timeout(),
            send_spacing_msecs: default_send_spacing(),
            log_capacity: default_log_capacity(),
            log_own_messages: default_log_own_messages(),
        }
    }
}

impl Config {
    /// Load a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a session cannot run without.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.network.is_empty() {
            return Err(ConfigError::MissingNetwork);
        }
        if self.nick.is_empty() {
            return Err(ConfigError::MissingNick);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.ping_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("ping_interval_secs"));
        }
        if self.send_spacing_msecs == 0 {
            return Err(ConfigError::ZeroInterval("send_spacing_msecs"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn send_spacing(&self) -> Duration {
        Duration::from_millis(self.send_spacing_msecs)
    }
}
