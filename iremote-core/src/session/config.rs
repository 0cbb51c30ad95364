//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IRemoteError, Result};
use crate::message::{Command, MAX_CLIENT_NAME};
use crate::network::ChannelTimeouts;

/// Settings for one controller session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name announced to the controller after the handshake.
    pub client_name: String,
    /// TCP connect deadline in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-read deadline in milliseconds, also used for the handshake.
    pub read_timeout_ms: u64,
    /// Per-write deadline in milliseconds.
    pub write_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_name: "iremote-rs".into(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 1000,
        }
    }
}

impl SessionConfig {
    pub fn timeouts(&self) -> ChannelTimeouts {
        ChannelTimeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            read: Duration::from_millis(self.read_timeout_ms),
            write: Duration::from_millis(self.write_timeout_ms),
        }
    }

    /// Reject settings the controller or the channel cannot use.
    pub fn validate(&self) -> Result<()> {
        Command::ClientName(self.client_name.clone()).validate()?;
        if self.client_name.len() > MAX_CLIENT_NAME {
            return Err(IRemoteError::out_of_range("client name"));
        }
        if self.connect_timeout_ms == 0 || self.read_timeout_ms == 0 || self.write_timeout_ms == 0
        {
            return Err(IRemoteError::out_of_range("timeouts must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = SessionConfig::default();
        assert!(cfg.validate().is_ok());
        let t = cfg.timeouts();
        assert_eq!(t.read, Duration::from_secs(5));
        assert_eq!(t.write, Duration::from_secs(1));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: SessionConfig = serde_json::from_str(r#"{"client_name":"panel"}"#).unwrap();
        assert_eq!(cfg.client_name, "panel");
        assert_eq!(cfg.read_timeout_ms, 5000);
    }

    #[test]
    fn rejects_long_name_and_zero_timeouts() {
        let cfg = SessionConfig {
            client_name: "n".repeat(25),
            ..SessionConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SessionConfig {
            read_timeout_ms: 0,
            ..SessionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
