//! Session lifecycle states and the statuses reported to subscribers.

pub mod phase;

use serde::Serialize;

pub use phase::SessionPhase;

/// Status transitions surfaced to the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "percent", rename_all = "snake_case")]
pub enum ClientStatus {
    Disconnected,
    Connecting,
    /// Snapshot download progress, 0 to 100.
    Downloading(u8),
    Ready,
    /// The connection failed while polling.
    ConnectionLost,
    /// The controller's configuration changed; a reconnect follows.
    ConfigChanged,
    Disposed,
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downloading(percent) => write!(f, "Downloading {percent}%"),
            other => write!(f, "{other:?}"),
        }
    }
}
