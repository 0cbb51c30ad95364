//! Session lifecycle state machine.
//!
//! Provides a `SessionPhase` enum modelling one controller session, with
//! validated transitions that return `Result` instead of panicking.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{IRemoteError, Result};

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of a controller session.
///
/// ```text
///  Disconnected ──► Connecting ──► Downloading ──► Ready
///       ▲               │               │            │
///       └───────────────┴───────────────┴────────────┘
///
///  any ──► Disposed (terminal)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No connection. Initial state.
    #[default]
    Disconnected,

    /// TCP connect and handshake in progress.
    Connecting,

    /// Handshake accepted; the snapshot is being downloaded.
    Downloading {
        /// Last reported checkpoint.
        percent: u8,
    },

    /// Mirror complete; polling may run.
    Ready {
        /// When the session became ready.
        since: Instant,
    },

    /// Released for good.
    Disposed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Downloading { percent } => write!(f, "Downloading ({percent}%)"),
            Self::Ready { .. } => write!(f, "Ready"),
            Self::Disposed => write!(f, "Disposed"),
        }
    }
}

impl SessionPhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }

    /// How long the session has been ready. `None` in any other phase.
    pub fn ready_duration(&self) -> Option<Duration> {
        match self {
            Self::Ready { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<()> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            Self::Disposed => Err(IRemoteError::Disposed),
            _ => Err(IRemoteError::InvalidState(
                "cannot connect: not in Disconnected phase",
            )),
        }
    }

    /// Transition to `Downloading` at 0%.
    ///
    /// Valid from: `Connecting`.
    pub fn begin_download(&mut self) -> Result<()> {
        match self {
            Self::Connecting => {
                *self = Self::Downloading { percent: 0 };
                Ok(())
            }
            Self::Disposed => Err(IRemoteError::Disposed),
            _ => Err(IRemoteError::InvalidState(
                "cannot download: not in Connecting phase",
            )),
        }
    }

    /// Record a download checkpoint. Percentages never go backwards.
    pub fn advance(&mut self, to: u8) -> Result<()> {
        match self {
            Self::Downloading { percent } if to >= *percent && to <= 100 => {
                *percent = to;
                Ok(())
            }
            Self::Downloading { .. } => Err(IRemoteError::InvalidState(
                "download progress must increase up to 100",
            )),
            Self::Disposed => Err(IRemoteError::Disposed),
            _ => Err(IRemoteError::InvalidState(
                "cannot report progress: not in Downloading phase",
            )),
        }
    }

    /// Transition to `Ready`.
    ///
    /// Valid from: `Downloading`.
    pub fn complete_download(&mut self) -> Result<()> {
        match self {
            Self::Downloading { .. } => {
                *self = Self::Ready {
                    since: Instant::now(),
                };
                Ok(())
            }
            Self::Disposed => Err(IRemoteError::Disposed),
            _ => Err(IRemoteError::InvalidState(
                "cannot become ready: not in Downloading phase",
            )),
        }
    }

    /// Drop back to `Disconnected` from any live phase.
    ///
    /// Returns `false` (and stays put) when already disconnected or
    /// disposed.
    pub fn reset(&mut self) -> bool {
        match self {
            Self::Disconnected | Self::Disposed => false,
            _ => {
                *self = Self::Disconnected;
                true
            }
        }
    }

    /// Enter the terminal phase. Returns `false` if already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.is_disposed() {
            return false;
        }
        *self = Self::Disposed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lifecycle() {
        let mut phase = SessionPhase::default();
        assert_eq!(phase, SessionPhase::Disconnected);

        phase.begin_connect().unwrap();
        phase.begin_download().unwrap();
        phase.advance(9).unwrap();
        phase.advance(100).unwrap();
        assert_eq!(phase, SessionPhase::Downloading { percent: 100 });

        phase.complete_download().unwrap();
        assert!(phase.is_ready());
        assert!(phase.ready_duration().is_some());

        assert!(phase.reset());
        assert_eq!(phase, SessionPhase::Disconnected);
        assert!(!phase.reset());
    }

    #[test]
    fn invalid_transitions() {
        let mut phase = SessionPhase::Disconnected;
        assert!(phase.begin_download().is_err());
        assert!(phase.complete_download().is_err());
        assert!(phase.advance(10).is_err());

        phase.begin_connect().unwrap();
        assert!(phase.begin_connect().is_err());
    }

    #[test]
    fn progress_never_decreases() {
        let mut phase = SessionPhase::Connecting;
        phase.begin_download().unwrap();
        phase.advance(45).unwrap();
        assert!(phase.advance(36).is_err());
        assert!(phase.advance(101).is_err());
        assert_eq!(phase, SessionPhase::Downloading { percent: 45 });
    }

    #[test]
    fn disposed_is_terminal() {
        let mut phase = SessionPhase::Ready {
            since: Instant::now(),
        };
        assert!(phase.dispose());
        assert!(!phase.dispose());
        assert!(!phase.reset());
        assert!(matches!(phase.begin_connect(), Err(IRemoteError::Disposed)));
    }

    #[test]
    fn display() {
        assert_eq!(SessionPhase::Downloading { percent: 55 }.to_string(), "Downloading (55%)");
        assert_eq!(SessionPhase::Disposed.to_string(), "Disposed");
    }
}
