//! # iremote-core
//!
//! Client library for iRemote home-automation controllers.
//!
//! This crate contains:
//! - **Codec**: `FrameCodec` for the fixed 128-byte frames, plus the
//!   temperature and audio level conversions in [`codec::units`]
//! - **Message**: `Command`, the typed controller vocabulary
//! - **Network**: `CommandChannel`, one strictly request/response TCP link
//! - **Protocol**: decoders for the describe records
//! - **Model**: the mirrored entities, `Mirror`, and change notifications
//! - **Directory**: `EntityDirectory`, the full snapshot download
//! - **Dispatch**: `PollDispatcher`, the table-driven poll message handlers
//! - **Session**: `Session`, the connect/download/poll state machine
//! - **Error**: `IRemoteError`, a typed `thiserror` hierarchy

pub mod codec;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod model;
pub mod network;
pub mod protocol;
pub mod session;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{FRAME_SIZE, FrameCodec};
pub use directory::EntityDirectory;
pub use dispatch::{Outcome, PollDispatcher};
pub use error::{IRemoteError, Result};
pub use message::Command;
pub use model::{
    Alarm, AudioParam, AudioSource, AudioSourceType, AudioZone, ChangeSet, ChangedItem,
    ControllerNotice, CurveStep, Dimmer, EntityKind, ItemChange, Light, LogVar, Mirror, Room,
    RoomAircoType, RoomControlMode, RoomTempType, Scenario, ScenarioType, Shutter, Socket, Timer,
};
pub use network::{ChannelTimeouts, CommandChannel, ConnectionInfo};
pub use session::{Session, SessionConfig, SessionEvent};
pub use state::{ClientStatus, SessionPhase};
