//! The mirrored entity model.

pub mod change;
pub mod items;
pub mod kinds;
pub mod mirror;

pub use change::{ChangeSet, ChangedItem, ControllerNotice, ItemChange, field};
pub use items::{
    Alarm, AudioSource, AudioZone, CurveStep, Dimmer, Light, LogVar, Room, Scenario, Shutter,
    Socket, Timer,
};
pub use kinds::{
    AudioParam, AudioSourceType, EntityKind, RoomAircoType, RoomControlMode, RoomTempType,
    ScenarioType,
};
pub use mirror::{Entity, Mirror, Named, SharedMirror, with_mirror};
