//! Decoders for the controller's binary replies.
//!
//! Each describe reply is a one-byte length-prefixed name (except for
//! curve steps and timers) followed by a fixed-size record. The channel
//! reads the name and the record; the functions in [`describe`] turn the
//! record into a mirrored entity.

pub mod describe;

pub use describe::RoomRecord;
