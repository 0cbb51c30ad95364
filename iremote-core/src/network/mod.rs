//! The TCP command channel to the controller.

mod channel;

pub use channel::{ChannelTimeouts, CommandChannel, ConnectionInfo, MAX_TEXT_LEN, Transport};
