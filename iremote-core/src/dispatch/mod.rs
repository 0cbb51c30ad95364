//! Poll message dispatch.
//!
//! The controller answers `POLL` with a batch of colon-delimited
//! messages. They are queued in arrival order, then each is routed by its
//! leading tag through a lookup table to a handler that updates the
//! mirror and reports what changed.

mod handlers;

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::error::{IRemoteError, Result};
use crate::message::Command;
use crate::model::{ControllerNotice, ItemChange, Mirror};
use crate::network::CommandChannel;

/// What one poll message did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// An entity changed; carries the snapshot and changed fields.
    Changed(ItemChange),
    /// The message matched the mirror already.
    Unchanged,
    /// A controller-level notification.
    Notice(ControllerNotice),
    /// The controller's configuration changed; the session must
    /// reconnect and download again.
    ConfigChanged,
    /// Known no-op or unknown tag.
    Ignored,
}

// ── Message ──────────────────────────────────────────────────────

/// One parsed poll message: the tag and its argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollMessage<'a> {
    pub tag: &'a str,
    args: Vec<&'a str>,
}

impl<'a> PollMessage<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let mut tokens = raw.split(':');
        let tag = tokens.next().unwrap_or_default();
        Self {
            tag,
            args: tokens.collect(),
        }
    }

    /// The leading index argument. Missing or non-numeric parses as 0.
    pub fn index(&self) -> i64 {
        self.args
            .first()
            .and_then(|t| t.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Numeric argument at `pos` (0 is the first token after the tag).
    pub fn number<T: FromStr>(&self, pos: usize) -> Result<T> {
        let token = self.arg(pos)?;
        token.trim().parse().map_err(|_| self.malformed(format!(
            "argument {pos} ({token:?}) is not a valid number"
        )))
    }

    /// Byte argument interpreted as a flag.
    pub fn flag(&self, pos: usize) -> Result<bool> {
        Ok(self.number::<u8>(pos)? != 0)
    }

    /// Every token from `pos` on, rejoined. Names may contain colons.
    pub fn text(&self, pos: usize) -> Result<String> {
        self.arg(pos)?;
        Ok(self.args[pos..].join(":"))
    }

    fn arg(&self, pos: usize) -> Result<&'a str> {
        self.args
            .get(pos)
            .copied()
            .ok_or_else(|| self.malformed(format!("missing argument {pos}")))
    }

    fn malformed(&self, reason: String) -> IRemoteError {
        IRemoteError::MalformedMessage {
            tag: self.tag.to_owned(),
            reason,
        }
    }
}

// ── Handler table ────────────────────────────────────────────────

/// Per-dispatcher memory carried between messages.
#[derive(Debug, Clone)]
pub struct DispatchState {
    /// Sender announced by the last `CLIENTNAME` message.
    pub broadcast_from: String,
}

impl Default for DispatchState {
    fn default() -> Self {
        Self {
            broadcast_from: "unknown".into(),
        }
    }
}

type Handler = fn(&mut Mirror, &PollMessage<'_>, &mut DispatchState) -> Result<Outcome>;

static HANDLERS: OnceLock<HashMap<&'static str, Handler>> = OnceLock::new();

fn handlers() -> &'static HashMap<&'static str, Handler> {
    HANDLERS.get_or_init(handlers::table)
}

/// Returns `true` if `tag` has a handler (including the known no-ops).
pub fn is_known_tag(tag: &str) -> bool {
    handlers().contains_key(tag)
}

// ── PollDispatcher ───────────────────────────────────────────────

/// Queues poll messages and applies them to the mirror in order.
#[derive(Debug, Default)]
pub struct PollDispatcher {
    queue: VecDeque<String>,
    state: DispatchState,
}

impl PollDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, messages: impl IntoIterator<Item = String>) {
        self.queue.extend(messages);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drop queued messages and the remembered broadcast sender.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.state = DispatchState::default();
    }

    /// Send `POLL` and queue the reply. Returns the queue length.
    pub async fn fetch(&mut self, channel: &mut CommandChannel) -> Result<usize> {
        channel.send(&Command::Poll).await?;
        let batch = channel.read_poll_batch().await?;
        self.enqueue(batch);
        Ok(self.queue.len())
    }

    /// Apply every queued message in arrival order.
    ///
    /// A message that fails to apply is logged and dropped. A
    /// configuration change is reported like any other outcome and the
    /// messages behind it are still applied.
    pub fn drain(&mut self, mirror: &mut Mirror) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(raw) = self.queue.pop_front() {
            match self.dispatch(mirror, &raw) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(message = %raw, "dropping poll message: {e}"),
            }
        }
        outcomes
    }

    /// Apply a single message.
    pub fn dispatch(&mut self, mirror: &mut Mirror, raw: &str) -> Result<Outcome> {
        let message = PollMessage::parse(raw);
        debug!(message = %raw, "dispatching");
        match handlers().get(message.tag) {
            Some(handler) => handler(mirror, &message, &mut self.state),
            None => {
                debug!(tag = message.tag, "ignoring unknown poll message");
                Ok(Outcome::Ignored)
            }
        }
    }
}
