//! Session controller.
//!
//! A [`Session`] owns one controller connection and the mirror built from
//! it. It drives the connect, download and poll cycle and fans every
//! status transition and entity change out to subscribers.
//!
//! ```text
//!  connect ──► handshake ──► CLIENTNAME ──► download (0..100%) ──► Ready
//!                                                                   │
//!                        poll() ◄──────────── caller's interval ◄───┘
//! ```
//!
//! Two locks guard the session. The channel lock (async) is held for one
//! complete exchange or a whole download; the mirror lock (sync) is only
//! taken for short critical sections and never across an await. Lock
//! order is always channel, then mirror.

pub mod config;

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tracing::{debug, info, warn};

pub use config::SessionConfig;

use crate::directory::EntityDirectory;
use crate::dispatch::{Outcome, PollDispatcher};
use crate::error::{IRemoteError, Result};
use crate::message::Command;
use crate::model::{
    Alarm, AudioParam, AudioSource, AudioZone, ControllerNotice, CurveStep, Dimmer, Entity,
    EntityKind, ItemChange, Light, LogVar, Mirror, Room, RoomAircoType, RoomControlMode,
    RoomTempType, Scenario, SharedMirror, Shutter, Socket, Timer, with_mirror,
};
use crate::network::CommandChannel;
use crate::state::{ClientStatus, SessionPhase};

/// Events buffered per subscriber before the slowest one starts lagging.
pub const EVENT_CAPACITY: usize = 1024;

/// Everything a subscriber hears from a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    Status(ClientStatus),
    Changed(ItemChange),
    Notice(ControllerNotice),
}

/// State guarded by the channel lock.
struct Link {
    channel: CommandChannel,
    dispatcher: PollDispatcher,
    /// Cleared by `POLLOFF`; a disabled session does not send `POLL`.
    polling: bool,
}

/// One client session against an iRemote controller.
pub struct Session {
    config: SessionConfig,
    link: AsyncMutex<Link>,
    mirror: SharedMirror,
    phase: Mutex<SessionPhase>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let channel = CommandChannel::new(config.timeouts());
        Self {
            config,
            link: AsyncMutex::new(Link {
                channel,
                dispatcher: PollDispatcher::new(),
                polling: false,
            }),
            mirror: Mutex::new(Some(Mirror::new())),
            phase: Mutex::new(SessionPhase::default()),
            events,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_phase().clone()
    }

    /// `true` once the snapshot is downloaded and until the connection
    /// drops.
    pub fn is_connected(&self) -> bool {
        self.lock_phase().is_ready()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Connect, identify, and download the full snapshot.
    ///
    /// An existing connection is closed first. On any failure the
    /// session ends up disconnected and the error is returned.
    pub async fn connect(&self, host: &str, port: u16) -> Result<()> {
        let mut link = self.link.lock().await;
        self.close(&mut link, true).await;

        self.transition(SessionPhase::begin_connect)?;
        self.emit_status(ClientStatus::Connecting);
        info!(%host, port, "connecting");

        if let Err(e) = self.open(&mut link, host, port).await {
            warn!(%host, port, "connect failed: {e}");
            self.close(&mut link, true).await;
            return Err(e);
        }

        if let Err(e) = self.download(&mut link).await {
            warn!("snapshot download failed: {e}");
            self.close(&mut link, true).await;
            return Err(e);
        }

        self.transition(SessionPhase::complete_download)?;
        self.emit_status(ClientStatus::Ready);
        info!(%host, port, "session ready");
        Ok(())
    }

    /// Close the connection. Does nothing when not connected.
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        self.close(&mut link, true).await;
    }

    /// Disconnect and release the mirror for good. Idempotent.
    pub async fn dispose(&self) {
        let mut link = self.link.lock().await;
        if self.lock_phase().is_disposed() {
            return;
        }
        self.close(&mut link, true).await;
        *self.mirror.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.lock_phase().dispose();
        self.emit_status(ClientStatus::Disposed);
        info!("session disposed");
    }

    /// Fetch and apply one batch of poll messages.
    ///
    /// Returns whether the session is still connected. Connection
    /// failures and configuration changes are reported through events and
    /// end the connection; only a disposed session is an error.
    pub async fn poll(&self) -> Result<bool> {
        let mut link = self.link.lock().await;
        if self.lock_phase().is_disposed() {
            return Err(IRemoteError::Disposed);
        }
        if !link.channel.is_open() {
            return Ok(false);
        }
        if !link.polling {
            return Ok(true);
        }

        let Link {
            channel, dispatcher, ..
        } = &mut *link;
        if let Err(e) = dispatcher.fetch(channel).await {
            warn!("poll failed, connection lost: {e}");
            self.emit_status(ClientStatus::ConnectionLost);
            self.close(&mut link, false).await;
            return Ok(false);
        }
        let outcomes = with_mirror(&self.mirror, |m| dispatcher.drain(m))?;

        let mut config_changed = false;
        for outcome in outcomes {
            match outcome {
                Outcome::Changed(change) => self.emit(SessionEvent::Changed(change)),
                Outcome::Notice(notice) => self.emit(SessionEvent::Notice(notice)),
                Outcome::ConfigChanged => config_changed = true,
                Outcome::Unchanged | Outcome::Ignored => {}
            }
        }

        if config_changed {
            info!("controller configuration changed, disconnecting");
            self.emit_status(ClientStatus::ConfigChanged);
            self.close(&mut link, true).await;
            return Ok(false);
        }
        Ok(true)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Send a fire-and-forget command.
    ///
    /// Arguments are validated before any I/O. Commands that expect a
    /// reply must go through their dedicated query method.
    pub async fn execute(&self, command: Command) -> Result<()> {
        command.validate()?;
        if command.expects_response() {
            return Err(IRemoteError::InvalidState(
                "query commands must use their dedicated method",
            ));
        }

        let mut link = self.link.lock().await;
        link.channel.send(&command).await?;

        match command {
            Command::Polling(on) => {
                link.polling = on;
                if !on {
                    link.dispatcher.reset();
                }
            }
            Command::ExecuteScenario(_)
            | Command::TimerTime { .. }
            | Command::CurveStepTime { .. } => {
                with_mirror(&self.mirror, |m| apply_locally(m, &command))?;
            }
            _ => {}
        }
        Ok(())
    }

    pub async fn set_state(&self, kind: EntityKind, index: usize, on: bool) -> Result<()> {
        self.execute(Command::SetState { kind, index, on }).await
    }

    /// Switch a whole class on or off.
    pub async fn set_all_state(&self, kind: EntityKind, on: bool) -> Result<()> {
        self.execute(Command::SetAllState { kind, on }).await
    }

    pub async fn rename(&self, kind: EntityKind, index: usize, name: &str) -> Result<()> {
        self.execute(Command::Rename {
            kind,
            index,
            name: name.to_owned(),
        })
        .await
    }

    pub async fn alarm_reset(&self) -> Result<()> {
        self.execute(Command::AlarmReset).await
    }

    pub async fn alarm_silence(&self) -> Result<()> {
        self.execute(Command::AlarmSilence).await
    }

    /// Ask the master to initialise its audio interface. The outcome
    /// arrives later as an [`ControllerNotice::AudioInit`] notice.
    pub async fn audio_init(&self) -> Result<()> {
        self.execute(Command::AudioInit).await
    }

    pub async fn set_audio_param(
        &self,
        zone: usize,
        param: AudioParam,
        value: i32,
        execute: bool,
        lcd_update: bool,
    ) -> Result<()> {
        self.execute(Command::AudioSet {
            zone,
            all_zones: false,
            param,
            value,
            execute,
            lcd_update,
        })
        .await
    }

    /// Send the pair of commands that puts a room in `mode`.
    pub async fn set_room_control_mode(&self, index: usize, mode: RoomControlMode) -> Result<()> {
        for command in control_mode_commands(index, mode) {
            self.execute(command).await?;
        }
        Ok(())
    }

    /// Run a scenario; the mirror marks it busy until the controller
    /// reports otherwise.
    pub async fn execute_scenario(&self, index: usize) -> Result<()> {
        self.execute(Command::ExecuteScenario(index)).await
    }

    pub async fn save_scenario(&self, index: usize) -> Result<()> {
        self.execute(Command::SaveScenario(index)).await
    }

    pub async fn set_timer_time(&self, index: usize, day: u8, hour: u8, minute: u8) -> Result<()> {
        self.execute(Command::TimerTime {
            index,
            day,
            hour,
            minute,
        })
        .await
    }

    pub async fn set_curve_step_time(
        &self,
        room: usize,
        step: usize,
        hour: u8,
        minute: u8,
    ) -> Result<()> {
        self.execute(Command::CurveStepTime {
            room,
            step,
            hour,
            minute,
        })
        .await
    }

    pub async fn execute_instruction(&self, index: usize) -> Result<()> {
        self.execute(Command::ExecuteInstruction(index)).await
    }

    /// Enable or disable poll message delivery on the controller.
    pub async fn set_polling(&self, on: bool) -> Result<()> {
        self.execute(Command::Polling(on)).await
    }

    /// Send a text message to every client of the controller.
    pub async fn broadcast(&self, text: &str) -> Result<()> {
        self.execute(Command::Broadcast(text.to_owned())).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.execute(Command::Ping).await
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Human-readable text of an instruction.
    pub async fn instruction_text(&self, index: usize) -> Result<String> {
        let mut link = self.link.lock().await;
        link.channel.send(&Command::InstructionText(index)).await?;
        link.channel.read_text().await
    }

    pub async fn instruction_count(&self) -> Result<u16> {
        let mut link = self.link.lock().await;
        link.channel.query_u16(&Command::InstructionCount).await
    }

    pub async fn telephone_count(&self) -> Result<u16> {
        let mut link = self.link.lock().await;
        link.channel.query_u16(&Command::TelephoneCount).await
    }

    /// Instruction bound to a telephone code.
    pub async fn telephone_instruction(&self, index: usize) -> Result<u16> {
        let mut link = self.link.lock().await;
        link.channel
            .query_u16(&Command::TelephoneInstruction(index))
            .await
    }

    pub async fn master_version(&self) -> Result<u8> {
        let mut link = self.link.lock().await;
        link.channel.send(&Command::MasterVersion).await?;
        link.channel.read_u8().await
    }

    // ── Mirror accessors ─────────────────────────────────────────

    /// Number of entities in a class; 0 once disposed.
    pub fn count<T: Entity>(&self) -> usize {
        with_mirror(&self.mirror, |m| T::collection(m).len()).unwrap_or(0)
    }

    /// Snapshot of one entity.
    pub fn get<T: Entity>(&self, index: usize) -> Option<T> {
        with_mirror(&self.mirror, |m| T::collection(m).get(index).cloned())
            .ok()
            .flatten()
    }

    /// Snapshot of a whole class.
    pub fn all<T: Entity>(&self) -> Vec<T> {
        with_mirror(&self.mirror, |m| T::collection(m).clone()).unwrap_or_default()
    }

    pub fn curve_step(&self, room: usize, step: usize) -> Option<CurveStep> {
        with_mirror(&self.mirror, |m| {
            m.rooms
                .get(room)
                .and_then(|r| r.curve_steps.get(step))
                .cloned()
        })
        .ok()
        .flatten()
    }

    /// Last clock tick from the controller, `(hour, minute)`.
    pub fn clock(&self) -> Option<(u8, u8)> {
        with_mirror(&self.mirror, |m| m.clock).ok().flatten()
    }

    pub fn audio_init_ok(&self) -> bool {
        with_mirror(&self.mirror, |m| m.audio_init_ok).unwrap_or(false)
    }

    /// Copy of the whole mirror.
    pub fn snapshot(&self) -> Result<Mirror> {
        with_mirror(&self.mirror, |m| m.clone())
    }

    // ── Internals ────────────────────────────────────────────────

    async fn open(&self, link: &mut Link, host: &str, port: u16) -> Result<()> {
        link.channel.connect(host, port).await?;
        link.channel
            .send(&Command::ClientName(self.config.client_name.clone()))
            .await?;
        link.dispatcher.reset();
        link.polling = true;
        Ok(())
    }

    async fn download(&self, link: &mut Link) -> Result<()> {
        self.transition(SessionPhase::begin_download)?;
        self.emit_status(ClientStatus::Downloading(0));
        with_mirror(&self.mirror, Mirror::clear)?;

        EntityDirectory::new(&mut link.channel, &self.mirror)
            .download_all(|percent| {
                if let Err(e) = self.transition(|p| p.advance(percent)) {
                    debug!(percent, "progress not recorded: {e}");
                }
                self.emit_status(ClientStatus::Downloading(percent));
            })
            .await
    }

    /// Tear down the connection, empty the mirror and fall back to
    /// `Disconnected`. `announce` emits the `Disconnected` status when the session was
    /// live.
    async fn close(&self, link: &mut Link, announce: bool) {
        link.channel.disconnect().await;
        link.dispatcher.reset();
        link.polling = false;
        // Indices are meaningless once the link is gone. A disposed
        // mirror has nothing left to clear.
        let _ = with_mirror(&self.mirror, Mirror::clear);
        if self.lock_phase().reset() {
            info!("disconnected");
            if announce {
                self.emit_status(ClientStatus::Disconnected);
            }
        }
    }

    fn transition(&self, step: impl FnOnce(&mut SessionPhase) -> Result<()>) -> Result<()> {
        step(&mut self.lock_phase())
    }

    fn lock_phase(&self) -> std::sync::MutexGuard<'_, SessionPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_status(&self, status: ClientStatus) {
        debug!(%status, "status");
        self.emit(SessionEvent::Status(status));
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

// ── Per-class accessors ──────────────────────────────────────────

macro_rules! class_accessors {
    ($($ty:ident => $count:ident, $one:ident, $all:ident;)*) => {
        impl Session {
            $(
                pub fn $count(&self) -> usize {
                    self.count::<$ty>()
                }

                pub fn $one(&self, index: usize) -> Option<$ty> {
                    self.get::<$ty>(index)
                }

                pub fn $all(&self) -> Vec<$ty> {
                    self.all::<$ty>()
                }
            )*
        }
    };
}

class_accessors! {
    Socket => socket_count, socket, sockets;
    Light => light_count, light, lights;
    LogVar => logvar_count, logvar, logvars;
    Dimmer => dimmer_count, dimmer, dimmers;
    Shutter => shutter_count, shutter, shutters;
    Room => room_count, room, rooms;
    Alarm => alarm_count, alarm, alarms;
    AudioZone => audio_zone_count, audio_zone, audio_zones;
    AudioSource => audio_source_count, audio_source, audio_sources;
    Scenario => scenario_count, scenario, scenarios;
    Timer => timer_count, timer, timers;
}

// ── Helpers ──────────────────────────────────────────────────────

/// The enable/type pair that selects a room control mode.
fn control_mode_commands(index: usize, mode: RoomControlMode) -> [Command; 2] {
    let temp = |kind| {
        [
            Command::RoomTempEnabled { index, on: true },
            Command::RoomTempType { index, kind },
        ]
    };
    let airco = |kind| {
        [
            Command::RoomAircoEnabled { index, on: true },
            Command::RoomAircoType { index, kind },
        ]
    };
    match mode {
        RoomControlMode::Off => [
            Command::RoomTempEnabled { index, on: false },
            Command::RoomAircoEnabled { index, on: false },
        ],
        RoomControlMode::Day => temp(RoomTempType::Day),
        RoomControlMode::Night => temp(RoomTempType::Night),
        RoomControlMode::Auto => temp(RoomTempType::Auto),
        RoomControlMode::AircoTemp => airco(RoomAircoType::Temperature),
        RoomControlMode::AircoContinuous => airco(RoomAircoType::Continuous),
    }
}

/// Mirror the effect of a command the controller echoes late (or not
/// at all). Unknown indices are left alone.
fn apply_locally(mirror: &mut Mirror, command: &Command) {
    match *command {
        Command::ExecuteScenario(index) => {
            if let Some(scenario) = mirror.scenarios.get_mut(index) {
                scenario.busy = true;
            }
        }
        Command::TimerTime {
            index,
            day,
            hour,
            minute,
        } => {
            if let Some(timer) = mirror.timers.get_mut(index) {
                timer.day = day;
                timer.hour = hour;
                timer.minute = minute;
            }
        }
        Command::CurveStepTime {
            room,
            step,
            hour,
            minute,
        } => {
            if let Some(curve) = mirror
                .rooms
                .get_mut(room)
                .and_then(|r| r.curve_steps.get_mut(step))
            {
                curve.hour = hour;
                curve.minute = minute;
            }
        }
        _ => {}
    }
}
