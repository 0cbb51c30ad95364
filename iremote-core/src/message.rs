//! Controller command vocabulary.
//!
//! Every request is a typed [`Command`] that renders to the ASCII token
//! the controller expects. Arguments are checked by [`Command::validate`]
//! before anything touches the socket.

use std::fmt;

use crate::codec::FRAME_SIZE;
use crate::codec::units;
use crate::error::{IRemoteError, Result};
use crate::model::{AudioParam, EntityKind, RoomAircoType, RoomTempType};

/// Longest client name the controller accepts.
pub const MAX_CLIENT_NAME: usize = 24;

/// Longest broadcast message the controller accepts.
pub const MAX_BROADCAST: usize = 125;

/// Highest dimmer level.
pub const MAX_DIMMER_VALUE: u8 = 100;

// ── Command ──────────────────────────────────────────────────────

/// All commands understood by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Entity state ─────────────────────────────────────────────
    /// Switch one socket, light, logvar, dimmer, alarm, audio zone or
    /// timer on or off.
    SetState {
        kind: EntityKind,
        index: usize,
        on: bool,
    },
    /// Switch every entity of a class on or off.
    SetAllState { kind: EntityKind, on: bool },
    /// Rename an entity.
    Rename {
        kind: EntityKind,
        index: usize,
        name: String,
    },

    // ── Dimmers ──────────────────────────────────────────────────
    DimmerValue { index: usize, value: u8 },
    /// Ask a dimmer slave to refresh its state.
    DimmerUpdate(usize),
    /// Put a dimmer in (or take it out of) manual mode.
    DimmerManual { index: usize, active: bool },

    // ── Shutters ─────────────────────────────────────────────────
    ShutterUp(usize),
    ShutterDown(usize),
    ShutterStop(usize),

    // ── Rooms ────────────────────────────────────────────────────
    RoomDayTemp { index: usize, degrees: f32 },
    RoomNightTemp { index: usize, degrees: f32 },
    RoomAircoTemp { index: usize, degrees: f32 },
    RoomCorrection { index: usize, degrees: f32 },
    RoomTempEnabled { index: usize, on: bool },
    RoomTempType { index: usize, kind: RoomTempType },
    RoomAircoEnabled { index: usize, on: bool },
    RoomAircoType { index: usize, kind: RoomAircoType },
    CurveStepTime {
        room: usize,
        step: usize,
        hour: u8,
        minute: u8,
    },
    CurveStepTemp {
        room: usize,
        step: usize,
        degrees: f32,
    },

    // ── Alarms ───────────────────────────────────────────────────
    AlarmActivate(usize),
    AlarmReset,
    AlarmSilence,

    // ── Audio ────────────────────────────────────────────────────
    /// Set one audio parameter on a zone (or on every zone).
    AudioSet {
        zone: usize,
        all_zones: bool,
        param: AudioParam,
        value: i32,
        execute: bool,
        lcd_update: bool,
    },
    AudioInit,

    // ── Scenarios, timers, instructions ──────────────────────────
    ExecuteScenario(usize),
    SaveScenario(usize),
    TimerTime {
        index: usize,
        day: u8,
        hour: u8,
        minute: u8,
    },
    ExecuteInstruction(usize),

    // ── Session ──────────────────────────────────────────────────
    Ping,
    Polling(bool),
    Broadcast(String),
    ClientName(String),

    // ── Queries (a response follows) ─────────────────────────────
    /// Number of entities in a class (u16 reply).
    Count(EntityKind),
    /// Describe record of one entity.
    Describe { kind: EntityKind, index: usize },
    /// Describe record of one room's curve step.
    DescribeCurveStep { room: usize, step: usize },
    /// Human-readable text of an instruction (u16-prefixed reply).
    InstructionText(usize),
    InstructionCount,
    TelephoneCount,
    TelephoneInstruction(usize),
    MasterVersion,
    Poll,
}

impl Command {
    /// Render the command to its wire token.
    ///
    /// Entity/command combinations the controller has no token for
    /// render as an empty string; [`Command::validate`] rejects them.
    pub fn token(&self) -> String {
        match self {
            Command::SetState { kind, index, on } => match state_prefix(*kind, *on) {
                Some(prefix) => format!("{prefix}:{index}"),
                None => String::new(),
            },
            Command::SetAllState { kind, on } => all_state_token(*kind, *on)
                .map(str::to_owned)
                .unwrap_or_default(),
            Command::Rename { kind, index, name } => match rename_prefix(*kind) {
                Some(prefix) => format!("{prefix}:{index}:{name}"),
                None => String::new(),
            },

            Command::DimmerValue { index, value } => {
                format!("DIMINST:{index}:{}", (*value).min(MAX_DIMMER_VALUE))
            }
            Command::DimmerUpdate(index) => format!("DIMUPDATE:{index}"),
            Command::DimmerManual { index, active } => {
                let prefix = if *active { "DIMHND" } else { "DIMNUL" };
                format!("{prefix}:{index}")
            }

            Command::ShutterUp(index) => format!("ROLOP:{index}"),
            Command::ShutterDown(index) => format!("ROLNEER:{index}"),
            Command::ShutterStop(index) => format!("ROLSTOP:{index}"),

            Command::RoomDayTemp { index, degrees } => {
                format!("RUIMTEDAGTEMP:{index}:{}", units::degrees_to_wire(*degrees))
            }
            Command::RoomNightTemp { index, degrees } => {
                format!("RUIMTENACHTTEMP:{index}:{}", units::degrees_to_wire(*degrees))
            }
            Command::RoomAircoTemp { index, degrees } => {
                format!("RUIMTEAIRCOTEMP:{index}:{}", units::degrees_to_wire(*degrees))
            }
            Command::RoomCorrection { index, degrees } => format!(
                "RUIMTECORRECTIE:{index}:{}",
                units::degrees_to_correction(*degrees)
            ),
            Command::RoomTempEnabled { index, on } => {
                format!("RUIMTETEMPONOFF:{index}:{}", u8::from(*on))
            }
            Command::RoomTempType { index, kind } => {
                format!("RUIMTETEMPTYPE:{index}:{}", *kind as u8)
            }
            Command::RoomAircoEnabled { index, on } => {
                format!("RUIMTEAIRCOONOFF:{index}:{}", u8::from(*on))
            }
            Command::RoomAircoType { index, kind } => {
                format!("RUIMTEAIRCOTYPE:{index}:{}", *kind as u8)
            }
            Command::CurveStepTime {
                room,
                step,
                hour,
                minute,
            } => format!("VERLOOPTIME:{room}:{step}:{hour}:{minute}"),
            Command::CurveStepTemp {
                room,
                step,
                degrees,
            } => format!(
                "VERLOOPTEMP:{room}:{step}:{}",
                units::degrees_to_wire(*degrees)
            ),

            Command::AlarmActivate(index) => format!("ALACT:{index}"),
            Command::AlarmReset => "ALHST".into(),
            Command::AlarmSilence => "ALSIL".into(),

            Command::AudioSet {
                zone,
                all_zones,
                param,
                value,
                execute,
                lcd_update,
            } => format!(
                "AUINST:{zone}:{}:{}:{}:{}:{}",
                u8::from(*all_zones),
                *param as u8,
                audio_wire_value(*param, *value),
                u8::from(*execute),
                u8::from(*lcd_update)
            ),
            Command::AudioInit => "AUDIOINIT".into(),

            Command::ExecuteScenario(index) => format!("SCENARIO:{index}"),
            Command::SaveScenario(index) => format!("SCENSAVE{index}"),
            Command::TimerTime {
                index,
                day,
                hour,
                minute,
            } => format!("TIMINST:{index}:{day}:{hour}:{minute}"),
            Command::ExecuteInstruction(index) => format!("PROGEXEC:{index}"),

            Command::Ping => "PING".into(),
            Command::Polling(on) => if *on { "POLLON" } else { "POLLOFF" }.into(),
            Command::Broadcast(text) => format!("B:{text}"),
            Command::ClientName(name) => format!("CLIENTNAME:{name}"),

            Command::Count(kind) => table_token(*kind)
                .map(str::to_owned)
                .unwrap_or_default(),
            Command::Describe { kind, index } => match table_token(*kind) {
                Some(table) => format!("{table}:{index}"),
                None => String::new(),
            },
            Command::DescribeCurveStep { room, step } => format!("VERLOOPTAB:{room}:{step}"),
            Command::InstructionText(index) => format!("BUILDPROGTEXT:{index}"),
            Command::InstructionCount => "PROGTAB".into(),
            Command::TelephoneCount => "TELEFOONTAB".into(),
            Command::TelephoneInstruction(index) => format!("TELEFOONTAB:{index}"),
            Command::MasterVersion => "MASTERVERSIE".into(),
            Command::Poll => "POLL".into(),
        }
    }

    /// Check the arguments against the controller's limits.
    pub fn validate(&self) -> Result<()> {
        match self {
            Command::SetState { kind, on, .. } if state_prefix(*kind, *on).is_none() => {
                return Err(IRemoteError::out_of_range(format!(
                    "{kind} has no on/off command"
                )));
            }
            Command::SetAllState { kind, on } if all_state_token(*kind, *on).is_none() => {
                return Err(IRemoteError::out_of_range(format!(
                    "{kind} has no bulk {} command",
                    if *on { "on" } else { "off" }
                )));
            }
            Command::Rename { kind, .. } if rename_prefix(*kind).is_none() => {
                return Err(IRemoteError::out_of_range(format!("{kind} cannot be renamed")));
            }
            Command::Rename { name, .. } => check_ascii("name", name)?,
            Command::Count(kind) | Command::Describe { kind, .. }
                if table_token(*kind).is_none() =>
            {
                return Err(IRemoteError::out_of_range(format!("{kind} has no table")));
            }
            Command::CurveStepTime { hour, minute, .. } => check_time(*hour, *minute)?,
            Command::TimerTime {
                day, hour, minute, ..
            } => {
                if *day > 6 {
                    return Err(IRemoteError::out_of_range(format!("day {day}")));
                }
                check_time(*hour, *minute)?;
            }
            Command::Broadcast(text) => {
                if text.len() > MAX_BROADCAST {
                    return Err(IRemoteError::out_of_range(format!(
                        "broadcast of {} chars exceeds {MAX_BROADCAST}",
                        text.len()
                    )));
                }
                check_ascii("broadcast", text)?;
            }
            Command::ClientName(name) => {
                if name.len() > MAX_CLIENT_NAME {
                    return Err(IRemoteError::out_of_range(format!(
                        "client name of {} chars exceeds {MAX_CLIENT_NAME}",
                        name.len()
                    )));
                }
                check_ascii("client name", name)?;
            }
            _ => {}
        }

        let len = self.token().len();
        if len > FRAME_SIZE {
            return Err(IRemoteError::out_of_range(format!(
                "token of {len} bytes exceeds the {FRAME_SIZE}-byte frame"
            )));
        }
        Ok(())
    }

    /// Returns `true` if the controller answers this command.
    pub fn expects_response(&self) -> bool {
        matches!(
            self,
            Command::Count(_)
                | Command::Describe { .. }
                | Command::DescribeCurveStep { .. }
                | Command::InstructionText(_)
                | Command::InstructionCount
                | Command::TelephoneCount
                | Command::TelephoneInstruction(_)
                | Command::MasterVersion
                | Command::Poll
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

// ── Token tables ─────────────────────────────────────────────────

fn state_prefix(kind: EntityKind, on: bool) -> Option<&'static str> {
    let (on_token, off_token) = match kind {
        EntityKind::Socket => ("STOPAAN", "STOPUIT"),
        EntityKind::Light => ("LAMPAAN", "LAMPUIT"),
        EntityKind::LogVar => ("LOGVARAAN", "LOGVARUIT"),
        EntityKind::Dimmer => ("DIMAAN", "DIMUIT"),
        EntityKind::Alarm => ("ALAAN", "ALUIT"),
        EntityKind::AudioZone => ("AUAAN", "AUUIT"),
        EntityKind::Timer => ("TIMAAN", "TIMUIT"),
        _ => return None,
    };
    Some(if on { on_token } else { off_token })
}

fn all_state_token(kind: EntityKind, on: bool) -> Option<&'static str> {
    match (kind, on) {
        (EntityKind::Socket, true) => Some("STOPALLESAAN"),
        (EntityKind::Socket, false) => Some("STOPALLESUIT"),
        (EntityKind::Light, true) => Some("LAMPALLESAAN"),
        (EntityKind::Light, false) => Some("LAMPALLESUIT"),
        (EntityKind::LogVar, true) => Some("LOGVARALLESAAN"),
        (EntityKind::LogVar, false) => Some("LOGVARALLESUIT"),
        (EntityKind::Dimmer, true) => Some("DIMALLESAAN"),
        (EntityKind::Dimmer, false) => Some("DIMALLESUIT"),
        (EntityKind::AudioZone, true) => Some("AUALLESAAN"),
        (EntityKind::AudioZone, false) => Some("AUALLESUIT"),
        (EntityKind::Alarm, false) => Some("ALALLESUIT"),
        _ => None,
    }
}

fn rename_prefix(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Socket => Some("STOPTEXTUPD"),
        EntityKind::Light => Some("LAMPTEXTUPD"),
        EntityKind::LogVar => Some("LOGVARTEXTUPD"),
        EntityKind::Dimmer => Some("DIMTEXTUPD"),
        EntityKind::Shutter => Some("ROLTEXTUPD"),
        EntityKind::Room => Some("RUIMTETEXTUPD"),
        EntityKind::Alarm => Some("ALTEXTUPD"),
        EntityKind::AudioZone => Some("AUZONTEXTUPD"),
        EntityKind::AudioSource => Some("AUSRCTEXTUPD"),
        EntityKind::Scenario => Some("SCENTEXTUPD"),
        EntityKind::Timer | EntityKind::CurveStep => None,
    }
}

/// Count/describe table of a top-level class.
fn table_token(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Socket => Some("STOPTAB"),
        EntityKind::Light => Some("LAMPTAB"),
        EntityKind::LogVar => Some("LOGVARSTAB"),
        EntityKind::Dimmer => Some("DIMMERTAB"),
        EntityKind::Shutter => Some("ROLTAB"),
        EntityKind::Room => Some("RUIMTETAB"),
        EntityKind::Alarm => Some("ALARMTAB"),
        EntityKind::AudioZone => Some("AUZONTAB"),
        EntityKind::AudioSource => Some("AUSRCTAB"),
        EntityKind::Scenario => Some("SFEERTAB"),
        EntityKind::Timer => Some("TIMERTAB"),
        EntityKind::CurveStep => None,
    }
}

fn audio_wire_value(param: AudioParam, value: i32) -> i32 {
    match param {
        AudioParam::Volume => i32::from(units::volume_to_wire(value)),
        AudioParam::Bass | AudioParam::Treble => i32::from(units::tone_to_wire(value)),
        AudioParam::Mute => i32::from(value != 0),
        AudioParam::InputSource => value.clamp(0, 7),
    }
}

fn check_time(hour: u8, minute: u8) -> Result<()> {
    if hour > 23 {
        return Err(IRemoteError::out_of_range(format!("hour {hour}")));
    }
    if minute > 59 {
        return Err(IRemoteError::out_of_range(format!("minute {minute}")));
    }
    Ok(())
}

fn check_ascii(what: &str, text: &str) -> Result<()> {
    if text.is_ascii() {
        Ok(())
    } else {
        Err(IRemoteError::out_of_range(format!("{what} must be ASCII")))
    }
}
