//! Describe record layouts.
//!
//! ## Wire format
//!
//! All multi-byte integers are big-endian. `t16` is a temperature byte
//! pair (`hi` non-zero adds 0x100 to `lo`).
//!
//! ```text
//! socket, light, logvar:  state u8                          (1)
//! dimmer:                 value u8, state u8                (2)
//! shutter:                (nothing after the name)          (0)
//! room:                   correction u8, measured t16,
//!                         day t16, night t16, tempType u8,
//!                         tempEnabled u8, tempActive u8,
//!                         airco t16, aircoType u8,
//!                         aircoEnabled u8, aircoActive u8,
//!                         curveSteps u16, outside u8        (18)
//! curve step (no name):   day u8, hour u8, minute u8, t16   (5)
//! alarm:                  active, wasActive, timesOn, beep  (4)
//! audio zone:             state, mute, inputSource,
//!                         volume, bass, treble              (6)
//! audio source:           type u8                           (1)
//! scenario:               type u8                           (1)
//! timer (no name):        instruction u16, day, hour,
//!                         minute, state                     (6)
//! ```

use bytes::Buf;

use crate::codec::units;
use crate::error::{IRemoteError, Result};
use crate::model::{
    Alarm, AudioSource, AudioSourceType, AudioZone, CurveStep, Dimmer, Light, LogVar, Room,
    RoomAircoType, RoomTempType, Scenario, ScenarioType, Shutter, Socket, Timer,
};

pub const SWITCH_LEN: usize = 1;
pub const DIMMER_LEN: usize = 2;
pub const SHUTTER_LEN: usize = 0;
pub const ROOM_LEN: usize = 18;
pub const CURVE_STEP_LEN: usize = 5;
pub const ALARM_LEN: usize = 4;
pub const AUDIO_ZONE_LEN: usize = 6;
pub const AUDIO_SOURCE_LEN: usize = 1;
pub const SCENARIO_LEN: usize = 1;
pub const TIMER_LEN: usize = 6;

/// A decoded room plus the number of curve steps still to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomRecord {
    pub room: Room,
    pub curve_steps: u16,
}

fn ensure(buf: &impl Buf, len: usize, what: &str) -> Result<()> {
    if buf.remaining() < len {
        return Err(IRemoteError::invalid_data(format!(
            "{what} record too short: {} < {len}",
            buf.remaining()
        )));
    }
    Ok(())
}

fn get_bool(buf: &mut impl Buf) -> bool {
    buf.get_u8() != 0
}

fn get_temp(buf: &mut impl Buf) -> f32 {
    let hi = buf.get_u8();
    let lo = buf.get_u8();
    units::wire_pair_to_degrees(hi, lo)
}

pub fn socket(index: usize, name: String, buf: &mut impl Buf) -> Result<Socket> {
    ensure(buf, SWITCH_LEN, "socket")?;
    Ok(Socket {
        index,
        name,
        state: get_bool(buf),
    })
}

pub fn light(index: usize, name: String, buf: &mut impl Buf) -> Result<Light> {
    ensure(buf, SWITCH_LEN, "light")?;
    Ok(Light {
        index,
        name,
        state: get_bool(buf),
    })
}

pub fn logvar(index: usize, name: String, buf: &mut impl Buf) -> Result<LogVar> {
    ensure(buf, SWITCH_LEN, "logvar")?;
    Ok(LogVar {
        index,
        name,
        state: get_bool(buf),
    })
}

pub fn dimmer(index: usize, name: String, buf: &mut impl Buf) -> Result<Dimmer> {
    ensure(buf, DIMMER_LEN, "dimmer")?;
    Ok(Dimmer {
        index,
        name,
        value: buf.get_u8(),
        state: get_bool(buf),
    })
}

pub fn shutter(index: usize, name: String) -> Shutter {
    Shutter { index, name }
}

pub fn room(index: usize, name: String, buf: &mut impl Buf) -> Result<RoomRecord> {
    ensure(buf, ROOM_LEN, "room")?;
    let temp_correction = units::correction_to_degrees(buf.get_u8());
    let measured_temp = get_temp(buf);
    let day_temp = get_temp(buf);
    let night_temp = get_temp(buf);
    let temp_type = RoomTempType::from_wire(buf.get_u8());
    let temp_enabled = get_bool(buf);
    let temp_active = get_bool(buf);
    let airco_temp = get_temp(buf);
    let airco_type = RoomAircoType::from_wire(buf.get_u8());
    let airco_enabled = get_bool(buf);
    let airco_active = get_bool(buf);
    let curve_steps = buf.get_u16();
    let outside = get_bool(buf);

    Ok(RoomRecord {
        room: Room {
            index,
            name,
            temp_correction,
            measured_temp,
            day_temp,
            night_temp,
            temp_type,
            temp_enabled,
            temp_active,
            airco_temp,
            airco_type,
            airco_enabled,
            airco_active,
            outside,
            curve_steps: Vec::with_capacity(usize::from(curve_steps)),
        },
        curve_steps,
    })
}

pub fn curve_step(room: usize, index: usize, buf: &mut impl Buf) -> Result<CurveStep> {
    ensure(buf, CURVE_STEP_LEN, "curve step")?;
    Ok(CurveStep {
        room,
        index,
        day: buf.get_u8(),
        hour: buf.get_u8(),
        minute: buf.get_u8(),
        temperature: get_temp(buf),
    })
}

pub fn alarm(index: usize, name: String, buf: &mut impl Buf) -> Result<Alarm> {
    ensure(buf, ALARM_LEN, "alarm")?;
    Ok(Alarm {
        index,
        name,
        active: get_bool(buf),
        was_active: get_bool(buf),
        times_on: buf.get_u8(),
        beep: get_bool(buf),
    })
}

pub fn audio_zone(index: usize, name: String, buf: &mut impl Buf) -> Result<AudioZone> {
    ensure(buf, AUDIO_ZONE_LEN, "audio zone")?;
    Ok(AudioZone {
        index,
        name,
        state: get_bool(buf),
        mute: get_bool(buf),
        input_source: buf.get_u8(),
        volume: units::wire_to_volume(buf.get_u8()),
        bass: units::wire_to_tone(buf.get_u8()),
        treble: units::wire_to_tone(buf.get_u8()),
    })
}

pub fn audio_source(index: usize, name: String, buf: &mut impl Buf) -> Result<AudioSource> {
    ensure(buf, AUDIO_SOURCE_LEN, "audio source")?;
    Ok(AudioSource {
        index,
        name,
        kind: AudioSourceType::from_wire(buf.get_u8()),
    })
}

pub fn scenario(index: usize, name: String, buf: &mut impl Buf) -> Result<Scenario> {
    ensure(buf, SCENARIO_LEN, "scenario")?;
    Ok(Scenario {
        index,
        name,
        kind: ScenarioType::from_wire(buf.get_u8()),
        busy: false,
    })
}

/// Decode a timer; its instruction text is resolved separately.
pub fn timer(index: usize, buf: &mut impl Buf) -> Result<Timer> {
    ensure(buf, TIMER_LEN, "timer")?;
    Ok(Timer {
        index,
        instruction: buf.get_u16(),
        instruction_text: String::new(),
        day: buf.get_u8(),
        hour: buf.get_u8(),
        minute: buf.get_u8(),
        state: get_bool(buf),
    })
}
