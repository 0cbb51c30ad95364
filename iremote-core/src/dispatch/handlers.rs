//! One handler per poll message tag.
//!
//! Every handler parses all of its arguments before touching the mirror,
//! so a malformed message never leaves an entity half-updated.

use std::collections::HashMap;

use super::{DispatchState, Handler, Outcome, PollMessage};
use crate::codec::units;
use crate::error::{IRemoteError, Result};
use crate::model::{
    Alarm, AudioSource, AudioZone, ChangeSet, ChangedItem, ControllerNotice, CurveStep, Dimmer,
    Entity, ItemChange, Light, LogVar, Mirror, Named, Room, RoomAircoType, RoomTempType,
    Scenario, Shutter, Socket, Timer, field,
};

/// Tags the controller sends that need no action.
const IGNORED: &[&str] = &[
    "INSTRNROK",
    "ALARMNROK",
    "ALARMOFF",
    "ALSIL",
    "ARESET",
    "AUDIONROK",
    "OK",
    "ROOMNROK",
    "TIMERADDED",
    "TIMERNROK",
    "TIMERREMOVED",
];

pub(super) fn table() -> HashMap<&'static str, Handler> {
    let mut t: HashMap<&'static str, Handler> = HashMap::new();

    // ── Switches ─────────────────────────────────────────────────
    t.insert("SCHANGED", socket_state);
    t.insert("LCHANGED", light_state);
    t.insert("VCHANGED", logvar_state);
    t.insert("DCHANGED", dimmer_changed);

    // ── Names ────────────────────────────────────────────────────
    t.insert("SOCKETTEXTUPD", rename::<Socket>);
    t.insert("LIGHTTEXTUPD", rename::<Light>);
    t.insert("LOGVARTEXTUPD", rename::<LogVar>);
    t.insert("DIMMERTEXTUPD", rename::<Dimmer>);
    t.insert("SHUTTERTEXTUPD", rename::<Shutter>);
    t.insert("ROOMTEXTUPD", rename::<Room>);
    t.insert("ALARMTEXTUPD", rename::<Alarm>);
    t.insert("AUZONTEXTUPD", rename::<AudioZone>);
    t.insert("AUSRCTEXTUPD", rename::<AudioSource>);
    t.insert("SCENTEXTUPD", rename::<Scenario>);

    // ── Alarms ───────────────────────────────────────────────────
    t.insert("ACHANGED", alarm_changed);

    // ── Rooms ────────────────────────────────────────────────────
    t.insert("TCHANGED", room_measured_temp);
    t.insert("TDCHANGED", room_day_temp);
    t.insert("TNCHANGED", room_night_temp);
    t.insert("TCCHANGED", room_correction);
    t.insert("TTCHANGED", room_temp_type);
    t.insert("TONOFFCHANGED", room_temp_enabled);
    t.insert("TSCHANGED", room_temp_active);
    t.insert("AIRCOCHANGED", room_airco_temp);
    t.insert("AIRCOTCHANGED", room_airco_type);
    t.insert("AIRCOONOFFCHANGED", room_airco_enabled);
    t.insert("ASCHANGED", room_airco_active);
    t.insert("TATIMCHANGED", curve_step_time);
    t.insert("TATMPCHANGED", curve_step_temp);

    // ── Audio ────────────────────────────────────────────────────
    t.insert("AU_ONOFFCHANGED", audio_state);
    t.insert("AU_MUTECHANGED", audio_mute);
    t.insert("AU_SRCCHANGED", audio_source);
    t.insert("AU_VOLCHANGED", audio_volume);
    t.insert("AU_BASCHANGED", audio_bass);
    t.insert("AU_TRECHANGED", audio_treble);

    // ── Timers and scenarios ─────────────────────────────────────
    t.insert("TIMCHANGED", timer_time);
    t.insert("TIMONOFFCHANGED", timer_state);
    t.insert("SCENNROK", scenario_done);

    // ── Controller ───────────────────────────────────────────────
    t.insert("CLKCHANGED", clock_changed);
    t.insert("AUDIOINIT", audio_init);
    t.insert("CLIENTNAME", client_name);
    t.insert("B", broadcast);
    t.insert("GOODBYE", goodbye);
    t.insert("MASTERINIT", master_init);
    t.insert("MASTERLOST", master_lost);
    t.insert("ALLCHANGED", all_changed);

    for &tag in IGNORED {
        t.insert(tag, ignore);
    }
    t
}

// ── Helpers ──────────────────────────────────────────────────────

/// Apply `update` to one entity and report the fields it changed.
fn update<T: Entity>(
    mirror: &mut Mirror,
    index: i64,
    apply: impl FnOnce(&mut T, &mut ChangeSet),
) -> Result<Outcome> {
    let item = mirror.entity_mut::<T>(index)?;
    let mut changes = ChangeSet::new();
    apply(&mut *item, &mut changes);
    Ok(changed(item.changed(), changes))
}

/// Single-field variant of [`update`].
fn set<T: Entity, V: PartialEq>(
    mirror: &mut Mirror,
    index: i64,
    name: &'static str,
    value: V,
    slot: impl FnOnce(&mut T) -> &mut V,
) -> Result<Outcome> {
    update::<T>(mirror, index, |item, c| c.apply(name, slot(item), value))
}

fn changed(item: ChangedItem, fields: ChangeSet) -> Outcome {
    if fields.is_empty() {
        Outcome::Unchanged
    } else {
        Outcome::Changed(ItemChange { item, fields })
    }
}

fn room_temp(msg: &PollMessage<'_>) -> Result<f32> {
    Ok(units::wire_to_degrees(msg.number::<u16>(1)?))
}

// ── Switches ─────────────────────────────────────────────────────

fn socket_state(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let state = msg.flag(1)?;
    set::<Socket, _>(m, msg.index(), field::STATE, state, |s| &mut s.state)
}

fn light_state(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let state = msg.flag(1)?;
    set::<Light, _>(m, msg.index(), field::STATE, state, |l| &mut l.state)
}

fn logvar_state(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let state = msg.flag(1)?;
    set::<LogVar, _>(m, msg.index(), field::STATE, state, |v| &mut v.state)
}

fn dimmer_changed(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let value = msg.number::<u8>(1)?;
    let state = msg.flag(2)?;
    update::<Dimmer>(m, msg.index(), |d, c| {
        c.apply(field::VALUE, &mut d.value, value);
        c.apply(field::STATE, &mut d.state, state);
    })
}

fn rename<T: Entity + Named>(
    m: &mut Mirror,
    msg: &PollMessage<'_>,
    _: &mut DispatchState,
) -> Result<Outcome> {
    let name = msg.text(1)?;
    set::<T, _>(m, msg.index(), field::NAME, name, |e| e.name_mut())
}

// ── Alarms ───────────────────────────────────────────────────────

fn alarm_changed(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let active = msg.flag(1)?;
    let was_active = msg.flag(2)?;
    let times_on = msg.number::<u8>(3)?;
    update::<Alarm>(m, msg.index(), |a, c| {
        c.apply(field::ACTIVE, &mut a.active, active);
        c.apply(field::WAS_ACTIVE, &mut a.was_active, was_active);
        c.apply(field::TIMES_ON, &mut a.times_on, times_on);
    })
}

// ── Rooms ────────────────────────────────────────────────────────

fn room_measured_temp(
    m: &mut Mirror,
    msg: &PollMessage<'_>,
    _: &mut DispatchState,
) -> Result<Outcome> {
    let t = room_temp(msg)?;
    set::<Room, _>(m, msg.index(), field::MEASURED_TEMP, t, |r| &mut r.measured_temp)
}

fn room_day_temp(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let t = room_temp(msg)?;
    set::<Room, _>(m, msg.index(), field::DAY_TEMP, t, |r| &mut r.day_temp)
}

fn room_night_temp(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let t = room_temp(msg)?;
    set::<Room, _>(m, msg.index(), field::NIGHT_TEMP, t, |r| &mut r.night_temp)
}

fn room_correction(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let c = units::correction_to_degrees(msg.number::<u8>(1)?);
    set::<Room, _>(m, msg.index(), field::TEMP_CORRECTION, c, |r| &mut r.temp_correction)
}

fn room_temp_type(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let kind = RoomTempType::from_wire(msg.number::<u8>(1)?);
    set::<Room, _>(m, msg.index(), field::TEMP_TYPE, kind, |r| &mut r.temp_type)
}

fn room_temp_enabled(
    m: &mut Mirror,
    msg: &PollMessage<'_>,
    _: &mut DispatchState,
) -> Result<Outcome> {
    let on = msg.flag(1)?;
    set::<Room, _>(m, msg.index(), field::TEMP_ENABLED, on, |r| &mut r.temp_enabled)
}

fn room_temp_active(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let on = msg.flag(1)?;
    set::<Room, _>(m, msg.index(), field::TEMP_ACTIVE, on, |r| &mut r.temp_active)
}

fn room_airco_temp(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let t = room_temp(msg)?;
    set::<Room, _>(m, msg.index(), field::AIRCO_TEMP, t, |r| &mut r.airco_temp)
}

fn room_airco_type(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let kind = RoomAircoType::from_wire(msg.number::<u8>(1)?);
    set::<Room, _>(m, msg.index(), field::AIRCO_TYPE, kind, |r| &mut r.airco_type)
}

fn room_airco_enabled(
    m: &mut Mirror,
    msg: &PollMessage<'_>,
    _: &mut DispatchState,
) -> Result<Outcome> {
    let on = msg.flag(1)?;
    set::<Room, _>(m, msg.index(), field::AIRCO_ENABLED, on, |r| &mut r.airco_enabled)
}

fn room_airco_active(
    m: &mut Mirror,
    msg: &PollMessage<'_>,
    _: &mut DispatchState,
) -> Result<Outcome> {
    let on = msg.flag(1)?;
    set::<Room, _>(m, msg.index(), field::AIRCO_ACTIVE, on, |r| &mut r.airco_active)
}

/// Run `update` on curve step `step` of room `room`.
fn update_curve_step(
    m: &mut Mirror,
    room: i64,
    step: i64,
    apply: impl FnOnce(&mut CurveStep, &mut ChangeSet),
) -> Result<Outcome> {
    let room = m.entity_mut::<Room>(room)?;
    let len = room.curve_steps.len();
    let step = usize::try_from(step)
        .ok()
        .filter(|&s| s < len)
        .ok_or(IRemoteError::ProtocolInconsistency {
            kind: "curve step",
            index: step,
            len,
        })?;
    let curve_step = &mut room.curve_steps[step];
    let mut changes = ChangeSet::new();
    apply(&mut *curve_step, &mut changes);
    Ok(changed(ChangedItem::CurveStep(curve_step.clone()), changes))
}

fn curve_step_time(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let step = msg.number::<i64>(1)?;
    let hour = msg.number::<u8>(2)?;
    let minute = msg.number::<u8>(3)?;
    update_curve_step(m, msg.index(), step, |s, c| {
        c.apply(field::HOUR, &mut s.hour, hour);
        c.apply(field::MINUTE, &mut s.minute, minute);
    })
}

fn curve_step_temp(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let step = msg.number::<i64>(1)?;
    let t = units::wire_to_degrees(msg.number::<u16>(2)?);
    update_curve_step(m, msg.index(), step, |s, c| {
        c.apply(field::TEMPERATURE, &mut s.temperature, t);
    })
}

// ── Audio ────────────────────────────────────────────────────────

fn audio_state(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let on = msg.flag(1)?;
    set::<AudioZone, _>(m, msg.index(), field::STATE, on, |z| &mut z.state)
}

fn audio_mute(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let on = msg.flag(1)?;
    set::<AudioZone, _>(m, msg.index(), field::MUTE, on, |z| &mut z.mute)
}

fn audio_source(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let source = msg.number::<u8>(1)?;
    set::<AudioZone, _>(m, msg.index(), field::INPUT_SOURCE, source, |z| {
        &mut z.input_source
    })
}

fn audio_volume(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let volume = units::wire_to_volume(msg.number::<u8>(1)?);
    set::<AudioZone, _>(m, msg.index(), field::VOLUME, volume, |z| &mut z.volume)
}

fn audio_bass(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let bass = units::wire_to_tone(msg.number::<u8>(1)?);
    set::<AudioZone, _>(m, msg.index(), field::BASS, bass, |z| &mut z.bass)
}

fn audio_treble(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let treble = units::wire_to_tone(msg.number::<u8>(1)?);
    set::<AudioZone, _>(m, msg.index(), field::TREBLE, treble, |z| &mut z.treble)
}

// ── Timers and scenarios ─────────────────────────────────────────

fn timer_time(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let day = msg.number::<u8>(1)?;
    let hour = msg.number::<u8>(2)?;
    let minute = msg.number::<u8>(3)?;
    update::<Timer>(m, msg.index(), |t, c| {
        c.apply(field::DAY, &mut t.day, day);
        c.apply(field::HOUR, &mut t.hour, hour);
        c.apply(field::MINUTE, &mut t.minute, minute);
    })
}

fn timer_state(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let on = msg.flag(1)?;
    set::<Timer, _>(m, msg.index(), field::STATE, on, |t| &mut t.state)
}

fn scenario_done(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    set::<Scenario, _>(m, msg.index(), field::BUSY, false, |s| &mut s.busy)
}

// ── Controller ───────────────────────────────────────────────────

fn clock_changed(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let hour = msg.number::<u8>(0)?;
    let minute = msg.number::<u8>(1)?;
    m.clock = Some((hour, minute));
    Ok(Outcome::Notice(ControllerNotice::ClockChanged { hour, minute }))
}

fn audio_init(m: &mut Mirror, msg: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    let ok = msg.flag(0)?;
    m.audio_init_ok = ok;
    Ok(Outcome::Notice(ControllerNotice::AudioInit { ok }))
}

fn client_name(_: &mut Mirror, msg: &PollMessage<'_>, s: &mut DispatchState) -> Result<Outcome> {
    s.broadcast_from = msg.text(0)?;
    Ok(Outcome::Ignored)
}

fn broadcast(_: &mut Mirror, msg: &PollMessage<'_>, s: &mut DispatchState) -> Result<Outcome> {
    let text = msg.text(0)?;
    Ok(Outcome::Notice(ControllerNotice::Broadcast {
        from: s.broadcast_from.clone(),
        text,
    }))
}

fn goodbye(_: &mut Mirror, _: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    Ok(Outcome::Notice(ControllerNotice::ServerShutdown))
}

fn master_init(_: &mut Mirror, _: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    Ok(Outcome::Notice(ControllerNotice::MasterInit))
}

fn master_lost(_: &mut Mirror, _: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    Ok(Outcome::Notice(ControllerNotice::MasterLost))
}

fn all_changed(_: &mut Mirror, _: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    Ok(Outcome::ConfigChanged)
}

fn ignore(_: &mut Mirror, _: &PollMessage<'_>, _: &mut DispatchState) -> Result<Outcome> {
    Ok(Outcome::Ignored)
}
