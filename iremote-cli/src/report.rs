//! Human-readable and JSON rendering of snapshots and session events.

use std::fmt::Write as _;

use iremote_core::{ChangedItem, ControllerNotice, Mirror, SessionEvent, Timer};

/// One line per entity class with its count, followed by every named
/// entity.
pub fn snapshot(mirror: &Mirror) -> String {
    let mut out = String::new();
    let mut section = |title: &str, names: Vec<String>| {
        let _ = writeln!(out, "{title} ({})", names.len());
        for (index, name) in names.iter().enumerate() {
            let _ = writeln!(out, "  [{index}] {name}");
        }
    };

    section("sockets", mirror.sockets.iter().map(|s| on_off(&s.name, s.state)).collect());
    section("lights", mirror.lights.iter().map(|l| on_off(&l.name, l.state)).collect());
    section("logvars", mirror.logvars.iter().map(|v| on_off(&v.name, v.state)).collect());
    section(
        "dimmers",
        mirror
            .dimmers
            .iter()
            .map(|d| format!("{} {}% {}", d.name, d.value, state(d.state)))
            .collect(),
    );
    section("shutters", mirror.shutters.iter().map(|s| s.name.clone()).collect());
    section(
        "rooms",
        mirror
            .rooms
            .iter()
            .map(|r| format!("{} {:.1}°C {:?}", r.name, r.measured_temp, r.control_mode()))
            .collect(),
    );
    section("alarms", mirror.alarms.iter().map(|a| on_off(&a.name, a.active)).collect());
    section(
        "audio zones",
        mirror
            .audio_zones
            .iter()
            .map(|z| format!("{} {} {} dB", z.name, state(z.state), z.volume))
            .collect(),
    );
    section(
        "audio sources",
        mirror
            .audio_sources
            .iter()
            .map(|s| format!("{} {:?}", s.name, s.kind))
            .collect(),
    );
    section("scenarios", mirror.scenarios.iter().map(|s| s.name.clone()).collect());
    section(
        "timers",
        mirror
            .timers
            .iter()
            .map(|t| {
                format!(
                    "day {} {:02}:{:02} {} ({})",
                    t.day,
                    t.hour,
                    t.minute,
                    t.instruction_text,
                    state(t.state)
                )
            })
            .collect(),
    );
    out
}

/// One line describing an event.
pub fn event_line(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Status(status) => format!("status: {status}"),
        SessionEvent::Changed(change) => format!(
            "{} {} ({}): {}",
            change.item.kind(),
            change.item.index(),
            label(&change.item),
            change.fields.fields().join(", ")
        ),
        SessionEvent::Notice(notice) => match notice {
            ControllerNotice::ClockChanged { hour, minute } => {
                format!("clock: {hour:02}:{minute:02}")
            }
            ControllerNotice::AudioInit { ok: true } => "audio init: ok".into(),
            ControllerNotice::AudioInit { ok: false } => "audio init: failed".into(),
            ControllerNotice::Broadcast { from, text } => format!("message from {from}: {text}"),
            ControllerNotice::ServerShutdown => "controller shutting down".into(),
            ControllerNotice::MasterInit => "master initialising".into(),
            ControllerNotice::MasterLost => "master lost".into(),
        },
    }
}

/// One JSON object per event.
pub fn event_json(event: &SessionEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

fn label(item: &ChangedItem) -> String {
    match item {
        ChangedItem::Socket(i) => i.name.clone(),
        ChangedItem::Light(i) => i.name.clone(),
        ChangedItem::LogVar(i) => i.name.clone(),
        ChangedItem::Dimmer(i) => i.name.clone(),
        ChangedItem::Shutter(i) => i.name.clone(),
        ChangedItem::Room(i) => i.name.clone(),
        ChangedItem::CurveStep(i) => format!("room {}", i.room),
        ChangedItem::Alarm(i) => i.name.clone(),
        ChangedItem::AudioZone(i) => i.name.clone(),
        ChangedItem::AudioSource(i) => i.name.clone(),
        ChangedItem::Scenario(i) => i.name.clone(),
        ChangedItem::Timer(_) => Timer::NAME.into(),
    }
}

fn state(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn on_off(name: &str, on: bool) -> String {
    format!("{name} {}", state(on))
}
