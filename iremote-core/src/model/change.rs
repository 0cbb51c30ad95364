//! Property-level change tracking for poll updates.

use serde::Serialize;

use super::items::{
    Alarm, AudioSource, AudioZone, CurveStep, Dimmer, Light, LogVar, Room, Scenario, Shutter,
    Socket, Timer,
};
use super::kinds::EntityKind;

/// Field names reported in a [`ChangeSet`].
pub mod field {
    pub const NAME: &str = "Name";
    pub const STATE: &str = "State";
    pub const VALUE: &str = "Value";

    pub const ACTIVE: &str = "Active";
    pub const WAS_ACTIVE: &str = "WasActive";
    pub const TIMES_ON: &str = "TimesOn";

    pub const MEASURED_TEMP: &str = "MeasuredTemp";
    pub const DAY_TEMP: &str = "DayTemp";
    pub const NIGHT_TEMP: &str = "NightTemp";
    pub const TEMP_CORRECTION: &str = "TempCorrection";
    pub const TEMP_TYPE: &str = "TempType";
    pub const TEMP_ENABLED: &str = "TempEnabled";
    pub const TEMP_ACTIVE: &str = "TempActive";
    pub const AIRCO_TEMP: &str = "AircoTemp";
    pub const AIRCO_TYPE: &str = "AircoType";
    pub const AIRCO_ENABLED: &str = "AircoEnabled";
    pub const AIRCO_ACTIVE: &str = "AircoActive";

    pub const DAY: &str = "Day";
    pub const HOUR: &str = "Hour";
    pub const MINUTE: &str = "Minute";
    pub const TEMPERATURE: &str = "Temperature";

    pub const MUTE: &str = "Mute";
    pub const INPUT_SOURCE: &str = "InputSource";
    pub const VOLUME: &str = "Volume";
    pub const BASS: &str = "Bass";
    pub const TREBLE: &str = "Treble";

    pub const BUSY: &str = "Busy";
}

// ── ChangeSet ────────────────────────────────────────────────────

/// Ordered, distinct names of the fields one update actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(Vec<&'static str>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite `slot` with `value` and record `field` if they differ.
    pub fn apply<T: PartialEq>(&mut self, field: &'static str, slot: &mut T, value: T) {
        if *slot != value {
            *slot = value;
            self.record(field);
        }
    }

    pub fn record(&mut self, field: &'static str) {
        if !self.0.contains(&field) {
            self.0.push(field);
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| *f == field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.0
    }
}

// ── ItemChange ───────────────────────────────────────────────────

/// Snapshot of the entity an update touched, taken after applying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum ChangedItem {
    Socket(Socket),
    Light(Light),
    LogVar(LogVar),
    Dimmer(Dimmer),
    Shutter(Shutter),
    Room(Room),
    CurveStep(CurveStep),
    Alarm(Alarm),
    AudioZone(AudioZone),
    AudioSource(AudioSource),
    Scenario(Scenario),
    Timer(Timer),
}

impl ChangedItem {
    pub fn kind(&self) -> EntityKind {
        match self {
            ChangedItem::Socket(_) => EntityKind::Socket,
            ChangedItem::Light(_) => EntityKind::Light,
            ChangedItem::LogVar(_) => EntityKind::LogVar,
            ChangedItem::Dimmer(_) => EntityKind::Dimmer,
            ChangedItem::Shutter(_) => EntityKind::Shutter,
            ChangedItem::Room(_) => EntityKind::Room,
            ChangedItem::CurveStep(_) => EntityKind::CurveStep,
            ChangedItem::Alarm(_) => EntityKind::Alarm,
            ChangedItem::AudioZone(_) => EntityKind::AudioZone,
            ChangedItem::AudioSource(_) => EntityKind::AudioSource,
            ChangedItem::Scenario(_) => EntityKind::Scenario,
            ChangedItem::Timer(_) => EntityKind::Timer,
        }
    }

    /// Position of the entity in its collection (the step index for
    /// curve steps).
    pub fn index(&self) -> usize {
        match self {
            ChangedItem::Socket(i) => i.index,
            ChangedItem::Light(i) => i.index,
            ChangedItem::LogVar(i) => i.index,
            ChangedItem::Dimmer(i) => i.index,
            ChangedItem::Shutter(i) => i.index,
            ChangedItem::Room(i) => i.index,
            ChangedItem::CurveStep(i) => i.index,
            ChangedItem::Alarm(i) => i.index,
            ChangedItem::AudioZone(i) => i.index,
            ChangedItem::AudioSource(i) => i.index,
            ChangedItem::Scenario(i) => i.index,
            ChangedItem::Timer(i) => i.index,
        }
    }
}

/// One change notification: the entity plus the fields that changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemChange {
    pub item: ChangedItem,
    pub fields: ChangeSet,
}

// ── ControllerNotice ─────────────────────────────────────────────

/// Poll messages that concern the controller rather than an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum ControllerNotice {
    ClockChanged { hour: u8, minute: u8 },
    AudioInit { ok: bool },
    Broadcast { from: String, text: String },
    ServerShutdown,
    MasterInit,
    MasterLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_records_only_differences() {
        let mut changes = ChangeSet::new();
        let mut state = false;
        let mut value = 40u8;

        changes.apply(field::STATE, &mut state, true);
        changes.apply(field::VALUE, &mut value, 40);

        assert!(state);
        assert_eq!(changes.fields(), &[field::STATE]);
    }

    #[test]
    fn record_keeps_first_position() {
        let mut changes = ChangeSet::new();
        changes.record(field::HOUR);
        changes.record(field::MINUTE);
        changes.record(field::HOUR);
        assert_eq!(changes.fields(), &[field::HOUR, field::MINUTE]);
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn change_serializes_with_kind_tag() {
        let change = ItemChange {
            item: ChangedItem::Light(Light {
                index: 0,
                name: "Hall".into(),
                state: false,
            }),
            fields: {
                let mut c = ChangeSet::new();
                c.record(field::STATE);
                c
            },
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["item"]["kind"], "light");
        assert_eq!(json["item"]["item"]["name"], "Hall");
        assert_eq!(json["fields"][0], "State");
    }
}
