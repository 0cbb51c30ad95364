//! Small enumerations carried by mirrored entities.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── EntityKind ───────────────────────────────────────────────────

/// The mirrored collections, in download order, plus the nested
/// per-room curve steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Socket,
    Light,
    LogVar,
    Dimmer,
    Shutter,
    Room,
    Alarm,
    AudioZone,
    AudioSource,
    Scenario,
    Timer,
    CurveStep,
}

impl EntityKind {
    /// The eleven top-level classes in the order they are downloaded.
    pub const DOWNLOAD_ORDER: [EntityKind; 11] = [
        EntityKind::Socket,
        EntityKind::Light,
        EntityKind::LogVar,
        EntityKind::Dimmer,
        EntityKind::Shutter,
        EntityKind::Room,
        EntityKind::Alarm,
        EntityKind::AudioZone,
        EntityKind::AudioSource,
        EntityKind::Scenario,
        EntityKind::Timer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Socket => "socket",
            EntityKind::Light => "light",
            EntityKind::LogVar => "logvar",
            EntityKind::Dimmer => "dimmer",
            EntityKind::Shutter => "shutter",
            EntityKind::Room => "room",
            EntityKind::Alarm => "alarm",
            EntityKind::AudioZone => "audio zone",
            EntityKind::AudioSource => "audio source",
            EntityKind::Scenario => "scenario",
            EntityKind::Timer => "timer",
            EntityKind::CurveStep => "curve step",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Rooms ────────────────────────────────────────────────────────

/// Which set-point drives a room's heating.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomTempType {
    Day = 1,
    Night = 2,
    Auto = 3,
}

impl RoomTempType {
    /// Decode the controller byte; `0` and unknown values mean `Auto`.
    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => RoomTempType::Day,
            2 => RoomTempType::Night,
            _ => RoomTempType::Auto,
        }
    }
}

/// How a room's air conditioning runs.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomAircoType {
    Temperature = 1,
    Continuous = 2,
}

impl RoomAircoType {
    pub fn from_wire(value: u8) -> Self {
        match value {
            2 => RoomAircoType::Continuous,
            _ => RoomAircoType::Temperature,
        }
    }
}

/// Combined view of a room's heating and airco settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomControlMode {
    Off,
    Day,
    Night,
    Auto,
    AircoTemp,
    AircoContinuous,
}

// ── Audio ────────────────────────────────────────────────────────

/// Audio zone parameters addressed by `AUINST`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioParam {
    Volume = 0,
    Bass = 1,
    Treble = 2,
    Mute = 3,
    InputSource = 4,
}

/// Device type of an audio source.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioSourceType {
    Cd = 0,
    Dvd = 1,
    Phono = 2,
    Vcr = 3,
    Cassette = 4,
    MiniDisc = 5,
    Mp3 = 6,
    Tuner = 7,
    Tv = 8,
    Satellite = 9,
    Camera = 10,
    Pc = 11,
    Aux = 12,
    Free13 = 13,
    Free14 = 14,
    Free15 = 15,
}

impl AudioSourceType {
    /// Decode the low nibble of the controller byte.
    pub fn from_wire(value: u8) -> Self {
        match value & 0x0F {
            0 => AudioSourceType::Cd,
            1 => AudioSourceType::Dvd,
            2 => AudioSourceType::Phono,
            3 => AudioSourceType::Vcr,
            4 => AudioSourceType::Cassette,
            5 => AudioSourceType::MiniDisc,
            6 => AudioSourceType::Mp3,
            7 => AudioSourceType::Tuner,
            8 => AudioSourceType::Tv,
            9 => AudioSourceType::Satellite,
            10 => AudioSourceType::Camera,
            11 => AudioSourceType::Pc,
            12 => AudioSourceType::Aux,
            13 => AudioSourceType::Free13,
            14 => AudioSourceType::Free14,
            _ => AudioSourceType::Free15,
        }
    }
}

// ── Scenarios ────────────────────────────────────────────────────

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioType {
    Once = 0,
    Repeated = 1,
}

impl ScenarioType {
    pub fn from_wire(value: u8) -> Self {
        if value == 1 {
            ScenarioType::Repeated
        } else {
            ScenarioType::Once
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_temp_type_zero_is_auto() {
        assert_eq!(RoomTempType::from_wire(0), RoomTempType::Auto);
        assert_eq!(RoomTempType::from_wire(1), RoomTempType::Day);
        assert_eq!(RoomTempType::from_wire(2), RoomTempType::Night);
    }

    #[test]
    fn audio_source_uses_low_nibble() {
        assert_eq!(AudioSourceType::from_wire(0x17), AudioSourceType::Tuner);
        assert_eq!(AudioSourceType::from_wire(12), AudioSourceType::Aux);
    }

    #[test]
    fn download_order_has_eleven_classes() {
        assert_eq!(EntityKind::DOWNLOAD_ORDER.len(), 11);
        assert!(!EntityKind::DOWNLOAD_ORDER.contains(&EntityKind::CurveStep));
    }
}
