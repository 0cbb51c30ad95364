//! Mirrored controller entities.
//!
//! Plain value holders: every struct carries its position in its
//! collection (`index`) plus the fields the controller reports for it.

use serde::{Deserialize, Serialize};

use super::kinds::{
    AudioSourceType, RoomAircoType, RoomControlMode, RoomTempType, ScenarioType,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Socket {
    pub index: usize,
    pub name: String,
    pub state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub index: usize,
    pub name: String,
    pub state: bool,
}

/// A logical variable on the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogVar {
    pub index: usize,
    pub name: String,
    pub state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimmer {
    pub index: usize,
    pub name: String,
    /// Level, `0..=100`.
    pub value: u8,
    pub state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shutter {
    pub index: usize,
    pub name: String,
}

/// One point of a room's scheduled temperature profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveStep {
    /// Index of the owning room.
    pub room: usize,
    pub index: usize,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub temperature: f32,
}

/// A room thermostat, with its heating and airco settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub index: usize,
    pub name: String,
    pub temp_correction: f32,
    pub measured_temp: f32,
    pub day_temp: f32,
    pub night_temp: f32,
    pub temp_type: RoomTempType,
    pub temp_enabled: bool,
    pub temp_active: bool,
    pub airco_temp: f32,
    pub airco_type: RoomAircoType,
    pub airco_enabled: bool,
    pub airco_active: bool,
    /// Sensor is an outside probe.
    pub outside: bool,
    pub curve_steps: Vec<CurveStep>,
}

impl Room {
    /// Heating wins over airco; neither enabled means `Off`.
    pub fn control_mode(&self) -> RoomControlMode {
        if self.temp_enabled {
            return match self.temp_type {
                RoomTempType::Day => RoomControlMode::Day,
                RoomTempType::Night => RoomControlMode::Night,
                RoomTempType::Auto => RoomControlMode::Auto,
            };
        }
        if self.airco_enabled {
            return match self.airco_type {
                RoomAircoType::Temperature => RoomControlMode::AircoTemp,
                RoomAircoType::Continuous => RoomControlMode::AircoContinuous,
            };
        }
        RoomControlMode::Off
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub index: usize,
    pub name: String,
    pub active: bool,
    pub was_active: bool,
    pub times_on: u8,
    pub beep: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioZone {
    pub index: usize,
    pub name: String,
    pub state: bool,
    pub mute: bool,
    pub input_source: u8,
    /// dB, `-80..=0`.
    pub volume: i32,
    /// `-12..=12`.
    pub bass: i32,
    /// `-12..=12`.
    pub treble: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSource {
    pub index: usize,
    pub name: String,
    pub kind: AudioSourceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub index: usize,
    pub name: String,
    pub kind: ScenarioType,
    /// Set while the controller is still running the scenario.
    pub busy: bool,
}

/// A weekly timer that runs one instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub index: usize,
    pub instruction: u16,
    pub instruction_text: String,
    /// `0..=6`.
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub state: bool,
}

impl Timer {
    /// Timers have no name of their own on the controller.
    pub const NAME: &'static str = "Timer";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room {
        Room {
            index: 0,
            name: "Living".into(),
            temp_correction: 0.0,
            measured_temp: 20.0,
            day_temp: 21.0,
            night_temp: 17.0,
            temp_type: RoomTempType::Auto,
            temp_enabled: false,
            temp_active: false,
            airco_temp: 24.0,
            airco_type: RoomAircoType::Temperature,
            airco_enabled: false,
            airco_active: false,
            outside: false,
            curve_steps: Vec::new(),
        }
    }

    #[test]
    fn control_mode_off_when_nothing_enabled() {
        assert_eq!(room().control_mode(), RoomControlMode::Off);
    }

    #[test]
    fn heating_takes_precedence_over_airco() {
        let mut r = room();
        r.airco_enabled = true;
        r.airco_type = RoomAircoType::Continuous;
        assert_eq!(r.control_mode(), RoomControlMode::AircoContinuous);

        r.temp_enabled = true;
        r.temp_type = RoomTempType::Night;
        assert_eq!(r.control_mode(), RoomControlMode::Night);
    }
}
