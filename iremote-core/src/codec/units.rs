//! Engineering-unit conversions for values embedded in requests,
//! describe records and poll messages.
//!
//! Temperatures travel as half-degree steps in a 9-bit value: the low
//! byte is an 8-bit two's-complement count, the ninth bit flags a
//! negative reading.

/// Lowest temperature the controller represents, in °C.
pub const MIN_DEGREES: f32 = -55.0;
/// Highest temperature the controller represents, in °C.
pub const MAX_DEGREES: f32 = 125.0;

/// Room temperature correction bounds, in °C.
pub const MAX_CORRECTION: f32 = 7.5;

/// Audio volume bounds, in dB.
pub const MIN_VOLUME: i32 = -80;
pub const MAX_VOLUME: i32 = 0;

/// Audio bass/treble bounds.
pub const MIN_TONE: i32 = -12;
pub const MAX_TONE: i32 = 12;

/// Convert degrees Celsius to the controller's temperature value.
pub fn degrees_to_wire(degrees: f32) -> u16 {
    let halves = (degrees.clamp(MIN_DEGREES, MAX_DEGREES) * 2.0) as i32;
    if halves >= 0 {
        return halves as u16;
    }
    (256 + (((-halves - 1) ^ 0xFF) & 0xFF)) as u16
}

/// Convert a controller temperature value to degrees Celsius.
pub fn wire_to_degrees(value: u16) -> f32 {
    let halves = if value >= 0x100 {
        i32::from((value & 0xFF) as u8 as i8)
    } else {
        i32::from(value)
    };
    halves as f32 / 2.0
}

/// Convert a describe-record temperature byte pair to degrees Celsius.
pub fn wire_pair_to_degrees(hi: u8, lo: u8) -> f32 {
    let value = u16::from(lo) + if hi != 0 { 0x100 } else { 0 };
    wire_to_degrees(value)
}

/// Convert a correction byte to degrees, in `[-7.5, 7.5]` by half steps.
pub fn correction_to_degrees(correction: u8) -> f32 {
    f32::from(correction) / 2.0 - MAX_CORRECTION
}

/// Convert a correction in degrees to the byte the controller expects.
pub fn degrees_to_correction(degrees: f32) -> u8 {
    let clamped = degrees.clamp(-MAX_CORRECTION, MAX_CORRECTION);
    ((clamped * 2.0) as i32 + 15) as u8
}

/// Convert an audio volume byte to dB.
pub fn wire_to_volume(value: u8) -> i32 {
    MIN_VOLUME + i32::from(value) * 2
}

/// Convert a volume in dB to the byte the controller expects.
pub fn volume_to_wire(volume: i32) -> u8 {
    ((volume.clamp(MIN_VOLUME, MAX_VOLUME) - MIN_VOLUME) / 2) as u8
}

/// Convert an audio bass/treble byte to its level.
pub fn wire_to_tone(value: u8) -> i32 {
    MIN_TONE + i32::from(value) * 2
}

/// Convert a bass/treble level to the byte the controller expects.
pub fn tone_to_wire(level: i32) -> u8 {
    ((level.clamp(MIN_TONE, MAX_TONE) - MIN_TONE) / 2) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_temperatures_pass_through() {
        assert_eq!(degrees_to_wire(21.5), 43);
        assert_eq!(wire_to_degrees(43), 21.5);
        assert_eq!(degrees_to_wire(0.0), 0);
    }

    #[test]
    fn negative_temperatures_use_ninth_bit() {
        assert_eq!(degrees_to_wire(-0.5), 0x1FF);
        assert_eq!(wire_to_degrees(0x1FF), -0.5);
        assert_eq!(degrees_to_wire(-55.0), 0x100 + 146);
        assert_eq!(wire_to_degrees(0x100 + 146), -55.0);
    }

    #[test]
    fn negative_decode_is_the_inverse_of_encode() {
        // Read as -(0xFF ^ low) + 1 these would be 0.5, 0.0 and -54.0,
        // one degree off and no longer monotonic.
        assert_eq!(wire_to_degrees(0x1FF), -0.5);
        assert_eq!(wire_to_degrees(0x1FE), -1.0);
        assert_eq!(wire_to_degrees(0x192), -55.0);
        assert!(wire_to_degrees(0x1FF) < wire_to_degrees(0));
    }

    #[test]
    fn temperatures_are_clamped() {
        assert_eq!(degrees_to_wire(300.0), 250);
        assert_eq!(degrees_to_wire(-90.0), degrees_to_wire(-55.0));
    }

    #[test]
    fn wire_temperature_round_trips_over_the_legal_range() {
        for byte in 0u16..=250 {
            assert_eq!(degrees_to_wire(wire_to_degrees(byte)), byte);
        }
        for halves in -110i32..=-1 {
            let wire = degrees_to_wire(halves as f32 / 2.0);
            assert_eq!(degrees_to_wire(wire_to_degrees(wire)), wire);
        }
    }

    #[test]
    fn decoding_is_monotonic_in_temperature() {
        let mut previous = f32::MIN;
        for halves in -110i32..=250 {
            let decoded = wire_to_degrees(degrees_to_wire(halves as f32 / 2.0));
            assert!(decoded >= previous, "not monotonic at {halves}");
            assert_eq!(decoded, halves as f32 / 2.0);
            previous = decoded;
        }
    }

    #[test]
    fn byte_pair_decoding() {
        assert_eq!(wire_pair_to_degrees(0, 40), 20.0);
        assert_eq!(wire_pair_to_degrees(1, 0xFE), -1.0);
    }

    #[test]
    fn correction_conversions() {
        assert_eq!(correction_to_degrees(0), -7.5);
        assert_eq!(correction_to_degrees(15), 0.0);
        assert_eq!(correction_to_degrees(30), 7.5);
        assert_eq!(degrees_to_correction(-7.5), 0);
        assert_eq!(degrees_to_correction(2.0), 19);
        assert_eq!(degrees_to_correction(12.0), 30);
    }

    #[test]
    fn volume_round_trips_and_clamps() {
        for byte in 0u8..=40 {
            assert_eq!(volume_to_wire(wire_to_volume(byte)), byte);
        }
        assert_eq!(volume_to_wire(-200), 0);
        assert_eq!(volume_to_wire(10), 40);
    }

    #[test]
    fn tone_round_trips_and_clamps() {
        for byte in 0u8..=12 {
            assert_eq!(tone_to_wire(wire_to_tone(byte)), byte);
        }
        assert_eq!(tone_to_wire(-20), 0);
        assert_eq!(tone_to_wire(20), 12);
        assert_eq!(wire_to_tone(6), 0);
    }
}
