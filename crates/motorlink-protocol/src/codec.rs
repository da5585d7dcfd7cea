//! Word codec: payload bytes to integers, integers to engineering units.
//!
//! Every multi-byte quantity on the wire is little-endian. Signed channels
//! are two's complement over a declared bit width (16 for every channel the
//! board currently exposes).

use crate::error::{ProtocolError, ProtocolResult};

/// Largest payload that still fits in a `u32` word.
pub const MAX_WORD_BYTES: usize = 4;

/// Full-scale value of a 16-bit ADC/word channel.
pub const FULL_SCALE: f64 = 65535.0;

/// ADC reference voltage.
pub const SUPPLY_VOLTAGE: f64 = 3.3;

/// Current-sense amplifier output, in volts per amp.
pub const CURRENT_SENSE_GAIN: f64 = 0.75;

/// Current-sense output at zero current for the bidirectional sense stage.
pub const CURRENT_SENSE_MIDPOINT: f64 = 1.65;

/// Reconstruct an unsigned word from a little-endian payload.
///
/// `width` is the channel's declared payload length in bytes. The payload
/// must hold between one and `width` bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] when the payload is empty,
/// longer than `width`, or `width` exceeds [`MAX_WORD_BYTES`].
pub fn decode_word(payload: &[u8], width: usize) -> ProtocolResult<u32> {
    let width = width.min(MAX_WORD_BYTES);
    if payload.is_empty() || payload.len() > width {
        return Err(ProtocolError::MalformedPayload {
            width,
            actual: payload.len(),
        });
    }

    Ok(payload
        .iter()
        .rev()
        .fold(0u32, |acc, &byte| (acc << 8) | u32::from(byte)))
}

/// Reinterpret the low `bit_width` bits of `word` as two's complement.
///
/// Bits above `bit_width` are ignored. `bit_width` is clamped to `1..=32`.
pub fn to_signed(word: u32, bit_width: u32) -> i64 {
    let width = bit_width.clamp(1, 32);
    let modulus = 1i64 << width;
    let masked = i64::from(word) & (modulus - 1);
    if masked & (1i64 << (width - 1)) != 0 {
        masked - modulus
    } else {
        masked
    }
}

/// Linear conversion to engineering units.
pub fn scale(value: f64, factor: f64, offset: f64) -> f64 {
    value * factor + offset
}

/// Raw 16-bit ADC word to volts.
pub fn to_voltage(word: f64) -> f64 {
    scale(word, SUPPLY_VOLTAGE / FULL_SCALE, 0.0)
}

/// Raw 16-bit ADC word to amps for a unidirectional sense stage.
pub fn to_current(word: f64) -> f64 {
    to_voltage(word) / CURRENT_SENSE_GAIN
}

/// Raw 16-bit ADC word to amps for the mid-rail biased sense stage.
pub fn to_centered_current(word: f64) -> f64 {
    (to_voltage(word) - CURRENT_SENSE_MIDPOINT) / CURRENT_SENSE_GAIN
}

/// Encoder counts to degrees, given the encoder's count mask.
pub fn to_angle_degrees(counts: f64, mask: u16) -> f64 {
    counts / f64::from(mask) * 360.0
}

/// Scale a 16-bit quantity into `[-1, 1]`.
pub fn normalize(value: f64) -> f64 {
    value / FULL_SCALE
}

/// Multiplier applied to the motor speed from the raw direction flag.
///
/// The hardware reports `0` when turning in the positive sense; any other
/// value means negative.
pub fn direction_sign(direction_word: u32) -> i8 {
    if direction_word == 0 { 1 } else { -1 }
}

/// Pack a parameter write into the request's value field: the parameter
/// value in the low byte, its slot index in the high byte.
pub fn encode_parameter(value: u8, index: u8) -> u16 {
    u16::from_le_bytes([value, index])
}

/// Inverse of [`encode_parameter`], returning `(value, index)`.
pub fn decode_parameter(word: u16) -> (u8, u8) {
    let [value, index] = word.to_le_bytes();
    (value, index)
}
