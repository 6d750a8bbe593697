//! MIDI 1.0 message helpers for data arriving as JSON numbers.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// One element of a JSON MIDI message.
///
/// Accepts any JSON integer, however large, so that one out-of-range value
/// never fails the whole batch. Only integers in 0–255 carry a byte; the
/// rest are kept as holes and dropped by [`sanitize_message`]. Fractional
/// numbers are not integers and fail to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiValue(Option<u8>);

impl MidiValue {
    pub fn byte(self) -> Option<u8> {
        self.0
    }
}

impl From<i64> for MidiValue {
    fn from(v: i64) -> Self {
        Self(u8::try_from(v).ok())
    }
}

struct MidiValueVisitor;

impl<'de> Visitor<'de> for MidiValueVisitor {
    type Value = MidiValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MidiValue, E> {
        Ok(MidiValue(u8::try_from(v).ok()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MidiValue, E> {
        Ok(MidiValue(u8::try_from(v).ok()))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<MidiValue, E> {
        Ok(MidiValue(u8::try_from(v).ok()))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<MidiValue, E> {
        Ok(MidiValue(u8::try_from(v).ok()))
    }

    // serde_json hands integers beyond u64 over as floats.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MidiValue, E> {
        if !v.is_finite() || v.fract() != 0.0 {
            return Err(E::invalid_type(de::Unexpected::Float(v), &self));
        }
        let byte = (0.0..=255.0).contains(&v).then_some(v as u8);
        Ok(MidiValue(byte))
    }
}

impl<'de> Deserialize<'de> for MidiValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MidiValueVisitor)
    }
}

/// Keep only values that fit in a MIDI byte (0–255).
///
/// Returns `None` when nothing valid remains, so callers never forward an
/// empty message.
pub fn sanitize_message(values: &[MidiValue]) -> Option<Vec<u8>> {
    let bytes: Vec<u8> = values.iter().filter_map(|v| v.byte()).collect();

    if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    }
}
