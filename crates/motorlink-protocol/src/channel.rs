//! Channel table entries: one readable quantity of the device.

use serde::{Deserialize, Serialize};

use crate::codec::{MAX_WORD_BYTES, decode_word, scale, to_signed};
use crate::error::{ProtocolError, ProtocolResult};

/// 8-bit vendor request selector (`bRequest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestCode(pub u8);

impl std::fmt::Display for RequestCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// How the reconstructed word is interpreted before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Unsigned,
    /// Two's complement over the channel's bit width.
    Signed,
}

/// Linear conversion `raw * multiplier / divisor + offset`.
///
/// Split into multiplier and divisor so profiles can state constants such as
/// `360 / 0x3FFF` exactly instead of as a rounded decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scale {
    pub multiplier: f64,
    pub divisor: f64,
    pub offset: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            divisor: 1.0,
            offset: 0.0,
        }
    }
}

impl Scale {
    pub fn factor(&self) -> f64 {
        self.multiplier / self.divisor
    }

    pub fn apply(&self, raw: f64) -> f64 {
        scale(raw, self.factor(), self.offset)
    }
}

/// A decoded channel value together with the word it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedSample {
    pub word: u32,
    pub value: f64,
}

/// One named `(request, length, bit width, scale)` tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub request: RequestCode,
    /// `wValue` sent with the read, usually 0.
    #[serde(default)]
    pub value: u16,
    /// `wIndex` sent with the read, usually 0.
    #[serde(default)]
    pub index: u16,
    /// Payload length in bytes.
    pub length: usize,
    #[serde(default)]
    pub encoding: Encoding,
    /// Defaults to `length * 8`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_width: Option<u32>,
    #[serde(default)]
    pub scale: Scale,
    /// Hidden channels are read and available to derived fields but are not
    /// part of the recorded reading.
    #[serde(default)]
    pub hidden: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, request: u8, length: usize) -> Self {
        Self {
            name: name.into(),
            request: RequestCode(request),
            value: 0,
            index: 0,
            length,
            encoding: Encoding::Unsigned,
            bit_width: None,
            scale: Scale::default(),
            hidden: false,
        }
    }

    pub fn signed(mut self) -> Self {
        self.encoding = Encoding::Signed;
        self
    }

    pub fn with_scale(mut self, multiplier: f64, divisor: f64, offset: f64) -> Self {
        self.scale = Scale {
            multiplier,
            divisor,
            offset,
        };
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Effective bit width used for signed interpretation.
    pub fn effective_bit_width(&self) -> u32 {
        self.bit_width.unwrap_or_else(|| {
            u32::try_from(self.length.saturating_mul(8)).unwrap_or(u32::MAX)
        })
    }

    /// Check the entry is decodable.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidChannel`] for a zero or oversized
    /// length, a bit width outside the payload, or a zero divisor.
    pub fn validate(&self) -> ProtocolResult<()> {
        let invalid = |reason: String| ProtocolError::InvalidChannel {
            channel: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if self.length == 0 || self.length > MAX_WORD_BYTES {
            return Err(invalid(format!(
                "length {} outside 1..={MAX_WORD_BYTES}",
                self.length
            )));
        }
        let bits = self.effective_bit_width();
        let max_bits = self.length.saturating_mul(8);
        if bits == 0 || usize::try_from(bits).map_or(true, |b| b > max_bits) {
            return Err(invalid(format!(
                "bit width {bits} outside 1..={max_bits}"
            )));
        }
        if self.scale.divisor == 0.0 || !self.scale.factor().is_finite() {
            return Err(invalid("scale divisor must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Decode a payload received for this channel.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedPayload`] when the payload length
    /// does not fit the channel.
    pub fn decode(&self, payload: &[u8]) -> ProtocolResult<DecodedSample> {
        let word = decode_word(payload, self.length)?;
        let raw = match self.encoding {
            Encoding::Unsigned => i64::from(word),
            Encoding::Signed => to_signed(word, self.effective_bit_width()),
        };
        #[expect(
            clippy::cast_precision_loss,
            reason = "words are at most 32 bits and fit an f64 mantissa"
        )]
        let value = self.scale.apply(raw as f64);
        Ok(DecodedSample { word, value })
    }
}
