//! Packed stream-config codec.
//!
//! The chain stores a stream's parameters as a single `uint256`, packed
//! high→low as
//!
//! ```text
//! Current: streamId (32) | amountPerSec (160) | start (32) | duration (32)
//! Legacy:                  amountPerSec (128) | start (32) | duration (32)
//! ```
//!
//! [`StreamConfig::encode`] range-checks every field before shifting it in and
//! [`PackedStreamConfig::decode`] is the pure masking inverse, so
//! `decode(encode(c)) == c` for every config that encodes.
//!
//! `amountPerSec` is fixed point with [`AMT_PER_SEC_EXTRA_DECIMALS`] digits
//! beyond the token's smallest unit. The scale is a protocol constant.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigField, RangeError};

/// Extra decimal digits carried by `amountPerSec`.
pub const AMT_PER_SEC_EXTRA_DECIMALS: u32 = 9;

/// `10^AMT_PER_SEC_EXTRA_DECIMALS`.
pub const AMT_PER_SEC_MULTIPLIER: u64 = 1_000_000_000;

const START_BITS: usize = 32;
const DURATION_BITS: usize = 32;

/// Bit layout of a packed config.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigLayout {
    /// 256-bit layout with a 32-bit stream id and 160-bit rate.
    #[default]
    Current,
    /// 192-bit layout without a stream id and with a 128-bit rate.
    Legacy,
}

impl ConfigLayout {
    /// Width of the stream-id field (0 for [`ConfigLayout::Legacy`]).
    #[inline]
    #[must_use]
    pub const fn stream_id_bits(self) -> usize {
        match self {
            Self::Current => 32,
            Self::Legacy => 0,
        }
    }

    /// Width of the amount-per-second field.
    #[inline]
    #[must_use]
    pub const fn amount_bits(self) -> usize {
        match self {
            Self::Current => 160,
            Self::Legacy => 128,
        }
    }

    /// Total packed width.
    #[inline]
    #[must_use]
    pub const fn total_bits(self) -> usize {
        self.stream_id_bits() + self.amount_bits() + START_BITS + DURATION_BITS
    }
}

/// Unpacked stream parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Caller-chosen identifier distinguishing streams to the same receiver.
    pub stream_id: u32,
    /// Fixed-point rate, see [`AMT_PER_SEC_MULTIPLIER`]. Never zero.
    pub amount_per_sec: U256,
    /// Unix seconds; 0 means "at configuration time".
    pub start: u64,
    /// Seconds; 0 means "until the balance runs out".
    pub duration: u64,
}

impl StreamConfig {
    /// Construct a config (no validation; see [`Self::encode`]).
    #[inline]
    #[must_use]
    pub const fn new(stream_id: u32, amount_per_sec: U256, start: u64, duration: u64) -> Self {
        Self {
            stream_id,
            amount_per_sec,
            start,
            duration,
        }
    }

    /// Pack into the [`ConfigLayout::Current`] representation.
    pub fn encode(&self) -> Result<PackedStreamConfig, RangeError> {
        self.encode_with(ConfigLayout::Current)
    }

    /// Pack into the given layout.
    ///
    /// # Errors
    /// [`RangeError::ZeroAmountPerSec`] for a zero rate and
    /// [`RangeError::Overflow`] for any field wider than its slot.
    pub fn encode_with(&self, layout: ConfigLayout) -> Result<PackedStreamConfig, RangeError> {
        if self.amount_per_sec.is_zero() {
            return Err(RangeError::ZeroAmountPerSec);
        }
        let stream_id = U256::from(self.stream_id);
        let start = U256::from(self.start);
        let duration = U256::from(self.duration);
        check_width(ConfigField::StreamId, stream_id, layout.stream_id_bits())?;
        check_width(ConfigField::AmountPerSec, self.amount_per_sec, layout.amount_bits())?;
        check_width(ConfigField::Start, start, START_BITS)?;
        check_width(ConfigField::Duration, duration, DURATION_BITS)?;

        let mut packed = stream_id;
        packed = (packed << layout.amount_bits()) | self.amount_per_sec;
        packed = (packed << START_BITS) | start;
        packed = (packed << DURATION_BITS) | duration;
        Ok(PackedStreamConfig(packed))
    }
}

/// A stream config exactly as stored on chain.
///
/// Ordered numerically, which is the order the chain expects inside a
/// receiver list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackedStreamConfig(U256);

impl PackedStreamConfig {
    /// Wrap a raw on-chain value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// The raw `uint256`.
    #[inline]
    #[must_use]
    pub const fn into_raw(self) -> U256 {
        self.0
    }

    /// Unpack a [`ConfigLayout::Current`] value.
    #[must_use]
    pub fn decode(self) -> StreamConfig {
        self.decode_with(ConfigLayout::Current)
    }

    /// Unpack with the given layout. Bits above the layout's width are ignored.
    #[must_use]
    pub fn decode_with(self, layout: ConfigLayout) -> StreamConfig {
        let v = self.0;
        let duration = low_u64(v, DURATION_BITS);
        let v = v >> DURATION_BITS;
        let start = low_u64(v, START_BITS);
        let v = v >> START_BITS;
        let amount_per_sec = v & mask(layout.amount_bits());
        let v = v >> layout.amount_bits();
        // Masked to at most 32 bits.
        let stream_id = low_u64(v, layout.stream_id_bits()) as u32;
        StreamConfig {
            stream_id,
            amount_per_sec,
            start,
            duration,
        }
    }

    /// Rate field of a [`ConfigLayout::Current`] value.
    #[inline]
    #[must_use]
    pub fn amount_per_sec(self) -> U256 {
        (self.0 >> (START_BITS + DURATION_BITS)) & mask(ConfigLayout::Current.amount_bits())
    }
}

impl fmt::Display for PackedStreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for PackedStreamConfig {
    type Err = <U256 as FromStr>::Err;

    /// Accepts `0x`-prefixed hex or decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str(s.trim()).map(Self)
    }
}

impl From<PackedStreamConfig> for U256 {
    #[inline]
    fn from(c: PackedStreamConfig) -> Self {
        c.0
    }
}

/// Convert a rate of `amount` smallest token units per `time_unit_secs`
/// into the fixed-point `amountPerSec`: `floor(amount * 10^9 / time_unit_secs)`.
///
/// # Errors
/// [`RangeError::ZeroTimeUnit`] if `time_unit_secs == 0`, and
/// [`RangeError::Overflow`] if the scaled amount overflows 256 bits.
pub fn amount_per_sec_from_rate(amount: U256, time_unit_secs: u64) -> Result<U256, RangeError> {
    if time_unit_secs == 0 {
        return Err(RangeError::ZeroTimeUnit);
    }
    let scaled = amount
        .checked_mul(U256::from(AMT_PER_SEC_MULTIPLIER))
        .ok_or(RangeError::Overflow {
            field: ConfigField::AmountPerSec,
            value: amount,
            bits: 256,
        })?;
    Ok(scaled / U256::from(time_unit_secs))
}

/// Whole token units streamed at `amount_per_sec` over `secs` seconds
/// (rounded down, saturating at `U256::MAX`).
#[must_use]
pub fn tokens_streamed(amount_per_sec: U256, secs: u64) -> U256 {
    amount_per_sec.saturating_mul(U256::from(secs)) / U256::from(AMT_PER_SEC_MULTIPLIER)
}

#[inline]
fn check_width(field: ConfigField, value: U256, bits: usize) -> Result<(), RangeError> {
    if value.bit_len() > bits {
        return Err(RangeError::Overflow { field, value, bits });
    }
    Ok(())
}

#[inline]
fn mask(bits: usize) -> U256 {
    match bits {
        0 => U256::ZERO,
        b if b >= 256 => U256::MAX,
        b => (U256::from(1u8) << b) - U256::from(1u8),
    }
}

/// Low `bits` (≤ 64) of `v`.
#[inline]
fn low_u64(v: U256, bits: usize) -> u64 {
    (v & mask(bits)).as_limbs()[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_fields_high_to_low() {
        let c = StreamConfig::new(7, U256::from(3_000_000_000u64), 5, 9);
        let packed = c.encode().unwrap().into_raw();
        let expected = (U256::from(7u64) << 224)
            | (U256::from(3_000_000_000u64) << 64)
            | (U256::from(5u64) << 32)
            | U256::from(9u64);
        assert_eq!(packed, expected);
        assert_eq!(PackedStreamConfig::from_raw(packed).decode(), c);
    }

    #[test]
    fn rejects_zero_rate_and_wide_fields() {
        let zero = StreamConfig::new(1, U256::ZERO, 0, 0);
        assert_eq!(zero.encode(), Err(RangeError::ZeroAmountPerSec));

        let wide_start = StreamConfig::new(1, U256::from(1u8), 1 << 32, 0);
        assert!(matches!(
            wide_start.encode(),
            Err(RangeError::Overflow { field: ConfigField::Start, bits: 32, .. })
        ));

        let wide_amt = StreamConfig::new(1, U256::from(1u8) << 160, 0, 0);
        assert!(matches!(
            wide_amt.encode(),
            Err(RangeError::Overflow { field: ConfigField::AmountPerSec, bits: 160, .. })
        ));

        let max_amt = StreamConfig::new(u32::MAX, mask(160), u64::from(u32::MAX), u64::from(u32::MAX));
        assert_eq!(max_amt.encode().unwrap().into_raw(), U256::MAX);
    }

    #[test]
    fn legacy_layout_has_no_stream_id() {
        let c = StreamConfig::new(0, U256::from(1u8) << 127, 10, 20);
        let packed = c.encode_with(ConfigLayout::Legacy).unwrap();
        assert!(packed.into_raw().bit_len() <= ConfigLayout::Legacy.total_bits());
        assert_eq!(packed.decode_with(ConfigLayout::Legacy), c);

        let with_id = StreamConfig::new(1, U256::from(1u8), 0, 0);
        assert!(matches!(
            with_id.encode_with(ConfigLayout::Legacy),
            Err(RangeError::Overflow { field: ConfigField::StreamId, bits: 0, .. })
        ));
    }

    #[test]
    fn rate_conversion_floors() {
        // 1 token unit per 3 seconds.
        let a = amount_per_sec_from_rate(U256::from(1u8), 3).unwrap();
        assert_eq!(a, U256::from(333_333_333u64));
        assert_eq!(tokens_streamed(a, 3), U256::ZERO);
        assert_eq!(tokens_streamed(U256::from(3_000_000_000u64), 10), U256::from(30u8));
        assert_eq!(amount_per_sec_from_rate(U256::from(1u8), 0), Err(RangeError::ZeroTimeUnit));
    }

    #[test]
    fn display_parse_hex() {
        let c = StreamConfig::new(1, U256::from(2u8), 3, 4).encode().unwrap();
        let s = c.to_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.parse::<PackedStreamConfig>().unwrap(), c);
    }
}
