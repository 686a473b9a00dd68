use crate::{error::SerdeErr, reader::BitReader, serde::Serde, writer::BitWriter};

/// A lossy fixed-point compression wrapper for `f32`.
///
/// Values are encoded as a sign bit plus a `WHOLE_BITS + FRAC_BITS`-wide
/// magnitude. The quantization grid is `step = 2^-FRAC_BITS`; representable
/// magnitudes are `< 2^WHOLE_BITS`, and out-of-range values are clamped on
/// construction. Round-trip error for in-range values is bounded by `step`.
///
/// The wrapped value is snapped to the grid when constructed, so two
/// `Quantized` values that compare equal also encode identically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantized<const WHOLE_BITS: u8, const FRAC_BITS: u8> {
    value: f32,
}

impl<const WHOLE_BITS: u8, const FRAC_BITS: u8> Quantized<WHOLE_BITS, FRAC_BITS> {
    /// Total magnitude width; must stay below the u64 shift width
    const MAGNITUDE_BITS: u8 = {
        assert!((WHOLE_BITS as u32) + (FRAC_BITS as u32) < 64);
        WHOLE_BITS + FRAC_BITS
    };

    /// Size of one quantization step
    pub fn step() -> f32 {
        1.0 / (1u64 << FRAC_BITS) as f32
    }

    /// Largest representable magnitude
    pub fn max_magnitude() -> f32 {
        let max_raw = (1u64 << Self::MAGNITUDE_BITS) - 1;
        max_raw as f32 * Self::step()
    }

    /// Snap `value` to the quantization grid, clamping to the representable
    /// range. NaN snaps to zero.
    pub fn new(value: f32) -> Self {
        let value = if value.is_nan() { 0.0 } else { value };
        let raw = Self::to_raw(value);
        Self {
            value: Self::from_raw(raw, value < 0.0),
        }
    }

    pub fn to_f32(self) -> f32 {
        self.value
    }

    fn to_raw(value: f32) -> u64 {
        let max_raw = (1u64 << Self::MAGNITUDE_BITS) - 1;
        let scaled = (value.abs() * (1u64 << FRAC_BITS) as f32).round();
        if scaled >= max_raw as f32 {
            max_raw
        } else {
            scaled as u64
        }
    }

    fn from_raw(raw: u64, negative: bool) -> f32 {
        let magnitude = raw as f32 * Self::step();
        if negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

impl<const WHOLE_BITS: u8, const FRAC_BITS: u8> Serde for Quantized<WHOLE_BITS, FRAC_BITS> {
    fn ser(&self, writer: &mut BitWriter) {
        writer.write_bit(self.value < 0.0);
        writer.write_bits(Self::to_raw(self.value), Self::MAGNITUDE_BITS);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let negative = reader.read_bit()?;
        let raw = reader.read_bits(Self::MAGNITUDE_BITS)?;
        Ok(Self {
            value: Self::from_raw(raw, negative),
        })
    }
}
