use replink_serde::{BitReader, BitWriter, SerdeErr};

use crate::constants::MAX_DATASETS_PER_CHUNK;

/// A per-chunk bit mask with one bit per DataSet ordinal.
///
/// Chunk declarations are capped at [`MAX_DATASETS_PER_CHUNK`], so a `u32`
/// backing store always suffices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffMask {
    bits: u32,
    length: u8,
}

impl DiffMask {
    pub fn new(length: u8) -> Self {
        debug_assert!(usize::from(length) <= MAX_DATASETS_PER_CHUNK);
        Self { bits: 0, length }
    }

    /// A mask with every ordinal set, used for full-state sends
    pub fn full(length: u8) -> Self {
        let mut mask = Self::new(length);
        for ordinal in 0..length {
            mask.set_bit(ordinal, true);
        }
        mask
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    pub fn bit(&self, ordinal: u8) -> bool {
        if ordinal >= self.length {
            return false;
        }
        self.bits & (1 << ordinal) != 0
    }

    pub fn set_bit(&mut self, ordinal: u8, value: bool) {
        if ordinal >= self.length {
            return;
        }
        if value {
            self.bits |= 1 << ordinal;
        } else {
            self.bits &= !(1 << ordinal);
        }
    }

    pub fn or(&mut self, other: &DiffMask) {
        self.bits |= other.bits;
    }

    /// Keep only the bits also set in `other`
    pub fn intersect(&mut self, other: &DiffMask) {
        self.bits &= other.bits;
    }

    /// Clear the bits set in `other`
    pub fn subtract(&mut self, other: &DiffMask) {
        self.bits &= !other.bits;
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub fn is_clear(&self) -> bool {
        self.bits == 0
    }

    /// Write as `length` presence bits in ordinal order
    pub fn ser(&self, writer: &mut BitWriter) {
        for ordinal in 0..self.length {
            writer.write_bit(self.bit(ordinal));
        }
    }

    /// Read `length` presence bits in ordinal order
    pub fn de(reader: &mut BitReader, length: u8) -> Result<Self, SerdeErr> {
        let mut mask = Self::new(length);
        for ordinal in 0..length {
            mask.set_bit(ordinal, reader.read_bit()?);
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear() {
        let mask = DiffMask::new(8);
        assert!(mask.is_clear());
        assert!(!mask.bit(3));
    }

    #[test]
    fn set_and_clear_bits() {
        let mut mask = DiffMask::new(8);
        mask.set_bit(3, true);
        assert!(mask.bit(3));
        assert!(!mask.is_clear());
        mask.set_bit(3, false);
        assert!(mask.is_clear());
    }

    #[test]
    fn out_of_range_bits_ignored() {
        let mut mask = DiffMask::new(4);
        mask.set_bit(7, true);
        assert!(mask.is_clear());
        assert!(!mask.bit(7));
    }

    #[test]
    fn set_operations() {
        let mut a = DiffMask::new(8);
        a.set_bit(0, true);
        a.set_bit(2, true);
        let mut b = DiffMask::new(8);
        b.set_bit(2, true);
        b.set_bit(5, true);

        let mut or = a;
        or.or(&b);
        assert!(or.bit(0) && or.bit(2) && or.bit(5));

        let mut and = a;
        and.intersect(&b);
        assert!(!and.bit(0) && and.bit(2) && !and.bit(5));

        let mut sub = a;
        sub.subtract(&b);
        assert!(sub.bit(0) && !sub.bit(2));
    }

    #[test]
    fn full_mask_sets_exactly_length_bits() {
        let mask = DiffMask::full(5);
        for ordinal in 0..5 {
            assert!(mask.bit(ordinal));
        }
        assert!(!mask.bit(5));
    }

    #[test]
    fn wire_roundtrip() {
        let mut mask = DiffMask::new(7);
        mask.set_bit(1, true);
        mask.set_bit(6, true);

        let mut writer = BitWriter::new();
        mask.ser(&mut writer);
        let bytes = writer.to_bytes();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(DiffMask::de(&mut reader, 7).unwrap(), mask);
    }
}
