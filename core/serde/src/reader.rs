use crate::error::SerdeErr;

/// A bounds-checked bit-level reader over a byte slice, MSB-first within
/// each byte. Never panics on malformed input; truncation yields
/// [`SerdeErr::Eof`].
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Number of bits left to read
    pub const fn bits_remaining(&self) -> usize {
        self.data
            .len()
            .saturating_mul(8)
            .saturating_sub(self.bit_pos)
    }

    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Read a single bit
    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        if self.bits_remaining() == 0 {
            return Err(SerdeErr::Eof {
                requested: 1,
                available: 0,
            });
        }
        let byte_idx = self.bit_pos / 8;
        let bit_idx = self.bit_pos % 8;
        let bit = (self.data[byte_idx] >> (7 - bit_idx)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    /// Read up to 64 bits as an unsigned integer, most-significant bit first
    pub fn read_bits(&mut self, bits: u8) -> Result<u64, SerdeErr> {
        let bits = bits.min(64);
        if usize::from(bits) > self.bits_remaining() {
            return Err(SerdeErr::Eof {
                requested: usize::from(bits),
                available: self.bits_remaining(),
            });
        }
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Read `len` whole bytes, bit by bit (no alignment requirement)
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, SerdeErr> {
        if len * 8 > self.bits_remaining() {
            return Err(SerdeErr::Eof {
                requested: len * 8,
                available: self.bits_remaining(),
            });
        }
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.read_bits(8)? as u8);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_from_empty_fails() {
        let mut reader = BitReader::new(&[]);
        assert!(matches!(reader.read_bit(), Err(SerdeErr::Eof { .. })));
    }

    #[test]
    fn read_bits_across_bytes() {
        let mut reader = BitReader::new(&[0b1111_0000, 0b0000_1111]);
        assert_eq!(reader.read_bits(12).unwrap(), 0b1111_0000_0000);
        assert_eq!(reader.bits_remaining(), 4);
    }

    #[test]
    fn truncated_read_reports_sizes() {
        let mut reader = BitReader::new(&[0xFF]);
        let err = reader.read_bits(16).unwrap_err();
        assert_eq!(
            err,
            SerdeErr::Eof {
                requested: 16,
                available: 8
            }
        );
    }

    #[test]
    fn read_bytes_unaligned() {
        let mut reader = BitReader::new(&[0b1111_1111, 0b1000_0000]);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_bytes(1).unwrap(), vec![0xFF]);
    }
}
