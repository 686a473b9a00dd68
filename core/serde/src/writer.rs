/// A growable bit-level writer, MSB-first within each byte.
///
/// Writes are infallible; values wider than the requested bit count are
/// masked down before writing. Call [`to_bytes`](Self::to_bytes) to get the
/// final buffer (the last partial byte is zero-padded on the right).
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    // partial byte not yet pushed, and how many bits of it are used (0-7)
    scratch: u8,
    scratch_bits: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            scratch: 0,
            scratch_bits: 0,
        }
    }

    /// Number of bits written so far
    pub fn bits_written(&self) -> usize {
        self.bytes.len() * 8 + self.scratch_bits as usize
    }

    /// Number of bytes the finished buffer will occupy
    pub fn bytes_written(&self) -> usize {
        self.bytes.len() + usize::from(self.scratch_bits > 0)
    }

    /// Write a single bit
    pub fn write_bit(&mut self, value: bool) {
        self.scratch = (self.scratch << 1) | u8::from(value);
        self.scratch_bits += 1;
        if self.scratch_bits == 8 {
            self.bytes.push(self.scratch);
            self.scratch = 0;
            self.scratch_bits = 0;
        }
    }

    /// Write the low `bits` bits of `value`, most-significant bit first.
    /// `bits` is clamped to 64; wider values are masked down.
    pub fn write_bits(&mut self, value: u64, bits: u8) {
        let bits = bits.min(64);
        for i in (0..bits).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Write whole bytes, bit by bit (no alignment requirement)
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_bits(u64::from(*byte), 8);
        }
    }

    /// Finish writing and return the byte buffer, zero-padding the final
    /// partial byte
    pub fn to_bytes(mut self) -> Vec<u8> {
        if self.scratch_bits > 0 {
            self.scratch <<= 8 - self.scratch_bits;
            self.bytes.push(self.scratch);
        }
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_writer() {
        let writer = BitWriter::new();
        assert_eq!(writer.bits_written(), 0);
        assert!(writer.to_bytes().is_empty());
    }

    #[test]
    fn single_bit_pads_right() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        assert_eq!(writer.to_bytes(), vec![0b1000_0000]);
    }

    #[test]
    fn bits_cross_byte_boundary() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1111, 4);
        writer.write_bits(0b1010_1010, 8);
        assert_eq!(writer.to_bytes(), vec![0b1111_1010, 0b1010_0000]);
    }

    #[test]
    fn wide_value_is_masked() {
        let mut writer = BitWriter::new();
        writer.write_bits(0x1FF, 8);
        assert_eq!(writer.to_bytes(), vec![0xFF]);
    }

    #[test]
    fn bytes_written_counts_partial() {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 9);
        assert_eq!(writer.bytes_written(), 2);
    }

    #[test]
    fn write_bytes_unaligned() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_bytes(&[0xFF]);
        assert_eq!(writer.to_bytes(), vec![0b1111_1111, 0b1000_0000]);
    }
}
