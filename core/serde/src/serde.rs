use crate::{error::SerdeErr, reader::BitReader, writer::BitWriter};

/// Maximum element count accepted for length-prefixed containers. Guards
/// against hostile length prefixes allocating unbounded memory.
const MAX_CONTAINER_LENGTH: usize = u16::MAX as usize;

/// A value that can be written to and read from a bit buffer.
///
/// `ser` is infallible; `de` reports truncation and invalid bit patterns.
pub trait Serde: Clone + PartialEq + Sized {
    fn ser(&self, writer: &mut BitWriter);
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;
}

impl Serde for bool {
    fn ser(&self, writer: &mut BitWriter) {
        writer.write_bit(*self);
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }
}

macro_rules! serde_unsigned {
    ($type:ty, $bits:expr) => {
        impl Serde for $type {
            fn ser(&self, writer: &mut BitWriter) {
                writer.write_bits(u64::from(*self), $bits);
            }
            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                Ok(reader.read_bits($bits)? as $type)
            }
        }
    };
}

serde_unsigned!(u8, 8);
serde_unsigned!(u16, 16);
serde_unsigned!(u32, 32);

impl Serde for u64 {
    fn ser(&self, writer: &mut BitWriter) {
        writer.write_bits(*self, 64);
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bits(64)
    }
}

impl Serde for i32 {
    fn ser(&self, writer: &mut BitWriter) {
        writer.write_bits(u64::from(*self as u32), 32);
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(reader.read_bits(32)? as u32 as i32)
    }
}

impl Serde for f32 {
    fn ser(&self, writer: &mut BitWriter) {
        writer.write_bits(u64::from(self.to_bits()), 32);
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(f32::from_bits(reader.read_bits(32)? as u32))
    }
}

impl Serde for String {
    fn ser(&self, writer: &mut BitWriter) {
        let bytes = self.as_bytes();
        // silently truncating would corrupt the value; callers keep names short
        debug_assert!(bytes.len() <= MAX_CONTAINER_LENGTH);
        writer.write_bits(bytes.len() as u64, 16);
        writer.write_bytes(bytes);
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = reader.read_bits(16)? as usize;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes).map_err(|_| SerdeErr::InvalidUtf8)
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut BitWriter) {
        match self {
            Some(value) => {
                writer.write_bit(true);
                value.ser(writer);
            }
            None => writer.write_bit(false),
        }
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut BitWriter) {
        debug_assert!(self.len() <= MAX_CONTAINER_LENGTH);
        writer.write_bits(self.len() as u64, 16);
        for element in self {
            element.ser(writer);
        }
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = reader.read_bits(16)? as usize;
        if length > MAX_CONTAINER_LENGTH {
            return Err(SerdeErr::InvalidLength {
                length,
                limit: MAX_CONTAINER_LENGTH,
            });
        }
        let mut out = Vec::with_capacity(length.min(1024));
        for _ in 0..length {
            out.push(T::de(reader)?);
        }
        Ok(out)
    }
}
