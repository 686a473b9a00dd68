use thiserror::Error;

/// Errors that can occur while decoding a bit buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// Attempted to read past the end of the buffer
    #[error("attempted to read {requested} bits but only {available} bits remain")]
    Eof { requested: usize, available: usize },

    /// Decoded a bit pattern that is not valid for the target type
    #[error("decoded value {value} is not valid for {type_name}")]
    InvalidValue { type_name: &'static str, value: u64 },

    /// Decoded a length prefix that exceeds the allowed limit
    #[error("declared length {length} exceeds limit {limit}")]
    InvalidLength { length: usize, limit: usize },

    /// Decoded bytes that are not valid UTF-8
    #[error("decoded bytes are not valid UTF-8")]
    InvalidUtf8,
}
