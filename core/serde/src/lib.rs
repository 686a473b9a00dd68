//! # Replink Serde
//! Bit-level buffer primitives and the value-serialization trait used by the
//! replink replication core.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod error;
mod quantized;
mod reader;
mod serde;
mod writer;

pub use error::SerdeErr;
pub use quantized::Quantized;
pub use reader::BitReader;
pub use serde::Serde;
pub use writer::BitWriter;
