use crate::types::Reliability;

/// A remote call queued on a chunk, waiting for the next network tick.
///
/// Payload encoding is chunk-defined opaque bytes; the core only routes and
/// delivers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRpc {
    pub slot: u8,
    pub payload: Vec<u8>,
    pub reliability: Reliability,
}
