//! Protocol limits. All limits fit u8 indexing on the wire.

/// Maximum number of chunks composing one Replica
pub const MAX_CHUNKS_PER_REPLICA: usize = 64;

/// Maximum number of DataSets declared by one chunk type
pub const MAX_DATASETS_PER_CHUNK: usize = 32;

/// Maximum number of RPC slots declared by one chunk type
pub const MAX_RPCS_PER_CHUNK: usize = 32;

/// Width of one host's ReplicaId allocation block (2^25 ids per host)
pub const REPLICA_ID_BLOCK_BITS: u32 = 25;

/// Number of ids in one host block
pub const REPLICA_ID_BLOCK_SIZE: u32 = 1 << REPLICA_ID_BLOCK_BITS;

/// Number of host blocks the 32-bit id space is partitioned into
pub const REPLICA_ID_BLOCK_COUNT: u32 = 128;

/// Default number of consecutive silent ticks before a peer is presumed
/// disconnected
pub const DEFAULT_LIVENESS_MAX_SILENT_TICKS: u8 = 3;

/// Default per-peer, per-tick serialized byte budget
pub const DEFAULT_BYTE_BUDGET_PER_TICK: usize = 1200;

/// Default migration handshake timeout
pub const DEFAULT_MIGRATION_TIMEOUT_MS: u64 = 5000;
