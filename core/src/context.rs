use replink_serde::{BitReader, BitWriter};

use crate::{
    diff_mask::DiffMask,
    types::{PeerId, ReplicaRole},
};

/// Wall/local time pair snapshotted once per network tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeContext {
    /// Milliseconds elapsed since the session epoch
    pub elapsed_ms: u64,
    /// Milliseconds on the local clock
    pub local_ms: u64,
}

/// Identity of one replication operation: which peer, which role, when
#[derive(Debug, Clone, Copy)]
pub struct ReplicaContext {
    pub peer: PeerId,
    pub time: TimeContext,
    pub role: ReplicaRole,
}

/// Marshal behavior flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarshalFlags(u8);

impl MarshalFlags {
    pub const NONE: Self = Self(0);
    /// Initial full-state send: every DataSet is serialized and a schema
    /// fingerprint is prepended
    pub const FULL_STATE: Self = Self(1);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Everything a chunk needs to serialize itself for one peer
pub struct MarshalContext<'a> {
    pub peer: PeerId,
    pub time: TimeContext,
    pub role: ReplicaRole,
    pub flags: MarshalFlags,
    /// Which ordinals to serialize, in declaration order
    pub mask: DiffMask,
    pub writer: &'a mut BitWriter,
}

/// Everything a chunk needs to apply an incoming buffer from one peer
pub struct UnmarshalContext<'a, 'b> {
    pub peer: PeerId,
    pub time: TimeContext,
    /// True for the initial full-state payload of a newly discovered replica
    pub is_ctor_data: bool,
    pub reader: &'a mut BitReader<'b>,
}

/// Dirty state of one chunk relative to one peer, split along direction and
/// delivery class.
///
/// Invariant: a proxy only ever reports upstream flags (traffic toward the
/// authority), an authority only downstream flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareDataResult {
    pub downstream_reliable: bool,
    pub downstream_unreliable: bool,
    pub upstream_reliable: bool,
    pub upstream_unreliable: bool,
}

impl PrepareDataResult {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        !(self.downstream_reliable
            || self.downstream_unreliable
            || self.upstream_reliable
            || self.upstream_unreliable)
    }

    /// OR another chunk's result into this one
    pub fn merge(&mut self, other: &PrepareDataResult) {
        self.downstream_reliable |= other.downstream_reliable;
        self.downstream_unreliable |= other.downstream_unreliable;
        self.upstream_reliable |= other.upstream_reliable;
        self.upstream_unreliable |= other.upstream_unreliable;
    }
}
