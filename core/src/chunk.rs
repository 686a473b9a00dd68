use std::any::Any;

use replink_serde::{BitReader, Serde};

use crate::{
    constants::{MAX_DATASETS_PER_CHUNK, MAX_RPCS_PER_CHUNK},
    context::{MarshalContext, MarshalFlags, PrepareDataResult, ReplicaContext, UnmarshalContext},
    dataset::AnyDataSet,
    diff_mask::DiffMask,
    dirty::DirtyChannel,
    error::ReplicaError,
    rpc::QueuedRpc,
    types::{PeerId, Reliability, ReplicaRole},
};

/// State every chunk type embeds: its type name, the per-peer dirty channel
/// shared with its DataSets, and the outgoing RPC queue.
pub struct ChunkCore {
    type_name: String,
    dirty: DirtyChannel,
    rpc_slots: u8,
    rpc_queue: Vec<QueuedRpc>,
}

impl ChunkCore {
    pub fn new(
        type_name: impl Into<String>,
        dataset_count: u8,
        rpc_slots: u8,
    ) -> Result<Self, ReplicaError> {
        if usize::from(dataset_count) > MAX_DATASETS_PER_CHUNK {
            return Err(ReplicaError::LimitExceeded {
                what: "DataSet",
                count: usize::from(dataset_count),
                limit: MAX_DATASETS_PER_CHUNK,
            });
        }
        if usize::from(rpc_slots) > MAX_RPCS_PER_CHUNK {
            return Err(ReplicaError::LimitExceeded {
                what: "RPC slot",
                count: usize::from(rpc_slots),
                limit: MAX_RPCS_PER_CHUNK,
            });
        }
        Ok(Self {
            type_name: type_name.into(),
            dirty: DirtyChannel::new(dataset_count),
            rpc_slots,
            rpc_queue: Vec::new(),
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn dirty_channel(&self) -> &DirtyChannel {
        &self.dirty
    }

    pub fn rpc_slots(&self) -> u8 {
        self.rpc_slots
    }

    /// Queue a remote call for the next tick. On the authority it is
    /// broadcast downstream to subscribers; on a proxy it travels upstream
    /// to the authority.
    pub fn queue_rpc(
        &mut self,
        slot: u8,
        payload: Vec<u8>,
        reliability: Reliability,
    ) -> Result<(), ReplicaError> {
        if slot >= self.rpc_slots {
            return Err(ReplicaError::LimitExceeded {
                what: "RPC slot",
                count: usize::from(slot),
                limit: usize::from(self.rpc_slots),
            });
        }
        self.rpc_queue.push(QueuedRpc {
            slot,
            payload,
            reliability,
        });
        Ok(())
    }

    pub fn pending_rpcs(&self) -> &[QueuedRpc] {
        &self.rpc_queue
    }

    pub(crate) fn take_rpcs(&mut self) -> Vec<QueuedRpc> {
        std::mem::take(&mut self.rpc_queue)
    }
}

/// A named bundle of up to 32 DataSets and 32 RPC slots, owned by exactly
/// one Replica.
///
/// Chunk types are application structs embedding a [`ChunkCore`] and
/// exposing their DataSets in fixed declaration (ordinal) order; the
/// provided methods implement marshal/unmarshal and dirty aggregation on
/// top of that ordering. Peers whose chunk code disagrees on the ordering
/// are rejected via the schema fingerprint, not reconciled.
pub trait ReplicaChunk: Send {
    fn core(&self) -> &ChunkCore;
    fn core_mut(&mut self) -> &mut ChunkCore;

    /// Number of DataSets, fixed at declaration time
    fn dataset_count(&self) -> u8;

    /// Field access by ordinal, in declaration order
    fn dataset(&self, ordinal: u8) -> &dyn AnyDataSet;
    fn dataset_mut(&mut self, ordinal: u8) -> &mut dyn AnyDataSet;

    /// Downcast support for application access to concrete chunk types
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether this chunk permits ownership transfer of its replica.
    /// Consulted by the manager before attempting migration.
    fn is_replica_migratable(&self) -> bool {
        false
    }

    /// Incoming RPC dispatch hook
    fn on_rpc(&mut self, _slot: u8, _payload: &[u8], _ctx: &ReplicaContext) {}

    /// Bind every DataSet ordinal to this chunk's dirty channel. Called
    /// once when the chunk joins a replica.
    fn attach(&mut self) {
        let sender = self.core().dirty_channel().sender();
        for ordinal in 0..self.dataset_count() {
            self.dataset_mut(ordinal).bind(ordinal, sender.clone());
        }
    }

    /// Compact fingerprint of the declared schema: dataset count, each
    /// ordinal's delivery class, and the RPC slot count. Disagreement is a
    /// protocol-shape mismatch, fatal for the connection.
    fn schema_fingerprint(&self) -> u16 {
        let mut hash: u32 = 0x811c_9dc5;
        hash = hash.wrapping_mul(31).wrapping_add(u32::from(self.dataset_count()));
        for ordinal in 0..self.dataset_count() {
            let class = match self.dataset(ordinal).reliability() {
                Reliability::Reliable => 1,
                Reliability::Unreliable => 2,
            };
            hash = hash.wrapping_mul(31).wrapping_add(class);
        }
        hash = hash.wrapping_mul(31).wrapping_add(u32::from(self.core().rpc_slots()));
        (hash ^ (hash >> 16)) as u16
    }

    /// Mask of ordinals declared reliable
    fn reliability_mask(&self) -> DiffMask {
        let mut mask = DiffMask::new(self.dataset_count());
        for ordinal in 0..self.dataset_count() {
            if self.dataset(ordinal).reliability() == Reliability::Reliable {
                mask.set_bit(ordinal, true);
            }
        }
        mask
    }

    /// OR together the dirty state of this chunk's DataSets and pending
    /// RPCs relative to one peer, split by direction and delivery class
    fn prepare_data(
        &self,
        peer: PeerId,
        role: ReplicaRole,
    ) -> Result<PrepareDataResult, ReplicaError> {
        let mut result = PrepareDataResult::clean();
        let dirty = self.core().dirty_channel().dirty_mask(peer)?;
        for ordinal in 0..self.dataset_count() {
            if !dirty.bit(ordinal) {
                continue;
            }
            match (role, self.dataset(ordinal).reliability()) {
                (ReplicaRole::Primary, Reliability::Reliable) => result.downstream_reliable = true,
                (ReplicaRole::Primary, Reliability::Unreliable) => {
                    result.downstream_unreliable = true;
                }
                // proxies never push DataSet state; dirty bits on a proxy
                // are ignored rather than leaked upstream
                (ReplicaRole::Proxy, _) => {}
            }
        }
        for rpc in self.core().pending_rpcs() {
            match (role, rpc.reliability) {
                (ReplicaRole::Primary, Reliability::Reliable) => result.downstream_reliable = true,
                (ReplicaRole::Primary, Reliability::Unreliable) => {
                    result.downstream_unreliable = true;
                }
                (ReplicaRole::Proxy, Reliability::Reliable) => result.upstream_reliable = true,
                (ReplicaRole::Proxy, Reliability::Unreliable) => result.upstream_unreliable = true,
            }
        }
        Ok(result)
    }

    /// Serialize the ordinals selected by `ctx.mask`, in declaration order.
    /// A clean mask produces an empty presence frame, never an error.
    fn marshal(&self, ctx: &mut MarshalContext) -> Result<(), ReplicaError> {
        if ctx.flags.contains(MarshalFlags::FULL_STATE) {
            self.schema_fingerprint().ser(ctx.writer);
        }
        ctx.mask.ser(ctx.writer);
        for ordinal in 0..self.dataset_count() {
            if ctx.mask.bit(ordinal) {
                self.dataset(ordinal).ser_value(ctx.writer);
            }
        }
        Ok(())
    }

    /// Walk one update body without applying it, verifying it decodes.
    /// Lets the manager reject a truncated multi-entry payload before any
    /// entry has mutated state.
    fn dry_unmarshal(&self, reader: &mut BitReader) -> Result<(), ReplicaError> {
        let mask = DiffMask::de(reader, self.dataset_count())?;
        for ordinal in 0..self.dataset_count() {
            if mask.bit(ordinal) {
                self.dataset(ordinal).de_discard(reader)?;
            }
        }
        Ok(())
    }

    /// Decode counterpart of [`marshal`](Self::marshal). Fires DataSet
    /// change notifications as values are applied.
    fn unmarshal_from_buffer(&mut self, ctx: &mut UnmarshalContext) -> Result<(), ReplicaError> {
        if ctx.is_ctor_data {
            let remote = u16::de(ctx.reader)?;
            let local = self.schema_fingerprint();
            if remote != local {
                return Err(ReplicaError::ProtocolMismatch {
                    chunk_type: self.core().type_name().to_string(),
                    local,
                    remote,
                });
            }
        }
        let mask = DiffMask::de(ctx.reader, self.dataset_count())?;
        for ordinal in 0..self.dataset_count() {
            if mask.bit(ordinal) {
                self.dataset_mut(ordinal).de_apply(ctx.reader)?;
            }
        }
        Ok(())
    }
}
