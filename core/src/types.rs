use replink_serde::{BitReader, BitWriter, Serde, SerdeErr};

/// Wrapping packet sequence number used to correlate transport delivery
/// notifications with in-flight replication state
pub type PacketIndex = u16;

/// Session-wide identifier of a replicated object. `0` is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplicaId(pub u32);

impl ReplicaId {
    pub const INVALID: Self = Self(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Serde for ReplicaId {
    fn ser(&self, writer: &mut BitWriter) {
        self.0.ser(writer);
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }
}

/// Identifier of a network endpoint. `0` means "invalid / the local host".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u32);

impl PeerId {
    pub const INVALID: Self = Self(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Serde for PeerId {
    fn ser(&self, writer: &mut BitWriter) {
        self.0.ser(writer);
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }
}

/// Ordinal used to rank replicas for bandwidth allocation.
///
/// `REAL_TIME` is a reserved sentinel: replicas carrying it are never
/// subject to the per-tick budget cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplicaPriority(pub u16);

impl ReplicaPriority {
    pub const LOWEST: Self = Self(0x0000);
    pub const LOW: Self = Self(0x4000);
    pub const NORMAL: Self = Self(0x8000);
    pub const HIGH: Self = Self(0xC000);
    pub const HIGHEST: Self = Self(0xFFFE);
    pub const REAL_TIME: Self = Self(0xFFFF);

    pub fn is_real_time(self) -> bool {
        self == Self::REAL_TIME
    }
}

impl Serde for ReplicaPriority {
    fn ser(&self, writer: &mut BitWriter) {
        self.0.ser(writer);
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u16::de(reader)?))
    }
}

/// Whether this host is authoritative for a Replica or mirrors it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaRole {
    /// Authoritative, created locally
    Primary,
    /// Read-only mirror of a remote peer's Replica
    Proxy,
}

/// Delivery class, fixed per DataSet / RPC slot at declaration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reliability {
    /// Guaranteed, ordered; retransmitted until acknowledged
    Reliable,
    /// Best-effort, sent once; a lost value is superseded by the next tick
    Unreliable,
}

/// Capability bitmask advertised for discovery scenarios
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilityFlags(pub u32);

impl CapabilityFlags {
    pub const NONE: Self = Self(0);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl Serde for CapabilityFlags {
    fn ser(&self, writer: &mut BitWriter) {
        self.0.ser(writer);
    }
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering() {
        assert!(ReplicaPriority::LOWEST < ReplicaPriority::LOW);
        assert!(ReplicaPriority::LOW < ReplicaPriority::NORMAL);
        assert!(ReplicaPriority::NORMAL < ReplicaPriority::HIGH);
        assert!(ReplicaPriority::HIGH < ReplicaPriority::HIGHEST);
        assert!(ReplicaPriority::HIGHEST < ReplicaPriority::REAL_TIME);
        assert!(ReplicaPriority::REAL_TIME.is_real_time());
        assert!(!ReplicaPriority::HIGHEST.is_real_time());
    }

    #[test]
    fn zero_ids_are_invalid() {
        assert!(!ReplicaId(0).is_valid());
        assert!(ReplicaId(1).is_valid());
        assert!(!PeerId(0).is_valid());
    }

    #[test]
    fn capability_flags_ops() {
        let mut flags = CapabilityFlags::NONE;
        flags.insert(CapabilityFlags(0b101));
        assert!(flags.contains(CapabilityFlags(0b100)));
        assert!(!flags.contains(CapabilityFlags(0b010)));
    }
}
