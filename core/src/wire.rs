use replink_serde::{BitReader, BitWriter, Serde, SerdeErr};

use crate::types::{PacketIndex, ReplicaId};

/// What one replication packet carries. Each packet holds exactly one
/// message so transport delivery notifications map one-to-one onto
/// replication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Full-state announcement of a replica unknown to the receiver
    CreateReplica,
    /// Dirty DataSet values for an already-known replica
    UpdateReplica,
    /// Authority's deletion notice
    DestroyReplica,
    /// Old authority ships frozen full state to the proposed new authority
    MigrationRequest,
    /// New authority accepts ownership
    MigrationAck,
    /// A queued remote call
    Rpc,
}

impl Serde for MessageType {
    fn ser(&self, writer: &mut BitWriter) {
        let index: u64 = match self {
            MessageType::CreateReplica => 0,
            MessageType::UpdateReplica => 1,
            MessageType::DestroyReplica => 2,
            MessageType::MigrationRequest => 3,
            MessageType::MigrationAck => 4,
            MessageType::Rpc => 5,
        };
        writer.write_bits(index, 3);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match reader.read_bits(3)? {
            0 => Ok(MessageType::CreateReplica),
            1 => Ok(MessageType::UpdateReplica),
            2 => Ok(MessageType::DestroyReplica),
            3 => Ok(MessageType::MigrationRequest),
            4 => Ok(MessageType::MigrationAck),
            5 => Ok(MessageType::Rpc),
            value => Err(SerdeErr::InvalidValue {
                type_name: "MessageType",
                value,
            }),
        }
    }
}

/// Leading fields of every replication packet. The packet index comes
/// first so transports can correlate delivery notifications without
/// understanding the rest of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub index: PacketIndex,
    pub message: MessageType,
    pub replica: ReplicaId,
}

impl Serde for PacketHeader {
    fn ser(&self, writer: &mut BitWriter) {
        self.index.ser(writer);
        self.message.ser(writer);
        self.replica.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            index: PacketIndex::de(reader)?,
            message: MessageType::de(reader)?,
            replica: ReplicaId::de(reader)?,
        })
    }
}

/// Read just the leading packet index from a payload, for transport ack
/// correlation
pub fn peek_packet_index(payload: &[u8]) -> Result<PacketIndex, SerdeErr> {
    let mut reader = BitReader::new(payload);
    PacketIndex::de(&mut reader)
}
