use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::event::{DeliveryMethod, RelayEvent};
use crate::player::PlayerId;

pub const MAX_PACKET_SIZE: usize = 1200;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x4C5A5253;
pub const DEFAULT_PORT: u16 = 27115;

const SEQUENCE_WRAP_THRESHOLD: u32 = u32::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    pub method: DeliveryMethod,
    /// Per (link, method) counter, owned by the sending transport.
    pub sequence: u32,
}

impl PacketHeader {
    pub fn new(method: DeliveryMethod, sequence: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            method,
            sequence,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

#[inline]
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum PacketType {
    /// Also sent to rejoin: the authority restarts both channels of the
    /// link at sequence 0.
    Join { player_id: Option<PlayerId> },
    /// The peer must reset its inbound `ChannelTracker` on receipt, since
    /// downstream sequences restart with it.
    Accepted { node_id: u32 },
    Denied { reason: String },
    Relay(RelayEvent),
    Heartbeat,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: PacketType,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("packet of {0} bytes exceeds MTU")]
    TooLarge(usize),
    #[error("bad magic or protocol version")]
    BadHeader,
}

impl Packet {
    pub fn new(header: PacketHeader, payload: PacketType) -> Self {
        Self { header, payload }
    }

    pub fn relay(method: DeliveryMethod, sequence: u32, event: RelayEvent) -> Self {
        Self::new(PacketHeader::new(method, sequence), PacketType::Relay(event))
    }

    /// Control packets ride the ordered channel with sequence 0.
    pub fn control(payload: PacketType) -> Self {
        Self::new(PacketHeader::new(DeliveryMethod::ReliableOrdered, 0), payload)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        let data = rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)?;
        if data.len() > MAX_PACKET_SIZE {
            return Err(PacketError::TooLarge(data.len()));
        }
        Ok(data)
    }

    /// Accepts any byte slice; it is copied into an aligned buffer before
    /// validation, so receive buffers need no particular alignment.
    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        let mut aligned = AlignedVec::<16>::with_capacity(data.len());
        aligned.extend_from_slice(data);
        let packet = rkyv::from_bytes::<Self, rancor::Error>(&aligned)
            .map_err(PacketError::Deserialize)?;
        if !packet.header.is_valid() {
            return Err(PacketError::BadHeader);
        }
        Ok(packet)
    }
}
