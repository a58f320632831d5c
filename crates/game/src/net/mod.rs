mod connection;
mod endpoint;
mod loopback;
mod protocol;
mod tracking;
mod transport;
mod udp;

pub use connection::{ConnectError, ConnectionManager, PeerConnection};
pub use endpoint::{NetworkEndpoint, NetworkStats};
pub use loopback::{Address, LoopbackHub, LoopbackLink, SentRecord};
pub use protocol::{
    DEFAULT_PORT, MAX_PACKET_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION, Packet, PacketError,
    PacketHeader, PacketType, sequence_greater_than,
};
pub use tracking::{ChannelTracker, OrderedReceiver, SequencedReceiver};
pub use transport::{Transport, TransportError};
pub use udp::UdpTransport;
