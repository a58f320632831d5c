use std::io;

use crate::event::{DeliveryMethod, RelayEvent};
use crate::player::NodeId;

use super::protocol::PacketError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no route to the relay authority")]
    NoAuthority,
    #[error("unknown peer {0}")]
    UnknownPeer(NodeId),
    #[error("encoding failed: {0}")]
    Packet(#[from] PacketError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("transport closed")]
    Closed,
}

/// Star-topology transport the hosting environment supplies.
///
/// A node never receives its own broadcasts. Within one directed channel the
/// transport preserves send order according to the delivery method.
pub trait Transport: Send + Sync {
    fn send_to_authority(&self, event: &RelayEvent, method: DeliveryMethod)
    -> Result<(), TransportError>;

    fn send_to_peer(
        &self,
        peer: NodeId,
        event: &RelayEvent,
        method: DeliveryMethod,
    ) -> Result<(), TransportError>;

    /// Every connected peer, the original sender of a relayed event included.
    fn broadcast(&self, event: &RelayEvent, method: DeliveryMethod) -> Result<(), TransportError>;
}
