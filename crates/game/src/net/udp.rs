use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{DeliveryMethod, RelayEvent};
use crate::player::NodeId;

use super::endpoint::NetworkEndpoint;
use super::protocol::{Packet, PacketType};
use super::transport::{Transport, TransportError};

#[derive(Debug)]
struct OutboundLink {
    addr: SocketAddr,
    ordered: u32,
    sequenced: u32,
}

impl OutboundLink {
    fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            ordered: 0,
            sequenced: 0,
        }
    }

    fn next_sequence(&mut self, method: DeliveryMethod) -> u32 {
        let counter = match method {
            DeliveryMethod::ReliableOrdered => &mut self.ordered,
            DeliveryMethod::ReliableSequenced => &mut self.sequenced,
        };
        let sequence = *counter;
        *counter = counter.wrapping_add(1);
        sequence
    }
}

#[derive(Debug, Default)]
struct Links {
    authority: Option<OutboundLink>,
    peers: HashMap<NodeId, OutboundLink>,
}

/// `Transport` over a shared UDP endpoint.
///
/// Sequence numbers are kept per link and per delivery method so the
/// receiving `ChannelTracker` can order or drop stale packets. Sends happen
/// under the link lock, so one link never interleaves two sequences.
#[derive(Debug)]
pub struct UdpTransport {
    endpoint: Arc<NetworkEndpoint>,
    links: Mutex<Links>,
}

impl UdpTransport {
    pub fn new(endpoint: Arc<NetworkEndpoint>) -> Self {
        Self {
            endpoint,
            links: Mutex::new(Links::default()),
        }
    }

    pub fn endpoint(&self) -> &Arc<NetworkEndpoint> {
        &self.endpoint
    }

    /// Call before each `Join`; upstream sequences restart at 0.
    pub fn set_authority(&self, addr: SocketAddr) {
        self.links.lock().authority = Some(OutboundLink::new(addr));
    }

    /// Registering a known peer again restarts its downstream sequences at 0.
    pub fn add_peer(&self, node: NodeId, addr: SocketAddr) {
        self.links.lock().peers.insert(node, OutboundLink::new(addr));
    }

    pub fn remove_peer(&self, node: NodeId) {
        self.links.lock().peers.remove(&node);
    }

    pub fn peer_count(&self) -> usize {
        self.links.lock().peers.len()
    }

    /// Handshake and keepalive traffic; not sequenced.
    pub fn send_control_to_authority(&self, payload: PacketType) -> Result<(), TransportError> {
        let addr = self
            .links
            .lock()
            .authority
            .as_ref()
            .map(|link| link.addr)
            .ok_or(TransportError::NoAuthority)?;
        self.endpoint.send_to(&Packet::control(payload), addr)?;
        Ok(())
    }

    pub fn send_control_to(&self, addr: SocketAddr, payload: PacketType) -> Result<(), TransportError> {
        self.endpoint.send_to(&Packet::control(payload), addr)?;
        Ok(())
    }

    fn send_on(
        &self,
        link: &mut OutboundLink,
        event: &RelayEvent,
        method: DeliveryMethod,
    ) -> Result<(), TransportError> {
        let packet = Packet::relay(method, link.next_sequence(method), event.clone());
        self.endpoint.send_to(&packet, link.addr)?;
        Ok(())
    }
}

impl Transport for UdpTransport {
    fn send_to_authority(
        &self,
        event: &RelayEvent,
        method: DeliveryMethod,
    ) -> Result<(), TransportError> {
        let mut links = self.links.lock();
        let link = links.authority.as_mut().ok_or(TransportError::NoAuthority)?;
        self.send_on(link, event, method)
    }

    fn send_to_peer(
        &self,
        peer: NodeId,
        event: &RelayEvent,
        method: DeliveryMethod,
    ) -> Result<(), TransportError> {
        let mut links = self.links.lock();
        let link = links
            .peers
            .get_mut(&peer)
            .ok_or(TransportError::UnknownPeer(peer))?;
        self.send_on(link, event, method)
    }

    /// Keeps going past a failing peer and reports the last failure.
    fn broadcast(&self, event: &RelayEvent, method: DeliveryMethod) -> Result<(), TransportError> {
        let mut links = self.links.lock();
        let mut result = Ok(());
        for (node, link) in links.peers.iter_mut() {
            if let Err(e) = self.send_on(link, event, method) {
                log::warn!("broadcast to {} failed: {}", node, e);
                result = Err(e);
            }
        }
        result
    }
}
