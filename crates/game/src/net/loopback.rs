//! In-process star transport.
//!
//! Every event goes through the wire codec and sits in a FIFO inbox until the
//! owner drains it, so tests control exactly when delivery happens.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{DeliveryMethod, EventKind, RelayEvent};
use crate::player::NodeId;

use super::protocol::{Packet, PacketType};
use super::transport::{Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Authority,
    Peer(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub from: Address,
    pub to: Address,
    pub kind: EventKind,
    pub method: DeliveryMethod,
}

#[derive(Debug)]
struct Delivery {
    source: Address,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct HubState {
    authority_attached: bool,
    authority_inbox: VecDeque<Delivery>,
    peers: BTreeMap<NodeId, VecDeque<Delivery>>,
    next_peer_id: u32,
    sent: Vec<SentRecord>,
    failing: bool,
}

#[derive(Debug, Default)]
pub struct LoopbackHub {
    state: Mutex<HubState>,
}

impl LoopbackHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach_authority(self: &Arc<Self>) -> LoopbackLink {
        self.state.lock().authority_attached = true;
        LoopbackLink {
            hub: Arc::clone(self),
            address: Address::Authority,
        }
    }

    pub fn connect_peer(self: &Arc<Self>) -> LoopbackLink {
        let mut state = self.state.lock();
        state.next_peer_id += 1;
        let node = NodeId(state.next_peer_id);
        state.peers.insert(node, VecDeque::new());
        LoopbackLink {
            hub: Arc::clone(self),
            address: Address::Peer(node),
        }
    }

    pub fn disconnect_peer(&self, node: NodeId) {
        self.state.lock().peers.remove(&node);
    }

    /// Makes every subsequent send fail with `TransportError::Closed`.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        self.state.lock().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    pub fn has_pending(&self) -> bool {
        let state = self.state.lock();
        !state.authority_inbox.is_empty() || state.peers.values().any(|inbox| !inbox.is_empty())
    }

    /// Events waiting at the authority, tagged with the peer that sent them.
    pub fn drain_authority(&self) -> Vec<(NodeId, RelayEvent)> {
        let deliveries: Vec<Delivery> = self.state.lock().authority_inbox.drain(..).collect();
        deliveries
            .into_iter()
            .filter_map(|delivery| match delivery.source {
                Address::Peer(node) => decode(&delivery.bytes).map(|event| (node, event)),
                Address::Authority => None,
            })
            .collect()
    }

    pub fn drain_peer(&self, node: NodeId) -> Vec<RelayEvent> {
        let deliveries: Vec<Delivery> = match self.state.lock().peers.get_mut(&node) {
            Some(inbox) => inbox.drain(..).collect(),
            None => return Vec::new(),
        };
        deliveries
            .into_iter()
            .filter_map(|delivery| decode(&delivery.bytes))
            .collect()
    }

    fn push(
        &self,
        from: Address,
        to: Address,
        event: &RelayEvent,
        method: DeliveryMethod,
    ) -> Result<(), TransportError> {
        let bytes = Packet::relay(method, 0, event.clone()).serialize()?;
        let mut state = self.state.lock();
        if state.failing {
            return Err(TransportError::Closed);
        }

        match to {
            Address::Authority => {
                if !state.authority_attached {
                    return Err(TransportError::NoAuthority);
                }
                state.authority_inbox.push_back(Delivery {
                    source: from,
                    bytes,
                });
            }
            Address::Peer(node) => {
                let inbox = state
                    .peers
                    .get_mut(&node)
                    .ok_or(TransportError::UnknownPeer(node))?;
                inbox.push_back(Delivery {
                    source: from,
                    bytes,
                });
            }
        }

        state.sent.push(SentRecord {
            from,
            to,
            kind: event.kind(),
            method,
        });
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Option<RelayEvent> {
    match Packet::deserialize(bytes) {
        Ok(Packet {
            payload: PacketType::Relay(event),
            ..
        }) => Some(event),
        Ok(_) => None,
        Err(e) => {
            log::warn!("loopback dropped undecodable packet: {}", e);
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoopbackLink {
    hub: Arc<LoopbackHub>,
    address: Address,
}

impl LoopbackLink {
    pub fn address(&self) -> Address {
        self.address
    }

    /// `None` for the authority link.
    pub fn node_id(&self) -> Option<NodeId> {
        match self.address {
            Address::Peer(node) => Some(node),
            Address::Authority => None,
        }
    }

    pub fn hub(&self) -> &Arc<LoopbackHub> {
        &self.hub
    }
}

impl Transport for LoopbackLink {
    fn send_to_authority(
        &self,
        event: &RelayEvent,
        method: DeliveryMethod,
    ) -> Result<(), TransportError> {
        self.hub.push(self.address, Address::Authority, event, method)
    }

    fn send_to_peer(
        &self,
        peer: NodeId,
        event: &RelayEvent,
        method: DeliveryMethod,
    ) -> Result<(), TransportError> {
        self.hub.push(self.address, Address::Peer(peer), event, method)
    }

    fn broadcast(&self, event: &RelayEvent, method: DeliveryMethod) -> Result<(), TransportError> {
        let peers: Vec<NodeId> = {
            let state = self.hub.state.lock();
            if state.failing {
                return Err(TransportError::Closed);
            }
            state.peers.keys().copied().collect()
        };

        for node in peers {
            if self.address == Address::Peer(node) {
                continue;
            }
            self.hub.push(self.address, Address::Peer(node), event, method)?;
        }
        Ok(())
    }
}
