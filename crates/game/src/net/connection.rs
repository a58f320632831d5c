use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::player::{NodeId, PlayerId};

use super::tracking::ChannelTracker;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A peer node connected to the relay authority.
#[derive(Debug)]
pub struct PeerConnection {
    pub addr: SocketAddr,
    pub node_id: NodeId,
    pub player_id: Option<PlayerId>,
    pub last_receive_time: Instant,
    pub channels: ChannelTracker,
}

impl PeerConnection {
    pub fn new(addr: SocketAddr, node_id: NodeId, player_id: Option<PlayerId>) -> Self {
        Self {
            addr,
            node_id,
            player_id,
            last_receive_time: Instant::now(),
            channels: ChannelTracker::default(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_receive_time.elapsed() > timeout
    }

    pub fn touch(&mut self) {
        self.last_receive_time = Instant::now();
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("relay full ({0} peers)")]
    Full(usize),
}

#[derive(Debug)]
pub struct ConnectionManager {
    peers_by_addr: HashMap<SocketAddr, NodeId>,
    peers: HashMap<NodeId, PeerConnection>,
    next_node_id: u32,
    max_peers: usize,
    timeout: Duration,
}

impl ConnectionManager {
    pub fn new(max_peers: usize) -> Self {
        Self::with_timeout(max_peers, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(max_peers: usize, timeout_secs: u64) -> Self {
        Self {
            peers_by_addr: HashMap::new(),
            peers: HashMap::new(),
            next_node_id: 1,
            max_peers,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Existing peers rejoining from the same address keep their node id.
    /// Every join restarts the peer's inbound channels; the sender numbers
    /// from 0 again after a join.
    pub fn join(
        &mut self,
        addr: SocketAddr,
        player_id: Option<PlayerId>,
    ) -> Result<&mut PeerConnection, ConnectError> {
        let known = self
            .peers_by_addr
            .get(&addr)
            .copied()
            .filter(|id| self.peers.contains_key(id));

        let node_id = match known {
            Some(node_id) => node_id,
            None => {
                if self.peers.len() >= self.max_peers {
                    return Err(ConnectError::Full(self.max_peers));
                }
                let node_id = NodeId(self.next_node_id);
                self.next_node_id += 1;
                self.peers_by_addr.insert(addr, node_id);
                node_id
            }
        };

        let peer = self
            .peers
            .entry(node_id)
            .or_insert_with(|| PeerConnection::new(addr, node_id, None));
        if player_id.is_some() {
            peer.player_id = player_id;
        }
        peer.channels = ChannelTracker::default();
        peer.touch();
        Ok(peer)
    }

    pub fn get(&self, node_id: NodeId) -> Option<&PeerConnection> {
        self.peers.get(&node_id)
    }

    pub fn get_by_addr(&self, addr: &SocketAddr) -> Option<&PeerConnection> {
        self.peers_by_addr
            .get(addr)
            .and_then(|id| self.peers.get(id))
    }

    pub fn get_by_addr_mut(&mut self, addr: &SocketAddr) -> Option<&mut PeerConnection> {
        match self.peers_by_addr.get(addr) {
            Some(id) => self.peers.get_mut(id),
            None => None,
        }
    }

    pub fn remove(&mut self, node_id: NodeId) -> Option<PeerConnection> {
        let peer = self.peers.remove(&node_id)?;
        self.peers_by_addr.remove(&peer.addr);
        Some(peer)
    }

    pub fn remove_by_addr(&mut self, addr: &SocketAddr) -> Option<PeerConnection> {
        let node_id = self.peers_by_addr.remove(addr)?;
        self.peers.remove(&node_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerConnection> {
        self.peers.values()
    }

    pub fn cleanup_timed_out(&mut self) -> Vec<PeerConnection> {
        let timed_out: Vec<NodeId> = self
            .peers
            .values()
            .filter(|peer| peer.is_timed_out(self.timeout))
            .map(|peer| peer.node_id)
            .collect();

        timed_out
            .into_iter()
            .filter_map(|node_id| self.remove(node_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
