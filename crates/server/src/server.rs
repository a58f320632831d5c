use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use lazarus::net::{NetworkStats, PacketHeader};
use lazarus::relay::RelayCounters;
use lazarus::{
    Collaborators, ConnectionManager, GhostRegistry, NetworkEndpoint, NodeContext, NodeId, Packet,
    PacketType, PlayerId, RelayEvent, RelayNode, UdpTransport,
};

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};

/// Headless relay authority: no local player, forwards every event and
/// mirrors ghost state only.
pub struct RelayServer {
    endpoint: Arc<NetworkEndpoint>,
    transport: Arc<UdpTransport>,
    connections: ConnectionManager,
    relay: RelayNode,
    config: ServerConfig,
    last_summary: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl RelayServer {
    pub fn new(bind_addr: &str, config: ServerConfig) -> io::Result<Self> {
        let endpoint = Arc::new(NetworkEndpoint::bind(bind_addr)?);
        let transport = Arc::new(UdpTransport::new(Arc::clone(&endpoint)));

        let relay = RelayNode::new(
            Arc::new(NodeContext::headless_authority()),
            Arc::new(GhostRegistry::new()),
            transport.clone(),
            Collaborators::detached(),
        );

        Ok(Self {
            endpoint,
            transport,
            connections: ConnectionManager::with_timeout(config.max_peers, config.timeout_secs),
            relay,
            last_summary: Instant::now(),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Polls until the process is killed.
    pub fn run(&mut self) -> ! {
        let tick = self.config.tick_duration();
        loop {
            self.tick_once();
            self.log_events();
            std::thread::sleep(tick);
        }
    }

    pub fn tick_once(&mut self) {
        if let Err(e) = self.process_network() {
            self.pending_events.push_back(ServerEvent::Error {
                message: format!("Network error: {}", e),
            });
        }

        for peer in self.connections.cleanup_timed_out() {
            self.drop_peer(peer.node_id, DisconnectReason::Timeout);
        }

        let interval = self.config.summary_interval();
        if !interval.is_zero() && self.last_summary.elapsed() >= interval {
            self.last_summary = Instant::now();
            self.log_summary();
        }
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            peer_count: self.connections.len(),
            max_peers: self.config.max_peers,
            ghost_count: self.relay.ghosts().count(),
            relay: self.relay.stats(),
            network: self.endpoint.stats(),
        }
    }

    fn log_events(&mut self) {
        for event in self.drain_events() {
            match event {
                ServerEvent::PeerJoined {
                    node_id,
                    addr,
                    player_id,
                } => match player_id {
                    Some(player) => log::info!("{} joined from {} as {}", node_id, addr, player),
                    None => log::info!("{} joined from {}", node_id, addr),
                },
                ServerEvent::PeerLeft { node_id, reason } => {
                    log::info!("{} {}", node_id, reason.as_str());
                }
                ServerEvent::JoinDenied { addr, reason } => {
                    log::warn!("Join denied to {}: {}", addr, reason);
                }
                ServerEvent::Error { message } => log::error!("{}", message),
            }
        }
    }

    fn log_summary(&self) {
        let stats = self.stats();
        log::info!(
            "{}/{} peers, {} ghost(s), relayed {} of {} event(s), {} send failure(s), {} rejected packet(s)",
            stats.peer_count,
            stats.max_peers,
            stats.ghost_count,
            stats.relay.forwarded,
            stats.relay.received,
            stats.relay.send_failures,
            stats.network.packets_rejected,
        );
    }

    fn process_network(&mut self) -> io::Result<()> {
        let packets = self.endpoint.receive()?;
        self.process_packets(packets);
        Ok(())
    }

    /// A failed reply to one packet never stops the rest of the batch.
    fn process_packets(&mut self, packets: Vec<(Packet, SocketAddr)>) {
        for (packet, addr) in packets {
            if let Err(e) = self.handle_packet(packet, addr) {
                self.pending_events.push_back(ServerEvent::Error {
                    message: format!("Failed to answer {}: {}", addr, e),
                });
            }
        }
    }

    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) -> io::Result<()> {
        let Packet { header, payload } = packet;
        match payload {
            PacketType::Join { player_id } => self.handle_join(addr, player_id)?,
            PacketType::Relay(event) => self.handle_relay(addr, &header, event),
            PacketType::Heartbeat => self.handle_heartbeat(addr)?,
            PacketType::Leave => self.handle_leave(addr),
            PacketType::Accepted { .. } | PacketType::Denied { .. } => {
                log::debug!("ignoring authority-bound reply from {}", addr);
            }
        }

        if let Some(peer) = self.connections.get_by_addr_mut(&addr) {
            peer.touch();
        }

        Ok(())
    }

    fn handle_join(&mut self, addr: SocketAddr, player_id: Option<PlayerId>) -> io::Result<()> {
        let peer = match self.connections.join(addr, player_id) {
            Ok(peer) => peer,
            Err(reason) => {
                self.endpoint.send_to(
                    &Packet::control(PacketType::Denied {
                        reason: reason.to_string(),
                    }),
                    addr,
                )?;
                self.pending_events.push_back(ServerEvent::JoinDenied {
                    addr,
                    reason: reason.to_string(),
                });
                return Ok(());
            }
        };

        let node_id = peer.node_id;
        let player_id = peer.player_id.clone();
        self.transport.add_peer(node_id, addr);
        self.endpoint.send_to(
            &Packet::control(PacketType::Accepted { node_id: node_id.0 }),
            addr,
        )?;

        self.pending_events.push_back(ServerEvent::PeerJoined {
            node_id,
            addr,
            player_id,
        });
        Ok(())
    }

    fn handle_relay(&mut self, addr: SocketAddr, header: &PacketHeader, event: RelayEvent) {
        let Some(peer) = self.connections.get_by_addr_mut(&addr) else {
            log::debug!("relay packet from unjoined {}", addr);
            return;
        };
        let node_id = peer.node_id;
        let released = peer.channels.accept(header, event);

        for event in released {
            self.relay.receive(node_id, event);
        }
    }

    fn handle_heartbeat(&mut self, addr: SocketAddr) -> io::Result<()> {
        if self.connections.get_by_addr(&addr).is_some() {
            self.endpoint
                .send_to(&Packet::control(PacketType::Heartbeat), addr)?;
        }
        Ok(())
    }

    fn handle_leave(&mut self, addr: SocketAddr) {
        if let Some(peer) = self.connections.remove_by_addr(&addr) {
            self.drop_peer(peer.node_id, DisconnectReason::Graceful);
        }
    }

    /// The peer must already be gone from `connections`.
    fn drop_peer(&mut self, node_id: NodeId, reason: DisconnectReason) {
        self.transport.remove_peer(node_id);
        self.relay.forget_node(node_id);
        self.pending_events
            .push_back(ServerEvent::PeerLeft { node_id, reason });
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub peer_count: usize,
    pub max_peers: usize,
    pub ghost_count: usize,
    pub relay: RelayCounters,
    pub network: NetworkStats,
}
