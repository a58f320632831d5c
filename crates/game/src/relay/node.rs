use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::ai::{TargetEvictor, World};
use crate::collab::{CriticalPlayers, Detached, LogNotifier, Notification, Notifier, RevivalRules};
use crate::event::{Direction, RelayEvent};
use crate::ghost::GhostRegistry;
use crate::net::{Transport, TransportError};
use crate::player::{NodeId, PlayerId};

use super::echo::needs_local_echo;
use super::role::{Environment, NodeRole};
use super::routes::ReviveRoutes;

/// Everything the relay calls out to on the hosting side.
#[derive(Clone)]
pub struct Collaborators {
    pub critical: Arc<dyn CriticalPlayers>,
    pub revival: Arc<dyn RevivalRules>,
    pub notifier: Arc<dyn Notifier>,
    pub world: Arc<dyn World>,
}

impl Collaborators {
    /// For nodes without a local game. Notifications, if any reach it, are
    /// only logged.
    pub fn detached() -> Self {
        Self {
            critical: Arc::new(Detached),
            revival: Arc::new(Detached),
            notifier: Arc::new(LogNotifier),
            world: Arc::new(Detached),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCounters {
    pub received: u64,
    pub forwarded: u64,
    pub originated: u64,
    pub send_failures: u64,
    pub applied: u64,
    pub echoed: u64,
}

#[derive(Debug, Default)]
struct RelayStats {
    received: AtomicU64,
    forwarded: AtomicU64,
    originated: AtomicU64,
    send_failures: AtomicU64,
    applied: AtomicU64,
    echoed: AtomicU64,
}

impl RelayStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RelayCounters {
        RelayCounters {
            received: self.received.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            originated: self.originated.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            echoed: self.echoed.load(Ordering::Relaxed),
        }
    }
}

/// One node's view of the relay protocol.
///
/// `receive` is driven by the network layer, `originate` by game code; both
/// run synchronously on the calling thread and never block on I/O beyond a
/// non-blocking send.
pub struct RelayNode {
    env: Arc<dyn Environment>,
    ghosts: Arc<GhostRegistry>,
    transport: Arc<dyn Transport>,
    critical: Arc<dyn CriticalPlayers>,
    revival: Arc<dyn RevivalRules>,
    notifier: Arc<dyn Notifier>,
    evictor: TargetEvictor,
    routes: ReviveRoutes,
    stats: RelayStats,
}

impl RelayNode {
    pub fn new(
        env: Arc<dyn Environment>,
        ghosts: Arc<GhostRegistry>,
        transport: Arc<dyn Transport>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            env,
            ghosts,
            transport,
            critical: collaborators.critical,
            revival: collaborators.revival,
            notifier: collaborators.notifier,
            evictor: TargetEvictor::new(collaborators.world),
            routes: ReviveRoutes::new(),
            stats: RelayStats::default(),
        }
    }

    pub fn ghosts(&self) -> &Arc<GhostRegistry> {
        &self.ghosts
    }

    pub fn stats(&self) -> RelayCounters {
        self.stats.snapshot()
    }

    /// Handles an event delivered by the transport. On the authority it is
    /// forwarded before any local effect runs; a failed forward is logged
    /// and local processing continues.
    pub fn receive(&self, source: NodeId, event: RelayEvent) {
        RelayStats::bump(&self.stats.received);
        log::trace!("received {} from {}", event.kind().as_str(), source);

        if self.env.role().is_authority() {
            self.routes.learn(source, &event);
            match self.send_downstream(&event) {
                Ok(true) => RelayStats::bump(&self.stats.forwarded),
                Ok(false) => {}
                Err(e) => {
                    RelayStats::bump(&self.stats.send_failures);
                    log::warn!(
                        "failed to forward {} from {}: {}",
                        event.kind().as_str(),
                        source,
                        e
                    );
                }
            }
        }

        self.apply_locally(&event);
    }

    /// Sends an event generated on this node: peers go through the
    /// authority, the authority broadcasts. Ghost toggles made on the
    /// authority are applied here whether or not the send succeeded.
    pub fn originate(&self, event: RelayEvent) -> Result<(), TransportError> {
        RelayStats::bump(&self.stats.originated);
        let role = self.env.role();

        let result = match role {
            NodeRole::RelayAuthority => self.send_downstream(&event).map(|_| ()),
            NodeRole::Peer => self
                .transport
                .send_to_authority(&event, event.delivery_method(Direction::Upstream)),
        };

        if let Err(e) = &result {
            RelayStats::bump(&self.stats.send_failures);
            log::warn!("failed to send {}: {}", event.kind().as_str(), e);
        }

        if needs_local_echo(role, self.env.local_player(), &event) {
            RelayStats::bump(&self.stats.echoed);
            self.apply_locally(&event);
        }

        result
    }

    pub fn report_critical(
        &self,
        player: impl Into<PlayerId>,
        time_of_death: u64,
        position: Vec3,
    ) -> Result<(), TransportError> {
        self.originate(RelayEvent::position_report(player, time_of_death, position))
    }

    pub fn clear_critical(&self, player: impl Into<PlayerId>) -> Result<(), TransportError> {
        self.originate(RelayEvent::CriticalListRemoval {
            player_id: player.into(),
        })
    }

    pub fn request_revive(
        &self,
        reviewee: impl Into<PlayerId>,
        reviver: impl Into<PlayerId>,
    ) -> Result<(), TransportError> {
        self.originate(RelayEvent::revive_request(reviewee, reviver))
    }

    pub fn revive_started(
        &self,
        reviewee: impl Into<PlayerId>,
        reviver: impl Into<PlayerId>,
    ) -> Result<(), TransportError> {
        self.originate(RelayEvent::ReviveStarted {
            reviewee_id: reviewee.into(),
            reviver_id: reviver.into(),
        })
    }

    pub fn revive_canceled(
        &self,
        reviewee: impl Into<PlayerId>,
        reviver: impl Into<PlayerId>,
    ) -> Result<(), TransportError> {
        self.originate(RelayEvent::ReviveCanceled {
            reviewee_id: reviewee.into(),
            reviver_id: reviver.into(),
        })
    }

    pub fn set_ghost(&self, player: impl Into<PlayerId>, ghost: bool) -> Result<(), TransportError> {
        self.originate(RelayEvent::ghost(player, !ghost))
    }

    /// A peer left; its revive routes are no longer valid.
    pub fn forget_node(&self, node: NodeId) {
        self.routes.forget_node(node);
    }

    /// Raid teardown. Ghost state never outlives the session.
    pub fn end_session(&self) {
        let ghosts = self.ghosts.count();
        self.ghosts.clear();
        self.routes.clear();
        log::info!("session ended, released {} ghost(s)", ghosts);
    }

    /// Returns whether anything was put on the wire.
    fn send_downstream(&self, event: &RelayEvent) -> Result<bool, TransportError> {
        let method = event.delivery_method(Direction::Downstream);

        let Some(recipient) = event.recipient() else {
            self.transport.broadcast(event, method)?;
            return Ok(true);
        };

        if self.is_local(recipient) {
            return Ok(false);
        }

        match self.routes.route(recipient) {
            Some(node) => self.transport.send_to_peer(node, event, method)?,
            None => {
                log::warn!("no route to {}, broadcasting", recipient);
                self.transport.broadcast(event, method)?;
            }
        }
        Ok(true)
    }

    fn is_local(&self, player: &PlayerId) -> bool {
        self.env.local_player() == Some(player)
    }

    fn apply_locally(&self, event: &RelayEvent) {
        // AI still runs on a relay-only node, so ghost state is mirrored there.
        if self.env.presence().is_headless() && !matches!(event, RelayEvent::GhostStateChange { .. })
        {
            log::trace!("relay-only node skips {}", event.kind().as_str());
            return;
        }
        RelayStats::bump(&self.stats.applied);

        match event {
            RelayEvent::PositionReport {
                player_id,
                time_of_death,
                position,
            } => {
                self.critical.add_to_critical_players(
                    player_id,
                    *time_of_death,
                    Vec3::from_array(*position),
                );
            }
            RelayEvent::CriticalListRemoval { player_id } => {
                self.critical.remove_player_from_critical_players(player_id);
            }
            RelayEvent::ReviveRequest {
                reviewee_id,
                reviver_id,
            } => {
                if !self.is_local(reviewee_id) {
                    return;
                }
                if self.revival.try_perform_revival_by_teammate(reviewee_id) {
                    log::info!("revived by {}", reviver_id);
                    // Send failures are logged and counted inside originate.
                    let _ = self.originate(RelayEvent::ReviveSucceeded {
                        reviver_id: reviver_id.clone(),
                    });
                } else {
                    log::debug!("revive by {} refused", reviver_id);
                }
            }
            RelayEvent::ReviveSucceeded { reviver_id } => {
                if self.is_local(reviver_id) {
                    self.notifier.notify(Notification::ReviveSucceeded);
                }
            }
            RelayEvent::ReviveStarted {
                reviewee_id,
                reviver_id,
            } => {
                if self.is_local(reviewee_id) {
                    self.notifier.notify(Notification::ReviveStarted {
                        reviver: reviver_id.clone(),
                    });
                }
            }
            RelayEvent::ReviveCanceled {
                reviewee_id,
                reviver_id,
            } => {
                if self.is_local(reviewee_id) {
                    self.notifier.notify(Notification::ReviveCanceled {
                        reviver: reviver_id.clone(),
                    });
                }
            }
            RelayEvent::GhostStateChange {
                player_id,
                is_visible,
            } => self.apply_ghost(player_id, *is_visible),
        }
    }

    fn apply_ghost(&self, player: &PlayerId, is_visible: bool) {
        if is_visible {
            if !self.ghosts.remove(player.as_str()) {
                log::debug!("{} already visible", player);
                return;
            }
            log::info!("{} left ghost mode", player);
        } else {
            if !self.ghosts.add(player.clone()) {
                log::debug!("{} already a ghost", player);
                return;
            }
            log::info!("{} entered ghost mode", player);
            self.evictor.sweep(player);
        }

        if self.is_local(player) {
            self.notifier.notify(Notification::GhostMode {
                active: !is_visible,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Address, LoopbackHub};
    use crate::relay::NodeContext;

    fn authority_on(hub: &Arc<LoopbackHub>, context: NodeContext) -> RelayNode {
        RelayNode::new(
            Arc::new(context),
            Arc::new(GhostRegistry::new()),
            Arc::new(hub.attach_authority()),
            Collaborators::detached(),
        )
    }

    #[test]
    fn authority_forwards_before_applying() {
        let hub = LoopbackHub::new();
        let node = authority_on(&hub, NodeContext::authority("host"));
        let peer = hub.connect_peer().node_id().unwrap();

        node.receive(peer, RelayEvent::ghost("P1", false));

        let sent = hub.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, Address::Peer(peer));
        assert!(node.ghosts().contains("P1"));
        assert_eq!(node.stats().forwarded, 1);
    }

    /// Records how many sends were already on the wire when each local
    /// effect ran.
    struct WireWatcher {
        hub: Arc<LoopbackHub>,
        seen: parking_lot::Mutex<Vec<usize>>,
    }

    impl CriticalPlayers for WireWatcher {
        fn add_to_critical_players(&self, _player: &PlayerId, _time_of_death: u64, _position: Vec3) {
            self.seen.lock().push(self.hub.sent().len());
        }

        fn remove_player_from_critical_players(&self, _player: &PlayerId) {
            self.seen.lock().push(self.hub.sent().len());
        }
    }

    #[test]
    fn forward_is_on_the_wire_before_local_effect() {
        let hub = LoopbackHub::new();
        let watcher = Arc::new(WireWatcher {
            hub: Arc::clone(&hub),
            seen: parking_lot::Mutex::new(Vec::new()),
        });
        let node = RelayNode::new(
            Arc::new(NodeContext::authority("host")),
            Arc::new(GhostRegistry::new()),
            Arc::new(hub.attach_authority()),
            Collaborators {
                critical: watcher.clone(),
                ..Collaborators::detached()
            },
        );
        let a = hub.connect_peer().node_id().unwrap();
        hub.connect_peer();

        node.receive(a, RelayEvent::position_report("P1", 0, Vec3::ZERO));
        node.receive(
            a,
            RelayEvent::CriticalListRemoval {
                player_id: "P1".into(),
            },
        );

        assert_eq!(watcher.seen.lock().as_slice(), &[2, 4]);
    }

    #[test]
    fn forward_failure_does_not_block_local_effect() {
        let hub = LoopbackHub::new();
        let node = authority_on(&hub, NodeContext::authority("host"));
        let peer = hub.connect_peer().node_id().unwrap();
        hub.set_failing(true);

        node.receive(peer, RelayEvent::ghost("P1", false));

        assert!(node.ghosts().contains("P1"));
        assert_eq!(node.stats().send_failures, 1);
    }

    #[test]
    fn authority_echo_survives_send_failure() {
        let hub = LoopbackHub::new();
        let node = authority_on(&hub, NodeContext::authority("host"));
        hub.connect_peer();
        hub.set_failing(true);

        assert!(node.set_ghost("host", true).is_err());
        assert!(node.ghosts().contains("host"));
        assert_eq!(node.stats().echoed, 1);
    }

    #[test]
    fn headless_mirrors_ghosts_only() {
        let hub = LoopbackHub::new();
        let node = authority_on(&hub, NodeContext::headless_authority());
        let peer = hub.connect_peer().node_id().unwrap();

        node.receive(peer, RelayEvent::position_report("P1", 0, Vec3::ZERO));
        node.receive(peer, RelayEvent::ghost("P1", false));

        assert!(node.ghosts().contains("P1"));
        assert_eq!(node.stats().applied, 1);
        assert_eq!(node.stats().forwarded, 2);
    }

    #[test]
    fn end_session_clears_ghosts() {
        let hub = LoopbackHub::new();
        let node = authority_on(&hub, NodeContext::authority("host"));
        node.set_ghost("host", true).unwrap();

        node.end_session();

        assert!(node.ghosts().is_empty());
    }
}
