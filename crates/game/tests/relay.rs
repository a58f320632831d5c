use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;

use lazarus::net::{Address, LoopbackHub, LoopbackLink, SentRecord};
use lazarus::{
    AgentId, Collaborators, CriticalPlayers, DeliveryMethod, EventKind, GhostRegistry, HookFlow,
    NodeContext, NodeId, Notification, Notifier, PlayerHandle, PlayerId, RelayNode,
    RevivalRules, TargetingGuard, World, WorldError,
};

const PLAYERS: [&str; 5] = ["X", "P1", "P2", "P3", "P4"];

/// Stand-in for everything a game client exposes to the relay.
#[derive(Default)]
struct FakeGame {
    critical: Mutex<HashMap<PlayerId, (u64, Vec3)>>,
    revive_calls: Mutex<Vec<PlayerId>>,
    revive_allowed: bool,
    notifications: Mutex<Vec<Notification>>,
    players: HashMap<PlayerId, PlayerHandle>,
    targets: Mutex<HashMap<AgentId, Option<PlayerHandle>>>,
}

impl FakeGame {
    fn new() -> Self {
        let players = PLAYERS
            .iter()
            .enumerate()
            .map(|(i, id)| (PlayerId::from(*id), PlayerHandle(i as u64 + 1)))
            .collect();
        Self {
            players,
            revive_allowed: true,
            ..Self::default()
        }
    }

    fn handle(&self, id: &str) -> PlayerHandle {
        self.players[id]
    }

    fn target(&self, agent: u64, player: &str) {
        let handle = self.handle(player);
        self.targets.lock().insert(AgentId(agent), Some(handle));
    }

    fn target_of(&self, agent: u64) -> Option<PlayerHandle> {
        self.targets.lock().get(&AgentId(agent)).copied().flatten()
    }
}

impl CriticalPlayers for FakeGame {
    fn add_to_critical_players(&self, player: &PlayerId, time_of_death: u64, position: Vec3) {
        self.critical
            .lock()
            .insert(player.clone(), (time_of_death, position));
    }

    fn remove_player_from_critical_players(&self, player: &PlayerId) {
        self.critical.lock().remove(player);
    }
}

impl RevivalRules for FakeGame {
    fn try_perform_revival_by_teammate(&self, reviewee: &PlayerId) -> bool {
        self.revive_calls.lock().push(reviewee.clone());
        self.revive_allowed
    }
}

impl Notifier for FakeGame {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}

impl World for FakeGame {
    fn find_player(&self, id: &PlayerId) -> Option<PlayerHandle> {
        self.players.get(id).copied()
    }

    fn active_agents(&self) -> Vec<AgentId> {
        self.targets.lock().keys().copied().collect()
    }

    fn agent_target(&self, agent: AgentId) -> Result<Option<PlayerHandle>, WorldError> {
        self.targets
            .lock()
            .get(&agent)
            .copied()
            .ok_or(WorldError::AgentGone(agent))
    }

    fn clear_agent_target(&self, agent: AgentId) -> Result<(), WorldError> {
        self.targets.lock().insert(agent, None);
        Ok(())
    }
}

struct Node {
    local: Option<String>,
    link: Option<NodeId>,
    game: Arc<FakeGame>,
    relay: RelayNode,
    guard: Arc<TargetingGuard>,
}

impl Node {
    fn new(context: NodeContext, transport: LoopbackLink) -> Self {
        let game = Arc::new(FakeGame::new());
        let ghosts = Arc::new(GhostRegistry::new());
        let collaborators = Collaborators {
            critical: game.clone(),
            revival: game.clone(),
            notifier: game.clone(),
            world: game.clone(),
        };
        let local = context.local_player.as_ref().map(|id| id.to_string());
        let link = transport.node_id();
        let relay = RelayNode::new(
            Arc::new(context),
            Arc::clone(&ghosts),
            Arc::new(transport),
            collaborators,
        );
        Self {
            local,
            link,
            game,
            relay,
            guard: Arc::new(TargetingGuard::new(ghosts)),
        }
    }

    fn ghosts(&self) -> &GhostRegistry {
        self.relay.ghosts()
    }

    fn vetoes(&self, player: &str) -> bool {
        self.guard.check_add_enemy(&PlayerId::from(player)) == HookFlow::Handled
    }
}

struct Mesh {
    hub: Arc<LoopbackHub>,
    authority: Node,
    peers: Vec<Node>,
}

impl Mesh {
    fn new(authority: NodeContext, peer_players: &[&str]) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let hub = LoopbackHub::new();
        let authority = Node::new(authority, hub.attach_authority());
        let peers = peer_players
            .iter()
            .map(|player| Node::new(NodeContext::peer(*player), hub.connect_peer()))
            .collect();

        Self {
            hub,
            authority,
            peers,
        }
    }

    fn peer(&self, player: &str) -> &Node {
        self.peers
            .iter()
            .find(|node| node.local.as_deref() == Some(player))
            .expect("peer exists")
    }

    fn link_of(&self, player: &str) -> NodeId {
        self.peer(player).link.expect("peer has a link")
    }

    fn pump(&self) {
        while self.hub.has_pending() {
            for (source, event) in self.hub.drain_authority() {
                self.authority.relay.receive(source, event);
            }
            for peer in &self.peers {
                let Some(link) = peer.link else { continue };
                for event in self.hub.drain_peer(link) {
                    peer.relay.receive(NodeId::AUTHORITY, event);
                }
            }
        }
    }

    fn sent_of(&self, kind: EventKind) -> Vec<SentRecord> {
        self.hub
            .sent()
            .into_iter()
            .filter(|record| record.kind == kind)
            .collect()
    }

    fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::once(&self.authority).chain(self.peers.iter())
    }
}

#[test]
fn authority_ghost_toggle_reaches_everyone() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P1", "P2", "P3"]);
    mesh.authority.game.target(1, "X");
    mesh.authority.game.target(2, "P2");

    mesh.authority.relay.set_ghost("X", true).unwrap();

    assert!(mesh.authority.ghosts().contains("X"));
    assert_eq!(mesh.authority.game.target_of(1), None);
    assert_eq!(mesh.authority.game.target_of(2), Some(mesh.authority.game.handle("P2")));
    assert_eq!(
        mesh.authority.game.notifications.lock().as_slice(),
        &[Notification::GhostMode { active: true }]
    );

    for peer in &mesh.peers {
        assert!(!peer.ghosts().contains("X"), "peers only see it after delivery");
    }
    mesh.pump();

    for node in mesh.all_nodes() {
        assert!(node.ghosts().contains("X"));
        assert!(node.vetoes("X"));
        assert!(!node.vetoes("P1"));
    }
}

#[test]
fn peer_ghost_toggle_applies_on_echo() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P1", "P2"]);
    let p1 = mesh.peer("P1");
    p1.game.target(7, "P1");
    mesh.authority.game.target(3, "P1");

    p1.relay.set_ghost("P1", true).unwrap();
    assert!(!p1.ghosts().contains("P1"));

    mesh.pump();

    for node in mesh.all_nodes() {
        assert!(node.ghosts().contains("P1"));
    }
    assert_eq!(p1.game.target_of(7), None);
    assert_eq!(mesh.authority.game.target_of(3), None);
    assert_eq!(
        p1.game.notifications.lock().as_slice(),
        &[Notification::GhostMode { active: true }]
    );
}

#[test]
fn local_echo_matches_peer_observation() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P1"]);

    mesh.authority.relay.set_ghost("X", true).unwrap();
    mesh.pump();
    mesh.peer("P1").relay.set_ghost("P1", true).unwrap();
    mesh.pump();

    let authority_view = mesh.authority.ghosts().members();
    let peer_view = mesh.peer("P1").ghosts().members();
    assert_eq!(authority_view, peer_view);
    assert_eq!(authority_view, vec![PlayerId::from("P1"), PlayerId::from("X")]);
}

#[test]
fn ghost_exit_removes_veto_everywhere() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P1", "P2"]);

    mesh.authority.relay.set_ghost("P1", true).unwrap();
    mesh.pump();
    mesh.authority.relay.set_ghost("P1", false).unwrap();
    mesh.pump();

    for node in mesh.all_nodes() {
        assert!(!node.ghosts().contains("P1"));
        assert!(!node.vetoes("P1"));
        assert!(node.guard.check_enemy_validity(&PlayerId::from("P1"), true));
    }
}

#[test]
fn each_event_forwarded_once_with_prescribed_method() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P1", "P2", "P3"]);
    let p1 = mesh.peer("P1");

    p1.relay
        .report_critical("P1", 1_700_000_000_000, Vec3::new(1.0, 0.0, 2.0))
        .unwrap();
    mesh.pump();

    let sent = mesh.sent_of(EventKind::PositionReport);
    let upstream: Vec<_> = sent.iter().filter(|r| r.to == Address::Authority).collect();
    let downstream: Vec<_> = sent.iter().filter(|r| r.from == Address::Authority).collect();

    assert_eq!(upstream.len(), 1);
    assert_eq!(upstream[0].method, DeliveryMethod::ReliableSequenced);
    assert_eq!(downstream.len(), mesh.peers.len());
    for record in downstream {
        assert_eq!(record.method, DeliveryMethod::ReliableOrdered);
    }

    for node in mesh.all_nodes() {
        let critical = node.game.critical.lock();
        assert_eq!(
            critical.get("P1"),
            Some(&(1_700_000_000_000, Vec3::new(1.0, 0.0, 2.0)))
        );
    }
}

#[test]
fn critical_list_removal_propagates() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P1", "P2"]);

    mesh.peer("P2")
        .relay
        .report_critical("P2", 5, Vec3::ZERO)
        .unwrap();
    mesh.pump();
    mesh.peer("P2").relay.clear_critical("P2").unwrap();
    mesh.pump();

    for node in mesh.all_nodes() {
        assert!(node.game.critical.lock().is_empty());
    }
}

#[test]
fn revive_request_round_trip() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P2", "P3", "P4"]);

    mesh.peer("P3").relay.request_revive("P2", "P3").unwrap();
    mesh.pump();

    let requests = mesh.sent_of(EventKind::ReviveRequest);
    let forwarded: Vec<_> = requests
        .iter()
        .filter(|r| r.from == Address::Authority)
        .map(|r| r.to)
        .collect();
    assert!(forwarded.contains(&Address::Peer(mesh.link_of("P4"))));

    for node in mesh.all_nodes() {
        let calls = node.game.revive_calls.lock();
        if node.local.as_deref() == Some("P2") {
            assert_eq!(calls.as_slice(), &[PlayerId::from("P2")]);
        } else {
            assert!(calls.is_empty());
        }
    }

    let successes: Vec<_> = mesh
        .sent_of(EventKind::ReviveSucceeded)
        .into_iter()
        .filter(|r| r.from == Address::Authority)
        .collect();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].to, Address::Peer(mesh.link_of("P3")));
    assert_eq!(successes[0].method, DeliveryMethod::ReliableOrdered);

    assert_eq!(
        mesh.peer("P3").game.notifications.lock().as_slice(),
        &[Notification::ReviveSucceeded]
    );
    assert!(mesh.peer("P4").game.notifications.lock().is_empty());
}

#[test]
fn refused_revive_sends_nothing_back() {
    let hub = LoopbackHub::new();
    let authority = Node::new(NodeContext::authority("X"), hub.attach_authority());
    let mut refusing = FakeGame::new();
    refusing.revive_allowed = false;

    let game = Arc::new(refusing);
    let link = hub.connect_peer();
    let link_id = link.node_id().unwrap();
    let p2 = RelayNode::new(
        Arc::new(NodeContext::peer("P2")),
        Arc::new(GhostRegistry::new()),
        Arc::new(link),
        Collaborators {
            critical: game.clone(),
            revival: game.clone(),
            notifier: game.clone(),
            world: game.clone(),
        },
    );

    authority.relay.request_revive("P2", "X").unwrap();
    for event in hub.drain_peer(link_id) {
        p2.receive(NodeId::AUTHORITY, event);
    }

    assert_eq!(game.revive_calls.lock().len(), 1);
    assert!(hub.drain_authority().is_empty());
}

#[test]
fn authority_reviewee_unicasts_success() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P1", "P2"]);

    mesh.peer("P1").relay.request_revive("X", "P1").unwrap();
    mesh.pump();

    assert_eq!(
        mesh.authority.game.revive_calls.lock().as_slice(),
        &[PlayerId::from("X")]
    );
    let successes = mesh.sent_of(EventKind::ReviveSucceeded);
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].to, Address::Peer(mesh.link_of("P1")));
    assert_eq!(
        mesh.peer("P1").game.notifications.lock().as_slice(),
        &[Notification::ReviveSucceeded]
    );
}

#[test]
fn authority_reviver_is_notified_locally() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P2"]);

    mesh.authority.relay.request_revive("P2", "X").unwrap();
    mesh.pump();

    let downstream_successes: Vec<_> = mesh
        .sent_of(EventKind::ReviveSucceeded)
        .into_iter()
        .filter(|r| r.from == Address::Authority)
        .collect();
    assert!(downstream_successes.is_empty());
    assert_eq!(
        mesh.authority.game.notifications.lock().as_slice(),
        &[Notification::ReviveSucceeded]
    );
}

#[test]
fn revive_progress_notifies_only_reviewee() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P2", "P3"]);
    let reviver = mesh.peer("P3");

    reviver.relay.revive_started("P2", "P3").unwrap();
    reviver.relay.revive_canceled("P2", "P3").unwrap();
    mesh.pump();

    assert_eq!(
        mesh.peer("P2").game.notifications.lock().as_slice(),
        &[
            Notification::ReviveStarted {
                reviver: "P3".into()
            },
            Notification::ReviveCanceled {
                reviver: "P3".into()
            },
        ]
    );
    assert!(reviver.game.notifications.lock().is_empty());
    assert!(mesh.authority.game.notifications.lock().is_empty());
}

#[test]
fn headless_authority_relays_without_local_effects() {
    let mesh = Mesh::new(NodeContext::headless_authority(), &["P1", "P2"]);
    mesh.authority.game.target(1, "P1");

    mesh.peer("P1")
        .relay
        .report_critical("P1", 0, Vec3::ZERO)
        .unwrap();
    mesh.peer("P1").relay.set_ghost("P1", true).unwrap();
    mesh.pump();

    assert!(mesh.authority.game.critical.lock().is_empty());
    assert!(mesh.authority.ghosts().contains("P1"));
    assert_eq!(mesh.authority.game.target_of(1), None);
    assert!(mesh.peer("P2").game.critical.lock().contains_key("P1"));
    assert!(mesh.peer("P2").ghosts().contains("P1"));
}

#[test]
fn duplicate_ghost_events_are_idempotent() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P1"]);

    mesh.authority.relay.set_ghost("P1", true).unwrap();
    mesh.authority.relay.set_ghost("P1", true).unwrap();
    mesh.pump();

    assert_eq!(mesh.peer("P1").ghosts().count(), 1);
    assert_eq!(
        mesh.peer("P1").game.notifications.lock().as_slice(),
        &[Notification::GhostMode { active: true }]
    );
}

#[test]
fn disconnected_reviver_falls_back_to_broadcast() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P2", "P3"]);
    mesh.peer("P3").relay.request_revive("P2", "P3").unwrap();

    // Delivered to the authority only; then the route is dropped.
    for (source, event) in mesh.hub.drain_authority() {
        mesh.authority.relay.receive(source, event);
    }
    mesh.authority.relay.forget_node(mesh.link_of("P3"));
    mesh.pump();

    let successes: Vec<_> = mesh
        .sent_of(EventKind::ReviveSucceeded)
        .into_iter()
        .filter(|r| r.from == Address::Authority)
        .collect();
    assert_eq!(successes.len(), mesh.peers.len());
    assert_eq!(
        mesh.peer("P3").game.notifications.lock().as_slice(),
        &[Notification::ReviveSucceeded]
    );
    assert!(mesh.peer("P2").game.notifications.lock().is_empty());
}

#[test]
fn session_teardown_clears_every_registry() {
    let mesh = Mesh::new(NodeContext::authority("X"), &["P1", "P2"]);
    mesh.authority.relay.set_ghost("P1", true).unwrap();
    mesh.pump();

    for node in mesh.all_nodes() {
        node.relay.end_session();
        assert!(node.ghosts().is_empty());
        assert!(!node.vetoes("P1"));
    }
}
