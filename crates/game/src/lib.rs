pub mod ai;
pub mod collab;
pub mod event;
pub mod ghost;
pub mod net;
pub mod player;
pub mod relay;

pub use ai::{
    AgentId, Candidate, Enforcement, ExtensionPoints, HookFlow, PlayerHandle, TargetEvictor,
    TargetingGuard, World, WorldError,
};
pub use collab::{CriticalPlayers, Detached, LogNotifier, Notification, Notifier, RevivalRules};
pub use event::{DeliveryMethod, Direction, EventKind, RelayEvent};
pub use ghost::GhostRegistry;
pub use net::{
    ConnectionManager, DEFAULT_PORT, LoopbackHub, NetworkEndpoint, Packet, PacketError,
    PacketType, Transport, TransportError, UdpTransport,
};
pub use player::{NodeId, PlayerId};
pub use relay::{Collaborators, Environment, NodeContext, NodeRole, Presence, RelayNode};
