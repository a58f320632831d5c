use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// The hub every event passes through. May or may not have a local player.
    RelayAuthority,
    Peer,
}

impl NodeRole {
    pub fn is_authority(&self) -> bool {
        matches!(self, Self::RelayAuthority)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Presence {
    Interactive,
    /// Relay-only: no local player, UI or revive logic.
    Headless,
}

impl Presence {
    pub fn is_headless(&self) -> bool {
        matches!(self, Self::Headless)
    }
}

/// Read-only facts about this node, owned by the hosting environment and
/// consulted at every decision point.
pub trait Environment: Send + Sync {
    fn role(&self) -> NodeRole;

    fn presence(&self) -> Presence;

    fn local_player(&self) -> Option<&PlayerId>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeContext {
    pub role: NodeRole,
    pub presence: Presence,
    pub local_player: Option<PlayerId>,
}

impl NodeContext {
    pub fn authority(local_player: impl Into<PlayerId>) -> Self {
        Self {
            role: NodeRole::RelayAuthority,
            presence: Presence::Interactive,
            local_player: Some(local_player.into()),
        }
    }

    pub fn headless_authority() -> Self {
        Self {
            role: NodeRole::RelayAuthority,
            presence: Presence::Headless,
            local_player: None,
        }
    }

    pub fn peer(local_player: impl Into<PlayerId>) -> Self {
        Self {
            role: NodeRole::Peer,
            presence: Presence::Interactive,
            local_player: Some(local_player.into()),
        }
    }
}

impl Environment for NodeContext {
    fn role(&self) -> NodeRole {
        self.role
    }

    fn presence(&self) -> Presence {
        self.presence
    }

    fn local_player(&self) -> Option<&PlayerId> {
        self.local_player.as_ref()
    }
}
