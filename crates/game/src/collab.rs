//! Interfaces owned by the hosting game: critical-player tracking, revival
//! eligibility and the notification UI.

use glam::Vec3;

use crate::ai::{AgentId, PlayerHandle, World, WorldError};
use crate::player::PlayerId;

pub trait CriticalPlayers: Send + Sync {
    fn add_to_critical_players(&self, player: &PlayerId, time_of_death: u64, position: Vec3);

    fn remove_player_from_critical_players(&self, player: &PlayerId);
}

pub trait RevivalRules: Send + Sync {
    /// Distance, role and cooldown checks plus the revive itself.
    fn try_perform_revival_by_teammate(&self, reviewee: &PlayerId) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ReviveStarted { reviver: PlayerId },
    ReviveCanceled { reviver: PlayerId },
    ReviveSucceeded,
    GhostMode { active: bool },
}

/// Fire-and-forget display sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::ReviveStarted { reviver } => log::info!("{} is reviving you", reviver),
            Notification::ReviveCanceled { reviver } => {
                log::info!("{} stopped reviving you", reviver)
            }
            Notification::ReviveSucceeded => log::info!("revive succeeded"),
            Notification::GhostMode { active: true } => log::info!("ghost mode on"),
            Notification::GhostMode { active: false } => log::info!("ghost mode off"),
        }
    }
}

/// Stand-in for the game-side collaborators on a node without a local game,
/// such as a dedicated relay process.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl CriticalPlayers for Detached {
    fn add_to_critical_players(&self, _player: &PlayerId, _time_of_death: u64, _position: Vec3) {}

    fn remove_player_from_critical_players(&self, _player: &PlayerId) {}
}

impl RevivalRules for Detached {
    fn try_perform_revival_by_teammate(&self, _reviewee: &PlayerId) -> bool {
        false
    }
}

impl World for Detached {
    fn find_player(&self, _id: &PlayerId) -> Option<PlayerHandle> {
        None
    }

    fn active_agents(&self) -> Vec<AgentId> {
        Vec::new()
    }

    fn agent_target(&self, agent: AgentId) -> Result<Option<PlayerHandle>, WorldError> {
        Err(WorldError::AgentGone(agent))
    }

    fn clear_agent_target(&self, agent: AgentId) -> Result<(), WorldError> {
        Err(WorldError::AgentGone(agent))
    }
}
