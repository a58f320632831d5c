use std::fmt;

use crate::player::PlayerId;

/// Engine-side handle to a live player object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerHandle(pub u64);

/// Engine-side handle to a running AI agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("{0} despawned")]
    AgentGone(AgentId),
    #[error("{0}")]
    Engine(String),
}

/// Lookups into the simulation. Target references stay owned by the AI;
/// this side only reads and clears them.
pub trait World: Send + Sync {
    fn find_player(&self, id: &PlayerId) -> Option<PlayerHandle>;

    fn active_agents(&self) -> Vec<AgentId>;

    fn agent_target(&self, agent: AgentId) -> Result<Option<PlayerHandle>, WorldError>;

    fn clear_agent_target(&self, agent: AgentId) -> Result<(), WorldError>;
}
