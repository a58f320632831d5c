mod evict;
mod guard;
mod world;

pub use evict::{EvictionReport, TargetEvictor};
pub use guard::{
    AddEnemyHook, Candidate, Enforcement, ExtensionPoints, HookError, HookFlow, ResolveError,
    TargetingGuard, ValidityHook,
};
pub use world::{AgentId, PlayerHandle, World, WorldError};
