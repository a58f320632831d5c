mod echo;
mod node;
mod role;
mod routes;

pub use echo::needs_local_echo;
pub use node::{Collaborators, RelayCounters, RelayNode};
pub use role::{Environment, NodeContext, NodeRole, Presence};
pub use routes::ReviveRoutes;
