use crate::event::RelayEvent;
use crate::player::PlayerId;

use super::role::NodeRole;

/// Whether an event this node originated must also be applied here.
///
/// The transport never hands the authority its own broadcast, while peers see
/// theirs come back through the authority. Ghost toggles therefore have to be
/// applied directly on the authority. A revive success addressed to the
/// authority's own player has no peer to be unicast to, so it is echoed too.
pub fn needs_local_echo(role: NodeRole, local_player: Option<&PlayerId>, event: &RelayEvent) -> bool {
    if !role.is_authority() {
        return false;
    }
    match event {
        RelayEvent::GhostStateChange { .. } => true,
        RelayEvent::ReviveSucceeded { reviver_id } => local_player == Some(reviver_id),
        _ => false,
    }
}
