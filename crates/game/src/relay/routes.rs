use std::collections::HashMap;

use parking_lot::Mutex;

use crate::event::RelayEvent;
use crate::player::{NodeId, PlayerId};

/// Which peer node a reviver's traffic arrives from, so a successful revive
/// can be unicast back to exactly that node.
#[derive(Debug, Default)]
pub struct ReviveRoutes {
    routes: Mutex<HashMap<PlayerId, NodeId>>,
}

impl ReviveRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learn(&self, source: NodeId, event: &RelayEvent) {
        if let Some(sender) = event.sender() {
            let previous = self.routes.lock().insert(sender.clone(), source);
            if previous != Some(source) {
                log::debug!("{} reachable via {}", sender, source);
            }
        }
    }

    pub fn route(&self, player: &PlayerId) -> Option<NodeId> {
        self.routes.lock().get(player).copied()
    }

    pub fn forget_node(&self, node: NodeId) {
        self.routes.lock().retain(|_, via| *via != node);
    }

    pub fn clear(&self) {
        self.routes.lock().clear();
    }
}
