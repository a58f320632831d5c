use std::sync::Arc;

use crate::player::PlayerId;

use super::world::World;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub scanned: usize,
    pub cleared: usize,
    pub failed: usize,
}

/// Drops target locks AI agents already hold on a player who just went ghost.
///
/// The guard only stops new acquisitions; vanilla agents never revalidate a
/// held target on their own, so an existing lock has to be cleared here.
pub struct TargetEvictor {
    world: Arc<dyn World>,
}

impl TargetEvictor {
    pub fn new(world: Arc<dyn World>) -> Self {
        Self { world }
    }

    /// Best effort: one agent failing does not stop the scan.
    pub fn sweep(&self, player: &PlayerId) -> EvictionReport {
        let mut report = EvictionReport::default();

        let agents = self.world.active_agents();
        if agents.is_empty() {
            log::trace!("no active agents, skipping sweep for {}", player);
            return report;
        }

        let Some(handle) = self.world.find_player(player) else {
            log::warn!("ghost {} not found in world, nothing to evict", player);
            return report;
        };

        for agent in agents {
            report.scanned += 1;

            let target = match self.world.agent_target(agent) {
                Ok(target) => target,
                Err(e) => {
                    log::warn!("could not read target of {}: {}", agent, e);
                    report.failed += 1;
                    continue;
                }
            };

            if target != Some(handle) {
                continue;
            }

            match self.world.clear_agent_target(agent) {
                Ok(()) => report.cleared += 1,
                Err(e) => {
                    log::warn!("could not clear target of {}: {}", agent, e);
                    report.failed += 1;
                }
            }
        }

        if report.cleared > 0 || report.failed > 0 {
            log::info!(
                "evicted {} from {} of {} agents ({} failed)",
                player,
                report.cleared,
                report.scanned,
                report.failed
            );
        }

        report
    }
}
