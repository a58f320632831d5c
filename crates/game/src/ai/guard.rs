use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ghost::GhostRegistry;
use crate::player::PlayerId;

/// Outcome of a pre-decision hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookFlow {
    /// Run the subsystem's default behaviour.
    Continue,
    /// Already handled; the default must not run.
    Handled,
}

#[derive(Debug, thiserror::Error)]
#[error("candidate could not be resolved: {0}")]
pub struct ResolveError(pub String);

/// Something an AI subsystem is about to treat as an enemy.
pub trait Candidate {
    fn player_id(&self) -> Result<&PlayerId, ResolveError>;
}

impl Candidate for PlayerId {
    fn player_id(&self) -> Result<&PlayerId, ResolveError> {
        Ok(self)
    }
}

pub type AddEnemyHook = Arc<dyn Fn(&dyn Candidate) -> HookFlow + Send + Sync>;
pub type ValidityHook = Arc<dyn Fn(&dyn Candidate, bool) -> bool + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("extension point `{0}` not found")]
    Missing(&'static str),
    #[error("extension point `{0}` rejected the hook: {1}")]
    Rejected(&'static str, String),
}

/// Named interception points an AI subsystem exposes to the host.
pub trait ExtensionPoints {
    fn name(&self) -> &str;

    /// Pre-decision veto on "register this player as an enemy".
    fn hook_add_enemy(&mut self, hook: AddEnemyHook) -> Result<(), HookError>;

    /// Post-decision override of "is this tracked enemy still valid".
    fn hook_enemy_validity(&mut self, hook: ValidityHook) -> Result<(), HookError>;
}

/// Which interception points ended up installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enforcement {
    pub vanilla_add_enemy: bool,
    pub vanilla_validity: bool,
    pub framework_add_enemy: bool,
    pub framework_validity: bool,
}

impl Enforcement {
    pub fn is_vanilla_only(&self) -> bool {
        !self.framework_add_enemy && !self.framework_validity
    }
}

/// Vetoes every AI attempt to acquire or keep a ghost as a target.
pub struct TargetingGuard {
    ghosts: Arc<GhostRegistry>,
    degraded_reported: AtomicBool,
}

impl TargetingGuard {
    pub fn new(ghosts: Arc<GhostRegistry>) -> Self {
        Self {
            ghosts,
            degraded_reported: AtomicBool::new(false),
        }
    }

    pub fn ghosts(&self) -> &Arc<GhostRegistry> {
        &self.ghosts
    }

    pub fn check_add_enemy(&self, candidate: &dyn Candidate) -> HookFlow {
        if self.ghosts.is_empty() {
            return HookFlow::Continue;
        }
        match candidate.player_id() {
            Ok(id) if self.ghosts.contains(id.as_str()) => {
                log::trace!("vetoed add-enemy for ghost {}", id);
                HookFlow::Handled
            }
            _ => HookFlow::Continue,
        }
    }

    /// `underlying` is the subsystem's own verdict; only a positive one is
    /// ever overridden.
    pub fn check_enemy_validity(&self, candidate: &dyn Candidate, underlying: bool) -> bool {
        if !underlying || self.ghosts.is_empty() {
            return underlying;
        }
        match candidate.player_id() {
            Ok(id) => !self.ghosts.contains(id.as_str()),
            Err(_) => underlying,
        }
    }

    pub fn add_enemy_hook(self: &Arc<Self>) -> AddEnemyHook {
        let guard = Arc::clone(self);
        Arc::new(move |candidate: &dyn Candidate| guard.check_add_enemy(candidate))
    }

    pub fn validity_hook(self: &Arc<Self>) -> ValidityHook {
        let guard = Arc::clone(self);
        Arc::new(move |candidate: &dyn Candidate, underlying: bool| {
            guard.check_enemy_validity(candidate, underlying)
        })
    }

    /// Registers the guard on the vanilla AI and, when present, the
    /// third-party framework. Anything missing degrades enforcement and is
    /// reported once; nothing here is fatal.
    pub fn install(
        self: &Arc<Self>,
        vanilla: &mut dyn ExtensionPoints,
        framework: Option<&mut dyn ExtensionPoints>,
    ) -> Enforcement {
        let mut enforcement = Enforcement {
            vanilla_add_enemy: self.try_hook_add(vanilla),
            // Vanilla agents have no periodic revalidation to hook into.
            vanilla_validity: vanilla.hook_enemy_validity(self.validity_hook()).is_ok(),
            ..Enforcement::default()
        };

        match framework {
            Some(framework) => {
                enforcement.framework_add_enemy = self.try_hook_add(framework);
                enforcement.framework_validity = match framework
                    .hook_enemy_validity(self.validity_hook())
                {
                    Ok(()) => true,
                    Err(e) => {
                        self.report_degraded(&format!("{}: {}", framework.name(), e));
                        false
                    }
                };
            }
            None => self.report_degraded("AI framework not loaded"),
        }

        if enforcement.is_vanilla_only() {
            log::info!("ghost enforcement running vanilla-only");
        } else {
            log::info!("ghost enforcement installed: {:?}", enforcement);
        }
        enforcement
    }

    fn try_hook_add(self: &Arc<Self>, points: &mut dyn ExtensionPoints) -> bool {
        match points.hook_add_enemy(self.add_enemy_hook()) {
            Ok(()) => true,
            Err(e) => {
                self.report_degraded(&format!("{}: {}", points.name(), e));
                false
            }
        }
    }

    fn report_degraded(&self, reason: &str) {
        if !self.degraded_reported.swap(true, Ordering::AcqRel) {
            log::warn!("ghost enforcement degraded ({})", reason);
        }
    }
}
