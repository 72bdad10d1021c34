//! Shared handler state machine
//!
//! `Uninitialized -> Initialized -> Active -> {Complete, Failed}`. Terminal
//! states are never left except by re-initializing after teardown.

use serde::{Deserialize, Serialize};

use super::context::HandlerContext;
use super::events::HandlerEvent;
use crate::core::tag::Tag;
use crate::core::types::{OrchestratorId, RunId};
use crate::definition::MiniGameDefinition;

/// Reason reported when the definition's timeout elapses
pub const TIME_EXPIRED: &str = "Time expired";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HandlerState {
    #[default]
    Uninitialized,
    Initialized,
    Active,
    Complete,
    Failed,
}

impl HandlerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, HandlerState::Complete | HandlerState::Failed)
    }
}

/// Lifecycle, timeout and reporting shared by every mechanic
#[derive(Debug, Default)]
pub struct HandlerCore {
    owner: Option<OrchestratorId>,
    mini_game_id: Tag,
    run_id: Option<RunId>,
    state: HandlerState,
    success: bool,
    failure_reason: Option<String>,
    elapsed: f32,
    timeout: f32,
    events: Vec<HandlerEvent>,
}

impl HandlerCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to an orchestrator and run. Resets everything from a previous use.
    pub fn initialize(&mut self, owner: OrchestratorId, definition: &MiniGameDefinition, run_id: RunId) {
        *self = Self {
            owner: Some(owner),
            mini_game_id: definition.id,
            run_id: Some(run_id),
            state: HandlerState::Initialized,
            timeout: definition.timeout_seconds.max(0.0),
            ..Self::default()
        };
    }

    /// Returns false when not in a state that can activate
    pub fn activate(&mut self) -> bool {
        if self.state != HandlerState::Initialized {
            return false;
        }
        self.state = HandlerState::Active;
        self.elapsed = 0.0;
        true
    }

    pub fn deactivate(&mut self) {
        if self.state == HandlerState::Active {
            self.state = HandlerState::Initialized;
        }
    }

    /// Advance the clock and enforce the timeout. Returns true while active.
    pub fn advance(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        self.elapsed += dt;
        if self.timeout > 0.0 && self.elapsed >= self.timeout {
            self.mark_failed(ctx, TIME_EXPIRED);
        }
        self.is_active()
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == HandlerState::Active
    }

    pub fn is_complete(&self) -> bool {
        self.state == HandlerState::Complete
    }

    pub fn is_failed(&self) -> bool {
        self.state == HandlerState::Failed
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Success flag passed to `mark_complete`
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn timeout(&self) -> f32 {
        self.timeout
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    pub fn owner(&self) -> Option<OrchestratorId> {
        self.owner
    }

    pub fn mini_game_id(&self) -> Tag {
        self.mini_game_id
    }

    pub fn push_event(&mut self, event: HandlerEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<HandlerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop pending events without delivering them
    pub fn discard_events(&mut self) {
        self.events.clear();
    }

    /// Run id to report against, if this context belongs to our owner
    fn bound_run(&self, ctx: &HandlerContext<'_>) -> Option<RunId> {
        if self.owner != Some(ctx.owner) {
            tracing::warn!(
                mini_game = %self.mini_game_id,
                "Handler reporting through a context it does not belong to"
            );
            return None;
        }
        self.run_id
    }

    /// Push a progress value into the tracker
    pub fn report_value(&mut self, ctx: &mut HandlerContext<'_>, objective: &Tag, value: f32) {
        if let Some(run) = self.bound_run(ctx) {
            ctx.tracker.set_value(run, objective, value);
        }
    }

    /// Force an objective met; completes the handler if that finishes the set
    pub fn report_complete(&mut self, ctx: &mut HandlerContext<'_>, objective: &Tag) {
        if let Some(run) = self.bound_run(ctx) {
            ctx.tracker.complete(run, objective);
            if ctx.tracker.is_complete(run) {
                self.mark_complete(true);
            }
        }
    }

    /// Enter the Complete state. No-op once terminal.
    pub fn mark_complete(&mut self, success: bool) {
        if self.is_terminal() {
            return;
        }
        self.state = HandlerState::Complete;
        self.success = success;
        tracing::debug!(mini_game = %self.mini_game_id, success, "Handler complete");
        self.events.push(HandlerEvent::Completed { success });
    }

    /// Enter the Failed state and fail the objective set. No-op once terminal.
    pub fn mark_failed(&mut self, ctx: &mut HandlerContext<'_>, reason: &str) {
        if self.is_terminal() {
            return;
        }
        self.state = HandlerState::Failed;
        self.failure_reason = Some(reason.to_string());
        tracing::debug!(mini_game = %self.mini_game_id, reason, "Handler failed");
        self.events.push(HandlerEvent::Failed {
            reason: reason.to_string(),
        });
        if let Some(run) = self.bound_run(ctx) {
            ctx.tracker.fail_set(run);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{MechanicConfig, SequenceConfig};
    use crate::objectives::ObjectiveTracker;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn definition(timeout: f32) -> MiniGameDefinition {
        MiniGameDefinition::new(
            Tag::new("Test.Core.Handler"),
            MechanicConfig::Sequence(SequenceConfig::default()),
        )
        .with_timeout(timeout)
    }

    #[test]
    fn test_lifecycle() {
        let mut core = HandlerCore::new();
        assert_eq!(core.state(), HandlerState::Uninitialized);
        assert!(!core.activate());

        core.initialize(OrchestratorId(1), &definition(0.0), RunId::new());
        assert!(core.activate());
        assert!(core.is_active());

        core.mark_complete(true);
        assert!(core.is_complete());
        core.deactivate();
        assert!(core.is_complete());
    }

    #[test]
    fn test_timeout_fails_once() {
        let def = definition(1.0);
        let mut tracker = ObjectiveTracker::new();
        let run = tracker.register(&def.objectives).expect("register");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let owner = OrchestratorId(7);

        let mut core = HandlerCore::new();
        core.initialize(owner, &def, run);
        core.activate();

        let mut ctx = HandlerContext::new(owner, &mut tracker, &mut rng);
        assert!(core.advance(&mut ctx, 0.6));
        assert!(!core.advance(&mut ctx, 0.6));
        assert!(!core.advance(&mut ctx, 0.6));

        assert_eq!(core.failure_reason(), Some(TIME_EXPIRED));
        let failures = core
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, HandlerEvent::Failed { .. }))
            .count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn test_foreign_context_is_ignored() {
        let def = definition(0.0);
        let mut tracker = ObjectiveTracker::new();
        let run = tracker.register(&def.objectives).expect("register");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let objective = def.objectives.entries[0].tag();

        let mut core = HandlerCore::new();
        core.initialize(OrchestratorId(1), &def, run);
        core.activate();

        let mut ctx = HandlerContext::new(OrchestratorId(2), &mut tracker, &mut rng);
        core.report_value(&mut ctx, &objective, 1.0);
        assert_eq!(tracker.value(run, &objective), 0.0);
    }
}
