//! Per-call context lent to handlers by the orchestrator

use rand_chacha::ChaCha8Rng;

use crate::core::types::{OrchestratorId, ViewTransform};
use crate::objectives::ObjectiveTracker;
use crate::station::Station;

/// Everything a handler may touch outside itself during one call.
///
/// Handlers never hold on to any of this; the orchestrator builds a fresh
/// context for every activate, input and tick call.
pub struct HandlerContext<'a> {
    /// Orchestrator lending this context
    pub owner: OrchestratorId,
    pub tracker: &'a mut ObjectiveTracker,
    /// Station the run was started at, if it is still alive
    pub station: Option<&'a dyn Station>,
    /// Current viewer pose
    pub view: ViewTransform,
    pub rng: &'a mut ChaCha8Rng,
}

impl<'a> HandlerContext<'a> {
    pub fn new(owner: OrchestratorId, tracker: &'a mut ObjectiveTracker, rng: &'a mut ChaCha8Rng) -> Self {
        Self {
            owner,
            tracker,
            station: None,
            view: ViewTransform::default(),
            rng,
        }
    }

    pub fn with_station(mut self, station: Option<&'a dyn Station>) -> Self {
        self.station = station;
        self
    }

    pub fn with_view(mut self, view: ViewTransform) -> Self {
        self.view = view;
        self
    }

    /// Station difficulty, medium when no station is attached
    pub fn difficulty(&self) -> f32 {
        self.station
            .map(|s| s.difficulty_modifier().clamp(0.0, 1.0))
            .unwrap_or(0.5)
    }
}
