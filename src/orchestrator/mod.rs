//! Mini-game orchestrator
//!
//! Top-level controller for one actor. Owns at most one active handler and
//! its objective-set registration, routes input to it, drives its tick and
//! holds the camera request for the length of the run. It is the only
//! component that starts or stops a mini-game.
//!
//! Per frame the caller routes input first, then calls [`MiniGameOrchestrator::tick`].
//! Handler complete/fail signals are observed at the end of the tick, so
//! input routing never ends a run by itself.

pub mod events;

use std::rc::{Rc, Weak};

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::camera::{CameraRelease, CameraRequest, CameraService, CameraStack};
use crate::core::config::OrchestratorConfig;
use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::core::types::{OrchestratorId, RequesterId, RunId, ViewTransform};
use crate::definition::{DefinitionTable, MiniGameDefinition};
use crate::handlers::{HandlerContext, HandlerRegistry, MiniGameHandler, TIME_EXPIRED};
use crate::objectives::{ObjectiveTracker, TrackerEvent};
use crate::station::Station;

pub use events::{CancelReason, MiniGameEvent, MiniGameOutcome};

/// Orchestrator lifecycle. The three closing phases only last for the
/// duration of a teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestratorPhase {
    #[default]
    Idle,
    Active,
    Completing,
    Failing,
    Cancelling,
}

/// Everything owned on behalf of the running mini-game
struct ActiveSession {
    definition: MiniGameDefinition,
    handler: Box<dyn MiniGameHandler>,
    run_id: RunId,
    requester: RequesterId,
    station: Option<Weak<dyn Station>>,
    elapsed: f32,
}

pub struct MiniGameOrchestrator<C: CameraService = CameraStack> {
    id: OrchestratorId,
    config: OrchestratorConfig,
    table: DefinitionTable,
    registry: HandlerRegistry,
    tracker: ObjectiveTracker,
    camera: C,
    rng: ChaCha8Rng,
    view: ViewTransform,
    phase: OrchestratorPhase,
    session: Option<ActiveSession>,
    events: Vec<MiniGameEvent>,
    last_outcome: Option<MiniGameOutcome>,
}

impl MiniGameOrchestrator<CameraStack> {
    /// Built-in handlers and the in-crate camera stack
    pub fn with_table(config: OrchestratorConfig, table: DefinitionTable) -> Result<Self> {
        Self::new(config, table, HandlerRegistry::with_defaults(), CameraStack::new())
    }
}

impl<C: CameraService> MiniGameOrchestrator<C> {
    pub fn new(
        config: OrchestratorConfig,
        table: DefinitionTable,
        registry: HandlerRegistry,
        camera: C,
    ) -> Result<Self> {
        config.validate()?;
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            id: OrchestratorId::next(),
            config,
            table,
            registry,
            tracker: ObjectiveTracker::new(),
            camera,
            rng,
            view: ViewTransform::default(),
            phase: OrchestratorPhase::Idle,
            session: None,
            events: Vec::new(),
            last_outcome: None,
        })
    }

    // === LIFECYCLE ===

    /// Start a mini-game, optionally at a station.
    ///
    /// A station-supplied definition takes precedence over the table. Only a
    /// weak handle to the station is kept. Any failure leaves the
    /// orchestrator exactly as it was.
    pub fn start(&mut self, mini_game_id: Tag, station: Option<&Rc<dyn Station>>) -> Result<()> {
        if let Some(session) = &self.session {
            tracing::warn!(
                requested = %mini_game_id,
                active = %session.definition.id,
                "Start rejected: a mini-game is already active"
            );
            return Err(MiniGameError::AlreadyActive(session.definition.id));
        }

        let station_ref: Option<&dyn Station> = station.map(|s| &**s);
        let definition = self.resolve_definition(mini_game_id, station_ref)?;
        if let Err(e) = definition.validate() {
            tracing::warn!(id = %definition.id, error = %e, "Start rejected: invalid definition");
            return Err(e);
        }
        if let Some(station) = station_ref {
            if !station.is_mini_game_available() {
                tracing::warn!(id = %definition.id, "Start rejected: station unavailable");
                return Err(MiniGameError::StationUnavailable(definition.id));
            }
        }

        let run_id = self.tracker.register(&definition.objectives)?;
        let mut handler = match self.spawn_handler(&definition, run_id) {
            Ok(handler) => handler,
            Err(e) => {
                self.tracker.unregister(run_id);
                self.tracker.drain_events();
                tracing::warn!(id = %definition.id, error = %e, "Start rejected: handler spawn failed");
                return Err(e);
            }
        };
        let handler_class = self
            .registry
            .class_for(&definition)
            .unwrap_or_default()
            .to_string();

        {
            let mut ctx = HandlerContext::new(self.id, &mut self.tracker, &mut self.rng)
                .with_station(station_ref)
                .with_view(self.view);
            handler.activate(&mut ctx);
        }

        let requester = RequesterId::new();
        self.camera.request_camera_mode(&CameraRequest {
            mode: definition.camera_mode,
            priority: self.config.camera_priority,
            blend_time: self.config.camera_request_blend,
            focus_target: station_ref.map(|s| s.mini_game_id()),
            requester,
            source: definition.id,
        });

        if let Some(station) = station_ref {
            station.on_mini_game_started(definition.id);
        }

        tracing::info!(
            id = %definition.id,
            handler = %handler_class,
            mechanic = definition.mechanic.kind_name(),
            "Mini-game started"
        );
        self.events.push(MiniGameEvent::Started {
            id: definition.id,
            run: run_id,
            handler_class,
        });

        self.session = Some(ActiveSession {
            definition,
            handler,
            run_id,
            requester,
            station: station.map(Rc::downgrade),
            elapsed: 0.0,
        });
        self.phase = OrchestratorPhase::Active;
        self.pump_events();
        Ok(())
    }

    /// End the active run. Returns false when nothing is active.
    pub fn end(&mut self, success: bool, bonus: bool) -> bool {
        if self.session.is_none() {
            tracing::debug!("End ignored: no active mini-game");
            return false;
        }

        self.pump_events();
        self.phase = if success {
            OrchestratorPhase::Completing
        } else {
            OrchestratorPhase::Failing
        };
        if let Some(outcome) = self.teardown(success, bonus, None) {
            tracing::info!(
                id = %outcome.id,
                success,
                bonus,
                reason = outcome.failure_reason.as_deref().unwrap_or(""),
                "Mini-game ended"
            );
            self.events.push(MiniGameEvent::Ended { outcome });
        }
        true
    }

    /// Cancel the active run.
    ///
    /// Rejected without any state change when the definition is not
    /// cancelable, unless the owner is being destroyed.
    pub fn cancel(&mut self, reason: CancelReason) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        let id = session.definition.id;
        if !session.definition.cancelable && reason != CancelReason::OwnerDestroyed {
            tracing::warn!(id = %id, reason = %reason, "Cancel rejected: mini-game is not cancelable");
            return false;
        }

        self.pump_events();
        self.phase = OrchestratorPhase::Cancelling;
        let reason = reason.to_string();
        self.teardown(false, false, Some(reason.clone()));
        tracing::info!(id = %id, reason = %reason, "Mini-game cancelled");
        self.events.push(MiniGameEvent::Cancelled { id, reason });
        true
    }

    /// Force-cancel whatever is running
    pub fn shutdown(&mut self) {
        if self.session.is_some() {
            self.cancel(CancelReason::OwnerDestroyed);
        }
    }

    // === PER FRAME ===

    pub fn route_axis_input(&mut self, axis: Vec2, dt: f32) {
        if self
            .with_handler(|handler, ctx| handler.process_axis_input(ctx, axis, dt))
            .is_some()
        {
            self.pump_events();
        }
    }

    pub fn route_action_input(&mut self, action: &Tag, pressed: bool) {
        if self
            .with_handler(|handler, ctx| handler.process_action_input(ctx, action, pressed))
            .is_some()
        {
            self.pump_events();
        }
    }

    pub fn route_positional_input(&mut self, point: Vec3, normal: Vec3) {
        if self
            .with_handler(|handler, ctx| handler.process_positional_input(ctx, point, normal))
            .is_some()
        {
            self.pump_events();
        }
    }

    /// Advance the active run by `dt` seconds and end it if the handler
    /// reached a terminal state.
    pub fn tick(&mut self, dt: f32) {
        self.tracker.advance_time(dt);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.elapsed += dt;
        let timeout = session.definition.timeout_seconds;
        let overdue = timeout > 0.0 && session.elapsed >= timeout;

        self.with_handler(|handler, ctx| {
            if handler.needs_tick() {
                handler.tick(ctx, dt);
            } else {
                handler.tick_clock(ctx, dt);
            }
            if overdue && handler.core().is_active() {
                handler.core_mut().mark_failed(ctx, TIME_EXPIRED);
            }
        });
        self.pump_events();

        let Some(session) = self.session.as_ref() else {
            return;
        };
        let core = session.handler.core();
        if core.is_terminal() {
            let success = core.success();
            let bonus = success && self.tracker.has_bonus(session.run_id);
            self.end(success, bonus);
        }
    }

    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = view;
    }

    // === QUERIES ===

    pub fn id(&self) -> OrchestratorId {
        self.id
    }

    pub fn phase(&self) -> OrchestratorPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn active_id(&self) -> Option<Tag> {
        self.session.as_ref().map(|s| s.definition.id)
    }

    pub fn active_definition(&self) -> Option<&MiniGameDefinition> {
        self.session.as_ref().map(|s| &s.definition)
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.session.as_ref().map(|s| s.run_id)
    }

    /// Active handler, for downcasting to its query surface
    pub fn active_handler(&self) -> Option<&dyn MiniGameHandler> {
        self.session.as_ref().map(|s| s.handler.as_ref())
    }

    /// Fraction of the active objective set met, 0 when idle
    pub fn current_progress(&self) -> f32 {
        self.session
            .as_ref()
            .map(|s| self.tracker.progress(s.run_id))
            .unwrap_or(0.0)
    }

    pub fn last_outcome(&self) -> Option<&MiniGameOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn drain_events(&mut self) -> Vec<MiniGameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn tracker(&self) -> &ObjectiveTracker {
        &self.tracker
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    pub fn table(&self) -> &DefinitionTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DefinitionTable {
        &mut self.table
    }

    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // === INTERNALS ===

    fn resolve_definition(&self, id: Tag, station: Option<&dyn Station>) -> Result<MiniGameDefinition> {
        if let Some(mut definition) = station.and_then(|s| s.mini_game_config()) {
            definition.fill_default_objectives();
            return Ok(definition);
        }
        self.table.get(&id).cloned().ok_or_else(|| {
            tracing::warn!(id = %id, "Start rejected: no definition");
            MiniGameError::ConfigNotFound(id)
        })
    }

    fn spawn_handler(&self, definition: &MiniGameDefinition, run_id: RunId) -> Result<Box<dyn MiniGameHandler>> {
        let mut handler = self.registry.spawn(definition)?;
        handler.initialize(self.id, definition, run_id)?;
        Ok(handler)
    }

    /// Run `f` against the active handler with a freshly built context
    fn with_handler<R>(
        &mut self,
        f: impl FnOnce(&mut dyn MiniGameHandler, &mut HandlerContext<'_>) -> R,
    ) -> Option<R> {
        let session = self.session.as_mut()?;
        let station = session.station.as_ref().and_then(Weak::upgrade);
        let mut ctx = HandlerContext::new(self.id, &mut self.tracker, &mut self.rng)
            .with_station(station.as_deref())
            .with_view(self.view);
        Some(f(session.handler.as_mut(), &mut ctx))
    }

    /// Forward tracker and handler signals to the public event queue
    fn pump_events(&mut self) {
        let Some(session) = self.session.as_mut() else {
            self.tracker.drain_events();
            return;
        };
        let id = session.definition.id;
        let run_id = session.run_id;

        for event in self.tracker.drain_events() {
            match event {
                TrackerEvent::ObjectiveUpdated { run, tag, value } if run == run_id => {
                    self.events.push(MiniGameEvent::ObjectiveProgress {
                        id,
                        objective: tag,
                        value,
                    });
                }
                TrackerEvent::ObjectiveMet { run, tag, timestamp } if run == run_id => {
                    self.events.push(MiniGameEvent::ObjectiveMet {
                        id,
                        objective: tag,
                        timestamp,
                    });
                }
                TrackerEvent::SetComplete { run, bonus } if run == run_id => {
                    self.events.push(MiniGameEvent::ObjectivesComplete { id, bonus });
                }
                _ => {}
            }
        }

        for event in session.handler.core_mut().drain_events() {
            self.events.push(MiniGameEvent::Mechanic { id, event });
        }
    }

    /// Shared teardown for end and cancel. Order: silence and deactivate the
    /// handler, release the camera, unregister objectives, notify the station.
    fn teardown(&mut self, success: bool, bonus: bool, cancel_reason: Option<String>) -> Option<MiniGameOutcome> {
        let mut session = self.session.take()?;
        let id = session.definition.id;
        let cancelled = cancel_reason.is_some();

        session.handler.core_mut().discard_events();
        let failure_reason = cancel_reason.or_else(|| session.handler.core().failure_reason().map(str::to_string));
        session.handler.deactivate();
        session.handler.core_mut().discard_events();

        self.camera.release_camera_mode(&CameraRelease {
            requester: session.requester,
            blend_time: self.config.camera_release_blend,
        });

        let objectives_complete = self.tracker.is_complete(session.run_id);
        let progress = self.tracker.progress(session.run_id);
        self.tracker.unregister(session.run_id);
        self.tracker.drain_events();

        if let Some(station) = session.station.as_ref().and_then(Weak::upgrade) {
            station.on_mini_game_ended(id, success, bonus);
        }

        let outcome = MiniGameOutcome {
            id,
            success,
            bonus,
            cancelled,
            failure_reason: if success { None } else { failure_reason },
            objectives_complete,
            progress,
            elapsed: session.elapsed,
        };
        self.last_outcome = Some(outcome.clone());
        self.phase = OrchestratorPhase::Idle;
        Some(outcome)
    }
}

impl<C: CameraService> Drop for MiniGameOrchestrator<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<C: CameraService> std::fmt::Debug for MiniGameOrchestrator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniGameOrchestrator")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("active", &self.active_id())
            .field("pending_events", &self.events.len())
            .finish()
    }
}
