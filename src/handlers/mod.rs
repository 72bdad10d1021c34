//! Mechanic handlers - one pluggable state machine per skill check
//!
//! Every handler embeds a [`HandlerCore`] for the shared lifecycle and
//! implements the mechanic hooks. The provided trait methods gate the hooks
//! on the lifecycle so handlers only see input and ticks while active.

pub mod calibration;
pub mod context;
pub mod core;
pub mod events;
pub mod manipulation;
pub mod registry;
pub mod sequence;
pub mod sweetspot;
pub mod temperature;
pub mod timing;

use std::any::Any;

use glam::{Vec2, Vec3};

use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::core::types::{OrchestratorId, RunId};
use crate::definition::MiniGameDefinition;

pub use self::calibration::CalibrationHandler;
pub use self::context::HandlerContext;
pub use self::core::{HandlerCore, HandlerState, TIME_EXPIRED};
pub use self::events::HandlerEvent;
pub use self::manipulation::ManipulationHandler;
pub use self::registry::{HandlerFactory, HandlerRegistry};
pub use self::sequence::SequenceHandler;
pub use self::sweetspot::SweetspotHandler;
pub use self::temperature::TemperatureHandler;
pub use self::timing::TimingHandler;

/// Contract shared by all mechanic handlers
pub trait MiniGameHandler: Any {
    fn core(&self) -> &HandlerCore;
    fn core_mut(&mut self) -> &mut HandlerCore;

    /// Copy the mechanic block out of the definition
    fn configure(&mut self, definition: &MiniGameDefinition) -> Result<()>;

    /// Reset all mechanic state to its starting values
    fn on_activate(&mut self, _ctx: &mut HandlerContext<'_>) {}

    fn on_deactivate(&mut self) {}

    fn tick_mechanic(&mut self, _ctx: &mut HandlerContext<'_>, _dt: f32) {}

    fn handle_axis(&mut self, _ctx: &mut HandlerContext<'_>, _axis: Vec2, _dt: f32) {}

    fn handle_action(&mut self, _ctx: &mut HandlerContext<'_>, _action: &Tag, _pressed: bool) {}

    fn handle_positional(&mut self, _ctx: &mut HandlerContext<'_>, _point: Vec3, _normal: Vec3) {}

    /// Whether the orchestrator should call `tick` every frame
    fn needs_tick(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn initialize(&mut self, owner: OrchestratorId, definition: &MiniGameDefinition, run_id: RunId) -> Result<()> {
        if self.core().is_active() {
            return Err(MiniGameError::HandlerSpawnFailed(format!(
                "{} is still active",
                self.core().mini_game_id()
            )));
        }
        self.configure(definition)?;
        self.core_mut().initialize(owner, definition, run_id);
        Ok(())
    }

    fn activate(&mut self, ctx: &mut HandlerContext<'_>) {
        if self.core_mut().activate() {
            self.on_activate(ctx);
        }
    }

    fn deactivate(&mut self) {
        self.on_deactivate();
        self.core_mut().deactivate();
    }

    /// Advance the shared clock only, enforcing the timeout
    fn tick_clock(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) -> bool {
        self.core_mut().advance(ctx, dt)
    }

    fn tick(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        if self.tick_clock(ctx, dt) {
            self.tick_mechanic(ctx, dt);
        }
    }

    fn process_axis_input(&mut self, ctx: &mut HandlerContext<'_>, axis: Vec2, dt: f32) {
        if self.core().is_active() {
            self.handle_axis(ctx, axis, dt);
        }
    }

    fn process_action_input(&mut self, ctx: &mut HandlerContext<'_>, action: &Tag, pressed: bool) {
        if self.core().is_active() {
            self.handle_action(ctx, action, pressed);
        }
    }

    fn process_positional_input(&mut self, ctx: &mut HandlerContext<'_>, point: Vec3, normal: Vec3) {
        if self.core().is_active() {
            self.handle_positional(ctx, point, normal);
        }
    }

    fn is_complete(&self) -> bool {
        self.core().is_complete()
    }

    fn is_failed(&self) -> bool {
        self.core().is_failed()
    }
}

impl dyn MiniGameHandler {
    /// Borrow the concrete handler behind the trait object
    pub fn downcast_ref<T: MiniGameHandler>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
