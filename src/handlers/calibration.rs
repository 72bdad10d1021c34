//! Calibration handler - steer a value onto a (possibly drifting) target
//! and hold it there.

use std::any::Any;

use glam::Vec2;
use rand::Rng;

use super::context::HandlerContext;
use super::core::HandlerCore;
use super::events::HandlerEvent;
use super::MiniGameHandler;
use crate::core::error::{MiniGameError, Result};
use crate::definition::{CalibrationConfig, MiniGameDefinition};
use crate::tags;

#[derive(Debug, Default)]
pub struct CalibrationHandler {
    core: HandlerCore,
    config: CalibrationConfig,

    value: f32,
    target: f32,
    tolerance: f32,
    locked: bool,
    time_held: f32,
    /// +1 or -1 while the target drifts
    target_direction: f32,
}

impl CalibrationHandler {
    pub const CLASS_NAME: &'static str = "Calibration";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn time_held(&self) -> f32 {
        self.time_held
    }

    /// Held time as a fraction of the required duration
    pub fn hold_progress(&self) -> f32 {
        if self.config.required_hold_duration <= 0.0 {
            return 0.0;
        }
        (self.time_held / self.config.required_hold_duration).clamp(0.0, 1.0)
    }

    /// Distance to target in tolerance units, clamped to [0, 1]
    pub fn distance_from_target(&self) -> f32 {
        if self.tolerance <= 0.0 {
            return 1.0;
        }
        ((self.value - self.target).abs() / self.tolerance).clamp(0.0, 1.0)
    }

    fn update_target(&mut self, dt: f32) {
        if !self.config.moving_target {
            return;
        }
        self.target += self.config.target_move_speed * self.target_direction * dt;
        if self.target >= self.config.target_bound_max {
            self.target = self.config.target_bound_max;
            self.target_direction = -1.0;
        } else if self.target <= self.config.target_bound_min {
            self.target = self.config.target_bound_min;
            self.target_direction = 1.0;
        }
    }

    fn update_tolerance(&mut self, dt: f32) {
        if self.config.zone_shrink_rate <= 0.0 {
            return;
        }
        self.tolerance = (self.tolerance - self.config.zone_shrink_rate * dt)
            .max(self.config.sweetspot.tolerance_min);
    }

    fn update_lock(&mut self, ctx: &mut HandlerContext<'_>) {
        let was_locked = self.locked;
        self.locked = (self.value - self.target).abs() <= self.tolerance;

        if self.locked && !was_locked {
            tracing::debug!(value = self.value, target = self.target, "Calibration lock gained");
            self.core.push_event(HandlerEvent::LockGained);
        } else if !self.locked && was_locked {
            tracing::debug!(held = self.time_held, "Calibration lock lost");
            self.time_held = 0.0;
            self.core
                .report_value(ctx, &tags::objective::calibration_held(), 0.0);
            self.core.push_event(HandlerEvent::LockLost);
        }
    }

    fn update_hold(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        if !self.locked {
            return;
        }
        self.time_held += dt;
        let progress = self.hold_progress();
        self.core
            .report_value(ctx, &tags::objective::calibration_held(), progress);

        if self.time_held >= self.config.required_hold_duration {
            self.core
                .report_complete(ctx, &tags::objective::calibration_held());
            self.core.mark_complete(true);
        }
    }
}

impl MiniGameHandler for CalibrationHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    fn configure(&mut self, definition: &MiniGameDefinition) -> Result<()> {
        let config = definition.as_calibration().ok_or_else(|| {
            MiniGameError::HandlerSpawnFailed(format!("{} has no calibration block", definition.id))
        })?;
        self.config = config.clone();
        Ok(())
    }

    fn on_activate(&mut self, ctx: &mut HandlerContext<'_>) {
        self.value = 0.5;
        self.target = ctx
            .rng
            .gen_range(self.config.spawn_min..=self.config.spawn_max);
        self.tolerance = self.config.sweetspot.tolerance_max;
        self.locked = false;
        self.time_held = 0.0;
        self.target_direction = if ctx.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    }

    fn tick_mechanic(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        self.update_target(dt);
        self.update_tolerance(dt);
        self.update_lock(ctx);
        self.update_hold(ctx, dt);
    }

    fn handle_axis(&mut self, _ctx: &mut HandlerContext<'_>, axis: Vec2, dt: f32) {
        let delta = axis.y * dt * self.config.input_sensitivity;
        self.value = (self.value + delta).clamp(0.0, 1.0);
    }

    fn needs_tick(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
