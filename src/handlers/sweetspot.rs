//! Sweetspot / lockpick handler
//!
//! Each pin hides a target on a 0-1 track. The player scans with the pick
//! (axis X) and feels feedback; holding tension (primary) inside the
//! tolerance unlocks the pin, while tension held off-target wears the pick
//! down until it breaks. Closer misses take longer to break.

use std::any::Any;

use glam::Vec2;
use rand::Rng;

use super::context::HandlerContext;
use super::core::HandlerCore;
use super::events::HandlerEvent;
use super::MiniGameHandler;
use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::definition::{LockpickConfig, MiniGameDefinition};
use crate::tags;

pub const NO_PICKS_REMAINING: &str = "No picks remaining";

/// Distance from the target at which the break threshold bottoms out
const BREAK_FALLOFF_DISTANCE: f32 = 0.5;

/// Minimum feedback change that is worth an event
const FEEDBACK_EVENT_DELTA: f32 = 0.01;

#[derive(Debug, Default)]
pub struct SweetspotHandler {
    core: HandlerCore,
    config: LockpickConfig,

    position: f32,
    target: f32,
    tolerance: f32,
    feedback: f32,
    in_sweetspot: bool,
    tensioned: bool,
    tension_damage: f32,
    pin_index: u32,
    unlocked_pins: u32,
    pin_targets: Vec<f32>,
    /// `None` when attempts are unlimited
    attempts_remaining: Option<u32>,
}

impl SweetspotHandler {
    pub const CLASS_NAME: &'static str = "Sweetspot";

    pub fn new() -> Self {
        Self::default()
    }

    /// Pick position on the 0-1 track
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Hidden target of the current pin
    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// 1.0 inside the tolerance, falling off outside
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn in_sweetspot(&self) -> bool {
        self.in_sweetspot
    }

    pub fn is_tensioned(&self) -> bool {
        self.tensioned
    }

    pub fn tension_damage(&self) -> f32 {
        self.tension_damage
    }

    pub fn pin_index(&self) -> u32 {
        self.pin_index
    }

    pub fn unlocked_pins(&self) -> u32 {
        self.unlocked_pins
    }

    pub fn pin_count(&self) -> u32 {
        self.config.pin_count
    }

    pub fn attempts_remaining(&self) -> Option<u32> {
        self.attempts_remaining
    }

    fn roll_target(&self, ctx: &mut HandlerContext<'_>) -> f32 {
        ctx.rng.gen_range(self.config.target_min..=self.config.target_max)
    }

    fn feedback_at(&self, position: f32) -> f32 {
        if self.tolerance <= 0.0 {
            return 0.0;
        }
        let normalized = (position - self.target).abs() / self.tolerance;
        if normalized <= 1.0 {
            1.0
        } else {
            let falloff = (1.0 - (normalized - 1.0) * 0.5).clamp(0.0, 1.0);
            falloff.powf(self.config.sweetspot.feedback_exponent)
        }
    }

    fn break_threshold(&self) -> f32 {
        let distance = (self.position - self.target).abs();
        let t = (distance / BREAK_FALLOFF_DISTANCE).clamp(0.0, 1.0);
        let near = self.config.break_threshold_near;
        near + (self.config.break_threshold_far - near) * t
    }

    fn update_feedback(&mut self, ctx: &mut HandlerContext<'_>) {
        let previous = self.feedback;
        let was_in = self.in_sweetspot;

        self.feedback = self.feedback_at(self.position);
        self.in_sweetspot = (self.position - self.target).abs() <= self.tolerance;

        if (self.feedback - previous).abs() > FEEDBACK_EVENT_DELTA || self.in_sweetspot != was_in {
            self.core.push_event(HandlerEvent::FeedbackChanged {
                intensity: self.feedback,
                in_sweetspot: self.in_sweetspot,
            });
        }

        let progress = self.unlocked_pins as f32 / self.config.pin_count.max(1) as f32;
        self.core
            .report_value(ctx, &tags::objective::lock_opened(), progress);
    }

    fn apply_tension(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        if self.in_sweetspot {
            self.unlock_current_pin(ctx);
            return;
        }

        self.tension_damage += dt;
        if self.tension_damage >= self.break_threshold() {
            self.break_pick(ctx);
        }
    }

    fn release_tension(&mut self) {
        self.tensioned = false;
        self.tension_damage = 0.0;
    }

    fn unlock_current_pin(&mut self, ctx: &mut HandlerContext<'_>) {
        self.tensioned = false;
        self.unlocked_pins += 1;
        tracing::debug!(pin = self.pin_index, "Pin unlocked");
        self.core.push_event(HandlerEvent::PinUnlocked { pin: self.pin_index });

        if self.unlocked_pins >= self.config.pin_count {
            self.core
                .report_complete(ctx, &tags::objective::lock_opened());
            self.core.mark_complete(true);
        } else {
            self.pin_index += 1;
            if let Some(&target) = self.pin_targets.get(self.pin_index as usize) {
                self.target = target;
                self.position = 0.5;
                self.update_feedback(ctx);
            }
        }
    }

    fn break_pick(&mut self, ctx: &mut HandlerContext<'_>) {
        self.release_tension();

        if self.config.sweetspot.failure_breaks_item {
            if let Some(remaining) = self.attempts_remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
            }
            tracing::debug!(attempts_remaining = ?self.attempts_remaining, "Pick broken");
            self.core.push_event(HandlerEvent::PickBroken {
                attempts_remaining: self.attempts_remaining,
            });

            if self.attempts_remaining == Some(0) {
                self.core.mark_failed(ctx, NO_PICKS_REMAINING);
                return;
            }
        }

        if self.config.randomize_on_fail {
            let target = self.roll_target(ctx);
            if let Some(slot) = self.pin_targets.get_mut(self.pin_index as usize) {
                *slot = target;
                self.target = target;
            }
        }
        self.position = 0.5;
        self.update_feedback(ctx);
    }
}

impl MiniGameHandler for SweetspotHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    fn configure(&mut self, definition: &MiniGameDefinition) -> Result<()> {
        let config = definition.as_lockpick().ok_or_else(|| {
            MiniGameError::HandlerSpawnFailed(format!("{} has no lockpick block", definition.id))
        })?;
        self.config = config.clone();
        Ok(())
    }

    fn on_activate(&mut self, ctx: &mut HandlerContext<'_>) {
        self.position = 0.5;
        self.in_sweetspot = false;
        self.tensioned = false;
        self.tension_damage = 0.0;
        self.pin_index = 0;
        self.unlocked_pins = 0;
        self.feedback = 0.0;
        self.attempts_remaining = match self.config.sweetspot.max_attempts {
            0 => None,
            n => Some(n),
        };

        self.pin_targets = (0..self.config.pin_count)
            .map(|_| self.roll_target(ctx))
            .collect();
        self.target = self.pin_targets.first().copied().unwrap_or(0.5);
        self.tolerance = self.config.adjusted_tolerance(ctx.difficulty());

        self.update_feedback(ctx);
    }

    fn on_deactivate(&mut self) {
        self.tensioned = false;
    }

    fn tick_mechanic(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        if self.tensioned {
            self.apply_tension(ctx, dt);
        }
        if self.core.is_active() {
            self.update_feedback(ctx);
        }
    }

    fn handle_axis(&mut self, ctx: &mut HandlerContext<'_>, axis: Vec2, dt: f32) {
        let delta = axis.x * dt * self.config.pick_sensitivity;
        self.position = (self.position + delta).clamp(0.0, 1.0);
        self.update_feedback(ctx);
    }

    fn handle_action(&mut self, _ctx: &mut HandlerContext<'_>, action: &Tag, pressed: bool) {
        if !action.matches_exact(&tags::input::primary()) {
            return;
        }
        if pressed {
            self.tensioned = true;
            self.tension_damage = 0.0;
        } else {
            self.release_tension();
        }
    }

    fn needs_tick(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
