//! Temperature handler - keep an item inside its optimal band long enough
//! without burning or freezing it.
//!
//! Primary heats at full rate while held, secondary cools actively, and the
//! Y axis gives analog heat when neither button is down. With no input the
//! item cools passively.

use std::any::Any;

use glam::Vec2;

use super::context::HandlerContext;
use super::core::HandlerCore;
use super::events::HandlerEvent;
use super::MiniGameHandler;
use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::definition::{MiniGameDefinition, TemperatureConfig};
use crate::tags;

pub const OVERHEATED: &str = "Overheated";
pub const FROZEN: &str = "Frozen";

#[derive(Debug, Default)]
pub struct TemperatureHandler {
    core: HandlerCore,
    config: TemperatureConfig,

    temperature: f32,
    heat_input: f32,
    heating: bool,
    cooling: bool,
    in_optimal_zone: bool,
    time_in_optimal: f32,
    ruined: bool,
}

impl TemperatureHandler {
    pub const CLASS_NAME: &'static str = "Temperature";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Signed heat input in [-1, 1]
    pub fn heat_input(&self) -> f32 {
        self.heat_input
    }

    pub fn is_heating(&self) -> bool {
        self.heating
    }

    pub fn in_optimal_zone(&self) -> bool {
        self.in_optimal_zone
    }

    pub fn in_danger_zone(&self) -> bool {
        self.config.is_dangerous(self.temperature)
    }

    pub fn is_ruined(&self) -> bool {
        self.ruined
    }

    pub fn time_in_optimal(&self) -> f32 {
        self.time_in_optimal
    }

    pub fn progress(&self) -> f32 {
        if self.config.required_duration <= 0.0 {
            return 0.0;
        }
        (self.time_in_optimal / self.config.required_duration).clamp(0.0, 1.0)
    }

    fn integrate(&mut self, dt: f32) {
        let delta = if self.heat_input > 0.0 {
            self.config.heat_rate * self.heat_input * dt
        } else if self.heat_input < 0.0 {
            self.config.cool_rate * self.heat_input * dt
        } else {
            -self.config.cool_rate * dt
        };
        self.temperature = (self.temperature + delta).max(0.0);
    }

    fn update_zones(&mut self, ctx: &mut HandlerContext<'_>) {
        let was_optimal = self.in_optimal_zone;
        self.in_optimal_zone = self.config.is_optimal(self.temperature);

        if self.in_optimal_zone && !was_optimal {
            tracing::debug!(temperature = self.temperature, "Entered optimal zone");
            self.core.push_event(HandlerEvent::OptimalZoneEntered {
                temperature: self.temperature,
            });
        } else if !self.in_optimal_zone && was_optimal {
            tracing::debug!(temperature = self.temperature, "Left optimal zone");
            if self.config.reset_on_zone_exit {
                self.time_in_optimal = 0.0;
            }
            self.core.push_event(HandlerEvent::OptimalZoneLeft {
                temperature: self.temperature,
            });
        }

        if self.config.is_overheated(self.temperature) {
            self.ruin(ctx, OVERHEATED);
        } else if self.config.is_frozen(self.temperature) {
            self.ruin(ctx, FROZEN);
        }
    }

    fn ruin(&mut self, ctx: &mut HandlerContext<'_>, reason: &str) {
        if self.ruined {
            return;
        }
        self.ruined = true;
        self.heating = false;
        tracing::debug!(temperature = self.temperature, reason, "Item ruined");
        self.core.push_event(HandlerEvent::ItemRuined {
            reason: reason.to_string(),
            temperature: self.temperature,
        });
        self.core.mark_failed(ctx, reason);
    }

    fn report_progress(&mut self, ctx: &mut HandlerContext<'_>) {
        if self.config.required_duration <= 0.0 {
            return;
        }
        let progress = self.progress();
        self.core
            .report_value(ctx, &tags::objective::temperature_maintained(), progress);
    }
}

impl MiniGameHandler for TemperatureHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    fn configure(&mut self, definition: &MiniGameDefinition) -> Result<()> {
        let config = definition.as_temperature().ok_or_else(|| {
            MiniGameError::HandlerSpawnFailed(format!("{} has no temperature block", definition.id))
        })?;
        self.config = config.clone();
        Ok(())
    }

    fn on_activate(&mut self, _ctx: &mut HandlerContext<'_>) {
        self.temperature = self.config.starting_temperature();
        self.heat_input = 0.0;
        self.heating = false;
        self.cooling = false;
        self.time_in_optimal = 0.0;
        self.ruined = false;
        self.in_optimal_zone = self.config.is_optimal(self.temperature);
    }

    fn on_deactivate(&mut self) {
        self.heating = false;
        self.cooling = false;
    }

    fn tick_mechanic(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        if self.ruined {
            return;
        }

        self.integrate(dt);
        self.update_zones(ctx);
        if !self.core.is_active() {
            return;
        }

        if self.in_optimal_zone {
            self.time_in_optimal += dt;
            self.report_progress(ctx);

            if self.time_in_optimal >= self.config.required_duration {
                self.core
                    .report_complete(ctx, &tags::objective::temperature_maintained());
                self.core.mark_complete(true);
            }
        }
    }

    fn handle_axis(&mut self, _ctx: &mut HandlerContext<'_>, axis: Vec2, _dt: f32) {
        if self.heating || self.cooling {
            return;
        }
        self.heat_input = axis.y.clamp(0.0, 1.0);
    }

    fn handle_action(&mut self, _ctx: &mut HandlerContext<'_>, action: &Tag, pressed: bool) {
        if action.matches_exact(&tags::input::primary()) {
            self.heating = pressed;
            if pressed {
                self.heat_input = 1.0;
            } else if self.cooling {
                self.heat_input = self.config.active_cool_input;
            } else {
                self.heat_input = 0.0;
            }
        } else if action.matches_exact(&tags::input::secondary()) {
            self.cooling = pressed;
            if pressed {
                self.heat_input = self.config.active_cool_input;
            } else if self.heating {
                self.heat_input = 1.0;
            } else {
                self.heat_input = 0.0;
            }
        }
    }

    fn needs_tick(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
