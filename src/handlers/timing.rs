//! Timing / rhythm handler
//!
//! A cursor sweeps a 0-1 cycle; the player presses primary while it is
//! inside the hit window. Hits can speed the cycle up and narrow the window.

use std::any::Any;

use super::context::HandlerContext;
use super::core::HandlerCore;
use super::events::HandlerEvent;
use super::MiniGameHandler;
use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::definition::{MiniGameDefinition, RhythmConfig};
use crate::tags;

pub const TOO_MANY_MISSES: &str = "Too many misses";
pub const CYCLE_ENDED: &str = "Cycle ended without enough successes";

#[derive(Debug, Default)]
pub struct TimingHandler {
    core: HandlerCore,
    config: RhythmConfig,

    cycle_position: f32,
    cycle_duration: f32,
    window_start: f32,
    window_end: f32,
    in_window: bool,
    window_hit: bool,
    success_count: u32,
    miss_count: u32,
    last_accuracy: f32,
}

impl TimingHandler {
    pub const CLASS_NAME: &'static str = "Timing";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle_position(&self) -> f32 {
        self.cycle_position
    }

    pub fn cycle_duration(&self) -> f32 {
        self.cycle_duration
    }

    /// Current (possibly shrunk) window bounds
    pub fn window(&self) -> (f32, f32) {
        (self.window_start, self.window_end)
    }

    pub fn in_window(&self) -> bool {
        self.in_window
    }

    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    pub fn miss_count(&self) -> u32 {
        self.miss_count
    }

    pub fn last_accuracy(&self) -> f32 {
        self.last_accuracy
    }

    fn is_in_window(&self, position: f32) -> bool {
        position >= self.window_start && position <= self.window_end
    }

    /// 1.0 at the window center, falling linearly to 0.0 at either edge
    pub fn accuracy_at(&self, position: f32) -> f32 {
        if !self.is_in_window(position) {
            return 0.0;
        }
        let center = (self.window_start + self.window_end) * 0.5;
        let half = (self.window_end - self.window_start) * 0.5;
        if half <= 0.0 {
            return 1.0;
        }
        (1.0 - (position - center).abs() / half).clamp(0.0, 1.0)
    }

    fn report_progress(&mut self, ctx: &mut HandlerContext<'_>) {
        if self.config.required_success_count == 0 {
            return;
        }
        let progress = self.success_count as f32 / self.config.required_success_count as f32;
        self.core
            .report_value(ctx, &tags::objective::timing_hit(), progress);
    }

    fn register_hit(&mut self, ctx: &mut HandlerContext<'_>, accuracy: f32) {
        self.window_hit = true;
        self.success_count += 1;
        self.last_accuracy = accuracy;
        self.core.push_event(HandlerEvent::TimingResult { hit: true, accuracy });
        self.report_progress(ctx);

        if self.success_count >= self.config.required_success_count {
            self.core
                .report_complete(ctx, &tags::objective::timing_hit());
            self.core.mark_complete(true);
            return;
        }

        if self.config.increasing_tempo {
            let faster = self.cycle_duration * (1.0 - self.config.tempo_increase_rate);
            self.cycle_duration = faster.max(self.config.min_cycle_duration);
        }
        self.shrink_window();
    }

    fn register_miss(&mut self, ctx: &mut HandlerContext<'_>) {
        self.miss_count += 1;
        self.last_accuracy = 0.0;
        tracing::debug!(misses = self.miss_count, "Timing miss");
        self.core.push_event(HandlerEvent::TimingResult {
            hit: false,
            accuracy: 0.0,
        });

        if self.config.max_misses > 0 && self.miss_count > self.config.max_misses {
            self.core.mark_failed(ctx, TOO_MANY_MISSES);
        }
    }

    fn shrink_window(&mut self) {
        let rate = self.config.timing.window_shrink_rate;
        if rate <= 0.0 {
            return;
        }
        let center = (self.window_start + self.window_end) * 0.5;
        let size = (self.window_end - self.window_start - rate).max(self.config.timing.min_window_size);
        self.window_start = (center - size * 0.5).max(0.0);
        self.window_end = (center + size * 0.5).min(1.0);
    }

    /// Whether sweeping from `from` to `to` carried the cursor past the
    /// window's far edge. Inclusive at `from` since the window is.
    fn swept_past_window(&self, from: f32, to: f32) -> bool {
        from <= self.window_end && to > self.window_end
    }

    fn advance_cycle(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        let previous = self.cycle_position;
        self.cycle_position += dt / self.cycle_duration;
        self.in_window = self.is_in_window(self.cycle_position);

        // Covers a window skipped entirely within one tick as well
        if !self.window_hit && self.swept_past_window(previous, self.cycle_position) {
            self.register_miss(ctx);
            if !self.core.is_active() {
                return;
            }
        }

        if self.cycle_position >= 1.0 {
            if self.config.timing.looping {
                self.cycle_position -= 1.0;
                self.window_hit = false;
                self.in_window = self.is_in_window(self.cycle_position);

                // The remainder can carry past the next cycle's window too
                if self.swept_past_window(0.0, self.cycle_position) {
                    self.register_miss(ctx);
                }
            } else if self.success_count < self.config.required_success_count {
                self.core.mark_failed(ctx, CYCLE_ENDED);
            }
        }
    }
}

impl MiniGameHandler for TimingHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    fn configure(&mut self, definition: &MiniGameDefinition) -> Result<()> {
        let config = definition.as_timing().ok_or_else(|| {
            MiniGameError::HandlerSpawnFailed(format!("{} has no timing block", definition.id))
        })?;
        self.config = config.clone();
        Ok(())
    }

    fn on_activate(&mut self, _ctx: &mut HandlerContext<'_>) {
        self.cycle_position = 0.0;
        self.cycle_duration = self.config.timing.cycle_duration.max(f32::EPSILON);
        self.window_start = self.config.timing.window_start;
        self.window_end = self.config.timing.window_end;
        self.in_window = false;
        self.window_hit = false;
        self.success_count = 0;
        self.miss_count = 0;
        self.last_accuracy = 0.0;
    }

    fn tick_mechanic(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        self.advance_cycle(ctx, dt);
    }

    fn handle_action(&mut self, ctx: &mut HandlerContext<'_>, action: &Tag, pressed: bool) {
        if !pressed || !action.matches_exact(&tags::input::primary()) || self.window_hit {
            return;
        }
        if self.in_window {
            let accuracy = self.accuracy_at(self.cycle_position);
            self.register_hit(ctx, accuracy);
        } else {
            self.register_miss(ctx);
        }
    }

    fn needs_tick(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{MechanicConfig, TimingWindowConfig};
    use crate::handlers::test_support::Harness;

    fn harness(config: RhythmConfig) -> Harness {
        Harness::new(MiniGameDefinition::new(
            Tag::new("Test.Timing.Rhythm"),
            MechanicConfig::Timing(config),
        ))
    }

    fn tick(h: &mut Harness, handler: &mut TimingHandler, dt: f32) {
        let mut ctx = h.ctx();
        handler.tick(&mut ctx, dt);
    }

    fn hit(h: &mut Harness, handler: &mut TimingHandler) {
        let mut ctx = h.ctx();
        handler.process_action_input(&mut ctx, &tags::input::primary(), true);
    }

    #[test]
    fn test_center_hit_is_perfect() {
        let mut h = harness(RhythmConfig::default());
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.25);
        tick(&mut h, &mut handler, 0.25);
        assert_eq!(handler.cycle_position(), 0.5);
        hit(&mut h, &mut handler);

        assert_eq!(handler.success_count(), 1);
        assert_eq!(handler.last_accuracy(), 1.0);
    }

    #[test]
    fn test_edge_hits_score_low_but_count() {
        for position in [0.405_f32, 0.595] {
            let mut h = harness(RhythmConfig::default());
            let mut handler = TimingHandler::new();
            h.start(&mut handler);

            tick(&mut h, &mut handler, position);
            hit(&mut h, &mut handler);

            assert_eq!(handler.success_count(), 1, "position {}", position);
            assert_eq!(handler.miss_count(), 0);
            let accuracy = handler.last_accuracy();
            assert!(accuracy > 0.0);
            assert!(accuracy < 0.1, "accuracy {}", accuracy);
        }
    }

    #[test]
    fn test_press_outside_window_is_miss() {
        let mut h = harness(RhythmConfig::default());
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.1);
        hit(&mut h, &mut handler);
        assert_eq!(handler.miss_count(), 1);
        assert_eq!(handler.success_count(), 0);
    }

    #[test]
    fn test_window_passing_unhit_is_miss() {
        let mut h = harness(RhythmConfig::default());
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.5);
        assert!(handler.in_window());
        tick(&mut h, &mut handler, 0.2);
        assert_eq!(handler.miss_count(), 1);
    }

    #[test]
    fn test_window_skipped_in_one_tick_is_miss() {
        let mut h = harness(RhythmConfig::default());
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.3);
        assert!(!handler.in_window());
        tick(&mut h, &mut handler, 0.4);
        assert!(!handler.in_window());
        assert_eq!(handler.miss_count(), 1);
    }

    #[test]
    fn test_wrap_past_next_window_counts_both_misses() {
        let mut h = harness(RhythmConfig::default());
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.3);
        tick(&mut h, &mut handler, 1.4);
        assert!((handler.cycle_position() - 0.7).abs() < 1e-5);
        assert_eq!(handler.miss_count(), 2);
    }

    #[test]
    fn test_hit_window_once_per_cycle() {
        let mut h = harness(RhythmConfig::default());
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.5);
        hit(&mut h, &mut handler);
        hit(&mut h, &mut handler);
        assert_eq!(handler.success_count(), 1);
        assert_eq!(handler.miss_count(), 0);

        // Leaving a window that was hit is not a miss
        tick(&mut h, &mut handler, 0.2);
        assert_eq!(handler.miss_count(), 0);
    }

    #[test]
    fn test_required_hits_complete() {
        let mut h = harness(RhythmConfig {
            required_success_count: 2,
            ..RhythmConfig::default()
        });
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.5);
        hit(&mut h, &mut handler);
        tick(&mut h, &mut handler, 1.0);
        assert!(handler.in_window());
        hit(&mut h, &mut handler);

        assert!(handler.is_complete());
        assert!(h.tracker.is_complete(h.run));
    }

    #[test]
    fn test_hit_shrinks_window_and_tempo() {
        let mut h = harness(RhythmConfig {
            increasing_tempo: true,
            tempo_increase_rate: 0.1,
            ..RhythmConfig::default()
        });
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.5);
        hit(&mut h, &mut handler);

        let (start, end) = handler.window();
        assert!((end - start - 0.18).abs() < 1e-5);
        assert!(((start + end) * 0.5 - 0.5).abs() < 1e-5);
        assert!((handler.cycle_duration() - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_misses_past_limit_fail() {
        let mut h = harness(RhythmConfig {
            max_misses: 1,
            ..RhythmConfig::default()
        });
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        hit(&mut h, &mut handler);
        assert!(handler.core().is_active());
        hit(&mut h, &mut handler);
        assert!(handler.is_failed());
        assert_eq!(handler.core().failure_reason(), Some(TOO_MANY_MISSES));
    }

    #[test]
    fn test_non_looping_cycle_end_fails() {
        let mut h = harness(RhythmConfig {
            max_misses: 0,
            timing: TimingWindowConfig {
                looping: false,
                ..TimingWindowConfig::default()
            },
            ..RhythmConfig::default()
        });
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.5);
        hit(&mut h, &mut handler);
        tick(&mut h, &mut handler, 0.6);

        assert!(handler.is_failed());
        assert_eq!(handler.core().failure_reason(), Some(CYCLE_ENDED));
    }

    #[test]
    fn test_wrap_keeps_remainder() {
        let mut h = harness(RhythmConfig::default());
        let mut handler = TimingHandler::new();
        h.start(&mut handler);

        tick(&mut h, &mut handler, 0.5);
        hit(&mut h, &mut handler);
        tick(&mut h, &mut handler, 0.75);
        assert!((handler.cycle_position() - 0.25).abs() < 1e-5);
    }
}
