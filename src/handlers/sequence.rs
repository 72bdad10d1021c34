//! Code entry / QTE sequence handler
//!
//! Inputs under `Input.Numpad` or `Input.QTE` are appended to the attempt.
//! Enter, clear and backspace are recognised by exact tag before that, since
//! enter and clear live under the numpad too.

use std::any::Any;

use super::context::HandlerContext;
use super::core::HandlerCore;
use super::events::HandlerEvent;
use super::MiniGameHandler;
use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::definition::{MiniGameDefinition, SequenceConfig};
use crate::tags;

pub const TOO_MANY_ERRORS: &str = "Too many errors";

#[derive(Debug, Default)]
pub struct SequenceHandler {
    core: HandlerCore,
    config: SequenceConfig,

    expected: Vec<Tag>,
    current: Vec<Tag>,
    error_count: u32,
    time_since_input: f32,
    last_input_correct: bool,
}

impl SequenceHandler {
    pub const CLASS_NAME: &'static str = "Sequence";

    pub fn new() -> Self {
        Self::default()
    }

    /// Inputs entered in the current attempt
    pub fn current_sequence(&self) -> &[Tag] {
        &self.current
    }

    pub fn expected_sequence(&self) -> &[Tag] {
        &self.expected
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn last_input_correct(&self) -> bool {
        self.last_input_correct
    }

    pub fn time_since_input(&self) -> f32 {
        self.time_since_input
    }

    fn is_match(&self) -> bool {
        if self.current.len() != self.expected.len() {
            return false;
        }
        if self.config.order_matters {
            self.current == self.expected
        } else {
            self.expected.iter().all(|tag| self.current.contains(tag))
        }
    }

    fn is_valid_prefix(&self) -> bool {
        if !self.config.order_matters {
            return true;
        }
        self.current.len() <= self.expected.len()
            && self
                .current
                .iter()
                .zip(&self.expected)
                .all(|(entered, expected)| entered == expected)
    }

    fn report_progress(&mut self, ctx: &mut HandlerContext<'_>) {
        if self.expected.is_empty() {
            return;
        }
        let progress = self.current.len() as f32 / self.expected.len() as f32;
        self.core
            .report_value(ctx, &tags::objective::sequence_complete(), progress);
    }

    fn reset_attempt(&mut self, ctx: &mut HandlerContext<'_>) {
        self.current.clear();
        self.time_since_input = 0.0;
        self.core.push_event(HandlerEvent::SequenceReset);
        self.report_progress(ctx);
    }

    /// Count an error, failing past the limit and resetting otherwise
    fn register_error(&mut self, ctx: &mut HandlerContext<'_>) {
        self.error_count += 1;
        self.last_input_correct = false;
        tracing::debug!(errors = self.error_count, "Sequence error");

        if self.config.max_errors > 0 && self.error_count > self.config.max_errors {
            self.core.mark_failed(ctx, TOO_MANY_ERRORS);
        } else {
            self.reset_attempt(ctx);
        }
    }

    fn complete(&mut self, ctx: &mut HandlerContext<'_>) {
        self.core
            .report_complete(ctx, &tags::objective::code_entered());
        self.core.mark_complete(true);
    }

    fn confirm(&mut self, ctx: &mut HandlerContext<'_>) {
        if self.is_match() {
            self.complete(ctx);
        } else {
            self.register_error(ctx);
        }
    }

    fn backspace(&mut self, ctx: &mut HandlerContext<'_>) {
        if !self.config.allow_backspace {
            return;
        }
        self.time_since_input = 0.0;
        if self.current.pop().is_some() {
            self.report_progress(ctx);
        }
    }

    fn push_input(&mut self, ctx: &mut HandlerContext<'_>, input: Tag) {
        self.time_since_input = 0.0;
        self.current.push(input);

        if self.config.order_matters {
            if !self.is_valid_prefix() {
                self.core.push_event(HandlerEvent::SequenceInput { input, correct: false });
                self.register_error(ctx);
                return;
            }
            self.last_input_correct = true;
        }
        self.core.push_event(HandlerEvent::SequenceInput { input, correct: true });
        self.report_progress(ctx);

        if self.current.len() == self.expected.len() {
            if self.is_match() {
                self.complete(ctx);
            } else if !self.config.order_matters {
                self.register_error(ctx);
            }
        }
    }
}

impl MiniGameHandler for SequenceHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    fn configure(&mut self, definition: &MiniGameDefinition) -> Result<()> {
        let config = definition.as_sequence().ok_or_else(|| {
            MiniGameError::HandlerSpawnFailed(format!("{} has no sequence block", definition.id))
        })?;
        self.config = config.clone();
        Ok(())
    }

    fn on_activate(&mut self, ctx: &mut HandlerContext<'_>) {
        self.current.clear();
        self.error_count = 0;
        self.time_since_input = 0.0;
        self.last_input_correct = true;

        let stored = ctx.station.map(|s| s.stored_code()).unwrap_or_default();
        self.expected = if stored.is_empty() {
            self.config.expected.clone()
        } else {
            stored
        };
        if self.expected.is_empty() {
            tracing::warn!(mini_game = %self.core.mini_game_id(), "Sequence has no expected inputs");
        }
    }

    fn on_deactivate(&mut self) {
        self.current.clear();
    }

    fn tick_mechanic(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        if self.current.is_empty() || self.config.input_timeout <= 0.0 {
            return;
        }
        self.time_since_input += dt;
        if self.time_since_input >= self.config.input_timeout {
            tracing::debug!("Sequence input timed out");
            self.reset_attempt(ctx);
        }
    }

    fn handle_action(&mut self, ctx: &mut HandlerContext<'_>, action: &Tag, pressed: bool) {
        if !pressed {
            return;
        }

        if action.matches_exact(&tags::input::numpad_enter()) {
            self.confirm(ctx);
        } else if action.matches_exact(&tags::input::numpad_clear()) {
            self.reset_attempt(ctx);
        } else if action.matches_exact(&tags::input::backspace()) {
            self.backspace(ctx);
        } else if action.matches(&tags::input::numpad()) || action.matches(&tags::input::qte()) {
            self.push_input(ctx, *action);
        }
    }

    fn needs_tick(&self) -> bool {
        self.config.input_timeout > 0.0 || self.core.timeout() > 0.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::MechanicConfig;
    use crate::handlers::test_support::Harness;
    use crate::station::BasicStation;

    fn digits(code: &[u8]) -> Vec<Tag> {
        code.iter().map(|d| tags::input::numpad_digit(*d)).collect()
    }

    fn harness(config: SequenceConfig) -> Harness {
        Harness::new(MiniGameDefinition::new(
            Tag::new("Test.Sequence.Keypad"),
            MechanicConfig::Sequence(config),
        ))
    }

    fn ordered_123() -> SequenceConfig {
        SequenceConfig {
            expected: digits(&[1, 2, 3]),
            ..SequenceConfig::default()
        }
    }

    fn press(h: &mut Harness, handler: &mut SequenceHandler, tag: Tag) {
        let mut ctx = h.ctx();
        handler.process_action_input(&mut ctx, &tag, true);
    }

    #[test]
    fn test_wrong_digit_counts_error_and_resets() {
        let mut h = harness(ordered_123());
        let mut handler = SequenceHandler::new();
        h.start(&mut handler);

        for tag in digits(&[1, 2, 4]) {
            press(&mut h, &mut handler, tag);
        }
        assert_eq!(handler.error_count(), 1);
        assert!(handler.current_sequence().is_empty());
        assert!(!handler.last_input_correct());
        assert!(handler.core().is_active());

        press(&mut h, &mut handler, tags::input::numpad_digit(1));
        assert_eq!(handler.current_sequence(), &digits(&[1])[..]);
    }

    #[test]
    fn test_correct_code_then_enter_completes() {
        let mut h = harness(ordered_123());
        let mut handler = SequenceHandler::new();
        h.start(&mut handler);

        for tag in digits(&[1, 2, 3]) {
            press(&mut h, &mut handler, tag);
        }
        press(&mut h, &mut handler, tags::input::numpad_enter());

        assert!(handler.is_complete());
        assert!(h.tracker.is_met(h.run, &tags::objective::code_entered()));
        assert_eq!(handler.error_count(), 0);
    }

    #[test]
    fn test_early_enter_is_an_error() {
        let mut h = harness(ordered_123());
        let mut handler = SequenceHandler::new();
        h.start(&mut handler);

        press(&mut h, &mut handler, tags::input::numpad_digit(1));
        press(&mut h, &mut handler, tags::input::numpad_enter());
        assert_eq!(handler.error_count(), 1);
        assert!(handler.current_sequence().is_empty());
    }

    #[test]
    fn test_exceeding_max_errors_fails() {
        let mut h = harness(SequenceConfig {
            max_errors: 1,
            ..ordered_123()
        });
        let mut handler = SequenceHandler::new();
        h.start(&mut handler);

        press(&mut h, &mut handler, tags::input::numpad_digit(9));
        assert!(handler.core().is_active());
        press(&mut h, &mut handler, tags::input::numpad_digit(9));
        assert!(handler.is_failed());
        assert_eq!(handler.core().failure_reason(), Some(TOO_MANY_ERRORS));

        // Terminal: further input is ignored
        press(&mut h, &mut handler, tags::input::numpad_digit(1));
        assert!(handler.current_sequence().is_empty());
    }

    #[test]
    fn test_backspace_and_clear() {
        let mut h = harness(ordered_123());
        let mut handler = SequenceHandler::new();
        h.start(&mut handler);

        press(&mut h, &mut handler, tags::input::numpad_digit(1));
        press(&mut h, &mut handler, tags::input::numpad_digit(2));
        press(&mut h, &mut handler, tags::input::backspace());
        assert_eq!(handler.current_sequence().len(), 1);

        press(&mut h, &mut handler, tags::input::numpad_clear());
        assert!(handler.current_sequence().is_empty());
        assert_eq!(handler.error_count(), 0);
    }

    #[test]
    fn test_unordered_matches_any_order() {
        let mut h = harness(SequenceConfig {
            order_matters: false,
            ..ordered_123()
        });
        let mut handler = SequenceHandler::new();
        h.start(&mut handler);

        for tag in digits(&[3, 1, 2]) {
            press(&mut h, &mut handler, tag);
        }
        assert!(handler.is_complete());
    }

    #[test]
    fn test_unordered_wrong_set_is_error_at_length() {
        let mut h = harness(SequenceConfig {
            order_matters: false,
            ..ordered_123()
        });
        let mut handler = SequenceHandler::new();
        h.start(&mut handler);

        for tag in digits(&[3, 3]) {
            press(&mut h, &mut handler, tag);
        }
        assert_eq!(handler.error_count(), 0);
        press(&mut h, &mut handler, tags::input::numpad_digit(1));
        assert_eq!(handler.error_count(), 1);
        assert!(handler.current_sequence().is_empty());
    }

    #[test]
    fn test_input_timeout_resets_attempt() {
        let mut h = harness(SequenceConfig {
            input_timeout: 1.0,
            ..ordered_123()
        });
        let mut handler = SequenceHandler::new();
        h.start(&mut handler);
        assert!(handler.needs_tick());

        press(&mut h, &mut handler, tags::input::numpad_digit(1));
        let mut ctx = h.ctx();
        handler.tick(&mut ctx, 0.6);
        assert_eq!(handler.current_sequence().len(), 1);
        handler.tick(&mut ctx, 0.6);
        assert!(handler.current_sequence().is_empty());
        assert!(handler.core().is_active());
    }

    #[test]
    fn test_station_code_overrides_config() {
        let mut h = harness(ordered_123());
        let station = BasicStation::new(Tag::new("Test.Sequence.Station")).with_code(digits(&[7, 7]));
        let mut handler = SequenceHandler::new();
        handler
            .initialize(crate::handlers::test_support::OWNER, &h.definition, h.run)
            .expect("initialize");
        {
            let mut ctx = h.ctx().with_station(Some(&station));
            handler.activate(&mut ctx);
        }
        assert_eq!(handler.expected_sequence(), &digits(&[7, 7])[..]);
    }
}
