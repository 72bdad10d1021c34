//! Mechanic events surfaced to the presentation layer

use serde::{Deserialize, Serialize};

use crate::core::tag::Tag;

/// Something a handler did that a presentation layer may want to show.
///
/// Objective progress is not repeated here; it reaches callers through the
/// tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HandlerEvent {
    /// Handler reached its success condition
    Completed { success: bool },
    /// Handler entered its terminal failure state
    Failed { reason: String },

    PinUnlocked { pin: u32 },
    /// `None` when attempts are unlimited
    PickBroken { attempts_remaining: Option<u32> },
    FeedbackChanged { intensity: f32, in_sweetspot: bool },

    SequenceInput { input: Tag, correct: bool },
    SequenceReset,

    TimingResult { hit: bool, accuracy: f32 },

    LockGained,
    LockLost,

    OptimalZoneEntered { temperature: f32 },
    OptimalZoneLeft { temperature: f32 },
    /// Pushed just before the matching `Failed`
    ItemRuined { reason: String, temperature: f32 },

    Grabbed { part: Tag },
    Released { part: Tag, snapped: bool },
    SnapTargetChanged { point: Option<Tag> },
    ItemSnapped { point: Tag, part: Tag },
}
