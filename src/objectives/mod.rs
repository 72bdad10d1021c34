//! Objective tracking - weighted pass/fail conditions and completion policy

pub mod condition;
pub mod tracker;

pub use condition::{CompareOp, ObjectiveCondition, ObjectiveEntry, ObjectiveSet};
pub use tracker::{ObjectiveState, ObjectiveTracker, TrackedObjectiveSet, TrackerEvent};
