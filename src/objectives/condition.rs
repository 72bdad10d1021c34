//! Objective definitions: conditions, weighted entries and sets
//!
//! These are immutable definition data, loaded once and shared by any
//! number of tracked runs.

use serde::{Deserialize, Serialize};

use crate::core::tag::Tag;

/// Tolerance used by the equality operators
pub const EQUALITY_EPSILON: f32 = 1.0e-4;

/// Comparison operator for an objective condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    #[default]
    GreaterEqual,
    Less,
    LessEqual,
    InRange,
}

/// A single measurable goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveCondition {
    pub tag: Tag,
    #[serde(default)]
    pub op: CompareOp,
    #[serde(default = "default_target")]
    pub target: f32,
    /// Upper bound, only read by `CompareOp::InRange`
    #[serde(default)]
    pub target_max: Option<f32>,
}

fn default_target() -> f32 {
    1.0
}

impl ObjectiveCondition {
    pub fn new(tag: Tag, op: CompareOp, target: f32) -> Self {
        Self {
            tag,
            op,
            target,
            target_max: None,
        }
    }

    /// `value >= target`, the common "reach N" goal
    pub fn at_least(tag: Tag, target: f32) -> Self {
        Self::new(tag, CompareOp::GreaterEqual, target)
    }

    pub fn in_range(tag: Tag, min: f32, max: f32) -> Self {
        Self {
            tag,
            op: CompareOp::InRange,
            target: min,
            target_max: Some(max),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.tag.is_valid()
    }

    /// Evaluate the condition against a current value
    pub fn evaluate(&self, value: f32) -> bool {
        match self.op {
            CompareOp::Equal => (value - self.target).abs() <= EQUALITY_EPSILON,
            CompareOp::NotEqual => (value - self.target).abs() > EQUALITY_EPSILON,
            CompareOp::Greater => value > self.target,
            CompareOp::GreaterEqual => value >= self.target,
            CompareOp::Less => value < self.target,
            CompareOp::LessEqual => value <= self.target,
            CompareOp::InRange => {
                let max = self.target_max.unwrap_or(self.target);
                value >= self.target && value <= max
            }
        }
    }

    /// A value guaranteed to satisfy the condition, used by force-complete.
    ///
    /// For the strict operators this steps just past the target.
    pub fn passing_value(&self) -> f32 {
        match self.op {
            CompareOp::Equal | CompareOp::GreaterEqual | CompareOp::LessEqual | CompareOp::InRange => {
                self.target
            }
            CompareOp::Greater => self.target + 1.0,
            CompareOp::Less | CompareOp::NotEqual => self.target - 1.0,
        }
    }
}

/// Condition plus completion rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveEntry {
    pub condition: ObjectiveCondition,
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    /// Weight for "N of M" optional pools, only meaningful when optional
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub group: Tag,
}

fn default_mandatory() -> bool {
    true
}

fn default_weight() -> u32 {
    1
}

impl ObjectiveEntry {
    pub fn mandatory(condition: ObjectiveCondition) -> Self {
        Self {
            condition,
            mandatory: true,
            weight: 1,
            group: Tag::NONE,
        }
    }

    pub fn optional(condition: ObjectiveCondition, weight: u32) -> Self {
        Self {
            condition,
            mandatory: false,
            weight: weight.max(1),
            group: Tag::NONE,
        }
    }

    pub fn with_group(mut self, group: Tag) -> Self {
        self.group = group;
        self
    }

    pub fn tag(&self) -> Tag {
        self.condition.tag
    }
}

/// A collection of objectives with completion rules
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectiveSet {
    #[serde(default)]
    pub entries: Vec<ObjectiveEntry>,
    /// Optional objectives required for completion (0 = none required)
    #[serde(default)]
    pub optional_required_count: u32,
    /// Optional objectives needed for the bonus reward (0 = no bonus)
    #[serde(default)]
    pub optional_bonus_threshold: u32,
}

impl ObjectiveSet {
    pub fn new(entries: Vec<ObjectiveEntry>) -> Self {
        Self {
            entries,
            optional_required_count: 0,
            optional_bonus_threshold: 0,
        }
    }

    /// Single mandatory `tag >= 1.0` objective, the shape most mechanics use
    pub fn single(tag: Tag) -> Self {
        Self::new(vec![ObjectiveEntry::mandatory(ObjectiveCondition::at_least(tag, 1.0))])
    }

    pub fn with_optional_required(mut self, count: u32) -> Self {
        self.optional_required_count = count;
        self
    }

    pub fn with_bonus_threshold(mut self, threshold: u32) -> Self {
        self.optional_bonus_threshold = threshold;
        self
    }

    pub fn is_valid(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.condition.is_valid())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mandatory_count(&self) -> usize {
        self.entries.iter().filter(|e| e.mandatory).count()
    }

    pub fn optional_count(&self) -> usize {
        self.entries.len() - self.mandatory_count()
    }

    pub fn optional_total_weight(&self) -> u32 {
        self.entries
            .iter()
            .filter(|e| !e.mandatory)
            .map(|e| e.weight)
            .sum()
    }

    pub fn find_entry(&self, tag: &Tag) -> Option<&ObjectiveEntry> {
        self.entries.iter().find(|e| e.condition.tag == *tag)
    }

    pub fn find_index(&self, tag: &Tag) -> Option<usize> {
        self.entries.iter().position(|e| e.condition.tag == *tag)
    }
}
