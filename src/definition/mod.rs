//! Mini-game definitions
//!
//! A definition is read-only data describing one mini-game: its type, camera
//! mode, objectives, and exactly one mechanic block. Definitions come from the
//! [`DefinitionTable`] or are supplied directly by a station.

pub mod mechanics;
pub mod table;

use serde::{Deserialize, Serialize};

use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::objectives::ObjectiveSet;
use crate::tags;

pub use mechanics::{
    AxisConfig, AxisReference, CalibrationConfig, LockpickConfig, ManipulationConfig, RhythmConfig,
    SequenceConfig, SnapConfig, SweetspotConfig, TemperatureConfig, TimingWindowConfig,
};
pub use table::DefinitionTable;

/// Mechanic-specific configuration, one block per mini-game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MechanicConfig {
    Manipulation(ManipulationConfig),
    Lockpick(LockpickConfig),
    Sequence(SequenceConfig),
    Timing(RhythmConfig),
    Calibration(CalibrationConfig),
    Temperature(TemperatureConfig),
}

impl MechanicConfig {
    /// The type tag this block belongs to
    pub fn type_tag(&self) -> Tag {
        match self {
            MechanicConfig::Manipulation(_) => tags::minigame_type::manipulation(),
            MechanicConfig::Lockpick(_) => tags::minigame_type::lockpick(),
            MechanicConfig::Sequence(_) => tags::minigame_type::sequence(),
            MechanicConfig::Timing(_) => tags::minigame_type::timing(),
            MechanicConfig::Calibration(_) => tags::minigame_type::calibration(),
            MechanicConfig::Temperature(_) => tags::minigame_type::temperature(),
        }
    }

    /// Objective the built-in handler for this block reports completion on
    pub fn primary_objective(&self) -> Tag {
        match self {
            MechanicConfig::Manipulation(_) => tags::objective::all_parts_assembled(),
            MechanicConfig::Lockpick(_) => tags::objective::lock_opened(),
            MechanicConfig::Sequence(_) => tags::objective::code_entered(),
            MechanicConfig::Timing(_) => tags::objective::timing_hit(),
            MechanicConfig::Calibration(_) => tags::objective::calibration_held(),
            MechanicConfig::Temperature(_) => tags::objective::temperature_maintained(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            MechanicConfig::Manipulation(_) => "manipulation",
            MechanicConfig::Lockpick(_) => "lockpick",
            MechanicConfig::Sequence(_) => "sequence",
            MechanicConfig::Timing(_) => "timing",
            MechanicConfig::Calibration(_) => "calibration",
            MechanicConfig::Temperature(_) => "temperature",
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let non_finite = match self {
            MechanicConfig::Manipulation(c) => c.non_finite_field(),
            MechanicConfig::Lockpick(c) => c.non_finite_field(),
            MechanicConfig::Sequence(c) => c.non_finite_field(),
            MechanicConfig::Timing(c) => c.non_finite_field(),
            MechanicConfig::Calibration(c) => c.non_finite_field(),
            MechanicConfig::Temperature(c) => c.non_finite_field(),
        };
        if let Some(field) = non_finite {
            return Err(format!("{} is not a finite number", field));
        }

        match self {
            MechanicConfig::Manipulation(c) => {
                if c.hold_distance_min > c.hold_distance_max {
                    return Err("hold_distance_min exceeds hold_distance_max".into());
                }
            }
            MechanicConfig::Lockpick(c) => {
                if !(1..=10).contains(&c.pin_count) {
                    return Err(format!("pin_count {} outside 1..=10", c.pin_count));
                }
                if c.target_min >= c.target_max {
                    return Err("lockpick target range is empty".into());
                }
            }
            MechanicConfig::Sequence(c) => {
                if c.expected.iter().any(|t| !t.is_valid()) {
                    return Err("sequence contains an empty input tag".into());
                }
            }
            MechanicConfig::Timing(c) => {
                if c.timing.cycle_duration <= 0.0 {
                    return Err("cycle_duration must be positive".into());
                }
                if c.timing.window_start > c.timing.window_end {
                    return Err("window_start exceeds window_end".into());
                }
            }
            MechanicConfig::Calibration(c) => {
                if c.spawn_min >= c.spawn_max {
                    return Err("calibration spawn range is empty".into());
                }
            }
            MechanicConfig::Temperature(c) => {
                if c.optimal_min > c.optimal_max {
                    return Err("optimal_min exceeds optimal_max".into());
                }
            }
        }
        Ok(())
    }
}

fn default_cancelable() -> bool {
    true
}

/// Static description of one mini-game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniGameDefinition {
    pub id: Tag,
    #[serde(default)]
    pub display_name: String,
    /// Selects the default handler class
    #[serde(rename = "type")]
    pub type_tag: Tag,
    #[serde(default)]
    pub camera_mode: Tag,
    #[serde(default)]
    pub objectives: ObjectiveSet,
    /// Explicit handler class, overrides the type's default
    #[serde(default)]
    pub handler_class: Option<String>,
    #[serde(default = "default_cancelable")]
    pub cancelable: bool,
    /// Seconds before the run fails (0 = no limit)
    #[serde(default)]
    pub timeout_seconds: f32,
    pub mechanic: MechanicConfig,
}

impl MiniGameDefinition {
    /// Definition whose type and single objective follow from the mechanic block
    pub fn new(id: Tag, mechanic: MechanicConfig) -> Self {
        Self {
            id,
            display_name: id.leaf(),
            type_tag: mechanic.type_tag(),
            camera_mode: tags::camera_mode::station_default(),
            objectives: ObjectiveSet::single(mechanic.primary_objective()),
            handler_class: None,
            cancelable: true,
            timeout_seconds: 0.0,
            mechanic,
        }
    }

    pub fn with_objectives(mut self, objectives: ObjectiveSet) -> Self {
        self.objectives = objectives;
        self
    }

    pub fn with_camera_mode(mut self, mode: Tag) -> Self {
        self.camera_mode = mode;
        self
    }

    pub fn with_timeout(mut self, seconds: f32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_handler_class(mut self, class: impl Into<String>) -> Self {
        self.handler_class = Some(class.into());
        self
    }

    pub fn non_cancelable(mut self) -> Self {
        self.cancelable = false;
        self
    }

    /// Give an objective-less definition the single objective its mechanic reports
    pub fn fill_default_objectives(&mut self) {
        if self.objectives.is_empty() {
            self.objectives = ObjectiveSet::single(self.mechanic.primary_objective());
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check the definition is usable: valid id, valid type, a mechanic block
    /// that matches the type (unless a handler class overrides the type).
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| MiniGameError::InvalidDefinition(format!("{}: {}", self.id, msg));

        if !self.id.is_valid() {
            return Err(MiniGameError::InvalidDefinition("missing id".into()));
        }
        if !self.type_tag.is_valid() {
            return Err(invalid("missing type".into()));
        }
        if self.handler_class.is_none() && self.mechanic.type_tag() != self.type_tag {
            return Err(invalid(format!(
                "{} block does not match type {}",
                self.mechanic.kind_name(),
                self.type_tag
            )));
        }
        if !self.timeout_seconds.is_finite() || self.timeout_seconds < 0.0 {
            return Err(invalid("timeout_seconds must be a finite, non-negative number".into()));
        }
        self.mechanic.validate().map_err(invalid)?;
        Ok(())
    }

    pub fn as_manipulation(&self) -> Option<&ManipulationConfig> {
        match &self.mechanic {
            MechanicConfig::Manipulation(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_lockpick(&self) -> Option<&LockpickConfig> {
        match &self.mechanic {
            MechanicConfig::Lockpick(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&SequenceConfig> {
        match &self.mechanic {
            MechanicConfig::Sequence(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_timing(&self) -> Option<&RhythmConfig> {
        match &self.mechanic {
            MechanicConfig::Timing(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_calibration(&self) -> Option<&CalibrationConfig> {
        match &self.mechanic {
            MechanicConfig::Calibration(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_temperature(&self) -> Option<&TemperatureConfig> {
        match &self.mechanic {
            MechanicConfig::Temperature(c) => Some(c),
            _ => None,
        }
    }
}
