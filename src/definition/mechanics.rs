//! Per-mechanic configuration blocks
//!
//! Every field has a default so TOML definitions only spell out what they
//! change. Ranges noted on fields are the ones `validate` enforces.

use serde::{Deserialize, Serialize};

use crate::core::tag::Tag;

// === MANIPULATION ===

/// Which frame an input axis is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisReference {
    /// Relative to the viewer
    #[default]
    View,
    /// Fixed world axes
    World,
}

/// Configuration for one input axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    pub enabled: bool,
    pub sensitivity: f32,
    pub invert: bool,
    pub clamp: bool,
    pub clamp_min: f32,
    pub clamp_max: f32,
    pub reference: AxisReference,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sensitivity: 1.0,
            invert: false,
            clamp: false,
            clamp_min: -180.0,
            clamp_max: 180.0,
            reference: AxisReference::View,
        }
    }
}

impl AxisConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn clamped(mut self, min: f32, max: f32) -> Self {
        self.clamp = true;
        self.clamp_min = min;
        self.clamp_max = max;
        self
    }

    /// Scale a raw input sample into a signed delta for this axis
    pub fn scaled(&self, raw: f32, dt: f32, scale: f32) -> f32 {
        let value = raw * self.sensitivity * dt * scale;
        if self.invert {
            -value
        } else {
            value
        }
    }

    /// Apply the clamp range if enabled
    pub fn apply_clamp(&self, value: f32) -> f32 {
        if self.clamp {
            value.clamp(self.clamp_min, self.clamp_max)
        } else {
            value
        }
    }

    fn is_finite(&self) -> bool {
        [self.sensitivity, self.clamp_min, self.clamp_max]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Snap detection settings for assembly mini-games
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Distance at which a snap point becomes the snap target
    pub snap_distance: f32,
    pub require_rotation_match: bool,
    /// Degrees, compared per axis
    pub rotation_tolerance: f32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_distance: 50.0,
            require_rotation_match: true,
            rotation_tolerance: 15.0,
        }
    }
}

/// Configuration for 6-axis grab/rotate/snap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManipulationConfig {
    /// Right/left, driven by axis X
    pub movement_x: AxisConfig,
    /// Forward/back, driven by axis Y
    pub movement_y: AxisConfig,
    /// Up/down, driven by axis Y
    pub movement_z: AxisConfig,
    /// Driven by axis Y
    pub rotation_pitch: AxisConfig,
    /// Driven by axis X
    pub rotation_yaw: AxisConfig,
    /// Driven by axis X
    pub rotation_roll: AxisConfig,
    pub snap: SnapConfig,
    pub allow_drop: bool,
    pub max_grab_distance: f32,
    pub hold_distance_min: f32,
    pub hold_distance_max: f32,
    /// Hold distance change per scroll action
    pub hold_distance_step: f32,
    /// Exponential smoothing speed toward the target transform
    pub interp_speed: f32,
    /// World units (or degrees) per second at full deflection and sensitivity 1
    pub input_scale: f32,
}

impl Default for ManipulationConfig {
    fn default() -> Self {
        Self {
            movement_x: AxisConfig::default(),
            movement_y: AxisConfig::default(),
            movement_z: AxisConfig::default(),
            rotation_pitch: AxisConfig::default(),
            rotation_yaw: AxisConfig::default(),
            rotation_roll: AxisConfig::default(),
            snap: SnapConfig::default(),
            allow_drop: true,
            max_grab_distance: 300.0,
            hold_distance_min: 50.0,
            hold_distance_max: 200.0,
            hold_distance_step: 10.0,
            interp_speed: 15.0,
            input_scale: 100.0,
        }
    }
}

impl ManipulationConfig {
    pub fn has_movement(&self) -> bool {
        self.movement_x.enabled || self.movement_y.enabled || self.movement_z.enabled
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation_pitch.enabled || self.rotation_yaw.enabled || self.rotation_roll.enabled
    }

    /// Name of the first block or field holding NaN or infinity
    pub fn non_finite_field(&self) -> Option<&'static str> {
        let axes = [
            ("movement_x", &self.movement_x),
            ("movement_y", &self.movement_y),
            ("movement_z", &self.movement_z),
            ("rotation_pitch", &self.rotation_pitch),
            ("rotation_yaw", &self.rotation_yaw),
            ("rotation_roll", &self.rotation_roll),
        ];
        if let Some((name, _)) = axes.iter().find(|(_, axis)| !axis.is_finite()) {
            return Some(name);
        }
        first_non_finite(&[
            ("snap.snap_distance", self.snap.snap_distance),
            ("snap.rotation_tolerance", self.snap.rotation_tolerance),
            ("max_grab_distance", self.max_grab_distance),
            ("hold_distance_min", self.hold_distance_min),
            ("hold_distance_max", self.hold_distance_max),
            ("hold_distance_step", self.hold_distance_step),
            ("interp_speed", self.interp_speed),
            ("input_scale", self.input_scale),
        ])
    }
}

// === SWEETSPOT / LOCKPICK ===

/// Target-finding tolerance and feedback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweetspotConfig {
    /// Tolerance at the easiest difficulty
    pub tolerance_max: f32,
    /// Tolerance at the hardest difficulty
    pub tolerance_min: f32,
    /// Feedback curve exponent outside the window (1 = linear)
    pub feedback_exponent: f32,
    /// Whether a break consumes an attempt
    pub failure_breaks_item: bool,
    /// Attempts before lockout (0 = unlimited)
    pub max_attempts: u32,
}

impl Default for SweetspotConfig {
    fn default() -> Self {
        Self {
            tolerance_max: 0.15,
            tolerance_min: 0.02,
            feedback_exponent: 1.5,
            failure_breaks_item: true,
            max_attempts: 0,
        }
    }
}

impl SweetspotConfig {
    /// Tolerance for a difficulty in [0, 1], 0 being hardest
    pub fn tolerance_for_difficulty(&self, difficulty: f32) -> f32 {
        let t = difficulty.clamp(0.0, 1.0);
        self.tolerance_min + (self.tolerance_max - self.tolerance_min) * t
    }

    pub fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("sweetspot.tolerance_max", self.tolerance_max),
            ("sweetspot.tolerance_min", self.tolerance_min),
            ("sweetspot.feedback_exponent", self.feedback_exponent),
        ])
    }
}

/// Multi-pin lockpick configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockpickConfig {
    pub sweetspot: SweetspotConfig,
    /// 1..=10
    pub pin_count: u32,
    /// Divides the tolerance; higher is harder
    pub difficulty_multiplier: f32,
    pub randomize_on_fail: bool,
    /// Pick travel per second at full deflection
    pub pick_sensitivity: f32,
    /// Seconds of wrong tension tolerated right next to the target
    pub break_threshold_near: f32,
    /// Seconds of wrong tension tolerated half the range away
    pub break_threshold_far: f32,
    /// Random pin targets are drawn from [target_min, target_max]
    pub target_min: f32,
    pub target_max: f32,
}

impl Default for LockpickConfig {
    fn default() -> Self {
        Self {
            sweetspot: SweetspotConfig::default(),
            pin_count: 1,
            difficulty_multiplier: 1.0,
            randomize_on_fail: true,
            pick_sensitivity: 2.0,
            break_threshold_near: 2.0,
            break_threshold_far: 0.3,
            target_min: 0.15,
            target_max: 0.85,
        }
    }
}

impl LockpickConfig {
    pub fn adjusted_tolerance(&self, difficulty: f32) -> f32 {
        self.sweetspot.tolerance_for_difficulty(difficulty) / self.difficulty_multiplier.max(0.1)
    }

    pub fn non_finite_field(&self) -> Option<&'static str> {
        self.sweetspot.non_finite_field().or_else(|| {
            first_non_finite(&[
                ("difficulty_multiplier", self.difficulty_multiplier),
                ("pick_sensitivity", self.pick_sensitivity),
                ("break_threshold_near", self.break_threshold_near),
                ("break_threshold_far", self.break_threshold_far),
                ("target_min", self.target_min),
                ("target_max", self.target_max),
            ])
        })
    }
}

// === SEQUENCE ===

/// Code entry / QTE sequence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Expected inputs (Input.Numpad.*, Input.QTE.*)
    pub expected: Vec<Tag>,
    /// Seconds between inputs before the attempt resets (0 = no timeout)
    pub input_timeout: f32,
    pub order_matters: bool,
    pub allow_backspace: bool,
    /// Errors tolerated before failing (0 = unlimited)
    pub max_errors: u32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            expected: Vec::new(),
            input_timeout: 5.0,
            order_matters: true,
            allow_backspace: true,
            max_errors: 0,
        }
    }
}

// === TIMING / RHYTHM ===

/// Hit window inside a repeating cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingWindowConfig {
    /// Normalized [0, 1]
    pub window_start: f32,
    pub window_end: f32,
    /// Seconds per cycle
    pub cycle_duration: f32,
    /// Window width lost per success
    pub window_shrink_rate: f32,
    /// Floor for the shrinking window
    pub min_window_size: f32,
    pub looping: bool,
}

impl Default for TimingWindowConfig {
    fn default() -> Self {
        Self {
            window_start: 0.4,
            window_end: 0.6,
            cycle_duration: 1.0,
            window_shrink_rate: 0.02,
            min_window_size: 0.05,
            looping: true,
        }
    }
}

/// Rhythm mechanic configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    pub timing: TimingWindowConfig,
    pub required_success_count: u32,
    /// Misses tolerated before failing (0 = unlimited)
    pub max_misses: u32,
    pub increasing_tempo: bool,
    /// Fraction of the cycle duration removed per success
    pub tempo_increase_rate: f32,
    pub min_cycle_duration: f32,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            timing: TimingWindowConfig::default(),
            required_success_count: 5,
            max_misses: 3,
            increasing_tempo: false,
            tempo_increase_rate: 0.05,
            min_cycle_duration: 0.3,
        }
    }
}

// === CALIBRATION ===

/// Precision hold configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Starting tolerance is `tolerance_max`, the shrink floor is `tolerance_min`
    pub sweetspot: SweetspotConfig,
    /// Tolerance lost per second
    pub zone_shrink_rate: f32,
    /// Seconds the value must stay locked
    pub required_hold_duration: f32,
    pub moving_target: bool,
    pub target_move_speed: f32,
    /// Soft bounds the moving target bounces between
    pub target_bound_min: f32,
    pub target_bound_max: f32,
    /// Initial target is drawn from [spawn_min, spawn_max]
    pub spawn_min: f32,
    pub spawn_max: f32,
    /// Value travel per second at full deflection
    pub input_sensitivity: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            sweetspot: SweetspotConfig::default(),
            zone_shrink_rate: 0.0,
            required_hold_duration: 2.0,
            moving_target: false,
            target_move_speed: 0.5,
            target_bound_min: 0.15,
            target_bound_max: 0.85,
            spawn_min: 0.2,
            spawn_max: 0.8,
            input_sensitivity: 2.0,
        }
    }
}

// === TEMPERATURE ===

/// Heat/cool zone maintenance configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureConfig {
    pub optimal_min: f32,
    pub optimal_max: f32,
    /// Below this the item freezes (when `can_freeze`)
    pub danger_min: f32,
    /// Above this the item burns (when `can_overheat`)
    pub danger_max: f32,
    /// Degrees per second at full heat input
    pub heat_rate: f32,
    /// Degrees per second with no input
    pub cool_rate: f32,
    pub can_overheat: bool,
    pub can_freeze: bool,
    /// Seconds to dwell in the optimal band
    pub required_duration: f32,
    /// Heat input applied while the cool action is held
    pub active_cool_input: f32,
    /// Explicit starting temperature; derived from the bands when absent
    pub start_temperature: Option<f32>,
    /// Leaving the optimal band discards the time accumulated so far
    pub reset_on_zone_exit: bool,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            optimal_min: 150.0,
            optimal_max: 200.0,
            danger_min: 50.0,
            danger_max: 300.0,
            heat_rate: 25.0,
            cool_rate: 10.0,
            can_overheat: true,
            can_freeze: false,
            required_duration: 5.0,
            active_cool_input: -0.5,
            start_temperature: None,
            reset_on_zone_exit: false,
        }
    }
}

impl TemperatureConfig {
    pub fn is_optimal(&self, temperature: f32) -> bool {
        temperature >= self.optimal_min && temperature <= self.optimal_max
    }

    pub fn is_overheated(&self, temperature: f32) -> bool {
        self.can_overheat && temperature > self.danger_max
    }

    pub fn is_frozen(&self, temperature: f32) -> bool {
        self.can_freeze && temperature < self.danger_min
    }

    pub fn is_dangerous(&self, temperature: f32) -> bool {
        self.is_overheated(temperature) || self.is_frozen(temperature)
    }

    /// Room temperature: below the optimal band, above freezing
    pub fn starting_temperature(&self) -> f32 {
        self.start_temperature
            .unwrap_or_else(|| (self.optimal_min - 50.0).min(self.danger_min + 10.0))
    }

    pub fn non_finite_field(&self) -> Option<&'static str> {
        if self.start_temperature.map_or(false, |t| !t.is_finite()) {
            return Some("start_temperature");
        }
        first_non_finite(&[
            ("optimal_min", self.optimal_min),
            ("optimal_max", self.optimal_max),
            ("danger_min", self.danger_min),
            ("danger_max", self.danger_max),
            ("heat_rate", self.heat_rate),
            ("cool_rate", self.cool_rate),
            ("required_duration", self.required_duration),
            ("active_cool_input", self.active_cool_input),
        ])
    }
}

impl SequenceConfig {
    pub fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[("input_timeout", self.input_timeout)])
    }
}

impl RhythmConfig {
    pub fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("timing.window_start", self.timing.window_start),
            ("timing.window_end", self.timing.window_end),
            ("timing.cycle_duration", self.timing.cycle_duration),
            ("timing.window_shrink_rate", self.timing.window_shrink_rate),
            ("timing.min_window_size", self.timing.min_window_size),
            ("tempo_increase_rate", self.tempo_increase_rate),
            ("min_cycle_duration", self.min_cycle_duration),
        ])
    }
}

impl CalibrationConfig {
    pub fn non_finite_field(&self) -> Option<&'static str> {
        self.sweetspot.non_finite_field().or_else(|| {
            first_non_finite(&[
                ("zone_shrink_rate", self.zone_shrink_rate),
                ("required_hold_duration", self.required_hold_duration),
                ("target_move_speed", self.target_move_speed),
                ("target_bound_min", self.target_bound_min),
                ("target_bound_max", self.target_bound_max),
                ("spawn_min", self.spawn_min),
                ("spawn_max", self.spawn_max),
                ("input_sensitivity", self.input_sensitivity),
            ])
        })
    }
}

/// TOML accepts `nan` and `inf`; range checks alone let them through
fn first_non_finite(fields: &[(&'static str, f32)]) -> Option<&'static str> {
    fields.iter().find(|(_, v)| !v.is_finite()).map(|(name, _)| *name)
}
