//! Well-known tags shared by handlers, definitions and callers

use crate::core::tag::Tag;

/// Mini-game type tags (select the default handler class)
pub mod minigame_type {
    use super::Tag;

    pub fn manipulation() -> Tag {
        Tag::new("Simulator.MiniGame.Type.Manipulation")
    }
    pub fn lockpick() -> Tag {
        Tag::new("Simulator.MiniGame.Type.Lockpick")
    }
    pub fn sequence() -> Tag {
        Tag::new("Simulator.MiniGame.Type.Sequence")
    }
    pub fn timing() -> Tag {
        Tag::new("Simulator.MiniGame.Type.Timing")
    }
    pub fn calibration() -> Tag {
        Tag::new("Simulator.MiniGame.Type.Calibration")
    }
    pub fn temperature() -> Tag {
        Tag::new("Simulator.MiniGame.Type.Temperature")
    }
}

/// Objective tags reported by the built-in handlers
pub mod objective {
    use super::Tag;

    pub fn item_snapped() -> Tag {
        Tag::new("Simulator.MiniGame.Objective.ItemSnapped")
    }
    pub fn all_parts_assembled() -> Tag {
        Tag::new("Simulator.MiniGame.Objective.AllPartsAssembled")
    }
    pub fn lock_opened() -> Tag {
        Tag::new("Simulator.MiniGame.Objective.LockOpened")
    }
    pub fn code_entered() -> Tag {
        Tag::new("Simulator.MiniGame.Objective.CodeEntered")
    }
    pub fn sequence_complete() -> Tag {
        Tag::new("Simulator.MiniGame.Objective.SequenceComplete")
    }
    pub fn temperature_maintained() -> Tag {
        Tag::new("Simulator.MiniGame.Objective.TemperatureMaintained")
    }
    pub fn calibration_held() -> Tag {
        Tag::new("Simulator.MiniGame.Objective.CalibrationHeld")
    }
    pub fn timing_hit() -> Tag {
        Tag::new("Simulator.MiniGame.Objective.TimingHit")
    }
}

/// Input action tags routed by the orchestrator
pub mod input {
    use super::Tag;

    pub fn primary() -> Tag {
        Tag::new("Input.Action.Primary")
    }
    pub fn secondary() -> Tag {
        Tag::new("Input.Action.Secondary")
    }
    pub fn scroll_up() -> Tag {
        Tag::new("Input.Action.ScrollUp")
    }
    pub fn scroll_down() -> Tag {
        Tag::new("Input.Action.ScrollDown")
    }
    pub fn backspace() -> Tag {
        Tag::new("Input.Action.Backspace")
    }

    /// Parent of every numpad key
    pub fn numpad() -> Tag {
        Tag::new("Input.Numpad")
    }
    pub fn numpad_digit(digit: u8) -> Tag {
        Tag::new(&format!("Input.Numpad.{}", digit))
    }
    pub fn numpad_enter() -> Tag {
        Tag::new("Input.Numpad.Enter")
    }
    pub fn numpad_clear() -> Tag {
        Tag::new("Input.Numpad.Clear")
    }

    /// Parent of every quick-time-event direction
    pub fn qte() -> Tag {
        Tag::new("Input.QTE")
    }
}

/// Camera mode tags for station mini-games
pub mod camera_mode {
    use super::Tag;

    pub fn station_default() -> Tag {
        Tag::new("Camera.Mode.Station.Default")
    }
    pub fn station_numpad() -> Tag {
        Tag::new("Camera.Mode.Station.Numpad")
    }
    pub fn station_lockpick() -> Tag {
        Tag::new("Camera.Mode.Station.Lockpick")
    }
    pub fn station_assembly() -> Tag {
        Tag::new("Camera.Mode.Station.Assembly")
    }
    pub fn station_cooking() -> Tag {
        Tag::new("Camera.Mode.Station.Cooking")
    }
}
