//! Minigame Engine - Interactive skill-check orchestration
//!
//! Runs short mini-games (lock-picking, code entry, assembly, temperature
//! control, timing and calibration) inside a larger frame-stepped simulation.

pub mod camera;
pub mod core;
pub mod definition;
pub mod handlers;
pub mod objectives;
pub mod orchestrator;
pub mod station;
pub mod tags;

pub use crate::camera::{CameraRelease, CameraRequest, CameraService, CameraStack};
pub use crate::core::{MiniGameError, OrchestratorConfig, Result, Tag};
pub use crate::definition::{DefinitionTable, MechanicConfig, MiniGameDefinition};
pub use crate::handlers::{HandlerEvent, HandlerRegistry, MiniGameHandler};
pub use crate::objectives::{ObjectiveSet, ObjectiveTracker};
pub use crate::orchestrator::{
    CancelReason, MiniGameEvent, MiniGameOrchestrator, MiniGameOutcome, OrchestratorPhase,
};
pub use crate::station::{BasicStation, Station};
