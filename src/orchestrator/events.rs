//! Public signals emitted by the orchestrator for presentation layers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::tag::Tag;
use crate::core::types::RunId;
use crate::handlers::HandlerEvent;

/// Why a run is being cancelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CancelReason {
    /// Caller asked; honoured only for cancelable definitions
    Requested(String),
    /// The orchestrator is going away; always honoured
    OwnerDestroyed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested(reason) => write!(f, "{}", reason),
            CancelReason::OwnerDestroyed => write!(f, "owner destroyed"),
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniGameOutcome {
    pub id: Tag,
    pub success: bool,
    pub bonus: bool,
    pub cancelled: bool,
    pub failure_reason: Option<String>,
    /// Whether the objective set was complete at teardown
    pub objectives_complete: bool,
    pub progress: f32,
    pub elapsed: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MiniGameEvent {
    Started {
        id: Tag,
        run: RunId,
        handler_class: String,
    },
    Ended {
        outcome: MiniGameOutcome,
    },
    Cancelled {
        id: Tag,
        reason: String,
    },
    /// Every accepted objective update
    ObjectiveProgress {
        id: Tag,
        objective: Tag,
        value: f32,
    },
    ObjectiveMet {
        id: Tag,
        objective: Tag,
        timestamp: f32,
    },
    ObjectivesComplete {
        id: Tag,
        bonus: bool,
    },
    /// Mechanic feedback forwarded from the active handler
    Mechanic {
        id: Tag,
        event: HandlerEvent,
    },
}

impl MiniGameEvent {
    pub fn mini_game_id(&self) -> Tag {
        match self {
            MiniGameEvent::Started { id, .. }
            | MiniGameEvent::Cancelled { id, .. }
            | MiniGameEvent::ObjectiveProgress { id, .. }
            | MiniGameEvent::ObjectiveMet { id, .. }
            | MiniGameEvent::ObjectivesComplete { id, .. }
            | MiniGameEvent::Mechanic { id, .. } => *id,
            MiniGameEvent::Ended { outcome } => outcome.id,
        }
    }
}
