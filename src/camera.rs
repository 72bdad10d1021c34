//! Camera mode arbitration
//!
//! The orchestrator issues exactly one request per run and exactly one
//! matching release. `CameraStack` is the in-crate arbiter: highest priority
//! wins, newest request wins ties, and releases are matched by requester id.

use serde::{Deserialize, Serialize};

use crate::core::tag::Tag;
use crate::core::types::RequesterId;

/// Ask the camera layer to switch into a mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRequest {
    pub mode: Tag,
    pub priority: i32,
    pub blend_time: f32,
    pub focus_target: Option<Tag>,
    pub requester: RequesterId,
    pub source: Tag,
}

/// Hand a previously requested mode back
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraRelease {
    pub requester: RequesterId,
    pub blend_time: f32,
}

/// Consumer of camera requests; acceptance is the only guarantee
pub trait CameraService {
    fn request_camera_mode(&mut self, request: &CameraRequest);
    fn release_camera_mode(&mut self, release: &CameraRelease);
}

/// Entry in the camera log, in arrival order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CameraLogEntry {
    Requested(CameraRequest),
    Released(CameraRelease),
}

/// Priority stack of outstanding camera requests
#[derive(Debug, Default, Clone)]
pub struct CameraStack {
    active: Vec<CameraRequest>,
    log: Vec<CameraLogEntry>,
}

impl CameraStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode currently in control, if any request is outstanding
    pub fn current_mode(&self) -> Option<Tag> {
        self.current().map(|r| r.mode)
    }

    pub fn current(&self) -> Option<&CameraRequest> {
        // max_by_key keeps the last of equal maxima, so the newest request wins ties
        self.active.iter().max_by_key(|r| r.priority)
    }

    pub fn outstanding(&self) -> usize {
        self.active.len()
    }

    pub fn log(&self) -> &[CameraLogEntry] {
        &self.log
    }

    pub fn request_count(&self) -> usize {
        self.log
            .iter()
            .filter(|e| matches!(e, CameraLogEntry::Requested(_)))
            .count()
    }

    pub fn release_count(&self) -> usize {
        self.log
            .iter()
            .filter(|e| matches!(e, CameraLogEntry::Released(_)))
            .count()
    }

    /// Every request has exactly one later release with the same requester
    pub fn is_balanced(&self) -> bool {
        let mut open: Vec<RequesterId> = Vec::new();
        for entry in &self.log {
            match entry {
                CameraLogEntry::Requested(r) => {
                    if open.contains(&r.requester) {
                        return false;
                    }
                    open.push(r.requester);
                }
                CameraLogEntry::Released(r) => match open.iter().position(|id| *id == r.requester) {
                    Some(i) => {
                        open.remove(i);
                    }
                    None => return false,
                },
            }
        }
        open.is_empty()
    }
}

impl CameraService for CameraStack {
    fn request_camera_mode(&mut self, request: &CameraRequest) {
        tracing::debug!(mode = %request.mode, priority = request.priority, "Camera mode requested");
        self.active.retain(|r| r.requester != request.requester);
        self.active.push(request.clone());
        self.log.push(CameraLogEntry::Requested(request.clone()));
    }

    fn release_camera_mode(&mut self, release: &CameraRelease) {
        let before = self.active.len();
        self.active.retain(|r| r.requester != release.requester);
        if self.active.len() == before {
            tracing::warn!(requester = ?release.requester, "Release for unknown camera requester");
        }
        self.log.push(CameraLogEntry::Released(*release));
    }
}
