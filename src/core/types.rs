//! Core type definitions used throughout the codebase

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Identifier of one tracked objective-set registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier pairing a camera request with its release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(pub Uuid);

impl RequesterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequesterId {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning handle naming the orchestrator that spawned a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrchestratorId(pub u64);

impl OrchestratorId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Euler rotation in degrees (pitch about Y, yaw about Z, roll about X)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotator {
    pub const ZERO: Rotator = Rotator { pitch: 0.0, yaw: 0.0, roll: 0.0 };

    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Wrap an angle into (-180, 180]
    pub fn normalize_axis(angle: f32) -> f32 {
        let wrapped = angle.rem_euclid(360.0);
        if wrapped > 180.0 {
            wrapped - 360.0
        } else {
            wrapped
        }
    }

    /// Largest per-axis angular difference, in degrees
    pub fn max_axis_difference(&self, other: &Rotator) -> f32 {
        let pitch = Self::normalize_axis(self.pitch - other.pitch).abs();
        let yaw = Self::normalize_axis(self.yaw - other.yaw).abs();
        let roll = Self::normalize_axis(self.roll - other.roll).abs();
        pitch.max(yaw).max(roll)
    }

    /// Interpolate each axis along its shortest arc
    pub fn lerp_shortest(&self, target: &Rotator, alpha: f32) -> Rotator {
        let step = |from: f32, to: f32| from + Self::normalize_axis(to - from) * alpha;
        Rotator {
            pitch: step(self.pitch, target.pitch),
            yaw: step(self.yaw, target.yaw),
            roll: step(self.roll, target.roll),
        }
    }

    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(
            glam::EulerRot::ZYX,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }
}

impl std::ops::Add for Rotator {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            pitch: self.pitch + rhs.pitch,
            yaw: self.yaw + rhs.yaw,
            roll: self.roll + rhs.roll,
        }
    }
}

/// World pose of the viewer, supplied by the camera layer each frame.
///
/// Axes follow the world convention: X forward, Y right, Z up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub location: Vec3,
    pub rotation: Rotator,
}

impl ViewTransform {
    pub fn new(location: Vec3, rotation: Rotator) -> Self {
        Self { location, rotation }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation.to_quat() * Vec3::X
    }

    pub fn right(&self) -> Vec3 {
        self.rotation.to_quat() * Vec3::Y
    }

    pub fn up(&self) -> Vec3 {
        self.rotation.to_quat() * Vec3::Z
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation: Rotator::ZERO,
        }
    }
}

/// Exponential approach factor for frame-rate independent smoothing.
///
/// Returns the fraction of the remaining distance to cover this frame.
pub fn interp_alpha(speed: f32, dt: f32) -> f32 {
    if speed <= 0.0 {
        return 1.0;
    }
    1.0 - (-speed * dt).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn test_orchestrator_ids_increase() {
        let a = OrchestratorId::next();
        let b = OrchestratorId::next();
        assert!(b.0 > a.0);
    }

    #[test]
    fn test_normalize_axis() {
        assert_eq!(Rotator::normalize_axis(190.0), -170.0);
        assert_eq!(Rotator::normalize_axis(-190.0), 170.0);
        assert_eq!(Rotator::normalize_axis(45.0), 45.0);
    }

    #[test]
    fn test_max_axis_difference_wraps() {
        let a = Rotator::new(0.0, 179.0, 0.0);
        let b = Rotator::new(0.0, -179.0, 0.0);
        assert!((a.max_axis_difference(&b) - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_default_view_axes() {
        let view = ViewTransform::default();
        assert!((view.forward() - Vec3::X).length() < 1e-5);
        assert!((view.right() - Vec3::Y).length() < 1e-5);
        assert!((view.up() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_interp_alpha_bounds() {
        assert_eq!(interp_alpha(0.0, 0.1), 1.0);
        let alpha = interp_alpha(15.0, 1.0 / 60.0);
        assert!(alpha > 0.0 && alpha < 1.0);
    }
}
