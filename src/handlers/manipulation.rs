//! Manipulation handler - grab, move, rotate and snap parts into place
//!
//! A held part floats at `hold_distance` in front of the viewer plus an
//! offset accumulated from the enabled move axes, and is smoothed toward
//! that target each tick. The nearest free snap point within range (and
//! within rotation tolerance) becomes the snap target; primary snaps onto
//! it. The run completes once every station snap point is filled.

use std::any::Any;

use glam::{Vec2, Vec3};

use super::context::HandlerContext;
use super::core::HandlerCore;
use super::events::HandlerEvent;
use super::MiniGameHandler;
use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::core::types::{interp_alpha, Rotator, ViewTransform};
use crate::definition::{AxisConfig, AxisReference, ManipulationConfig, MiniGameDefinition};
use crate::station::{ManipulablePart, SnapPoint};
use crate::tags;

#[derive(Debug, Default)]
pub struct ManipulationHandler {
    core: HandlerCore,
    config: ManipulationConfig,

    parts: Vec<ManipulablePart>,
    snap_points: Vec<SnapPoint>,
    occupied: Vec<bool>,

    /// Index into `parts`
    held: Option<usize>,
    held_location: Vec3,
    held_rotation: Rotator,
    /// Accumulated (right, forward, up) movement amounts
    move_offset: Vec3,
    rotation_offset: Rotator,
    hold_distance: f32,
    hover_point: Option<Vec3>,

    /// Index into `snap_points`
    snap_target: Option<usize>,
    snapped_count: u32,
}

impl ManipulationHandler {
    pub const CLASS_NAME: &'static str = "Manipulation";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    pub fn held_part(&self) -> Option<&ManipulablePart> {
        self.held.and_then(|i| self.parts.get(i))
    }

    /// Smoothed pose of the held part
    pub fn held_transform(&self) -> (Vec3, Rotator) {
        (self.held_location, self.held_rotation)
    }

    pub fn snap_target(&self) -> Option<&SnapPoint> {
        self.snap_target.and_then(|i| self.snap_points.get(i))
    }

    pub fn is_near_snap_point(&self) -> bool {
        self.snap_target.is_some()
    }

    pub fn snapped_count(&self) -> u32 {
        self.snapped_count
    }

    pub fn total_snap_points(&self) -> u32 {
        self.snap_points.len() as u32
    }

    pub fn hold_distance(&self) -> f32 {
        self.hold_distance
    }

    pub fn move_offset(&self) -> Vec3 {
        self.move_offset
    }

    pub fn rotation_offset(&self) -> Rotator {
        self.rotation_offset
    }

    /// Parts still loose in the world, with their current poses
    pub fn parts(&self) -> &[ManipulablePart] {
        &self.parts
    }

    fn axis_direction(reference: AxisReference, world: Vec3, view_axis: Vec3) -> Vec3 {
        match reference {
            AxisReference::World => world,
            AxisReference::View => view_axis,
        }
    }

    /// World-space offset from the accumulated axis amounts
    fn world_offset(&self, view: &ViewTransform) -> Vec3 {
        let c = &self.config;
        Self::axis_direction(c.movement_x.reference, Vec3::Y, view.right()) * self.move_offset.x
            + Self::axis_direction(c.movement_y.reference, Vec3::X, view.forward()) * self.move_offset.y
            + Self::axis_direction(c.movement_z.reference, Vec3::Z, view.up()) * self.move_offset.z
    }

    fn target_transform(&self, view: &ViewTransform) -> (Vec3, Rotator) {
        let location = view.location + view.forward() * self.hold_distance + self.world_offset(view);
        let rotation = view.rotation + self.rotation_offset;
        (location, rotation)
    }

    fn accumulate(axis: &AxisConfig, current: f32, raw: f32, dt: f32, scale: f32) -> f32 {
        if !axis.enabled {
            return current;
        }
        axis.apply_clamp(current + axis.scaled(raw, dt, scale))
    }

    fn apply_movement(&mut self, input: Vec2, dt: f32) {
        let scale = self.config.input_scale;
        let c = &self.config;
        self.move_offset.x = Self::accumulate(&c.movement_x, self.move_offset.x, input.x, dt, scale);
        self.move_offset.y = Self::accumulate(&c.movement_y, self.move_offset.y, input.y, dt, scale);
        self.move_offset.z = Self::accumulate(&c.movement_z, self.move_offset.z, input.y, dt, scale);
    }

    fn apply_rotation(&mut self, input: Vec2, dt: f32) {
        let scale = self.config.input_scale;
        let c = &self.config;
        let r = &mut self.rotation_offset;
        r.yaw = Self::accumulate(&c.rotation_yaw, r.yaw, input.x, dt, scale);
        r.pitch = Self::accumulate(&c.rotation_pitch, r.pitch, input.y, dt, scale);
        r.roll = Self::accumulate(&c.rotation_roll, r.roll, input.x, dt, scale);
    }

    fn update_held_transform(&mut self, view: &ViewTransform, dt: f32) {
        let (location, rotation) = self.target_transform(view);
        let alpha = interp_alpha(self.config.interp_speed, dt);
        self.held_location = self.held_location.lerp(location, alpha);
        self.held_rotation = self.held_rotation.lerp_shortest(&rotation, alpha);
    }

    fn find_snap_target(&self) -> Option<usize> {
        let item = self.held_part()?.item_tag;
        let snap = &self.config.snap;
        let mut best: Option<(usize, f32)> = None;

        for (i, point) in self.snap_points.iter().enumerate() {
            if self.occupied.get(i).copied().unwrap_or(true) || !point.accepts(&item) {
                continue;
            }
            let distance = self.held_location.distance(point.location);
            if distance >= point.snap_distance(snap.snap_distance) {
                continue;
            }
            if best.map_or(false, |(_, d)| distance >= d) {
                continue;
            }
            if snap.require_rotation_match
                && self.held_rotation.max_axis_difference(&point.required_rotation) > snap.rotation_tolerance
            {
                continue;
            }
            best = Some((i, distance));
        }
        best.map(|(i, _)| i)
    }

    fn update_snap_target(&mut self) {
        let target = self.find_snap_target();
        if target != self.snap_target {
            self.snap_target = target;
            let point = self.snap_target().map(|p| p.tag);
            self.core.push_event(HandlerEvent::SnapTargetChanged { point });
        }
    }

    /// Nearest loose part to the hover point (or the viewer) within grab range
    fn grab_candidate(&self, view: &ViewTransform) -> Option<usize> {
        let probe = self.hover_point.unwrap_or(view.location);
        self.parts
            .iter()
            .enumerate()
            .filter(|(_, part)| part.location.distance(view.location) <= self.config.max_grab_distance)
            .min_by(|(_, a), (_, b)| {
                a.location
                    .distance(probe)
                    .total_cmp(&b.location.distance(probe))
            })
            .map(|(i, _)| i)
    }

    fn grab(&mut self, index: usize) {
        let Some(part) = self.parts.get(index) else {
            return;
        };
        self.held_location = part.location;
        self.held_rotation = part.rotation;
        let tag = part.tag;

        self.held = Some(index);
        self.move_offset = Vec3::ZERO;
        self.rotation_offset = Rotator::ZERO;
        self.snap_target = None;
        tracing::debug!(part = %tag, "Grabbed part");
        self.core.push_event(HandlerEvent::Grabbed { part: tag });
    }

    fn release(&mut self, snapped: bool) {
        let Some(index) = self.held.take() else {
            return;
        };
        self.snap_target = None;
        if snapped {
            let part = self.parts.remove(index);
            self.core.push_event(HandlerEvent::Released {
                part: part.tag,
                snapped: true,
            });
        } else if let Some(part) = self.parts.get_mut(index) {
            // Dropped parts stay where they were let go
            part.location = self.held_location;
            part.rotation = self.held_rotation;
            let tag = part.tag;
            self.core.push_event(HandlerEvent::Released { part: tag, snapped: false });
        }
    }

    fn execute_snap(&mut self, ctx: &mut HandlerContext<'_>) {
        let (Some(point_index), Some(part)) = (self.snap_target, self.held_part()) else {
            return;
        };
        let part_tag = part.tag;
        let Some(point) = self.snap_points.get(point_index).cloned() else {
            return;
        };

        self.held_location = point.location;
        self.held_rotation = point.required_rotation;
        if let Some(slot) = self.occupied.get_mut(point_index) {
            *slot = true;
        }
        self.snapped_count += 1;
        self.release(true);

        tracing::debug!(point = %point.tag, part = %part_tag, "Part snapped");
        self.core.push_event(HandlerEvent::ItemSnapped {
            point: point.tag,
            part: part_tag,
        });

        if point.objective_tag.is_valid() {
            self.core.report_complete(ctx, &point.objective_tag);
        }

        let total = self.total_snap_points();
        if total > 0 {
            let progress = self.snapped_count as f32 / total as f32;
            self.core
                .report_value(ctx, &tags::objective::item_snapped(), progress);
        }

        if total > 0 && self.snapped_count >= total {
            self.core
                .report_complete(ctx, &tags::objective::all_parts_assembled());
            self.core.mark_complete(true);
        }
    }

    fn adjust_hold_distance(&mut self, delta: f32) {
        self.hold_distance = (self.hold_distance + delta)
            .clamp(self.config.hold_distance_min, self.config.hold_distance_max);
    }
}

impl MiniGameHandler for ManipulationHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    fn configure(&mut self, definition: &MiniGameDefinition) -> Result<()> {
        let config = definition.as_manipulation().ok_or_else(|| {
            MiniGameError::HandlerSpawnFailed(format!("{} has no manipulation block", definition.id))
        })?;
        self.config = config.clone();
        Ok(())
    }

    fn on_activate(&mut self, ctx: &mut HandlerContext<'_>) {
        self.held = None;
        self.hold_distance = (self.config.hold_distance_min + self.config.hold_distance_max) * 0.5;
        self.move_offset = Vec3::ZERO;
        self.rotation_offset = Rotator::ZERO;
        self.hover_point = None;
        self.snap_target = None;
        self.snapped_count = 0;

        self.snap_points = ctx.station.map(|s| s.snap_points()).unwrap_or_default();
        self.parts = ctx.station.map(|s| s.manipulable_parts()).unwrap_or_default();
        self.occupied = vec![false; self.snap_points.len()];

        if self.snap_points.is_empty() {
            tracing::warn!(mini_game = %self.core.mini_game_id(), "No snap points provided by station");
        }
    }

    fn on_deactivate(&mut self) {
        if self.is_holding() {
            self.release(false);
        }
    }

    fn tick_mechanic(&mut self, ctx: &mut HandlerContext<'_>, dt: f32) {
        if !self.is_holding() {
            return;
        }
        let view = ctx.view;
        self.update_held_transform(&view, dt);
        self.update_snap_target();
    }

    fn handle_axis(&mut self, _ctx: &mut HandlerContext<'_>, axis: Vec2, dt: f32) {
        if !self.is_holding() {
            return;
        }
        if self.config.has_movement() {
            self.apply_movement(axis, dt);
        }
        if self.config.has_rotation() {
            self.apply_rotation(axis, dt);
        }
    }

    fn handle_action(&mut self, ctx: &mut HandlerContext<'_>, action: &Tag, pressed: bool) {
        if !pressed {
            return;
        }

        if action.matches_exact(&tags::input::primary()) {
            if self.is_holding() {
                if self.is_near_snap_point() {
                    self.execute_snap(ctx);
                } else if self.config.allow_drop {
                    self.release(false);
                }
            } else if let Some(index) = self.grab_candidate(&ctx.view) {
                self.grab(index);
            }
        } else if action.matches_exact(&tags::input::secondary()) {
            if self.is_holding() && self.config.allow_drop {
                self.release(false);
            }
        } else if action.matches_exact(&tags::input::scroll_up()) {
            if self.is_holding() {
                self.adjust_hold_distance(self.config.hold_distance_step);
            }
        } else if action.matches_exact(&tags::input::scroll_down()) {
            if self.is_holding() {
                self.adjust_hold_distance(-self.config.hold_distance_step);
            }
        }
    }

    fn handle_positional(&mut self, _ctx: &mut HandlerContext<'_>, point: Vec3, _normal: Vec3) {
        self.hover_point = Some(point);
    }

    fn needs_tick(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
