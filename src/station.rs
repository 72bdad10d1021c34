//! Station collaborator - the world object a mini-game is played at
//!
//! Stations own game-specific data (codes, snap points, difficulty); the
//! orchestrator owns the run. The orchestrator holds stations weakly, so
//! notification methods take `&self` and implementors use interior
//! mutability for any state they keep.

use std::cell::{Cell, RefCell};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::tag::Tag;
use crate::core::types::Rotator;
use crate::definition::MiniGameDefinition;

/// One attachment point for assembly mini-games
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapPoint {
    pub tag: Tag,
    pub location: Vec3,
    #[serde(default)]
    pub required_rotation: Rotator,
    /// Item tags accepted here (empty accepts anything)
    #[serde(default)]
    pub accepted_item_tags: Vec<Tag>,
    /// Overrides the configured snap distance when positive
    #[serde(default)]
    pub snap_distance_override: f32,
    /// Objective completed when an item snaps here
    #[serde(default)]
    pub objective_tag: Tag,
}

impl SnapPoint {
    pub fn new(tag: Tag, location: Vec3) -> Self {
        Self {
            tag,
            location,
            required_rotation: Rotator::ZERO,
            accepted_item_tags: Vec::new(),
            snap_distance_override: 0.0,
            objective_tag: Tag::NONE,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotator) -> Self {
        self.required_rotation = rotation;
        self
    }

    pub fn with_objective(mut self, objective: Tag) -> Self {
        self.objective_tag = objective;
        self
    }

    pub fn accepting(mut self, items: Vec<Tag>) -> Self {
        self.accepted_item_tags = items;
        self
    }

    pub fn accepts(&self, item: &Tag) -> bool {
        self.accepted_item_tags.is_empty() || item.matches_any(&self.accepted_item_tags)
    }

    pub fn snap_distance(&self, default: f32) -> f32 {
        if self.snap_distance_override > 0.0 {
            self.snap_distance_override
        } else {
            default
        }
    }
}

/// A loose object a manipulation mini-game can pick up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManipulablePart {
    pub tag: Tag,
    pub location: Vec3,
    #[serde(default)]
    pub rotation: Rotator,
    /// Matched against snap point accept lists
    #[serde(default)]
    pub item_tag: Tag,
}

impl ManipulablePart {
    pub fn new(tag: Tag, location: Vec3) -> Self {
        Self {
            tag,
            location,
            rotation: Rotator::ZERO,
            item_tag: Tag::NONE,
        }
    }

    pub fn with_item_tag(mut self, item: Tag) -> Self {
        self.item_tag = item;
        self
    }
}

/// What a mini-game needs from the station it runs at
pub trait Station {
    fn mini_game_id(&self) -> Tag;

    /// Station-supplied definition; takes precedence over the table
    fn mini_game_config(&self) -> Option<MiniGameDefinition> {
        None
    }

    fn snap_points(&self) -> Vec<SnapPoint> {
        Vec::new()
    }

    fn manipulable_parts(&self) -> Vec<ManipulablePart> {
        Vec::new()
    }

    /// Stored code for sequence mini-games; empty falls back to the config
    fn stored_code(&self) -> Vec<Tag> {
        Vec::new()
    }

    /// 0 is hardest, 1 easiest
    fn difficulty_modifier(&self) -> f32 {
        0.5
    }

    fn is_mini_game_available(&self) -> bool {
        true
    }

    fn on_mini_game_started(&self, _id: Tag) {}

    fn on_mini_game_ended(&self, _id: Tag, _success: bool, _bonus: bool) {}
}

/// Data-driven station that records the notifications it receives
#[derive(Debug, Default)]
pub struct BasicStation {
    pub id: Tag,
    pub config: Option<MiniGameDefinition>,
    pub snap_points: Vec<SnapPoint>,
    pub parts: Vec<ManipulablePart>,
    pub code: Vec<Tag>,
    pub difficulty: f32,
    pub available: Cell<bool>,
    started: RefCell<Vec<Tag>>,
    ended: RefCell<Vec<(Tag, bool, bool)>>,
}

impl BasicStation {
    pub fn new(id: Tag) -> Self {
        Self {
            id,
            difficulty: 0.5,
            available: Cell::new(true),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: MiniGameDefinition) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_snap_points(mut self, points: Vec<SnapPoint>) -> Self {
        self.snap_points = points;
        self
    }

    pub fn with_parts(mut self, parts: Vec<ManipulablePart>) -> Self {
        self.parts = parts;
        self
    }

    pub fn with_code(mut self, code: Vec<Tag>) -> Self {
        self.code = code;
        self
    }

    pub fn with_difficulty(mut self, difficulty: f32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    pub fn started(&self) -> Vec<Tag> {
        self.started.borrow().clone()
    }

    /// (id, success, bonus) per ended run
    pub fn ended(&self) -> Vec<(Tag, bool, bool)> {
        self.ended.borrow().clone()
    }
}

impl Station for BasicStation {
    fn mini_game_id(&self) -> Tag {
        self.id
    }

    fn mini_game_config(&self) -> Option<MiniGameDefinition> {
        self.config.clone()
    }

    fn snap_points(&self) -> Vec<SnapPoint> {
        self.snap_points.clone()
    }

    fn manipulable_parts(&self) -> Vec<ManipulablePart> {
        self.parts.clone()
    }

    fn stored_code(&self) -> Vec<Tag> {
        self.code.clone()
    }

    fn difficulty_modifier(&self) -> f32 {
        self.difficulty
    }

    fn is_mini_game_available(&self) -> bool {
        self.available.get()
    }

    fn on_mini_game_started(&self, id: Tag) {
        self.started.borrow_mut().push(id);
    }

    fn on_mini_game_ended(&self, id: Tag, success: bool, bonus: bool) {
        self.ended.borrow_mut().push((id, success, bonus));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_point_accepts() {
        let open = SnapPoint::new(Tag::new("Test.Snap.Open"), Vec3::ZERO);
        assert!(open.accepts(&Tag::new("Item.Anything")));

        let filtered = SnapPoint::new(Tag::new("Test.Snap.Filtered"), Vec3::ZERO)
            .accepting(vec![Tag::new("Item.Gear")]);
        assert!(filtered.accepts(&Tag::new("Item.Gear.Small")));
        assert!(!filtered.accepts(&Tag::new("Item.Spring")));
    }

    #[test]
    fn test_snap_distance_override() {
        let mut point = SnapPoint::new(Tag::new("Test.Snap.Override"), Vec3::ZERO);
        assert_eq!(point.snap_distance(50.0), 50.0);
        point.snap_distance_override = 12.0;
        assert_eq!(point.snap_distance(50.0), 12.0);
    }

    #[test]
    fn test_basic_station_records_notifications() {
        let station = BasicStation::new(Tag::new("Test.Station.Basic"));
        station.on_mini_game_started(station.id);
        station.on_mini_game_ended(station.id, true, false);
        assert_eq!(station.started().len(), 1);
        assert_eq!(station.ended(), vec![(station.id, true, false)]);
    }
}
