//! Objective tracking engine
//!
//! Maps a run id to a tracked objective set and owns all completion-policy
//! evaluation. Lookups with an unknown run id or tag are silent no-ops so
//! callers can report progress without guarding every call.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::core::types::RunId;
use crate::objectives::condition::ObjectiveSet;

/// Runtime state for a single objective
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveState {
    pub value: f32,
    pub met: bool,
    /// Engine time when the objective last became met (0 if never)
    pub met_at: f32,
}

impl ObjectiveState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One registered objective set with its per-entry state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedObjectiveSet {
    pub id: RunId,
    pub definition: ObjectiveSet,
    /// Parallel to `definition.entries`
    pub states: Vec<ObjectiveState>,
}

impl TrackedObjectiveSet {
    fn new(definition: ObjectiveSet) -> Self {
        let states = vec![ObjectiveState::default(); definition.entries.len()];
        Self {
            id: RunId::new(),
            definition,
            states,
        }
    }

    /// Store a value and re-evaluate. Returns true on a false -> true transition.
    fn update(&mut self, index: usize, value: f32, now: f32) -> bool {
        let entry = &self.definition.entries[index];
        let state = &mut self.states[index];

        let was_met = state.met;
        state.value = value;
        state.met = entry.condition.evaluate(value);

        if state.met && !was_met {
            state.met_at = now;
            return true;
        }
        false
    }

    pub fn mandatory_satisfied(&self) -> bool {
        self.definition
            .entries
            .iter()
            .zip(&self.states)
            .all(|(entry, state)| !entry.mandatory || state.met)
    }

    pub fn optional_completed_count(&self) -> u32 {
        self.definition
            .entries
            .iter()
            .zip(&self.states)
            .filter(|(entry, state)| !entry.mandatory && state.met)
            .count() as u32
    }

    pub fn optional_completed_weight(&self) -> u32 {
        self.definition
            .entries
            .iter()
            .zip(&self.states)
            .filter(|(entry, state)| !entry.mandatory && state.met)
            .map(|(entry, _)| entry.weight)
            .sum()
    }

    pub fn is_complete(&self) -> bool {
        if !self.mandatory_satisfied() {
            return false;
        }
        let required = self.definition.optional_required_count;
        required == 0 || self.optional_completed_count() >= required
    }

    pub fn has_bonus(&self) -> bool {
        let threshold = self.definition.optional_bonus_threshold;
        threshold > 0 && self.optional_completed_count() >= threshold
    }

    /// Met entries over all entries, unweighted, mandatory and optional mixed
    pub fn progress(&self) -> f32 {
        if self.states.is_empty() {
            return 0.0;
        }
        let met = self.states.iter().filter(|s| s.met).count();
        met as f32 / self.states.len() as f32
    }
}

/// Signals emitted by the tracker, drained by whoever owns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackerEvent {
    /// Any accepted value update, including resets
    ObjectiveUpdated { run: RunId, tag: Tag, value: f32 },
    /// A false -> true transition
    ObjectiveMet { run: RunId, tag: Tag, timestamp: f32 },
    /// A newly-met objective left the set complete
    SetComplete { run: RunId, bonus: bool },
    SetFailed { run: RunId },
}

/// The objective tracking engine
#[derive(Debug, Default)]
pub struct ObjectiveTracker {
    sets: AHashMap<RunId, TrackedObjectiveSet>,
    now: f32,
    events: Vec<TrackerEvent>,
}

impl ObjectiveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // === CLOCK ===

    /// Advance the engine clock used for met-timestamps
    pub fn advance_time(&mut self, dt: f32) {
        self.now += dt.max(0.0);
    }

    pub fn now(&self) -> f32 {
        self.now
    }

    // === REGISTRATION ===

    /// Register a definition and return a fresh run id
    pub fn register(&mut self, definition: &ObjectiveSet) -> Result<RunId> {
        if !definition.is_valid() {
            return Err(MiniGameError::InvalidDefinition(
                "objective set must contain at least one entry with a valid tag".into(),
            ));
        }

        let tracked = TrackedObjectiveSet::new(definition.clone());
        let id = tracked.id;
        self.sets.insert(id, tracked);
        tracing::debug!("Registered objective set {:?} ({} entries)", id, definition.len());
        Ok(id)
    }

    /// Release a tracked set. Unknown or already-released ids are ignored.
    pub fn unregister(&mut self, run: RunId) {
        if self.sets.remove(&run).is_some() {
            tracing::debug!("Unregistered objective set {:?}", run);
        }
    }

    pub fn is_registered(&self, run: RunId) -> bool {
        self.sets.contains_key(&run)
    }

    pub fn registered_count(&self) -> usize {
        self.sets.len()
    }

    // === UPDATES ===

    pub fn set_value(&mut self, run: RunId, tag: &Tag, value: f32) {
        self.update_internal(run, tag, value);
    }

    pub fn add_value(&mut self, run: RunId, tag: &Tag, delta: f32) {
        let current = self.value(run, tag);
        self.update_internal(run, tag, current + delta);
    }

    /// Force the entry to a passing value
    pub fn complete(&mut self, run: RunId, tag: &Tag) {
        let passing = match self
            .sets
            .get(&run)
            .and_then(|set| set.definition.find_entry(tag))
        {
            Some(entry) => entry.condition.passing_value(),
            None => return,
        };
        self.update_internal(run, tag, passing);
    }

    pub fn reset_objective(&mut self, run: RunId, tag: &Tag) {
        let Some(set) = self.sets.get_mut(&run) else {
            return;
        };
        if let Some(index) = set.definition.find_index(tag) {
            set.states[index].reset();
            self.events.push(TrackerEvent::ObjectiveUpdated {
                run,
                tag: *tag,
                value: 0.0,
            });
        }
    }

    pub fn reset_set(&mut self, run: RunId) {
        let Some(set) = self.sets.get_mut(&run) else {
            return;
        };
        for (entry, state) in set.definition.entries.iter().zip(set.states.iter_mut()) {
            state.reset();
            self.events.push(TrackerEvent::ObjectiveUpdated {
                run,
                tag: entry.condition.tag,
                value: 0.0,
            });
        }
    }

    /// Signal that the owner of this set failed it
    pub fn fail_set(&mut self, run: RunId) {
        if self.sets.contains_key(&run) {
            self.events.push(TrackerEvent::SetFailed { run });
        }
    }

    fn update_internal(&mut self, run: RunId, tag: &Tag, value: f32) {
        let now = self.now;
        let Some(set) = self.sets.get_mut(&run) else {
            return;
        };
        let Some(index) = set.definition.find_index(tag) else {
            return;
        };

        let newly_met = set.update(index, value, now);
        self.events.push(TrackerEvent::ObjectiveUpdated {
            run,
            tag: *tag,
            value,
        });

        if newly_met {
            self.events.push(TrackerEvent::ObjectiveMet {
                run,
                tag: *tag,
                timestamp: now,
            });
            if set.is_complete() {
                let bonus = set.has_bonus();
                self.events.push(TrackerEvent::SetComplete { run, bonus });
            }
        }
    }

    // === QUERIES ===

    pub fn value(&self, run: RunId, tag: &Tag) -> f32 {
        self.state(run, tag).map(|s| s.value).unwrap_or(0.0)
    }

    pub fn is_met(&self, run: RunId, tag: &Tag) -> bool {
        self.state(run, tag).map(|s| s.met).unwrap_or(false)
    }

    pub fn state(&self, run: RunId, tag: &Tag) -> Option<ObjectiveState> {
        let set = self.sets.get(&run)?;
        let index = set.definition.find_index(tag)?;
        set.states.get(index).copied()
    }

    pub fn is_mandatory_satisfied(&self, run: RunId) -> bool {
        self.sets.get(&run).map_or(false, |s| s.mandatory_satisfied())
    }

    pub fn optional_completed_count(&self, run: RunId) -> u32 {
        self.sets.get(&run).map_or(0, |s| s.optional_completed_count())
    }

    pub fn optional_completed_weight(&self, run: RunId) -> u32 {
        self.sets.get(&run).map_or(0, |s| s.optional_completed_weight())
    }

    pub fn is_complete(&self, run: RunId) -> bool {
        self.sets.get(&run).map_or(false, |s| s.is_complete())
    }

    pub fn has_bonus(&self, run: RunId) -> bool {
        self.sets.get(&run).map_or(false, |s| s.has_bonus())
    }

    pub fn progress(&self, run: RunId) -> f32 {
        self.sets.get(&run).map_or(0.0, |s| s.progress())
    }

    pub fn tracked_set(&self, run: RunId) -> Option<&TrackedObjectiveSet> {
        self.sets.get(&run)
    }

    // === EVENTS ===

    /// Take every signal emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<TrackerEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objectives::condition::{CompareOp, ObjectiveCondition, ObjectiveEntry};
    use proptest::prelude::*;

    fn t(name: &str) -> Tag {
        Tag::new(&format!("Test.Tracker.{}", name))
    }

    fn mandatory(name: &str) -> ObjectiveEntry {
        ObjectiveEntry::mandatory(ObjectiveCondition::at_least(t(name), 1.0))
    }

    fn optional(name: &str, weight: u32) -> ObjectiveEntry {
        ObjectiveEntry::optional(ObjectiveCondition::at_least(t(name), 1.0), weight)
    }

    #[test]
    fn test_register_initializes_states() {
        let mut tracker = ObjectiveTracker::new();
        let set = ObjectiveSet::new(vec![mandatory("A"), optional("B", 1)]);
        let run = tracker.register(&set).unwrap();

        let tracked = tracker.tracked_set(run).unwrap();
        assert_eq!(tracked.states.len(), tracked.definition.entries.len());
        assert!(tracked.states.iter().all(|s| !s.met && s.value == 0.0));
    }

    #[test]
    fn test_register_empty_set_fails() {
        let mut tracker = ObjectiveTracker::new();
        let result = tracker.register(&ObjectiveSet::default());
        assert!(matches!(result, Err(MiniGameError::InvalidDefinition(_))));
        assert_eq!(tracker.registered_count(), 0);
    }

    #[test]
    fn test_met_is_not_sticky() {
        let mut tracker = ObjectiveTracker::new();
        let run = tracker.register(&ObjectiveSet::new(vec![mandatory("A")])).unwrap();

        tracker.set_value(run, &t("A"), 0.5);
        assert!(!tracker.is_met(run, &t("A")));
        tracker.set_value(run, &t("A"), 1.0);
        assert!(tracker.is_met(run, &t("A")));
        tracker.set_value(run, &t("A"), 3.0);
        assert!(tracker.is_met(run, &t("A")));
        tracker.set_value(run, &t("A"), 0.2);
        assert!(!tracker.is_met(run, &t("A")));
    }

    #[test]
    fn test_newly_met_fires_once() {
        let mut tracker = ObjectiveTracker::new();
        let run = tracker.register(&ObjectiveSet::new(vec![mandatory("A")])).unwrap();
        tracker.drain_events();

        tracker.set_value(run, &t("A"), 1.0);
        tracker.set_value(run, &t("A"), 2.0);

        let events = tracker.drain_events();
        let met = events
            .iter()
            .filter(|e| matches!(e, TrackerEvent::ObjectiveMet { .. }))
            .count();
        let updates = events
            .iter()
            .filter(|e| matches!(e, TrackerEvent::ObjectiveUpdated { .. }))
            .count();
        assert_eq!(met, 1);
        assert_eq!(updates, 2);
    }

    #[test]
    fn test_met_timestamp_uses_engine_clock() {
        let mut tracker = ObjectiveTracker::new();
        let run = tracker.register(&ObjectiveSet::new(vec![mandatory("A")])).unwrap();
        tracker.advance_time(2.5);
        tracker.set_value(run, &t("A"), 1.0);
        assert_eq!(tracker.state(run, &t("A")).unwrap().met_at, 2.5);
    }

    #[test]
    fn test_add_value_accumulates() {
        let mut tracker = ObjectiveTracker::new();
        let set = ObjectiveSet::new(vec![ObjectiveEntry::mandatory(ObjectiveCondition::at_least(
            t("Count"),
            3.0,
        ))]);
        let run = tracker.register(&set).unwrap();

        tracker.add_value(run, &t("Count"), 1.0);
        tracker.add_value(run, &t("Count"), 1.0);
        assert!(!tracker.is_complete(run));
        tracker.add_value(run, &t("Count"), 1.0);
        assert!(tracker.is_complete(run));
        assert_eq!(tracker.value(run, &t("Count")), 3.0);
    }

    #[test]
    fn test_complete_uses_passing_value() {
        let mut tracker = ObjectiveTracker::new();
        let set = ObjectiveSet::new(vec![ObjectiveEntry::mandatory(ObjectiveCondition::new(
            t("Strict"),
            CompareOp::Greater,
            5.0,
        ))]);
        let run = tracker.register(&set).unwrap();
        tracker.complete(run, &t("Strict"));
        assert!(tracker.is_met(run, &t("Strict")));
    }

    #[test]
    fn test_unknown_run_and_tag_are_noops() {
        let mut tracker = ObjectiveTracker::new();
        let run = tracker.register(&ObjectiveSet::new(vec![mandatory("A")])).unwrap();
        tracker.drain_events();

        tracker.set_value(RunId::new(), &t("A"), 1.0);
        tracker.set_value(run, &t("NotInSet"), 1.0);
        tracker.complete(run, &t("NotInSet"));

        assert!(!tracker.is_met(run, &t("A")));
        assert!(tracker.drain_events().is_empty());
        assert_eq!(tracker.progress(RunId::new()), 0.0);
        assert!(!tracker.is_complete(RunId::new()));
    }

    #[test]
    fn test_optional_required_and_bonus() {
        let mut tracker = ObjectiveTracker::new();
        let set = ObjectiveSet::new(vec![
            mandatory("M"),
            optional("O1", 2),
            optional("O2", 3),
            optional("O3", 1),
        ])
        .with_optional_required(1)
        .with_bonus_threshold(2);
        let run = tracker.register(&set).unwrap();

        tracker.set_value(run, &t("M"), 1.0);
        assert!(tracker.is_mandatory_satisfied(run));
        assert!(!tracker.is_complete(run));

        tracker.set_value(run, &t("O2"), 1.0);
        assert!(tracker.is_complete(run));
        assert!(!tracker.has_bonus(run));
        assert_eq!(tracker.optional_completed_weight(run), 3);

        tracker.set_value(run, &t("O3"), 1.0);
        assert!(tracker.has_bonus(run));
        assert_eq!(tracker.optional_completed_count(run), 2);
        assert_eq!(tracker.optional_completed_weight(run), 4);
    }

    #[test]
    fn test_progress_is_unweighted() {
        let mut tracker = ObjectiveTracker::new();
        let set = ObjectiveSet::new(vec![mandatory("M"), optional("Heavy", 10)]);
        let run = tracker.register(&set).unwrap();
        tracker.set_value(run, &t("Heavy"), 1.0);
        assert_eq!(tracker.progress(run), 0.5);
    }

    #[test]
    fn test_set_complete_signal() {
        let mut tracker = ObjectiveTracker::new();
        let run = tracker
            .register(&ObjectiveSet::new(vec![mandatory("A"), mandatory("B")]))
            .unwrap();
        tracker.set_value(run, &t("A"), 1.0);
        tracker.set_value(run, &t("B"), 1.0);
        let events = tracker.drain_events();
        assert!(events.contains(&TrackerEvent::SetComplete { run, bonus: false }));
    }

    #[test]
    fn test_reset_and_fail() {
        let mut tracker = ObjectiveTracker::new();
        let run = tracker.register(&ObjectiveSet::new(vec![mandatory("A")])).unwrap();
        tracker.set_value(run, &t("A"), 1.0);
        tracker.reset_set(run);
        assert!(!tracker.is_met(run, &t("A")));

        tracker.set_value(run, &t("A"), 1.0);
        tracker.reset_objective(run, &t("A"));
        assert_eq!(tracker.value(run, &t("A")), 0.0);

        tracker.drain_events();
        tracker.fail_set(run);
        assert_eq!(tracker.drain_events(), vec![TrackerEvent::SetFailed { run }]);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut tracker = ObjectiveTracker::new();
        let a = tracker.register(&ObjectiveSet::new(vec![mandatory("A")])).unwrap();
        let b = tracker.register(&ObjectiveSet::new(vec![mandatory("A")])).unwrap();

        tracker.unregister(a);
        tracker.unregister(a);
        tracker.unregister(RunId::new());

        assert!(!tracker.is_registered(a));
        assert!(tracker.is_registered(b));
        tracker.set_value(b, &t("A"), 1.0);
        assert!(tracker.is_complete(b));
    }

    proptest! {
        #[test]
        fn prop_mandatory_satisfied_only_after_all_met(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
            let names: Vec<String> = (0..6).map(|i| format!("Prop{}", i)).collect();
            let set = ObjectiveSet::new(names.iter().map(|n| mandatory(n)).collect());
            let mut tracker = ObjectiveTracker::new();
            let run = tracker.register(&set).unwrap();

            for (step, index) in order.iter().enumerate() {
                prop_assert!(!tracker.is_mandatory_satisfied(run));
                tracker.set_value(run, &t(&names[*index]), 1.0);
                let all_done = step == order.len() - 1;
                prop_assert_eq!(tracker.is_mandatory_satisfied(run), all_done);
            }
        }

        #[test]
        fn prop_met_tracks_latest_value(values in proptest::collection::vec(-5.0f32..5.0, 1..20), target in -2.0f32..2.0) {
            let set = ObjectiveSet::new(vec![ObjectiveEntry::mandatory(
                ObjectiveCondition::at_least(t("PropValue"), target),
            )]);
            let mut tracker = ObjectiveTracker::new();
            let run = tracker.register(&set).unwrap();

            for value in values {
                tracker.set_value(run, &t("PropValue"), value);
                prop_assert_eq!(tracker.is_met(run, &t("PropValue")), value >= target);
            }
        }

        #[test]
        fn prop_unregister_leaves_others_untouched(count in 1usize..8, victim in 0usize..8) {
            let mut tracker = ObjectiveTracker::new();
            let runs: Vec<RunId> = (0..count)
                .map(|_| tracker.register(&ObjectiveSet::new(vec![mandatory("Keep")])).unwrap())
                .collect();
            let victim = runs[victim % count];

            tracker.unregister(victim);
            tracker.unregister(victim);

            for run in runs {
                prop_assert_eq!(tracker.is_registered(run), run != victim);
            }
        }
    }
}
