//! Orchestrator integration tests
//!
//! Drives full mini-game runs through the public orchestrator API: start
//! rejection paths, end-to-end mechanic runs, camera pairing, station
//! notifications and cancellation.

use std::rc::Rc;

use glam::{Vec2, Vec3};
use minigame_engine::camera::CameraLogEntry;
use minigame_engine::definition::{
    LockpickConfig, RhythmConfig, SequenceConfig, TemperatureConfig, TimingWindowConfig,
};
use minigame_engine::handlers::temperature::OVERHEATED;
use minigame_engine::handlers::{HandlerEvent, SequenceHandler, SweetspotHandler, TimingHandler};
use minigame_engine::tags;
use minigame_engine::*;

fn orchestrator_with(definitions: Vec<MiniGameDefinition>) -> MiniGameOrchestrator {
    let mut table = DefinitionTable::new();
    for definition in definitions {
        table.insert(definition).expect("valid definition");
    }
    MiniGameOrchestrator::with_table(OrchestratorConfig::seeded(99), table).expect("orchestrator")
}

fn vault_lock(pins: u32) -> MiniGameDefinition {
    MiniGameDefinition::new(
        Tag::new("Test.Vault.Lock"),
        MechanicConfig::Lockpick(LockpickConfig {
            pin_count: pins,
            ..LockpickConfig::default()
        }),
    )
    .with_camera_mode(tags::camera_mode::station_lockpick())
}

fn keypad(expected: &[u8]) -> MiniGameDefinition {
    MiniGameDefinition::new(
        Tag::new("Test.Vault.Keypad"),
        MechanicConfig::Sequence(SequenceConfig {
            expected: expected.iter().map(|d| tags::input::numpad_digit(*d)).collect(),
            ..SequenceConfig::default()
        }),
    )
    .with_camera_mode(tags::camera_mode::station_numpad())
}

fn press(o: &mut MiniGameOrchestrator, action: Tag) {
    o.route_action_input(&action, true);
    o.route_action_input(&action, false);
}

fn sweetspot(o: &MiniGameOrchestrator) -> &SweetspotHandler {
    o.active_handler()
        .and_then(|h| h.downcast_ref::<SweetspotHandler>())
        .expect("sweetspot handler")
}

/// Starting while active is rejected and leaves the running game untouched
#[test]
fn test_start_while_active_is_rejected() {
    let mut o = orchestrator_with(vec![vault_lock(1), keypad(&[1, 2, 3])]);
    o.start(Tag::new("Test.Vault.Lock"), None).unwrap();
    let run = o.active_run();

    let result = o.start(Tag::new("Test.Vault.Keypad"), None);
    assert!(matches!(result, Err(MiniGameError::AlreadyActive(id)) if id == Tag::new("Test.Vault.Lock")));

    assert_eq!(o.active_id(), Some(Tag::new("Test.Vault.Lock")));
    assert_eq!(o.active_run(), run);
    assert!(o.active_handler().unwrap().downcast_ref::<SweetspotHandler>().is_some());
    assert_eq!(o.tracker().registered_count(), 1);
    assert_eq!(o.camera().request_count(), 1);
    assert_eq!(o.camera().outstanding(), 1);
    assert_eq!(o.camera().current_mode(), Some(tags::camera_mode::station_lockpick()));
}

/// A handler that cannot be built rolls back the objective registration
#[test]
fn test_spawn_failure_rolls_back_registration() {
    let missing = keypad(&[1]).with_handler_class("NoSuchHandler");
    let mismatched = MiniGameDefinition {
        id: Tag::new("Test.Vault.Mismatched"),
        ..vault_lock(1).with_handler_class(TimingHandler::CLASS_NAME)
    };
    let mut o = orchestrator_with(vec![missing, mismatched]);

    for id in ["Test.Vault.Keypad", "Test.Vault.Mismatched"] {
        let result = o.start(Tag::new(id), None);
        assert!(matches!(result, Err(MiniGameError::HandlerSpawnFailed(_))));
        assert!(!o.is_active());
        assert_eq!(o.tracker().registered_count(), 0);
        assert_eq!(o.camera().request_count(), 0);
    }
    assert!(o.drain_events().is_empty());
}

/// Unknown ids and unavailable stations fail without side effects
#[test]
fn test_config_not_found_and_station_unavailable() {
    let mut o = orchestrator_with(vec![keypad(&[1])]);
    assert!(matches!(
        o.start(Tag::new("Test.Nowhere"), None),
        Err(MiniGameError::ConfigNotFound(_))
    ));

    let basic = Rc::new(BasicStation::new(Tag::new("Test.Vault.Keypad")));
    basic.set_available(false);
    let station: Rc<dyn Station> = basic.clone();
    assert!(matches!(
        o.start(Tag::new("Test.Vault.Keypad"), Some(&station)),
        Err(MiniGameError::StationUnavailable(_))
    ));
    assert!(basic.started().is_empty());
    assert_eq!(o.tracker().registered_count(), 0);
    assert_eq!(o.camera().request_count(), 0);
}

/// Two-pin lock opened pin by pin completes and pairs the camera release
#[test]
fn test_lockpick_two_pins_end_to_end() {
    let mut o = orchestrator_with(vec![vault_lock(2)]);
    o.start(Tag::new("Test.Vault.Lock"), None).unwrap();

    for pin in 0..2 {
        let (position, target) = {
            let handler = sweetspot(&o);
            assert_eq!(handler.pin_index(), pin);
            (handler.position(), handler.target())
        };
        // delta = x * dt * pick_sensitivity(2.0)
        o.route_axis_input(Vec2::new(target - position, 0.0), 0.5);
        assert!(sweetspot(&o).in_sweetspot());

        o.route_action_input(&tags::input::primary(), true);
        o.tick(0.016);
        o.route_action_input(&tags::input::primary(), false);
    }

    assert!(!o.is_active());
    assert_eq!(o.phase(), OrchestratorPhase::Idle);

    let events = o.drain_events();
    let unlocked = events
        .iter()
        .filter(|e| matches!(e, MiniGameEvent::Mechanic { event: HandlerEvent::PinUnlocked { .. }, .. }))
        .count();
    assert_eq!(unlocked, 2);
    assert!(events.iter().any(|e| matches!(
        e,
        MiniGameEvent::Mechanic { event: HandlerEvent::Completed { success: true }, .. }
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, MiniGameEvent::ObjectivesComplete { .. })));

    let outcome = o.last_outcome().unwrap();
    assert!(outcome.success);
    assert!(outcome.objectives_complete);
    assert_eq!(outcome.failure_reason, None);

    let log = o.camera().log();
    assert_eq!(log.len(), 2);
    match (&log[0], &log[1]) {
        (CameraLogEntry::Requested(request), CameraLogEntry::Released(release)) => {
            assert_eq!(request.requester, release.requester);
            assert_eq!(request.source, Tag::new("Test.Vault.Lock"));
        }
        other => panic!("unexpected camera log {:?}", other),
    }
    assert_eq!(o.camera().outstanding(), 0);
    assert_eq!(o.tracker().registered_count(), 0);
}

/// Wrong code resets the attempt; the right one completes the run
#[test]
fn test_sequence_wrong_then_right_code() {
    let mut o = orchestrator_with(vec![keypad(&[1, 2, 3])]);
    o.start(Tag::new("Test.Vault.Keypad"), None).unwrap();

    for digit in [1, 2, 4] {
        press(&mut o, tags::input::numpad_digit(digit));
    }
    {
        let handler = o
            .active_handler()
            .and_then(|h| h.downcast_ref::<SequenceHandler>())
            .unwrap();
        assert_eq!(handler.error_count(), 1);
        assert!(handler.current_sequence().is_empty());
    }

    for digit in [1, 2, 3] {
        press(&mut o, tags::input::numpad_digit(digit));
    }
    press(&mut o, tags::input::numpad_enter());
    assert!(o.tracker().is_met(o.active_run().unwrap(), &tags::objective::code_entered()));

    o.tick(0.016);
    let outcome = o.last_outcome().unwrap();
    assert!(outcome.success);
    assert!(o.camera().is_balanced());
}

/// Rhythm run: two centred hits across a cycle wrap complete the game
#[test]
fn test_timing_hits_across_cycles() {
    let rhythm = MiniGameDefinition::new(
        Tag::new("Test.Forge.Hammer"),
        MechanicConfig::Timing(RhythmConfig {
            timing: TimingWindowConfig {
                window_shrink_rate: 0.0,
                ..TimingWindowConfig::default()
            },
            required_success_count: 2,
            ..RhythmConfig::default()
        }),
    );
    let mut o = orchestrator_with(vec![rhythm]);
    o.start(Tag::new("Test.Forge.Hammer"), None).unwrap();

    o.tick(0.5);
    press(&mut o, tags::input::primary());
    let handler = o.active_handler().unwrap().downcast_ref::<TimingHandler>().unwrap();
    assert_eq!(handler.success_count(), 1);
    assert!((handler.last_accuracy() - 1.0).abs() < 1e-5);

    o.tick(1.0);
    press(&mut o, tags::input::primary());
    o.tick(0.016);

    let outcome = o.last_outcome().unwrap();
    assert!(outcome.success);
    assert_eq!(
        o.drain_events()
            .iter()
            .filter(|e| matches!(e, MiniGameEvent::Mechanic { event: HandlerEvent::TimingResult { hit: true, .. }, .. }))
            .count(),
        2
    );
}

/// Overheating fails the run and notifies the station with success=false
#[test]
fn test_temperature_overheat_notifies_station() {
    let oven_id = Tag::new("Test.Kitchen.Oven");
    let oven = MiniGameDefinition::new(
        oven_id,
        MechanicConfig::Temperature(TemperatureConfig {
            start_temperature: Some(290.0),
            ..TemperatureConfig::default()
        }),
    );
    let mut o = orchestrator_with(vec![oven]);
    let basic = Rc::new(BasicStation::new(oven_id));
    let station: Rc<dyn Station> = basic.clone();

    o.start(oven_id, Some(&station)).unwrap();
    assert_eq!(basic.started(), vec![oven_id]);

    o.route_action_input(&tags::input::primary(), true);
    o.tick(1.0);

    assert!(!o.is_active());
    let outcome = o.last_outcome().unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.failure_reason.as_deref(), Some(OVERHEATED));
    assert_eq!(basic.ended(), vec![(oven_id, false, false)]);
    assert!(o.camera().is_balanced());

    let failures = o
        .drain_events()
        .iter()
        .filter(|e| matches!(e, MiniGameEvent::Mechanic { event: HandlerEvent::Failed { .. }, .. }))
        .count();
    assert_eq!(failures, 1);
}

/// Non-cancelable runs ignore requested cancels but not owner teardown
#[test]
fn test_cancel_gating() {
    let locked = keypad(&[1, 2]).non_cancelable();
    let mut o = orchestrator_with(vec![locked]);
    let basic = Rc::new(BasicStation::new(Tag::new("Test.Vault.Keypad")));
    let station: Rc<dyn Station> = basic.clone();
    o.start(Tag::new("Test.Vault.Keypad"), Some(&station)).unwrap();

    assert!(!o.cancel(CancelReason::Requested("walked away".into())));
    assert!(o.is_active());
    assert_eq!(o.camera().outstanding(), 1);

    assert!(o.cancel(CancelReason::OwnerDestroyed));
    assert!(!o.is_active());
    let outcome = o.last_outcome().unwrap();
    assert!(outcome.cancelled);
    assert_eq!(outcome.failure_reason.as_deref(), Some("owner destroyed"));
    assert_eq!(basic.ended(), vec![(Tag::new("Test.Vault.Keypad"), false, false)]);
    assert!(o.camera().is_balanced());
    assert!(o
        .drain_events()
        .iter()
        .any(|e| matches!(e, MiniGameEvent::Cancelled { .. })));
}

/// Dropping the orchestrator mid-run still tells the station the run ended
#[test]
fn test_drop_cancels_active_run() {
    let basic = Rc::new(BasicStation::new(Tag::new("Test.Vault.Keypad")));
    let station: Rc<dyn Station> = basic.clone();
    {
        let mut o = orchestrator_with(vec![keypad(&[5]).non_cancelable()]);
        o.start(Tag::new("Test.Vault.Keypad"), Some(&station)).unwrap();
    }
    assert_eq!(basic.ended(), vec![(Tag::new("Test.Vault.Keypad"), false, false)]);
}

/// A station that goes away mid-run is simply not notified
#[test]
fn test_station_dropped_mid_run() {
    let mut o = orchestrator_with(vec![keypad(&[5])]);
    {
        let station: Rc<dyn Station> = Rc::new(BasicStation::new(Tag::new("Test.Vault.Keypad")));
        o.start(Tag::new("Test.Vault.Keypad"), Some(&station)).unwrap();
    }
    press(&mut o, tags::input::numpad_digit(5));
    o.tick(0.016);
    assert!(o.last_outcome().unwrap().success);
}

/// Station stored code wins over the configured sequence
#[test]
fn test_station_code_overrides_config() {
    let mut o = orchestrator_with(vec![keypad(&[1, 1, 1])]);
    let station: Rc<dyn Station> = Rc::new(
        BasicStation::new(Tag::new("Test.Vault.Keypad"))
            .with_code(vec![tags::input::numpad_digit(9), tags::input::numpad_digit(8)]),
    );
    o.start(Tag::new("Test.Vault.Keypad"), Some(&station)).unwrap();

    press(&mut o, tags::input::numpad_digit(9));
    press(&mut o, tags::input::numpad_digit(8));
    o.tick(0.016);
    assert!(o.last_outcome().unwrap().success);
}

/// Inputs routed while idle are ignored
#[test]
fn test_routing_while_idle_is_noop() {
    let mut o = orchestrator_with(vec![keypad(&[1])]);
    o.route_axis_input(Vec2::ONE, 0.1);
    o.route_action_input(&tags::input::primary(), true);
    o.route_positional_input(Vec3::ZERO, Vec3::Z);
    o.tick(0.1);
    assert!(o.drain_events().is_empty());
    assert_eq!(o.phase(), OrchestratorPhase::Idle);
    assert_eq!(o.current_progress(), 0.0);
}
