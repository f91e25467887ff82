//! End-to-end tests for session lifecycle, fault handling and event streams

use rb_core::error::{ERROR_LOAD_GAME, ERROR_SERIALIZATION};
use rb_core::{GameSource, SessionConfig, ShaderConfig, Variable, VirtualFile};
use rb_input::{InputDevice, KeyAction, MotionSource, PadButton, SourceClasses, TouchPhase};
use rb_runtime::{LifecyclePhase, NullCore, RetroSession, SessionSetup, Viewport};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

/// Configuration with a short frame interval so tests run quickly.
fn fast_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.refresh_rate = 500.0;
    config
}

fn fast_setup(game: GameSource) -> SessionSetup {
    SessionSetup::new(fast_config(), game)
}

/// Block until the render queue has drained past everything posted so far.
fn sync(session: &RetroSession) {
    let _ = session.variables();
}

/// Poll a condition for up to two seconds.
fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(2) {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_resume_before_load_does_not_step() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    // Host resumes before any surface exists; nothing may step yet.
    session.on_resume();
    sync(&session);
    assert_eq!(stats.steps.load(Ordering::Acquire), 0);
    assert_eq!(session.phase(), LifecyclePhase::Created);

    // Surface arrives, the game loads, and the recorded resume takes effect.
    session.on_surface_created();
    session.on_surface_changed(640, 480);
    sync(&session);
    assert_eq!(session.phase(), LifecyclePhase::Resumed);
    assert_eq!(stats.loads.load(Ordering::Acquire), 1);

    assert!(wait_for(|| stats.steps.load(Ordering::Acquire) > 0));
    session.on_destroy();
}

#[test]
fn test_pause_stops_stepping_at_frame_boundary() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    session.on_surface_created();
    session.on_surface_changed(640, 480);
    session.on_resume();
    assert!(wait_for(|| stats.steps.load(Ordering::Acquire) > 0));

    session.on_pause();
    sync(&session);
    assert_eq!(session.phase(), LifecyclePhase::Paused);
    assert_eq!(stats.pauses.load(Ordering::Acquire), 1);

    // Once the pause job has run, the step counter must not move again.
    let frozen = stats.steps.load(Ordering::Acquire);
    thread::sleep(Duration::from_millis(60));
    assert_eq!(stats.steps.load(Ordering::Acquire), frozen);

    // Resuming picks stepping back up.
    session.on_resume();
    assert!(wait_for(|| stats.steps.load(Ordering::Acquire) > frozen));
    session.on_destroy();
}

#[test]
fn test_game_loads_exactly_once_across_surface_recreation() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    session.on_surface_created();
    session.on_surface_changed(640, 480);
    // Context lost and recreated.
    session.on_surface_created();
    session.on_surface_changed(640, 480);
    sync(&session);

    assert_eq!(stats.loads.load(Ordering::Acquire), 1);
    assert_eq!(stats.surface_creates.load(Ordering::Acquire), 2);
    // Viewport state is replayed into every new context.
    assert_eq!(stats.viewport_updates.load(Ordering::Acquire), 2);

    // Surface notifications replay to late subscribers.
    let surfaces = session.subscribe_surfaces();
    assert_eq!(surfaces.try_next(), Some(()));

    session.on_destroy();
}

#[test]
fn test_game_loads_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let rom = dir.path().join("game.rom");
    std::fs::write(&rom, b"rom image").unwrap();

    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Path(rom)), Box::new(core));

    session.on_surface_created();
    session.on_surface_changed(640, 480);
    session.on_resume();
    sync(&session);

    assert_eq!(session.phase(), LifecyclePhase::Resumed);
    assert_eq!(stats.loads.load(Ordering::Acquire), 1);
    assert!(wait_for(|| stats.steps.load(Ordering::Acquire) > 0));

    session.on_destroy();
}

#[test]
fn test_game_loads_from_virtual_files() {
    let rom = VirtualFile::new("/virtual/game.rom", tempfile::tempfile().unwrap());
    let save = VirtualFile::new("/virtual/game.srm", tempfile::tempfile().unwrap());

    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(
        fast_setup(GameSource::VirtualFiles(vec![rom, save])),
        Box::new(core),
    );

    session.on_surface_created();
    sync(&session);

    assert_eq!(stats.loads.load(Ordering::Acquire), 1);
    assert_eq!(session.phase(), LifecyclePhase::GameLoaded);
    // Serialization needs a loaded game, so a snapshot proves the load took.
    assert!(!session.serialize_state().is_empty());

    session.on_destroy();
}

#[test]
fn test_load_failure_freezes_session() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(Vec::new())), Box::new(core));
    let errors = session.subscribe_errors();

    session.on_surface_created();
    session.on_resume();
    sync(&session);

    assert_eq!(errors.try_next(), Some(ERROR_LOAD_GAME));
    assert_eq!(session.phase(), LifecyclePhase::Aborted);

    // The recorded resume must never start stepping a faulted core.
    thread::sleep(Duration::from_millis(40));
    assert_eq!(stats.steps.load(Ordering::Acquire), 0);

    // Further guarded operations are skipped and raise no second event.
    assert!(!session.restore_state(b"garbage".to_vec()));
    session.set_cheat(0, true, String::new());
    sync(&session);
    assert!(errors.try_next().is_none());

    session.on_destroy();
    // Abort outlives teardown.
    assert_eq!(session.phase(), LifecyclePhase::Aborted);
}

#[test]
fn test_fault_emits_single_error_event() {
    let session = RetroSession::new(
        fast_setup(GameSource::Bytes(b"rom".to_vec())),
        Box::new(NullCore::new()),
    );
    let errors = session.subscribe_errors();

    session.on_surface_created();
    sync(&session);
    assert!(errors.try_next().is_none());

    // A corrupt snapshot is a recognized serialization fault.
    assert!(!session.restore_state(b"not a snapshot".to_vec()));
    assert_eq!(errors.try_next(), Some(ERROR_SERIALIZATION));

    // Every query afterwards degrades to its default.
    assert!(session.serialize_state().is_empty());
    assert!(session.variables().is_empty());
    assert!(errors.try_next().is_none());

    session.on_destroy();
}

#[test]
fn test_error_replays_to_late_subscriber() {
    let session = RetroSession::new(fast_setup(GameSource::Bytes(Vec::new())), Box::new(NullCore::new()));

    session.on_surface_created();
    sync(&session);

    // Subscribing after the fault still observes it.
    let errors = session.subscribe_errors();
    assert_eq!(errors.try_next(), Some(ERROR_LOAD_GAME));

    session.on_destroy();
}

#[test]
fn test_surface_recreation_after_fault_is_silent() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    session.on_surface_created();
    sync(&session);

    // A corrupt snapshot permanently aborts the session.
    assert!(!session.restore_state(b"not a snapshot".to_vec()));
    assert_eq!(session.phase(), LifecyclePhase::Aborted);

    // Clear the replayed pre-fault notification, then lose the context.
    let surfaces = session.subscribe_surfaces();
    surfaces.drain();
    session.on_surface_created();
    sync(&session);

    // The recreation is a no-op: no notification, no core call.
    assert!(surfaces.try_next().is_none());
    assert_eq!(stats.surface_creates.load(Ordering::Acquire), 1);

    session.on_destroy();
}

#[test]
fn test_state_round_trip_through_session() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    session.on_surface_created();
    session.on_surface_changed(640, 480);
    session.on_resume();
    assert!(wait_for(|| stats.steps.load(Ordering::Acquire) > 5));
    session.on_pause();
    sync(&session);

    let snapshot = session.serialize_state();
    assert!(!snapshot.is_empty());

    assert!(session.restore_state(snapshot.clone()));
    assert_eq!(session.serialize_state(), snapshot);

    session.on_destroy();
}

#[test]
fn test_save_ram_restores_after_load() {
    let session = RetroSession::new(
        fast_setup(GameSource::Bytes(b"rom".to_vec())).with_save_ram(vec![7, 7, 7]),
        Box::new(NullCore::new()),
    );

    session.on_surface_created();
    sync(&session);

    assert_eq!(session.serialize_sram(), vec![7, 7, 7]);
    session.on_destroy();
}

#[test]
fn test_routed_input_reaches_assigned_ports_only() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    session.on_devices_changed(&[
        InputDevice::gamepad(10, "pad one", 1),
        InputDevice::gamepad(11, "pad two", 2),
        InputDevice {
            id: 12,
            name: "keyboard".to_string(),
            controller_slot: 0,
            sources: SourceClasses::KEYBOARD,
        },
    ]);

    assert_eq!(session.port_for_device(10), Some(0));
    assert_eq!(session.port_for_device(11), Some(1));
    assert_eq!(session.port_for_device(12), None);

    assert!(session.route_key_event(10, KeyAction::Down, PadButton::A));
    assert!(session.route_motion_event(11, MotionSource::AnalogLeft, 0.5, -0.5));
    // Unassigned and unknown devices are dropped before reaching the core.
    assert!(!session.route_key_event(12, KeyAction::Down, PadButton::Start));
    assert!(!session.route_key_event(99, KeyAction::Down, PadButton::Start));

    sync(&session);
    assert_eq!(stats.key_events.load(Ordering::Acquire), 1);
    assert_eq!(stats.motion_events.load(Ordering::Acquire), 1);

    session.on_destroy();
}

#[test]
fn test_touch_delivered_once_surface_is_sized() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    session.on_surface_created();
    session.on_surface_changed(320, 240);
    session.send_touch(TouchPhase::Down, 160.0, 120.0);
    session.send_touch(TouchPhase::Up, 160.0, 120.0);
    sync(&session);

    assert_eq!(stats.touch_events.load(Ordering::Acquire), 2);
    session.on_destroy();
}

#[test]
fn test_disk_management_through_session() {
    let session = RetroSession::new(
        fast_setup(GameSource::Bytes(b"rom".to_vec())),
        Box::new(NullCore::new().with_disks(2)),
    );

    session.on_surface_created();
    assert_eq!(session.available_disks(), 2);
    assert_eq!(session.current_disk(), 0);

    session.change_disk(1);
    assert_eq!(session.current_disk(), 1);

    session.on_destroy();
}

#[test]
fn test_settings_and_maintenance_reach_the_core() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    session.on_surface_created();

    // Core options can be overridden and read back.
    session.update_variable(Variable::new("region", "pal"));
    let variables = session.variables();
    assert_eq!(variables.len(), 1);
    assert_eq!(variables[0].value, "pal");

    // Observable setters keep their session-side value.
    session.set_audio_enabled(false);
    assert!(!session.audio_enabled());
    session.set_rumble_enabled(false);
    assert!(!session.rumble_enabled());

    let viewport = Viewport {
        x: 0.1,
        y: 0.1,
        width: 0.8,
        height: 0.8,
    };
    session.set_viewport(viewport);
    assert_eq!(session.viewport(), viewport);

    session.set_controller_type(0, 5);
    session.reset();
    // Blocking SRAM calls fence the fire-and-forget operations above.
    assert!(session.restore_sram(vec![1, 2]));
    assert_eq!(session.serialize_sram(), vec![1, 2]);

    assert_eq!(stats.resets.load(Ordering::Acquire), 1);
    // Surface creation replayed the default viewport, then the explicit one.
    assert!(stats.viewport_updates.load(Ordering::Acquire) >= 2);

    session.on_destroy();
}

#[test]
fn test_shader_updates_suppressed_when_unchanged() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    // Matches the configuration the session started with; nothing to do.
    session.set_shader(ShaderConfig::Default);
    sync(&session);
    assert_eq!(stats.shader_updates.load(Ordering::Acquire), 0);

    session.set_shader(ShaderConfig::Crt);
    sync(&session);
    assert_eq!(stats.shader_updates.load(Ordering::Acquire), 1);
    assert_eq!(session.shader(), ShaderConfig::Crt);

    // Same configuration again is detected by parameter equality.
    session.set_shader(ShaderConfig::Crt);
    sync(&session);
    assert_eq!(stats.shader_updates.load(Ordering::Acquire), 1);

    session.on_destroy();
}

#[test]
fn test_frame_stream_replays_latest_frame() {
    let core = NullCore::new();
    let stats = core.stats();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    session.on_surface_created();
    session.on_surface_changed(640, 480);
    session.on_resume();
    assert!(wait_for(|| stats.steps.load(Ordering::Acquire) > 3));
    session.on_pause();
    sync(&session);

    let last_frame = session.frame_count();
    assert!(last_frame > 0);

    let frames = session.subscribe_frames();
    assert_eq!(frames.try_next(), Some(last_frame));

    session.on_destroy();
}

#[test]
fn test_rumble_events_reach_live_subscriber() {
    let core = NullCore::new().with_rumble_pulse();
    let session = RetroSession::new(fast_setup(GameSource::Bytes(b"rom".to_vec())), Box::new(core));

    let rumble = session.subscribe_rumble();
    session.on_surface_created();
    session.on_surface_changed(640, 480);
    session.on_resume();

    let event = rumble.next_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(event.port, 0);
    assert!(event.strength_weak > 0.0);
    assert!(event.strength_strong > 0.0);

    session.on_destroy();
}

#[test]
fn test_aspect_ratio_query_blocks_for_answer() {
    let session = RetroSession::new(
        fast_setup(GameSource::Bytes(b"rom".to_vec())),
        Box::new(NullCore::new()),
    );

    session.on_surface_created();
    let ratio = session.aspect_ratio();
    assert!((ratio - 4.0 / 3.0).abs() < f32::EPSILON);

    session.on_destroy();
    // Destroyed sessions answer with the neutral fallback.
    assert_eq!(session.aspect_ratio(), 1.0);
}
