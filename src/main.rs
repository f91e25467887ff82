//! retrobridge - embeddable libretro frontend runtime
//!
//! Headless demonstration entry point. Drives one full session lifecycle
//! against the built-in placeholder core, the same way a platform shell
//! would drive it against a real libretro core.

use rb_core::{GameSource, SessionConfig, ShaderConfig};
use rb_input::{DeviceEnumerator, InputDevice, KeyAction, PadButton, StaticDevices, TouchPhase};
use rb_runtime::{NullCore, RetroSession, SessionSetup};
use std::thread;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting retrobridge session demo");

    let config = SessionConfig::load().unwrap_or_default();
    run_session(config)
}

/// Walk a session through the lifecycle a host application produces:
/// surface attach, input devices, resume, queries, pause, teardown.
fn run_session(config: SessionConfig) -> anyhow::Result<()> {
    let core = NullCore::new().with_rumble_pulse();
    let setup = SessionSetup::new(config, GameSource::Bytes(b"demo rom image".to_vec()));
    let session = RetroSession::new(setup, Box::new(core));

    let frames = session.subscribe_frames();
    let errors = session.subscribe_errors();
    let rumble = session.subscribe_rumble();

    // Surface comes up; the first creation also loads the game.
    session.on_surface_created();
    session.on_surface_changed(1280, 720);

    // A single gamepad in controller slot 1 lands on port 0.
    let enumerator = StaticDevices::new(vec![InputDevice::gamepad(1, "demo pad", 1)]);
    session.on_devices_changed(&enumerator.devices());
    session.route_key_event(1, KeyAction::Down, PadButton::Start);
    session.route_key_event(1, KeyAction::Up, PadButton::Start);

    session.on_resume();
    thread::sleep(Duration::from_millis(500));

    for (port, controllers) in session.controllers().iter().enumerate() {
        for controller in controllers {
            tracing::info!(
                "Port {} supports controller {} ({})",
                port,
                controller.id,
                controller.description
            );
        }
    }
    tracing::info!("Core aspect ratio: {:.3}", session.aspect_ratio());
    for variable in session.variables() {
        tracing::info!("Core variable {} = {}", variable.key, variable.value);
    }

    session.send_touch(TouchPhase::Down, 640.0, 360.0);
    session.send_touch(TouchPhase::Up, 640.0, 360.0);
    session.set_shader(ShaderConfig::Crt);

    if let Some(event) = rumble.next_timeout(Duration::from_secs(2)) {
        tracing::info!(
            "Rumble on port {}: weak {:.2} strong {:.2}",
            event.port,
            event.strength_weak,
            event.strength_strong
        );
    }

    session.on_pause();
    let snapshot = session.serialize_state();
    tracing::info!("Paused with a {} byte snapshot", snapshot.len());

    let stepped = session.frame_count();
    if stepped == 0 {
        anyhow::bail!("session never stepped a frame");
    }
    if let Some(frame) = frames.drain().pop() {
        tracing::info!("Last frame event: {}", frame);
    }
    if let Some(code) = errors.try_next() {
        anyhow::bail!("session reported error code {code}");
    }

    session.on_destroy();
    tracing::info!("Session finished after {} frames", stepped);
    Ok(())
}
