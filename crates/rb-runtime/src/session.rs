//! Session facade
//!
//! `RetroSession` is the host-facing object wrapping one core instance and
//! its render thread. Host lifecycle callbacks, input events and queries all
//! enter here; the session turns them into render-thread jobs gated by the
//! lifecycle state and the fault guard, and surfaces core activity on the
//! event hub.

use crate::core::{Controller, CreateArgs, RetroCore, Viewport};
use crate::executor::{EngineCell, RenderThreadExecutor};
use crate::guard::FaultGuard;
use crate::lifecycle::{Lifecycle, LifecyclePhase};
use parking_lot::Mutex;
use rb_core::{
    EventHub, GameSource, RumbleEvent, SessionConfig, ShaderConfig, ShaderParams, Subscription,
    Variable,
};
use rb_input::{
    normalize_touch, InputDevice, KeyAction, MotionSource, PadButton, PortMap, TouchPhase,
};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Everything needed to start a session: the configuration, the game to load
/// at first surface creation, and an optional save RAM image restored right
/// after the load.
pub struct SessionSetup {
    pub config: SessionConfig,
    pub game: GameSource,
    pub save_ram: Option<Vec<u8>>,
}

impl SessionSetup {
    pub fn new(config: SessionConfig, game: GameSource) -> Self {
        Self {
            config,
            game,
            save_ram: None,
        }
    }

    /// Restore this save RAM image once the game is loaded.
    pub fn with_save_ram(mut self, save_ram: Vec<u8>) -> Self {
        self.save_ram = Some(save_ram);
        self
    }
}

/// State reachable from render jobs, behind one `Arc`.
struct SessionShared {
    lifecycle: Lifecycle,
    guard: FaultGuard,
    hub: EventHub,
    ports: Mutex<PortMap>,
    /// Consumed exactly once, at the first surface creation
    pending_game: Mutex<Option<GameSource>>,
    /// Consumed right after the game loads
    pending_sram: Mutex<Option<Vec<u8>>>,
    /// Last reported surface dimensions, used to normalize touch input
    surface_size: Mutex<Option<(u32, u32)>>,
    viewport: Mutex<Viewport>,
    shader: Mutex<ShaderConfig>,
    /// Translated form of `shader`, for equality-based change suppression
    last_shader_params: Mutex<ShaderParams>,
    frame_counter: AtomicU64,
    frame_speed: AtomicU32,
    audio_enabled: AtomicBool,
    rumble_enabled: AtomicBool,
    config: SessionConfig,
}

/// A single embedded core with its render thread and event streams.
///
/// Methods may be called from any thread. Operations that need the core run
/// as render-thread jobs; queries block until answered, everything else is
/// fire and forget. After a fault or destroy, operations degrade to no-ops
/// and queries return defaults.
pub struct RetroSession {
    executor: RenderThreadExecutor,
    shared: Arc<SessionShared>,
    /// Interval at frame speed 1, derived from the configured refresh rate
    base_frame_interval: Duration,
}

impl RetroSession {
    /// Construct the core and spawn its render thread.
    ///
    /// The game itself is not loaded here; loading happens exactly once, at
    /// the first [`on_surface_created`](Self::on_surface_created).
    pub fn new(setup: SessionSetup, core: Box<dyn RetroCore>) -> Self {
        let SessionSetup {
            config,
            game,
            save_ram,
        } = setup;

        let refresh_rate = if config.refresh_rate > 0.0 {
            config.refresh_rate
        } else {
            60.0
        };
        let base_frame_interval = Duration::from_secs_f64(1.0 / refresh_rate as f64);

        let lifecycle = Lifecycle::new();
        let hub = EventHub::new();
        let guard = FaultGuard::new(lifecycle.abort_flag(), lifecycle.ready_flag(), hub.errors());
        let args = CreateArgs::from_config(&config, matches!(game, GameSource::VirtualFiles(_)));

        let shared = Arc::new(SessionShared {
            lifecycle,
            guard,
            hub,
            ports: Mutex::new(PortMap::new()),
            pending_game: Mutex::new(Some(game)),
            pending_sram: Mutex::new(save_ram),
            surface_size: Mutex::new(None),
            viewport: Mutex::new(Viewport::default()),
            shader: Mutex::new(config.shader.clone()),
            last_shader_params: Mutex::new(config.shader.to_params()),
            frame_counter: AtomicU64::new(0),
            frame_speed: AtomicU32::new(1),
            audio_enabled: AtomicBool::new(true),
            rumble_enabled: AtomicBool::new(config.rumble_enabled),
            config,
        });

        let executor = RenderThreadExecutor::new(core, base_frame_interval);

        // Construct the core before anything else can reach it. The rumble
        // sink goes in first so events raised during creation are not lost.
        let init = Arc::clone(&shared);
        executor.post(move |cell| {
            cell.with_core(|core| core.set_rumble_sink(init.hub.rumble()));
            init.guard
                .protect(|| cell.with_core(|core| core.create(&args)));
            let rumble = init.rumble_enabled.load(Ordering::Acquire);
            init.guard.protect(|| {
                cell.with_core(|core| core.set_rumble_enabled(rumble));
                Ok(())
            });
        });

        // Per-frame step, gated on the ready flag and the guard.
        let tick = Arc::clone(&shared);
        executor.set_frame_tick(move |cell| {
            if !tick.lifecycle.is_ready() {
                return false;
            }
            let stepped = tick.guard.run(false, || {
                cell.with_core(|core| core.step());
                Ok(true)
            });
            if stepped {
                let frame = tick.frame_counter.fetch_add(1, Ordering::AcqRel) + 1;
                tick.hub.frames().publish(frame);
            }
            stepped
        });

        Self {
            executor,
            shared,
            base_frame_interval,
        }
    }

    // ---- Lifecycle callbacks ----

    /// Render surface attached. The first invocation loads the game and
    /// restores pending save RAM; later invocations only replay surface
    /// state (viewport) into the recreated context.
    pub fn on_surface_created(&self) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            if shared.lifecycle.is_aborted() || shared.lifecycle.is_destroyed() {
                return;
            }
            shared
                .guard
                .protect(|| cell.with_core(|core| core.on_surface_created()));

            // Viewport state must survive context recreation.
            let viewport = *shared.viewport.lock();
            shared.guard.protect(|| {
                cell.with_core(|core| core.set_viewport(viewport));
                Ok(())
            });

            let pending = shared.pending_game.lock().take();
            if let Some(game) = pending {
                load_game(&shared, cell, game);
            }

            // Published last so a fault in the work above suppresses the
            // announcement.
            if !shared.lifecycle.is_aborted() {
                shared.hub.surfaces().publish(());
            }
        });
    }

    /// Surface dimensions changed (also delivered once after creation).
    pub fn on_surface_changed(&self, width: u32, height: u32) {
        *self.shared.surface_size.lock() = Some((width, height));
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.on_surface_changed(width, height));
                Ok(())
            });
        });
    }

    /// Host wants emulation running. Recorded immediately; stepping begins
    /// once the game is loaded, on the next frame boundary.
    pub fn on_resume(&self) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            if shared.lifecycle.is_aborted() || shared.lifecycle.is_destroyed() {
                return;
            }
            shared.lifecycle.set_want_resumed(true);
            if shared.lifecycle.is_game_loaded() && !shared.lifecycle.is_ready() {
                resume_now(&shared, cell);
            }
        });
    }

    /// Host wants emulation suspended. Effective at the next frame boundary;
    /// a frame already being stepped completes normally.
    pub fn on_pause(&self) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            if shared.lifecycle.is_aborted() || shared.lifecycle.is_destroyed() {
                return;
            }
            shared.lifecycle.set_want_resumed(false);
            if shared.lifecycle.is_ready() {
                shared.lifecycle.set_ready(false);
                shared.guard.protect(|| cell.with_core(|core| core.pause()));
                shared.lifecycle.set_phase(LifecyclePhase::Paused);
            }
        });
    }

    /// Tear the session down: release the core and join the render thread.
    /// Terminal and idempotent; afterwards every operation is a no-op and
    /// every query returns its default.
    pub fn on_destroy(&self) {
        if !self.shared.lifecycle.begin_destroy() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let _ = self.executor.call(move |cell| {
            shared.lifecycle.set_ready(false);
            shared.guard.protect(|| {
                cell.with_core(|core| core.destroy());
                Ok(())
            });
        });
        self.executor.shutdown();
        self.shared.lifecycle.set_phase(LifecyclePhase::Destroyed);
    }

    // ---- Event streams ----

    /// Frame-counter stream. Replays the latest frame number on subscribe.
    pub fn subscribe_frames(&self) -> Subscription<u64> {
        self.shared.hub.frames().subscribe()
    }

    /// Surface-created notifications, replayed to late subscribers.
    pub fn subscribe_surfaces(&self) -> Subscription<()> {
        self.shared.hub.surfaces().subscribe()
    }

    /// Error codes. At most one is ever published per session.
    pub fn subscribe_errors(&self) -> Subscription<i32> {
        self.shared.hub.errors().subscribe()
    }

    /// Rumble events. Transient; events with no subscriber are dropped.
    pub fn subscribe_rumble(&self) -> Subscription<RumbleEvent> {
        self.shared.hub.rumble().subscribe()
    }

    // ---- Input ----

    /// Send a key event directly to a port, bypassing device routing.
    pub fn send_key(&self, port: u8, action: KeyAction, button: PadButton) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.on_key_event(port, action, button));
                Ok(())
            });
        });
    }

    /// Send an analog motion sample directly to a port.
    pub fn send_motion(&self, port: u8, source: MotionSource, x: f32, y: f32) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.on_motion_event(port, source, x, y));
                Ok(())
            });
        });
    }

    /// Route a key event from a host device through the port map, swapping
    /// face buttons into the core layout. Returns false when the device
    /// holds no port and the event was dropped.
    pub fn route_key_event(&self, device_id: i32, action: KeyAction, button: PadButton) -> bool {
        let routed = self.shared.ports.lock().route_key(device_id, action, button);
        match routed {
            Some(input) => {
                self.send_key(input.port, input.action, input.button);
                true
            }
            None => false,
        }
    }

    /// Route a joystick motion sample from a host device.
    pub fn route_motion_event(&self, device_id: i32, source: MotionSource, x: f32, y: f32) -> bool {
        let routed = self.shared.ports.lock().route_motion(device_id, source, x, y);
        match routed {
            Some(input) => {
                self.send_motion(input.port, input.source, input.x, input.y);
                true
            }
            None => false,
        }
    }

    /// Host input devices changed; rebuild the port assignment.
    pub fn on_devices_changed(&self, devices: &[InputDevice]) {
        self.shared.ports.lock().rebuild(devices);
    }

    /// Port currently assigned to a host device, if any.
    pub fn port_for_device(&self, device_id: i32) -> Option<u8> {
        self.shared.ports.lock().port_for(device_id)
    }

    /// Forward a touch sample, normalized against the current surface size.
    /// Dropped when no surface size has been reported yet.
    pub fn send_touch(&self, phase: TouchPhase, x: f32, y: f32) {
        let Some((width, height)) = *self.shared.surface_size.lock() else {
            return;
        };
        let sample = normalize_touch(phase, x, y, width as f32, height as f32);
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.on_touch_event(sample.x, sample.y));
                Ok(())
            });
        });
    }

    // ---- Queries and state ----

    /// Current core option variables. Empty once aborted or destroyed.
    pub fn variables(&self) -> Vec<Variable> {
        let shared = Arc::clone(&self.shared);
        self.executor
            .call(move |cell| {
                shared
                    .guard
                    .run(Vec::new(), || Ok(cell.with_core(|core| core.get_variables())))
            })
            .unwrap_or_default()
    }

    /// Override one core option.
    pub fn update_variable(&self, variable: Variable) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.update_variable(&variable));
                Ok(())
            });
        });
    }

    /// Controller descriptors the core supports, per port.
    pub fn controllers(&self) -> Vec<Vec<Controller>> {
        let shared = Arc::clone(&self.shared);
        self.executor
            .call(move |cell| {
                shared
                    .guard
                    .run(Vec::new(), || Ok(cell.with_core(|core| core.get_controllers())))
            })
            .unwrap_or_default()
    }

    /// Select a controller type for a port.
    pub fn set_controller_type(&self, port: u8, controller_type: u32) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.set_controller_type(port, controller_type));
                Ok(())
            });
        });
    }

    /// Snapshot the emulated machine state. Empty when unavailable.
    pub fn serialize_state(&self) -> Vec<u8> {
        let shared = Arc::clone(&self.shared);
        self.executor
            .call(move |cell| {
                shared
                    .guard
                    .run(Vec::new(), || cell.with_core(|core| core.serialize_state()))
            })
            .unwrap_or_default()
    }

    /// Restore a snapshot from [`serialize_state`](Self::serialize_state).
    pub fn restore_state(&self, state: Vec<u8>) -> bool {
        let shared = Arc::clone(&self.shared);
        self.executor
            .call(move |cell| {
                shared.guard.run(false, || {
                    cell.with_core(|core| core.unserialize_state(&state))?;
                    Ok(true)
                })
            })
            .unwrap_or(false)
    }

    /// Snapshot the cartridge save RAM.
    pub fn serialize_sram(&self) -> Vec<u8> {
        let shared = Arc::clone(&self.shared);
        self.executor
            .call(move |cell| {
                shared
                    .guard
                    .run(Vec::new(), || cell.with_core(|core| core.serialize_sram()))
            })
            .unwrap_or_default()
    }

    /// Overwrite the cartridge save RAM.
    pub fn restore_sram(&self, sram: Vec<u8>) -> bool {
        let shared = Arc::clone(&self.shared);
        self.executor
            .call(move |cell| {
                shared.guard.run(false, || {
                    cell.with_core(|core| core.unserialize_sram(&sram))?;
                    Ok(true)
                })
            })
            .unwrap_or(false)
    }

    /// Number of disks in the loaded game's disk set, 0 when not disk based.
    pub fn available_disks(&self) -> u32 {
        let shared = Arc::clone(&self.shared);
        self.executor
            .call(move |cell| {
                shared
                    .guard
                    .run(0, || Ok(cell.with_core(|core| core.available_disks())))
            })
            .unwrap_or(0)
    }

    /// Index of the currently inserted disk.
    pub fn current_disk(&self) -> u32 {
        let shared = Arc::clone(&self.shared);
        self.executor
            .call(move |cell| {
                shared
                    .guard
                    .run(0, || Ok(cell.with_core(|core| core.current_disk())))
            })
            .unwrap_or(0)
    }

    /// Insert another disk from the set.
    pub fn change_disk(&self, index: u32) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.change_disk(index));
                Ok(())
            });
        });
    }

    /// Enable or disable a cheat code.
    pub fn set_cheat(&self, index: u32, enabled: bool, code: String) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared
                .guard
                .protect(|| cell.with_core(|core| core.set_cheat(index, enabled, &code)));
        });
    }

    /// Hard-reset the emulated machine.
    pub fn reset(&self) {
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared
                .guard
                .protect(|| cell.with_core(|core| core.reset()));
        });
    }

    // ---- Settings ----

    /// Replace the shader configuration. Configurations translating to the
    /// parameters already applied are skipped without touching the core.
    pub fn set_shader(&self, config: ShaderConfig) {
        let params = config.to_params();
        {
            let mut last = self.shared.last_shader_params.lock();
            if *last == params {
                return;
            }
            *last = params.clone();
        }
        *self.shared.shader.lock() = config;

        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.set_shader_config(&params));
                Ok(())
            });
        });
    }

    pub fn shader(&self) -> ShaderConfig {
        self.shared.shader.lock().clone()
    }

    /// Normalized sub-rectangle of the surface the video draws into. Kept
    /// and reapplied whenever the surface is recreated.
    pub fn set_viewport(&self, viewport: Viewport) {
        *self.shared.viewport.lock() = viewport;
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.set_viewport(viewport));
                Ok(())
            });
        });
    }

    pub fn viewport(&self) -> Viewport {
        *self.shared.viewport.lock()
    }

    pub fn set_audio_enabled(&self, enabled: bool) {
        self.shared.audio_enabled.store(enabled, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.set_audio_enabled(enabled));
                Ok(())
            });
        });
    }

    pub fn audio_enabled(&self) -> bool {
        self.shared.audio_enabled.load(Ordering::Acquire)
    }

    /// Fast-forward factor. 1 is real time; 0 is clamped to 1.
    pub fn set_frame_speed(&self, speed: u32) {
        if speed == 0 {
            tracing::warn!("Frame speed 0 requested, clamping to 1");
        }
        let speed = speed.max(1);
        self.shared.frame_speed.store(speed, Ordering::Release);
        self.executor
            .set_frame_interval(self.base_frame_interval / speed);

        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.set_frame_speed(speed));
                Ok(())
            });
        });
    }

    pub fn frame_speed(&self) -> u32 {
        self.shared.frame_speed.load(Ordering::Acquire)
    }

    pub fn set_rumble_enabled(&self, enabled: bool) {
        self.shared.rumble_enabled.store(enabled, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        self.executor.post(move |cell| {
            shared.guard.protect(|| {
                cell.with_core(|core| core.set_rumble_enabled(enabled));
                Ok(())
            });
        });
    }

    pub fn rumble_enabled(&self) -> bool {
        self.shared.rumble_enabled.load(Ordering::Acquire)
    }

    /// Width over height reported by the loaded game, 1.0 when unknown.
    pub fn aspect_ratio(&self) -> f32 {
        let shared = Arc::clone(&self.shared);
        self.executor
            .call(move |cell| {
                shared
                    .guard
                    .run(1.0, || Ok(cell.with_core(|core| core.aspect_ratio())))
            })
            .unwrap_or(1.0)
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.shared.lifecycle.phase()
    }

    /// Frames stepped so far.
    pub fn frame_count(&self) -> u64 {
        self.shared.frame_counter.load(Ordering::Acquire)
    }

    /// Configuration this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }
}

impl Drop for RetroSession {
    fn drop(&mut self) {
        self.on_destroy();
    }
}

/// Runs on the render thread with the consumed pending source. Loading is
/// one-shot: the source was taken out of the session before this call.
fn load_game(shared: &Arc<SessionShared>, cell: &EngineCell, game: GameSource) {
    shared.lifecycle.set_phase(LifecyclePhase::SurfaceReady);
    let loaded = shared.guard.run(false, || {
        cell.with_core(|core| match game {
            GameSource::Path(path) => core.load_game_from_path(&path),
            GameSource::Bytes(bytes) => core.load_game_from_bytes(&bytes),
            GameSource::VirtualFiles(files) => core.load_game_from_virtual_files(files),
        })?;
        Ok(true)
    });
    if !loaded {
        return;
    }

    if let Some(sram) = shared.pending_sram.lock().take() {
        shared
            .guard
            .protect(|| cell.with_core(|core| core.unserialize_sram(&sram)));
        if shared.lifecycle.is_aborted() {
            return;
        }
    }

    shared.lifecycle.mark_game_loaded();
    shared.lifecycle.set_phase(LifecyclePhase::GameLoaded);

    // A resume that arrived before the game was ready takes effect now.
    if shared.lifecycle.wants_resume() {
        resume_now(shared, cell);
    }
}

fn resume_now(shared: &Arc<SessionShared>, cell: &EngineCell) {
    shared
        .guard
        .protect(|| cell.with_core(|core| core.resume()));
    if shared.lifecycle.is_aborted() {
        return;
    }
    shared.lifecycle.set_ready(true);
    shared.lifecycle.set_phase(LifecyclePhase::Resumed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_core::NullCore;

    fn test_setup() -> SessionSetup {
        SessionSetup::new(SessionConfig::default(), GameSource::Bytes(b"rom".to_vec()))
    }

    #[test]
    fn test_session_starts_in_created_phase() {
        let session = RetroSession::new(test_setup(), Box::new(NullCore::new()));
        assert_eq!(session.phase(), LifecyclePhase::Created);

        session.on_destroy();
        assert_eq!(session.phase(), LifecyclePhase::Destroyed);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let core = NullCore::new();
        let stats = core.stats();
        let session = RetroSession::new(test_setup(), Box::new(core));

        session.on_destroy();
        session.on_destroy();
        assert_eq!(stats.destroys.load(Ordering::Acquire), 1);
    }

    #[test]
    fn test_queries_after_destroy_return_defaults() {
        let session = RetroSession::new(test_setup(), Box::new(NullCore::new()));
        session.on_destroy();

        assert!(session.serialize_state().is_empty());
        assert!(session.variables().is_empty());
        assert_eq!(session.aspect_ratio(), 1.0);
        assert_eq!(session.available_disks(), 0);
        assert!(!session.restore_state(vec![1, 2, 3]));
    }

    #[test]
    fn test_frame_speed_is_clamped() {
        let session = RetroSession::new(test_setup(), Box::new(NullCore::new()));

        session.set_frame_speed(0);
        assert_eq!(session.frame_speed(), 1);

        session.set_frame_speed(4);
        assert_eq!(session.frame_speed(), 4);

        session.on_destroy();
    }

    #[test]
    fn test_touch_without_surface_is_dropped() {
        let core = NullCore::new();
        let stats = core.stats();
        let session = RetroSession::new(test_setup(), Box::new(core));

        session.send_touch(TouchPhase::Down, 10.0, 10.0);
        session.on_destroy();
        assert_eq!(stats.touch_events.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_save_ram_builder() {
        let setup = test_setup().with_save_ram(vec![9, 9]);
        assert_eq!(setup.save_ram, Some(vec![9, 9]));
    }
}
