//! Null core for testing and headless runs

use crate::core::{Controller, CreateArgs, RetroCore, Viewport};
use rb_core::{CoreError, CoreResult, RumbleEvent, ShaderParams, Topic, Variable, VirtualFile};
use rb_input::{KeyAction, MotionSource, PadButton};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot header so malformed restores are rejected.
const STATE_MAGIC: &[u8; 4] = b"RBNC";
/// Magic + frame counter + current disk.
const STATE_LEN: usize = 16;

/// Counters recording what the null core has been asked to do.
///
/// Shared out through [`NullCore::stats`] before the core moves onto the
/// render thread, so tests and the headless demo can observe it from outside.
#[derive(Debug, Default)]
pub struct NullCoreStats {
    pub creates: AtomicU64,
    pub surface_creates: AtomicU64,
    pub loads: AtomicU64,
    pub resumes: AtomicU64,
    pub pauses: AtomicU64,
    pub steps: AtomicU64,
    pub resets: AtomicU64,
    pub destroys: AtomicU64,
    pub key_events: AtomicU64,
    pub motion_events: AtomicU64,
    pub touch_events: AtomicU64,
    pub shader_updates: AtomicU64,
    pub viewport_updates: AtomicU64,
}

/// Core that emulates nothing.
///
/// When no real emulation core is wired up, this stand-in keeps just enough
/// state for the coordination layer to be exercised end to end: a frame
/// counter, loaded/running flags, option variables and a serializable
/// snapshot. Snapshots restore byte-identically, so the state round-trip
/// contract can be verified against it.
pub struct NullCore {
    stats: Arc<NullCoreStats>,
    frames: u64,
    game_loaded: bool,
    running: bool,
    variables: Vec<Variable>,
    sram: Vec<u8>,
    disk_count: u32,
    current_disk: u32,
    rumble_sink: Option<Topic<RumbleEvent>>,
    rumble_enabled: bool,
    /// Emit a rumble pulse every 60th frame when enabled
    rumble_pulse: bool,
    viewport: Viewport,
    surface: Option<(u32, u32)>,
    frame_speed: u32,
    audio_enabled: bool,
}

impl NullCore {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(NullCoreStats::default()),
            frames: 0,
            game_loaded: false,
            running: false,
            variables: Vec::new(),
            sram: Vec::new(),
            disk_count: 0,
            current_disk: 0,
            rumble_sink: None,
            rumble_enabled: true,
            rumble_pulse: false,
            viewport: Viewport::default(),
            surface: None,
            frame_speed: 1,
            audio_enabled: true,
        }
    }

    /// Pretend to be a disk system with the given number of disks.
    pub fn with_disks(mut self, count: u32) -> Self {
        self.disk_count = count;
        self
    }

    /// Emit a rumble event every 60th frame while stepping.
    pub fn with_rumble_pulse(mut self) -> Self {
        self.rumble_pulse = true;
        self
    }

    /// Handle to the call counters, valid after the core moves away.
    pub fn stats(&self) -> Arc<NullCoreStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for NullCore {
    fn default() -> Self {
        Self::new()
    }
}

impl RetroCore for NullCore {
    fn create(&mut self, args: &CreateArgs) -> CoreResult<()> {
        self.stats.creates.fetch_add(1, Ordering::AcqRel);
        self.variables = args.variables.clone();
        self.frame_speed = 1;
        Ok(())
    }

    fn load_game_from_path(&mut self, path: &Path) -> CoreResult<()> {
        if path.as_os_str().is_empty() {
            return Err(CoreError::LoadGame("empty game path".into()));
        }
        self.stats.loads.fetch_add(1, Ordering::AcqRel);
        self.game_loaded = true;
        Ok(())
    }

    fn load_game_from_bytes(&mut self, bytes: &[u8]) -> CoreResult<()> {
        if bytes.is_empty() {
            return Err(CoreError::LoadGame("empty game image".into()));
        }
        self.stats.loads.fetch_add(1, Ordering::AcqRel);
        self.game_loaded = true;
        Ok(())
    }

    fn load_game_from_virtual_files(&mut self, files: Vec<VirtualFile>) -> CoreResult<()> {
        if files.is_empty() {
            return Err(CoreError::LoadGame("no virtual files".into()));
        }
        self.stats.loads.fetch_add(1, Ordering::AcqRel);
        self.game_loaded = true;
        Ok(())
    }

    fn on_surface_created(&mut self) -> CoreResult<()> {
        self.stats.surface_creates.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.surface = Some((width, height));
    }

    fn resume(&mut self) -> CoreResult<()> {
        self.stats.resumes.fetch_add(1, Ordering::AcqRel);
        self.running = true;
        Ok(())
    }

    fn pause(&mut self) -> CoreResult<()> {
        self.stats.pauses.fetch_add(1, Ordering::AcqRel);
        self.running = false;
        Ok(())
    }

    fn step(&mut self) {
        self.stats.steps.fetch_add(1, Ordering::AcqRel);
        self.frames += 1;
        if self.rumble_pulse && self.rumble_enabled && self.frames % 60 == 0 {
            if let Some(sink) = &self.rumble_sink {
                sink.publish(RumbleEvent {
                    port: 0,
                    strength_weak: 0.25,
                    strength_strong: 0.75,
                });
            }
        }
    }

    fn reset(&mut self) -> CoreResult<()> {
        self.stats.resets.fetch_add(1, Ordering::AcqRel);
        self.frames = 0;
        Ok(())
    }

    fn destroy(&mut self) {
        self.stats.destroys.fetch_add(1, Ordering::AcqRel);
        self.running = false;
        self.game_loaded = false;
    }

    fn serialize_state(&mut self) -> CoreResult<Vec<u8>> {
        if !self.game_loaded {
            return Err(CoreError::Serialization("no game loaded".into()));
        }
        let mut state = Vec::with_capacity(STATE_LEN);
        state.extend_from_slice(STATE_MAGIC);
        state.extend_from_slice(&self.frames.to_le_bytes());
        state.extend_from_slice(&self.current_disk.to_le_bytes());
        Ok(state)
    }

    fn unserialize_state(&mut self, state: &[u8]) -> CoreResult<()> {
        if !self.game_loaded {
            return Err(CoreError::Serialization("no game loaded".into()));
        }
        if state.len() != STATE_LEN || state[..4] != *STATE_MAGIC {
            return Err(CoreError::Serialization("unrecognized snapshot".into()));
        }
        let mut frames = [0u8; 8];
        frames.copy_from_slice(&state[4..12]);
        self.frames = u64::from_le_bytes(frames);
        let mut disk = [0u8; 4];
        disk.copy_from_slice(&state[12..16]);
        self.current_disk = u32::from_le_bytes(disk);
        Ok(())
    }

    fn serialize_sram(&mut self) -> CoreResult<Vec<u8>> {
        Ok(self.sram.clone())
    }

    fn unserialize_sram(&mut self, sram: &[u8]) -> CoreResult<()> {
        self.sram = sram.to_vec();
        Ok(())
    }

    fn set_cheat(&mut self, index: u32, enabled: bool, code: &str) -> CoreResult<()> {
        if code.is_empty() {
            return Err(CoreError::Cheat(format!("cheat {} has no code", index)));
        }
        tracing::debug!("Cheat {} {}", index, if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    fn available_disks(&self) -> u32 {
        self.disk_count
    }

    fn current_disk(&self) -> u32 {
        self.current_disk
    }

    fn change_disk(&mut self, index: u32) {
        if index < self.disk_count {
            self.current_disk = index;
        } else {
            tracing::warn!("Ignoring disk change to {} of {}", index, self.disk_count);
        }
    }

    fn get_variables(&self) -> Vec<Variable> {
        self.variables.clone()
    }

    fn update_variable(&mut self, variable: &Variable) {
        match self.variables.iter_mut().find(|v| v.key == variable.key) {
            Some(existing) => existing.value = variable.value.clone(),
            None => self.variables.push(variable.clone()),
        }
    }

    fn get_controllers(&self) -> Vec<Vec<Controller>> {
        let descriptors = vec![
            Controller {
                id: 1,
                description: "RetroPad".to_string(),
            },
            Controller {
                id: 5,
                description: "RetroPad with analog sticks".to_string(),
            },
        ];
        vec![descriptors.clone(), descriptors]
    }

    fn set_controller_type(&mut self, port: u8, controller_type: u32) {
        tracing::debug!("Controller type {} on port {}", controller_type, port);
    }

    fn on_key_event(&mut self, _port: u8, _action: KeyAction, _button: PadButton) {
        self.stats.key_events.fetch_add(1, Ordering::AcqRel);
    }

    fn on_motion_event(&mut self, _port: u8, _source: MotionSource, _x: f32, _y: f32) {
        self.stats.motion_events.fetch_add(1, Ordering::AcqRel);
    }

    fn on_touch_event(&mut self, _x: f32, _y: f32) {
        self.stats.touch_events.fetch_add(1, Ordering::AcqRel);
    }

    fn set_shader_config(&mut self, _params: &ShaderParams) {
        self.stats.shader_updates.fetch_add(1, Ordering::AcqRel);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.stats.viewport_updates.fetch_add(1, Ordering::AcqRel);
        self.viewport = viewport;
    }

    fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
    }

    fn set_frame_speed(&mut self, speed: u32) {
        self.frame_speed = speed;
    }

    fn set_rumble_enabled(&mut self, enabled: bool) {
        self.rumble_enabled = enabled;
    }

    fn set_rumble_sink(&mut self, sink: Topic<RumbleEvent>) {
        self.rumble_sink = Some(sink);
    }

    fn aspect_ratio(&self) -> f32 {
        4.0 / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_core() -> NullCore {
        let mut core = NullCore::new();
        core.load_game_from_bytes(b"rom").unwrap();
        core
    }

    #[test]
    fn test_state_round_trip_is_byte_identical() {
        let mut core = loaded_core();
        for _ in 0..42 {
            core.step();
        }

        let snapshot = core.serialize_state().unwrap();
        for _ in 0..10 {
            core.step();
        }

        core.unserialize_state(&snapshot).unwrap();
        assert_eq!(core.serialize_state().unwrap(), snapshot);
    }

    #[test]
    fn test_malformed_snapshot_is_rejected() {
        let mut core = loaded_core();

        assert!(core.unserialize_state(b"garbage").is_err());
        let mut wrong_magic = core.serialize_state().unwrap();
        wrong_magic[0] = b'X';
        assert!(core.unserialize_state(&wrong_magic).is_err());
    }

    #[test]
    fn test_serialize_requires_loaded_game() {
        let mut core = NullCore::new();
        assert!(matches!(
            core.serialize_state(),
            Err(CoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_empty_game_image_fails_load() {
        let mut core = NullCore::new();
        assert!(matches!(
            core.load_game_from_bytes(&[]),
            Err(CoreError::LoadGame(_))
        ));
        assert_eq!(core.stats().loads.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_rumble_pulse_reaches_sink() {
        let mut core = loaded_core().with_rumble_pulse();
        let sink = Topic::transient();
        let subscription = sink.subscribe();
        core.set_rumble_sink(sink);

        for _ in 0..60 {
            core.step();
        }

        let event = subscription.try_next().unwrap();
        assert_eq!(event.port, 0);
        assert!(event.strength_strong > event.strength_weak);
    }

    #[test]
    fn test_variable_updates_merge() {
        let mut core = NullCore::new();
        core.update_variable(&Variable::new("scanlines", "off"));
        core.update_variable(&Variable::new("scanlines", "on"));
        core.update_variable(&Variable::new("region", "pal"));

        let variables = core.get_variables();
        assert_eq!(variables.len(), 2);
        assert_eq!(rb_core::variable::find(&variables, "scanlines").unwrap().value, "on");
    }

    #[test]
    fn test_disk_changes_stay_in_range() {
        let mut core = NullCore::new().with_disks(2);
        assert_eq!(core.available_disks(), 2);

        core.change_disk(1);
        assert_eq!(core.current_disk(), 1);

        core.change_disk(5);
        assert_eq!(core.current_disk(), 1);
    }
}
