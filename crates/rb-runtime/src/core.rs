//! The engine boundary
//!
//! [`RetroCore`] is the contract between the coordination layer and the
//! emulation engine behind it. Implementations are single-threaded state
//! machines holding all emulated-machine state; the runtime guarantees every
//! call lands on the render thread, in submission order, and never after a
//! fault.

use rb_core::config::{SessionConfig, VirtualFile};
use rb_core::error::CoreResult;
use rb_core::events::{RumbleEvent, Topic};
use rb_core::shader::ShaderParams;
use rb_core::variable::Variable;
use rb_input::pad::{KeyAction, MotionSource, PadButton};
use std::path::{Path, PathBuf};

/// Everything the core needs to come up, flattened from the session
/// configuration.
#[derive(Debug, Clone)]
pub struct CreateArgs {
    pub gl_version: u32,
    pub core_path: PathBuf,
    pub system_dir: PathBuf,
    pub saves_dir: PathBuf,
    pub variables: Vec<Variable>,
    pub shader: ShaderParams,
    pub refresh_rate: f32,
    pub prefer_low_latency_audio: bool,
    pub uses_virtual_files: bool,
    pub enable_microphone: bool,
    pub skip_duplicate_frames: bool,
    pub language: String,
}

impl CreateArgs {
    pub fn from_config(config: &SessionConfig, uses_virtual_files: bool) -> Self {
        Self {
            gl_version: config.gl_version,
            core_path: config.core_path.clone(),
            system_dir: config.system_dir.clone(),
            saves_dir: config.saves_dir.clone(),
            variables: config.variables.clone(),
            shader: config.shader.to_params(),
            refresh_rate: config.refresh_rate,
            prefer_low_latency_audio: config.prefer_low_latency_audio,
            uses_virtual_files,
            enable_microphone: config.enable_microphone,
            skip_duplicate_frames: config.skip_duplicate_frames,
            language: config.language.clone(),
        }
    }
}

/// One controller type a core offers for a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    pub id: u32,
    pub description: String,
}

/// Region of the surface the core draws into, normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        // Full surface.
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// The opaque emulation engine.
pub trait RetroCore: Send {
    /// Bring the core library up with the session settings. Called once per
    /// instance, before anything else.
    fn create(&mut self, args: &CreateArgs) -> CoreResult<()>;

    /// Load game content from a file on disk.
    fn load_game_from_path(&mut self, path: &Path) -> CoreResult<()>;
    /// Load game content from a byte buffer.
    fn load_game_from_bytes(&mut self, bytes: &[u8]) -> CoreResult<()>;
    /// Load game content through host-held file descriptors.
    fn load_game_from_virtual_files(&mut self, files: Vec<VirtualFile>) -> CoreResult<()>;

    /// (Re)establish graphics state against the current surface. Invoked on
    /// every surface creation, including context recreation.
    fn on_surface_created(&mut self) -> CoreResult<()>;
    /// New surface dimensions in pixels.
    fn on_surface_changed(&mut self, width: u32, height: u32);

    fn resume(&mut self) -> CoreResult<()>;
    fn pause(&mut self) -> CoreResult<()>;
    /// Advance emulation by one frame and present it.
    fn step(&mut self);
    /// Reset the loaded game to its power-on state.
    fn reset(&mut self) -> CoreResult<()>;
    /// Tear the core down. The last call an instance receives.
    fn destroy(&mut self);

    /// Snapshot the complete emulated-machine state.
    fn serialize_state(&mut self) -> CoreResult<Vec<u8>>;
    /// Restore a snapshot produced by [`RetroCore::serialize_state`].
    fn unserialize_state(&mut self, state: &[u8]) -> CoreResult<()>;
    /// Snapshot the cartridge save RAM.
    fn serialize_sram(&mut self) -> CoreResult<Vec<u8>>;
    /// Restore cartridge save RAM.
    fn unserialize_sram(&mut self, sram: &[u8]) -> CoreResult<()>;

    fn set_cheat(&mut self, index: u32, enabled: bool, code: &str) -> CoreResult<()>;

    fn available_disks(&self) -> u32;
    fn current_disk(&self) -> u32;
    fn change_disk(&mut self, index: u32);

    fn get_variables(&self) -> Vec<Variable>;
    fn update_variable(&mut self, variable: &Variable);

    /// Controller types offered per port.
    fn get_controllers(&self) -> Vec<Vec<Controller>>;
    fn set_controller_type(&mut self, port: u8, controller_type: u32);

    fn on_key_event(&mut self, port: u8, action: KeyAction, button: PadButton);
    fn on_motion_event(&mut self, port: u8, source: MotionSource, x: f32, y: f32);
    /// Pointer position in normalized screen space, or the off-screen sample
    /// on release.
    fn on_touch_event(&mut self, x: f32, y: f32);

    fn set_shader_config(&mut self, params: &ShaderParams);
    fn set_viewport(&mut self, viewport: Viewport);
    fn set_audio_enabled(&mut self, enabled: bool);
    fn set_frame_speed(&mut self, speed: u32);
    fn set_rumble_enabled(&mut self, enabled: bool);
    /// Hand the core the channel it publishes rumble requests on. The core
    /// invokes it from the render thread; publishing never blocks.
    fn set_rumble_sink(&mut self, sink: Topic<RumbleEvent>);

    /// Pixel aspect ratio of the loaded content.
    fn aspect_ratio(&self) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_core::shader::ShaderConfig;

    #[test]
    fn test_create_args_flatten_config() {
        let mut config = SessionConfig::default();
        config.core_path = PathBuf::from("/opt/cores/core.so");
        config.shader = ShaderConfig::Crt;
        config.language = "fr".to_string();

        let args = CreateArgs::from_config(&config, true);
        assert_eq!(args.core_path, PathBuf::from("/opt/cores/core.so"));
        assert_eq!(args.shader.program, 1);
        assert!(args.uses_virtual_files);
        assert_eq!(args.language, "fr");
        assert_eq!(args.refresh_rate, 60.0);
    }

    #[test]
    fn test_default_viewport_covers_surface() {
        let viewport = Viewport::default();
        assert_eq!(viewport.x, 0.0);
        assert_eq!(viewport.y, 0.0);
        assert_eq!(viewport.width, 1.0);
        assert_eq!(viewport.height, 1.0);
    }
}
