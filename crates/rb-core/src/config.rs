//! Session configuration for retrobridge

use crate::shader::ShaderConfig;
use crate::variable::Variable;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Settings for a single emulation session.
///
/// Everything in here is plain data and survives serialization; the game
/// content itself is handed to the session separately as a [`GameSource`]
/// because it may carry open file handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Path to the libretro core library to load.
    pub core_path: PathBuf,
    /// Directory handed to the core for system files (BIOS images and so on).
    pub system_dir: PathBuf,
    /// Directory handed to the core for save data.
    pub saves_dir: PathBuf,
    /// Core options applied before the game is loaded.
    pub variables: Vec<Variable>,
    /// Initial shader selection.
    pub shader: ShaderConfig,
    /// Forward rumble requests from the core to subscribers.
    pub rumble_enabled: bool,
    /// Ask the platform audio path for its low latency mode.
    pub prefer_low_latency_audio: bool,
    /// Skip presenting frames whose content did not change.
    pub skip_duplicate_frames: bool,
    /// Expose a microphone device to the core.
    pub enable_microphone: bool,
    /// Language hint passed to the core, as an ISO 639-1 code.
    pub language: String,
    /// Display refresh rate the core should pace against, in Hz.
    pub refresh_rate: f32,
    /// Major version of the graphics context the surface provides.
    pub gl_version: u32,
}

// Default implementations

impl Default for SessionConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retrobridge");

        Self {
            core_path: PathBuf::new(),
            system_dir: base.join("system"),
            saves_dir: base.join("saves"),
            variables: Vec::new(),
            shader: ShaderConfig::default(),
            rumble_enabled: true,
            prefer_low_latency_audio: true,
            skip_duplicate_frames: false,
            enable_microphone: false,
            language: "en".to_string(),
            refresh_rate: 60.0,
            gl_version: 3,
        }
    }
}

impl SessionConfig {
    /// Load configuration from the default location, or create it with
    /// defaults if it doesn't exist yet.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit file.
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retrobridge")
            .join("config.toml")
    }
}

/// Where the game content comes from.
///
/// Not serializable on purpose: the virtual-file form owns open handles that
/// only make sense within the process that created them.
#[derive(Debug)]
pub enum GameSource {
    /// Load the game from a file on disk.
    Path(PathBuf),
    /// Load the game from a byte buffer already in memory.
    Bytes(Vec<u8>),
    /// Expose a set of host-held files to the core under virtual paths.
    VirtualFiles(Vec<VirtualFile>),
}

impl GameSource {
    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Bytes(_) => "bytes",
            Self::VirtualFiles(_) => "virtual-files",
        }
    }
}

/// A host-held file the core sees under a virtual path.
#[derive(Debug)]
pub struct VirtualFile {
    pub virtual_path: String,
    pub file: File,
}

impl VirtualFile {
    pub fn new(virtual_path: impl Into<String>, file: File) -> Self {
        Self {
            virtual_path: virtual_path.into(),
            file,
        }
    }
}
