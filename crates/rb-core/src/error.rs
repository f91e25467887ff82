//! Error types for the retrobridge runtime

use thiserror::Error;

/// Wire code for load-library failures.
pub const ERROR_LOAD_LIBRARY: i32 = 0;
/// Wire code for load-game failures.
pub const ERROR_LOAD_GAME: i32 = 1;
/// Wire code for an incompatible graphics context.
pub const ERROR_GL_NOT_COMPATIBLE: i32 = 2;
/// Wire code for state/SRAM serialization failures.
pub const ERROR_SERIALIZATION: i32 = 3;
/// Wire code for cheat-application failures.
pub const ERROR_CHEAT: i32 = 4;
/// Wire code for unclassified core failures.
pub const ERROR_GENERIC: i32 = -1;

/// Classified failure raised by the emulation core.
///
/// Each variant carries the stable integer code the host observes on the
/// error event stream. Anything the core raises that does not fit a
/// recognized variant is normalized to [`CoreError::Generic`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("failed to load core library: {0}")]
    LoadLibrary(String),

    #[error("failed to load game: {0}")]
    LoadGame(String),

    #[error("graphics context not compatible with core: {0}")]
    IncompatibleContext(String),

    #[error("state serialization failed: {0}")]
    Serialization(String),

    #[error("cheat could not be applied: {0}")]
    Cheat(String),

    #[error("core failure: {0}")]
    Generic(String),
}

impl CoreError {
    /// Stable error code reported on the outward error stream.
    pub fn code(&self) -> i32 {
        match self {
            Self::LoadLibrary(_) => ERROR_LOAD_LIBRARY,
            Self::LoadGame(_) => ERROR_LOAD_GAME,
            Self::IncompatibleContext(_) => ERROR_GL_NOT_COMPATIBLE,
            Self::Serialization(_) => ERROR_SERIALIZATION,
            Self::Cheat(_) => ERROR_CHEAT,
            Self::Generic(_) => ERROR_GENERIC,
        }
    }
}

/// Result type alias for core-facing operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
