//! Core types for retrobridge
//!
//! This crate provides the shared vocabulary of the frontend bridge: the
//! error taxonomy, session configuration, core option variables, shader
//! parameter translation, and the event streams observers subscribe to.

pub mod config;
pub mod error;
pub mod events;
pub mod shader;
pub mod variable;

pub use config::{GameSource, SessionConfig, VirtualFile};
pub use error::{CoreError, CoreResult};
pub use events::{EventHub, RumbleEvent, Subscription, Topic};
pub use shader::{Cut2Config, Cut3Config, CutConfig, ShaderConfig, ShaderParams};
pub use variable::Variable;
