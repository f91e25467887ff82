//! Runtime coordination for an embedded emulation core
//!
//! The core is single threaded and owns an exclusive graphics context, while
//! host lifecycle, input and UI events arrive on arbitrary threads. This
//! crate provides the machinery in between:
//!
//! - `core`: the boundary trait an emulation core implements
//! - `executor`: the render thread and its ordered job queue
//! - `guard`: fault containment and the abort-after-failure policy
//! - `lifecycle`: the session phase machine and its cross-thread flags
//! - `session`: the host-facing facade tying everything together
//! - `null_core`: a do-nothing core for tests and headless runs

pub mod core;
pub mod executor;
pub mod guard;
pub mod lifecycle;
pub mod null_core;
pub mod session;

pub use self::core::{Controller, CreateArgs, RetroCore, Viewport};
pub use executor::{EngineCell, RenderThreadExecutor, DEFAULT_FRAME_INTERVAL};
pub use guard::FaultGuard;
pub use lifecycle::{Lifecycle, LifecyclePhase};
pub use null_core::{NullCore, NullCoreStats};
pub use session::{RetroSession, SessionSetup};
