//! Input routing for retrobridge
//!
//! Translates host input devices and their key, motion and touch events
//! into the core's controller ports and pointer space.

pub mod device;
pub mod pad;
pub mod ports;
pub mod touch;

pub use device::{DeviceEnumerator, InputDevice, SourceClasses, StaticDevices};
pub use pad::{KeyAction, MotionSource, PadButton};
pub use ports::{KeyInput, MotionInput, PortMap};
pub use touch::{normalize_touch, PointerSample, TouchPhase};
