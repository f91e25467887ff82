//! Host input device description

use bitflags::bitflags;

bitflags! {
    /// Source classes a host device reports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SourceClasses: u32 {
        const KEYBOARD    = 0x0001;
        const TOUCHSCREEN = 0x0002;
        const GAMEPAD     = 0x0004;
        const JOYSTICK    = 0x0008;
    }
}

/// Snapshot of one host input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    /// Host-assigned device id, stable while the device stays connected.
    pub id: i32,
    /// Human readable name, for logs.
    pub name: String,
    /// 1-based controller number the host assigned, or 0 when the device
    /// is not enumerated as a game controller.
    pub controller_slot: u32,
    /// Source classes the device reports.
    pub sources: SourceClasses,
}

impl InputDevice {
    /// Convenience constructor for a plain gamepad.
    pub fn gamepad(id: i32, name: impl Into<String>, controller_slot: u32) -> Self {
        Self {
            id,
            name: name.into(),
            controller_slot,
            sources: SourceClasses::GAMEPAD | SourceClasses::JOYSTICK,
        }
    }

    /// Whether this device should occupy a controller port.
    pub fn is_game_controller(&self) -> bool {
        self.controller_slot >= 1
            && self
                .sources
                .intersects(SourceClasses::GAMEPAD | SourceClasses::JOYSTICK)
    }
}

/// Where the current device list comes from. Platform layers implement this
/// over their native enumeration APIs.
pub trait DeviceEnumerator: Send {
    fn devices(&self) -> Vec<InputDevice>;
}

/// Fixed device list, for tests and headless embedding.
pub struct StaticDevices {
    devices: Vec<InputDevice>,
}

impl StaticDevices {
    pub fn new(devices: Vec<InputDevice>) -> Self {
        Self { devices }
    }
}

impl DeviceEnumerator for StaticDevices {
    fn devices(&self) -> Vec<InputDevice> {
        self.devices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamepad_is_game_controller() {
        let device = InputDevice::gamepad(4, "pad", 1);
        assert!(device.is_game_controller());
    }

    #[test]
    fn test_slotless_device_is_not_a_controller() {
        let device = InputDevice::gamepad(4, "pad", 0);
        assert!(!device.is_game_controller());
    }

    #[test]
    fn test_keyboard_is_not_a_controller() {
        let device = InputDevice {
            id: 2,
            name: "keyboard".to_string(),
            controller_slot: 1,
            sources: SourceClasses::KEYBOARD,
        };
        assert!(!device.is_game_controller());
    }

    #[test]
    fn test_static_enumerator_returns_its_list() {
        let devices = StaticDevices::new(vec![InputDevice::gamepad(1, "pad", 1)]);
        assert_eq!(devices.devices().len(), 1);
    }
}
