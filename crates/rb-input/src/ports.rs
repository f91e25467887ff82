//! Controller port assignment
//!
//! Maps host input devices onto the core's controller ports. The host
//! assigns each physical controller a 1-based number; the core counts ports
//! from 0, so controller N plays on port N - 1. Devices without a controller
//! number never reach the core.

use crate::device::InputDevice;
use crate::pad::{KeyAction, MotionSource, PadButton};
use std::collections::HashMap;

/// A key event routed to a core port, face buttons already remapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub action: KeyAction,
    pub button: PadButton,
    pub port: u8,
}

/// A motion sample routed to a core port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionInput {
    pub source: MotionSource,
    pub x: f32,
    pub y: f32,
    pub port: u8,
}

/// Host-device to core-port assignment.
#[derive(Debug, Default)]
pub struct PortMap {
    ports: HashMap<i32, u8>,
}

impl PortMap {
    pub fn new() -> Self {
        Self {
            ports: HashMap::new(),
        }
    }

    /// Rebuild the assignment from the current device list. Called whenever
    /// the host reports a device added, removed or changed. When several
    /// devices claim the same controller number, the first one listed keeps
    /// the port and the rest stay unassigned.
    pub fn rebuild(&mut self, devices: &[InputDevice]) {
        self.ports.clear();
        for device in devices {
            if !device.is_game_controller() {
                continue;
            }
            let port = (device.controller_slot - 1).min(u8::MAX as u32) as u8;
            if self.ports.values().any(|taken| *taken == port) {
                tracing::warn!(
                    "Device {} ({}) claims controller {} but port {} is taken, leaving it unassigned",
                    device.id,
                    device.name,
                    device.controller_slot,
                    port
                );
                continue;
            }
            self.ports.insert(device.id, port);
        }
        tracing::debug!("port map rebuilt, {} controller(s) assigned", self.ports.len());
    }

    /// Core port for a host device, if it holds one.
    pub fn port_for(&self, device_id: i32) -> Option<u8> {
        self.ports.get(&device_id).copied()
    }

    /// Number of devices currently holding a port.
    pub fn assigned_count(&self) -> usize {
        self.ports.len()
    }

    /// Route a key event. Returns `None` when the device holds no port, in
    /// which case the event is dropped.
    pub fn route_key(
        &self,
        device_id: i32,
        action: KeyAction,
        button: PadButton,
    ) -> Option<KeyInput> {
        let port = self.port_for(device_id)?;
        Some(KeyInput {
            action,
            button: button.remap_for_core(),
            port,
        })
    }

    /// Route a joystick motion sample.
    pub fn route_motion(
        &self,
        device_id: i32,
        source: MotionSource,
        x: f32,
        y: f32,
    ) -> Option<MotionInput> {
        let port = self.port_for(device_id)?;
        Some(MotionInput { source, x, y, port })
    }
}
