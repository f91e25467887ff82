//! Pad button and motion vocabulary

/// Buttons of the virtual pad the core understands.
///
/// Only buttons in this set are ever forwarded; anything else a host device
/// reports is ignored before it reaches the routing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadButton {
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    A,
    B,
    X,
    Y,
    L1,
    L2,
    R1,
    R2,
    ThumbLeft,
    ThumbRight,
    Select,
    Start,
}

impl PadButton {
    /// Host gamepad layouts label the face buttons opposite to the core's
    /// pad, so A/B and X/Y swap on the way in.
    pub fn remap_for_core(self) -> PadButton {
        match self {
            PadButton::B => PadButton::A,
            PadButton::A => PadButton::B,
            PadButton::X => PadButton::Y,
            PadButton::Y => PadButton::X,
            other => other,
        }
    }
}

/// Key transition direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

/// Motion source ids the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionSource {
    /// Digital pad expressed as an axis pair.
    Dpad = 0,
    /// Left analog stick.
    AnalogLeft = 1,
    /// Right analog stick.
    AnalogRight = 2,
    /// Touch pointer in normalized screen space.
    Pointer = 3,
}

impl MotionSource {
    /// Numeric id used at the core boundary.
    pub fn id(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_buttons_swap() {
        assert_eq!(PadButton::A.remap_for_core(), PadButton::B);
        assert_eq!(PadButton::B.remap_for_core(), PadButton::A);
        assert_eq!(PadButton::X.remap_for_core(), PadButton::Y);
        assert_eq!(PadButton::Y.remap_for_core(), PadButton::X);
    }

    #[test]
    fn test_other_buttons_pass_through() {
        assert_eq!(PadButton::DpadUp.remap_for_core(), PadButton::DpadUp);
        assert_eq!(PadButton::L2.remap_for_core(), PadButton::L2);
        assert_eq!(PadButton::Start.remap_for_core(), PadButton::Start);
    }

    #[test]
    fn test_motion_source_ids() {
        assert_eq!(MotionSource::Dpad.id(), 0);
        assert_eq!(MotionSource::AnalogLeft.id(), 1);
        assert_eq!(MotionSource::AnalogRight.id(), 2);
        assert_eq!(MotionSource::Pointer.id(), 3);
    }
}
