//! Touch to pointer translation

/// Phase of a touch gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Moved,
    Up,
}

/// Pointer coordinates in the core's normalized screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
}

impl PointerSample {
    /// The sample that tells the core no finger touches the screen.
    pub const LIFTED: PointerSample = PointerSample { x: -1.0, y: -1.0 };
}

/// Translate a host touch sample into the core's pointer space.
///
/// Down and move samples normalize against the surface size into [0, 1],
/// clamping touches that wander past the edge. Lifting the finger reports
/// the off-screen sample.
pub fn normalize_touch(
    phase: TouchPhase,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) -> PointerSample {
    if phase == TouchPhase::Up || width <= 0.0 || height <= 0.0 {
        return PointerSample::LIFTED;
    }
    PointerSample {
        x: (x / width).clamp(0.0, 1.0),
        y: (y / height).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_normalizes_against_surface() {
        let sample = normalize_touch(TouchPhase::Down, 160.0, 120.0, 320.0, 240.0);
        assert_eq!(sample.x, 0.5);
        assert_eq!(sample.y, 0.5);
    }

    #[test]
    fn test_touch_outside_surface_clamps() {
        let sample = normalize_touch(TouchPhase::Moved, -20.0, 500.0, 320.0, 240.0);
        assert_eq!(sample.x, 0.0);
        assert_eq!(sample.y, 1.0);
    }

    #[test]
    fn test_lift_reports_off_screen() {
        let sample = normalize_touch(TouchPhase::Up, 160.0, 120.0, 320.0, 240.0);
        assert_eq!(sample, PointerSample::LIFTED);
    }

    #[test]
    fn test_degenerate_surface_reports_off_screen() {
        let sample = normalize_touch(TouchPhase::Down, 10.0, 10.0, 0.0, 240.0);
        assert_eq!(sample, PointerSample::LIFTED);
    }
}
