use serde::{Deserialize, Serialize};

/// Page magnification factor.
///
/// Always kept inside `[Zoom::MIN, Zoom::MAX]`; values read from disk are
/// clamped on the way in.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Zoom(f32);

impl Zoom {
    pub const MIN: f32 = 0.5;
    pub const MAX: f32 = 3.0;
    pub const STEP: f32 = 0.1;
    pub const DEFAULT: f32 = 1.5;

    pub fn new(factor: f32) -> Self {
        if factor.is_finite() {
            Self(factor.clamp(Self::MIN, Self::MAX))
        } else {
            Self::default()
        }
    }

    pub fn factor(self) -> f32 {
        self.0
    }

    pub fn zoom_in(self) -> Self {
        Self::new(round_step(self.0 + Self::STEP))
    }

    pub fn zoom_out(self) -> Self {
        Self::new(round_step(self.0 - Self::STEP))
    }

    /// Zoom as a whole percentage, e.g. `150` for 1.5x
    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

// Repeated 0.1 steps drift in binary floating point.
fn round_step(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

impl Default for Zoom {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<f32> for Zoom {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Zoom> for f32 {
    fn from(value: Zoom) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_zoom() {
        assert_eq!(Zoom::default().factor(), 1.5);
        assert_eq!(Zoom::default().percent(), 150);
    }

    #[test]
    fn test_zoom_steps_are_clamped() {
        let mut zoom = Zoom::new(2.9);
        zoom = zoom.zoom_in();
        assert_eq!(zoom.factor(), 3.0);
        zoom = zoom.zoom_in();
        assert_eq!(zoom.factor(), 3.0);

        let mut zoom = Zoom::new(0.6);
        zoom = zoom.zoom_out();
        assert_eq!(zoom.factor(), 0.5);
        zoom = zoom.zoom_out();
        assert_eq!(zoom.factor(), 0.5);
    }

    #[test]
    fn test_repeated_steps_do_not_drift() {
        let mut zoom = Zoom::default();
        for _ in 0..5 {
            zoom = zoom.zoom_in();
        }
        assert_eq!(zoom.percent(), 200);
        assert_eq!(zoom.factor(), 2.0);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        assert_eq!(Zoom::new(10.0).factor(), 3.0);
        assert_eq!(Zoom::new(0.0).factor(), 0.5);
        assert_eq!(Zoom::new(f32::NAN), Zoom::default());
    }
}
