//! Maps reference-frame coordinates onto an actual image.

use super::config::{ReferenceFrame, RoiRect};

/// Per-image scale factors (actual / reference) for each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    #[cfg(test)]
    pub const IDENTITY: ScaleFactors = ScaleFactors { x: 1.0, y: 1.0 };

    /// Computes the factors for an image of `width`×`height` pixels.
    pub fn for_image(reference: ReferenceFrame, width: u32, height: u32) -> Self {
        let axis = |actual: u32, nominal: u32| {
            if nominal == 0 {
                1.0
            } else {
                actual as f64 / nominal as f64
            }
        };
        Self {
            x: axis(width, reference.width),
            y: axis(height, reference.height),
        }
    }

    /// Scales a horizontal length, truncating toward zero.
    pub fn scale_x(&self, value: u32) -> u32 {
        (value as f64 * self.x) as u32
    }

    /// Scales a vertical length, truncating toward zero.
    pub fn scale_y(&self, value: u32) -> u32 {
        (value as f64 * self.y) as u32
    }
}

/// A rectangle in actual image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    #[cfg(test)]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Clips the rectangle to an image of the given size.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn clip_to(&self, image_width: u32, image_height: u32) -> Option<PixelRect> {
        if self.x >= image_width || self.y >= image_height {
            return None;
        }
        let width = self.width.min(image_width - self.x);
        let height = self.height.min(image_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(PixelRect::new(self.x, self.y, width, height))
    }
}

/// Scales a nominal rectangle into pixel space. The result may overshoot the
/// image by a pixel after rounding; clip before cropping.
pub fn scale_rect(rect: RoiRect, factors: ScaleFactors) -> PixelRect {
    PixelRect {
        x: factors.scale_x(rect.x),
        y: factors.scale_y(rect.y),
        width: factors.scale_x(rect.width),
        height: factors.scale_y(rect.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_scale_keeps_coordinates() {
        let reference = ReferenceFrame::default();
        let factors = ScaleFactors::for_image(reference, reference.width, reference.height);
        assert_eq!(factors, ScaleFactors::IDENTITY);

        for rect in [
            RoiRect::new(0, 0, 1748, 2480),
            RoiRect::new(90, 100, 460, 70),
            RoiRect::new(1070, 70, 650, 2350),
        ] {
            let scaled = scale_rect(rect, factors);
            assert_eq!(
                (scaled.x, scaled.y, scaled.width, scaled.height),
                (rect.x, rect.y, rect.width, rect.height)
            );
        }
    }

    #[test]
    fn test_half_scale() {
        let factors = ScaleFactors::for_image(ReferenceFrame::default(), 874, 1240);
        let scaled = scale_rect(RoiRect::new(90, 100, 460, 70), factors);
        assert_eq!(scaled, PixelRect::new(45, 50, 230, 35));
    }

    #[test]
    fn test_scale_truncates() {
        let factors = ScaleFactors { x: 0.3, y: 0.7 };
        let scaled = scale_rect(RoiRect::new(10, 10, 5, 5), factors);
        assert_eq!(scaled, PixelRect::new(3, 7, 1, 3));
    }

    #[test]
    fn test_zero_reference_axis_falls_back_to_identity() {
        let factors = ScaleFactors::for_image(
            ReferenceFrame {
                width: 0,
                height: 100,
            },
            500,
            50,
        );
        assert_eq!(factors.x, 1.0);
        assert_eq!(factors.y, 0.5);
    }

    #[test]
    fn test_clip_to_image() {
        let rect = PixelRect::new(90, 90, 20, 20);
        assert_eq!(rect.clip_to(100, 100), Some(PixelRect::new(90, 90, 10, 10)));
        assert_eq!(rect.clip_to(90, 100), None);
        assert_eq!(PixelRect::new(0, 0, 0, 10).clip_to(100, 100), None);
    }
}
