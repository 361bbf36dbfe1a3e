//! Output image format.

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Image resolution and pixel aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Format {
    /// Width and height in pixels
    pub resolution: (u32, u32),
    /// Pixel aspect as width:height (1:1 for square pixels)
    pub aspect: (f32, f32),
}

impl Format {
    /// Square-pixel format.
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: (width, height),
            aspect: (1.0, 1.0),
        }
    }

    /// 1920x1080
    pub const fn hd_1080() -> Self {
        Self::new(1920, 1080)
    }

    /// 1280x720
    pub const fn hd_720() -> Self {
        Self::new(1280, 720)
    }

    /// 640x480
    pub const fn vga() -> Self {
        Self::new(640, 480)
    }

    /// Builder method to set a non-square pixel aspect.
    pub fn with_pixel_aspect(mut self, x: f32, y: f32) -> Self {
        self.aspect = (x, y);
        self
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.resolution.0
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.resolution.1
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.resolution.0 as usize * self.resolution.1 as usize
    }

    /// Aspect of the whole image on the display device.
    pub fn device_aspect(&self) -> f32 {
        (self.resolution.0 as f32 * self.aspect.0) / (self.resolution.1 as f32 * self.aspect.1)
    }

    /// Reject formats that cannot produce an image.
    pub fn validate(&self) -> Result<(), FormatError> {
        let (width, height) = self.resolution;
        if width == 0 || height == 0 {
            return Err(FormatError::ZeroResolution { width, height });
        }
        let (x, y) = self.aspect;
        if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
            return Err(FormatError::InvalidAspect { x, y });
        }
        Ok(())
    }
}

impl Default for Format {
    fn default() -> Self {
        Self::vga()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_aspect() {
        assert!((Format::hd_1080().device_aspect() - 16.0 / 9.0).abs() < 1e-6);
        let anamorphic = Format::new(1000, 1000).with_pixel_aspect(2.0, 1.0);
        assert!((anamorphic.device_aspect() - 2.0).abs() < 1e-6);
        assert_eq!(anamorphic.pixel_count(), 1_000_000);
    }

    #[test]
    fn test_validate() {
        assert!(Format::hd_720().validate().is_ok());
        assert_eq!(
            Format::new(0, 10).validate(),
            Err(FormatError::ZeroResolution { width: 0, height: 10 })
        );
        assert!(Format::new(4, 4).with_pixel_aspect(0.0, 1.0).validate().is_err());
        assert!(Format::new(4, 4).with_pixel_aspect(f32::NAN, 1.0).validate().is_err());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Format::new(2, 3)).unwrap();
        let back: Format = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Format::new(2, 3));
    }
}
