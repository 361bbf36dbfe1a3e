//! Physical pinhole camera.
//!
//! The camera looks down its local `-Z` axis with `+Y` up. Film size is
//! given in inches and focal length in millimetres, as in DCC packages.

use lux_math::{Interval, Mat4, ObjectTransform, Ray, Vec3};

use crate::error::SceneError;
use crate::format::Format;

const MM_PER_INCH: f32 = 25.4;

/// Pinhole camera with a film back and clipping range.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Focal length in millimetres
    pub focal_length: f32,
    /// Film width in inches
    pub horizontal_aperture: f32,
    /// Film height in inches
    pub vertical_aperture: f32,
    /// Near clip distance along the view axis
    pub near: f32,
    /// Far clip distance along the view axis
    pub far: f32,
    transform: ObjectTransform,
}

impl Camera {
    /// Default perspective camera: 35 mm lens on a 1.417 x 0.945 in back.
    pub fn persp() -> Self {
        Self {
            focal_length: 35.0,
            horizontal_aperture: 1.417,
            vertical_aperture: 0.945,
            near: 0.1,
            far: 10000.0,
            transform: ObjectTransform::IDENTITY,
        }
    }

    /// 50 mm lens on a 36 x 24 mm full-frame back.
    pub fn full_frame() -> Self {
        Self {
            focal_length: 50.0,
            horizontal_aperture: 36.0 / MM_PER_INCH,
            vertical_aperture: 24.0 / MM_PER_INCH,
            ..Self::persp()
        }
    }

    /// Builder method to set the focal length (mm).
    pub fn with_focal_length(mut self, focal_length: f32) -> Self {
        self.focal_length = focal_length;
        self
    }

    /// Builder method to set the clipping range.
    pub fn with_clipping(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Place the camera with an object-to-world matrix.
    pub fn with_o2w(mut self, o2w: Mat4) -> Result<Self, SceneError> {
        self.transform =
            ObjectTransform::new(o2w).ok_or_else(|| SceneError::SingularTransform("camera".into()))?;
        Ok(self)
    }

    /// Place the camera at `eye` looking at `target`.
    pub fn looking_at(self, eye: Vec3, target: Vec3, up: Vec3) -> Result<Self, SceneError> {
        self.with_o2w(Mat4::look_at_rh(eye, target, up).inverse())
    }

    #[inline]
    pub fn transform(&self) -> &ObjectTransform {
        &self.transform
    }

    /// Camera position in world space.
    pub fn position(&self) -> Vec3 {
        self.transform.point_to_world(Vec3::ZERO)
    }

    /// Horizontal field of view in radians.
    pub fn horizontal_fov(&self) -> f32 {
        2.0 * (self.horizontal_aperture * MM_PER_INCH / (2.0 * self.focal_length)).atan()
    }

    /// Vertical field of view in radians.
    pub fn vertical_fov(&self) -> f32 {
        2.0 * (self.vertical_aperture * MM_PER_INCH / (2.0 * self.focal_length)).atan()
    }

    /// Primary ray through the film position `(x, y)` in pixel units, with
    /// `(0, 0)` the top-left corner of the image. Returns the world-space ray
    /// with a unit direction and the distance range between the clipping
    /// planes along that ray.
    ///
    /// The horizontal aperture fills the image width; the vertical extent
    /// follows from the device aspect of `format`.
    pub fn primary_ray(&self, format: &Format, x: f32, y: f32) -> (Ray, Interval) {
        let (width, height) = format.resolution;
        let half_w = (0.5 * self.horizontal_fov()).tan();
        let half_h = half_w / format.device_aspect();

        let sx = (2.0 * x / width as f32 - 1.0) * half_w;
        let sy = (1.0 - 2.0 * y / height as f32) * half_h;
        let local = Vec3::new(sx, sy, -1.0).normalize();
        let cos = local.z.abs();

        let world = self.transform.vector_to_world(local);
        let scale = world.length();
        let ray = Ray::new(self.position(), world / scale);
        let interval = Interval::new(self.near / cos * scale, self.far / cos * scale);
        (ray, interval)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::persp()
    }
}
