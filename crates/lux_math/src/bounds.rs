use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box used by the spatial index.
///
/// `EMPTY` has inverted corners so that extending it by the first point
/// yields a degenerate box around that point. After any `extend_by` or
/// `union` with a non-empty box, `min <= max` holds componentwise.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// The box containing nothing.
    pub const EMPTY: BoundingBox = BoundingBox {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Smallest box containing every point of the iterator.
    pub fn from_iter<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |mut acc, p| {
                acc.extend_by(p);
                acc
            })
    }

    /// True if the box contains no point.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z)
    }

    /// Grow the box to contain `point`.
    #[inline]
    pub fn extend_by(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Smallest box containing both boxes.
    #[inline]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// One of the eight octants of this box, selected by a 3-bit index
    /// (x-bit = 4, y-bit = 2, z-bit = 1; a set bit selects the upper half).
    pub fn octant(&self, index: usize) -> BoundingBox {
        let c = self.center();
        let pick = |bit: usize, lo: f32, mid: f32, hi: f32| {
            if index & bit != 0 {
                (mid, hi)
            } else {
                (lo, mid)
            }
        };
        let (x0, x1) = pick(4, self.min.x, c.x, self.max.x);
        let (y0, y1) = pick(2, self.min.y, c.y, self.max.y);
        let (z0, z1) = pick(1, self.min.z, c.z, self.max.z);
        BoundingBox {
            min: Vec3::new(x0, y0, z0),
            max: Vec3::new(x1, y1, z1),
        }
    }

    /// Slab test. Returns the parametric distance at which the ray enters
    /// the box, clamped to `ray_t.min`, or `None` if the ray misses within
    /// `ray_t`.
    ///
    /// All slabs are closed: a ray lying exactly in a face plane, or
    /// touching only an edge or corner, counts as a hit. An axis with a zero
    /// direction component hits iff the origin lies within that slab.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<f32> {
        if self.is_empty() {
            return None;
        }

        let mut t_min = ray_t.min;
        let mut t_max = ray_t.max;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            let lo = self.min[axis];
            let hi = self.max[axis];

            if dir == 0.0 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_max < t_min {
                return None;
            }
        }

        Some(t_min)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}
