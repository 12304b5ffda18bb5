//! Axis-aligned bounds and rigid placements.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumString};

/// Three-component vector used for points, Euler angles and scale factors.
pub type Vec3 = [f64; 3];

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BoundingBox {
    /// Builds a box from two corners in any order.
    #[must_use]
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        }
    }

    /// Box centred on the origin with the given extents.
    #[must_use]
    pub fn centered(size: Vec3) -> Self {
        let half = size.map(|extent| extent.abs() / 2.0);
        Self {
            min: half.map(|value| -value),
            max: half,
        }
    }

    /// Degenerate box at the origin.
    #[must_use]
    pub const fn point() -> Self {
        Self {
            min: [0.0; 3],
            max: [0.0; 3],
        }
    }

    /// Extent along each axis.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Enclosed volume of the box itself.
    #[must_use]
    pub fn volume(&self) -> f64 {
        let [x, y, z] = self.size();
        x * y * z
    }

    /// Smallest box enclosing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }

    /// Overlap of both boxes, or `None` when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let min = [
            self.min[0].max(other.min[0]),
            self.min[1].max(other.min[1]),
            self.min[2].max(other.min[2]),
        ];
        let max = [
            self.max[0].min(other.max[0]),
            self.max[1].min(other.max[1]),
            self.max[2].min(other.max[2]),
        ];
        (min[0] <= max[0] && min[1] <= max[1] && min[2] <= max[2]).then_some(Self { min, max })
    }

    /// The eight corner points.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            [lo[0], lo[1], lo[2]],
            [hi[0], lo[1], lo[2]],
            [hi[0], hi[1], lo[2]],
            [lo[0], hi[1], lo[2]],
            [lo[0], lo[1], hi[2]],
            [hi[0], lo[1], hi[2]],
            [hi[0], hi[1], hi[2]],
            [lo[0], hi[1], hi[2]],
        ]
    }

    /// Bounds of this box after applying a placement to every corner.
    #[must_use]
    pub fn transformed(&self, placement: &Placement) -> Self {
        let mut corners = self.corners().into_iter().map(|corner| placement.apply(corner));
        let Some(first) = corners.next() else {
            return *self;
        };
        corners.fold(Self::from_corners(first, first), |bounds, corner| {
            bounds.union(&Self::from_corners(corner, corner))
        })
    }

    /// Reflection across one of the principal planes through the origin.
    #[must_use]
    pub fn mirrored(&self, plane: MirrorPlane) -> Self {
        let axis = plane.normal_axis();
        let mut min = self.min;
        let mut max = self.max;
        if let (Some(lo), Some(hi)) = (min.get_mut(axis), max.get_mut(axis)) {
            let (old_lo, old_hi) = (*lo, *hi);
            *lo = -old_hi;
            *hi = -old_lo;
        }
        Self { min, max }
    }

    /// Wire representation with `min`, `max` and `size` arrays.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "min": self.min,
            "max": self.max,
            "size": self.size(),
        })
    }
}

/// Principal plane used by mirror operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum MirrorPlane {
    /// Mirror across the XY plane (negates Z).
    #[strum(serialize = "XY")]
    Xy,
    /// Mirror across the XZ plane (negates Y).
    #[strum(serialize = "XZ")]
    Xz,
    /// Mirror across the YZ plane (negates X).
    #[strum(serialize = "YZ")]
    Yz,
}

impl MirrorPlane {
    const fn normal_axis(self) -> usize {
        match self {
            Self::Xy => 2,
            Self::Xz => 1,
            Self::Yz => 0,
        }
    }
}

/// Location, XYZ Euler rotation in radians, and scale of an object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Translation applied last.
    pub location: Vec3,
    /// Euler angles in radians, applied X then Y then Z.
    pub rotation: Vec3,
    /// Per-axis scale applied first.
    pub scale: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

impl Placement {
    /// Placement that leaves points unchanged.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            location: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }

    /// Pure translation.
    #[must_use]
    pub const fn at(location: Vec3) -> Self {
        Self {
            location,
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }

    /// Maps a local point into world space.
    #[must_use]
    pub fn apply(&self, point: Vec3) -> Vec3 {
        let scaled = [
            point[0] * self.scale[0],
            point[1] * self.scale[1],
            point[2] * self.scale[2],
        ];
        let rotated = rotate(scaled, self.rotation);
        [
            rotated[0] + self.location[0],
            rotated[1] + self.location[1],
            rotated[2] + self.location[2],
        ]
    }

    /// Absolute volume scale factor.
    #[must_use]
    pub fn volume_factor(&self) -> f64 {
        (self.scale[0] * self.scale[1] * self.scale[2]).abs()
    }

    /// Wire representation.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "location": self.location,
            "rotation": self.rotation,
            "scale": self.scale,
        })
    }
}

fn rotate(point: Vec3, [rx, ry, rz]: Vec3) -> Vec3 {
    let [x, y, z] = point;
    let (sx, cx) = rx.sin_cos();
    let (y1, z1) = (y * cx - z * sx, y * sx + z * cx);
    let (sy, cy) = ry.sin_cos();
    let (x2, z2) = (x * cy + z1 * sy, -x * sy + z1 * cy);
    let (sz, cz) = rz.sin_cos();
    [x2 * cz - y1 * sz, x2 * sz + y1 * cz, z2]
}
