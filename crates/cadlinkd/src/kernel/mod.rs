//! Geometry kernel seam.
//!
//! Handlers never compute geometry themselves. They describe primitives,
//! boolean operations, exports and renders to a [`GeometryKernel`] and store
//! the returned [`Geometry`] in the session. The bundled [`AnalyticKernel`]
//! answers with closed-form volumes and bounding boxes, which keeps the
//! engines self-contained; a binding to a real modelling kernel implements the
//! same trait.

mod analytic;
mod geometry;
mod writers;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

pub use analytic::AnalyticKernel;
pub use geometry::{BoundingBox, MirrorPlane, Placement, Vec3};

/// Name and version reported by `get_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelInfo {
    /// Kernel name.
    pub name: String,
    /// Kernel version string.
    pub version: String,
}

/// Shape of a solid in its local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    /// Rectangular box.
    Box {
        /// Extent along X.
        length: f64,
        /// Extent along Y.
        width: f64,
        /// Extent along Z.
        height: f64,
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f64,
    },
    /// Cylinder along Z.
    Cylinder {
        /// Radius.
        radius: f64,
        /// Height along Z.
        height: f64,
    },
    /// Cone or frustum along Z.
    Cone {
        /// Bottom radius.
        radius1: f64,
        /// Top radius.
        radius2: f64,
        /// Height along Z.
        height: f64,
    },
    /// Torus in the XY plane.
    Torus {
        /// Distance from the centre to the tube centre.
        major_radius: f64,
        /// Tube radius.
        minor_radius: f64,
    },
    /// Flat rectangle in the XY plane.
    Plane {
        /// Extent along X.
        length: f64,
        /// Extent along Y.
        width: f64,
    },
    /// Wedge with a rectangular base and a rectangular top face.
    Wedge(WedgeSpec),
}

/// Wedge bounds: the base spans `x/z min..max` at `ymin`, the top spans
/// `x2/z2 min..max` at `ymax`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WedgeSpec {
    /// Base minimum X.
    pub xmin: f64,
    /// Y of the base face.
    pub ymin: f64,
    /// Base minimum Z.
    pub zmin: f64,
    /// Top minimum X.
    pub x2min: f64,
    /// Top minimum Z.
    pub z2min: f64,
    /// Base maximum X.
    pub xmax: f64,
    /// Y of the top face.
    pub ymax: f64,
    /// Base maximum Z.
    pub zmax: f64,
    /// Top maximum X.
    pub x2max: f64,
    /// Top maximum Z.
    pub z2max: f64,
}

/// Where the local origin of a primitive sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// The origin is the centre of the bounding box.
    Centered,
    /// The origin is the minimum corner, or the base centre for round solids.
    Base,
}

/// A primitive to build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    /// Shape and dimensions.
    pub shape: Shape,
    /// Origin convention.
    pub anchor: Anchor,
}

/// Geometry computed by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Bounding box.
    pub bounds: BoundingBox,
    /// Enclosed volume; zero for surfaces and markers.
    pub volume: f64,
}

impl Geometry {
    /// Zero-volume geometry at the origin, used by empties, cameras and lights.
    #[must_use]
    pub const fn marker() -> Self {
        Self {
            bounds: BoundingBox::point(),
            volume: 0.0,
        }
    }

    /// The same geometry after a placement.
    #[must_use]
    pub fn placed(&self, placement: &Placement) -> Self {
        Self {
            bounds: self.bounds.transformed(placement),
            volume: self.volume * placement.volume_factor(),
        }
    }
}

/// Boolean operation between solids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BooleanOp {
    /// Merge all operands.
    Union,
    /// Remove every following operand from the first.
    Subtract,
    /// Keep only the common volume.
    Intersect,
}

/// File formats the kernel may be asked to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    /// ASCII STL.
    Stl,
    /// Wavefront OBJ.
    Obj,
    /// STEP AP214.
    Step,
    /// IGES.
    Iges,
    /// OpenCASCADE BREP.
    Brep,
}

/// One object to export, in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportItem {
    /// Object name written into the file.
    pub name: String,
    /// World-space bounds.
    pub bounds: BoundingBox,
}

/// Export job.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    /// Target format.
    pub format: ExportFormat,
    /// Absolute output path.
    pub path: Utf8PathBuf,
    /// Objects to write.
    pub items: Vec<ExportItem>,
}

/// Image formats the kernel may be asked to render to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum ImageFormat {
    /// Portable pixmap.
    #[strum(serialize = "PPM")]
    Ppm,
    /// PNG.
    #[strum(serialize = "PNG")]
    Png,
    /// JPEG.
    #[strum(serialize = "JPEG")]
    Jpeg,
}

/// One object to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    /// World-space bounds.
    pub bounds: BoundingBox,
    /// Linear RGBA colour.
    pub color: [f64; 4],
}

/// Render job.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Absolute output path.
    pub path: Utf8PathBuf,
    /// Output format.
    pub format: ImageFormat,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Objects in draw order.
    pub items: Vec<RenderItem>,
}

/// Result of writing a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// Bytes written.
    pub bytes: u64,
}

/// Errors reported by a kernel.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The kernel cannot perform the request at all.
    #[error("{operation} is not supported by this kernel")]
    Unsupported {
        /// What was attempted.
        operation: String,
    },
    /// The request was understood but cannot produce valid geometry.
    #[error("{message}")]
    Invalid {
        /// Explanation.
        message: String,
    },
    /// Writing output failed.
    #[error("failed to write '{path}': {source}")]
    Io {
        /// Target path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl KernelError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

/// Geometry backend used by the handlers.
#[cfg_attr(test, mockall::automock)]
pub trait GeometryKernel: Send + Sync {
    /// Identifies the kernel.
    fn info(&self) -> KernelInfo;

    /// Builds a primitive in its local frame.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Invalid`] for non-positive dimensions.
    fn build(&self, primitive: &Primitive) -> Result<Geometry, KernelError>;

    /// Combines world-space operands.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Invalid`] when the result would be empty.
    fn combine(&self, op: BooleanOp, operands: &[Geometry]) -> Result<Geometry, KernelError>;

    /// Mirrors world-space geometry across a principal plane.
    ///
    /// # Errors
    ///
    /// Kernels without reflection support report [`KernelError::Unsupported`].
    fn mirror(&self, geometry: &Geometry, plane: MirrorPlane) -> Result<Geometry, KernelError>;

    /// Writes an export file.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Unsupported`] for formats the kernel cannot
    /// write and [`KernelError::Io`] when writing fails.
    fn export(&self, request: &ExportRequest) -> Result<WriteSummary, KernelError>;

    /// Renders an image.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Unsupported`] for image formats the kernel
    /// cannot encode and [`KernelError::Io`] when writing fails.
    fn render(&self, request: &RenderRequest) -> Result<WriteSummary, KernelError>;

    /// Runs a script in the kernel's embedded interpreter.
    ///
    /// # Errors
    ///
    /// Kernels without an interpreter report [`KernelError::Unsupported`].
    fn run_script(&self, code: &str) -> Result<serde_json::Value, KernelError>;
}
