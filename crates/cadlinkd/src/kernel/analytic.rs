//! Closed-form geometry kernel.
//!
//! Primitive volumes are exact. Boolean results keep exact bounding boxes
//! where the operation allows it and estimate volume from the overlap of the
//! operands' boxes, weighted by how densely each operand fills its box.

use std::f64::consts::PI;

use super::geometry::{BoundingBox, MirrorPlane};
use super::writers;
use super::{
    Anchor, BooleanOp, ExportFormat, ExportRequest, Geometry, GeometryKernel, ImageFormat,
    KernelError, KernelInfo, Primitive, RenderRequest, Shape, WedgeSpec, WriteSummary,
};

const KERNEL_NAME: &str = "cadlink-analytic";
const MAX_RENDER_PIXELS: u64 = 4096 * 4096;
const EMPTY_VOLUME: f64 = 1e-9;

/// Geometry kernel that needs no external modelling library.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyticKernel;

impl AnalyticKernel {
    /// Builds the kernel.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl GeometryKernel for AnalyticKernel {
    fn info(&self) -> KernelInfo {
        KernelInfo {
            name: KERNEL_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    fn build(&self, primitive: &Primitive) -> Result<Geometry, KernelError> {
        validate(&primitive.shape)?;
        Ok(Geometry {
            bounds: local_bounds(&primitive.shape, primitive.anchor),
            volume: volume(&primitive.shape),
        })
    }

    fn combine(&self, op: BooleanOp, operands: &[Geometry]) -> Result<Geometry, KernelError> {
        let [first, rest @ ..] = operands else {
            return Err(KernelError::invalid(format!("{op} needs at least two operands")));
        };
        if rest.is_empty() {
            return Err(KernelError::invalid(format!("{op} needs at least two operands")));
        }
        match op {
            BooleanOp::Union => Ok(rest.iter().fold(*first, |acc, next| Geometry {
                bounds: acc.bounds.union(&next.bounds),
                volume: (acc.volume + next.volume - overlap(&acc, next))
                    .max(acc.volume.max(next.volume)),
            })),
            BooleanOp::Subtract => {
                let volume = rest
                    .iter()
                    .fold(first.volume, |remaining, tool| {
                        let current = Geometry {
                            bounds: first.bounds,
                            volume: remaining,
                        };
                        remaining - overlap(&current, tool)
                    })
                    .max(0.0);
                if first.volume > 0.0 && volume <= EMPTY_VOLUME {
                    return Err(KernelError::invalid("subtraction removes the entire base"));
                }
                Ok(Geometry {
                    bounds: first.bounds,
                    volume,
                })
            }
            BooleanOp::Intersect => rest.iter().try_fold(*first, |acc, next| {
                let bounds = acc
                    .bounds
                    .intersection(&next.bounds)
                    .ok_or_else(|| KernelError::invalid("operands do not intersect"))?;
                Ok(Geometry {
                    bounds,
                    volume: overlap(&acc, next),
                })
            }),
        }
    }

    fn mirror(&self, geometry: &Geometry, plane: MirrorPlane) -> Result<Geometry, KernelError> {
        Ok(Geometry {
            bounds: geometry.bounds.mirrored(plane),
            volume: geometry.volume,
        })
    }

    fn export(&self, request: &ExportRequest) -> Result<WriteSummary, KernelError> {
        if request.items.is_empty() {
            return Err(KernelError::invalid("no objects to export"));
        }
        match request.format {
            ExportFormat::Stl => writers::write_stl(&request.path, &request.items),
            ExportFormat::Obj => writers::write_obj(&request.path, &request.items),
            other => Err(KernelError::unsupported(format!("{other} export"))),
        }
    }

    fn render(&self, request: &RenderRequest) -> Result<WriteSummary, KernelError> {
        let pixels = u64::from(request.width) * u64::from(request.height);
        if pixels == 0 || pixels > MAX_RENDER_PIXELS {
            return Err(KernelError::invalid(format!(
                "render size {}x{} is outside the supported range",
                request.width, request.height
            )));
        }
        match request.format {
            ImageFormat::Ppm => writers::write_ppm(
                &request.path,
                request.width,
                request.height,
                &request.items,
            ),
            other => Err(KernelError::unsupported(format!("{other} rendering"))),
        }
    }

    fn run_script(&self, _code: &str) -> Result<serde_json::Value, KernelError> {
        Err(KernelError::unsupported("script execution"))
    }
}

/// Estimated shared volume of two solids.
fn overlap(a: &Geometry, b: &Geometry) -> f64 {
    a.bounds
        .intersection(&b.bounds)
        .map_or(0.0, |common| common.volume() * fill(a).min(fill(b)))
}

/// Fraction of its bounding box a solid occupies.
fn fill(geometry: &Geometry) -> f64 {
    let box_volume = geometry.bounds.volume();
    if box_volume > 0.0 {
        (geometry.volume / box_volume).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn validate(shape: &Shape) -> Result<(), KernelError> {
    let positive = |name: &str, value: f64| {
        if value > 0.0 && value.is_finite() {
            Ok(())
        } else {
            Err(KernelError::invalid(format!("{name} must be positive, got {value}")))
        }
    };
    match *shape {
        Shape::Box {
            length,
            width,
            height,
        } => {
            positive("length", length)?;
            positive("width", width)?;
            positive("height", height)
        }
        Shape::Sphere { radius } => positive("radius", radius),
        Shape::Cylinder { radius, height } => {
            positive("radius", radius)?;
            positive("height", height)
        }
        Shape::Cone {
            radius1,
            radius2,
            height,
        } => {
            if radius1 < 0.0 || radius2 < 0.0 {
                return Err(KernelError::invalid("cone radii must not be negative"));
            }
            positive("larger cone radius", radius1.max(radius2))?;
            positive("height", height)
        }
        Shape::Torus {
            major_radius,
            minor_radius,
        } => {
            positive("major_radius", major_radius)?;
            positive("minor_radius", minor_radius)
        }
        Shape::Plane { length, width } => {
            positive("length", length)?;
            positive("width", width)
        }
        Shape::Wedge(spec) => {
            positive("xmax - xmin", spec.xmax - spec.xmin)?;
            positive("ymax - ymin", spec.ymax - spec.ymin)?;
            positive("zmax - zmin", spec.zmax - spec.zmin)?;
            if spec.x2max < spec.x2min || spec.z2max < spec.z2min {
                return Err(KernelError::invalid("wedge top face bounds are inverted"));
            }
            Ok(())
        }
    }
}

fn volume(shape: &Shape) -> f64 {
    match *shape {
        Shape::Box {
            length,
            width,
            height,
        } => length * width * height,
        Shape::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
        Shape::Cylinder { radius, height } => PI * radius.powi(2) * height,
        Shape::Cone {
            radius1,
            radius2,
            height,
        } => PI * height / 3.0 * (radius1.powi(2) + radius1 * radius2 + radius2.powi(2)),
        Shape::Torus {
            major_radius,
            minor_radius,
        } => 2.0 * PI.powi(2) * major_radius * minor_radius.powi(2),
        Shape::Plane { .. } => 0.0,
        Shape::Wedge(spec) => wedge_volume(&spec),
    }
}

fn wedge_volume(spec: &WedgeSpec) -> f64 {
    let (bottom_x, bottom_z) = (spec.xmax - spec.xmin, spec.zmax - spec.zmin);
    let (top_x, top_z) = (spec.x2max - spec.x2min, spec.z2max - spec.z2min);
    let middle = ((bottom_x + top_x) / 2.0) * ((bottom_z + top_z) / 2.0);
    (spec.ymax - spec.ymin) / 6.0 * (bottom_x * bottom_z + 4.0 * middle + top_x * top_z)
}

fn local_bounds(shape: &Shape, anchor: Anchor) -> BoundingBox {
    let base = match *shape {
        Shape::Box {
            length,
            width,
            height,
        } => BoundingBox::from_corners([0.0; 3], [length, width, height]),
        Shape::Sphere { radius } => return BoundingBox::centered([2.0 * radius; 3]),
        Shape::Cylinder { radius, height } => {
            BoundingBox::from_corners([-radius, -radius, 0.0], [radius, radius, height])
        }
        Shape::Cone {
            radius1,
            radius2,
            height,
        } => {
            let radius = radius1.max(radius2);
            BoundingBox::from_corners([-radius, -radius, 0.0], [radius, radius, height])
        }
        Shape::Torus {
            major_radius,
            minor_radius,
        } => {
            let outer = 2.0 * (major_radius + minor_radius);
            return BoundingBox::centered([outer, outer, 2.0 * minor_radius]);
        }
        Shape::Plane { length, width } => {
            BoundingBox::from_corners([0.0; 3], [length, width, 0.0])
        }
        Shape::Wedge(spec) => BoundingBox::from_corners(
            [spec.xmin.min(spec.x2min), spec.ymin, spec.zmin.min(spec.z2min)],
            [spec.xmax.max(spec.x2max), spec.ymax, spec.zmax.max(spec.z2max)],
        ),
    };
    match anchor {
        Anchor::Base => base,
        Anchor::Centered => BoundingBox::centered(base.size()),
    }
}
