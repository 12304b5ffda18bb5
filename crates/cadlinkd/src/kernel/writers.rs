//! File writers used by the analytic kernel.
//!
//! Solids are written as their world-space bounding boxes. Images are
//! orthographic top views with each object filled in its material colour.

use std::fs;
use std::io::{self, Write as _};

use camino::Utf8Path;

use super::{BoundingBox, ExportItem, KernelError, RenderItem, Vec3, WriteSummary};

const BACKGROUND: [u8; 3] = [48, 48, 48];
const MARGIN_RATIO: f64 = 0.05;

// Quad faces of a box, as indices into `BoundingBox::corners`, wound
// counter-clockwise when seen from outside.
const FACES: [([usize; 4], Vec3); 6] = [
    ([0, 3, 2, 1], [0.0, 0.0, -1.0]),
    ([4, 5, 6, 7], [0.0, 0.0, 1.0]),
    ([0, 1, 5, 4], [0.0, -1.0, 0.0]),
    ([2, 3, 7, 6], [0.0, 1.0, 0.0]),
    ([1, 2, 6, 5], [1.0, 0.0, 0.0]),
    ([0, 4, 7, 3], [-1.0, 0.0, 0.0]),
];

pub(super) fn write_stl(path: &Utf8Path, items: &[ExportItem]) -> Result<WriteSummary, KernelError> {
    let mut out = Vec::new();
    stl_body(&mut out, items).map_err(|source| io_error(path, source))?;
    write_file(path, &out)
}

fn stl_body(out: &mut Vec<u8>, items: &[ExportItem]) -> io::Result<()> {
    for item in items {
        let corners = item.bounds.corners();
        writeln!(out, "solid {}", item.name)?;
        for ([a, b, c, d], [nx, ny, nz]) in FACES {
            for triangle in [[a, b, c], [a, c, d]] {
                writeln!(out, "  facet normal {nx} {ny} {nz}")?;
                writeln!(out, "    outer loop")?;
                for [x, y, z] in triangle.iter().filter_map(|&index| corners.get(index)) {
                    writeln!(out, "      vertex {x} {y} {z}")?;
                }
                writeln!(out, "    endloop\n  endfacet")?;
            }
        }
        writeln!(out, "endsolid {}", item.name)?;
    }
    Ok(())
}

pub(super) fn write_obj(path: &Utf8Path, items: &[ExportItem]) -> Result<WriteSummary, KernelError> {
    let mut out = Vec::new();
    obj_body(&mut out, items).map_err(|source| io_error(path, source))?;
    write_file(path, &out)
}

fn obj_body(out: &mut Vec<u8>, items: &[ExportItem]) -> io::Result<()> {
    writeln!(out, "# cadlink analytic export")?;
    let mut base = 1;
    for item in items {
        writeln!(out, "o {}", item.name)?;
        let corners = item.bounds.corners();
        for [x, y, z] in corners {
            writeln!(out, "v {x} {y} {z}")?;
        }
        for ([a, b, c, d], _) in FACES {
            writeln!(out, "f {} {} {} {}", base + a, base + b, base + c, base + d)?;
        }
        base += corners.len();
    }
    Ok(())
}

pub(super) fn write_ppm(
    path: &Utf8Path,
    width: u32,
    height: u32,
    items: &[RenderItem],
) -> Result<WriteSummary, KernelError> {
    let too_large = || KernelError::invalid(format!("image size {width}x{height} is too large"));
    let w = usize::try_from(width).map_err(|_| too_large())?;
    let h = usize::try_from(height).map_err(|_| too_large())?;
    let pixel_count = w.checked_mul(h).ok_or_else(too_large)?;
    let mut pixels = BACKGROUND.repeat(pixel_count);

    if let Some(view) = items
        .iter()
        .map(|item| item.bounds)
        .reduce(|acc, bounds| acc.union(&bounds))
    {
        let frame = Frame::fit(&view, width, height);
        for item in items {
            let [r, g, b, _] = item.color.map(to_byte);
            let (x0, y0, x1, y1) = frame.pixel_rect(&item.bounds);
            for row in y0..y1 {
                for col in x0..x1 {
                    let start = (row * w + col) * 3;
                    if let Some(pixel) = pixels.get_mut(start..start + 3) {
                        pixel.copy_from_slice(&[r, g, b]);
                    }
                }
            }
        }
    }

    let mut out = format!("P6\n{width} {height}\n255\n").into_bytes();
    out.extend_from_slice(&pixels);
    write_file(path, &out)
}

fn to_byte(channel: f64) -> u8 {
    let scaled = (channel.clamp(0.0, 1.0) * 255.0).round();
    (0..=u8::MAX)
        .find(|&byte| f64::from(byte) >= scaled)
        .unwrap_or(u8::MAX)
}

/// Maps the XY extent of the scene onto the image with a small margin.
struct Frame {
    origin: [f64; 2],
    scale: f64,
    width: u32,
    height: u32,
}

impl Frame {
    fn fit(view: &BoundingBox, width: u32, height: u32) -> Self {
        let [sx, sy, _] = view.size();
        let usable_w = f64::from(width) * (1.0 - 2.0 * MARGIN_RATIO);
        let usable_h = f64::from(height) * (1.0 - 2.0 * MARGIN_RATIO);
        let scale = match (sx > 0.0, sy > 0.0) {
            (true, true) => (usable_w / sx).min(usable_h / sy),
            (true, false) => usable_w / sx,
            (false, true) => usable_h / sy,
            (false, false) => 1.0,
        };
        let [min_x, min_y, _] = view.min;
        let [max_x, max_y, _] = view.max;
        let centre = [(min_x + max_x) / 2.0, (min_y + max_y) / 2.0];
        Self {
            origin: [
                centre[0] - f64::from(width) / (2.0 * scale),
                centre[1] - f64::from(height) / (2.0 * scale),
            ],
            scale,
            width,
            height,
        }
    }

    /// Pixel rectangle `(x0, y0, x1, y1)` covered by `bounds`, at least one
    /// pixel wide and tall.
    fn pixel_rect(&self, bounds: &BoundingBox) -> (usize, usize, usize, usize) {
        let [origin_x, origin_y] = self.origin;
        let to_col = |x: f64| pixel_index((x - origin_x) * self.scale, self.width);
        // Image rows grow downwards while world Y grows upwards.
        let to_row = |y: f64| self.height - pixel_index((y - origin_y) * self.scale, self.height);
        let (x0, x1) = (to_col(bounds.min[0]), to_col(bounds.max[0]));
        let (y0, y1) = (to_row(bounds.max[1]), to_row(bounds.min[1]));
        let x1 = x1.max(x0.saturating_add(1)).min(self.width);
        let y1 = y1.max(y0.saturating_add(1)).min(self.height);
        let widen = |value: u32| usize::try_from(value).unwrap_or(usize::MAX);
        (widen(x0), widen(y0), widen(x1), widen(y1))
    }
}

/// Rounds `value` to the nearest pixel index in `0..=limit`.
fn pixel_index(value: f64, limit: u32) -> u32 {
    let target = value.round();
    (0..=limit)
        .find(|&index| f64::from(index) >= target)
        .unwrap_or(limit)
}

fn io_error(path: &Utf8Path, source: io::Error) -> KernelError {
    KernelError::Io {
        path: path.to_owned(),
        source,
    }
}

fn write_file(path: &Utf8Path, contents: &[u8]) -> Result<WriteSummary, KernelError> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| io_error(path, source))?;
    }
    fs::write(path, contents).map_err(|source| io_error(path, source))?;
    Ok(WriteSummary {
        bytes: u64::try_from(contents.len()).unwrap_or(u64::MAX),
    })
}
