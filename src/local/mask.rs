use rayon::prelude::*;

use crate::adjust::model::{BrushPoint, LocalMask, MaskRange, MaskShape};
use crate::foundation::core::Surface;
use crate::foundation::error::{FilmError, FilmResult};
use crate::foundation::math::{hue_distance, luma, rgb_to_hsl, smoothstep};

/// Hue windows at least this wide accept every hue.
const FULL_HUE_RANGE: f32 = 179.999;
const SAT_EPSILON: f32 = 1e-4;
/// Smallest brush dab radius in pixels.
const MIN_DAB_RADIUS: f32 = 0.5;

/// Single-channel coverage in `[0, 1]`, one value per output pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskRaster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major coverage.
    pub alpha: Vec<f32>,
}

impl MaskRaster {
    /// Empty (fully transparent) mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0.0; width as usize * height as usize],
        }
    }

    /// Coverage at `(x, y)`.
    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.alpha[y as usize * self.width as usize + x as usize]
    }
}

/// Rasterize the mask shape at `width x height`, with `invert` applied.
pub fn rasterize_mask(mask: &LocalMask, width: u32, height: u32) -> MaskRaster {
    let mut m = MaskRaster::new(width, height);
    match &mask.shape {
        MaskShape::Brush {
            size,
            feather,
            flow,
            points,
        } => draw_brush(&mut m, *size, *feather, *flow, points),
        MaskShape::Radial {
            center_x,
            center_y,
            radius_x,
            radius_y,
            feather,
        } => {
            let (cx, cy) = (center_x * width as f32, center_y * height as f32);
            let rx = (radius_x * width as f32).max(MIN_DAB_RADIUS);
            let ry = (radius_y * height as f32).max(MIN_DAB_RADIUS);
            let inner = 1.0 - feather.clamp(0.0, 1.0);
            fill_rows(&mut m, |x, y| {
                let d = ((x - cx) / rx).hypot((y - cy) / ry);
                1.0 - smoothstep(inner, 1.0, d)
            });
        }
        MaskShape::Linear {
            start_x,
            start_y,
            end_x,
            end_y,
            feather,
        } => {
            let (sx, sy) = (start_x * width as f32, start_y * height as f32);
            let (dx, dy) = (end_x * width as f32 - sx, end_y * height as f32 - sy);
            let len2 = (dx * dx + dy * dy).max(1e-6);
            let f = feather.clamp(0.0, 1.0) * 0.5;
            fill_rows(&mut m, |x, y| {
                let t = ((x - sx) * dx + (y - sy) * dy) / len2;
                1.0 - smoothstep(0.5 - f, 0.5 + f, t)
            });
        }
    }
    if mask.invert {
        m.alpha.par_iter_mut().for_each(|a| *a = 1.0 - *a);
    }
    m
}

fn fill_rows(m: &mut MaskRaster, f: impl Fn(f32, f32) -> f32 + Sync) {
    let w = m.width as usize;
    if w == 0 {
        return;
    }
    m.alpha.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, a) in row.iter_mut().enumerate() {
            *a = f(x as f32 + 0.5, y as f32 + 0.5).clamp(0.0, 1.0);
        }
    });
}

/// Stamp one radial dab per point, accumulated with source-over.
fn draw_brush(m: &mut MaskRaster, size: f32, feather: f32, flow: f32, points: &[BrushPoint]) {
    let (w, h) = (m.width as f32, m.height as f32);
    let base_radius = size * w.min(h) * 0.5;
    let inner = 1.0 - feather.clamp(0.0, 1.0);
    for p in points {
        let pressure = p.pressure.clamp(0.0, 1.0);
        let r = (base_radius * pressure).max(MIN_DAB_RADIUS);
        let opacity = (flow * pressure).clamp(0.0, 1.0);
        if opacity <= 0.0 {
            continue;
        }
        let (cx, cy) = (p.x * w, p.y * h);
        let x0 = (cx - r).floor().max(0.0) as u32;
        let y0 = (cy - r).floor().max(0.0) as u32;
        let x1 = ((cx + r).ceil().max(0.0) as u32).min(m.width);
        let y1 = ((cy + r).ceil().max(0.0) as u32).min(m.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let d = (x as f32 + 0.5 - cx).hypot(y as f32 + 0.5 - cy) / r;
                let s = opacity * (1.0 - smoothstep(inner, 1.0, d));
                let a = &mut m.alpha[y as usize * m.width as usize + x as usize];
                *a += s * (1.0 - *a);
            }
        }
    }
}

/// Whether `range` restricts anything. When it does not, refinement is skipped entirely.
pub fn range_is_active(range: &MaskRange) -> bool {
    luma_range_is_active(range) || hue_sat_range_is_active(range)
}

fn luma_range_is_active(range: &MaskRange) -> bool {
    range.luma_min > 0.0 || range.luma_max < 1.0
}

fn hue_sat_range_is_active(range: &MaskRange) -> bool {
    range.hue_range < FULL_HUE_RANGE || range.sat_min > SAT_EPSILON
}

/// Luma and hue/saturation acceptance of one display-encoded color.
pub fn range_weight(range: &MaskRange, rgb: [f32; 3]) -> f32 {
    let mut w = 1.0;
    if luma_range_is_active(range) {
        let l = luma(rgb[0], rgb[1], rgb[2]).clamp(0.0, 1.0);
        let f = range.luma_feather.max(0.0);
        if l < range.luma_min {
            w *= smoothstep(range.luma_min - f, range.luma_min, l);
        } else if l > range.luma_max {
            w *= 1.0 - smoothstep(range.luma_max, range.luma_max + f, l);
        }
    }
    if hue_sat_range_is_active(range) {
        let (hue, sat, _) = rgb_to_hsl(rgb[0], rgb[1], rgb[2]);
        if range.hue_range < FULL_HUE_RANGE {
            let d = hue_distance(hue, range.hue_center);
            if d > range.hue_range {
                w *= 1.0
                    - smoothstep(
                        range.hue_range,
                        range.hue_range + range.hue_feather.max(0.0),
                        d,
                    );
            }
        }
        if range.sat_min > SAT_EPSILON {
            w *= smoothstep(range.sat_min - range.sat_feather.max(0.0), range.sat_min, sat);
        }
    }
    w
}

/// Multiply the mask by the range weight of the matching `base` pixel.
pub fn refine_mask(mask: &mut MaskRaster, range: &MaskRange, base: &Surface) -> FilmResult<()> {
    if mask.width != base.width || mask.height != base.height {
        return Err(FilmError::validation(format!(
            "mask {}x{} does not match base {}x{}",
            mask.width, mask.height, base.width, base.height
        )));
    }
    if !range_is_active(range) {
        return Ok(());
    }
    mask.alpha
        .par_iter_mut()
        .zip(base.data.par_chunks_exact(4))
        .for_each(|(a, px)| {
            if *a > 0.0 {
                *a *= range_weight(range, [px[0], px[1], px[2]]);
            }
        });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/local/mask.rs"]
mod tests;
