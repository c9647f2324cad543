use kurbo::{Affine, Point, Vec2};
use rayon::prelude::*;

use crate::adjust::model::EditingAdjustments;
use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::{Surface, TargetSize};
use crate::foundation::error::{FilmError, FilmResult};
use crate::render::blur::box_blur;

const PERSPECTIVE_STRENGTH: f64 = 0.35;
const K1_SCALE: f64 = 0.25;
const K2_SCALE: f64 = 0.10;

/// Resolved crop/rotate/scale/perspective/lens parameters for one source size.
///
/// The same plan drives the CPU executor and the GPU geometry uniforms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryPlan {
    pub(crate) src_w: u32,
    pub(crate) src_h: u32,
    pub(crate) out_w: u32,
    pub(crate) out_h: u32,
    pub(crate) flip_h: bool,
    pub(crate) flip_v: bool,
    /// `[x, y, w, h]` in the quarter-turned frame, normalized.
    pub(crate) crop: [f64; 4],
    pub(crate) quarter_turns: u8,
    /// Inverse rotation/scale about the turned frame's center, in turned-frame pixels.
    pub(crate) inverse: Affine,
    /// Keystone terms `[horizontal, vertical]` of the projective divisor.
    pub(crate) perspective: [f64; 2],
    pub(crate) k1: f64,
    pub(crate) k2: f64,
    /// Chromatic aberration radial shift in pixels at the frame corner `[red, blue]`.
    pub(crate) ca: [f64; 2],
}

impl GeometryPlan {
    /// Plan for a `src_w x src_h` oriented source. `max_dimension == 0` means unbounded.
    pub(crate) fn new(
        adj: &EditingAdjustments,
        src_w: u32,
        src_h: u32,
        target: TargetSize,
        max_dimension: u32,
    ) -> FilmResult<Self> {
        if src_w == 0 || src_h == 0 {
            return Err(FilmError::validation("geometry source has zero extent"));
        }
        let g = &adj.geometry;
        let quarter_turns = g.quarter_turns % 4;
        let (tw, th) = turned_size(src_w, src_h, quarter_turns);
        let crop = [
            f64::from(g.crop.x),
            f64::from(g.crop.y),
            f64::from(g.crop.width),
            f64::from(g.crop.height),
        ];
        let crop_w = (crop[2] * f64::from(tw)).round().max(1.0) as u32;
        let crop_h = (crop[3] * f64::from(th)).round().max(1.0) as u32;
        let (out_w, out_h) = output_size(crop_w, crop_h, target, max_dimension);

        let center = Vec2::new(f64::from(tw) * 0.5, f64::from(th) * 0.5);
        let scale = (f64::from(g.scale) / 100.0).max(0.01);
        let forward = Affine::translate(center)
            * Affine::rotate(f64::from(g.rotation).to_radians())
            * Affine::scale(scale)
            * Affine::translate(-center);

        let o = &adj.optics;
        let (k1, k2, ca) = if o.enabled {
            (
                f64::from(o.distortion) / 100.0 * K1_SCALE,
                f64::from(o.distortion_k2) / 100.0 * K2_SCALE,
                [
                    f64::from(o.chromatic_aberration.red),
                    f64::from(o.chromatic_aberration.blue),
                ],
            )
        } else {
            (0.0, 0.0, [0.0, 0.0])
        };

        Ok(Self {
            src_w,
            src_h,
            out_w,
            out_h,
            flip_h: g.flip_horizontal,
            flip_v: g.flip_vertical,
            crop,
            quarter_turns,
            inverse: forward.inverse(),
            perspective: [
                f64::from(g.perspective_horizontal) / 100.0 * PERSPECTIVE_STRENGTH,
                f64::from(g.perspective_vertical) / 100.0 * PERSPECTIVE_STRENGTH,
            ],
            k1,
            k2,
            ca,
        })
    }

    /// Whether the plan copies the source unchanged.
    pub(crate) fn is_identity(&self) -> bool {
        self.out_w == self.src_w
            && self.out_h == self.src_h
            && !self.flip_h
            && !self.flip_v
            && self.quarter_turns == 0
            && self.crop == [0.0, 0.0, 1.0, 1.0]
            && self.inverse == Affine::IDENTITY
            && self.perspective == [0.0, 0.0]
            && !self.has_lens()
    }

    pub(crate) fn has_lens(&self) -> bool {
        self.k1 != 0.0 || self.k2 != 0.0 || self.ca != [0.0, 0.0]
    }

    /// Source pixel position (before lens warp) seen by output pixel center `(x, y)`.
    pub(crate) fn map(&self, x: f64, y: f64) -> Point {
        let (tw, th) = turned_size(self.src_w, self.src_h, self.quarter_turns);
        let (tw, th) = (f64::from(tw), f64::from(th));

        let mut u = x / f64::from(self.out_w);
        let mut v = y / f64::from(self.out_h);
        if self.flip_h {
            u = 1.0 - u;
        }
        if self.flip_v {
            v = 1.0 - v;
        }
        let q = Point::new(
            (self.crop[0] + u * self.crop[2]) * tw,
            (self.crop[1] + v * self.crop[3]) * th,
        );
        let r = self.inverse * q;

        let nx = (r.x - tw * 0.5) / (tw * 0.5);
        let ny = (r.y - th * 0.5) / (th * 0.5);
        let w = (1.0 + self.perspective[0] * nx + self.perspective[1] * ny).max(0.05);
        let t = Point::new(tw * 0.5 * (1.0 + nx / w), th * 0.5 * (1.0 + ny / w));

        let (sw, sh) = (f64::from(self.src_w), f64::from(self.src_h));
        match self.quarter_turns {
            1 => Point::new(t.y, sh - t.x),
            2 => Point::new(sw - t.x, sh - t.y),
            3 => Point::new(sw - t.y, t.x),
            _ => t,
        }
    }

    /// Per-channel source positions `[red, green, blue]` after radial distortion and CA.
    fn lens(&self, p: Point) -> [Point; 3] {
        if !self.has_lens() {
            return [p; 3];
        }
        let c = Vec2::new(f64::from(self.src_w) * 0.5, f64::from(self.src_h) * 0.5);
        let half_diag = c.hypot().max(1.0);
        let d = (p.to_vec2() - c) / half_diag;
        let r2 = d.hypot2();
        let f = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
        let at = |shift_px: f64| {
            let k = f + shift_px / half_diag;
            (c + d * (k * half_diag)).to_point()
        };
        [at(self.ca[0]), at(0.0), at(self.ca[1])]
    }

    /// Run the plan on the CPU.
    pub(crate) fn execute(&self, src: &Surface, cancel: &CancellationToken) -> FilmResult<Surface> {
        let mut out = Surface::new(0, 0);
        self.execute_into(src, &mut out, cancel)?;
        Ok(out)
    }

    /// Run the plan on the CPU, writing every pixel of `out`.
    pub(crate) fn execute_into(
        &self,
        src: &Surface,
        out: &mut Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<()> {
        self.check_source(src)?;
        cancel.check()?;
        if self.is_identity() {
            out.copy_from(src);
            return Ok(());
        }

        let prefiltered;
        let src = match self.prefilter_radius() {
            0 => src,
            radius => {
                let data = box_blur(&src.data, src.width, src.height, 4, radius)?;
                prefiltered = Surface {
                    width: src.width,
                    height: src.height,
                    data,
                };
                &prefiltered
            }
        };

        out.reshape(self.out_w, self.out_h);
        let stride = self.out_w as usize * 4;
        out.data
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..self.out_w as usize {
                    let p = self.map(x as f64 + 0.5, y as f64 + 0.5);
                    let px = self.sample(src, p);
                    row[x * 4..x * 4 + 4].copy_from_slice(&px);
                }
            });
        cancel.check()
    }

    pub(crate) fn check_source(&self, src: &Surface) -> FilmResult<()> {
        if src.width != self.src_w || src.height != self.src_h {
            return Err(FilmError::validation(format!(
                "geometry planned for {}x{} but source is {}x{}",
                self.src_w, self.src_h, src.width, src.height
            )));
        }
        Ok(())
    }

    /// Output size `(width, height)`.
    pub fn output_size(&self) -> (u32, u32) {
        (self.out_w, self.out_h)
    }

    /// Source size the plan was built for.
    pub fn source_size(&self) -> (u32, u32) {
        (self.src_w, self.src_h)
    }

    fn sample(&self, src: &Surface, p: Point) -> [f32; 4] {
        let [pr, pg, pb] = self.lens(p);
        if !inside(src, pg) {
            return [0.0; 4];
        }
        let g = src.sample_bilinear(pg.x as f32, pg.y as f32);
        if pr == pg && pb == pg {
            return g;
        }
        let r = src.sample_bilinear(pr.x as f32, pr.y as f32);
        let b = src.sample_bilinear(pb.x as f32, pb.y as f32);
        [r[0], g[1], b[2], g[3]]
    }

    /// Blur radius that keeps large reductions from aliasing.
    pub(crate) fn prefilter_radius(&self) -> u32 {
        let (tw, th) = turned_size(self.src_w, self.src_h, self.quarter_turns);
        let crop_w = self.crop[2] * f64::from(tw);
        let crop_h = self.crop[3] * f64::from(th);
        let ratio = (crop_w / f64::from(self.out_w)).min(crop_h / f64::from(self.out_h));
        if ratio >= 2.0 {
            (ratio * 0.5).floor() as u32
        } else {
            0
        }
    }
}

fn inside(src: &Surface, p: Point) -> bool {
    p.x >= -0.5
        && p.y >= -0.5
        && p.x <= f64::from(src.width) + 0.5
        && p.y <= f64::from(src.height) + 0.5
}

pub(crate) fn turned_size(w: u32, h: u32, quarter_turns: u8) -> (u32, u32) {
    if quarter_turns % 2 == 1 { (h, w) } else { (w, h) }
}

/// Output size for a cropped frame of `crop_w x crop_h`.
pub(crate) fn output_size(
    crop_w: u32,
    crop_h: u32,
    target: TargetSize,
    max_dimension: u32,
) -> (u32, u32) {
    let (w, h) = match target {
        TargetSize::Source => (crop_w, crop_h),
        TargetSize::MaxDimension { max } => fit(crop_w, crop_h, max),
        TargetSize::Exact { width, height } => (width.max(1), height.max(1)),
    };
    if max_dimension > 0 && w.max(h) > max_dimension {
        fit(w, h, max_dimension)
    } else {
        (w, h)
    }
}

fn fit(w: u32, h: u32, max: u32) -> (u32, u32) {
    let longest = w.max(h);
    if max == 0 || longest <= max {
        return (w.max(1), h.max(1));
    }
    let k = f64::from(max) / f64::from(longest);
    (
        ((f64::from(w) * k).round() as u32).max(1),
        ((f64::from(h) * k).round() as u32).max(1),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/render/geometry.rs"]
mod tests;
