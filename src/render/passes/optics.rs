use rayon::prelude::*;

use crate::adjust::model::EditingAdjustments;
use crate::film::model::ResolvedRenderProfile;
use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::Surface;
use crate::foundation::error::FilmResult;
use crate::foundation::math::{luma, smoothstep};
use crate::render::blur::box_blur_n;

pub(crate) const VIGNETTE_CORRECTION_GAIN: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct GlowUniforms {
    pub(crate) threshold: f32,
    pub(crate) amount: f32,
    /// Fraction of the shorter edge.
    pub(crate) radius: f32,
    pub(crate) tint: [f32; 3],
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct VignetteUniforms {
    pub(crate) amount: f32,
    pub(crate) midpoint: f32,
    pub(crate) roundness: f32,
    pub(crate) feather: f32,
}

/// Halation, bloom, creative vignette and lens vignette correction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OpticsUniforms {
    pub(crate) halation: Option<GlowUniforms>,
    pub(crate) bloom: Option<GlowUniforms>,
    pub(crate) vignette: Option<VignetteUniforms>,
    pub(crate) correction: f32,
}

impl OpticsUniforms {
    pub(crate) fn fill(&mut self, a: &EditingAdjustments, profile: &ResolvedRenderProfile) {
        let v2 = &profile.v2;
        let h = &v2.halation;
        self.halation = (h.enabled && h.amount > 0.0).then_some(GlowUniforms {
            threshold: h.threshold,
            amount: h.amount,
            radius: h.radius,
            tint: h.tint,
        });
        let b = &v2.bloom;
        self.bloom = (b.enabled && b.amount > 0.0).then_some(GlowUniforms {
            threshold: b.threshold,
            amount: b.amount,
            radius: b.radius,
            tint: [1.0; 3],
        });
        let v = &v2.vignette;
        self.vignette = (v.enabled && v.amount != 0.0).then_some(VignetteUniforms {
            amount: v.amount,
            midpoint: v.midpoint,
            roundness: v.roundness,
            feather: v.feather,
        });
        self.correction = if a.optics.enabled {
            a.optics.vignette_correction / 100.0
        } else {
            0.0
        };
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.halation.is_none()
            && self.bloom.is_none()
            && self.vignette.is_none()
            && self.correction == 0.0
    }

    /// Blurred halation and bloom sources, RGB per pixel.
    pub(crate) fn glow_maps(
        &self,
        src: &Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<(Option<Vec<f32>>, Option<Vec<f32>>)> {
        let short = src.width.min(src.height) as f32;
        let halo = match &self.halation {
            Some(g) => Some(glow_map(src, g, short, true)?),
            None => None,
        };
        cancel.check()?;
        let bloom = match &self.bloom {
            Some(g) => Some(glow_map(src, g, short, false)?),
            None => None,
        };
        cancel.check()?;
        Ok((halo, bloom))
    }

    pub(crate) fn apply(&self, src: &Surface, cancel: &CancellationToken) -> FilmResult<Surface> {
        let (w, h) = (src.width, src.height);
        let (halo, bloom) = self.glow_maps(src, cancel)?;

        let mut out = src.clone();
        let stride = w as usize * 4;
        out.data
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let i = (y * w as usize + x) * 3;
                    let mut c = [px[0], px[1], px[2]];
                    for (map, glow) in [(&halo, &self.halation), (&bloom, &self.bloom)] {
                        if let (Some(m), Some(g)) = (map, glow) {
                            for k in 0..3 {
                                let add = (m[i + k] * g.amount).clamp(0.0, 1.0);
                                c[k] = 1.0 - (1.0 - c[k]) * (1.0 - add);
                            }
                        }
                    }
                    let (nx, ny) = (
                        (x as f32 + 0.5) / w as f32 * 2.0 - 1.0,
                        (y as f32 + 0.5) / h as f32 * 2.0 - 1.0,
                    );
                    if self.correction != 0.0 {
                        let r2 = (nx * nx + ny * ny) * 0.5;
                        let k = 1.0 + self.correction * VIGNETTE_CORRECTION_GAIN * r2;
                        c = c.map(|v| v * k);
                    }
                    if let Some(v) = &self.vignette {
                        let m = vignette_mask(nx, ny, w as f32 / h as f32, v);
                        c = if v.amount < 0.0 {
                            c.map(|ch| ch * (1.0 + v.amount * m))
                        } else {
                            c.map(|ch| ch + (1.0 - ch) * v.amount * m)
                        };
                    }
                    px[0] = c[0].clamp(0.0, 1.0);
                    px[1] = c[1].clamp(0.0, 1.0);
                    px[2] = c[2].clamp(0.0, 1.0);
                }
            });
        Ok(out)
    }
}

/// Blurred RGB glow source: a smoothstep luminance threshold, tinted for halation or
/// carrying the pixel color for bloom.
fn glow_map(src: &Surface, g: &GlowUniforms, short: f32, tinted: bool) -> FilmResult<Vec<f32>> {
    let mut map = vec![0.0f32; src.data.len() / 4 * 3];
    map.par_chunks_mut(3)
        .zip(src.data.par_chunks(4))
        .for_each(|(m, p)| {
            let l = luma(p[0], p[1], p[2]);
            let k = smoothstep(g.threshold, 1.0, l) * p[3];
            for c in 0..3 {
                m[c] = if tinted { k * g.tint[c] } else { k * p[c] };
            }
        });
    let radius = (g.radius * short).round().max(1.0) as u32;
    box_blur_n(&map, src.width, src.height, 3, radius, 3)
}

/// Zero inside `midpoint`, rising to one toward the corners.
fn vignette_mask(nx: f32, ny: f32, aspect: f32, v: &VignetteUniforms) -> f32 {
    // roundness +1 is circular in pixel space, -1 follows the frame's aspect.
    let t = (v.roundness + 1.0) * 0.5;
    let sx = 1.0 + (aspect.max(1.0) - 1.0) * t;
    let sy = 1.0 + ((1.0 / aspect).max(1.0) - 1.0) * t;
    let d = ((nx * sx).powi(2) + (ny * sy).powi(2)).sqrt() / (sx * sx + sy * sy).sqrt();
    let inner = v.midpoint.clamp(0.0, 1.0);
    let outer = (inner + v.feather.max(0.01)).min(1.5);
    smoothstep(inner, outer, d)
}
