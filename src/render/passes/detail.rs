use rayon::prelude::*;

use crate::adjust::model::EditingAdjustments;
use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::Surface;
use crate::foundation::error::FilmResult;
use crate::foundation::math::{luma, mix, smoothstep};
use crate::render::blur::box_blur_n;

const TEXTURE_RADIUS: u32 = 2;
const TEXTURE_GAIN: f32 = 0.6;
const CLARITY_FRACTION: f32 = 0.015;
const CLARITY_GAIN: f32 = 0.5;
const HAZE_FRACTION: f32 = 0.05;
const DEHAZE_GAIN: f32 = 0.35;
const SHARPEN_GAIN: f32 = 1.2;
const NR_RADIUS: u32 = 2;

/// Detail pass uniforms. Sliders are pre-scaled to `[-1, 1]` / `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DetailUniforms {
    pub(crate) texture: f32,
    pub(crate) clarity: f32,
    pub(crate) dehaze: f32,
    pub(crate) sharpening: f32,
    pub(crate) sharpen_radius: f32,
    pub(crate) noise_reduction: f32,
    pub(crate) color_noise_reduction: f32,
}

impl DetailUniforms {
    pub(crate) fn fill(&mut self, a: &EditingAdjustments) {
        *self = Self {
            texture: a.texture / 100.0,
            clarity: a.clarity / 100.0,
            dehaze: a.dehaze / 100.0,
            sharpening: a.sharpening / 100.0,
            sharpen_radius: a.sharpen_radius,
            noise_reduction: a.noise_reduction / 100.0,
            color_noise_reduction: a.color_noise_reduction / 100.0,
        };
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.texture == 0.0
            && self.clarity == 0.0
            && self.dehaze == 0.0
            && self.sharpening == 0.0
            && self.noise_reduction == 0.0
            && self.color_noise_reduction == 0.0
    }

    /// Run on the CPU. Every step works on the luma plane except color noise reduction,
    /// which smooths chroma.
    pub(crate) fn apply(&self, src: &Surface, cancel: &CancellationToken) -> FilmResult<Surface> {
        let (w, h) = (src.width, src.height);
        let short = w.min(h) as f32;
        let lum: Vec<f32> = src
            .data
            .par_chunks(4)
            .map(|p| luma(p[0], p[1], p[2]))
            .collect();
        let mut out_l = lum.clone();

        if self.noise_reduction > 0.0 {
            let blurred = box_blur_n(&lum, w, h, 1, NR_RADIUS, 2)?;
            for (o, b) in out_l.iter_mut().zip(&blurred) {
                *o = mix(*o, *b, self.noise_reduction);
            }
        }
        cancel.check()?;
        if self.texture != 0.0 {
            let blurred = box_blur_n(&lum, w, h, 1, TEXTURE_RADIUS, 1)?;
            for ((o, l), b) in out_l.iter_mut().zip(&lum).zip(&blurred) {
                *o += self.texture * TEXTURE_GAIN * (l - b);
            }
        }
        if self.clarity != 0.0 {
            let radius = ((short * CLARITY_FRACTION) as u32).max(2);
            let blurred = box_blur_n(&lum, w, h, 1, radius, 3)?;
            for ((o, l), b) in out_l.iter_mut().zip(&lum).zip(&blurred) {
                let mid = 1.0 - (2.0 * l - 1.0).abs();
                *o += self.clarity * CLARITY_GAIN * mid * (l - b);
            }
        }
        cancel.check()?;
        if self.sharpening > 0.0 {
            let radius = self.sharpen_radius.round().max(1.0) as u32;
            let blurred = box_blur_n(&lum, w, h, 1, radius, 2)?;
            for ((o, l), b) in out_l.iter_mut().zip(&lum).zip(&blurred) {
                *o += self.sharpening * SHARPEN_GAIN * (l - b);
            }
        }

        let airlight = if self.dehaze != 0.0 {
            let radius = ((short * HAZE_FRACTION) as u32).max(4);
            Some(box_blur_n(&lum, w, h, 1, radius, 2)?)
        } else {
            None
        };
        let chroma = if self.color_noise_reduction > 0.0 {
            let mut c = vec![0.0f32; src.data.len() / 4 * 3];
            for (dst, (p, l)) in c.chunks_exact_mut(3).zip(src.data.chunks_exact(4).zip(&lum)) {
                dst[0] = p[0] - l;
                dst[1] = p[1] - l;
                dst[2] = p[2] - l;
            }
            let blurred = box_blur_n(&c, w, h, 3, NR_RADIUS * 2, 2)?;
            Some((c, blurred))
        } else {
            None
        };
        cancel.check()?;

        let mut out = src.clone();
        let dehaze = self.dehaze;
        let cnr = self.color_noise_reduction;
        out.data
            .par_chunks_mut(4)
            .enumerate()
            .for_each(|(i, px)| {
                let delta = out_l[i] - lum[i];
                let mut c = [px[0] + delta, px[1] + delta, px[2] + delta];
                if let Some((raw, smooth)) = &chroma {
                    let l = luma(c[0], c[1], c[2]);
                    for k in 0..3 {
                        let ch = mix(raw[i * 3 + k], smooth[i * 3 + k], cnr);
                        c[k] = l + ch;
                    }
                }
                if let Some(air) = &airlight {
                    c = apply_dehaze(c, air[i], dehaze);
                }
                px[0] = c[0].clamp(0.0, 1.0);
                px[1] = c[1].clamp(0.0, 1.0);
                px[2] = c[2].clamp(0.0, 1.0);
            });
        Ok(out)
    }
}

/// Positive values subtract the local veil and restore contrast; negative values add haze.
fn apply_dehaze(c: [f32; 3], airlight: f32, amount: f32) -> [f32; 3] {
    let veil = smoothstep(0.2, 0.9, airlight) * DEHAZE_GAIN;
    if amount > 0.0 {
        let t = 1.0 - veil * amount;
        let a = airlight * veil * amount;
        c.map(|v| (v - a) / t.max(0.1))
    } else {
        let k = -amount * DEHAZE_GAIN;
        c.map(|v| mix(v, airlight.max(0.6), k))
    }
}
