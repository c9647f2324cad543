use std::sync::Arc;

use rayon::prelude::*;

use crate::adjust::model::ToneCurve;
use crate::compile::keys::FilmSeeds;
use crate::film::lut::HaldLut;
use crate::film::model::{IDENTITY_MATRIX, ProfileMode, ResolvedRenderProfile, ToneResponse};
use crate::foundation::core::Surface;
use crate::foundation::math::{hash1, hash2, luma, mix, smoothstep};
use crate::render::passes::curve::apply_tone_regions;
use crate::render::passes::master::ToneControls;

pub(crate) const FADE_LIFT: f32 = 0.15;
const GRAIN_GAIN: f32 = 0.35;
pub(crate) const SHOULDER_KNEE: f32 = 0.7;
pub(crate) const TOE_KNEE: f32 = 0.3;
const LEAK_TINT: [f32; 3] = [1.0, 0.45, 0.15];
const MAX_DUST: f32 = 60.0;
const MAX_SCRATCHES: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GrainUniforms {
    pub(crate) amount: f32,
    /// Coarse noise cell size in output pixels.
    pub(crate) cell: f32,
    pub(crate) roughness: f32,
    pub(crate) color: f32,
    pub(crate) shadow_bias: f32,
    pub(crate) seed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DefectUniforms {
    pub(crate) strength: f32,
    pub(crate) leak_probability: f32,
    pub(crate) leak_strength: f32,
    pub(crate) dust_amount: f32,
    pub(crate) scratch_amount: f32,
    pub(crate) seed: u64,
}

/// Film pass uniforms: LUT, matrix, tone, color cast, fade, grain and defects.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilmUniforms {
    pub(crate) lut: Option<(Arc<HaldLut>, f32)>,
    pub(crate) matrix: Option<[f32; 9]>,
    pub(crate) tone: ToneControls,
    pub(crate) regions: ToneCurve,
    /// `[shoulder delta, toe delta, gamma]`, v2 profiles only.
    pub(crate) response: Option<[f32; 3]>,
    /// Shadow, midtone, highlight offsets.
    pub(crate) cast: Option<[[f32; 3]; 3]>,
    pub(crate) fade: f32,
    pub(crate) grain: Option<GrainUniforms>,
    pub(crate) defects: Option<DefectUniforms>,
}

impl FilmUniforms {
    /// `lut` is the decoded table for `profile.lut`, when there is one.
    pub(crate) fn fill(
        &mut self,
        profile: &ResolvedRenderProfile,
        fade: f32,
        seeds: FilmSeeds,
        lut: Option<Arc<HaldLut>>,
        size: (u32, u32),
    ) {
        let v2 = &profile.v2;
        self.lut = match (lut, &profile.lut) {
            (Some(table), Some(l)) if l.intensity > 0.0 => Some((table, l.intensity)),
            _ => None,
        };
        self.matrix = v2
            .color_matrix
            .filter(|m| m.enabled && m.matrix != IDENTITY_MATRIX)
            .map(|m| m.matrix);

        let t = &v2.tone_response;
        if t.enabled {
            self.tone = ToneControls {
                exposure: t.exposure,
                contrast: t.contrast,
                highlights: t.highlights,
                shadows: t.shadows,
                whites: t.whites,
                blacks: t.blacks,
            };
            self.regions = ToneCurve {
                highlights: t.curve[0],
                lights: t.curve[1],
                darks: t.curve[2],
                shadows: t.curve[3],
            };
            self.response = match profile.mode {
                ProfileMode::V2 => response_terms(t),
                ProfileMode::LegacyV1 => None,
            };
        } else {
            self.tone = ToneControls::default();
            self.regions = ToneCurve::default();
            self.response = None;
        }

        self.cast = v2
            .color_cast
            .filter(|c| c.enabled && !c.is_neutral())
            .map(|c| [c.shadows, c.midtones, c.highlights]);
        self.fade = fade / 100.0;

        let g = &v2.grain;
        let short = size.0.min(size.1) as f32;
        self.grain = (g.enabled && g.amount > 0.0).then(|| GrainUniforms {
            amount: g.amount,
            cell: (g.size * short / 1024.0).max(0.75),
            roughness: g.roughness,
            color: g.color,
            shadow_bias: g.shadow_bias,
            seed: seeds.grain,
        });
        self.defects = v2
            .defects
            .as_ref()
            .filter(|d| d.strength() > 0.0 && !d.params.is_neutral())
            .map(|d| DefectUniforms {
                strength: d.strength(),
                leak_probability: d.params.leak_probability,
                leak_strength: d.params.leak_strength,
                dust_amount: d.params.dust_amount,
                scratch_amount: d.params.scratch_amount,
                seed: seeds.defects,
            });
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.grade_is_identity() && self.grain.is_none() && self.defects.is_none()
    }

    /// Whether [`Self::grade_pixel`] returns its input unchanged.
    pub(crate) fn grade_is_identity(&self) -> bool {
        self.lut.is_none()
            && self.matrix.is_none()
            && self.tone.is_identity()
            && self.regions == ToneCurve::default()
            && self.response.is_none()
            && self.cast.is_none()
            && self.fade == 0.0
    }

    /// Color and tone part, independent of pixel position.
    pub(crate) fn grade_pixel(&self, px: [f32; 4]) -> [f32; 4] {
        let mut c = [px[0], px[1], px[2]];
        if let Some((lut, intensity)) = &self.lut {
            let graded = lut.sample(c);
            for k in 0..3 {
                c[k] = mix(c[k], graded[k], *intensity);
            }
        }
        if let Some(m) = &self.matrix {
            c = [
                m[0] * c[0] + m[1] * c[1] + m[2] * c[2],
                m[3] * c[0] + m[4] * c[1] + m[5] * c[2],
                m[6] * c[0] + m[7] * c[1] + m[8] * c[2],
            ];
        }
        c = self.tone.apply(c);
        if self.regions != ToneCurve::default() {
            c = c.map(|v| apply_tone_regions(v.clamp(0.0, 1.0), &self.regions));
        }
        if let Some([shoulder, toe, gamma]) = self.response {
            c = c.map(|v| tone_response(v.clamp(0.0, 1.0), shoulder, toe, gamma));
        }
        if let Some(cast) = &self.cast {
            let l = luma(c[0], c[1], c[2]).clamp(0.0, 1.0);
            let w_sh = 1.0 - smoothstep(0.0, 0.5, l);
            let w_hi = smoothstep(0.5, 1.0, l);
            let w_mid = (1.0 - w_sh - w_hi).max(0.0);
            for (k, v) in c.iter_mut().enumerate() {
                *v += w_sh * cast[0][k] + w_mid * cast[1][k] + w_hi * cast[2][k];
            }
        }
        if self.fade > 0.0 {
            let lift = self.fade * FADE_LIFT;
            c = c.map(|v| v * (1.0 - lift) + lift);
        }
        [
            c[0].clamp(0.0, 1.0),
            c[1].clamp(0.0, 1.0),
            c[2].clamp(0.0, 1.0),
            px[3],
        ]
    }

    pub(crate) fn apply(&self, s: &mut Surface) {
        s.data.par_chunks_mut(4).for_each(|px| {
            let out = self.grade_pixel([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&out);
        });
        self.apply_stochastic(s);
    }

    /// Grain and defects over an already graded surface. These are seeded per pixel
    /// position with 64-bit hashes, so backends without 64-bit integers run them here.
    pub(crate) fn apply_stochastic(&self, s: &mut Surface) {
        if let Some(g) = &self.grain {
            let w = s.width as usize;
            s.data
                .par_chunks_mut(w * 4)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, px) in row.chunks_exact_mut(4).enumerate() {
                        let out =
                            apply_grain([px[0], px[1], px[2], px[3]], x as u32, y as u32, g);
                        px.copy_from_slice(&out);
                    }
                });
        }
        if let Some(d) = &self.defects {
            apply_defects(s, d);
        }
    }
}

fn response_terms(t: &ToneResponse) -> Option<[f32; 3]> {
    let shoulder = t.shoulder - ToneResponse::DEFAULT_SHOULDER;
    let toe = t.toe - ToneResponse::DEFAULT_TOE;
    let gamma = t.gamma;
    if shoulder == 0.0 && toe == 0.0 && gamma == ToneResponse::DEFAULT_GAMMA {
        None
    } else {
        Some([shoulder, toe, gamma])
    }
}

/// Film characteristic curve relative to the neutral stock response. Shoulder and toe are
/// deltas from their defaults; both segments keep their endpoints fixed.
pub(crate) fn tone_response(x: f32, shoulder: f32, toe: f32, gamma: f32) -> f32 {
    let mut y = x.powf(1.0 / gamma.max(0.1));
    if shoulder != 0.0 && y > SHOULDER_KNEE {
        let u = (y - SHOULDER_KNEE) / (1.0 - SHOULDER_KNEE);
        let e = 1.0 / (1.0 + shoulder).max(0.2);
        y = SHOULDER_KNEE + (1.0 - SHOULDER_KNEE) * (1.0 - (1.0 - u).powf(e));
    }
    if toe != 0.0 && y < TOE_KNEE {
        let u = y / TOE_KNEE;
        let e = 1.0 / (1.0 + toe).max(0.2);
        y = TOE_KNEE * u.powf(e);
    }
    y
}

fn value_noise(x: f32, y: f32, seed: u64) -> f32 {
    let (x0, y0) = (x.floor(), y.floor());
    let (tx, ty) = (smoothstep(0.0, 1.0, x - x0), smoothstep(0.0, 1.0, y - y0));
    let (ix, iy) = (x0 as u32, y0 as u32);
    let a = hash2(ix, iy, seed);
    let b = hash2(ix + 1, iy, seed);
    let c = hash2(ix, iy + 1, seed);
    let d = hash2(ix + 1, iy + 1, seed);
    mix(mix(a, b, tx), mix(c, d, tx), ty)
}

/// Zero-mean grain sample for one channel.
fn grain_sample(x: u32, y: u32, g: &GrainUniforms, channel: u64) -> f32 {
    let seed = g.seed ^ channel.wrapping_mul(0x9E37_79B9);
    let coarse = value_noise(x as f32 / g.cell, y as f32 / g.cell, seed);
    let fine = hash2(x, y, seed ^ 0xF1F1);
    mix(coarse, fine, g.roughness) - 0.5
}

fn apply_grain(px: [f32; 4], x: u32, y: u32, g: &GrainUniforms) -> [f32; 4] {
    let l = luma(px[0], px[1], px[2]).clamp(0.0, 1.0);
    let weight = g.amount * GRAIN_GAIN * (1.0 + g.shadow_bias * (1.0 - l)) * 0.5;
    let mono = grain_sample(x, y, g, 0);
    let mut out = px;
    for k in 0..3 {
        let n = if g.color > 0.0 {
            mix(mono, grain_sample(x, y, g, k as u64 + 1), g.color)
        } else {
            mono
        };
        out[k] = (px[k] + n * weight).clamp(0.0, 1.0);
    }
    out
}

/// Seeded light leak, dust specks and vertical scratches.
fn apply_defects(s: &mut Surface, d: &DefectUniforms) {
    let (w, h) = (s.width as f32, s.height as f32);
    let short = w.min(h);
    let seed = d.seed;

    if hash1(0, seed) < d.leak_probability && d.leak_strength > 0.0 {
        let cx = if hash1(1, seed) < 0.5 { 0.0 } else { w };
        let cy = hash1(2, seed) * h;
        let radius = 0.6 * w.max(h);
        let k = d.strength * d.leak_strength;
        let width = s.width as usize;
        s.data
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let dx = x as f32 + 0.5 - cx;
                    let dy = y as f32 + 0.5 - cy;
                    let f = 1.0 - smoothstep(0.0, radius, (dx * dx + dy * dy).sqrt());
                    if f <= 0.0 {
                        continue;
                    }
                    for c in 0..3 {
                        let add = k * f * LEAK_TINT[c];
                        px[c] = 1.0 - (1.0 - px[c]) * (1.0 - add);
                    }
                }
            });
    }

    let specks = (d.dust_amount * MAX_DUST).round() as u64;
    for i in 0..specks {
        let cx = hash1(10 + 3 * i, seed) * w;
        let cy = hash1(11 + 3 * i, seed) * h;
        let r = (0.5 + 2.5 * hash1(12 + 3 * i, seed)) * (short / 1000.0).max(1.0);
        stamp(s, cx, cy, r, r, |px, f| {
            for v in &mut px[..3] {
                *v *= 1.0 - 0.6 * d.strength * f;
            }
        });
    }

    let scratches = (d.scratch_amount * MAX_SCRATCHES).round() as u64;
    for i in 0..scratches {
        let cx = hash1(200 + 2 * i, seed) * w;
        let half = (0.6 * (short / 1000.0)).max(0.6);
        let brightness = 0.15 + 0.2 * hash1(201 + 2 * i, seed);
        stamp(s, cx, h * 0.5, half, h * 0.5, |px, f| {
            for v in &mut px[..3] {
                *v = (*v + brightness * d.strength * f).min(1.0);
            }
        });
    }
}

/// Visit pixels inside an axis-aligned ellipse with a linear falloff weight.
fn stamp(s: &mut Surface, cx: f32, cy: f32, rx: f32, ry: f32, mut f: impl FnMut(&mut [f32], f32)) {
    let x0 = (cx - rx).floor().max(0.0) as u32;
    let x1 = ((cx + rx).ceil() as u32).min(s.width);
    let y0 = (cy - ry).floor().max(0.0) as u32;
    let y1 = ((cy + ry).ceil() as u32).min(s.height);
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = (x as f32 + 0.5 - cx) / rx.max(1e-3);
            let dy = (y as f32 + 0.5 - cy) / ry.max(1e-3);
            let d = (dx * dx + dy * dy).sqrt();
            if d >= 1.0 {
                continue;
            }
            let i = (y as usize * s.width as usize + x as usize) * 4;
            f(&mut s.data[i..i + 4], 1.0 - d);
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/render/film.rs"]
mod tests;
