use rayon::prelude::*;

use crate::adjust::model::{ColorGrading, EditingAdjustments, GradeWheel};
use crate::foundation::core::Surface;
use crate::foundation::math::{hsl_to_rgb, linear_to_srgb, luma, smoothstep, srgb_to_linear};

/// Stops of exposure at slider `+100`.
pub(crate) const EXPOSURE_STOPS: f32 = 3.0;
pub(crate) const TONE_MASK_GAIN: f32 = 0.25;
const WB_GAIN: f32 = 0.12;
const TINT_GAIN: f32 = 0.08;
const GRADE_TINT: f32 = 0.2;
const GRADE_LUMA: f32 = 0.15;

/// Exposure, contrast and the four luminance-masked tone controls.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct ToneControls {
    pub(crate) exposure: f32,
    pub(crate) contrast: f32,
    pub(crate) highlights: f32,
    pub(crate) shadows: f32,
    pub(crate) whites: f32,
    pub(crate) blacks: f32,
}

impl ToneControls {
    pub(crate) fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to display-encoded RGB. Exposure runs in linear light.
    pub(crate) fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut c = rgb;
        if self.exposure != 0.0 {
            let gain = (self.exposure / 100.0 * EXPOSURE_STOPS).exp2();
            for v in &mut c {
                *v = linear_to_srgb(srgb_to_linear(*v) * gain);
            }
        }
        if self.contrast != 0.0 {
            let k = 1.0 + self.contrast / 100.0;
            for v in &mut c {
                *v = (*v - 0.5) * k + 0.5;
            }
        }
        if self.highlights != 0.0 || self.shadows != 0.0 || self.whites != 0.0 || self.blacks != 0.0
        {
            let l = luma(c[0], c[1], c[2]).clamp(0.0, 1.0);
            let hl = smoothstep(0.5, 1.0, l);
            let sh = 1.0 - smoothstep(0.0, 0.5, l);
            let wh = smoothstep(0.75, 1.0, l);
            let bl = 1.0 - smoothstep(0.0, 0.25, l);
            let delta = (self.highlights * hl + self.shadows * sh + self.whites * wh
                + self.blacks * bl)
                / 100.0
                * TONE_MASK_GAIN;
            for v in &mut c {
                *v += delta;
            }
        }
        c
    }
}

/// Resolved master pass uniforms.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MasterUniforms {
    pub(crate) tone: ToneControls,
    /// Linear-light channel gains from temperature and tint.
    pub(crate) wb: [f32; 3],
    pub(crate) saturation: f32,
    pub(crate) vibrance: f32,
    /// Per-zone `[r, g, b]` offsets for shadows, midtones, highlights.
    pub(crate) grade: [[f32; 3]; 3],
    /// Zone split point and overlap width.
    pub(crate) grade_pivot: f32,
    pub(crate) grade_width: f32,
}

impl MasterUniforms {
    pub(crate) fn fill(&mut self, a: &EditingAdjustments) {
        self.tone = ToneControls {
            exposure: a.exposure,
            contrast: a.contrast,
            highlights: a.highlights,
            shadows: a.shadows,
            whites: a.whites,
            blacks: a.blacks,
        };
        self.wb = white_balance_gains(a.temperature, a.tint);
        self.saturation = a.saturation / 100.0;
        self.vibrance = a.vibrance / 100.0;
        let cg: &ColorGrading = &a.color_grading;
        self.grade = [
            wheel_offset(&cg.shadows),
            wheel_offset(&cg.midtones),
            wheel_offset(&cg.highlights),
        ];
        self.grade_pivot = 0.5 + cg.balance / 100.0 * 0.25;
        self.grade_width = 0.05 + cg.blend / 100.0 * 0.4;
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.tone.is_identity()
            && self.wb == [1.0; 3]
            && self.saturation == 0.0
            && self.vibrance == 0.0
            && self.grade == [[0.0; 3]; 3]
    }

    pub(crate) fn apply_pixel(&self, px: [f32; 4]) -> [f32; 4] {
        let mut c = [px[0], px[1], px[2]];
        if self.wb != [1.0; 3] {
            for (v, g) in c.iter_mut().zip(self.wb) {
                *v = linear_to_srgb(srgb_to_linear(*v) * g);
            }
        }
        c = self.tone.apply(c);
        if self.saturation != 0.0 || self.vibrance != 0.0 {
            c = saturate(c, self.saturation, self.vibrance);
        }
        if self.grade != [[0.0; 3]; 3] {
            let l = luma(c[0], c[1], c[2]).clamp(0.0, 1.0);
            let w_sh = 1.0 - smoothstep(self.grade_pivot - self.grade_width, self.grade_pivot, l);
            let w_hi = smoothstep(self.grade_pivot, self.grade_pivot + self.grade_width, l);
            let w_mid = (1.0 - w_sh - w_hi).max(0.0);
            for (i, v) in c.iter_mut().enumerate() {
                *v += w_sh * self.grade[0][i] + w_mid * self.grade[1][i] + w_hi * self.grade[2][i];
            }
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
            let out = self.apply_pixel([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&out);
        });
    }
}

/// Linear-light gains; temperature warms (red up, blue down), tint adds magenta.
pub(crate) fn white_balance_gains(temperature: f32, tint: f32) -> [f32; 3] {
    let t = temperature / 100.0;
    let m = tint / 100.0;
    [
        (1.0 + WB_GAIN * t) * (1.0 + TINT_GAIN * 0.5 * m),
        1.0 - TINT_GAIN * m,
        (1.0 - WB_GAIN * t) * (1.0 + TINT_GAIN * 0.5 * m),
    ]
}

/// Global saturation plus vibrance, which favors muted pixels.
pub(crate) fn saturate(c: [f32; 3], saturation: f32, vibrance: f32) -> [f32; 3] {
    let l = luma(c[0], c[1], c[2]);
    let chroma = c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2]);
    let k = (1.0 + saturation) * (1.0 + vibrance * (1.0 - chroma.clamp(0.0, 1.0)));
    [
        l + (c[0] - l) * k,
        l + (c[1] - l) * k,
        l + (c[2] - l) * k,
    ]
}

fn wheel_offset(w: &GradeWheel) -> [f32; 3] {
    let lum = w.luminance / 100.0 * GRADE_LUMA;
    if w.saturation == 0.0 {
        return [lum; 3];
    }
    let (r, g, b) = hsl_to_rgb(w.hue, 1.0, 0.5);
    let k = w.saturation / 100.0 * GRADE_TINT;
    [
        (r - 0.5) * k + lum,
        (g - 0.5) * k + lum,
        (b - 0.5) * k + lum,
    ]
}
