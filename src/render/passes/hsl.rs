use rayon::prelude::*;

use crate::adjust::model::{EditingAdjustments, HslAdjustments};
use crate::foundation::core::Surface;
use crate::foundation::math::{hsl_to_rgb, rgb_to_hsl};

const HUE_SHIFT_DEG: f32 = 30.0;
const LUM_GAIN: f32 = 0.3;

/// Per-band `[hue°, saturation factor, luminance offset]`, in [`HslAdjustments::CENTERS`] order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HslUniforms {
    pub(crate) bands: [[f32; 3]; 8],
}

impl HslUniforms {
    pub(crate) fn fill(&mut self, a: &EditingAdjustments) {
        for (dst, band) in self.bands.iter_mut().zip(a.hsl.bands()) {
            *dst = [
                band.hue / 100.0 * HUE_SHIFT_DEG,
                band.saturation / 100.0,
                band.luminance / 100.0 * LUM_GAIN,
            ];
        }
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.bands == [[0.0; 3]; 8]
    }

    pub(crate) fn apply_pixel(&self, px: [f32; 4]) -> [f32; 4] {
        let (h, s, l) = rgb_to_hsl(
            px[0].clamp(0.0, 1.0),
            px[1].clamp(0.0, 1.0),
            px[2].clamp(0.0, 1.0),
        );
        if s <= 1e-6 {
            return px;
        }
        let [(i, wi), (j, wj)] = band_weights(h);
        let blend = |k: usize| wi * self.bands[i][k] + wj * self.bands[j][k];
        let h2 = h + blend(0);
        let s2 = (s * (1.0 + blend(1))).clamp(0.0, 1.0);
        // Luminance moves scale with chroma so neutrals stay put.
        let l2 = (l + blend(2) * s).clamp(0.0, 1.0);
        let (r, g, b) = hsl_to_rgb(h2, s2, l2);
        [r, g, b, px[3]]
    }

    pub(crate) fn apply(&self, s: &mut Surface) {
        s.data.par_chunks_mut(4).for_each(|px| {
            let out = self.apply_pixel([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&out);
        });
    }
}

/// The two bands bracketing `hue` with tent weights summing to one.
pub(crate) fn band_weights(hue: f32) -> [(usize, f32); 2] {
    let c = HslAdjustments::CENTERS;
    let h = hue.rem_euclid(360.0);
    for i in 0..c.len() {
        let j = (i + 1) % c.len();
        let lo = c[i];
        let hi = if j == 0 { 360.0 } else { c[j] };
        if h >= lo && h < hi {
            let t = (h - lo) / (hi - lo);
            return [(i, 1.0 - t), (j, t)];
        }
    }
    [(0, 1.0), (1, 0.0)]
}
