use rayon::prelude::*;

use crate::adjust::model::{CurvePoint, EditingAdjustments, ToneCurve};
use crate::foundation::core::Surface;

pub(crate) const CURVE_LUT_SIZE: usize = 1024;
pub(crate) const REGION_GAIN: f32 = 0.25;

/// Four region bumps `(start, end)` for highlights, lights, darks, shadows.
pub(crate) const REGIONS: [(f32, f32); 4] = [(0.5, 1.0), (0.35, 0.85), (0.15, 0.65), (0.0, 0.5)];

/// Baked curve tables: one composite table and one per channel.
#[derive(Clone, Debug, PartialEq)]
pub struct CurveUniforms {
    /// `[r, g, b]` tables of [`CURVE_LUT_SIZE`] entries, composite already folded in.
    pub(crate) tables: [Vec<f32>; 3],
    pub(crate) identity: bool,
}

impl Default for CurveUniforms {
    fn default() -> Self {
        let ramp = identity_table();
        Self {
            tables: [ramp.clone(), ramp.clone(), ramp],
            identity: true,
        }
    }
}

impl CurveUniforms {
    /// Rebake tables in place; buffers are reused across frames.
    pub(crate) fn fill(&mut self, a: &EditingAdjustments) {
        let c = &a.curves;
        let tone = c.tone;
        let composite = CurveSpline::new(&c.rgb);
        let channels = [
            CurveSpline::new(&c.red),
            CurveSpline::new(&c.green),
            CurveSpline::new(&c.blue),
        ];
        self.identity = tone == ToneCurve::default()
            && composite.is_identity()
            && channels.iter().all(CurveSpline::is_identity);
        for (table, ch) in self.tables.iter_mut().zip(channels.iter()) {
            table.resize(CURVE_LUT_SIZE, 0.0);
            for (i, v) in table.iter_mut().enumerate() {
                let x = i as f32 / (CURVE_LUT_SIZE - 1) as f32;
                let t = apply_tone_regions(x, &tone);
                *v = ch.eval(composite.eval(t)).clamp(0.0, 1.0);
            }
        }
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.identity
    }

    pub(crate) fn apply_pixel(&self, px: [f32; 4]) -> [f32; 4] {
        [
            lookup(&self.tables[0], px[0]),
            lookup(&self.tables[1], px[1]),
            lookup(&self.tables[2], px[2]),
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

fn identity_table() -> Vec<f32> {
    (0..CURVE_LUT_SIZE)
        .map(|i| i as f32 / (CURVE_LUT_SIZE - 1) as f32)
        .collect()
}

/// Linear lookup into a table spanning `[0, 1]`.
pub(crate) fn lookup(table: &[f32], x: f32) -> f32 {
    let n = table.len();
    if n == 0 {
        return x;
    }
    let f = x.clamp(0.0, 1.0) * (n - 1) as f32;
    let i = (f.floor() as usize).min(n - 1);
    let j = (i + 1).min(n - 1);
    let t = f - i as f32;
    table[i] + (table[j] - table[i]) * t
}

/// Parametric region curve; each region adds a sine bump over its span.
pub(crate) fn apply_tone_regions(x: f32, tone: &ToneCurve) -> f32 {
    let amounts = [tone.highlights, tone.lights, tone.darks, tone.shadows];
    let mut y = x;
    for ((lo, hi), amount) in REGIONS.iter().zip(amounts) {
        if amount == 0.0 || x <= *lo || x >= *hi {
            continue;
        }
        let t = (x - lo) / (hi - lo);
        y += amount / 100.0 * REGION_GAIN * (t * std::f32::consts::PI).sin() * (hi - lo);
    }
    y.clamp(0.0, 1.0)
}

/// Monotone cubic (Fritsch-Carlson) through normalized control points.
pub(crate) struct CurveSpline {
    xs: Vec<f32>,
    ys: Vec<f32>,
    tangents: Vec<f32>,
}

impl CurveSpline {
    pub(crate) fn new(points: &[CurvePoint]) -> Self {
        let mut pts: Vec<CurvePoint> = points.to_vec();
        if pts.len() < 2 {
            pts = vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)];
        }
        let xs: Vec<f32> = pts.iter().map(|p| p.x).collect();
        let ys: Vec<f32> = pts.iter().map(|p| p.y).collect();
        let n = xs.len();
        let secants: Vec<f32> = (0..n - 1)
            .map(|i| {
                let dx = xs[i + 1] - xs[i];
                if dx <= 0.0 { 0.0 } else { (ys[i + 1] - ys[i]) / dx }
            })
            .collect();
        let mut tangents = vec![0.0f32; n];
        tangents[0] = secants[0];
        tangents[n - 1] = secants[n - 2];
        for i in 1..n - 1 {
            tangents[i] = if secants[i - 1] * secants[i] <= 0.0 {
                0.0
            } else {
                (secants[i - 1] + secants[i]) * 0.5
            };
        }
        for i in 0..n - 1 {
            let s = secants[i];
            if s == 0.0 {
                tangents[i] = 0.0;
                tangents[i + 1] = 0.0;
                continue;
            }
            let a = tangents[i] / s;
            let b = tangents[i + 1] / s;
            let h = a * a + b * b;
            if h > 9.0 {
                let k = 3.0 / h.sqrt();
                tangents[i] = k * a * s;
                tangents[i + 1] = k * b * s;
            }
        }
        Self { xs, ys, tangents }
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.xs.iter().zip(&self.ys).all(|(x, y)| x == y)
    }

    pub(crate) fn eval(&self, x: f32) -> f32 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        let i = self.xs.partition_point(|&v| v <= x).saturating_sub(1).min(n - 2);
        let h = self.xs[i + 1] - self.xs[i];
        if h <= 0.0 {
            return self.ys[i + 1];
        }
        let t = (x - self.xs[i]) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        h00 * self.ys[i]
            + h10 * h * self.tangents[i]
            + h01 * self.ys[i + 1]
            + h11 * h * self.tangents[i + 1]
    }
}
