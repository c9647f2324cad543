//! Kernel table and uniform packing. Each `pack_*` mirrors the row layout its WGSL body reads.

use crate::adjust::model::{HslAdjustments, ToneCurve};
use crate::render::geometry::GeometryPlan;
use crate::render::passes::film::FADE_LIFT;
use crate::render::passes::master::{EXPOSURE_STOPS, TONE_MASK_GAIN, ToneControls};
use crate::render::passes::optics::VIGNETTE_CORRECTION_GAIN;
use crate::render::passes::{
    CurveUniforms, FilmUniforms, HslUniforms, MasterUniforms, OpticsUniforms,
};

use super::shaders;

/// Mirrors `Params` in the WGSL prelude. `grid` is filled at dispatch.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct KernelParams {
    pub(super) grid: [u32; 4],
    pub(super) info: [u32; 4],
    pub(super) v: [[f32; 4]; 16],
}

impl KernelParams {
    fn new() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Kernel {
    Geometry,
    Master,
    Hsl,
    Curve,
    FilmGrade,
    Optics,
}

impl Kernel {
    pub(super) const ALL: [Kernel; 6] = [
        Kernel::Geometry,
        Kernel::Master,
        Kernel::Hsl,
        Kernel::Curve,
        Kernel::FilmGrade,
        Kernel::Optics,
    ];

    pub(super) fn index(self) -> usize {
        self as usize
    }

    pub(super) fn label(self) -> &'static str {
        match self {
            Kernel::Geometry => "filmlab_geometry",
            Kernel::Master => "filmlab_master",
            Kernel::Hsl => "filmlab_hsl",
            Kernel::Curve => "filmlab_curve",
            Kernel::FilmGrade => "filmlab_film_grade",
            Kernel::Optics => "filmlab_optics",
        }
    }

    /// Full WGSL source: shared constants, prelude, then the kernel body.
    pub(super) fn source(self) -> String {
        let body = match self {
            Kernel::Geometry => shaders::GEOMETRY,
            Kernel::Master => shaders::MASTER,
            Kernel::Hsl => shaders::HSL,
            Kernel::Curve => shaders::CURVE,
            Kernel::FilmGrade => shaders::FILM_GRADE,
            Kernel::Optics => shaders::OPTICS,
        };
        let mut src = shaders::constants();
        src.push_str(shaders::PRELUDE);
        src.push_str(body);
        src
    }
}

fn flag(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

fn row3(v: [f32; 3]) -> [f32; 4] {
    [v[0], v[1], v[2], 0.0]
}

fn tone_rows(t: &ToneControls) -> [[f32; 4]; 2] {
    let gain = (t.exposure / 100.0 * EXPOSURE_STOPS).exp2();
    let contrast = 1.0 + t.contrast / 100.0;
    let weight = |v: f32| v / 100.0 * TONE_MASK_GAIN;
    [
        [gain, contrast, weight(t.highlights), weight(t.shadows)],
        [
            weight(t.whites),
            weight(t.blacks),
            flag(t.exposure != 0.0),
            flag(t.contrast != 0.0),
        ],
    ]
}

pub(super) fn pack_master(u: &MasterUniforms) -> KernelParams {
    let mut p = KernelParams::new();
    p.v[0] = [u.wb[0], u.wb[1], u.wb[2], flag(u.wb != [1.0; 3])];
    let [t0, t1] = tone_rows(&u.tone);
    p.v[1] = t0;
    p.v[2] = t1;
    p.v[3] = [u.saturation, u.vibrance, u.grade_pivot, u.grade_width];
    for (row, zone) in p.v[4..7].iter_mut().zip(u.grade) {
        *row = row3(zone);
    }
    p.v[4][3] = flag(u.grade != [[0.0; 3]; 3]);
    p
}

pub(super) fn pack_hsl(u: &HslUniforms) -> KernelParams {
    let mut p = KernelParams::new();
    for (row, band) in p.v.iter_mut().zip(u.bands) {
        *row = row3(band);
    }
    let c = HslAdjustments::CENTERS;
    p.v[8] = [c[0], c[1], c[2], c[3]];
    p.v[9] = [c[4], c[5], c[6], c[7]];
    p
}

/// Params plus the three tables laid end to end.
pub(super) fn pack_curve(u: &CurveUniforms) -> (KernelParams, Vec<f32>) {
    let mut p = KernelParams::new();
    p.info[0] = u.tables[0].len() as u32;
    (p, u.tables.concat())
}

/// Params plus the LUT cube, borrowed from `u`. Grain and defects are not packed.
pub(super) fn pack_film_grade(u: &FilmUniforms) -> (KernelParams, &[f32]) {
    let mut p = KernelParams::new();
    let mut cube: &[f32] = &[];
    if let Some((lut, intensity)) = &u.lut {
        p.info[0] = lut.size() as u32;
        p.v[0][0] = *intensity;
        cube = bytemuck::cast_slice(lut.entries());
    }
    if let Some(m) = &u.matrix {
        p.v[0][1] = 1.0;
        p.v[1] = [m[0], m[1], m[2], 0.0];
        p.v[2] = [m[3], m[4], m[5], 0.0];
        p.v[3] = [m[6], m[7], m[8], 0.0];
    }
    let [t0, t1] = tone_rows(&u.tone);
    p.v[4] = t0;
    p.v[5] = t1;
    let r = &u.regions;
    p.v[6] = [r.highlights, r.lights, r.darks, r.shadows];
    p.v[7][0] = flag(u.regions != ToneCurve::default());
    if let Some([shoulder, toe, gamma]) = u.response {
        p.v[0][2] = 1.0;
        p.v[7][1] = shoulder;
        p.v[7][2] = toe;
        p.v[7][3] = gamma;
    }
    if let Some(cast) = &u.cast {
        p.v[0][3] = 1.0;
        for (row, zone) in p.v[8..11].iter_mut().zip(cast) {
            *row = row3(*zone);
        }
    }
    p.v[11][0] = u.fade * FADE_LIFT;
    (p, cube)
}

/// Params plus the glow maps laid end to end: halation first, then bloom.
pub(super) fn pack_optics(
    u: &OpticsUniforms,
    halo: Option<&[f32]>,
    bloom: Option<&[f32]>,
) -> (KernelParams, Vec<f32>) {
    let mut p = KernelParams::new();
    let mut maps = Vec::with_capacity(halo.map_or(0, <[f32]>::len) + bloom.map_or(0, <[f32]>::len));
    if let (Some(map), Some(g)) = (halo, &u.halation) {
        p.info[0] = maps.len() as u32;
        p.info[2] = 1;
        p.v[0][0] = g.amount;
        maps.extend_from_slice(map);
    }
    if let (Some(map), Some(g)) = (bloom, &u.bloom) {
        p.info[1] = maps.len() as u32;
        p.info[3] = 1;
        p.v[0][1] = g.amount;
        maps.extend_from_slice(map);
    }
    p.v[0][2] = u.correction * VIGNETTE_CORRECTION_GAIN;
    if let Some(v) = &u.vignette {
        p.v[0][3] = 1.0;
        p.v[1] = [v.amount, v.midpoint, v.roundness, v.feather];
    }
    (p, maps)
}

pub(super) fn pack_geometry(plan: &GeometryPlan) -> KernelParams {
    let mut p = KernelParams::new();
    let flags =
        u32::from(plan.flip_h) | u32::from(plan.flip_v) << 1 | u32::from(plan.has_lens()) << 2;
    p.info = [plan.src_w, plan.src_h, u32::from(plan.quarter_turns), flags];
    p.v[0] = plan.crop.map(|v| v as f32);
    let [a, b, c, d, e, f] = plan.inverse.as_coeffs().map(|v| v as f32);
    p.v[1] = [a, b, c, d];
    p.v[2] = [
        e,
        f,
        plan.perspective[0] as f32,
        plan.perspective[1] as f32,
    ];
    p.v[3] = [
        plan.k1 as f32,
        plan.k2 as f32,
        plan.ca[0] as f32,
        plan.ca[1] as f32,
    ];
    p
}
