use super::*;

use crate::adjust::model::{
    ChromaticAberration, CropRect, CurvePoint, EditingAdjustments, GradeWheel, HslBand,
    ToneCurve,
};
use crate::film::lut::generate_stock_lut;
use crate::foundation::core::TargetSize;
use crate::render::passes::film::GrainUniforms;
use crate::render::passes::master::ToneControls;
use crate::render::passes::optics::{GlowUniforms, VignetteUniforms};
use crate::render::passes::{
    CurveUniforms, FilmUniforms, HslUniforms, MasterUniforms, OpticsUniforms,
};

const TOLERANCE: f32 = 2e-3;

fn backend() -> Option<GpuBackend> {
    let backend = GpuBackend::new(8192);
    match backend.warm_up() {
        Ok(()) => Some(backend),
        Err(err) if err.is_context_unavailable() => {
            eprintln!("skipping gpu comparison: {err}");
            None
        }
        Err(err) => panic!("gpu backend failed to start: {err}"),
    }
}

fn swatch(w: u32, h: u32) -> Surface {
    let mut s = Surface::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let i = ((y * w + x) * 4) as usize;
            let t = (y * w + x) as f32 / (w * h) as f32;
            s.data[i] = x as f32 / (w - 1) as f32;
            s.data[i + 1] = y as f32 / (h - 1) as f32;
            s.data[i + 2] = (t * 7.0).fract();
            s.data[i + 3] = 1.0;
        }
    }
    s
}

fn assert_close(gpu: &Surface, cpu: &Surface) {
    assert_eq!((gpu.width, gpu.height), (cpu.width, cpu.height));
    let worst = gpu
        .data
        .iter()
        .zip(&cpu.data)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f32::max);
    assert!(worst <= TOLERANCE, "gpu and cpu differ by {worst}");
}

fn compare_pass(backend: &GpuBackend, pass: PassUniforms<'_>, src: &Surface) {
    let cancel = CancellationToken::new();
    let mut gpu = Surface::new(0, 0);
    backend.run_pass(pass, src, &mut gpu, &cancel).unwrap();
    let mut cpu = Surface::new(0, 0);
    run_pass_cpu(pass, src, &mut cpu, &cancel).unwrap();
    assert_close(&gpu, &cpu);
}

fn compare_geometry(backend: &GpuBackend, plan: &GeometryPlan, src: &Surface) {
    let cancel = CancellationToken::new();
    let mut gpu = Surface::new(0, 0);
    backend.run_geometry(plan, src, &mut gpu, &cancel).unwrap();
    let mut cpu = Surface::new(0, 0);
    plan.execute_into(src, &mut cpu, &cancel).unwrap();
    assert_close(&gpu, &cpu);
}

#[test]
fn params_match_the_wgsl_uniform_layout() {
    assert_eq!(std::mem::size_of::<KernelParams>(), 32 + 16 * 16);
    for kernel in Kernel::ALL {
        let src = kernel.source();
        assert!(src.contains("fn main"), "{} has no entry point", kernel.label());
        assert!(src.contains("const REGION_GAIN"));
    }
}

#[test]
fn dispatch_grid_spills_into_a_second_dimension() {
    assert_eq!(dispatch_grid(0).unwrap(), (1, 1));
    assert_eq!(dispatch_grid(256 * 65_535).unwrap(), (65_535, 1));
    let (gx, gy) = dispatch_grid(256 * 65_536).unwrap();
    assert!(gy > 1);
    assert!(u64::from(gx) * u64::from(gy) >= 65_536);
    assert!(dispatch_grid(u32::MAX).is_ok());
}

#[test]
fn master_kernel_matches_cpu() {
    let Some(backend) = backend() else { return };
    let mut a = EditingAdjustments {
        exposure: 25.0,
        contrast: 30.0,
        highlights: -40.0,
        shadows: 35.0,
        whites: 10.0,
        blacks: -15.0,
        temperature: 20.0,
        tint: -10.0,
        saturation: 25.0,
        vibrance: 40.0,
        ..EditingAdjustments::default()
    };
    a.color_grading.shadows = GradeWheel {
        hue: 210.0,
        saturation: 30.0,
        luminance: 5.0,
    };
    a.color_grading.highlights = GradeWheel {
        hue: 40.0,
        saturation: 20.0,
        luminance: -5.0,
    };
    a.color_grading.balance = 10.0;
    let mut u = MasterUniforms::default();
    u.fill(&a);
    compare_pass(&backend, PassUniforms::Master(&u), &swatch(32, 24));
}

#[test]
fn hsl_kernel_matches_cpu() {
    let Some(backend) = backend() else { return };
    let mut a = EditingAdjustments::default();
    a.hsl.red = HslBand {
        hue: 20.0,
        saturation: -30.0,
        luminance: 10.0,
    };
    a.hsl.blue = HslBand {
        hue: -15.0,
        saturation: 40.0,
        luminance: -20.0,
    };
    a.hsl.green.saturation = -60.0;
    let mut u = HslUniforms::default();
    u.fill(&a);
    compare_pass(&backend, PassUniforms::Hsl(&u), &swatch(32, 24));
}

#[test]
fn curve_kernel_matches_cpu() {
    let Some(backend) = backend() else { return };
    let mut a = EditingAdjustments::default();
    a.curves.rgb = vec![
        CurvePoint::new(0.0, 0.05),
        CurvePoint::new(0.5, 0.6),
        CurvePoint::new(1.0, 0.95),
    ];
    a.curves.blue = vec![CurvePoint::new(0.0, 0.1), CurvePoint::new(1.0, 0.9)];
    a.curves.tone = ToneCurve {
        highlights: -20.0,
        lights: 10.0,
        darks: 0.0,
        shadows: 15.0,
    };
    let mut u = CurveUniforms::default();
    u.fill(&a);
    compare_pass(&backend, PassUniforms::Curve(&u), &swatch(32, 24));
}

fn graded_film() -> FilmUniforms {
    let lut = generate_stock_lut("portra400", 4).unwrap().unwrap();
    FilmUniforms {
        lut: Some((Arc::new(lut), 0.8)),
        matrix: Some([1.1, -0.05, -0.05, 0.02, 0.96, 0.02, -0.02, 0.0, 1.02]),
        tone: ToneControls {
            exposure: 10.0,
            contrast: 15.0,
            highlights: -20.0,
            shadows: 10.0,
            whites: 0.0,
            blacks: -5.0,
        },
        regions: ToneCurve {
            highlights: 10.0,
            lights: 0.0,
            darks: -10.0,
            shadows: 5.0,
        },
        response: Some([0.2, 0.1, 1.1]),
        cast: Some([[0.0, 0.01, 0.03], [0.0; 3], [0.02, 0.01, 0.0]]),
        fade: 0.2,
        grain: None,
        defects: None,
    }
}

#[test]
fn film_grade_kernel_matches_cpu() {
    let Some(backend) = backend() else { return };
    let u = graded_film();
    compare_pass(&backend, PassUniforms::Film(&u), &swatch(32, 24));
}

#[test]
fn film_grain_follows_the_gpu_grade() {
    let Some(backend) = backend() else { return };
    let u = FilmUniforms {
        grain: Some(GrainUniforms {
            amount: 0.5,
            cell: 2.0,
            roughness: 0.5,
            color: 0.3,
            shadow_bias: 0.2,
            seed: 99,
        }),
        ..graded_film()
    };
    compare_pass(&backend, PassUniforms::Film(&u), &swatch(32, 24));
}

#[test]
fn optics_kernel_matches_cpu() {
    let Some(backend) = backend() else { return };
    let u = OpticsUniforms {
        halation: Some(GlowUniforms {
            threshold: 0.6,
            amount: 0.5,
            radius: 0.05,
            tint: [1.0, 0.35, 0.15],
        }),
        bloom: Some(GlowUniforms {
            threshold: 0.7,
            amount: 0.3,
            radius: 0.08,
            tint: [1.0; 3],
        }),
        vignette: Some(VignetteUniforms {
            amount: -0.4,
            midpoint: 0.3,
            roundness: 0.2,
            feather: 0.5,
        }),
        correction: 0.3,
    };
    compare_pass(&backend, PassUniforms::Optics(&u), &swatch(48, 32));
}

#[test]
fn geometry_kernel_matches_cpu() {
    let Some(backend) = backend() else { return };
    let mut a = EditingAdjustments::default();
    let g = &mut a.geometry;
    g.crop = CropRect {
        x: 0.1,
        y: 0.05,
        width: 0.8,
        height: 0.9,
    };
    g.quarter_turns = 1;
    g.flip_horizontal = true;
    g.rotation = 7.0;
    g.scale = 140.0;
    g.perspective_vertical = 10.0;
    a.optics.enabled = true;
    a.optics.distortion = 10.0;
    a.optics.chromatic_aberration = ChromaticAberration {
        red: 0.5,
        blue: -0.5,
    };
    let src = swatch(40, 30);
    let plan = GeometryPlan::new(&a, 40, 30, TargetSize::Source, 0).unwrap();
    assert!(!plan.is_identity());
    compare_geometry(&backend, &plan, &src);
}

#[test]
fn prefiltered_downscale_matches_cpu() {
    let Some(backend) = backend() else { return };
    let a = EditingAdjustments::default();
    let src = swatch(64, 48);
    let plan = GeometryPlan::new(&a, 64, 48, TargetSize::MaxDimension { max: 16 }, 0).unwrap();
    assert!(plan.prefilter_radius() > 0);
    compare_geometry(&backend, &plan, &src);
}
