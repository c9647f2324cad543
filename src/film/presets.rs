use crate::film::model::{
    ColorScienceParams, FilmModuleConfig, FilmModules, FilmProfile, FilmProfileInput,
    GrainParams, ScanParams, ToneParams,
};
use crate::foundation::error::{FilmError, FilmResult};
use std::collections::BTreeMap;

/// Directory (in LUT path space) holding the generated stock LUTs.
pub const STOCK_LUT_DIR: &str = "/luts/stocks";

struct PresetDef {
    id: &'static str,
    name: &'static str,
    lut_strength: f32,
    rgb_mix: [f32; 3],
    temp_shift: f32,
    contrast: f32,
    curve_shadows: f32,
    halation: f32,
    bloom: f32,
    vignette: f32,
    grain: f32,
    grain_size: f32,
    grain_color: f32,
}

const PRESETS: [PresetDef; 8] = [
    PresetDef {
        id: "portra400",
        name: "Portra 400",
        lut_strength: 0.85,
        rgb_mix: [1.0, 1.0, 1.0],
        temp_shift: 6.0,
        contrast: -6.0,
        curve_shadows: 8.0,
        halation: 0.12,
        bloom: 0.08,
        vignette: -0.12,
        grain: 0.22,
        grain_size: 1.0,
        grain_color: 0.25,
    },
    PresetDef {
        id: "ektar100",
        name: "Ektar 100",
        lut_strength: 0.9,
        rgb_mix: [1.04, 1.0, 0.98],
        temp_shift: 2.0,
        contrast: 10.0,
        curve_shadows: 0.0,
        halation: 0.06,
        bloom: 0.04,
        vignette: -0.08,
        grain: 0.1,
        grain_size: 0.7,
        grain_color: 0.2,
    },
    PresetDef {
        id: "gold200",
        name: "Gold 200",
        lut_strength: 0.85,
        rgb_mix: [1.03, 1.0, 0.95],
        temp_shift: 12.0,
        contrast: 0.0,
        curve_shadows: 6.0,
        halation: 0.14,
        bloom: 0.1,
        vignette: -0.15,
        grain: 0.3,
        grain_size: 1.1,
        grain_color: 0.3,
    },
    PresetDef {
        id: "cinestill800t",
        name: "CineStill 800T",
        lut_strength: 0.9,
        rgb_mix: [1.0, 1.0, 1.04],
        temp_shift: -10.0,
        contrast: 4.0,
        curve_shadows: 4.0,
        halation: 0.55,
        bloom: 0.2,
        vignette: -0.1,
        grain: 0.4,
        grain_size: 1.3,
        grain_color: 0.35,
    },
    PresetDef {
        id: "provia100f",
        name: "Provia 100F",
        lut_strength: 0.9,
        rgb_mix: [1.0, 1.0, 1.0],
        temp_shift: -2.0,
        contrast: 8.0,
        curve_shadows: -4.0,
        halation: 0.04,
        bloom: 0.03,
        vignette: -0.06,
        grain: 0.08,
        grain_size: 0.7,
        grain_color: 0.15,
    },
    PresetDef {
        id: "velvia50",
        name: "Velvia 50",
        lut_strength: 0.95,
        rgb_mix: [1.02, 1.02, 1.0],
        temp_shift: -1.0,
        contrast: 16.0,
        curve_shadows: -8.0,
        halation: 0.03,
        bloom: 0.02,
        vignette: -0.1,
        grain: 0.05,
        grain_size: 0.6,
        grain_color: 0.1,
    },
    PresetDef {
        id: "trix400",
        name: "Tri-X 400",
        lut_strength: 1.0,
        rgb_mix: [1.0, 1.0, 1.0],
        temp_shift: 0.0,
        contrast: 18.0,
        curve_shadows: -6.0,
        halation: 0.0,
        bloom: 0.06,
        vignette: -0.18,
        grain: 0.45,
        grain_size: 1.2,
        grain_color: 0.0,
    },
    PresetDef {
        id: "hp5plus",
        name: "HP5 Plus",
        lut_strength: 1.0,
        rgb_mix: [1.0, 1.0, 1.0],
        temp_shift: 0.0,
        contrast: 8.0,
        curve_shadows: 4.0,
        halation: 0.0,
        bloom: 0.05,
        vignette: -0.14,
        grain: 0.4,
        grain_size: 1.1,
        grain_color: 0.0,
    },
];

/// LUT path for a stock id.
pub fn stock_lut_path(stock_id: &str) -> String {
    format!("{STOCK_LUT_DIR}/{stock_id}.png")
}

fn build(def: &PresetDef) -> FilmProfile {
    let module = |params| FilmModuleConfig {
        params,
        ..FilmModuleConfig::default()
    };
    let mut defects = FilmModuleConfig::default();
    defects.enabled = false;
    FilmProfile {
        id: def.id.to_string(),
        version: 1,
        name: def.name.to_string(),
        modules: FilmModules {
            color_science: module(ColorScienceParams {
                lut_asset_id: Some(stock_lut_path(def.id)),
                lut_strength: def.lut_strength,
                rgb_mix: def.rgb_mix,
                temp_shift: def.temp_shift,
                tint_shift: 0.0,
            }),
            tone: FilmModuleConfig {
                params: ToneParams {
                    contrast: def.contrast,
                    curve_shadows: def.curve_shadows,
                    ..ToneParams::default()
                },
                ..FilmModuleConfig::default()
            },
            scan: FilmModuleConfig {
                params: ScanParams {
                    halation_amount: def.halation,
                    bloom_amount: def.bloom,
                    vignette_amount: def.vignette,
                    ..ScanParams::default()
                },
                ..FilmModuleConfig::default()
            },
            grain: FilmModuleConfig {
                params: GrainParams {
                    amount: def.grain,
                    size: def.grain_size,
                    color: def.grain_color,
                    ..GrainParams::default()
                },
                ..FilmModuleConfig::default()
            },
            defects,
        },
    }
}

/// All built-in presets, in catalogue order.
pub fn builtin_presets() -> Vec<FilmProfile> {
    PRESETS.iter().map(build).collect()
}

/// Built-in preset by id.
pub fn builtin_preset(id: &str) -> Option<FilmProfile> {
    PRESETS.iter().find(|p| p.id == id).map(build)
}

/// Profiles addressable by `filmProfileId`: built-ins plus caller-registered ones.
#[derive(Clone, Debug)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, FilmProfileInput>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ProfileRegistry {
    /// Empty registry.
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Registry pre-populated with the built-in presets.
    pub fn with_builtins() -> Self {
        let mut r = Self::empty();
        for p in builtin_presets() {
            r.profiles.insert(p.id.clone(), FilmProfileInput::V1(p));
        }
        r
    }

    /// Add or replace a profile. Ids must be non-empty.
    pub fn register(&mut self, profile: FilmProfileInput) -> FilmResult<()> {
        let id = profile.id().trim().to_string();
        if id.is_empty() {
            return Err(FilmError::validation("film profile id must be non-empty"));
        }
        self.profiles.insert(id, profile);
        Ok(())
    }

    /// Look up a profile by id.
    pub fn get(&self, id: &str) -> Option<&FilmProfileInput> {
        self.profiles.get(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}
