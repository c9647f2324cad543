use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How a module's random seed is chosen per render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeedMode {
    /// Stable per source asset (`seedKey` + `seedSalt`).
    #[default]
    PerAsset,
    /// Fresh each render unless `renderSeed` is given.
    PerRender,
    /// Fresh per export unless `exportSeed` is given; stable in preview.
    PerExport,
    /// Always the module's own `seed`.
    Locked,
}

/// Shared envelope of every v1 module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    default,
    rename_all = "camelCase",
    bound(deserialize = "P: Deserialize<'de> + Default")
)]
pub struct FilmModuleConfig<P> {
    /// Module switch.
    pub enabled: bool,
    /// Module strength in whole percent `[0, 100]`.
    pub amount: f32,
    /// Seed policy for stochastic modules.
    pub seed_mode: SeedMode,
    /// Seed used when `seed_mode` is [`SeedMode::Locked`].
    pub seed: u32,
    /// Module-specific parameters.
    pub params: P,
}

impl<P: Default> Default for FilmModuleConfig<P> {
    fn default() -> Self {
        Self {
            enabled: true,
            amount: 100.0,
            seed_mode: SeedMode::PerAsset,
            seed: 0,
            params: P::default(),
        }
    }
}

impl<P> FilmModuleConfig<P> {
    /// Effective strength factor: `amount / 100` when enabled, else `0`.
    pub fn strength(&self) -> f32 {
        if self.enabled {
            (self.amount / 100.0).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Color science: LUT reference, channel mix and white balance shift.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorScienceParams {
    /// HaldCLUT asset path, e.g. `/luts/stocks/portra400.png`.
    pub lut_asset_id: Option<String>,
    /// LUT mix `[0, 1]`.
    pub lut_strength: f32,
    /// Per-channel gain `[0.5, 1.5]`.
    pub rgb_mix: [f32; 3],
    /// Warm/cool shift `[-100, 100]`.
    pub temp_shift: f32,
    /// Magenta/green shift `[-100, 100]`.
    pub tint_shift: f32,
}

impl Default for ColorScienceParams {
    fn default() -> Self {
        Self {
            lut_asset_id: None,
            lut_strength: 1.0,
            rgb_mix: [1.0, 1.0, 1.0],
            temp_shift: 0.0,
            tint_shift: 0.0,
        }
    }
}

/// Film tone shaping, all `[-100, 100]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToneParams {
    pub exposure: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub whites: f32,
    pub blacks: f32,
    pub curve_highlights: f32,
    pub curve_lights: f32,
    pub curve_darks: f32,
    pub curve_shadows: f32,
}

/// Scanner/optical character: halation, bloom, vignette and scan warmth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanParams {
    pub halation_threshold: f32,
    pub halation_amount: f32,
    pub bloom_threshold: f32,
    pub bloom_amount: f32,
    pub vignette_amount: f32,
    pub scan_warmth: f32,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            halation_threshold: 0.9,
            halation_amount: 0.0,
            bloom_threshold: 0.85,
            bloom_amount: 0.0,
            vignette_amount: 0.0,
            scan_warmth: 0.0,
        }
    }
}

/// Grain texture.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrainParams {
    pub amount: f32,
    pub size: f32,
    pub roughness: f32,
    pub color: f32,
    pub shadow_boost: f32,
}

impl Default for GrainParams {
    fn default() -> Self {
        Self {
            amount: 0.0,
            size: 1.0,
            roughness: 0.5,
            color: 0.0,
            shadow_boost: 0.3,
        }
    }
}

/// Light leaks, dust and scratches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DefectsParams {
    pub leak_probability: f32,
    pub leak_strength: f32,
    pub dust_amount: f32,
    pub scratch_amount: f32,
}

impl DefectsParams {
    pub(crate) fn is_neutral(&self) -> bool {
        (self.leak_probability == 0.0 || self.leak_strength == 0.0)
            && self.dust_amount == 0.0
            && self.scratch_amount == 0.0
    }
}

/// The five v1 modules. Serialized as an ordered `[{id, ...}]` list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FilmModule>", into = "Vec<FilmModule>")]
pub struct FilmModules {
    pub color_science: FilmModuleConfig<ColorScienceParams>,
    pub tone: FilmModuleConfig<ToneParams>,
    pub scan: FilmModuleConfig<ScanParams>,
    pub grain: FilmModuleConfig<GrainParams>,
    pub defects: FilmModuleConfig<DefectsParams>,
}

/// One entry of the serialized module list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "camelCase")]
pub enum FilmModule {
    ColorScience(FilmModuleConfig<ColorScienceParams>),
    Tone(FilmModuleConfig<ToneParams>),
    Scan(FilmModuleConfig<ScanParams>),
    Grain(FilmModuleConfig<GrainParams>),
    Defects(FilmModuleConfig<DefectsParams>),
}

impl FilmModule {
    /// Canonical module ids in pipeline order.
    pub const IDS: [&'static str; 5] = ["colorScience", "tone", "scan", "grain", "defects"];
}

impl From<Vec<FilmModule>> for FilmModules {
    fn from(list: Vec<FilmModule>) -> Self {
        // Missing modules keep defaults; a repeated id keeps its last occurrence.
        let mut out = Self::default();
        for m in list {
            match m {
                FilmModule::ColorScience(c) => out.color_science = c,
                FilmModule::Tone(c) => out.tone = c,
                FilmModule::Scan(c) => out.scan = c,
                FilmModule::Grain(c) => out.grain = c,
                FilmModule::Defects(c) => out.defects = c,
            }
        }
        out
    }
}

impl From<FilmModules> for Vec<FilmModule> {
    fn from(m: FilmModules) -> Self {
        vec![
            FilmModule::ColorScience(m.color_science),
            FilmModule::Tone(m.tone),
            FilmModule::Scan(m.scan),
            FilmModule::Grain(m.grain),
            FilmModule::Defects(m.defects),
        ]
    }
}

/// Legacy (schema v1) film profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilmProfile {
    pub id: String,
    pub version: u32,
    pub name: String,
    pub modules: FilmModules,
}

impl Default for FilmProfile {
    fn default() -> Self {
        Self {
            id: String::new(),
            version: 1,
            name: String::new(),
            modules: FilmModules::default(),
        }
    }
}

/// Tone response curve plus the carried v1 tone shaping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToneResponse {
    pub enabled: bool,
    /// Highlight roll-off strength `[0, 1]`.
    pub shoulder: f32,
    /// Shadow toe strength `[0, 1]`.
    pub toe: f32,
    /// Midtone gamma `[0.5, 2]`.
    pub gamma: f32,
    pub exposure: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub whites: f32,
    pub blacks: f32,
    /// Region curve `[highlights, lights, darks, shadows]`.
    pub curve: [f32; 4],
}

impl ToneResponse {
    pub const DEFAULT_SHOULDER: f32 = 0.8;
    pub const DEFAULT_TOE: f32 = 0.2;
    pub const DEFAULT_GAMMA: f32 = 1.0;
}

impl Default for ToneResponse {
    fn default() -> Self {
        Self {
            enabled: true,
            shoulder: Self::DEFAULT_SHOULDER,
            toe: Self::DEFAULT_TOE,
            gamma: Self::DEFAULT_GAMMA,
            exposure: 0.0,
            contrast: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
            curve: [0.0; 4],
        }
    }
}

pub const IDENTITY_MATRIX: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Row-major 3x3 color matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorMatrix {
    pub enabled: bool,
    pub matrix: [f32; 9],
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self {
            enabled: true,
            matrix: IDENTITY_MATRIX,
        }
    }
}

/// HaldCLUT reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LutLayer {
    pub enabled: bool,
    pub path: String,
    /// Hald level (`8` means a 512x512 image with 64 entries per axis).
    pub size: u32,
    pub intensity: f32,
}

impl Default for LutLayer {
    fn default() -> Self {
        Self {
            enabled: true,
            path: String::new(),
            size: 8,
            intensity: 1.0,
        }
    }
}

/// Per-zone RGB offsets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorCast {
    pub enabled: bool,
    pub shadows: [f32; 3],
    pub midtones: [f32; 3],
    pub highlights: [f32; 3],
}

impl Default for ColorCast {
    fn default() -> Self {
        Self {
            enabled: true,
            shadows: [0.0; 3],
            midtones: [0.0; 3],
            highlights: [0.0; 3],
        }
    }
}

impl ColorCast {
    pub(crate) fn is_neutral(&self) -> bool {
        self.shadows
            .iter()
            .chain(self.midtones.iter())
            .chain(self.highlights.iter())
            .all(|v| *v == 0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Halation {
    pub enabled: bool,
    pub threshold: f32,
    pub amount: f32,
    /// Blur radius as a fraction of the shorter edge.
    pub radius: f32,
    pub tint: [f32; 3],
}

impl Default for Halation {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.9,
            amount: 0.0,
            radius: 0.012,
            tint: [1.0, 0.35, 0.15],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Bloom {
    pub enabled: bool,
    pub threshold: f32,
    pub amount: f32,
    /// Blur radius as a fraction of the shorter edge.
    pub radius: f32,
}

impl Default for Bloom {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.85,
            amount: 0.0,
            radius: 0.03,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrainLayer {
    pub enabled: bool,
    pub amount: f32,
    pub size: f32,
    pub roughness: f32,
    pub color: f32,
    pub shadow_bias: f32,
    pub seed_mode: SeedMode,
    pub seed: u32,
}

impl Default for GrainLayer {
    fn default() -> Self {
        let p = GrainParams::default();
        Self {
            enabled: false,
            amount: p.amount,
            size: p.size,
            roughness: p.roughness,
            color: p.color,
            shadow_bias: p.shadow_boost,
            seed_mode: SeedMode::PerAsset,
            seed: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VignetteLayer {
    pub enabled: bool,
    /// Negative darkens the edges.
    pub amount: f32,
    pub midpoint: f32,
    pub roundness: f32,
    pub feather: f32,
}

impl Default for VignetteLayer {
    fn default() -> Self {
        Self {
            enabled: false,
            amount: 0.0,
            midpoint: 0.5,
            roundness: 0.0,
            feather: 0.5,
        }
    }
}

/// Schema v2 film profile: explicit layers consumed directly by the film and optics passes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilmProfileV2 {
    pub id: String,
    pub version: u32,
    pub name: String,
    pub tone_response: ToneResponse,
    pub color_matrix: Option<ColorMatrix>,
    pub lut: Option<LutLayer>,
    pub color_cast: Option<ColorCast>,
    pub halation: Halation,
    pub bloom: Bloom,
    pub grain: GrainLayer,
    pub vignette: VignetteLayer,
    pub defects: Option<FilmModuleConfig<DefectsParams>>,
}

impl Default for FilmProfileV2 {
    fn default() -> Self {
        Self {
            id: String::new(),
            version: 2,
            name: String::new(),
            tone_response: ToneResponse::default(),
            color_matrix: None,
            lut: None,
            color_cast: None,
            halation: Halation::default(),
            bloom: Bloom::default(),
            grain: GrainLayer::default(),
            vignette: VignetteLayer::default(),
            defects: None,
        }
    }
}

/// A profile of either schema generation, discriminated by its `version` field.
#[derive(Clone, Debug, PartialEq)]
pub enum FilmProfileInput {
    /// `version` missing or `1`.
    V1(FilmProfile),
    /// `version: 2`.
    V2(FilmProfileV2),
}

impl FilmProfileInput {
    /// Profile id of either generation.
    pub fn id(&self) -> &str {
        match self {
            Self::V1(p) => &p.id,
            Self::V2(p) => &p.id,
        }
    }

    /// Display name of either generation.
    pub fn name(&self) -> &str {
        match self {
            Self::V1(p) => &p.name,
            Self::V2(p) => &p.name,
        }
    }
}

impl Serialize for FilmProfileInput {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::V1(p) => p.serialize(s),
            Self::V2(p) => p.serialize(s),
        }
    }
}

impl<'de> Deserialize<'de> for FilmProfileInput {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        let version = value.get("version").and_then(serde_json::Value::as_u64);
        match version {
            Some(2) => serde_json::from_value(value)
                .map(Self::V2)
                .map_err(serde::de::Error::custom),
            None | Some(1) => serde_json::from_value(value)
                .map(Self::V1)
                .map_err(serde::de::Error::custom),
            Some(v) => Err(serde::de::Error::custom(format!(
                "unsupported film profile version {v}"
            ))),
        }
    }
}

/// Which profile generation the renderer should emulate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileMode {
    /// v1 semantics: no tone-response curve.
    #[serde(rename = "legacy-v1")]
    LegacyV1,
    /// Full v2 layers.
    #[serde(rename = "v2")]
    V2,
}

/// Where the resolved profile came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileSource {
    /// Built-in preset selected by the caller.
    Preset,
    /// `filmProfileId` looked up in the profile registry.
    ProfileId,
    /// Profile object passed with the request.
    Explicit,
    /// Derived from the adjustments' grain/halation/bloom/vignette sliders.
    Adjustments,
}

/// Normalized LUT reference handed to the film pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLut {
    /// Path with exactly one leading `/`.
    pub path: String,
    /// Hald level.
    pub size: u32,
    /// Mix `[0, 1]`.
    pub intensity: f32,
}

/// The only profile form the renderer consumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRenderProfile {
    pub mode: ProfileMode,
    pub source: ProfileSource,
    pub legacy_v1: Option<FilmProfile>,
    pub v2: FilmProfileV2,
    pub lut: Option<ResolvedLut>,
}

#[cfg(test)]
#[path = "../../tests/unit/film/model.rs"]
mod tests;
