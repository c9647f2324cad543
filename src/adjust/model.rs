use std::collections::BTreeMap;

/// Full global adjustment stack for one image.
///
/// Deserializes from partial camelCase JSON; missing fields take their defaults. Run
/// [`crate::normalize_adjustments`] before handing a value to the renderer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditingAdjustments {
    /// Exposure in hundredths of the full range (`[-100, 100]`).
    pub exposure: f32,
    /// Contrast about mid-grey.
    pub contrast: f32,
    /// Highlight recovery/boost.
    pub highlights: f32,
    /// Shadow lift/crush.
    pub shadows: f32,
    /// White point.
    pub whites: f32,
    /// Black point.
    pub blacks: f32,
    /// Blue/amber white balance shift.
    pub temperature: f32,
    /// Green/magenta white balance shift.
    pub tint: f32,
    /// Global saturation.
    pub saturation: f32,
    /// Saturation weighted toward muted colors.
    pub vibrance: f32,
    /// Fine local contrast.
    pub texture: f32,
    /// Mid-frequency local contrast.
    pub clarity: f32,
    /// Haze removal (negative adds haze).
    pub dehaze: f32,
    /// Unsharp mask amount (`[0, 100]`).
    pub sharpening: f32,
    /// Unsharp mask radius in pixels (`[0.5, 3]`).
    pub sharpen_radius: f32,
    /// Luminance noise reduction (`[0, 100]`).
    pub noise_reduction: f32,
    /// Chroma noise reduction (`[0, 100]`).
    pub color_noise_reduction: f32,
    /// Additional grain on top of the film profile (`[0, 100]`).
    pub grain_amount: f32,
    /// Grain size (`[0, 100]`).
    pub grain_size: f32,
    /// Grain roughness (`[0, 100]`).
    pub grain_roughness: f32,
    /// Additional halation (`[0, 100]`).
    pub halation: f32,
    /// Additional bloom (`[0, 100]`).
    pub bloom: f32,
    /// Creative vignette; negative darkens edges.
    pub vignette: f32,
    /// Vignette midpoint (`[0, 100]`).
    pub vignette_midpoint: f32,
    /// Black-level fade (`[0, 100]`).
    pub fade: f32,
    /// Film profile intensity (`[0, 100]`).
    pub film_intensity: f32,
    /// Per-band hue/saturation/luminance.
    pub hsl: HslAdjustments,
    /// Point and parametric tone curves.
    pub curves: Curves,
    /// Three-way color grading.
    pub color_grading: ColorGrading,
    /// Crop, rotation, perspective, scale and flips.
    pub geometry: Geometry,
    /// Lens corrections.
    pub optics: OpticsCorrection,
    /// Film profile id resolved through the profile registry.
    pub film_profile_id: Option<String>,
    /// Per module/layer deep-merge patches applied to the resolved film profile.
    pub film_overrides: FilmOverrides,
    /// Masked local adjustments, in application order.
    pub local_adjustments: Vec<LocalAdjustment>,
    /// Date-imprint overlay drawn on the final output.
    pub date_stamp: DateStamp,
}

impl Default for EditingAdjustments {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            contrast: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
            temperature: 0.0,
            tint: 0.0,
            saturation: 0.0,
            vibrance: 0.0,
            texture: 0.0,
            clarity: 0.0,
            dehaze: 0.0,
            sharpening: 0.0,
            sharpen_radius: 1.0,
            noise_reduction: 0.0,
            color_noise_reduction: 0.0,
            grain_amount: 0.0,
            grain_size: 25.0,
            grain_roughness: 50.0,
            halation: 0.0,
            bloom: 0.0,
            vignette: 0.0,
            vignette_midpoint: 50.0,
            fade: 0.0,
            film_intensity: 100.0,
            hsl: HslAdjustments::default(),
            curves: Curves::default(),
            color_grading: ColorGrading::default(),
            geometry: Geometry::default(),
            optics: OpticsCorrection::default(),
            film_profile_id: None,
            film_overrides: FilmOverrides::new(),
            local_adjustments: Vec::new(),
            date_stamp: DateStamp::default(),
        }
    }
}

/// Patches keyed by v1 module id or v2 layer id. Each value is merged into the matching
/// module/layer JSON object (`{enabled, amount, params}` for v1).
pub type FilmOverrides = BTreeMap<String, serde_json::Value>;

/// One HSL band.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HslBand {
    /// Hue rotation within the band.
    pub hue: f32,
    /// Saturation change.
    pub saturation: f32,
    /// Luminance change.
    pub luminance: f32,
}

impl HslBand {
    pub(crate) fn is_identity(&self) -> bool {
        self.hue == 0.0 && self.saturation == 0.0 && self.luminance == 0.0
    }
}

/// Eight-band HSL map.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HslAdjustments {
    pub red: HslBand,
    pub orange: HslBand,
    pub yellow: HslBand,
    pub green: HslBand,
    pub aqua: HslBand,
    pub blue: HslBand,
    pub purple: HslBand,
    pub magenta: HslBand,
}

impl HslAdjustments {
    /// Band centers in degrees, aligned with [`HslAdjustments::bands`].
    pub const CENTERS: [f32; 8] = [0.0, 30.0, 60.0, 120.0, 180.0, 240.0, 270.0, 300.0];

    /// Bands in hue order.
    pub fn bands(&self) -> [HslBand; 8] {
        [
            self.red,
            self.orange,
            self.yellow,
            self.green,
            self.aqua,
            self.blue,
            self.purple,
            self.magenta,
        ]
    }

    pub(crate) fn bands_mut(&mut self) -> [&mut HslBand; 8] {
        [
            &mut self.red,
            &mut self.orange,
            &mut self.yellow,
            &mut self.green,
            &mut self.aqua,
            &mut self.blue,
            &mut self.purple,
            &mut self.magenta,
        ]
    }
}

/// Control point of a point curve, both axes in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CurvePoint {
    pub x: f32,
    pub y: f32,
}

impl CurvePoint {
    /// Build a point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

pub(crate) fn identity_curve() -> Vec<CurvePoint> {
    vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)]
}

/// Region-based parametric tone curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToneCurve {
    pub highlights: f32,
    pub lights: f32,
    pub darks: f32,
    pub shadows: f32,
}

/// Point curves (composite and per channel) plus the parametric tone curve.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Curves {
    /// Composite curve applied to all channels.
    pub rgb: Vec<CurvePoint>,
    pub red: Vec<CurvePoint>,
    pub green: Vec<CurvePoint>,
    pub blue: Vec<CurvePoint>,
    /// Parametric region curve, applied before the point curves.
    pub tone: ToneCurve,
}

impl Default for Curves {
    fn default() -> Self {
        Self {
            rgb: identity_curve(),
            red: identity_curve(),
            green: identity_curve(),
            blue: identity_curve(),
            tone: ToneCurve::default(),
        }
    }
}

/// One color grading wheel.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GradeWheel {
    /// Tint hue in degrees `[0, 360)`.
    pub hue: f32,
    /// Tint strength `[0, 100]`.
    pub saturation: f32,
    /// Zone brightness `[-100, 100]`.
    pub luminance: f32,
}

/// Shadow/midtone/highlight color grading.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorGrading {
    pub shadows: GradeWheel,
    pub midtones: GradeWheel,
    pub highlights: GradeWheel,
    /// Zone overlap `[0, 100]`.
    pub blend: f32,
    /// Shifts the shadow/highlight split `[-100, 100]`.
    pub balance: f32,
}

impl Default for ColorGrading {
    fn default() -> Self {
        Self {
            shadows: GradeWheel::default(),
            midtones: GradeWheel::default(),
            highlights: GradeWheel::default(),
            blend: 50.0,
            balance: 0.0,
        }
    }
}

/// Normalized crop rectangle in source (post-orientation) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for CropRect {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Geometric transform parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Geometry {
    pub crop: CropRect,
    /// Fine rotation in degrees `[-45, 45]`.
    pub rotation: f32,
    /// Clockwise quarter turns `0..=3`.
    pub quarter_turns: u8,
    /// Keystone correction along the vertical axis.
    pub perspective_vertical: f32,
    /// Keystone correction along the horizontal axis.
    pub perspective_horizontal: f32,
    /// Zoom in percent `[50, 200]`.
    pub scale: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            crop: CropRect::default(),
            rotation: 0.0,
            quarter_turns: 0,
            perspective_vertical: 0.0,
            perspective_horizontal: 0.0,
            scale: 100.0,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }
}

/// Per-channel lateral chromatic aberration correction in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChromaticAberration {
    pub red: f32,
    pub blue: f32,
}

/// Lens corrections.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpticsCorrection {
    /// Master switch; when off the other fields are ignored.
    pub enabled: bool,
    /// First radial distortion term (k1).
    pub distortion: f32,
    /// Second radial distortion term (k2).
    pub distortion_k2: f32,
    pub chromatic_aberration: ChromaticAberration,
    /// Lens vignette compensation.
    pub vignette_correction: f32,
}

/// Where the date stamp is anchored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StampCorner {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

/// Seven-segment date imprint.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateStamp {
    pub enabled: bool,
    /// Digits, spaces, `'`, `.`, `-` and `:`; other characters are skipped.
    pub text: String,
    pub corner: StampCorner,
    /// Digit height as a fraction of the shorter output edge.
    pub scale: f32,
}

impl Default for DateStamp {
    fn default() -> Self {
        Self {
            enabled: false,
            text: String::new(),
            corner: StampCorner::BottomRight,
            scale: 0.035,
        }
    }
}

/// Delta applied on top of the global adjustments for one local layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalDelta {
    pub exposure: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub whites: f32,
    pub blacks: f32,
    pub temperature: f32,
    pub tint: f32,
    pub saturation: f32,
    pub vibrance: f32,
    pub texture: f32,
    pub clarity: f32,
    pub dehaze: f32,
}

impl LocalDelta {
    pub(crate) fn fields(&self) -> [f32; 13] {
        [
            self.exposure,
            self.contrast,
            self.highlights,
            self.shadows,
            self.whites,
            self.blacks,
            self.temperature,
            self.tint,
            self.saturation,
            self.vibrance,
            self.texture,
            self.clarity,
            self.dehaze,
        ]
    }

    pub(crate) fn fields_mut(&mut self) -> [&mut f32; 13] {
        [
            &mut self.exposure,
            &mut self.contrast,
            &mut self.highlights,
            &mut self.shadows,
            &mut self.whites,
            &mut self.blacks,
            &mut self.temperature,
            &mut self.tint,
            &mut self.saturation,
            &mut self.vibrance,
            &mut self.texture,
            &mut self.clarity,
            &mut self.dehaze,
        ]
    }

    /// Whether every field is zero.
    pub fn is_noop(&self) -> bool {
        self.fields().iter().all(|v| *v == 0.0)
    }
}

/// One brush dab in normalized output coordinates.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BrushPoint {
    pub x: f32,
    pub y: f32,
    /// Pen pressure `[0, 1]`; scales both dab radius and opacity.
    pub pressure: f32,
}

impl Default for BrushPoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            pressure: 1.0,
        }
    }
}

/// Mask geometry. Coordinates are normalized to the output frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MaskShape {
    /// Stamped dabs along a stroke.
    #[serde(rename_all = "camelCase")]
    Brush {
        /// Dab diameter as a fraction of the shorter edge.
        size: f32,
        /// Soft edge fraction `[0, 1]`.
        feather: f32,
        /// Per-dab opacity `[0, 1]`.
        flow: f32,
        /// Stroke samples.
        points: Vec<BrushPoint>,
    },
    /// Feathered ellipse.
    #[serde(rename_all = "camelCase")]
    Radial {
        center_x: f32,
        center_y: f32,
        /// Horizontal radius as a fraction of width.
        radius_x: f32,
        /// Vertical radius as a fraction of height.
        radius_y: f32,
        /// Soft edge fraction `[0, 1]`.
        feather: f32,
    },
    /// Graduated band: full strength before `start`, none after `end`.
    #[serde(rename_all = "camelCase")]
    Linear {
        start_x: f32,
        start_y: f32,
        end_x: f32,
        end_y: f32,
        /// Transition width as a fraction of the start-end distance `[0, 1]`.
        feather: f32,
    },
}

impl Default for MaskShape {
    fn default() -> Self {
        Self::Radial {
            center_x: 0.5,
            center_y: 0.5,
            radius_x: 0.25,
            radius_y: 0.25,
            feather: 0.5,
        }
    }
}

/// Luma and hue/saturation refinement applied after the shape is rasterized.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaskRange {
    pub luma_min: f32,
    pub luma_max: f32,
    /// Smoothstep falloff width outside `[luma_min, luma_max]`.
    pub luma_feather: f32,
    /// Hue center in degrees.
    pub hue_center: f32,
    /// Half-width of the accepted hue window in degrees; `>= 180` accepts all hues.
    pub hue_range: f32,
    /// Falloff width outside the hue window in degrees.
    pub hue_feather: f32,
    /// Minimum HSL saturation `[0, 1]`.
    pub sat_min: f32,
    /// Falloff width below `sat_min`.
    pub sat_feather: f32,
}

impl Default for MaskRange {
    fn default() -> Self {
        Self {
            luma_min: 0.0,
            luma_max: 1.0,
            luma_feather: 0.0,
            hue_center: 0.0,
            hue_range: 180.0,
            hue_feather: 0.0,
            sat_min: 0.0,
            sat_feather: 0.0,
        }
    }
}

/// Complete mask description.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalMask {
    pub shape: MaskShape,
    /// Flip the shape before range refinement.
    pub invert: bool,
    pub range: MaskRange,
}

/// A masked adjustment layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalAdjustment {
    /// Unique id within the adjustment stack; also names the layer's render slot.
    pub id: String,
    pub enabled: bool,
    /// Layer opacity `[0, 100]`.
    pub amount: f32,
    pub mask: LocalMask,
    /// Delta applied on top of the global stack.
    pub adjustments: LocalDelta,
}

impl Default for LocalAdjustment {
    fn default() -> Self {
        Self {
            id: String::new(),
            enabled: true,
            amount: 100.0,
            mask: LocalMask::default(),
            adjustments: LocalDelta::default(),
        }
    }
}

impl LocalAdjustment {
    /// Whether this layer contributes anything to the output.
    pub fn is_active(&self) -> bool {
        self.enabled && self.amount > 0.0 && !self.adjustments.is_noop()
    }
}
