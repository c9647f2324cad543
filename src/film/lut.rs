use crate::film::presets::STOCK_LUT_DIR;
use crate::film::resolve::normalize_lut_path;
use crate::foundation::core::quantize_u8;
use crate::foundation::error::{FilmError, FilmResult};
use crate::foundation::math::{clamp01, linear_to_srgb, srgb_to_linear};
use rayon::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Decoded HaldCLUT: a `level² × level² × level²` RGB cube.
#[derive(Clone, Debug, PartialEq)]
pub struct HaldLut {
    level: u32,
    /// Entries per axis (`level²`).
    size: usize,
    /// Red-fastest, then green, then blue.
    data: Vec<[f32; 3]>,
}

impl HaldLut {
    /// Identity cube at `level`.
    pub fn identity(level: u32) -> FilmResult<Self> {
        Self::from_fn(level, |rgb| rgb)
    }

    fn from_fn(level: u32, f: impl Fn([f32; 3]) -> [f32; 3] + Sync) -> FilmResult<Self> {
        if !(2..=16).contains(&level) {
            return Err(FilmError::validation(format!("hald level {level} out of range 2..=16")));
        }
        let size = (level * level) as usize;
        let denom = (size - 1) as f32;
        let data = (0..size * size * size)
            .into_par_iter()
            .map(|i| {
                let r = (i % size) as f32 / denom;
                let g = ((i / size) % size) as f32 / denom;
                let b = (i / (size * size)) as f32 / denom;
                f([r, g, b])
            })
            .collect();
        Ok(Self { level, size, data })
    }

    /// Read a Hald image from straight RGBA8 pixels.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> FilmResult<Self> {
        if width != height {
            return Err(FilmError::decode(format!(
                "hald image must be square, got {width}x{height}"
            )));
        }
        let level = (2..=16u32)
            .find(|l| l * l * l == width)
            .ok_or_else(|| FilmError::decode(format!("{width} is not a hald image width")))?;
        let size = (level * level) as usize;
        let total = size * size * size;
        if bytes.len() < total * 4 {
            return Err(FilmError::decode("hald image buffer too short"));
        }
        let data = bytes
            .chunks_exact(4)
            .take(total)
            .map(|px| {
                [
                    f32::from(px[0]) / 255.0,
                    f32::from(px[1]) / 255.0,
                    f32::from(px[2]) / 255.0,
                ]
            })
            .collect();
        Ok(Self { level, size, data })
    }

    /// Decode a PNG (or any format `image` recognizes) holding a Hald image.
    pub fn decode(bytes: &[u8]) -> FilmResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| FilmError::decode(format!("lut image: {e}")))?
            .to_rgba8();
        Self::from_rgba8(img.width(), img.height(), img.as_raw())
    }

    /// Hald level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Hald image as straight RGBA8 (`level³ × level³`).
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let w = self.level * self.level * self.level;
        let mut raw = Vec::with_capacity(self.data.len() * 4);
        for c in &self.data {
            raw.extend_from_slice(&[quantize_u8(c[0]), quantize_u8(c[1]), quantize_u8(c[2]), 255]);
        }
        image::RgbaImage::from_raw(w, w, raw).unwrap_or_else(|| image::RgbaImage::new(w, w))
    }

    /// Encode as PNG.
    pub fn encode_png(&self) -> FilmResult<Vec<u8>> {
        let img = self.to_rgba_image();
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| FilmError::encode(format!("lut png: {e}")))?;
        Ok(out.into_inner())
    }

    /// Entries per axis.
    #[cfg(feature = "gpu")]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Cube entries, red fastest, then green, then blue.
    #[cfg(feature = "gpu")]
    pub(crate) fn entries(&self) -> &[[f32; 3]] {
        &self.data
    }

    fn at(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[(b * self.size + g) * self.size + r]
    }

    /// Trilinear lookup of display-encoded RGB.
    pub fn sample(&self, rgb: [f32; 3]) -> [f32; 3] {
        let max = (self.size - 1) as f32;
        let pos = rgb.map(|c| clamp01(c) * max);
        let i0 = pos.map(|p| (p.floor() as usize).min(self.size - 1));
        let i1 = i0.map(|i| (i + 1).min(self.size - 1));
        let t = [
            pos[0] - i0[0] as f32,
            pos[1] - i0[1] as f32,
            pos[2] - i0[2] as f32,
        ];

        let c000 = self.at(i0[0], i0[1], i0[2]);
        let c100 = self.at(i1[0], i0[1], i0[2]);
        let c010 = self.at(i0[0], i1[1], i0[2]);
        let c110 = self.at(i1[0], i1[1], i0[2]);
        let c001 = self.at(i0[0], i0[1], i1[2]);
        let c101 = self.at(i1[0], i0[1], i1[2]);
        let c011 = self.at(i0[0], i1[1], i1[2]);
        let c111 = self.at(i1[0], i1[1], i1[2]);

        let mut out = [0.0f32; 3];
        for c in 0..3 {
            let x00 = c000[c] + (c100[c] - c000[c]) * t[0];
            let x10 = c010[c] + (c110[c] - c010[c]) * t[0];
            let x01 = c001[c] + (c101[c] - c001[c]) * t[0];
            let x11 = c011[c] + (c111[c] - c011[c]) * t[0];
            let y0 = x00 + (x10 - x00) * t[1];
            let y1 = x01 + (x11 - x01) * t[1];
            out[c] = y0 + (y1 - y0) * t[2];
        }
        out
    }
}

/// Where LUT files come from.
pub trait LutSource: Send + Sync {
    /// Raw file bytes for a normalized path (`/dir/file.png`), `Ok(None)` when absent.
    fn load(&self, path: &str) -> FilmResult<Option<Vec<u8>>>;
}

/// Reads LUT paths relative to a filesystem root. Paths escaping the root are rejected.
#[derive(Clone, Debug)]
pub struct DirLutSource {
    root: PathBuf,
}

impl DirLutSource {
    /// Serve files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LutSource for DirLutSource {
    fn load(&self, path: &str) -> FilmResult<Option<Vec<u8>>> {
        let rel = Path::new(path.trim_start_matches('/'));
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(FilmError::validation(format!("lut path escapes root: {path}")));
        }
        let full = self.root.join(rel);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FilmError::Other(anyhow::Error::new(e).context(format!(
                "read lut {}",
                full.display()
            )))),
        }
    }
}

/// In-memory LUT files keyed by normalized path.
#[derive(Clone, Debug, Default)]
pub struct MemoryLutSource {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryLutSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file under `path` (normalized).
    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        if let Some(p) = normalize_lut_path(path) {
            self.files.insert(p, bytes);
        }
    }
}

impl LutSource for MemoryLutSource {
    fn load(&self, path: &str) -> FilmResult<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }
}

/// Bounded LRU of decoded LUTs. Stock paths resolve procedurally when the source lacks them.
pub struct LutCache {
    source: Option<Box<dyn LutSource>>,
    entries: HashMap<String, Arc<HaldLut>>,
    lru: VecDeque<String>,
    capacity: usize,
}

impl std::fmt::Debug for LutCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LutCache")
            .field("entries", &self.lru)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl LutCache {
    /// Default number of decoded LUTs kept.
    pub const DEFAULT_CAPACITY: usize = 8;

    /// Cache backed by `source` (or procedural stock LUTs only when `None`).
    pub fn new(source: Option<Box<dyn LutSource>>, capacity: usize) -> Self {
        Self {
            source,
            entries: HashMap::new(),
            lru: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Decoded LUT for `path`.
    pub fn get(&mut self, path: &str) -> FilmResult<Arc<HaldLut>> {
        let key = normalize_lut_path(path)
            .ok_or_else(|| FilmError::validation("lut path is empty"))?;
        if let Some(lut) = self.entries.get(&key).cloned() {
            self.touch(&key);
            return Ok(lut);
        }

        let loaded = match &self.source {
            Some(src) => src.load(&key)?,
            None => None,
        };
        let lut = match loaded {
            Some(bytes) => HaldLut::decode(&bytes)?,
            None => stock_id_from_path(&key)
                .and_then(|id| generate_stock_lut(id, 8))
                .transpose()?
                .ok_or_else(|| FilmError::validation(format!("lut not found: {key}")))?,
        };
        tracing::debug!(path = %key, level = lut.level(), "lut loaded");

        let lut = Arc::new(lut);
        self.entries.insert(key.clone(), lut.clone());
        self.touch(&key);
        while self.lru.len() > self.capacity {
            if let Some(old) = self.lru.pop_front() {
                self.entries.remove(&old);
            }
        }
        Ok(lut)
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key.to_string());
    }

    /// Number of decoded LUTs currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all decoded LUTs.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }
}

fn stock_id_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(STOCK_LUT_DIR)?
        .strip_prefix('/')?
        .strip_suffix(".png")
}

#[derive(Clone, Copy, Debug)]
struct ColorGrade {
    saturation: f32,
    contrast: f32,
    gamma: f32,
    lift: f32,
    gain: f32,
    warmth: f32,
    cool: f32,
    shadow_teal: f32,
}

const NEUTRAL: ColorGrade = ColorGrade {
    saturation: 1.0,
    contrast: 1.0,
    gamma: 1.0,
    lift: 0.0,
    gain: 1.0,
    warmth: 0.0,
    cool: 0.0,
    shadow_teal: 0.0,
};

#[derive(Clone, Copy, Debug)]
struct MonoGrade {
    weights: [f32; 3],
    contrast: f32,
    gamma: f32,
    warm_tone: f32,
}

#[derive(Clone, Copy, Debug)]
enum StockGrade {
    Color(ColorGrade),
    /// Color grade followed by a warm highlight push.
    Tungsten(ColorGrade),
    Mono(MonoGrade),
}

fn stock_grade(id: &str) -> Option<StockGrade> {
    let g = match id {
        "portra400" => StockGrade::Color(ColorGrade {
            saturation: 0.93,
            contrast: 0.95,
            gamma: 0.98,
            lift: 0.010,
            warmth: 0.22,
            ..NEUTRAL
        }),
        "ektar100" => StockGrade::Color(ColorGrade {
            saturation: 1.26,
            contrast: 1.12,
            gamma: 1.02,
            gain: 1.01,
            warmth: 0.10,
            ..NEUTRAL
        }),
        "gold200" => StockGrade::Color(ColorGrade {
            saturation: 1.05,
            contrast: 0.98,
            gamma: 0.99,
            lift: 0.014,
            warmth: 0.28,
            ..NEUTRAL
        }),
        "cinestill800t" => StockGrade::Tungsten(ColorGrade {
            saturation: 1.08,
            contrast: 1.05,
            gamma: 1.01,
            lift: 0.006,
            cool: 0.24,
            shadow_teal: 0.55,
            ..NEUTRAL
        }),
        "provia100f" => StockGrade::Color(ColorGrade {
            saturation: 1.05,
            contrast: 1.08,
            gamma: 1.01,
            cool: 0.05,
            ..NEUTRAL
        }),
        "velvia50" => StockGrade::Color(ColorGrade {
            saturation: 1.36,
            contrast: 1.18,
            gamma: 1.04,
            lift: -0.004,
            gain: 1.02,
            cool: 0.02,
            ..NEUTRAL
        }),
        "trix400" => StockGrade::Mono(MonoGrade {
            weights: [0.32, 0.56, 0.12],
            contrast: 1.20,
            gamma: 1.02,
            warm_tone: 0.06,
        }),
        "hp5plus" => StockGrade::Mono(MonoGrade {
            weights: [0.28, 0.62, 0.10],
            contrast: 1.08,
            gamma: 0.99,
            warm_tone: 0.02,
        }),
        _ => return None,
    };
    Some(g)
}

fn linear_luma(c: [f32; 3]) -> f32 {
    c[0] * 0.2126 + c[1] * 0.7152 + c[2] * 0.0722
}

fn grade_color(rgb: [f32; 3], g: &ColorGrade) -> [f32; 3] {
    let mut c = rgb.map(srgb_to_linear);
    let lum = linear_luma(c);

    c[0] *= 1.0 + g.warmth * 0.12 - g.cool * 0.05;
    c[1] *= 1.0 + g.warmth * 0.02 - g.cool * 0.01;
    c[2] *= 1.0 - g.warmth * 0.10 + g.cool * 0.12;

    let shadow = clamp01(1.0 - lum * 1.8);
    c[0] -= g.shadow_teal * 0.03 * shadow;
    c[1] += g.shadow_teal * 0.01 * shadow;
    c[2] += g.shadow_teal * 0.04 * shadow;

    let lum2 = linear_luma(c);
    c = c.map(|v| lum2 + (v - lum2) * g.saturation);
    c = c.map(|v| (v - 0.18) * g.contrast + 0.18);
    c = c.map(|v| (v + g.lift) * g.gain);
    if (g.gamma - 1.0).abs() > 1e-6 {
        c = c.map(|v| v.max(0.0).powf(g.gamma));
    }
    c.map(linear_to_srgb)
}

fn grade_mono(rgb: [f32; 3], g: &MonoGrade) -> [f32; 3] {
    let c = rgb.map(srgb_to_linear);
    let lum = clamp01(c[0] * g.weights[0] + c[1] * g.weights[1] + c[2] * g.weights[2]);
    let lum = clamp01((lum - 0.18) * g.contrast + 0.18).powf(g.gamma);
    [
        linear_to_srgb(lum * (1.0 + g.warm_tone * 0.025)),
        linear_to_srgb(lum * (1.0 + g.warm_tone * 0.008)),
        linear_to_srgb(lum * (1.0 - g.warm_tone * 0.02)),
    ]
}

fn grade_stock(rgb: [f32; 3], grade: &StockGrade) -> [f32; 3] {
    match grade {
        StockGrade::Color(g) => grade_color(rgb, g),
        StockGrade::Tungsten(g) => {
            let [r, gr, b] = grade_color(rgb, g);
            let highlight = clamp01(((r + gr + b) / 3.0 - 0.55) * 2.0);
            [
                clamp01(r + highlight * 0.020),
                clamp01(gr + highlight * 0.004),
                clamp01(b - highlight * 0.016),
            ]
        }
        StockGrade::Mono(g) => grade_mono(rgb, g),
    }
}

/// Ids of the procedurally generated stock LUTs.
pub const STOCK_IDS: [&str; 8] = [
    "portra400",
    "ektar100",
    "gold200",
    "cinestill800t",
    "provia100f",
    "velvia50",
    "trix400",
    "hp5plus",
];

/// Generate a stock LUT at `level`, quantized to 8 bits exactly as its PNG would be.
///
/// Returns `None` for unknown stock ids.
pub fn generate_stock_lut(stock_id: &str, level: u32) -> Option<FilmResult<HaldLut>> {
    let grade = stock_grade(stock_id)?;
    let quantize = |v: f32| f32::from(quantize_u8(v)) / 255.0;
    Some(HaldLut::from_fn(level, move |rgb| {
        grade_stock(rgb, &grade).map(quantize)
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/film/lut.rs"]
mod tests;
