use crate::foundation::error::{FilmError, FilmResult};

/// Working pixel buffer: straight-alpha RGBA, display-encoded (sRGB) `f32` in `[0, 1]`.
///
/// Every pass reads one `Surface` and writes another of the same size.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA samples, `width * height * 4` long.
    pub data: Vec<f32>,
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; pixel_count(width, height) * 4],
        }
    }

    /// Convert straight RGBA8 bytes into a working surface.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> FilmResult<Self> {
        let expected = pixel_count(width, height) * 4;
        if bytes.len() != expected {
            return Err(FilmError::validation(format!(
                "rgba8 buffer length {} does not match {width}x{height}",
                bytes.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: bytes.iter().map(|&b| f32::from(b) / 255.0).collect(),
        })
    }

    /// Quantize into straight RGBA8.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.data.len()];
        self.write_rgba8(&mut out);
        out
    }

    pub(crate) fn write_rgba8(&self, out: &mut [u8]) {
        for (d, &s) in out.iter_mut().zip(self.data.iter()) {
            *d = quantize_u8(s);
        }
    }

    /// RGBA at `(x, y)`; coordinates are clamped to the surface edge.
    pub fn pixel(&self, x: i64, y: i64) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        let xi = x.clamp(0, i64::from(self.width) - 1) as usize;
        let yi = y.clamp(0, i64::from(self.height) - 1) as usize;
        let i = (yi * self.width as usize + xi) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Bilinear sample at continuous pixel coordinates (pixel centers at `+0.5`).
    pub(crate) fn sample_bilinear(&self, fx: f32, fy: f32) -> [f32; 4] {
        let x = fx - 0.5;
        let y = fy - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let p00 = self.pixel(x0, y0);
        let p10 = self.pixel(x0 + 1, y0);
        let p01 = self.pixel(x0, y0 + 1);
        let p11 = self.pixel(x0 + 1, y0 + 1);
        let mut out = [0.0f32; 4];
        for c in 0..4 {
            let top = p00[c] + (p10[c] - p00[c]) * tx;
            let bot = p01[c] + (p11[c] - p01[c]) * tx;
            out[c] = top + (bot - top) * ty;
        }
        out
    }

    /// Overwrite with `other`, reusing this surface's allocation.
    pub(crate) fn copy_from(&mut self, other: &Surface) {
        self.width = other.width;
        self.height = other.height;
        self.data.clear();
        self.data.extend_from_slice(&other.data);
    }

    /// Resize to `width x height`; sample contents are unspecified afterwards.
    pub(crate) fn reshape(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.resize(pixel_count(width, height) * 4, 0.0);
    }

    pub(crate) fn same_size(&self, other: &Surface) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Heap bytes held by the sample buffer.
    pub fn byte_len(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Caller-owned output raster: straight-alpha RGBA8, row-major.
///
/// Render entry points resize and overwrite it in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 bytes.
    pub data: Vec<u8>,
}

impl Canvas {
    /// Allocate a transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; pixel_count(width, height) * 4],
        }
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.resize(pixel_count(width, height) * 4, 0);
    }

    pub(crate) fn copy_from(&mut self, other: &Canvas) {
        self.resize(other.width, other.height);
        self.data.copy_from_slice(&other.data);
    }

    /// RGBA8 at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

/// Render mode. Partitions frame caches and mutex keys.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum RenderMode {
    /// Interactive, lenient by default.
    #[default]
    Preview,
    /// Full-fidelity output, always strict.
    Export,
}

impl RenderMode {
    /// Lowercase tag used in slot keys.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Export => "export",
        }
    }
}

/// `(mode, slotId)` pair identifying one frame cache and one mutex queue.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SlotKey {
    /// Render mode partition.
    pub mode: RenderMode,
    /// Caller slot id (`"main"` when unspecified).
    pub slot: String,
}

impl SlotKey {
    /// Build a slot key.
    pub fn new(mode: RenderMode, slot: impl Into<String>) -> Self {
        Self {
            mode,
            slot: slot.into(),
        }
    }

    /// Slot used for a local adjustment layer of this slot.
    pub fn local(&self, local_id: &str) -> Self {
        Self {
            mode: self.mode,
            slot: format!("{}:local:{local_id}", self.slot),
        }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.mode.tag(), self.slot)
    }
}

/// Requested output size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TargetSize {
    /// Cropped source size.
    #[default]
    Source,
    /// Fit the cropped frame inside `max` on its longer edge. Never upscales.
    MaxDimension {
        /// Longest edge in pixels.
        max: u32,
    },
    /// Exact output size.
    Exact {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

pub(crate) fn pixel_count(width: u32, height: u32) -> usize {
    (width as usize).saturating_mul(height as usize)
}

pub(crate) fn quantize_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
