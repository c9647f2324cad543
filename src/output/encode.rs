use image::ImageEncoder as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;

use crate::foundation::core::Canvas;
use crate::foundation::error::{FilmError, FilmResult};

/// Export container formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    /// Lossless PNG with alpha.
    Png,
    /// Baseline JPEG; alpha is flattened onto black.
    Jpeg,
    /// Lossless WebP with alpha.
    Webp,
}

impl OutputFormat {
    /// Parse a MIME type such as `image/jpeg`.
    pub fn from_mime(mime: &str) -> FilmResult<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Ok(Self::Png),
            "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            "image/webp" => Ok(Self::Webp),
            other => Err(FilmError::validation(format!(
                "unsupported output type '{other}'"
            ))),
        }
    }

    /// Canonical MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// Encode `canvas` as `format`. `quality` (1..=100) only affects JPEG.
pub fn encode_canvas(canvas: &Canvas, format: OutputFormat, quality: u8) -> FilmResult<Vec<u8>> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(FilmError::encode("cannot encode an empty canvas"));
    }
    let mut out = Vec::new();
    let (w, h) = (canvas.width, canvas.height);
    let result = match format {
        OutputFormat::Png => PngEncoder::new(&mut out).write_image(
            &canvas.data,
            w,
            h,
            image::ExtendedColorType::Rgba8,
        ),
        OutputFormat::Jpeg => {
            let rgb = flatten_rgb(&canvas.data);
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).write_image(
                &rgb,
                w,
                h,
                image::ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::Webp => WebPEncoder::new_lossless(&mut out).write_image(
            &canvas.data,
            w,
            h,
            image::ExtendedColorType::Rgba8,
        ),
    };
    result.map_err(|e| FilmError::encode(format!("{} encode failed: {e}", format.mime())))?;
    Ok(out)
}

fn flatten_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let a = u16::from(px[3]);
        for &c in &px[..3] {
            rgb.push(((u16::from(c) * a + 127) / 255) as u8);
        }
    }
    rgb
}
