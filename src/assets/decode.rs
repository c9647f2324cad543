use std::io::Cursor;

use image::{DynamicImage, ImageDecoder, ImageReader, metadata::Orientation};

use crate::foundation::core::Surface;
use crate::foundation::error::{FilmError, FilmResult};

/// Decode an encoded image, honoring its EXIF orientation, into a working surface.
pub fn decode_source(bytes: &[u8]) -> FilmResult<Surface> {
    if bytes.is_empty() {
        return Err(FilmError::decode("empty source buffer"));
    }
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| FilmError::decode(format!("guess source format: {e}")))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| FilmError::decode(format!("open source decoder: {e}")))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder)
        .map_err(|e| FilmError::decode(format!("decode source: {e}")))?;
    img.apply_orientation(orientation);

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(FilmError::decode("source has zero extent"));
    }
    Surface::from_rgba8(width, height, rgba.as_raw())
}
