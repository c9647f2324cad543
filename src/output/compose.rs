use crate::adjust::model::DateStamp;
use crate::foundation::core::{Canvas, Surface};
use crate::foundation::error::{FilmError, FilmResult, RenderStage};
use crate::output::stamp::draw_date_stamp;

/// Quantize `surface` into `canvas` (resizing it) and draw the overlay on top.
pub fn compose_output(
    surface: &Surface,
    stamp: &DateStamp,
    canvas: &mut Canvas,
) -> FilmResult<()> {
    canvas.resize(surface.width, surface.height);
    surface.write_rgba8(&mut canvas.data);
    if stamp.enabled && !stamp.text.is_empty() {
        draw_date_stamp(canvas, stamp).map_err(|e| FilmError::stage(RenderStage::Output, e))?;
    }
    Ok(())
}
