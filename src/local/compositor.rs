use rayon::prelude::*;

use crate::adjust::model::{DateStamp, EditingAdjustments, LocalAdjustment};
use crate::adjust::normalize::normalize_adjustments;
use crate::compile::keys::local_adjustment_key;
use crate::foundation::core::Surface;
use crate::foundation::error::{FilmError, FilmResult, RenderStage};
use crate::local::mask::{MaskRaster, range_is_active, rasterize_mask, refine_mask};
use crate::render::frame_state::CachedMask;

/// Global adjustments with a local layer's delta added, renormalized.
///
/// The layer renders the full pipeline on its own, so nested layers and the date stamp are
/// stripped.
pub fn local_layer_adjustments(
    base: &EditingAdjustments,
    local: &LocalAdjustment,
) -> EditingAdjustments {
    let mut a = base.clone();
    a.local_adjustments.clear();
    a.date_stamp = DateStamp::default();
    let d = &local.adjustments;
    a.exposure += d.exposure;
    a.contrast += d.contrast;
    a.highlights += d.highlights;
    a.shadows += d.shadows;
    a.whites += d.whites;
    a.blacks += d.blacks;
    a.temperature += d.temperature;
    a.tint += d.tint;
    a.saturation += d.saturation;
    a.vibrance += d.vibrance;
    a.texture += d.texture;
    a.clarity += d.clarity;
    a.dehaze += d.dehaze;
    normalize_adjustments(&a)
}

/// Key of the mask `local` produces over a composite identified by `composite_key`.
///
/// The composite only matters when range refinement reads it.
pub(crate) fn mask_key(local: &LocalAdjustment, size: (u32, u32), composite_key: &str) -> String {
    let mut key = format!("mask:{}x{}|{}", size.0, size.1, local_adjustment_key(local));
    if range_is_active(&local.mask.range) {
        key.push('|');
        key.push_str(composite_key);
    }
    key
}

/// Build (or reuse) the layer mask against the current composite.
pub(crate) fn layer_mask<'a>(
    cache: &'a mut Option<CachedMask>,
    local: &LocalAdjustment,
    composite: &Surface,
    composite_key: &str,
) -> FilmResult<&'a MaskRaster> {
    let key = mask_key(local, (composite.width, composite.height), composite_key);
    let fresh = cache.as_ref().is_none_or(|c| c.key != key);
    if fresh {
        let mut raster = rasterize_mask(&local.mask, composite.width, composite.height);
        refine_mask(&mut raster, &local.mask.range, composite)?;
        *cache = Some(CachedMask { key, raster });
    } else {
        tracing::debug!(layer = %local.id, "local mask unchanged; reusing");
    }
    match cache {
        Some(c) => Ok(&c.raster),
        None => Err(FilmError::validation("local mask cache is empty")),
    }
}

/// `base = base * (1 - a) + layer * a` with `a = mask * opacity`.
pub fn blend_layer(
    base: &mut Surface,
    layer: &Surface,
    mask: &MaskRaster,
    opacity: f32,
) -> FilmResult<()> {
    if !base.same_size(layer) || mask.width != base.width || mask.height != base.height {
        return Err(FilmError::stage(
            RenderStage::Local,
            FilmError::validation(format!(
                "local layer {}x{} / mask {}x{} do not match base {}x{}",
                layer.width, layer.height, mask.width, mask.height, base.width, base.height
            )),
        ));
    }
    let opacity = opacity.clamp(0.0, 1.0);
    base.data
        .par_chunks_exact_mut(4)
        .zip(layer.data.par_chunks_exact(4))
        .zip(mask.alpha.par_iter())
        .for_each(|((b, l), m)| {
            let a = m * opacity;
            if a <= 0.0 {
                return;
            }
            for c in 0..4 {
                b[c] = b[c] * (1.0 - a) + l[c] * a;
            }
        });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/local/compositor.rs"]
mod tests;
