use std::sync::Arc;

use crate::foundation::core::{Canvas, Surface};
use crate::foundation::error::{FilmError, FilmResult};
use crate::local::mask::MaskRaster;
use crate::render::passes::ScratchUniforms;
use crate::render::surface_pool::SurfacePool;

/// Index of a surface registered in a [`SurfaceArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SurfaceId(u32);

/// Owner of a slot's intermediate surfaces. Everything else refers to them by [`SurfaceId`].
#[derive(Debug, Default)]
pub(crate) struct SurfaceArena {
    slots: Vec<Option<Surface>>,
    free: Vec<u32>,
}

impl SurfaceArena {
    pub(crate) fn insert(&mut self, surface: Surface) -> SurfaceId {
        match self.free.pop() {
            Some(i) => {
                self.slots[i as usize] = Some(surface);
                SurfaceId(i)
            }
            None => {
                self.slots.push(Some(surface));
                SurfaceId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub(crate) fn get(&self, id: SurfaceId) -> FilmResult<&Surface> {
        self.slots
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| FilmError::validation(format!("stale surface handle {}", id.0)))
    }

    /// Swap in `surface`, returning the previous occupant.
    pub(crate) fn replace(&mut self, id: SurfaceId, surface: Surface) -> Option<Surface> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(|slot| slot.replace(surface))
    }

    pub(crate) fn remove(&mut self, id: SurfaceId) -> Option<Surface> {
        let s = self.slots.get_mut(id.0 as usize)?.take()?;
        self.free.push(id.0);
        Some(s)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.slots.iter().flatten().map(Surface::byte_len).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

/// Mask raster cached by a local layer slot, keyed by everything it was built from.
#[derive(Debug)]
pub(crate) struct CachedMask {
    pub(crate) key: String,
    pub(crate) raster: MaskRaster,
}

/// Per-slot render cache.
///
/// Each `*_key` is the dirty key under which the matching surface was produced; an empty key
/// means the surface is missing or stale. Access is serialized by the render mutex.
#[derive(Debug, Default)]
pub(crate) struct FrameState {
    pub(crate) arena: SurfaceArena,
    pub(crate) pool: SurfacePool,
    pub(crate) scratch: ScratchUniforms,

    pub(crate) upload_key: String,
    pub(crate) geometry: Option<SurfaceId>,
    pub(crate) pre_film_key: String,
    pub(crate) pre_film: Option<SurfaceId>,
    pub(crate) pixi_key: String,
    pub(crate) pixi: Option<SurfaceId>,

    /// Base composite with local layers blended in.
    pub(crate) local_blend_key: String,
    pub(crate) local_blend: Option<SurfaceId>,
    /// Mask of this slot when it renders a local layer.
    pub(crate) local_mask: Option<CachedMask>,

    pub(crate) output_key: String,
    /// Last successfully composed output.
    pub(crate) last_good: Option<Canvas>,
    pub(crate) last_render_error: Option<String>,

    /// Source bitmap lease held while this slot's surfaces derive from it.
    pub(crate) source: Option<Arc<Surface>>,
}

/// Cached surfaces a [`FrameState`] tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FrameSurface {
    Geometry,
    PreFilm,
    Pixi,
    LocalBlend,
}

impl FrameState {
    fn handle_mut(&mut self, which: FrameSurface) -> &mut Option<SurfaceId> {
        match which {
            FrameSurface::Geometry => &mut self.geometry,
            FrameSurface::PreFilm => &mut self.pre_film,
            FrameSurface::Pixi => &mut self.pixi,
            FrameSurface::LocalBlend => &mut self.local_blend,
        }
    }

    pub(crate) fn handle(&self, which: FrameSurface) -> Option<SurfaceId> {
        match which {
            FrameSurface::Geometry => self.geometry,
            FrameSurface::PreFilm => self.pre_film,
            FrameSurface::Pixi => self.pixi,
            FrameSurface::LocalBlend => self.local_blend,
        }
    }

    pub(crate) fn surface(&self, which: FrameSurface) -> FilmResult<&Surface> {
        let id = self
            .handle(which)
            .ok_or_else(|| FilmError::validation(format!("{which:?} surface not rendered")))?;
        self.arena.get(id)
    }

    /// Store `surface` as `which`, recycling the previous occupant into the pool.
    pub(crate) fn store(&mut self, which: FrameSurface, surface: Surface) -> SurfaceId {
        match self.handle(which) {
            Some(id) => {
                if let Some(old) = self.arena.replace(id, surface) {
                    self.pool.release(old);
                }
                id
            }
            None => {
                let id = self.arena.insert(surface);
                *self.handle_mut(which) = Some(id);
                id
            }
        }
    }

    /// Forget the keys of `from` and every later stage.
    pub(crate) fn invalidate_from(&mut self, from: FrameSurface) {
        if from == FrameSurface::Geometry {
            self.upload_key.clear();
        }
        if matches!(from, FrameSurface::Geometry | FrameSurface::PreFilm) {
            self.pre_film_key.clear();
        }
        if from != FrameSurface::LocalBlend {
            self.pixi_key.clear();
        }
        self.local_blend_key.clear();
        self.output_key.clear();
    }

    /// Drop every cached surface and key. The last good frame survives.
    pub(crate) fn reset(&mut self) {
        self.invalidate_from(FrameSurface::Geometry);
        self.arena.clear();
        self.pool.clear();
        self.geometry = None;
        self.pre_film = None;
        self.pixi = None;
        self.local_blend = None;
        self.local_mask = None;
        self.source = None;
    }

    /// Bytes held by cached surfaces.
    pub(crate) fn byte_len(&self) -> usize {
        self.arena.byte_len()
    }
}
