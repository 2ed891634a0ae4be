use crate::error::Result;
use crate::ir_map::IrLayerKind;
use crate::map::Map;
use crate::surface::{new_surface, Surface};
use log::debug;
use macroquad::texture::{FilterMode, Image, Texture2D};
use std::path::Path;

/// Composites the layers of a loaded [`Map`] onto a [`Surface`].
///
/// Build one per map and reuse it: [`MapRenderer::render`] redraws into a
/// surface you keep around, [`MapRenderer::make_map`] allocates a fresh one
/// every call and is meant for one-off use such as baking a static background.
pub struct MapRenderer {
    map: Map,
    pixel_size: (u32, u32),
}

impl MapRenderer {
    /// Loads the map at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_map(Map::load(path)?))
    }

    /// Wraps an already loaded map.
    pub fn from_map(map: Map) -> Self {
        let pixel_size = map.pixel_size();
        Self { map, pixel_size }
    }

    /// The map being rendered.
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Size of the fully composed map in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        self.pixel_size
    }

    /// Draws the map onto `dest`.
    ///
    /// `dest` should be at least [`pixel_size`](Self::pixel_size); anything
    /// beyond its edges is clipped. A gid without an image aborts the call
    /// with [`MapError::TileResolution`](crate::MapError::TileResolution),
    /// leaving `dest` partially drawn.
    pub fn render<S: Surface + ?Sized>(&self, dest: &mut S) -> Result<()> {
        let map = &self.map;
        let (tw, th) = (map.tile_w, map.tile_h);

        if let Some(color) = map.background_color {
            dest.fill(color);
        }

        let mut drawn = 0usize;
        for layer in map.visible_layers() {
            match &layer.kind {
                IrLayerKind::Tiles { .. } => {
                    for (x, y, gid) in layer.tiles() {
                        let tile = map.tile_image(gid)?;
                        dest.blit(&tile, (x as u32).saturating_mul(tw), (y as u32).saturating_mul(th));
                        drawn += 1;
                    }
                }
                IrLayerKind::Objects { .. } => {}
                IrLayerKind::Image { gid, .. } => {
                    if !gid.is_empty() {
                        let image = map.tile_image(*gid)?;
                        dest.blit(&image, 0, 0);
                        drawn += 1;
                    }
                }
            }
        }

        debug!("Rendered {drawn} tiles and images onto {:?}", dest.size());
        Ok(())
    }

    /// Renders into a new opaque black image of exactly [`pixel_size`](Self::pixel_size).
    pub fn make_map(&self) -> Result<Image> {
        let (w, h) = self.pixel_size;
        let mut surface = new_surface(w, h)?;
        self.render(&mut surface)?;
        Ok(surface)
    }

    /// Like [`make_map`](Self::make_map), uploaded to the GPU with nearest filtering.
    ///
    /// Needs a running Macroquad window.
    pub fn make_texture(&self) -> Result<Texture2D> {
        let tex = Texture2D::from_image(&self.make_map()?);
        tex.set_filter(FilterMode::Nearest);
        Ok(tex)
    }
}
