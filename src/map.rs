use crate::color::parse_hex_color;
use crate::error::{MapError, Result};
use crate::ir_map::*;
use crate::loader::json_loader::decode_map_file_to_ir;
use crate::properties::Properties;
use log::{debug, info};
use macroquad::color::Color;
use macroquad::math::Rect;
use macroquad::texture::Image;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

/// Decoded tile images keyed by clean gid, plus pre-flipped variants keyed by raw gid.
#[derive(Default)]
pub struct TileImages {
    lut: Vec<Option<Image>>,
    flipped: HashMap<u32, Image>,
}

impl TileImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, gid: u32, image: Image) {
        let idx = gid as usize;
        if idx >= self.lut.len() {
            self.lut.resize_with(idx + 1, || None);
        }
        self.lut[idx] = Some(image);
    }

    #[inline]
    pub fn get(&self, gid: u32) -> Option<&Image> {
        self.lut.get(gid as usize)?.as_ref()
    }

    /// Builds and keeps the transformed image for a flipped gid.
    pub fn cache_flip(&mut self, gid: TileId) {
        if !gid.is_flipped() || self.flipped.contains_key(&gid.0) {
            return;
        }
        if let Some(base) = self.get(gid.clean()) {
            let img = flipped(base, gid);
            self.flipped.insert(gid.0, img);
        }
    }

    #[inline]
    fn get_flipped(&self, gid: TileId) -> Option<&Image> {
        self.flipped.get(&gid.0)
    }

    /// Number of decoded base images; cached flips are not counted.
    pub fn len(&self) -> usize {
        self.lut.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A loaded map: layout from the IR plus every tile image it can draw.
pub struct Map {
    pub width: u32,
    pub height: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub background_color: Option<Color>,
    pub properties: Properties,
    pub layers: Vec<IrLayer>,
    pub tilesets: Vec<IrTileset>,
    pub tiles: TileImages,
}

fn read_image(path: &Path) -> Result<Image> {
    let bytes = std::fs::read(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Image::from_file_with_format(&bytes, None).map_err(|e| MapError::Image {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl Map {
    /// Loads a Tiled JSON map and decodes every tileset and image-layer image.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (ir, base) = decode_map_file_to_ir(path)?;
        let map = Self::from_ir(ir, &base)?;
        info!(
            "Loaded {} ({}x{} tiles, {} layers, {} tile images)",
            path.display(),
            map.width,
            map.height,
            map.layers.len(),
            map.tiles.len()
        );
        Ok(map)
    }

    /// Builds a map from IR, reading images relative to `base_dir`.
    pub fn from_ir(ir: IrMap, base_dir: &Path) -> Result<Self> {
        if ir.width.checked_mul(ir.tile_w).is_none() || ir.height.checked_mul(ir.tile_h).is_none() {
            return Err(MapError::InvalidMap(format!(
                "{}x{} tiles of {}x{} px overflow the map's pixel size",
                ir.width, ir.height, ir.tile_w, ir.tile_h
            )));
        }

        // An empty color means no background.
        let background_color = ir
            .background_color
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(parse_hex_color)
            .transpose()?;

        // Several tilesets may share one atlas file.
        let mut decoded: HashMap<String, Image> = HashMap::new();
        let mut tiles = TileImages::new();

        for t in &ir.tilesets {
            match t {
                IrTileset::Atlas {
                    first_gid,
                    image,
                    tile_w,
                    tile_h,
                    tilecount,
                    columns,
                    spacing,
                    margin,
                    ..
                } => {
                    if *columns == 0 {
                        return Err(MapError::InvalidMap(format!(
                            "Atlas {image} has zero columns"
                        )));
                    }
                    if !decoded.contains_key(image) {
                        let img = read_image(&base_dir.join(image))?;
                        debug!("Decoded atlas {} ({}x{})", image, img.width, img.height);
                        decoded.insert(image.clone(), img);
                    }
                    let Some(atlas) = decoded.get(image) else {
                        continue;
                    };

                    for local in 0..*tilecount {
                        let col = local % columns;
                        let row = local / columns;
                        let sx = margin + col * (tile_w + spacing);
                        let sy = margin + row * (tile_h + spacing);
                        if sx + tile_w > atlas.width as u32 || sy + tile_h > atlas.height as u32 {
                            return Err(MapError::InvalidMap(format!(
                                "Tile {local} of atlas {image} lies outside the {}x{} image",
                                atlas.width, atlas.height
                            )));
                        }
                        let tile = atlas.sub_image(Rect::new(
                            sx as f32,
                            sy as f32,
                            *tile_w as f32,
                            *tile_h as f32,
                        ));
                        tiles.insert(first_gid + local, tile);
                    }
                }
                IrTileset::Collection {
                    first_gid, images, ..
                } => {
                    for tile in images {
                        let img = read_image(&base_dir.join(&tile.image))?;
                        debug!("Decoded tile image {} as gid {}", tile.image, first_gid + tile.id);
                        tiles.insert(first_gid + tile.id, img);
                    }
                }
            }
        }

        let mut map = Self {
            width: ir.width,
            height: ir.height,
            tile_w: ir.tile_w,
            tile_h: ir.tile_h,
            background_color,
            properties: ir.properties,
            layers: ir.layers,
            tilesets: ir.tilesets,
            tiles,
        };
        map.cache_flipped_tiles();
        Ok(map)
    }

    /// Pre-builds every flipped tile variant the tile layers reference.
    ///
    /// [`Map::from_ir`] does this already; call it after editing `layers` or
    /// `tiles` by hand so rendering does not transform tiles per cell.
    pub fn cache_flipped_tiles(&mut self) {
        for layer in &self.layers {
            for (_, _, gid) in layer.tiles() {
                self.tiles.cache_flip(gid);
            }
        }
    }

    /// `(width * tile_w, height * tile_h)`.
    #[inline]
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.tile_w),
            self.height.saturating_mul(self.tile_h),
        )
    }

    /// Layers in draw order, skipping hidden ones.
    pub fn visible_layers(&self) -> impl Iterator<Item = &IrLayer> {
        self.layers.iter().filter(|l| l.visible)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&IrLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn objects(&self) -> impl Iterator<Item = &IrObject> {
        self.layers.iter().flat_map(|l| match &l.kind {
            IrLayerKind::Objects { objects } => objects.as_slice(),
            IrLayerKind::Tiles { .. } | IrLayerKind::Image { .. } => &[][..],
        })
    }

    /// Resolves a gid to its image, applying any flip flags.
    ///
    /// Flipped variants come from the cache built at load time; one missing
    /// from the cache is transformed on the fly.
    pub fn tile_image(&self, gid: TileId) -> Result<Cow<'_, Image>> {
        if let Some(img) = self.tiles.get_flipped(gid) {
            return Ok(Cow::Borrowed(img));
        }
        let clean = gid.clean();
        let img = match clean {
            0 => None,
            _ => self.tiles.get(clean),
        }
        .ok_or(MapError::TileResolution { gid: clean })?;

        if gid.is_flipped() {
            Ok(Cow::Owned(flipped(img, gid)))
        } else {
            Ok(Cow::Borrowed(img))
        }
    }
}

/// Diagonal flip (transpose) first, then horizontal, then vertical.
fn flipped(src: &Image, gid: TileId) -> Image {
    let (sw, sh) = (src.width as usize, src.height as usize);
    let (dw, dh) = if gid.flip_d() { (sh, sw) } else { (sw, sh) };
    let mut out = Image {
        bytes: vec![0; dw * dh * 4],
        width: dw as u16,
        height: dh as u16,
    };

    for dy in 0..dh {
        for dx in 0..dw {
            let x = if gid.flip_h() { dw - 1 - dx } else { dx };
            let y = if gid.flip_v() { dh - 1 - dy } else { dy };
            let (sx, sy) = if gid.flip_d() { (y, x) } else { (x, y) };
            let s = (sy * sw + sx) * 4;
            let d = (dy * dw + dx) * 4;
            out.bytes[d..d + 4].copy_from_slice(&src.bytes[s..s + 4]);
        }
    }
    out
}
