use crate::properties::Properties;
use macroquad::math::Vec2;

pub const FLIP_H: u32 = 0x8000_0000; // bit 31
pub const FLIP_V: u32 = 0x4000_0000; // bit 30
pub const FLIP_D: u32 = 0x2000_0000; // bit 29
pub const GID_MASK: u32 = 0x1FFF_FFFF; // keep lower 29 bits (bit 28 is free)

/// A raw Tiled gid, flip flags included. `0` means "no tile".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    pub const EMPTY: TileId = TileId(0);

    #[inline] pub fn clean(self) -> u32 { self.0 & GID_MASK }
    #[inline] pub fn is_empty(self) -> bool { self.clean() == 0 }
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }
    #[inline] pub fn is_flipped(self) -> bool { (self.0 & !GID_MASK) != 0 }
}

/// Canonical, format-agnostic map.
#[derive(Debug, Clone)]
pub struct IrMap {
    pub width: u32,
    pub height: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub background_color: Option<String>,
    pub properties: Properties,
    pub tilesets: Vec<IrTileset>, // sorted by first_gid
    pub layers: Vec<IrLayer>,     // draw order: array order
}

#[derive(Debug, Clone)]
pub enum IrTileset {
    /// One image atlas with a regular grid.
    Atlas {
        first_gid: u32,
        image: String,
        tile_w: u32,
        tile_h: u32,
        tilecount: u32,
        columns: u32,
        spacing: u32, // 0 if not used
        margin: u32,  // 0 if not used
        properties: Properties,
        tiles: Vec<IrTileMetadata>,
    },
    /// One image per tile. Ids may be sparse.
    Collection {
        first_gid: u32,
        images: Vec<IrTileImage>,
        properties: Properties,
        tiles: Vec<IrTileMetadata>,
    },
}

impl IrTileset {
    pub fn first_gid(&self) -> u32 {
        match self {
            IrTileset::Atlas { first_gid, .. } | IrTileset::Collection { first_gid, .. } => {
                *first_gid
            }
        }
    }

    /// Highest gid this tileset can resolve, or `first_gid - 1` when empty.
    pub fn last_gid(&self) -> u32 {
        match self {
            IrTileset::Atlas {
                first_gid,
                tilecount,
                ..
            } => (first_gid + tilecount).saturating_sub(1),
            IrTileset::Collection {
                first_gid, images, ..
            } => images
                .iter()
                .map(|t| first_gid + t.id)
                .max()
                .unwrap_or(first_gid.saturating_sub(1)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrTileImage {
    pub id: u32,
    pub image: String,
}

#[derive(Debug, Clone)]
pub struct IrTileMetadata {
    pub id: u32,
    pub properties: Properties,
    pub objects: Vec<IrObject>,
}

#[derive(Debug, Clone)]
pub enum IrLayerKind {
    Tiles {
        width: usize,
        height: usize,
        data: Vec<TileId>, // row-major, flip flags kept
    },
    Objects {
        objects: Vec<IrObject>,
    },
    /// Full-layer image anchored at the map origin.
    Image {
        gid: TileId,
        image: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct IrLayer {
    pub name: String,
    pub visible: bool,
    pub properties: Properties,
    pub kind: IrLayerKind,
}

impl IrLayer {
    /// Occupied cells of a tile layer as `(x, y, gid)`. Empty for other kinds.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, TileId)> + '_ {
        let (width, data): (usize, &[TileId]) = match &self.kind {
            IrLayerKind::Tiles { width, data, .. } => ((*width).max(1), data.as_slice()),
            IrLayerKind::Objects { .. } | IrLayerKind::Image { .. } => (1, &[][..]),
        };
        data.iter()
            .enumerate()
            .filter(|(_, gid)| !gid.is_empty())
            .map(move |(idx, gid)| (idx % width, idx / width, *gid))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrObjectShape {
    Rectangle,
    Point,
    Polygon(Vec<Vec2>),
    Polyline(Vec<Vec2>),
    Tile { gid: u32 },
}

#[derive(Debug, Clone)]
pub struct IrObject {
    pub id: u32,
    pub name: String,
    pub class_name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub visible: bool,
    pub shape: IrObjectShape,
    pub properties: Properties,
}
