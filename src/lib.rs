#![warn(missing_docs)]

//! Load Tiled JSON maps and composite their layers into Macroquad images.

#[allow(missing_docs)]
mod color;
#[allow(missing_docs)]
mod error;
#[allow(missing_docs)]
mod ir_map;
mod loader {
    #[allow(missing_docs)]
    pub mod json_loader;
}
#[allow(missing_docs)]
mod map;
#[allow(missing_docs)]
mod properties;
mod render;
mod surface;

pub use color::parse_hex_color;
pub use error::{MapError, Result};
pub use ir_map::{
    IrLayer, IrLayerKind, IrMap, IrObject, IrObjectShape, IrTileImage, IrTileMetadata, IrTileset,
    TileId, FLIP_D, FLIP_H, FLIP_V, GID_MASK,
};
pub use loader::json_loader::{decode_map_file_to_ir, decode_map_str_to_ir};
pub use map::{Map, TileImages};
pub use properties::{Properties, PropertyValue};
pub use render::MapRenderer;
pub use surface::{new_surface, Surface};
