use std::{io, path::PathBuf};

/// Errors produced while loading or rendering a map.
#[derive(thiserror::Error, Debug)]
pub enum MapError {
    /// A map, tileset or image file could not be read.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A map or tileset file is not valid JSON for the expected shape.
    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The map is structurally valid JSON but not something we can load.
    #[error("Invalid map: {0}")]
    InvalidMap(String),

    /// An image file could not be decoded.
    #[error("Failed to decode image {}: {message}", path.display())]
    Image { path: PathBuf, message: String },

    /// A tile layer references a gid above every tileset's range.
    #[error("Layer '{layer}' references gid {gid} but the largest known gid is {max_gid}")]
    InvalidTileGid { layer: String, gid: u32, max_gid: u32 },

    /// A tile object references a gid above every tileset's range.
    #[error("Object {object_id} in layer '{layer}' references gid {gid} but the largest known gid is {max_gid}")]
    InvalidObjectGid {
        layer: String,
        object_id: u32,
        gid: u32,
        max_gid: u32,
    },

    /// A custom property declares a type we do not understand.
    #[error("Property '{name}' has unsupported type '{kind}'")]
    UnsupportedPropertyType { name: String, kind: String },

    /// A color string is not a hex web color.
    #[error("Invalid color '{0}'")]
    InvalidColor(String),

    /// A gid was drawn but has no backing image.
    #[error("No tile image for gid {gid}")]
    TileResolution { gid: u32 },

    /// The composed map does not fit in a single image.
    #[error("Map of {width}x{height} pixels is too large for a single image")]
    SurfaceTooLarge { width: u32, height: u32 },
}

/// Shorthand for results carrying a [`MapError`].
pub type Result<T> = std::result::Result<T, MapError>;
