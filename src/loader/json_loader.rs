use crate::error::{MapError, Result};
use crate::ir_map::*;
use crate::properties::{Properties, PropertyValue};
use log::{debug, warn};
use macroquad::math::vec2;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// CSV layers carry a number array, base64 layers a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonLayerData {
    Cells(Vec<u32>),
    Encoded(String),
}

impl Default for JsonLayerData {
    fn default() -> Self {
        JsonLayerData::Cells(Vec::new())
    }
}

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(default)]
    data: JsonLayerData,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    objects: Vec<JsonObject>,
    #[serde(default)]
    image: String,
    #[serde(default)]
    layers: Vec<JsonLayer>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct JsonTilesetRef {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(flatten)]
    embedded: serde_json::Map<String, JsonValue>,
}

#[derive(Deserialize)]
struct JsonMap {
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    infinite: bool,
    #[serde(default)]
    backgroundcolor: Option<String>,
    layers: Vec<JsonLayer>,
    #[serde(default)]
    tilesets: Vec<JsonTilesetRef>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonTileset {
    #[serde(default)]
    name: String,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    tilecount: u32,
    #[serde(default)]
    columns: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    tiles: Vec<JsonTile>,
}

#[derive(Deserialize)]
struct JsonProperty {
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    value: JsonValue,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    point: bool,
    #[serde(default)]
    polygon: Vec<JsonObjectPoint>,
    #[serde(default)]
    polyline: Vec<JsonObjectPoint>,
    #[serde(default)]
    gid: Option<u32>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonObjectPoint {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Default)]
struct JsonObjectGroup {
    #[serde(default)]
    objects: Vec<JsonObject>,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    objectgroup: JsonObjectGroup,
}

fn json_property_to_ir(prop: JsonProperty) -> Result<Option<(String, PropertyValue)>> {
    let JsonProperty { name, kind, value } = prop;

    let parsed = match kind.as_deref() {
        Some("bool") => value.as_bool().map(PropertyValue::Bool),
        Some("int") | Some("object") => value.as_i64().map(PropertyValue::I64),
        Some("float") => value.as_f64().map(|n| PropertyValue::F32(n as f32)),
        Some("string") | Some("file") | Some("color") | Some("class") => {
            value.as_str().map(|s| PropertyValue::String(s.to_owned()))
        }
        Some(other) => {
            return Err(MapError::UnsupportedPropertyType {
                name,
                kind: other.to_owned(),
            });
        }
        None => {
            if let Some(v) = value.as_bool() {
                Some(PropertyValue::Bool(v))
            } else if let Some(v) = value.as_i64() {
                Some(PropertyValue::I64(v))
            } else if let Some(v) = value.as_f64() {
                Some(PropertyValue::F32(v as f32))
            } else {
                value.as_str().map(|s| PropertyValue::String(s.to_owned()))
            }
        }
    };

    Ok(parsed.map(|value| (name, value)))
}

fn properties_from_json(props: Vec<JsonProperty>) -> Result<Properties> {
    let mut out = Properties::new();
    for p in props {
        if let Some((name, value)) = json_property_to_ir(p)? {
            out.insert(name, value);
        }
    }
    Ok(out)
}

fn object_to_ir(obj: JsonObject) -> Result<IrObject> {
    let shape = if let Some(gid) = obj.gid {
        IrObjectShape::Tile { gid }
    } else if obj.point {
        IrObjectShape::Point
    } else if !obj.polygon.is_empty() {
        IrObjectShape::Polygon(obj.polygon.into_iter().map(|p| vec2(p.x, p.y)).collect())
    } else if !obj.polyline.is_empty() {
        IrObjectShape::Polyline(obj.polyline.into_iter().map(|p| vec2(p.x, p.y)).collect())
    } else {
        IrObjectShape::Rectangle
    };

    let class_name = if !obj.class.is_empty() {
        obj.class
    } else {
        obj.kind
    };

    Ok(IrObject {
        id: obj.id,
        name: obj.name,
        class_name,
        x: obj.x,
        y: obj.y,
        width: obj.width,
        height: obj.height,
        rotation: obj.rotation,
        visible: obj.visible,
        shape,
        properties: properties_from_json(obj.properties)?,
    })
}

/// Joins `image` onto the directory of `source`, both relative to the map file.
fn relative_to(source_dir: Option<&Path>, image: &str) -> String {
    match source_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(image).to_string_lossy().into_owned(),
        _ => image.to_owned(),
    }
}

fn tileset_to_ir(
    first_gid: u32,
    ts: JsonTileset,
    source_dir: Option<&Path>,
    map_tile: (u32, u32),
) -> Result<IrTileset> {
    if (ts.tilewidth, ts.tileheight) != map_tile {
        warn!(
            "Tileset '{}' uses {}x{} tiles but the map grid is {}x{}; tiles are anchored top-left",
            ts.name, ts.tilewidth, ts.tileheight, map_tile.0, map_tile.1
        );
    }

    let properties = properties_from_json(ts.properties)?;
    let mut images = Vec::new();
    let mut tiles = Vec::with_capacity(ts.tiles.len());
    for tile in ts.tiles {
        if let Some(image) = &tile.image {
            images.push(IrTileImage {
                id: tile.id,
                image: relative_to(source_dir, image),
            });
        }
        tiles.push(IrTileMetadata {
            id: tile.id,
            properties: properties_from_json(tile.properties)?,
            objects: tile
                .objectgroup
                .objects
                .into_iter()
                .map(object_to_ir)
                .collect::<Result<Vec<_>>>()?,
        });
    }

    match ts.image {
        Some(image) => {
            if ts.columns == 0 {
                return Err(MapError::InvalidMap(format!(
                    "Tileset '{}' has an atlas image but zero columns",
                    ts.name
                )));
            }
            Ok(IrTileset::Atlas {
                first_gid,
                image: relative_to(source_dir, &image),
                tile_w: ts.tilewidth,
                tile_h: ts.tileheight,
                tilecount: ts.tilecount,
                columns: ts.columns,
                spacing: ts.spacing,
                margin: ts.margin,
                properties,
                tiles,
            })
        }
        None => Ok(IrTileset::Collection {
            first_gid,
            images,
            properties,
            tiles,
        }),
    }
}

/// Walks layers in document order, flattening groups into `out`.
struct LayerDecoder {
    max_gid: u32,
    next_gid: u32,
    image_tilesets: Vec<IrTileset>,
}

impl LayerDecoder {
    fn decode(
        &mut self,
        layers: Vec<JsonLayer>,
        map_size: (usize, usize),
        parent_visible: bool,
        out: &mut Vec<IrLayer>,
    ) -> Result<()> {
        for l in layers {
            let visible = parent_visible && l.visible;
            let kind_name = l.kind.as_deref().unwrap_or("tilelayer");

            if kind_name == "group" {
                self.decode(l.layers, map_size, visible, out)?;
                continue;
            }

            let layer_name = l.name;
            let properties = properties_from_json(l.properties)?;
            let layer_kind = match kind_name {
                "tilelayer" => {
                    let encoding = l.encoding.as_deref().unwrap_or("csv");
                    let data = match l.data {
                        JsonLayerData::Cells(cells) if encoding == "csv" => cells,
                        JsonLayerData::Cells(_) | JsonLayerData::Encoded(_) => {
                            return Err(MapError::InvalidMap(format!(
                                "Layer '{layer_name}' uses unsupported '{encoding}' encoding"
                            )));
                        }
                    };
                    let (width, height) = if l.width == 0 && l.height == 0 {
                        map_size
                    } else {
                        (l.width, l.height)
                    };
                    if data.len() != width * height {
                        return Err(MapError::InvalidMap(format!(
                            "Layer '{layer_name}' has {} cells, expected {width}x{height}",
                            data.len()
                        )));
                    }
                    for &raw_gid in &data {
                        let gid = raw_gid & GID_MASK;
                        if gid != 0 && gid > self.max_gid {
                            return Err(MapError::InvalidTileGid {
                                layer: layer_name,
                                gid,
                                max_gid: self.max_gid,
                            });
                        }
                    }
                    IrLayerKind::Tiles {
                        width,
                        height,
                        data: data.into_iter().map(TileId).collect(),
                    }
                }
                "objectgroup" => IrLayerKind::Objects {
                    objects: l
                        .objects
                        .into_iter()
                        .map(|obj| {
                            if let Some(raw_gid) = obj.gid {
                                let gid = raw_gid & GID_MASK;
                                if gid == 0 || gid > self.max_gid {
                                    return Err(MapError::InvalidObjectGid {
                                        layer: layer_name.clone(),
                                        object_id: obj.id,
                                        gid,
                                        max_gid: self.max_gid,
                                    });
                                }
                            }
                            object_to_ir(obj)
                        })
                        .collect::<Result<Vec<_>>>()?,
                },
                "imagelayer" => {
                    if l.image.is_empty() {
                        IrLayerKind::Image {
                            gid: TileId::EMPTY,
                            image: None,
                        }
                    } else {
                        // Image layers resolve through the same gid lookup as tiles.
                        let gid = self.next_gid;
                        self.next_gid += 1;
                        self.image_tilesets.push(IrTileset::Collection {
                            first_gid: gid,
                            images: vec![IrTileImage {
                                id: 0,
                                image: l.image.clone(),
                            }],
                            properties: Properties::new(),
                            tiles: Vec::new(),
                        });
                        IrLayerKind::Image {
                            gid: TileId(gid),
                            image: Some(l.image),
                        }
                    }
                }
                other => {
                    return Err(MapError::InvalidMap(format!(
                        "Layer '{layer_name}' has unknown type '{other}'"
                    )));
                }
            };

            out.push(IrLayer {
                name: layer_name,
                visible,
                properties,
                kind: layer_kind,
            });
        }
        Ok(())
    }
}

/// Decodes a Tiled JSON map (and its external tilesets) into an [`IrMap`].
///
/// Returns the map together with the directory every relative image path in
/// the IR is relative to.
pub fn decode_map_file_to_ir(path: impl AsRef<Path>) -> Result<(IrMap, PathBuf)> {
    let p = path.as_ref();
    if p.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(MapError::InvalidMap(format!(
            "Map file must be a JSON file: {}",
            p.display()
        )));
    }

    let txt = std::fs::read_to_string(p).map_err(|source| MapError::Io {
        path: p.to_path_buf(),
        source,
    })?;

    let map_dir = p
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));

    let ir = decode_map_str_to_ir(&txt, p, &map_dir)?;
    Ok((ir, map_dir))
}

/// Decodes map JSON already in memory. External tilesets are read relative to
/// `map_dir`; `origin` is only used in error messages.
pub fn decode_map_str_to_ir(txt: &str, origin: &Path, map_dir: &Path) -> Result<IrMap> {
    let j: JsonMap = serde_json::from_str(txt).map_err(|source| MapError::Json {
        path: origin.to_path_buf(),
        source,
    })?;

    if j.infinite {
        return Err(MapError::InvalidMap(format!(
            "Infinite maps are not supported: {}",
            origin.display()
        )));
    }

    let map_tile = (j.tilewidth, j.tileheight);
    let mut ir_tilesets = Vec::with_capacity(j.tilesets.len());
    for ts in j.tilesets {
        let tileset = match ts.source {
            Some(source) => {
                if !source.ends_with(".json") {
                    return Err(MapError::InvalidMap(format!(
                        "External tileset must be JSON: {source}"
                    )));
                }
                let ts_path = map_dir.join(&source);
                debug!("Reading tileset {}", ts_path.display());
                let ext_txt = std::fs::read_to_string(&ts_path).map_err(|source| MapError::Io {
                    path: ts_path.clone(),
                    source,
                })?;
                let ext: JsonTileset =
                    serde_json::from_str(&ext_txt).map_err(|source| MapError::Json {
                        path: ts_path,
                        source,
                    })?;
                tileset_to_ir(ts.firstgid, ext, Path::new(&source).parent(), map_tile)?
            }
            None => {
                let embedded: JsonTileset =
                    serde_json::from_value(JsonValue::Object(ts.embedded)).map_err(|source| {
                        MapError::Json {
                            path: origin.to_path_buf(),
                            source,
                        }
                    })?;
                tileset_to_ir(ts.firstgid, embedded, None, map_tile)?
            }
        };
        ir_tilesets.push(tileset);
    }

    ir_tilesets.sort_by_key(IrTileset::first_gid);

    let max_gid = ir_tilesets.iter().map(IrTileset::last_gid).max().unwrap_or(0);

    let mut decoder = LayerDecoder {
        max_gid,
        next_gid: max_gid + 1,
        image_tilesets: Vec::new(),
    };
    let mut ir_layers = Vec::with_capacity(j.layers.len());
    decoder.decode(
        j.layers,
        (j.width as usize, j.height as usize),
        true,
        &mut ir_layers,
    )?;
    ir_tilesets.append(&mut decoder.image_tilesets);

    Ok(IrMap {
        width: j.width,
        height: j.height,
        tile_w: j.tilewidth,
        tile_h: j.tileheight,
        background_color: j.backgroundcolor,
        properties: properties_from_json(j.properties)?,
        tilesets: ir_tilesets,
        layers: ir_layers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("failed to write fixture");
        path
    }

    const TILESET_JSON: &str = r#"{
      "tilewidth":16,
      "tileheight":16,
      "tilecount":4,
      "columns":2,
      "image":"tiles.png"
    }"#;

    #[test]
    fn parses_properties_for_map_layer_object_tileset_and_tile() {
        let dir = tempfile::tempdir().expect("temp dir");

        let map_json = r#"{
          "width": 2, "height": 2,
          "tilewidth": 16,
          "tileheight": 16,
          "properties": [
            {"name":"is_night","type":"bool","value":true},
            {"name":"gravity","type":"float","value":9.8},
            {"name":"theme","type":"string","value":"forest"}
          ],
          "layers": [
            {
              "type":"tilelayer",
              "name":"ground",
              "width":2,
              "height":2,
              "data":[1,0,0,0],
              "properties":[
                {"name":"is_solid","type":"bool","value":true},
                {"name":"difficulty","type":"int","value":3}
              ]
            },
            {
              "type":"objectgroup",
              "name":"spawns",
              "objects":[
                {
                  "id": 7,
                  "name":"spawn_1",
                  "type":"spawn",
                  "properties":[{"name":"kind","type":"string","value":"player"}]
                }
              ],
              "properties":[{"name":"enabled","type":"bool","value":true}]
            }
          ],
          "tilesets":[{"firstgid":1,"source":"tileset.json"}]
        }"#;

        let tileset_json = r#"{
          "tilewidth":16,
          "tileheight":16,
          "tilecount":4,
          "columns":2,
          "image":"tiles.png",
          "properties":[{"name":"biome","type":"string","value":"forest"}],
          "tiles":[
            {
              "id":0,
              "properties":[{"name":"damage","type":"int","value":10}],
              "objectgroup":{
                "objects":[
                  {"id":1,"name":"hitbox","type":"shape","properties":[{"name":"sensor","type":"bool","value":false}]}
                ]
              }
            }
          ]
        }"#;

        let map_path = write(dir.path(), "map.json", map_json);
        write(dir.path(), "tileset.json", tileset_json);

        let (ir, _) = decode_map_file_to_ir(&map_path).expect("decode");

        assert_eq!(ir.properties.get_bool("is_night"), Some(true));
        assert_eq!(ir.properties.get_f32("gravity"), Some(9.8));
        assert_eq!(ir.properties.get_string("theme"), Some("forest"));

        assert_eq!(ir.layers[0].properties.get_bool("is_solid"), Some(true));
        assert_eq!(ir.layers[0].properties.get_i32("difficulty"), Some(3));

        match &ir.layers[1].kind {
            IrLayerKind::Objects { objects } => {
                assert_eq!(objects.len(), 1);
                assert_eq!(objects[0].class_name, "spawn");
                assert_eq!(objects[0].properties.get_string("kind"), Some("player"));
            }
            _ => panic!("expected object layer"),
        }

        match &ir.tilesets[0] {
            IrTileset::Atlas {
                properties, tiles, ..
            } => {
                assert_eq!(properties.get_string("biome"), Some("forest"));
                assert_eq!(tiles.len(), 1);
                assert_eq!(tiles[0].properties.get_i32("damage"), Some(10));
                assert_eq!(tiles[0].objects.len(), 1);
                assert_eq!(
                    tiles[0].objects[0].properties.get_bool("sensor"),
                    Some(false)
                );
            }
            IrTileset::Collection { .. } => panic!("expected atlas tileset"),
        }
    }

    #[test]
    fn flattens_groups_and_inherits_visibility() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
          "layers": [
            {"type":"tilelayer","name":"base","data":[1]},
            {"type":"group","name":"g","visible":false,"layers":[
              {"type":"tilelayer","name":"inner","data":[2]},
              {"type":"group","name":"g2","layers":[
                {"type":"objectgroup","name":"deep","objects":[]}
              ]}
            ]},
            {"type":"tilelayer","name":"top","data":[0]}
          ],
          "tilesets":[{"firstgid":1,"source":"tileset.json"}]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);
        write(dir.path(), "tileset.json", TILESET_JSON);

        let (ir, _) = decode_map_file_to_ir(&map_path).expect("decode");
        let names: Vec<_> = ir.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["base", "inner", "deep", "top"]);
        let visible: Vec<_> = ir.layers.iter().map(|l| l.visible).collect();
        assert_eq!(visible, [true, false, false, true]);
    }

    #[test]
    fn image_layers_get_fresh_gids_above_tilesets() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r##"{
          "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
          "backgroundcolor": "#336699",
          "layers": [
            {"type":"imagelayer","name":"sky","image":"sky.png"},
            {"type":"imagelayer","name":"blank","image":""}
          ],
          "tilesets":[{"firstgid":1,"source":"tileset.json"}]
        }"##;
        let map_path = write(dir.path(), "map.json", map_json);
        write(dir.path(), "tileset.json", TILESET_JSON);

        let (ir, _) = decode_map_file_to_ir(&map_path).expect("decode");
        assert_eq!(ir.background_color.as_deref(), Some("#336699"));
        match &ir.layers[0].kind {
            IrLayerKind::Image { gid, image } => {
                assert_eq!(*gid, TileId(5));
                assert_eq!(image.as_deref(), Some("sky.png"));
            }
            _ => panic!("expected image layer"),
        }
        match &ir.layers[1].kind {
            IrLayerKind::Image { gid, image } => {
                assert!(gid.is_empty());
                assert!(image.is_none());
            }
            _ => panic!("expected image layer"),
        }
        assert_eq!(ir.tilesets.len(), 2);
        assert_eq!(ir.tilesets[1].first_gid(), 5);
    }

    #[test]
    fn embedded_collection_tileset_resolves_sparse_ids() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 2, "height": 1, "tilewidth": 16, "tileheight": 16,
          "layers": [{"type":"tilelayer","name":"l","width":2,"height":1,"data":[10,13]}],
          "tilesets":[{
            "firstgid":10, "name":"props", "tilewidth":16, "tileheight":16,
            "tilecount":2, "columns":0,
            "tiles":[{"id":0,"image":"a.png"},{"id":3,"image":"b.png"}]
          }]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);

        let (ir, _) = decode_map_file_to_ir(&map_path).expect("decode");
        assert_eq!(ir.tilesets[0].last_gid(), 13);
        match &ir.tilesets[0] {
            IrTileset::Collection { images, .. } => {
                let ids: Vec<_> = images.iter().map(|t| t.id).collect();
                assert_eq!(ids, [0, 3]);
            }
            IrTileset::Atlas { .. } => panic!("expected collection tileset"),
        }
    }

    #[test]
    fn external_tileset_images_are_relative_to_the_tileset_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(dir.path().join("sets")).expect("mkdir");
        let map_json = r#"{
          "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
          "layers": [],
          "tilesets":[{"firstgid":1,"source":"sets/tileset.json"}]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);
        write(&dir.path().join("sets"), "tileset.json", TILESET_JSON);

        let (ir, base) = decode_map_file_to_ir(&map_path).expect("decode");
        assert_eq!(base, dir.path());
        match &ir.tilesets[0] {
            IrTileset::Atlas { image, .. } => {
                assert_eq!(Path::new(image), Path::new("sets").join("tiles.png"));
            }
            IrTileset::Collection { .. } => panic!("expected atlas tileset"),
        }
    }

    #[test]
    fn keeps_large_int_property_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 1, "height": 1,
          "tilewidth": 16,
          "tileheight": 16,
          "properties": [
            {"name":"big_id","type":"object","value":5000000000}
          ],
          "layers": [],
          "tilesets":[{"firstgid":1,"source":"tileset.json"}]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);
        write(dir.path(), "tileset.json", TILESET_JSON);

        let (ir, _) = decode_map_file_to_ir(&map_path).expect("decode");
        assert_eq!(ir.properties.get_i64("big_id"), Some(5_000_000_000));
        assert_eq!(ir.properties.get_i32("big_id"), None);
    }

    #[test]
    fn returns_typed_error_for_non_json_path() {
        let err = decode_map_file_to_ir("level.tmx").expect_err("expected error");
        assert!(matches!(err, MapError::InvalidMap(_)));
    }

    #[test]
    fn returns_typed_error_for_malformed_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_path = write(dir.path(), "map.json", "{ not json");

        let err = decode_map_file_to_ir(&map_path).expect_err("expected decode error");
        assert!(matches!(err, MapError::Json { .. }));
    }

    #[test]
    fn returns_typed_error_for_missing_map_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = decode_map_file_to_ir(dir.path().join("nope.json")).expect_err("expected error");
        assert!(matches!(err, MapError::Io { .. }));
    }

    #[test]
    fn returns_typed_error_for_missing_tileset_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 1, "height": 1,
          "tilewidth": 16,
          "tileheight": 16,
          "layers": [],
          "tilesets":[{"firstgid":1,"source":"missing_tileset.json"}]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);

        let err = decode_map_file_to_ir(&map_path).expect_err("expected decode error");
        assert!(matches!(err, MapError::Io { .. }));
    }

    #[test]
    fn returns_typed_error_for_invalid_gid_reference() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 1, "height": 1,
          "tilewidth": 16,
          "tileheight": 16,
          "layers": [
            {"type":"tilelayer","name":"ground","width":1,"height":1,"data":[99]}
          ],
          "tilesets":[{"firstgid":1,"source":"tileset.json"}]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);
        write(dir.path(), "tileset.json", TILESET_JSON);

        let err = decode_map_file_to_ir(&map_path).expect_err("expected decode error");
        assert!(matches!(err, MapError::InvalidTileGid { gid: 99, max_gid: 4, .. }));
    }

    #[test]
    fn flipped_gids_are_validated_without_flags() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
          "layers": [{"type":"tilelayer","name":"l","data":[2147483650]}],
          "tilesets":[{"firstgid":1,"source":"tileset.json"}]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);
        write(dir.path(), "tileset.json", TILESET_JSON);

        let (ir, _) = decode_map_file_to_ir(&map_path).expect("decode");
        let (_, _, gid) = ir.layers[0].tiles().next().expect("one tile");
        assert!(gid.flip_h());
        assert_eq!(gid.clean(), 2);
    }

    #[test]
    fn returns_typed_error_for_layer_size_mismatch() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 2, "height": 2, "tilewidth": 8, "tileheight": 8,
          "layers": [{"type":"tilelayer","name":"oops","width":2,"height":2,"data":[0,0,0]}]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);

        let err = decode_map_file_to_ir(&map_path).expect_err("expected error");
        assert!(matches!(err, MapError::InvalidMap(msg) if msg.contains("oops")));
    }

    #[test]
    fn rejects_base64_layer_data() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8,
          "layers": [{
            "type":"tilelayer","name":"packed","width":1,"height":1,
            "encoding":"base64","compression":"zlib","data":"eJxjYGBgAAAABAAB"
          }]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);

        let err = decode_map_file_to_ir(&map_path).expect_err("expected error");
        assert!(matches!(err, MapError::InvalidMap(msg) if msg.contains("packed") && msg.contains("base64")));
    }

    #[test]
    fn accepts_explicit_csv_encoding() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8,
          "layers": [{"type":"tilelayer","name":"plain","encoding":"csv","data":[0]}]
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);

        let (ir, _) = decode_map_file_to_ir(&map_path).expect("decode");
        assert_eq!(ir.layers[0].tiles().count(), 0);
    }

    #[test]
    fn returns_typed_error_for_unknown_property_type() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map_json = r#"{
          "width": 1, "height": 1,
          "tilewidth": 16,
          "tileheight": 16,
          "properties": [
            {"name":"mystery","type":"not_supported","value":"x"}
          ],
          "layers": []
        }"#;
        let map_path = write(dir.path(), "map.json", map_json);

        let err = decode_map_file_to_ir(&map_path).expect_err("expected decode error");
        assert!(matches!(err, MapError::UnsupportedPropertyType { .. }));
    }
}
