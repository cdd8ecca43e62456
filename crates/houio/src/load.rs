//! Building a [`Geo`] from a document tree.
//!
//! Geometry files spell most objects as flat `[key, value, key, value, ...]`
//! arrays; `Fields` accepts those and real maps alike.

use std::{collections::BTreeMap, io::Read};

use glam::Mat3;
use tracing::{debug, warn};

use crate::{
    builder::read_document,
    depack::{Component, PageLayout, components, depack},
    error::{Result, SchemaError, Unsupported},
    geo::{Attribute, AttributeType, Geo, Poly, Primitive, Storage, Volume},
    options::DEFAULT_PAGE_SIZE,
    value::{Array, Value},
    voxel::{TileData, TileGrid},
};

/// Tile compressions assumed when a tiled array does not list its own.
const DEFAULT_COMPRESSION_TYPES: [&str; 3] = ["raw", "rawfull", "constant"];

/// Key/value view of an object-like value.
struct Fields<'a> {
    entries: Vec<(&'a str, &'a Value)>,
}

impl<'a> Fields<'a> {
    fn of(value: &'a Value, key: &'static str) -> Result<Self> {
        let wrong = SchemaError::WrongType {
            key,
            expected: "an object or a key/value list",
        };
        let entries = match value {
            Value::Object(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            Value::Array(Array::List(items)) if items.len() % 2 == 0 => items
                .chunks_exact(2)
                .map(|pair| pair[0].as_str().map(|k| (k, &pair[1])))
                .collect::<Option<Vec<_>>>()
                .ok_or(wrong)?,
            _ => return Err(wrong.into()),
        };
        Ok(Self { entries })
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    fn require(&self, key: &'static str) -> Result<&'a Value> {
        self.get(key).ok_or_else(|| SchemaError::MissingKey(key).into())
    }

    fn str(&self, key: &'static str) -> Result<&'a str> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| wrong_type(key, "a string"))
    }

    fn array(&self, key: &'static str) -> Result<&'a Array> {
        as_array(self.require(key)?, key)
    }

    fn fields(&self, key: &'static str) -> Result<Fields<'a>> {
        Fields::of(self.require(key)?, key)
    }

    fn count(&self, key: &'static str) -> Result<Option<usize>> {
        self.get(key).map(|v| to_count(v, key)).transpose()
    }
}

fn wrong_type(key: &'static str, expected: &'static str) -> crate::Error {
    SchemaError::WrongType { key, expected }.into()
}

fn as_array<'a>(value: &'a Value, key: &'static str) -> Result<&'a Array> {
    value.as_array().ok_or_else(|| wrong_type(key, "an array"))
}

fn as_list<'a>(value: &'a Value, key: &'static str) -> Result<&'a [Value]> {
    match value {
        Value::Array(Array::List(items)) => Ok(items),
        _ => Err(wrong_type(key, "a list")),
    }
}

/// The two halves of a `[definition, body]` entry.
fn pair<'a>(value: &'a Value, key: &'static str) -> Result<(&'a Value, &'a Value)> {
    match as_list(value, key)? {
        [first, second, ..] => Ok((first, second)),
        _ => Err(wrong_type(key, "a [definition, data] pair")),
    }
}

fn to_count(value: &Value, key: &'static str) -> Result<usize> {
    value
        .as_int()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| wrong_type(key, "a non-negative integer"))
}

fn counts(array: &Array, key: &'static str) -> Result<Vec<usize>> {
    (0..array.len())
        .map(|i| {
            array
                .int_at(i)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| wrong_type(key, "non-negative integers"))
        })
        .collect()
}

fn indices(array: &Array, key: &'static str, what: &'static str, len: usize) -> Result<Vec<u32>> {
    (0..array.len())
        .map(|i| {
            let n = array.int_at(i).ok_or_else(|| wrong_type(key, "integers"))?;
            match u32::try_from(n) {
                Ok(index) if (index as usize) < len => Ok(index),
                _ => Err(SchemaError::IndexOutOfRange { what, index: n, len }.into()),
            }
        })
        .collect()
}

fn page_layout(values: &Fields<'_>, tuple_size: usize) -> Result<PageLayout> {
    let page_size = values.count("pagesize")?.unwrap_or(DEFAULT_PAGE_SIZE);
    let packing = match values.get("packing") {
        Some(packing) => counts(as_array(packing, "packing")?, "packing")?,
        None => vec![tuple_size],
    };
    let constant_flags = match values.get("constantpageflags") {
        Some(flags) => {
            let flags = as_array(flags, "constantpageflags")?;
            (0..flags.len())
                .map(|pack| {
                    let pages = flags
                        .array_at(pack)
                        .ok_or_else(|| wrong_type("constantpageflags", "one list per pack"))?;
                    (0..pages.len())
                        .map(|page| {
                            pages
                                .bool_at(page)
                                .ok_or_else(|| wrong_type("constantpageflags", "booleans"))
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?
        }
        None => Vec::new(),
    };
    Ok(PageLayout {
        page_size,
        packing,
        constant_flags,
    })
}

fn depack_values<T: Component>(
    name: &str,
    values: &Fields<'_>,
    tuple_size: usize,
    element_count: usize,
) -> Result<Vec<T>> {
    let layout = page_layout(values, tuple_size)?;
    let raw = components::<T>(values.array("rawpagedata")?, "rawpagedata")?;
    debug!(
        name,
        tuple_size,
        element_count,
        packs = layout.packing.len(),
        "depacking attribute"
    );
    depack(name, &layout, tuple_size, element_count, &raw)
}

fn load_attribute(entry: &Value, element_count: usize) -> Result<Attribute> {
    let (definition, data) = pair(entry, "attribute")?;
    let definition = Fields::of(definition, "attribute definition")?;
    let data = Fields::of(data, "attribute data")?;
    let name = definition.str("name")?;
    match AttributeType::from_name(definition.str("type")?)? {
        AttributeType::Numeric => {
            let tuple_size = data.count("size")?.ok_or(SchemaError::MissingKey("size"))?;
            let values = data.fields("values")?;
            match Storage::from_name(data.str("storage")?)? {
                Storage::Int32 => Attribute::numeric(
                    name,
                    tuple_size,
                    depack_values::<i32>(name, &values, tuple_size, element_count)?,
                ),
                Storage::Real32 => Attribute::numeric(
                    name,
                    tuple_size,
                    depack_values::<f32>(name, &values, tuple_size, element_count)?,
                ),
                Storage::Real64 => Attribute::numeric(
                    name,
                    tuple_size,
                    depack_values::<f64>(name, &values, tuple_size, element_count)?,
                ),
            }
        }
        AttributeType::String => {
            let list = data.array("strings")?;
            let strings = (0..list.len())
                .map(|i| {
                    list.str_at(i)
                        .map(str::to_owned)
                        .ok_or_else(|| wrong_type("strings", "strings"))
                })
                .collect::<Result<Vec<_>>>()?;
            let indices = match data.get("indices") {
                Some(indices) => Some(depack_values::<i32>(
                    name,
                    &Fields::of(indices, "indices")?,
                    1,
                    element_count,
                )?),
                None => None,
            };
            Attribute::strings(name, strings, indices)
        }
    }
}

fn load_attributes(geo: &mut Geo, attributes: &Value) -> Result<()> {
    for (section, entries) in Fields::of(attributes, "attributes")?.entries {
        let (count, table) = match section {
            "pointattributes" => (geo.point_count, &mut geo.point_attributes),
            "vertexattributes" => (geo.vertex_count, &mut geo.vertex_attributes),
            "primitiveattributes" => (geo.primitive_count, &mut geo.primitive_attributes),
            "globalattributes" => (1, &mut geo.global_attributes),
            other => {
                warn!(section = other, "skipping unknown attribute section");
                continue;
            }
        };
        for entry in as_list(entries, "attributes")? {
            let attribute = load_attribute(entry, count)?;
            table.insert(attribute.name().to_owned(), attribute);
        }
        debug!(section, count = table.len(), "loaded attributes");
    }
    Ok(())
}

/// Shared primitive data by id: `[kind, [kind, id, data], ...]`.
fn load_shared(shared: &Value) -> Result<BTreeMap<&str, &Value>> {
    let mut by_id = BTreeMap::new();
    for chunk in as_list(shared, "sharedprimitivedata")?.chunks(2) {
        let [_, entry] = chunk else { continue };
        if let [_, id, data, ..] = as_list(entry, "sharedprimitivedata")? {
            let id = id
                .as_str()
                .ok_or_else(|| wrong_type("sharedprimitivedata", "a string id"))?;
            by_id.insert(id, data);
        }
    }
    debug!(count = by_id.len(), "loaded shared primitive data");
    Ok(by_id)
}

#[expect(clippy::cast_possible_truncation)]
fn load_tile<'a>(tile: &'a Value, compression_types: &[&str]) -> Result<TileData<'a>> {
    let tile = Fields::of(tile, "tiles")?;
    let compression = match tile.get("compression") {
        Some(c) => c.as_int().ok_or_else(|| wrong_type("compression", "an integer"))?,
        None => 1,
    };
    let name = usize::try_from(compression)
        .ok()
        .and_then(|i| compression_types.get(i))
        .ok_or(Unsupported::TileCompressionIndex(compression))?;
    let Some(data) = tile.get("data") else {
        return Ok(TileData::Empty);
    };
    match *name {
        "raw" | "rawfull" => Ok(TileData::Dense(components::<f32>(as_array(data, "data")?, "data")?)),
        "constant" => data
            .as_real()
            .or_else(|| data.as_array().filter(|a| a.len() == 1).and_then(|a| a.real_at(0)))
            .map(|x| TileData::Constant(x as f32))
            .ok_or_else(|| wrong_type("data", "a single number")),
        other => Err(Unsupported::TileCompression(other.to_owned()).into()),
    }
}

fn load_voxels(voxels: &Value, resolution: [usize; 3]) -> Result<Vec<f32>> {
    let voxels = Fields::of(voxels, "voxels")?;
    if let Some(tiled) = voxels.get("tiledarray") {
        let tiled = Fields::of(tiled, "tiledarray")?;
        let compression_types = match tiled.get("compressiontypes") {
            Some(types) => {
                let types = as_array(types, "compressiontypes")?;
                (0..types.len())
                    .map(|i| {
                        types
                            .str_at(i)
                            .ok_or_else(|| wrong_type("compressiontypes", "strings"))
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            None => DEFAULT_COMPRESSION_TYPES.to_vec(),
        };
        let tiles = as_list(tiled.require("tiles")?, "tiles")?
            .iter()
            .map(|tile| load_tile(tile, &compression_types))
            .collect::<Result<Vec<_>>>()?;
        return TileGrid::new(resolution).decode(&tiles);
    }
    if let Some(constant) = voxels.get("constantarray") {
        #[expect(clippy::cast_possible_truncation)]
        let value = constant
            .as_real()
            .ok_or_else(|| wrong_type("constantarray", "a number"))? as f32;
        return Ok(Volume::constant(resolution, value)?.voxels().to_vec());
    }
    Err(wrong_type("voxels", "a tiledarray or constantarray"))
}

#[expect(clippy::cast_possible_truncation)]
fn load_volume(geo: &Geo, body: &Value, shared: &BTreeMap<&str, &Value>) -> Result<Volume> {
    let body = Fields::of(body, "Volume")?;
    let res = counts(body.array("res")?, "res")?;
    let resolution: [usize; 3] = res
        .try_into()
        .map_err(|_| wrong_type("res", "three integers"))?;

    let voxels = match body.get("sharedvoxels") {
        Some(id) => {
            let id = id.as_str().ok_or_else(|| wrong_type("sharedvoxels", "a string id"))?;
            let data = shared
                .get(id)
                .ok_or_else(|| Unsupported::SharedVoxels(id.to_owned()))?;
            load_voxels(data, resolution)?
        }
        None => load_voxels(body.require("voxels")?, resolution)?,
    };
    let mut volume = Volume::new(resolution, voxels)?;

    let vertex = to_count(body.require("vertex")?, "vertex")?;
    let point = *geo.topology.get(vertex).ok_or(SchemaError::IndexOutOfRange {
        what: "vertex",
        index: i64::try_from(vertex).unwrap_or(i64::MAX),
        len: geo.topology.len(),
    })?;
    let center = geo
        .position(point as usize)
        .ok_or(SchemaError::MissingKey("P"))?;
    let transform = match body.get("transform") {
        Some(m) => {
            let m = as_array(m, "transform")?;
            let cols: [f32; 9] = (0..9)
                .map(|i| m.real_at(i).map(|x| x as f32))
                .collect::<Option<Vec<_>>>()
                .and_then(|v| v.try_into().ok())
                .ok_or_else(|| wrong_type("transform", "nine numbers"))?;
            Mat3::from_cols_array(&cols)
        }
        None => Mat3::IDENTITY,
    };
    volume = volume.with_transform(center, transform);
    volume.set_vertex(vertex);
    Ok(volume)
}

fn load_poly(geo: &Geo, poly: &mut Poly, vertices: &Value) -> Result<()> {
    let vertices = indices(
        as_array(vertices, "vertex")?,
        "vertex",
        "vertex",
        geo.topology.len(),
    )?;
    poly.push(&vertices, &geo.topology)
}

fn load_primitives(geo: &mut Geo, primitives: &Value, shared: &BTreeMap<&str, &Value>) -> Result<()> {
    for entry in as_list(primitives, "primitives")? {
        let (definition, body) = pair(entry, "primitives")?;
        let definition = Fields::of(definition, "primitive definition")?;
        match definition.str("type")? {
            "Volume" => {
                let volume = load_volume(geo, body, shared)?;
                geo.primitives.push(Primitive::Volume(volume));
            }
            "Poly" => {
                let mut poly = Poly::new();
                load_poly(geo, &mut poly, Fields::of(body, "Poly")?.require("vertex")?)?;
                geo.primitives.push(Primitive::Poly(poly));
            }
            "run" => match definition.str("runtype")? {
                "Poly" => {
                    let mut poly = Poly::new();
                    for item in as_list(body, "run")? {
                        let fields = as_list(item, "run")?;
                        let vertices = fields.first().ok_or(SchemaError::MissingKey("vertex"))?;
                        load_poly(geo, &mut poly, vertices)?;
                    }
                    geo.primitives.push(Primitive::Poly(poly));
                }
                other => warn!(runtype = other, "skipping unsupported primitive run"),
            },
            other => warn!(kind = other, "skipping unsupported primitive"),
        }
    }
    debug!(count = geo.primitives.len(), "loaded primitives");
    Ok(())
}

impl Geo {
    /// Interpret a parsed document.
    ///
    /// Unknown attribute sections and primitive types are skipped with a
    /// warning; everything else that does not match the schema is an error.
    ///
    /// ```
    /// use houio::{Geo, read_document};
    ///
    /// let doc = read_document(&br#"[
    ///     "pointcount", 1,
    ///     "topology", ["pointref", ["indices", [0]]],
    ///     "attributes", ["pointattributes", [[
    ///         ["name", "P", "type", "numeric"],
    ///         ["size", 4, "storage", "fpreal32",
    ///          "values", ["size", 4, "storage", "fpreal32", "rawpagedata", [1, 2, 3, 1]]]
    ///     ]]]
    /// ]"#[..]).unwrap();
    /// let geo = Geo::load(&doc).unwrap();
    /// assert_eq!(geo.position(0), Some(glam::Vec3::new(1.0, 2.0, 3.0)));
    /// ```
    pub fn load(document: &Value) -> Result<Self> {
        let top = Fields::of(document, "document")?;
        let mut geo = Geo {
            point_count: top.count("pointcount")?.unwrap_or(0),
            vertex_count: top.count("vertexcount")?.unwrap_or(0),
            primitive_count: top.count("primitivecount")?.unwrap_or(0),
            ..Geo::default()
        };
        debug!(
            points = geo.point_count,
            vertices = geo.vertex_count,
            primitives = geo.primitive_count,
            "loading geometry"
        );
        if let Some(topology) = top.get("topology") {
            let pointref = Fields::of(topology, "topology")?.fields("pointref")?;
            geo.topology = indices(pointref.array("indices")?, "indices", "point", geo.point_count)?;
        }
        if let Some(attributes) = top.get("attributes") {
            load_attributes(&mut geo, attributes)?;
        }
        let shared = match top.get("sharedprimitivedata") {
            Some(shared) => load_shared(shared)?,
            None => BTreeMap::new(),
        };
        if let Some(primitives) = top.get("primitives") {
            load_primitives(&mut geo, primitives, &shared)?;
        }
        Ok(geo)
    }

    /// Parse and load a binary or text geometry file.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        Self::load(&read_document(reader)?)
    }
}
