//! Writing a [`Geo`] through a [`Writer`].
//!
//! Attribute values go out as one flat uniform page stream with a single
//! pack, so any reader that honours the declared page size recovers them
//! unchanged.

use std::io::Write;

use tracing::debug;

use crate::{
    error::{Result, SchemaError},
    geo::{Attribute, AttributeValues, Geo, Poly, Primitive, Volume},
    options::{ExportOptions, Format, WriterOptions},
    value::UniformArray,
    voxel::TileGrid,
    writer::{BinaryWriter, TextWriter, Writer},
};

/// Tile compressions declared by saved volumes; every tile is written as
/// index 0.
const COMPRESSION_TYPES: [&str; 5] = ["raw", "rawfull", "constant", "fpreal16", "FP32Range"];

fn int<W: Writer + ?Sized>(writer: &mut W, value: usize) -> Result<()> {
    writer.int(i64::try_from(value).unwrap_or(i64::MAX))
}

fn to_i32(value: usize, key: &'static str) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        SchemaError::WrongType {
            key,
            expected: "a value that fits in 32 bits",
        }
        .into()
    })
}

fn to_i32s(values: &[u32], key: &'static str) -> Result<Vec<i32>> {
    values.iter().map(|&v| to_i32(v as usize, key)).collect()
}

/// `["size", n, "storage", s, "pagesize", p, "rawpagedata", data]`
fn write_pages<W: Writer + ?Sized>(
    writer: &mut W,
    tuple_size: usize,
    storage: &str,
    page_size: usize,
    data: &UniformArray,
) -> Result<()> {
    writer.begin_array()?;
    writer.string("size")?;
    int(writer, tuple_size)?;
    writer.string("storage")?;
    writer.string(storage)?;
    writer.string("pagesize")?;
    int(writer, page_size)?;
    writer.string("rawpagedata")?;
    writer.uniform(data)?;
    writer.end_array()
}

fn write_attribute<W: Writer + ?Sized>(
    writer: &mut W,
    attribute: &Attribute,
    page_size: usize,
) -> Result<()> {
    if page_size == 0 {
        return Err(SchemaError::InvalidPageLayout {
            name: attribute.name().to_owned(),
            reason: "page size is zero",
        }
        .into());
    }
    let storage = attribute.storage().name();
    writer.begin_array()?;

    writer.begin_array()?;
    writer.string("name")?;
    writer.string(attribute.name())?;
    writer.string("type")?;
    writer.string(attribute.attribute_type().name())?;
    writer.end_array()?;

    writer.begin_array()?;
    writer.string("size")?;
    int(writer, attribute.tuple_size())?;
    writer.string("storage")?;
    writer.string(storage)?;
    let data = match attribute.values() {
        AttributeValues::Strings { strings, indices } => {
            writer.string("strings")?;
            writer.begin_array()?;
            for s in strings {
                writer.string(s)?;
            }
            writer.end_array()?;
            let indices = match indices {
                Some(indices) => indices.clone(),
                None => (0..strings.len()).map(|i| to_i32(i, "strings")).collect::<Result<_>>()?,
            };
            writer.string("indices")?;
            write_pages(writer, 1, storage, page_size, &UniformArray::Int32(indices))?;
            None
        }
        AttributeValues::Int32(v) => Some(UniformArray::Int32(v.clone())),
        AttributeValues::Real32(v) => Some(UniformArray::Real32(v.clone())),
        AttributeValues::Real64(v) => Some(UniformArray::Real64(v.clone())),
    };
    if let Some(data) = data {
        writer.string("values")?;
        write_pages(writer, attribute.tuple_size(), storage, page_size, &data)?;
    }
    writer.end_array()?;

    writer.end_array()
}

fn write_volume<W: Writer + ?Sized>(writer: &mut W, volume: &Volume) -> Result<()> {
    let resolution = volume
        .resolution()
        .iter()
        .map(|&r| to_i32(r, "res"))
        .collect::<Result<Vec<_>>>()?;
    let tiles = TileGrid::new(volume.resolution()).encode(volume.voxels())?;

    writer.begin_array()?;
    writer.string("type")?;
    writer.string("Volume")?;
    writer.end_array()?;

    writer.begin_array()?;
    writer.string("vertex")?;
    writer.int32(to_i32(volume.vertex(), "vertex")?)?;
    writer.string("transform")?;
    writer.uniform(&UniformArray::Real32(volume.transform.to_cols_array().to_vec()))?;
    writer.string("res")?;
    writer.uniform(&UniformArray::Int32(resolution))?;

    writer.string("border")?;
    writer.begin_map()?;
    writer.key("type")?;
    writer.string("constant")?;
    writer.key("value")?;
    writer.real32(0.0)?;
    writer.end_map()?;

    writer.string("compression")?;
    writer.begin_map()?;
    writer.key("tolerance")?;
    writer.real32(0.0)?;
    writer.end_map()?;

    writer.string("voxels")?;
    writer.begin_array()?;
    writer.string("tiledarray")?;
    writer.begin_array()?;
    writer.string("version")?;
    writer.int(1)?;
    writer.string("compressiontypes")?;
    writer.begin_array()?;
    for name in COMPRESSION_TYPES {
        writer.string(name)?;
    }
    writer.end_array()?;
    writer.string("tiles")?;
    writer.begin_array()?;
    for tile in tiles {
        writer.begin_array()?;
        writer.string("compression")?;
        writer.int(0)?;
        writer.string("data")?;
        writer.uniform(&UniformArray::Real32(tile))?;
        writer.end_array()?;
    }
    writer.end_array()?;
    writer.end_array()?;
    writer.end_array()?;

    writer.string("visualization")?;
    writer.begin_map()?;
    writer.key("mode")?;
    writer.string("smoke")?;
    writer.key("iso")?;
    writer.real32(0.0)?;
    writer.key("density")?;
    writer.real32(1.0)?;
    writer.end_map()?;

    writer.string("taperx")?;
    writer.real32(1.0)?;
    writer.string("tapery")?;
    writer.real32(1.0)?;
    writer.end_array()
}

fn write_poly<W: Writer + ?Sized>(writer: &mut W, poly: &Poly) -> Result<()> {
    let polygon = |i| to_i32s(poly.vertices(i).unwrap_or_default(), "vertex");
    if poly.len() == 1 {
        writer.begin_array()?;
        writer.begin_array()?;
        writer.string("type")?;
        writer.string("Poly")?;
        writer.end_array()?;
        writer.begin_array()?;
        writer.string("vertex")?;
        writer.uniform(&UniformArray::Int32(polygon(0)?))?;
        writer.end_array()?;
        return writer.end_array();
    }

    writer.begin_array()?;
    writer.begin_array()?;
    writer.string("type")?;
    writer.string("run")?;
    writer.string("runtype")?;
    writer.string("Poly")?;
    writer.string("varyingfields")?;
    writer.begin_array()?;
    writer.string("vertex")?;
    writer.end_array()?;
    writer.string("uniformfields")?;
    writer.begin_map()?;
    writer.end_map()?;
    writer.end_array()?;

    writer.begin_array()?;
    for i in 0..poly.len() {
        writer.begin_array()?;
        writer.uniform(&UniformArray::Int32(polygon(i)?))?;
        writer.end_array()?;
    }
    writer.end_array()?;
    writer.end_array()
}

impl Geo {
    /// Serialize to `out` and hand it back.
    ///
    /// ```
    /// use houio::{ExportOptions, Format, Geo, Volume};
    ///
    /// let mut geo = Geo::new();
    /// geo.add_volume(Volume::constant([2, 2, 2], 0.5).unwrap()).unwrap();
    /// let options = ExportOptions { format: Format::Text, ..ExportOptions::default() };
    /// let text = geo.save(Vec::new(), options).unwrap();
    /// assert_eq!(Geo::read(&text[..]).unwrap(), geo);
    /// ```
    pub fn save<W: Write>(&self, out: W, options: ExportOptions) -> Result<W> {
        match options.format {
            Format::Binary => {
                let writer_options = WriterOptions {
                    use_tokens: options.use_tokens,
                };
                let mut writer = BinaryWriter::with_options(out, writer_options)?;
                self.write_to(&mut writer, options.page_size)?;
                writer.finish()?;
                Ok(writer.into_inner())
            }
            Format::Text => {
                let mut writer = TextWriter::new(out);
                self.write_to(&mut writer, options.page_size)?;
                writer.finish()?;
                Ok(writer.into_inner())
            }
        }
    }

    /// Emit the whole document through any [`Writer`].
    ///
    /// A `P` attribute must have four components.
    pub fn write_to<W: Writer + ?Sized>(&self, writer: &mut W, page_size: usize) -> Result<()> {
        if let Some(p) = self.point_attributes.get("P") {
            if p.tuple_size() != 4 {
                return Err(SchemaError::PositionTupleSize(p.tuple_size()).into());
            }
        }
        debug!(
            points = self.point_count,
            vertices = self.vertex_count,
            primitives = self.primitive_count,
            "saving geometry"
        );

        writer.begin_array()?;
        writer.string("pointcount")?;
        int(writer, self.point_count)?;
        writer.string("vertexcount")?;
        int(writer, self.vertex_count)?;
        writer.string("primitivecount")?;
        int(writer, self.primitive_count)?;

        writer.string("topology")?;
        writer.begin_array()?;
        writer.string("pointref")?;
        writer.begin_array()?;
        writer.string("indices")?;
        let indices = if self.topology.iter().all(|&p| i16::try_from(p).is_ok()) {
            UniformArray::Int16(self.topology.iter().filter_map(|&p| i16::try_from(p).ok()).collect())
        } else {
            UniformArray::Int32(to_i32s(&self.topology, "indices")?)
        };
        writer.uniform(&indices)?;
        writer.end_array()?;
        writer.end_array()?;

        writer.string("attributes")?;
        writer.begin_array()?;
        let sections = [
            ("vertexattributes", &self.vertex_attributes),
            ("pointattributes", &self.point_attributes),
            ("primitiveattributes", &self.primitive_attributes),
            ("globalattributes", &self.global_attributes),
        ];
        for (section, table) in sections {
            if table.is_empty() {
                continue;
            }
            writer.string(section)?;
            writer.begin_array()?;
            for attribute in table.values() {
                write_attribute(writer, attribute, page_size)?;
            }
            writer.end_array()?;
        }
        writer.end_array()?;

        if !self.primitives.is_empty() {
            writer.string("primitives")?;
            writer.begin_array()?;
            for primitive in &self.primitives {
                match primitive {
                    Primitive::Volume(volume) => {
                        writer.begin_array()?;
                        write_volume(writer, volume)?;
                        writer.end_array()?;
                    }
                    Primitive::Poly(poly) if poly.is_empty() => {}
                    Primitive::Poly(poly) => write_poly(writer, poly)?,
                }
            }
            writer.end_array()?;
        }

        writer.end_array()
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat3, Vec3};

    use super::*;
    use crate::{Value, read_document};

    fn sample() -> Geo {
        let mut geo = Geo::new();
        let volume = Volume::new([17, 2, 1], (0..34).map(|i| i as f32).collect())
            .unwrap()
            .with_transform(Vec3::new(1.0, 2.0, 3.0), Mat3::from_diagonal(Vec3::splat(0.5)));
        geo.add_volume(volume).unwrap();
        geo.add_volume(Volume::constant([1, 1, 1], 4.0).unwrap()).unwrap();
        geo.add_poly(&[0, 1]).unwrap();
        geo.primitive_attributes.insert(
            "name".into(),
            Attribute::strings("name", vec!["a".into(), "b".into()], Some(vec![0, 1, 1])).unwrap(),
        );
        geo.global_attributes
            .insert("scale".into(), Attribute::numeric("scale", 1, vec![2.0_f64]).unwrap());
        geo
    }

    #[test]
    fn binary_round_trip() {
        let geo = sample();
        let bytes = geo.save(Vec::new(), ExportOptions::default()).unwrap();
        assert_eq!(&bytes[..5], &[0x7f, 0x4e, 0x53, 0x4a, 0x62]);
        assert_eq!(Geo::read(&bytes[..]).unwrap(), geo);
    }

    #[test]
    fn text_round_trip_with_small_pages() {
        let geo = sample();
        let options = ExportOptions {
            format: Format::Text,
            page_size: 2,
            use_tokens: false,
        };
        let text = geo.save(Vec::new(), options).unwrap();
        assert_eq!(Geo::read(&text[..]).unwrap(), geo);
    }

    #[test]
    fn string_table_output_reads_back() {
        let geo = sample();
        let options = ExportOptions {
            use_tokens: true,
            ..ExportOptions::default()
        };
        let plain = geo.save(Vec::new(), ExportOptions::default()).unwrap();
        let interned = geo.save(Vec::new(), options).unwrap();
        assert!(interned.len() < plain.len());
        assert_eq!(Geo::read(&interned[..]).unwrap(), geo);
    }

    #[test]
    fn several_polygons_become_a_run() {
        let mut poly = Poly::new();
        poly.push(&[0, 1], &[0, 0]).unwrap();
        poly.push(&[1], &[0, 0]).unwrap();
        let mut out = TextWriter::new(Vec::new());
        write_poly(&mut out, &poly).unwrap();
        out.finish().unwrap();
        let doc = read_document(&out.into_inner()[..]).unwrap();
        let list = doc.as_array().and_then(|a| a.as_list()).unwrap();
        let def = list[0].as_array().unwrap();
        assert_eq!(def.str_at(1), Some("run"));
        assert_eq!(list[1].as_array().unwrap().len(), 2);
    }

    #[test]
    fn large_topology_uses_int32() {
        let geo = Geo {
            point_count: 40_000,
            topology: vec![0, 39_999],
            vertex_count: 2,
            ..Geo::default()
        };
        let bytes = geo.save(Vec::new(), ExportOptions::default()).unwrap();
        let doc = read_document(&bytes[..]).unwrap();
        let Value::Array(top) = &doc else { panic!("expected an array") };
        let topology = top.array_at(7).and_then(|t| t.array_at(1)).and_then(|p| p.as_list()).unwrap();
        assert!(matches!(topology[1], Value::Array(crate::Array::Uniform(UniformArray::Int32(_)))));
    }

    #[test]
    fn position_must_have_four_components() {
        let mut geo = Geo::new();
        geo.point_attributes
            .insert("P".into(), Attribute::numeric("P", 3, vec![0.0_f32; 3]).unwrap());
        let err = geo.save(Vec::new(), ExportOptions::default()).unwrap_err();
        assert!(matches!(err, crate::Error::Schema(SchemaError::PositionTupleSize(3))));
    }
}
