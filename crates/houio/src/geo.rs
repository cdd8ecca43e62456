//! In-memory geometry: attributes, topology and primitives.
//!
//! A [`Geo`] is what the schema loader produces and the saver consumes. It
//! keeps the element counts of the file, one attribute table per element
//! class, the vertex-to-point topology and the list of [`Primitive`]s.

use std::collections::BTreeMap;

use glam::{Mat3, Mat4, Vec3};

use crate::{
    error::{Result, SchemaError},
    voxel::TileGrid,
};

/// Whether an attribute holds numbers or strings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// Numeric tuples.
    Numeric,
    /// One string per element, stored as indices into a string list.
    String,
}

impl AttributeType {
    /// The name used in files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::String => "string",
        }
    }

    /// Parse a file type name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "numeric" => Ok(Self::Numeric),
            "string" => Ok(Self::String),
            other => Err(SchemaError::UnknownAttributeType(other.to_owned()).into()),
        }
    }
}

/// Element storage of an attribute.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// `int32`
    Int32,
    /// `fpreal32`
    Real32,
    /// `fpreal64`
    Real64,
}

impl Storage {
    /// The name used in files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Real32 => "fpreal32",
            Self::Real64 => "fpreal64",
        }
    }

    /// Parse a file storage name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "int32" => Ok(Self::Int32),
            "fpreal32" => Ok(Self::Real32),
            "fpreal64" => Ok(Self::Real64),
            other => Err(SchemaError::UnknownStorage(other.to_owned()).into()),
        }
    }

    /// Bytes per component.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::Int32 | Self::Real32 => 4,
            Self::Real64 => 8,
        }
    }
}

/// Dense attribute values, `element * tuple_size + component`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValues {
    /// `int32` components.
    Int32(Vec<i32>),
    /// `fpreal32` components.
    Real32(Vec<f32>),
    /// `fpreal64` components.
    Real64(Vec<f64>),
    /// A string list and, optionally, one index into it per element.
    /// Without indices element `i` is string `i`.
    Strings {
        /// Distinct strings.
        strings: Vec<String>,
        /// Per-element index into `strings`; `-1` means no string.
        indices: Option<Vec<i32>>,
    },
}

impl AttributeValues {
    /// Storage of the numeric components, or of the string indices.
    #[must_use]
    pub fn storage(&self) -> Storage {
        match self {
            Self::Int32(_) | Self::Strings { .. } => Storage::Int32,
            Self::Real32(_) => Storage::Real32,
            Self::Real64(_) => Storage::Real64,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Int32(v) => v.len(),
            Self::Real32(v) => v.len(),
            Self::Real64(v) => v.len(),
            Self::Strings { strings, indices } => indices.as_ref().map_or(strings.len(), Vec::len),
        }
    }
}

impl From<Vec<i32>> for AttributeValues {
    fn from(v: Vec<i32>) -> Self {
        Self::Int32(v)
    }
}

impl From<Vec<f32>> for AttributeValues {
    fn from(v: Vec<f32>) -> Self {
        Self::Real32(v)
    }
}

impl From<Vec<f64>> for AttributeValues {
    fn from(v: Vec<f64>) -> Self {
        Self::Real64(v)
    }
}

/// A named per-element attribute.
///
/// The value buffer always holds exactly `element_count * tuple_size`
/// components.
///
/// ```
/// use houio::Attribute;
///
/// let cd = Attribute::numeric("Cd", 3, vec![1.0_f32, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
/// assert_eq!(cd.element_count(), 2);
/// assert_eq!(cd.real(1, 1), Some(1.0));
/// assert_eq!(cd.raw_bytes().len(), 2 * 3 * 4);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    tuple_size: usize,
    element_count: usize,
    values: AttributeValues,
}

impl Attribute {
    /// A numeric attribute. `values` must fill whole tuples.
    pub fn numeric(
        name: impl Into<String>,
        tuple_size: usize,
        values: impl Into<AttributeValues>,
    ) -> Result<Self> {
        let name = name.into();
        let values = values.into();
        if matches!(values, AttributeValues::Strings { .. }) {
            return Err(SchemaError::WrongType {
                key: "values",
                expected: "numeric values",
            }
            .into());
        }
        let len = values.len();
        if tuple_size == 0 || len % tuple_size != 0 {
            return Err(SchemaError::AttributeLength { name, tuple_size, len }.into());
        }
        Ok(Self {
            name,
            tuple_size,
            element_count: len / tuple_size,
            values,
        })
    }

    /// A string attribute. Every index must be `-1` or point into `strings`.
    pub fn strings(
        name: impl Into<String>,
        strings: Vec<String>,
        indices: Option<Vec<i32>>,
    ) -> Result<Self> {
        if let Some(&bad) = indices
            .iter()
            .flatten()
            .find(|&&i| i < -1 || usize::try_from(i).is_ok_and(|i| i >= strings.len()))
        {
            return Err(SchemaError::IndexOutOfRange {
                what: "string",
                index: i64::from(bad),
                len: strings.len(),
            }
            .into());
        }
        let values = AttributeValues::Strings { strings, indices };
        Ok(Self {
            name: name.into(),
            tuple_size: 1,
            element_count: values.len(),
            values,
        })
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric or string.
    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        match self.values {
            AttributeValues::Strings { .. } => AttributeType::String,
            _ => AttributeType::Numeric,
        }
    }

    /// Component storage; string attributes report their index storage.
    #[must_use]
    pub fn storage(&self) -> Storage {
        self.values.storage()
    }

    /// Components per element.
    #[must_use]
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// Number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// The dense values.
    #[must_use]
    pub fn values(&self) -> &AttributeValues {
        &self.values
    }

    /// One numeric component widened to `f64`.
    #[must_use]
    pub fn real(&self, element: usize, component: usize) -> Option<f64> {
        if component >= self.tuple_size {
            return None;
        }
        let i = element.checked_mul(self.tuple_size)? + component;
        match &self.values {
            AttributeValues::Int32(v) => v.get(i).map(|&x| f64::from(x)),
            AttributeValues::Real32(v) => v.get(i).map(|&x| f64::from(x)),
            AttributeValues::Real64(v) => v.get(i).copied(),
            AttributeValues::Strings { .. } => None,
        }
    }

    /// The string of one element of a string attribute.
    #[must_use]
    pub fn string_at(&self, element: usize) -> Option<&str> {
        let AttributeValues::Strings { strings, indices } = &self.values else {
            return None;
        };
        let index = match indices {
            Some(indices) => usize::try_from(*indices.get(element)?).ok()?,
            None => element,
        };
        strings.get(index).map(String::as_str)
    }

    /// The value buffer as little-endian bytes, `element_count * tuple_size *
    /// storage().size()` long. String attributes yield their indices.
    #[must_use]
    pub fn raw_bytes(&self) -> Vec<u8> {
        match &self.values {
            AttributeValues::Int32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            AttributeValues::Real32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            AttributeValues::Real64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            AttributeValues::Strings { strings, indices } => match indices {
                Some(indices) => indices.iter().flat_map(|x| x.to_le_bytes()).collect(),
                None => (0..strings.len())
                    .flat_map(|i| i32::try_from(i).unwrap_or(-1).to_le_bytes())
                    .collect(),
            },
        }
    }

    /// Grow or shrink to `element_count` elements. New numeric components are
    /// zero and new string elements have no string.
    pub fn resize(&mut self, element_count: usize) {
        let len = element_count * self.tuple_size;
        match &mut self.values {
            AttributeValues::Int32(v) => v.resize(len, 0),
            AttributeValues::Real32(v) => v.resize(len, 0.0),
            AttributeValues::Real64(v) => v.resize(len, 0.0),
            AttributeValues::Strings { strings, indices } => {
                let indices = indices.get_or_insert_with(|| {
                    (0..strings.len()).map(|i| i32::try_from(i).unwrap_or(-1)).collect()
                });
                indices.resize(element_count, -1);
            }
        }
        self.element_count = element_count;
    }

    /// Append one homogeneous position to a `P` attribute.
    fn push_position(&mut self, p: Vec3) -> Result<()> {
        if self.tuple_size != 4 {
            return Err(SchemaError::PositionTupleSize(self.tuple_size).into());
        }
        match &mut self.values {
            AttributeValues::Real32(v) => v.extend_from_slice(&[p.x, p.y, p.z, 1.0]),
            AttributeValues::Real64(v) => {
                v.extend_from_slice(&[f64::from(p.x), f64::from(p.y), f64::from(p.z), 1.0]);
            }
            _ => {
                return Err(SchemaError::WrongType {
                    key: "P",
                    expected: "real storage",
                }
                .into());
            }
        }
        self.element_count += 1;
        Ok(())
    }
}

/// A dense scalar voxel grid, stored x fastest.
///
/// The volume occupies the unit cube `[0, 1]³` in local space; see
/// [`Volume::local_to_world`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    resolution: [usize; 3],
    voxels: Vec<f32>,
    vertex: usize,
    /// Orientation and scale of the volume around its centre.
    pub transform: Mat3,
    /// World position of the volume centre.
    pub center: Vec3,
}

impl Volume {
    /// A volume from a dense voxel buffer of `rx * ry * rz` values.
    pub fn new(resolution: [usize; 3], voxels: Vec<f32>) -> Result<Self> {
        let expected = TileGrid::new(resolution).voxel_count();
        if expected != Some(voxels.len()) {
            return Err(SchemaError::VoxelCount {
                expected: expected.unwrap_or(usize::MAX),
                found: voxels.len(),
            }
            .into());
        }
        Ok(Self {
            resolution,
            voxels,
            vertex: 0,
            transform: Mat3::IDENTITY,
            center: Vec3::ZERO,
        })
    }

    /// A volume with every voxel set to `value`.
    pub fn constant(resolution: [usize; 3], value: f32) -> Result<Self> {
        let count = TileGrid::new(resolution).voxel_count();
        let unallocatable = SchemaError::VoxelCount {
            expected: count.unwrap_or(usize::MAX),
            found: 0,
        };
        let count = count.ok_or_else(|| unallocatable.clone())?;
        let mut voxels = Vec::new();
        voxels.try_reserve_exact(count).map_err(|_| unallocatable)?;
        voxels.resize(count, value);
        Self::new(resolution, voxels)
    }

    /// Place the volume.
    #[must_use]
    pub fn with_transform(mut self, center: Vec3, transform: Mat3) -> Self {
        self.center = center;
        self.transform = transform;
        self
    }

    /// Voxels along each axis.
    #[must_use]
    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    /// All voxels, x fastest then y then z.
    #[must_use]
    pub fn voxels(&self) -> &[f32] {
        &self.voxels
    }

    /// Mutable voxel access. The length is fixed by the resolution.
    pub fn voxels_mut(&mut self) -> &mut [f32] {
        &mut self.voxels
    }

    /// The voxel at `(i, j, k)`.
    #[must_use]
    pub fn voxel(&self, i: usize, j: usize, k: usize) -> Option<f32> {
        let [rx, ry, rz] = self.resolution;
        if i >= rx || j >= ry || k >= rz {
            return None;
        }
        self.voxels.get((k * ry + j) * rx + i).copied()
    }

    /// The vertex this volume is attached to.
    #[must_use]
    pub fn vertex(&self) -> usize {
        self.vertex
    }

    pub(crate) fn set_vertex(&mut self, vertex: usize) {
        self.vertex = vertex;
    }

    /// Maps local `[0, 1]³` coordinates to world space.
    ///
    /// ```
    /// use glam::{Mat3, Vec3};
    /// use houio::Volume;
    ///
    /// let volume = Volume::constant([4, 4, 4], 0.0)
    ///     .unwrap()
    ///     .with_transform(Vec3::new(1.0, 2.0, 3.0), Mat3::from_diagonal(Vec3::splat(5.0)));
    /// let m = volume.local_to_world();
    /// assert_eq!(m.transform_point3(Vec3::splat(0.5)), Vec3::new(1.0, 2.0, 3.0));
    /// assert_eq!(m.transform_point3(Vec3::ONE), Vec3::new(6.0, 7.0, 8.0));
    /// ```
    #[must_use]
    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_translation(self.center)
            * Mat4::from_mat3(self.transform)
            * Mat4::from_translation(Vec3::NEG_ONE)
            * Mat4::from_scale(Vec3::splat(2.0))
    }
}

/// Polygons, each a list of vertices with their resolved points.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    offsets: Vec<usize>,
    vertices: Vec<u32>,
    points: Vec<u32>,
}

impl Default for Poly {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            vertices: Vec::new(),
            points: Vec::new(),
        }
    }
}

impl Poly {
    /// No polygons.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a polygon, resolving each vertex through `topology`.
    pub fn push(&mut self, vertices: &[u32], topology: &[u32]) -> Result<()> {
        let points = vertices
            .iter()
            .map(|&v| {
                topology.get(v as usize).copied().ok_or(SchemaError::IndexOutOfRange {
                    what: "vertex",
                    index: i64::from(v),
                    len: topology.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.vertices.extend_from_slice(vertices);
        self.points.extend(points);
        self.offsets.push(self.vertices.len());
        Ok(())
    }

    /// Number of polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Returns `true` if there are no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn range(&self, polygon: usize) -> Option<core::ops::Range<usize>> {
        Some(*self.offsets.get(polygon)?..*self.offsets.get(polygon + 1)?)
    }

    /// Vertex indices of one polygon.
    #[must_use]
    pub fn vertices(&self, polygon: usize) -> Option<&[u32]> {
        self.vertices.get(self.range(polygon)?)
    }

    /// Point indices of one polygon.
    #[must_use]
    pub fn points(&self, polygon: usize) -> Option<&[u32]> {
        self.points.get(self.range(polygon)?)
    }

    /// Point indices of every polygon, in order.
    pub fn polygons(&self) -> impl Iterator<Item = &[u32]> {
        self.offsets
            .windows(2)
            .filter_map(|w| self.points.get(w[0]..w[1]))
    }
}

/// A primitive of a supported type.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// A voxel volume.
    Volume(Volume),
    /// One or more polygons. Each polygon counts as one primitive.
    Poly(Poly),
}

/// Geometry of one file.
///
/// ```
/// use glam::{Mat3, Vec3};
/// use houio::{Geo, Volume};
///
/// let mut geo = Geo::new();
/// let volume = Volume::constant([2, 2, 2], 1.0)
///     .unwrap()
///     .with_transform(Vec3::new(0.0, 1.0, 0.0), Mat3::IDENTITY);
/// geo.add_volume(volume).unwrap();
/// assert_eq!((geo.point_count, geo.vertex_count, geo.primitive_count), (1, 1, 1));
/// assert_eq!(geo.position(0), Some(Vec3::new(0.0, 1.0, 0.0)));
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geo {
    /// Number of points.
    pub point_count: usize,
    /// Number of vertices.
    pub vertex_count: usize,
    /// Number of primitives.
    pub primitive_count: usize,
    /// Per-point attributes by name.
    pub point_attributes: BTreeMap<String, Attribute>,
    /// Per-vertex attributes by name.
    pub vertex_attributes: BTreeMap<String, Attribute>,
    /// Per-primitive attributes by name.
    pub primitive_attributes: BTreeMap<String, Attribute>,
    /// Detail attributes by name, each with one element.
    pub global_attributes: BTreeMap<String, Attribute>,
    /// Point index of every vertex.
    pub topology: Vec<u32>,
    /// Primitives in file order.
    pub primitives: Vec<Primitive>,
}

fn index_u32(what: &'static str, index: usize, len: usize) -> Result<u32> {
    u32::try_from(index).map_err(|_| {
        SchemaError::IndexOutOfRange {
            what,
            index: i64::try_from(index).unwrap_or(i64::MAX),
            len,
        }
        .into()
    })
}

impl Geo {
    /// Empty geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The position of a point, from its `P` attribute.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn position(&self, point: usize) -> Option<Vec3> {
        let p = self.point_attributes.get("P")?;
        Some(Vec3::new(
            p.real(point, 0)? as f32,
            p.real(point, 1)? as f32,
            p.real(point, 2)? as f32,
        ))
    }

    /// Volumes in primitive order.
    pub fn volumes(&self) -> impl Iterator<Item = &Volume> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Volume(v) => Some(v),
            Primitive::Poly(_) => None,
        })
    }

    /// Append a point at `position`, creating `P` if needed and padding the
    /// other point attributes.
    fn push_point(&mut self, position: Vec3) -> Result<u32> {
        let index = index_u32("point", self.point_count, self.point_count)?;
        match self.point_attributes.get_mut("P") {
            Some(p) => {
                p.resize(self.point_count);
                p.push_position(position)?;
            }
            None => {
                let mut p = Attribute::numeric("P", 4, vec![0.0_f32; self.point_count * 4])?;
                p.push_position(position)?;
                self.point_attributes.insert("P".to_owned(), p);
            }
        }
        self.point_count += 1;
        for (name, attribute) in &mut self.point_attributes {
            if name != "P" {
                attribute.resize(self.point_count);
            }
        }
        Ok(index)
    }

    /// Add a volume with its own point at the volume centre and one vertex.
    pub fn add_volume(&mut self, mut volume: Volume) -> Result<()> {
        let point = self.push_point(volume.center)?;
        volume.vertex = self.topology.len();
        self.topology.push(point);
        self.vertex_count += 1;
        self.primitive_count += 1;
        self.primitives.push(Primitive::Volume(volume));
        Ok(())
    }

    /// Add a polygon over existing points, creating one vertex per corner.
    pub fn add_poly(&mut self, points: &[u32]) -> Result<()> {
        if let Some(&bad) = points.iter().find(|&&p| p as usize >= self.point_count) {
            return Err(SchemaError::IndexOutOfRange {
                what: "point",
                index: i64::from(bad),
                len: self.point_count,
            }
            .into());
        }
        let first = self.topology.len();
        let vertices = (first..first + points.len())
            .map(|v| index_u32("vertex", v, first))
            .collect::<Result<Vec<_>>>()?;
        self.topology.extend_from_slice(points);
        let mut poly = Poly::new();
        poly.push(&vertices, &self.topology)?;
        self.vertex_count += points.len();
        self.primitive_count += 1;
        self.primitives.push(Primitive::Poly(poly));
        Ok(())
    }
}
