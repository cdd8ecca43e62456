//! Handing loaded geometry to a client container.

use crate::geo::{Attribute, Geo, Primitive};

/// A mutable mesh or point cloud that can receive imported geometry.
///
/// ```
/// use houio::{Attribute, Geo, GeometrySink};
///
/// #[derive(Default)]
/// struct Mesh {
///     names: Vec<String>,
///     faces: Vec<Vec<u32>>,
/// }
///
/// impl GeometrySink for Mesh {
///     fn set_attribute(&mut self, attribute: &Attribute) {
///         self.names.push(attribute.name().to_owned());
///     }
///
///     fn add_primitive(&mut self, points: &[u32]) {
///         self.faces.push(points.to_vec());
///     }
/// }
///
/// let mut geo = Geo::new();
/// geo.point_count = 3;
/// geo.point_attributes.insert(
///     "P".into(),
///     Attribute::numeric("P", 4, vec![0.0_f32; 12]).unwrap(),
/// );
/// geo.add_poly(&[0, 1, 2]).unwrap();
///
/// let mut mesh = Mesh::default();
/// geo.convert_into(&mut mesh);
/// assert_eq!(mesh.names, ["P"]);
/// assert_eq!(mesh.faces, [vec![0, 1, 2]]);
/// ```
pub trait GeometrySink {
    /// Receive a per-point attribute, one tuple per point.
    fn set_attribute(&mut self, attribute: &Attribute);
    /// Receive one polygon as point indices, in winding order.
    fn add_primitive(&mut self, points: &[u32]);
}

impl Geo {
    /// Forward every point attribute and every polygon to `sink`.
    ///
    /// Volumes have no polygonal form and are not forwarded.
    pub fn convert_into<S: GeometrySink + ?Sized>(&self, sink: &mut S) {
        for attribute in self.point_attributes.values() {
            sink.set_attribute(attribute);
        }
        for primitive in &self.primitives {
            if let Primitive::Poly(poly) = primitive {
                for points in poly.polygons() {
                    sink.add_primitive(points);
                }
            }
        }
    }
}
