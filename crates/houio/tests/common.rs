#![allow(missing_docs)]
#![allow(dead_code)]

use glam::{Mat3, Vec3};
use houio::{Attribute, Geo, Logger, Volume};

/// A text geometry file with a packed point attribute, a string primitive
/// attribute, a volume and a run of polygons.
pub const TEXT_GEO: &str = r#"
// written by hand
[
    "pointcount", 4,
    "vertexcount", 5,
    "primitivecount", 3,
    "topology", ["pointref", ["indices", [0, 1, 2, 1, 3]]],
    "attributes", [
        "pointattributes", [
            [
                ["scope", "public", "type", "numeric", "name", "P"],
                ["size", 4, "storage", "fpreal32",
                 "values", ["size", 4, "storage", "fpreal32", "pagesize", 2,
                            "packing", [3, 1],
                            "constantpageflags", [[false, false], [true, true]],
                            "rawpagedata", [0, 0, 0, 1, 0, 0, 1,
                                            0, 1, 0, 5, 5, 5, 1]]]
            ]
        ],
        "primitiveattributes", [
            [
                ["type", "string", "name", "name"],
                ["size", 1, "storage", "int32", "strings", ["fog", "tri"],
                 "indices", ["size", 1, "storage", "int32", "rawpagedata", [0, 1, 1]]]
            ]
        ],
        "detailattributes", []
    ],
    "primitives", [
        [["type", "Volume"], [
            "vertex", 4,
            "transform", [1, 0, 0, 0, 1, 0, 0, 0, 1],
            "res", [2, 1, 1],
            "voxels", ["tiledarray", ["tiles", [["compression", 0, "data", [0.5, 1.5]]]]]
        ]],
        [["type", "run", "runtype", "Poly", "varyingfields", ["vertex"], "uniformfields", {}],
         [[[0, 1, 2]], [[2, 3]]]]
    ]
]
"#;

pub fn sample_geo() -> Geo {
    let mut geo = Geo::new();
    let voxels = (0..18 * 3 * 2).map(|i| f32::from(u8::try_from(i % 7).unwrap())).collect();
    let volume = Volume::new([18, 3, 2], voxels)
        .unwrap()
        .with_transform(Vec3::new(0.0, 1.0, 0.0), Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0)));
    geo.add_volume(volume).unwrap();
    geo.add_volume(Volume::constant([1, 1, 1], -1.0).unwrap()).unwrap();
    geo.add_poly(&[0, 1]).unwrap();
    geo.add_poly(&[1, 0]).unwrap();
    geo.primitive_attributes.insert(
        "density".into(),
        Attribute::numeric("density", 1, vec![1.0_f64, 0.5, 0.25, 0.0]).unwrap(),
    );
    geo
}

/// The event log of a document, with two spaces per level.
pub fn log(bytes: &[u8]) -> String {
    let mut logger = Logger::new(Vec::new());
    logger.log_stream(bytes).unwrap();
    String::from_utf8(logger.into_inner()).unwrap().replace('\t', "  ")
}
