use std::{
    collections::BTreeMap,
    io::{self, Write},
    path::PathBuf,
};

use houio::{Attribute, AttributeType, Geo, Primitive};

#[derive(clap::Args)]
pub struct Args {
    pub path: PathBuf,
}

/// Load `path` and print a summary of its contents.
pub fn run(args: Args) -> houio::Result<()> {
    let geo = Geo::read(super::open(&args.path)?)?;
    let mut out = io::stdout().lock();
    describe(&geo, &mut out)?;
    Ok(())
}

fn describe_attributes(
    out: &mut impl Write,
    section: &str,
    attributes: &BTreeMap<String, Attribute>,
) -> io::Result<()> {
    for attribute in attributes.values() {
        let kind = match attribute.attribute_type() {
            AttributeType::Numeric => attribute.storage().name(),
            AttributeType::String => "string",
        };
        writeln!(
            out,
            "  {section:<9} {name} {kind}[{tuple}] x {count}",
            name = attribute.name(),
            tuple = attribute.tuple_size(),
            count = attribute.element_count(),
        )?;
    }
    Ok(())
}

pub fn describe(geo: &Geo, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "points:     {}", geo.point_count)?;
    writeln!(out, "vertices:   {}", geo.vertex_count)?;
    writeln!(out, "primitives: {}", geo.primitive_count)?;

    writeln!(out, "attributes:")?;
    describe_attributes(out, "point", &geo.point_attributes)?;
    describe_attributes(out, "vertex", &geo.vertex_attributes)?;
    describe_attributes(out, "primitive", &geo.primitive_attributes)?;
    describe_attributes(out, "global", &geo.global_attributes)?;

    writeln!(out, "primitives:")?;
    for primitive in &geo.primitives {
        match primitive {
            Primitive::Volume(volume) => {
                let [x, y, z] = volume.resolution();
                let center = volume.center;
                writeln!(
                    out,
                    "  Volume {x}x{y}x{z} at ({}, {}, {})",
                    center.x, center.y, center.z
                )?;
            }
            Primitive::Poly(poly) => {
                let sides: usize = poly.polygons().map(<[u32]>::len).sum();
                writeln!(out, "  Poly x {} ({sides} vertices)", poly.len())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use houio::Volume;

    use super::*;

    #[test]
    fn summary_lists_sections_and_primitives() {
        let mut geo = Geo::new();
        geo.add_volume(Volume::constant([2, 3, 4], 0.5).unwrap()).unwrap();

        let mut out = Vec::new();
        describe(&geo, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "points:     1\n\
             vertices:   1\n\
             primitives: 1\n\
             attributes:\n  \
             point     P fpreal32[4] x 1\n\
             primitives:\n  \
             Volume 2x3x4 at (0, 0, 0)\n"
        );
    }
}
