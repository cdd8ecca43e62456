//! Reader and writer for Houdini `.bgeo` and `.geo` geometry files.
//!
//! The crate is layered the way the format is:
//!
//! * [`Tokenizer`] turns bytes into [`Token`]s, sniffing the binary magic on
//!   the first byte and falling back to the text encoding otherwise.
//! * [`Parser`] checks the grammar and yields [`Event`]s.
//! * [`DocumentBuilder`] (or [`read_document`]) folds events into a
//!   [`Value`] tree, keeping bulk payloads as dense [`UniformArray`]s.
//! * [`BinaryWriter`] and [`TextWriter`] implement [`Writer`], the inverse.
//! * [`Geo`] applies the geometry schema on top: attributes are depacked
//!   from their paged layout ([`depack`]) and volumes are reassembled from
//!   16³ tiles ([`voxel`]).
//!
//! # Examples
//!
//! ```
//! use houio::{ExportOptions, Geo, Volume};
//!
//! let mut geo = Geo::new();
//! geo.add_volume(Volume::constant([20, 20, 20], 1.0)?)?;
//!
//! let bytes = geo.save(Vec::new(), ExportOptions::default())?;
//! let back = Geo::read(&bytes[..])?;
//! assert_eq!(back.volumes().next().unwrap().voxel(19, 19, 19), Some(1.0));
//! # Ok::<(), houio::Error>(())
//! ```

mod builder;
mod error;
mod geo;
mod load;
mod logger;
mod options;
mod parser;
mod save;
mod sink;
mod token;
mod tokenizer;
mod value;
mod writer;

pub mod depack;
pub mod scalar;
pub mod voxel;

#[cfg(test)]
mod tests;

pub use builder::{DocumentBuilder, read_document};
pub use error::{DecodeError, Error, Result, SchemaError, Unsupported};
pub use geo::{Attribute, AttributeType, AttributeValues, Geo, Poly, Primitive, Storage, Volume};
pub use logger::Logger;
pub use options::{DEFAULT_PAGE_SIZE, ExportOptions, Format, WriterOptions};
pub use parser::{Event, MAX_DEPTH, Parser};
pub use sink::GeometrySink;
pub use token::{BINARY_MAGIC, BINARY_MAGIC_SWAPPED, Tag, Token, UniformKind};
pub use tokenizer::{Encoding, Tokenizer};
pub use value::{Array, Map, UniformArray, Value};
pub use writer::{BinaryWriter, IntWidth, TextWriter, Writer, write_value};
