//! Error types shared by every stage of the codec.
//!
//! All failures are fatal to the call that produced them: a parse, load or
//! save either runs to completion or stops at the first [`Error`]. The three
//! domain categories map onto [`DecodeError`] (the byte stream is malformed),
//! [`SchemaError`] (the document is well formed but does not describe a valid
//! geometry) and [`Unsupported`] (the file uses a feature this codec does not
//! implement).

use bstr::BString;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Top level error returned by all fallible operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte stream could not be tokenized or parsed.
    #[error("decode error at byte {offset}: {kind}")]
    Decode {
        /// Byte offset into the stream where the problem was detected.
        offset: u64,
        /// What went wrong.
        kind: DecodeError,
    },
    /// The document does not follow the geometry schema.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    /// The document uses a feature outside the supported subset.
    #[error("unsupported: {0}")]
    Unsupported(#[from] Unsupported),
    /// The underlying reader or writer failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn decode(offset: u64, kind: DecodeError) -> Self {
        Self::Decode { offset, kind }
    }

    /// Returns the decode error kind, if this is a decode error.
    #[must_use]
    pub fn decode_kind(&self) -> Option<&DecodeError> {
        match self {
            Self::Decode { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// Malformed input at the token or grammar level.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// The stream ended in the middle of a token or before the document was complete.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    /// A binary tag byte that does not name any token kind.
    #[error("unknown binary tag 0x{0:02x}")]
    UnknownTag(u8),
    /// A length prefix byte other than `< 0xf1`, `0xf2`, `0xf4` or `0xf8`.
    #[error("invalid length prefix 0x{0:02x}")]
    InvalidLengthPrefix(u8),
    /// A negative 64-bit length.
    #[error("negative length {0}")]
    NegativeLength(i64),
    /// The four bytes after the magic tag were not the binary magic number.
    #[error("bad magic number 0x{0:08x}")]
    BadMagic(u32),
    /// A uniform array whose element kind tag is not a scalar kind.
    #[error("unknown uniform array element tag 0x{0:02x}")]
    UnknownUniformKind(u8),
    /// A token that the grammar does not allow in the current position.
    #[error("unexpected {found} while {expected}")]
    UnexpectedToken {
        /// Short description of the offending token.
        found: &'static str,
        /// What the parser was waiting for.
        expected: &'static str,
    },
    /// A string table reference to an id that was never defined.
    #[error("reference to undefined string id {0}")]
    UndefinedStringRef(u64),
    /// A quoted text string without its closing quote.
    #[error("unterminated string")]
    UnterminatedString,
    /// String bytes that are not valid UTF-8.
    #[error("string is not valid utf-8")]
    InvalidUtf8,
    /// An unquoted text literal that is neither a keyword nor a number.
    #[error("invalid literal {0:?}")]
    InvalidLiteral(BString),
    /// Containers nested deeper than the parser accepts.
    #[error("containers nested deeper than {0} levels")]
    NestingTooDeep(usize),
    /// A declared element count whose byte size does not fit in memory.
    #[error("length {0} overflows the addressable size")]
    LengthOverflow(u64),
}

/// A well formed document that does not describe a valid geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    /// A key the schema requires is absent.
    #[error("missing key `{0}`")]
    MissingKey(&'static str),
    /// The value at a schema position has the wrong type.
    #[error("`{key}` should be {expected}")]
    WrongType {
        /// Key or position that was inspected.
        key: &'static str,
        /// Expected value type.
        expected: &'static str,
    },
    /// Position attributes must carry four components.
    #[error("position attribute `P` needs tuple size 4, got {0}")]
    PositionTupleSize(usize),
    /// Attribute values that do not fill a whole number of tuples.
    #[error("attribute `{name}` has {len} values, not a multiple of tuple size {tuple_size}")]
    AttributeLength {
        /// Attribute name.
        name: String,
        /// Declared tuple size.
        tuple_size: usize,
        /// Number of values supplied.
        len: usize,
    },
    /// Attribute `type` is neither `numeric` nor `string`.
    #[error("unknown attribute type `{0}`")]
    UnknownAttributeType(String),
    /// Attribute `storage` is not one of the supported storages.
    #[error("unknown attribute storage `{0}`")]
    UnknownStorage(String),
    /// The paged data ended before every element was filled.
    #[error("page data for `{name}` too short: needed index {needed}, have {len}")]
    PageDataTooShort {
        /// Attribute name.
        name: String,
        /// Source index that was requested.
        needed: usize,
        /// Number of source values available.
        len: usize,
    },
    /// Packing or page flag tables do not match the attribute.
    #[error("invalid page layout for `{name}`: {reason}")]
    InvalidPageLayout {
        /// Attribute name.
        name: String,
        /// Description of the mismatch.
        reason: &'static str,
    },
    /// Number of tiles differs from the tile grid implied by the resolution.
    #[error("expected {expected} tiles for resolution {resolution:?}, found {found}")]
    TileCount {
        /// Volume resolution.
        resolution: [usize; 3],
        /// Tile count implied by the resolution.
        expected: usize,
        /// Tile count present in the file.
        found: usize,
    },
    /// A dense tile carries the wrong number of voxels.
    #[error("tile {tile} holds {found} voxels, expected {expected}")]
    TileLength {
        /// Tile index in storage order.
        tile: usize,
        /// Voxel count implied by the tile extent.
        expected: usize,
        /// Voxel count present in the file.
        found: usize,
    },
    /// Voxel buffer size does not match the resolution.
    #[error("voxel buffer holds {found} values, resolution needs {expected}")]
    VoxelCount {
        /// Product of the resolution.
        expected: usize,
        /// Actual buffer length.
        found: usize,
    },
    /// An index referring outside its target table.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Which table was indexed.
        what: &'static str,
        /// Offending index.
        index: i64,
        /// Table length.
        len: usize,
    },
}

/// Features recognised but deliberately not implemented.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Unsupported {
    /// `\uXXXX` escapes in text strings.
    #[error("unicode string escapes")]
    UnicodeEscape,
    /// A tile compression other than raw, rawfull or constant.
    #[error("tile compression `{0}`")]
    TileCompression(String),
    /// A tile whose compression index is not in the compression table.
    #[error("tile compression index {0}")]
    TileCompressionIndex(i64),
    /// A volume referencing shared voxel data that was never declared.
    #[error("shared voxel data `{0}` not found")]
    SharedVoxels(String),
}
