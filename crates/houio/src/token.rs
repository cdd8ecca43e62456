//! The closed set of lexical tokens shared by the binary and text encodings.
//!
//! Binary documents identify every token by a one-byte [`Tag`]. The text
//! encoding produces the same [`Token`] values from characters and literals,
//! so the parser never needs to know which encoding it is reading beyond the
//! separator handling.

use half::f16;

/// One-byte token identifiers of the binary encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// `null`.
    Null = 0x00,
    /// Boolean followed by one payload byte.
    Bool = 0x10,
    /// Signed 8-bit integer.
    Int8 = 0x11,
    /// Signed 16-bit integer.
    Int16 = 0x12,
    /// Signed 32-bit integer.
    Int32 = 0x13,
    /// Signed 64-bit integer.
    Int64 = 0x14,
    /// Half precision float.
    Real16 = 0x18,
    /// Single precision float.
    Real32 = 0x19,
    /// Double precision float.
    Real64 = 0x1a,
    /// Unsigned 8-bit integer.
    UInt8 = 0x21,
    /// Unsigned 16-bit integer.
    UInt16 = 0x22,
    /// Reference to a string table entry.
    TokenRef = 0x26,
    /// Length-prefixed string.
    String = 0x27,
    /// Value separator (`,`), text only.
    ValueSeparator = 0x2c,
    /// String table definition.
    TokenDef = 0x2b,
    /// String table removal.
    TokenUndef = 0x2d,
    /// `false` without payload.
    False = 0x30,
    /// `true` without payload.
    True = 0x31,
    /// Key separator (`:`), text only.
    KeySeparator = 0x3a,
    /// Bulk array of one element kind.
    UniformArray = 0x40,
    /// `[`.
    ArrayBegin = 0x5b,
    /// `]`.
    ArrayEnd = 0x5d,
    /// `{`.
    MapBegin = 0x7b,
    /// `}`.
    MapEnd = 0x7d,
    /// Leading byte of a binary document.
    Magic = 0x7f,
}

/// Magic number following [`Tag::Magic`] in a little-endian document.
pub const BINARY_MAGIC: u32 = 0x624a_534e;
/// The magic number as seen when the document byte order differs from ours.
pub const BINARY_MAGIC_SWAPPED: u32 = 0x4e53_4a62;

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        Ok(match byte {
            0x00 => Self::Null,
            0x10 => Self::Bool,
            0x11 => Self::Int8,
            0x12 => Self::Int16,
            0x13 => Self::Int32,
            0x14 => Self::Int64,
            0x18 => Self::Real16,
            0x19 => Self::Real32,
            0x1a => Self::Real64,
            0x21 => Self::UInt8,
            0x22 => Self::UInt16,
            0x26 => Self::TokenRef,
            0x27 => Self::String,
            0x2b => Self::TokenDef,
            0x2c => Self::ValueSeparator,
            0x2d => Self::TokenUndef,
            0x30 => Self::False,
            0x31 => Self::True,
            0x3a => Self::KeySeparator,
            0x40 => Self::UniformArray,
            0x5b => Self::ArrayBegin,
            0x5d => Self::ArrayEnd,
            0x7b => Self::MapBegin,
            0x7d => Self::MapEnd,
            0x7f => Self::Magic,
            other => return Err(other),
        })
    }
}

/// Element kind of a uniform array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// Bit-packed booleans, 32 per `u32` word.
    Bool,
    /// `i8` elements.
    Int8,
    /// `i16` elements.
    Int16,
    /// `i32` elements.
    Int32,
    /// `i64` elements.
    Int64,
    /// `u8` elements.
    UInt8,
    /// `u16` elements.
    UInt16,
    /// Half precision elements.
    Real16,
    /// `f32` elements.
    Real32,
    /// `f64` elements.
    Real64,
    /// Length-prefixed strings.
    String,
    /// String table ids resolved to strings.
    StringToken,
}

impl UniformKind {
    /// Map an element tag to a kind, if it names a scalar type.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match Tag::try_from(tag).ok()? {
            Tag::Bool => Self::Bool,
            Tag::Int8 => Self::Int8,
            Tag::Int16 => Self::Int16,
            Tag::Int32 => Self::Int32,
            Tag::Int64 => Self::Int64,
            Tag::UInt8 => Self::UInt8,
            Tag::UInt16 => Self::UInt16,
            Tag::Real16 => Self::Real16,
            Tag::Real32 => Self::Real32,
            Tag::Real64 => Self::Real64,
            Tag::String => Self::String,
            Tag::TokenRef => Self::StringToken,
            _ => return None,
        })
    }

    /// The element tag written after [`Tag::UniformArray`].
    #[must_use]
    pub fn tag(self) -> Tag {
        match self {
            Self::Bool => Tag::Bool,
            Self::Int8 => Tag::Int8,
            Self::Int16 => Tag::Int16,
            Self::Int32 => Tag::Int32,
            Self::Int64 => Tag::Int64,
            Self::UInt8 => Tag::UInt8,
            Self::UInt16 => Tag::UInt16,
            Self::Real16 => Tag::Real16,
            Self::Real32 => Tag::Real32,
            Self::Real64 => Tag::Real64,
            Self::String => Tag::String,
            Self::StringToken => Tag::TokenRef,
        }
    }
}

/// One lexical unit, with its payload.
///
/// String-table definitions never appear here: the tokenizer consumes them
/// and turns references into plain [`Token::String`] values.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `null`.
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// 8-bit signed integer.
    Int8(i8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer (also every integer literal in text mode).
    Int64(i64),
    /// 8-bit unsigned integer.
    UInt8(u8),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// Half precision float.
    Real16(f16),
    /// Single precision float.
    Real32(f32),
    /// Double precision float (also every real literal in text mode).
    Real64(f64),
    /// A string, inline or resolved through the string table.
    String(String),
    /// `{`.
    MapBegin,
    /// `}`.
    MapEnd,
    /// `[`.
    ArrayBegin,
    /// `]`.
    ArrayEnd,
    /// `:` (text only).
    KeySeparator,
    /// `,` (text only).
    ValueSeparator,
    /// Header of a bulk array; the elements follow in the stream.
    UniformArray {
        /// Element kind.
        kind: UniformKind,
        /// Number of elements.
        len: u64,
    },
}

impl Token {
    /// Short human readable name, used in error messages.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int8(_) | Self::Int16(_) | Self::Int32(_) | Self::Int64(_) => "integer",
            Self::UInt8(_) | Self::UInt16(_) => "unsigned integer",
            Self::Real16(_) | Self::Real32(_) | Self::Real64(_) => "real",
            Self::String(_) => "string",
            Self::MapBegin => "'{'",
            Self::MapEnd => "'}'",
            Self::ArrayBegin => "'['",
            Self::ArrayEnd => "']'",
            Self::KeySeparator => "':'",
            Self::ValueSeparator => "','",
            Self::UniformArray { .. } => "uniform array",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_round_trips_through_its_byte() {
        for byte in 0_u8..=0xff {
            if let Ok(tag) = Tag::try_from(byte) {
                assert_eq!(tag as u8, byte);
            }
        }
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        assert_eq!(Tag::try_from(0xff), Err(0xff));
        assert_eq!(Tag::try_from(0x15), Err(0x15));
    }

    #[test]
    fn uniform_kinds_exclude_structural_tags() {
        assert_eq!(UniformKind::from_tag(0x19), Some(UniformKind::Real32));
        assert_eq!(UniformKind::from_tag(0x26), Some(UniformKind::StringToken));
        assert_eq!(UniformKind::from_tag(0x5b), None);
        assert_eq!(UniformKind::from_tag(0x40), None);
        for kind in [UniformKind::Bool, UniformKind::Int16, UniformKind::String] {
            assert_eq!(UniformKind::from_tag(kind.tag() as u8), Some(kind));
        }
    }
}
