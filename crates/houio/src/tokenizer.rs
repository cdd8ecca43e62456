//! Byte stream to [`Token`] conversion for both encodings.
//!
//! The encoding is sniffed from the very first byte: [`Tag::Magic`] followed
//! by the binary magic number selects the binary decoder for the rest of the
//! document, anything else selects the text decoder. The string table of the
//! binary encoding is owned by the tokenizer; definitions and removals are
//! consumed here and references come out as ordinary strings.
//!
//! Uniform array headers are returned as tokens; their elements stay in the
//! stream until [`Tokenizer::read_uniform`] pulls them in one bulk read.

use std::{collections::HashMap, io::Read};

use bstr::BString;
use half::f16;
use tracing::{debug, trace, warn};

use crate::{
    error::{DecodeError, Error, Result, Unsupported},
    scalar::{ByteReader, Endianness},
    token::{BINARY_MAGIC, BINARY_MAGIC_SWAPPED, Tag, Token, UniformKind},
    value::UniformArray,
};

/// Which encoding a document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Tagged binary tokens.
    Binary,
    /// Human readable text.
    Text,
}

/// Spellings of non-finite reals accepted in text documents (lowercased, unsigned).
const NON_FINITE: &[(&str, f64)] = &[
    ("nan", f64::NAN),
    ("1.#ind", f64::NAN),
    ("inf", f64::INFINITY),
    ("infinity", f64::INFINITY),
    ("1.#inf", f64::INFINITY),
];

macro_rules! decode_with {
    ($ty:ty) => {
        |raw, endianness| match endianness {
            Endianness::Little => <$ty>::from_le_bytes(raw),
            Endianness::Big => <$ty>::from_be_bytes(raw),
        }
    };
}

/// Pull-based tokenizer over a byte stream.
#[derive(Debug)]
pub struct Tokenizer<R> {
    reader: ByteReader<R>,
    encoding: Option<Encoding>,
    strings: HashMap<u64, String>,
}

impl<R: Read> Tokenizer<R> {
    /// Start tokenizing a stream. The string table starts empty.
    pub fn new(inner: R) -> Self {
        Self {
            reader: ByteReader::new(inner),
            encoding: None,
            strings: HashMap::new(),
        }
    }

    /// The encoding, once the first byte has been seen.
    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    /// Returns `true` once the stream is known to be binary.
    pub fn is_binary(&self) -> bool {
        self.encoding == Some(Encoding::Binary)
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    /// Hand the underlying stream back to the caller.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    /// Read the next token, or `None` at the end of the stream.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        let Some(first) = self.reader.next_byte()? else {
            return Ok(None);
        };
        match self.encoding {
            None if first == Tag::Magic as u8 => {
                self.read_magic()?;
                self.encoding = Some(Encoding::Binary);
                debug!(endianness = ?self.reader.endianness(), "binary document");
                self.next_token()
            }
            None => {
                debug!("text document");
                self.encoding = Some(Encoding::Text);
                self.text_token(first)
            }
            Some(Encoding::Binary) => self.binary_token(first),
            Some(Encoding::Text) => self.text_token(first),
        }
    }

    fn read_magic(&mut self) -> Result<()> {
        let at = self.reader.offset();
        match self.reader.read_u32()? {
            BINARY_MAGIC => Ok(()),
            BINARY_MAGIC_SWAPPED => {
                let swapped = match self.reader.endianness() {
                    Endianness::Little => Endianness::Big,
                    Endianness::Big => Endianness::Little,
                };
                self.reader.set_endianness(swapped);
                Ok(())
            }
            other => Err(Error::decode(at, DecodeError::BadMagic(other))),
        }
    }

    fn lookup(&self, id: u64, at: u64) -> Result<String> {
        self.strings
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::decode(at, DecodeError::UndefinedStringRef(id)))
    }

    fn binary_token(&mut self, first: u8) -> Result<Option<Token>> {
        let mut byte = first;
        loop {
            let at = self.reader.offset() - 1;
            let tag = Tag::try_from(byte).map_err(|b| Error::decode(at, DecodeError::UnknownTag(b)))?;
            let r = &mut self.reader;
            let token = match tag {
                Tag::TokenDef => {
                    let id = r.read_length()?;
                    let s = r.read_string()?;
                    trace!(id, string = %s, "define string");
                    self.strings.insert(id, s);
                    None
                }
                Tag::TokenUndef => {
                    let id = r.read_length()?;
                    trace!(id, "undefine string");
                    if self.strings.remove(&id).is_none() {
                        warn!(id, "undefining a string id that was never defined");
                    }
                    None
                }
                Tag::TokenRef => {
                    let id = r.read_length()?;
                    Some(Token::String(self.lookup(id, at)?))
                }
                Tag::Null => Some(Token::Null),
                Tag::Bool => Some(Token::Bool(r.read_u8()? != 0)),
                Tag::True => Some(Token::Bool(true)),
                Tag::False => Some(Token::Bool(false)),
                Tag::Int8 => Some(Token::Int8(r.read_i8()?)),
                Tag::Int16 => Some(Token::Int16(r.read_i16()?)),
                Tag::Int32 => Some(Token::Int32(r.read_i32()?)),
                Tag::Int64 => Some(Token::Int64(r.read_i64()?)),
                Tag::UInt8 => Some(Token::UInt8(r.read_u8()?)),
                Tag::UInt16 => Some(Token::UInt16(r.read_u16()?)),
                Tag::Real16 => Some(Token::Real16(r.read_f16()?)),
                Tag::Real32 => Some(Token::Real32(r.read_f32()?)),
                Tag::Real64 => Some(Token::Real64(r.read_f64()?)),
                Tag::String => Some(Token::String(r.read_string()?)),
                Tag::UniformArray => {
                    let kind_at = r.offset();
                    let raw = r.read_u8()?;
                    let kind = UniformKind::from_tag(raw)
                        .ok_or_else(|| Error::decode(kind_at, DecodeError::UnknownUniformKind(raw)))?;
                    let len = r.read_length()?;
                    Some(Token::UniformArray { kind, len })
                }
                Tag::ArrayBegin => Some(Token::ArrayBegin),
                Tag::ArrayEnd => Some(Token::ArrayEnd),
                Tag::MapBegin => Some(Token::MapBegin),
                Tag::MapEnd => Some(Token::MapEnd),
                Tag::KeySeparator | Tag::ValueSeparator | Tag::Magic => {
                    return Err(Error::decode(at, DecodeError::UnknownTag(byte)));
                }
            };
            if let Some(token) = token {
                return Ok(Some(token));
            }
            match self.reader.next_byte()? {
                Some(next) => byte = next,
                None => return Ok(None),
            }
        }
    }

    fn text_token(&mut self, first: u8) -> Result<Option<Token>> {
        let mut c = first;
        loop {
            match c {
                b' ' | b'\r' | b'\n' | b'\t' => {}
                b'/' => match self.reader.next_byte()? {
                    Some(b'/') => loop {
                        match self.reader.next_byte()? {
                            None => return Ok(None),
                            Some(b'\n' | b'\r') => break,
                            Some(_) => {}
                        }
                    },
                    _ => {
                        return Err(self
                            .reader
                            .error(DecodeError::InvalidLiteral(BString::from("/"))));
                    }
                },
                b'{' => return Ok(Some(Token::MapBegin)),
                b'}' => return Ok(Some(Token::MapEnd)),
                b'[' => return Ok(Some(Token::ArrayBegin)),
                b']' => return Ok(Some(Token::ArrayEnd)),
                b',' => return Ok(Some(Token::ValueSeparator)),
                b':' => return Ok(Some(Token::KeySeparator)),
                b'"' => return self.quoted_string().map(|s| Some(Token::String(s))),
                _ => return self.literal(c).map(Some),
            }
            c = match self.reader.next_byte()? {
                Some(c) => c,
                None => return Ok(None),
            };
        }
    }

    fn quoted_string(&mut self) -> Result<String> {
        let start = self.reader.offset();
        let mut word = Vec::new();
        loop {
            let Some(c) = self.reader.next_byte()? else {
                return Err(Error::decode(start - 1, DecodeError::UnterminatedString));
            };
            match c {
                b'"' => break,
                b'\\' => {
                    let Some(e) = self.reader.next_byte()? else {
                        return Err(Error::decode(start - 1, DecodeError::UnterminatedString));
                    };
                    match e {
                        b'"' | b'\\' | b'/' => word.push(e),
                        b'b' => word.push(0x08),
                        b'f' => word.push(0x0c),
                        b'n' => word.push(b'\n'),
                        b'r' => word.push(b'\r'),
                        b't' => word.push(b'\t'),
                        b'u' => return Err(Unsupported::UnicodeEscape.into()),
                        other => word.extend_from_slice(&[b'\\', other]),
                    }
                }
                _ => word.push(c),
            }
        }
        String::from_utf8(word).map_err(|_| Error::decode(start, DecodeError::InvalidUtf8))
    }

    fn literal(&mut self, first: u8) -> Result<Token> {
        let start = self.reader.offset() - 1;
        let mut word = vec![first];
        while let Some(c) = self.reader.next_byte()? {
            if b" \r\n\t/{}[],:\"".contains(&c) {
                self.reader.put_back(c);
                break;
            }
            word.push(c);
        }
        word.make_ascii_lowercase();
        let invalid = || Error::decode(start, DecodeError::InvalidLiteral(BString::from(word.as_slice())));

        match word.as_slice() {
            b"null" => return Ok(Token::Null),
            b"true" => return Ok(Token::Bool(true)),
            b"false" => return Ok(Token::Bool(false)),
            _ => {}
        }
        let Ok(text) = core::str::from_utf8(&word) else {
            return Err(invalid());
        };
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        if let Some(&(_, x)) = NON_FINITE.iter().find(|(name, _)| *name == unsigned) {
            return Ok(Token::Real64(if negative { -x } else { x }));
        }
        if text.contains(['.', 'e']) {
            return text.parse().map(Token::Real64).map_err(|_| invalid());
        }
        text.parse().map(Token::Int64).map_err(|_| invalid())
    }

    /// Read the elements of a uniform array whose header was just returned.
    ///
    /// Boolean arrays arrive as a bit stream of `u32` words; bit `i` of each
    /// word is element `i` of that word's 32-element slice.
    pub fn read_uniform(&mut self, kind: UniformKind, len: u64) -> Result<UniformArray> {
        let r = &mut self.reader;
        Ok(match kind {
            UniformKind::Bool => {
                let words = r.read_bulk::<4, u32>(len.div_ceil(32), decode_with!(u32))?;
                let mut bits = Vec::new();
                let mut remaining = len;
                for word in words {
                    let n = remaining.min(32);
                    bits.extend((0..n).map(|i| word & (1 << i) != 0));
                    remaining -= n;
                }
                UniformArray::Bool(bits)
            }
            UniformKind::Int8 => UniformArray::Int8(r.read_bulk::<1, i8>(len, |raw, _| i8::from_ne_bytes(raw))?),
            UniformKind::UInt8 => UniformArray::UInt8(r.read_bulk::<1, u8>(len, |raw, _| raw[0])?),
            UniformKind::Int16 => UniformArray::Int16(r.read_bulk::<2, i16>(len, decode_with!(i16))?),
            UniformKind::UInt16 => UniformArray::UInt16(r.read_bulk::<2, u16>(len, decode_with!(u16))?),
            UniformKind::Int32 => UniformArray::Int32(r.read_bulk::<4, i32>(len, decode_with!(i32))?),
            UniformKind::Int64 => UniformArray::Int64(r.read_bulk::<8, i64>(len, decode_with!(i64))?),
            UniformKind::Real16 => {
                let bits = r.read_bulk::<2, u16>(len, decode_with!(u16))?;
                UniformArray::Real16(bits.into_iter().map(f16::from_bits).collect())
            }
            UniformKind::Real32 => UniformArray::Real32(r.read_bulk::<4, f32>(len, decode_with!(f32))?),
            UniformKind::Real64 => UniformArray::Real64(r.read_bulk::<8, f64>(len, decode_with!(f64))?),
            UniformKind::String => {
                let mut strings = Vec::new();
                for _ in 0..len {
                    strings.push(r.read_string()?);
                }
                UniformArray::String(strings)
            }
            UniformKind::StringToken => {
                let mut strings = Vec::new();
                for _ in 0..len {
                    let at = self.reader.offset();
                    let id = self.reader.read_length()?;
                    strings.push(self.lookup(id, at)?);
                }
                UniformArray::String(strings)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(bytes: &[u8]) -> Result<Vec<Token>> {
        let mut t = Tokenizer::new(bytes);
        let mut out = Vec::new();
        while let Some(tok) = t.next_token()? {
            out.push(tok);
        }
        Ok(out)
    }

    fn binary(body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x7f];
        bytes.extend_from_slice(&BINARY_MAGIC.to_le_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn sniffs_binary_magic() {
        let toks = tokens(&binary(&[0x5b, 0x11, 0x7f, 0x31, 0x5d])).unwrap();
        assert_eq!(
            toks,
            vec![Token::ArrayBegin, Token::Int8(127), Token::Bool(true), Token::ArrayEnd]
        );
    }

    #[test]
    fn swapped_magic_reads_big_endian() {
        let mut bytes = vec![0x7f];
        bytes.extend_from_slice(&BINARY_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&[0x12, 0x01, 0x00]);
        assert_eq!(tokens(&bytes).unwrap(), vec![Token::Int16(256)]);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let err = tokens(&[0x7f, 1, 2, 3, 4]).unwrap_err();
        assert_eq!(err.decode_kind(), Some(&DecodeError::BadMagic(0x0403_0201)));
    }

    #[test]
    fn unknown_tag_is_a_hard_error() {
        let err = tokens(&binary(&[0x5b, 0xff])).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode { offset: 6, kind: DecodeError::UnknownTag(0xff) }
        ));
    }

    #[test]
    fn separators_are_not_binary_tokens() {
        let err = tokens(&binary(&[0x3a])).unwrap_err();
        assert_eq!(err.decode_kind(), Some(&DecodeError::UnknownTag(0x3a)));
    }

    #[test]
    fn string_table_define_reference_undefine() {
        let body = [
            0x2b, 0x03, 0x02, b'h', b'i', // define id 3 = "hi"
            0x26, 0x03, // ref 3
            0x2d, 0x03, // undefine 3
            0x26, 0x03, // ref 3 again
        ];
        let bytes = binary(&body);
        let mut t = Tokenizer::new(&bytes[..]);
        assert_eq!(t.next_token().unwrap(), Some(Token::String("hi".into())));
        let err = t.next_token().unwrap_err();
        assert_eq!(err.decode_kind(), Some(&DecodeError::UndefinedStringRef(3)));
    }

    #[test]
    fn undefining_unknown_id_is_tolerated() {
        assert_eq!(tokens(&binary(&[0x2d, 0x09, 0x00])).unwrap(), vec![Token::Null]);
    }

    #[test]
    fn uniform_header_leaves_payload_in_stream() {
        let mut body = vec![0x40, 0x19, 0x02];
        body.extend_from_slice(&1.5_f32.to_le_bytes());
        body.extend_from_slice(&(-2.0_f32).to_le_bytes());
        body.push(0x00);
        let bytes = binary(&body);
        let mut t = Tokenizer::new(&bytes[..]);
        let Some(Token::UniformArray { kind, len }) = t.next_token().unwrap() else {
            panic!("expected a uniform array header");
        };
        assert_eq!((kind, len), (UniformKind::Real32, 2));
        assert_eq!(t.read_uniform(kind, len).unwrap(), UniformArray::Real32(vec![1.5, -2.0]));
        assert_eq!(t.next_token().unwrap(), Some(Token::Null));
    }

    #[test]
    fn bit_array_of_forty_booleans() {
        let word0: u32 = 0b1011_0000_0000_0000_0000_0000_0000_0101;
        let word1: u32 = 0b1000_0001;
        let mut body = vec![0x40, 0x10, 40];
        body.extend_from_slice(&word0.to_le_bytes());
        body.extend_from_slice(&word1.to_le_bytes());
        let bytes = binary(&body);
        let mut t = Tokenizer::new(&bytes[..]);
        let Some(Token::UniformArray { kind, len }) = t.next_token().unwrap() else {
            panic!("expected a uniform array header");
        };
        let UniformArray::Bool(bits) = t.read_uniform(kind, len).unwrap() else {
            panic!("expected booleans");
        };
        assert_eq!(bits.len(), 40);
        for (i, bit) in bits.iter().enumerate() {
            let expected = if i < 32 {
                word0 & (1 << i) != 0
            } else {
                word1 & (1 << (i - 32)) != 0
            };
            assert_eq!(*bit, expected, "bit {i}");
        }
        assert!(bits[0] && !bits[1] && bits[2] && bits[31] && bits[32] && bits[39]);
    }

    #[test]
    fn truncated_uniform_payload_fails() {
        let bytes = binary(&[0x40, 0x13, 0x04, 1, 0, 0, 0]);
        let mut t = Tokenizer::new(&bytes[..]);
        let Some(Token::UniformArray { kind, len }) = t.next_token().unwrap() else {
            panic!("expected a uniform array header");
        };
        let err = t.read_uniform(kind, len).unwrap_err();
        assert_eq!(err.decode_kind(), Some(&DecodeError::UnexpectedEndOfInput));
    }

    #[test]
    fn text_literals_and_comments() {
        let toks = tokens(b"// header\n[ NULL, True, -12, 1.5e2, 3E1, \"a\\tb\" ] // tail").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::ArrayBegin,
                Token::Null,
                Token::ValueSeparator,
                Token::Bool(true),
                Token::ValueSeparator,
                Token::Int64(-12),
                Token::ValueSeparator,
                Token::Real64(150.0),
                Token::ValueSeparator,
                Token::Real64(30.0),
                Token::ValueSeparator,
                Token::String("a\tb".into()),
                Token::ArrayEnd,
            ]
        );
    }

    #[test]
    fn text_non_finite_reals() {
        let toks = tokens(b"[nan,-INF,1.#IND]").unwrap();
        assert!(matches!(toks[1], Token::Real64(x) if x.is_nan()));
        assert_eq!(toks[3], Token::Real64(f64::NEG_INFINITY));
        assert!(matches!(toks[5], Token::Real64(x) if x.is_nan()));
    }

    #[test]
    fn text_unknown_escape_keeps_backslash() {
        assert_eq!(tokens(br#""a\qb""#).unwrap(), vec![Token::String("a\\qb".into())]);
    }

    #[test]
    fn text_unicode_escape_is_unsupported() {
        let err = tokens(b"\"\\u0041\"").unwrap_err();
        assert!(matches!(err, Error::Unsupported(Unsupported::UnicodeEscape)));
    }

    #[test]
    fn text_garbage_literal() {
        let err = tokens(b"[12abc]").unwrap_err();
        assert_eq!(
            err.decode_kind(),
            Some(&DecodeError::InvalidLiteral(BString::from("12abc")))
        );
    }

    #[test]
    fn unterminated_text_string() {
        let err = tokens(b"  \"abc").unwrap_err();
        assert!(matches!(
            err,
            Error::Decode { offset: 2, kind: DecodeError::UnterminatedString }
        ));
    }
}
