//! Serializers for the binary and text encodings.
//!
//! Both implement [`Writer`], an explicit call-per-token interface: the
//! caller opens and closes containers and emits keys and values in document
//! order. [`write_value`] drives any writer from a [`Value`] tree.

use std::{
    collections::HashMap,
    fmt::Write as _,
    io::Write,
};

use crate::{
    error::Result,
    options::WriterOptions,
    scalar::ByteWriter,
    token::{BINARY_MAGIC, Tag},
    value::{Array, UniformArray, Value, write_escaped_string, write_real},
};

/// Token-level serializer.
///
/// Integers written through [`Writer::int`] use the narrowest encoding that
/// holds the value; the explicit-width methods always use their width.
pub trait Writer {
    /// Open an array.
    fn begin_array(&mut self) -> Result<()>;
    /// Close the innermost array.
    fn end_array(&mut self) -> Result<()>;
    /// Open a map.
    fn begin_map(&mut self) -> Result<()>;
    /// Close the innermost map.
    fn end_map(&mut self) -> Result<()>;
    /// Write a map key. The next value belongs to it.
    fn key(&mut self, key: &str) -> Result<()>;
    /// Write `null`.
    fn null(&mut self) -> Result<()>;
    /// Write a boolean.
    fn bool(&mut self, value: bool) -> Result<()>;
    /// Write an integer in the narrowest signed width that holds it.
    fn int(&mut self, value: i64) -> Result<()>;
    /// Write an 8-bit signed integer.
    fn int8(&mut self, value: i8) -> Result<()>;
    /// Write a 32-bit signed integer.
    fn int32(&mut self, value: i32) -> Result<()>;
    /// Write a 64-bit signed integer.
    fn int64(&mut self, value: i64) -> Result<()>;
    /// Write an 8-bit unsigned integer.
    fn uint8(&mut self, value: u8) -> Result<()>;
    /// Write a single precision real.
    fn real32(&mut self, value: f32) -> Result<()>;
    /// Write a double precision real.
    fn real64(&mut self, value: f64) -> Result<()>;
    /// Write a string value.
    fn string(&mut self, value: &str) -> Result<()>;
    /// Write a whole uniform array.
    fn uniform(&mut self, array: &UniformArray) -> Result<()>;
    /// Flush buffered output. Call once after the outermost value.
    fn finish(&mut self) -> Result<()>;
}

/// Integer width chosen by [`Writer::int`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    /// Fits in `i8`.
    W8,
    /// Fits in `i16`.
    W16,
    /// Fits in `i32`.
    W32,
    /// Needs `i64`.
    W64,
}

impl IntWidth {
    /// The narrowest width holding `value`.
    ///
    /// ```
    /// use houio::IntWidth;
    ///
    /// assert_eq!(IntWidth::of(127), IntWidth::W8);
    /// assert_eq!(IntWidth::of(128), IntWidth::W16);
    /// assert_eq!(IntWidth::of(-0x8001), IntWidth::W32);
    /// ```
    #[must_use]
    pub fn of(value: i64) -> Self {
        if (-0x80..0x80).contains(&value) {
            Self::W8
        } else if (-0x8000..0x8000).contains(&value) {
            Self::W16
        } else if (-0x8000_0000..0x8000_0000).contains(&value) {
            Self::W32
        } else {
            Self::W64
        }
    }
}

/// Writer for the tagged binary encoding.
///
/// The magic header is written on construction. Output is always
/// little-endian.
#[derive(Debug)]
pub struct BinaryWriter<W> {
    out: ByteWriter<W>,
    options: WriterOptions,
    strings: HashMap<String, u64>,
}

impl<W: Write> BinaryWriter<W> {
    /// Start a binary document with default options.
    pub fn new(inner: W) -> Result<Self> {
        Self::with_options(inner, WriterOptions::default())
    }

    /// Start a binary document.
    pub fn with_options(inner: W, options: WriterOptions) -> Result<Self> {
        let mut out = ByteWriter::new(inner);
        out.write_u8(Tag::Magic as u8)?;
        out.write_u32(BINARY_MAGIC)?;
        Ok(Self {
            out,
            options,
            strings: HashMap::new(),
        })
    }

    /// Hand the underlying stream back to the caller.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn tag(&mut self, tag: Tag) -> Result<()> {
        self.out.write_u8(tag as u8)
    }

    fn interned(&mut self, value: &str) -> Result<()> {
        let id = match self.strings.get(value) {
            Some(&id) => id,
            None => {
                let id = self.strings.len() as u64;
                self.strings.insert(value.to_owned(), id);
                self.tag(Tag::TokenDef)?;
                self.out.write_length(id)?;
                self.out.write_string(value)?;
                id
            }
        };
        self.tag(Tag::TokenRef)?;
        self.out.write_length(id)
    }
}

fn packed_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(bits.len().div_ceil(32) * 4);
    for chunk in bits.chunks(32) {
        let word = chunk
            .iter()
            .enumerate()
            .fold(0_u32, |word, (i, &bit)| word | (u32::from(bit) << i));
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

macro_rules! le_bytes {
    ($values:expr, $n:literal) => {{
        let mut bytes = Vec::with_capacity($values.len() * $n);
        for x in $values {
            bytes.extend_from_slice(&x.to_le_bytes());
        }
        bytes
    }};
}

impl<W: Write> Writer for BinaryWriter<W> {
    fn begin_array(&mut self) -> Result<()> {
        self.tag(Tag::ArrayBegin)
    }

    fn end_array(&mut self) -> Result<()> {
        self.tag(Tag::ArrayEnd)
    }

    fn begin_map(&mut self) -> Result<()> {
        self.tag(Tag::MapBegin)
    }

    fn end_map(&mut self) -> Result<()> {
        self.tag(Tag::MapEnd)
    }

    fn key(&mut self, key: &str) -> Result<()> {
        self.string(key)
    }

    fn null(&mut self) -> Result<()> {
        self.tag(Tag::Null)
    }

    fn bool(&mut self, value: bool) -> Result<()> {
        self.tag(if value { Tag::True } else { Tag::False })
    }

    #[expect(clippy::cast_possible_truncation)]
    fn int(&mut self, value: i64) -> Result<()> {
        match IntWidth::of(value) {
            IntWidth::W8 => self.int8(value as i8),
            IntWidth::W16 => {
                self.tag(Tag::Int16)?;
                self.out.write_i16(value as i16)
            }
            IntWidth::W32 => self.int32(value as i32),
            IntWidth::W64 => self.int64(value),
        }
    }

    fn int8(&mut self, value: i8) -> Result<()> {
        self.tag(Tag::Int8)?;
        self.out.write_i8(value)
    }

    fn int32(&mut self, value: i32) -> Result<()> {
        self.tag(Tag::Int32)?;
        self.out.write_i32(value)
    }

    fn int64(&mut self, value: i64) -> Result<()> {
        self.tag(Tag::Int64)?;
        self.out.write_i64(value)
    }

    fn uint8(&mut self, value: u8) -> Result<()> {
        self.tag(Tag::UInt8)?;
        self.out.write_u8(value)
    }

    fn real32(&mut self, value: f32) -> Result<()> {
        self.tag(Tag::Real32)?;
        self.out.write_f32(value)
    }

    fn real64(&mut self, value: f64) -> Result<()> {
        self.tag(Tag::Real64)?;
        self.out.write_f64(value)
    }

    fn string(&mut self, value: &str) -> Result<()> {
        if self.options.use_tokens {
            return self.interned(value);
        }
        self.tag(Tag::String)?;
        self.out.write_string(value)
    }

    fn uniform(&mut self, array: &UniformArray) -> Result<()> {
        self.tag(Tag::UniformArray)?;
        self.out.write_u8(array.kind().tag() as u8)?;
        self.out.write_length(array.len() as u64)?;
        let payload = match array {
            UniformArray::Bool(v) => packed_bits(v),
            UniformArray::Int8(v) => le_bytes!(v, 1),
            UniformArray::Int16(v) => le_bytes!(v, 2),
            UniformArray::Int32(v) => le_bytes!(v, 4),
            UniformArray::Int64(v) => le_bytes!(v, 8),
            UniformArray::UInt8(v) => v.clone(),
            UniformArray::UInt16(v) => le_bytes!(v, 2),
            UniformArray::Real16(v) => le_bytes!(v.iter().map(|x| x.to_bits()), 2),
            UniformArray::Real32(v) => le_bytes!(v, 4),
            UniformArray::Real64(v) => le_bytes!(v, 8),
            UniformArray::String(v) => {
                for s in v {
                    self.out.write_string(s)?;
                }
                return Ok(());
            }
        };
        self.out.write_bytes(&payload)
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Array,
    Map,
}

/// Writer for the indented text encoding.
///
/// Containers open on their own line, members follow one per line indented
/// with tabs, and keys are joined to their values with `:`. Uniform arrays
/// are written as ordinary arrays.
#[derive(Debug)]
pub struct TextWriter<W> {
    out: W,
    stack: Vec<Container>,
    indent: usize,
    first_item: bool,
    got_key: bool,
    scratch: String,
}

impl<W: Write> TextWriter<W> {
    /// Start a text document.
    pub fn new(out: W) -> Self {
        Self {
            out,
            stack: Vec::new(),
            indent: 0,
            first_item: false,
            got_key: false,
            scratch: String::new(),
        }
    }

    /// Hand the underlying stream back to the caller.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn raw(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        self.raw("\n")?;
        for _ in 0..self.indent {
            self.raw("\t")?;
        }
        Ok(())
    }

    /// Writes whatever separates the next item from the previous one and
    /// returns whether the output now sits at the start of a line.
    fn prefix(&mut self) -> Result<bool> {
        if self.first_item {
            self.first_item = false;
            self.newline()?;
        } else if self.got_key {
            self.got_key = false;
            self.raw(":")?;
            return Ok(false);
        } else if !self.stack.is_empty() {
            self.raw(",")?;
            self.newline()?;
        }
        Ok(true)
    }

    fn begin(&mut self, container: Container, bracket: &str) -> Result<()> {
        if !self.prefix()? {
            self.newline()?;
        }
        self.stack.push(container);
        self.raw(bracket)?;
        self.indent += 1;
        self.first_item = true;
        Ok(())
    }

    fn end(&mut self, bracket: &str) -> Result<()> {
        self.stack.pop();
        self.indent = self.indent.saturating_sub(1);
        if !core::mem::take(&mut self.first_item) {
            self.newline()?;
        }
        self.raw(bracket)
    }

    fn formatted(&mut self, render: impl FnOnce(&mut String) -> core::fmt::Result) -> Result<()> {
        self.prefix()?;
        let mut scratch = core::mem::take(&mut self.scratch);
        scratch.clear();
        // Formatting into a String cannot fail.
        let _ = render(&mut scratch);
        let written = self.raw(&scratch);
        self.scratch = scratch;
        written
    }

    fn quoted(&mut self, value: &str) -> Result<()> {
        self.formatted(|s| {
            s.push('"');
            write_escaped_string(value, s)?;
            s.push('"');
            Ok(())
        })
    }
}

impl<W: Write> Writer for TextWriter<W> {
    fn begin_array(&mut self) -> Result<()> {
        self.begin(Container::Array, "[")
    }

    fn end_array(&mut self) -> Result<()> {
        self.end("]")
    }

    fn begin_map(&mut self) -> Result<()> {
        self.begin(Container::Map, "{")
    }

    fn end_map(&mut self) -> Result<()> {
        self.end("}")
    }

    fn key(&mut self, key: &str) -> Result<()> {
        self.quoted(key)?;
        self.got_key = true;
        Ok(())
    }

    fn null(&mut self) -> Result<()> {
        self.formatted(|s| s.write_str("null"))
    }

    fn bool(&mut self, value: bool) -> Result<()> {
        self.formatted(|s| s.write_str(if value { "true" } else { "false" }))
    }

    fn int(&mut self, value: i64) -> Result<()> {
        self.formatted(|s| write!(s, "{value}"))
    }

    fn int8(&mut self, value: i8) -> Result<()> {
        self.int(value.into())
    }

    fn int32(&mut self, value: i32) -> Result<()> {
        self.int(value.into())
    }

    fn int64(&mut self, value: i64) -> Result<()> {
        self.int(value)
    }

    fn uint8(&mut self, value: u8) -> Result<()> {
        self.int(value.into())
    }

    fn real32(&mut self, value: f32) -> Result<()> {
        self.formatted(|s| write_real(value, s))
    }

    fn real64(&mut self, value: f64) -> Result<()> {
        self.formatted(|s| write_real(value, s))
    }

    fn string(&mut self, value: &str) -> Result<()> {
        self.quoted(value)
    }

    fn uniform(&mut self, array: &UniformArray) -> Result<()> {
        self.begin_array()?;
        match array {
            UniformArray::Real16(v) => {
                for x in v {
                    self.real32(x.to_f32())?;
                }
            }
            UniformArray::Real32(v) => {
                for &x in v {
                    self.real32(x)?;
                }
            }
            _ => {
                for value in array.to_values() {
                    write_value(self, &value)?;
                }
            }
        }
        self.end_array()
    }

    fn finish(&mut self) -> Result<()> {
        self.raw("\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Write a [`Value`] tree through any [`Writer`].
///
/// Integers use the narrowest width and reals are written as `real64`.
/// Does not call [`Writer::finish`].
///
/// ```
/// use houio::{TextWriter, Value, Writer, read_document, write_value};
///
/// let doc = Value::from(vec![Value::Int(1), Value::from("two")]);
/// let mut writer = TextWriter::new(Vec::new());
/// write_value(&mut writer, &doc).unwrap();
/// writer.finish().unwrap();
/// assert_eq!(read_document(writer.into_inner().as_slice()).unwrap(), doc);
/// ```
pub fn write_value<W: Writer + ?Sized>(writer: &mut W, value: &Value) -> Result<()> {
    match value {
        Value::Null => writer.null(),
        Value::Bool(b) => writer.bool(*b),
        Value::Int(n) => writer.int(*n),
        Value::Real(x) => writer.real64(*x),
        Value::String(s) => writer.string(s),
        Value::Array(Array::Uniform(u)) => writer.uniform(u),
        Value::Array(Array::List(items)) => {
            writer.begin_array()?;
            for item in items {
                write_value(writer, item)?;
            }
            writer.end_array()
        }
        Value::Object(map) => {
            writer.begin_map()?;
            for (k, v) in map {
                writer.key(k)?;
                write_value(writer, v)?;
            }
            writer.end_map()
        }
    }
}
