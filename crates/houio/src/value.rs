//! Document tree values.
//!
//! This module defines [`Value`], the order-preserving tree produced by the
//! [`DocumentBuilder`](crate::DocumentBuilder), and [`UniformArray`], the
//! densely typed buffer used for bulk numeric payloads. An [`Array`] holds
//! either boxed values or one uniform buffer, never both.
//!
//! # Examples
//!
//! ```
//! use houio::{Array, UniformArray, Value};
//!
//! let dense = Value::Array(Array::Uniform(UniformArray::Real32(vec![1.0, 2.5])));
//! let list = dense.as_array().unwrap();
//! assert_eq!(list.len(), 2);
//! assert_eq!(list.real_at(1), Some(2.5));
//! assert_eq!(dense.to_string(), "[1.0,2.5]");
//! ```
use core::fmt::{self, Write as _};
use std::collections::BTreeMap;

use half::f16;

use crate::token::UniformKind;

/// Object storage. Keys are unique; iteration order is by key.
pub type Map = BTreeMap<String, Value>;

/// A node of the document tree.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// `null`.
    #[default]
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// Any integer token, widened.
    Int(i64),
    /// Any real token, widened.
    Real(f64),
    /// A string.
    String(String),
    /// An ordered array.
    Array(Array),
    /// A key/value map.
    Object(Map),
}

/// An array node: boxed values or one dense typed buffer.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum Array {
    /// Element-by-element values.
    List(Vec<Value>),
    /// A bulk array read in one piece.
    Uniform(UniformArray),
}

/// A densely typed bulk array.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum UniformArray {
    /// Booleans decoded from the bit stream.
    Bool(Vec<bool>),
    /// `i8` elements.
    Int8(Vec<i8>),
    /// `i16` elements.
    Int16(Vec<i16>),
    /// `i32` elements.
    Int32(Vec<i32>),
    /// `i64` elements.
    Int64(Vec<i64>),
    /// `u8` elements.
    UInt8(Vec<u8>),
    /// `u16` elements.
    UInt16(Vec<u16>),
    /// Half precision elements.
    Real16(Vec<f16>),
    /// `f32` elements.
    Real32(Vec<f32>),
    /// `f64` elements.
    Real64(Vec<f64>),
    /// Strings, either inline or resolved from string table ids.
    String(Vec<String>),
}

macro_rules! uniform_dispatch {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            UniformArray::Bool($v) => $body,
            UniformArray::Int8($v) => $body,
            UniformArray::Int16($v) => $body,
            UniformArray::Int32($v) => $body,
            UniformArray::Int64($v) => $body,
            UniformArray::UInt8($v) => $body,
            UniformArray::UInt16($v) => $body,
            UniformArray::Real16($v) => $body,
            UniformArray::Real32($v) => $body,
            UniformArray::Real64($v) => $body,
            UniformArray::String($v) => $body,
        }
    };
}

impl UniformArray {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        uniform_dispatch!(self, v => v.len())
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element kind used when writing this array.
    #[must_use]
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Bool(_) => UniformKind::Bool,
            Self::Int8(_) => UniformKind::Int8,
            Self::Int16(_) => UniformKind::Int16,
            Self::Int32(_) => UniformKind::Int32,
            Self::Int64(_) => UniformKind::Int64,
            Self::UInt8(_) => UniformKind::UInt8,
            Self::UInt16(_) => UniformKind::UInt16,
            Self::Real16(_) => UniformKind::Real16,
            Self::Real32(_) => UniformKind::Real32,
            Self::Real64(_) => UniformKind::Real64,
            Self::String(_) => UniformKind::String,
        }
    }

    /// Element `i` widened to `i64`, if it is an integer.
    #[must_use]
    pub fn int_at(&self, i: usize) -> Option<i64> {
        match self {
            Self::Int8(v) => v.get(i).map(|&x| i64::from(x)),
            Self::Int16(v) => v.get(i).map(|&x| i64::from(x)),
            Self::Int32(v) => v.get(i).map(|&x| i64::from(x)),
            Self::Int64(v) => v.get(i).copied(),
            Self::UInt8(v) => v.get(i).map(|&x| i64::from(x)),
            Self::UInt16(v) => v.get(i).map(|&x| i64::from(x)),
            _ => None,
        }
    }

    /// Element `i` widened to `f64`, if it is numeric.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn real_at(&self, i: usize) -> Option<f64> {
        match self {
            Self::Real16(v) => v.get(i).map(|x| x.to_f64()),
            Self::Real32(v) => v.get(i).map(|&x| f64::from(x)),
            Self::Real64(v) => v.get(i).copied(),
            _ => self.int_at(i).map(|x| x as f64),
        }
    }

    /// Element `i` as a boolean. Integers are true when non-zero.
    #[must_use]
    pub fn bool_at(&self, i: usize) -> Option<bool> {
        match self {
            Self::Bool(v) => v.get(i).copied(),
            _ => self.int_at(i).map(|x| x != 0),
        }
    }

    /// Element `i` as a string slice.
    #[must_use]
    pub fn str_at(&self, i: usize) -> Option<&str> {
        match self {
            Self::String(v) => v.get(i).map(String::as_str),
            _ => None,
        }
    }

    /// Element `i` boxed as a [`Value`].
    #[must_use]
    pub fn get(&self, i: usize) -> Option<Value> {
        match self {
            Self::Bool(v) => v.get(i).map(|&b| Value::Bool(b)),
            Self::String(v) => v.get(i).map(|s| Value::String(s.clone())),
            Self::Real16(_) | Self::Real32(_) | Self::Real64(_) => self.real_at(i).map(Value::Real),
            _ => self.int_at(i).map(Value::Int),
        }
    }

    /// Expand into boxed values.
    #[must_use]
    pub fn to_values(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }
}

impl Array {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::List(v) => v.len(),
            Self::Uniform(u) => u.len(),
        }
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` for a dense bulk array.
    #[must_use]
    pub fn is_uniform(&self) -> bool {
        matches!(self, Self::Uniform(_))
    }

    /// The boxed elements, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            Self::Uniform(_) => None,
        }
    }

    /// Element `i` widened to `i64`.
    #[must_use]
    pub fn int_at(&self, i: usize) -> Option<i64> {
        match self {
            Self::List(v) => v.get(i).and_then(Value::as_int),
            Self::Uniform(u) => u.int_at(i),
        }
    }

    /// Element `i` widened to `f64`.
    #[must_use]
    pub fn real_at(&self, i: usize) -> Option<f64> {
        match self {
            Self::List(v) => v.get(i).and_then(Value::as_real),
            Self::Uniform(u) => u.real_at(i),
        }
    }

    /// Element `i` as a boolean.
    #[must_use]
    pub fn bool_at(&self, i: usize) -> Option<bool> {
        match self {
            Self::List(v) => v.get(i).and_then(|v| match v {
                Value::Bool(b) => Some(*b),
                Value::Int(n) => Some(*n != 0),
                _ => None,
            }),
            Self::Uniform(u) => u.bool_at(i),
        }
    }

    /// Element `i` as a string slice.
    #[must_use]
    pub fn str_at(&self, i: usize) -> Option<&str> {
        match self {
            Self::List(v) => v.get(i).and_then(Value::as_str),
            Self::Uniform(u) => u.str_at(i),
        }
    }

    /// Element `i` as a nested array. Uniform arrays have none.
    #[must_use]
    pub fn array_at(&self, i: usize) -> Option<&Array> {
        self.as_list()?.get(i).and_then(Value::as_array)
    }
}

impl From<Vec<Value>> for Array {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<UniformArray> for Array {
    fn from(v: UniformArray) -> Self {
        Self::Uniform(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(Array::List(v))
    }
}

impl From<UniformArray> for Value {
    fn from(v: UniformArray) -> Self {
        Self::Array(Array::Uniform(v))
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Self::Object(v)
    }
}

impl Value {
    /// Returns `true` if the value is [`Null`].
    ///
    /// [`Null`]: Value::Null
    ///
    /// # Examples
    ///
    /// ```
    /// use houio::Value;
    ///
    /// assert!(Value::Null.is_null());
    /// assert!(!Value::Bool(false).is_null());
    /// ```
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if the value is a [`String`].
    ///
    /// [`String`]: Value::String
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(..))
    }

    /// Returns `true` if the value is an [`Array`](Value::Array).
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(..))
    }

    /// Returns `true` if the value is an [`Object`](Value::Object).
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(..))
    }

    /// The boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer payload.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The numeric payload widened to `f64`; integers convert.
    ///
    /// ```
    /// use houio::Value;
    ///
    /// assert_eq!(Value::Int(3).as_real(), Some(3.0));
    /// assert_eq!(Value::Real(0.5).as_real(), Some(0.5));
    /// assert_eq!(Value::Null.as_real(), None);
    /// ```
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(x) => Some(*x),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// The string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The array payload.
    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The object payload.
    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }
}

/// Writes `src` with the text encoding's escapes, without surrounding quotes.
///
/// Control characters without a short escape are written as-is, since the
/// reader does not accept `\u` escapes.
pub(crate) fn write_escaped_string<W: fmt::Write>(src: &str, f: &mut W) -> fmt::Result {
    for c in src.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\u{8}' => f.write_str("\\b")?,
            '\u{c}' => f.write_str("\\f")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            _ => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Writes a real so that reading it back yields a real, not an integer.
pub(crate) fn write_real<T, W>(value: T, f: &mut W) -> fmt::Result
where
    T: Copy + Into<f64> + fmt::Display,
    W: fmt::Write,
{
    let wide: f64 = value.into();
    if wide.is_nan() {
        return f.write_str("nan");
    }
    if wide.is_infinite() {
        return f.write_str(if wide > 0.0 { "inf" } else { "-inf" });
    }
    let text = value.to_string();
    f.write_str(&text)?;
    if !text.contains(['.', 'e']) {
        f.write_str(".0")?;
    }
    Ok(())
}

impl fmt::Display for UniformArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        for i in 0..self.len() {
            if i > 0 {
                f.write_char(',')?;
            }
            if let Some(v) = self.get(i) {
                write!(f, "{v}")?;
            }
        }
        f.write_char(']')
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            Value::Int(n) => write!(f, "{n}"),
            Value::Real(x) => write_real(*x, f),
            Value::String(s) => {
                f.write_char('"')?;
                write_escaped_string(s, f)?;
                f.write_char('"')
            }
            Value::Array(Array::Uniform(u)) => write!(f, "{u}"),
            Value::Array(Array::List(arr)) => {
                f.write_char('[')?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_char(']')
            }
            Value::Object(map) => {
                f.write_char('{')?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    f.write_char('"')?;
                    write_escaped_string(k, f)?;
                    write!(f, "\":{v}")?;
                }
                f.write_char('}')
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_valid_text_encoding() {
        let mut map = Map::new();
        map.insert("k\n".into(), Value::Real(2.0));
        let v = Value::from(vec![Value::Null, Value::Int(-3), Value::from("a\"b"), Value::Object(map)]);
        assert_eq!(v.to_string(), r#"[null,-3,"a\"b",{"k\n":2.0}]"#);
    }

    #[test]
    fn control_characters_without_short_escape_stay_raw() {
        let mut out = String::new();
        write_escaped_string("\u{1}\u{8}/", &mut out).unwrap();
        assert_eq!(out, "\u{1}\\b/");
    }

    #[test]
    fn reals_keep_a_fraction_marker() {
        let mut out = String::new();
        for x in [1.0, -0.5, 1e300, f64::NAN, f64::NEG_INFINITY] {
            write_real(x, &mut out).unwrap();
            out.push(' ');
        }
        assert!(out.starts_with("1.0 -0.5 1"));
        assert!(out.ends_with(".0 nan -inf "));
    }

    #[test]
    fn uniform_accessors_widen() {
        let u = UniformArray::Int16(vec![-2, 7]);
        assert_eq!(u.int_at(0), Some(-2));
        assert_eq!(u.real_at(1), Some(7.0));
        assert_eq!(u.bool_at(1), Some(true));
        assert_eq!(u.str_at(0), None);
        assert_eq!(u.get(2), None);
        let h = UniformArray::Real16(vec![f16::from_f32(0.25)]);
        assert_eq!(h.real_at(0), Some(0.25));
    }
}
