//! Folding parser events into a [`Value`] tree.

use std::io::Read;

use crate::{
    error::{DecodeError, Error, Result},
    parser::{Event, Parser},
    value::{Array, Map, Value},
};

#[derive(Debug)]
enum Frame {
    Array(Vec<Value>),
    Map { map: Map, key: Option<String> },
}

/// Builds an in-memory document from a stream of [`Event`]s.
///
/// Uniform events become [`Array::Uniform`] nodes directly, without
/// boxing their elements.
///
/// ```
/// use houio::{DocumentBuilder, Event, Value};
///
/// let mut builder = DocumentBuilder::new();
/// for event in [Event::BeginArray, Event::Int(1), Event::String("x".into()), Event::EndArray] {
///     builder.push_event(event);
/// }
/// assert_eq!(builder.finish(), Some(Value::from(vec![Value::Int(1), Value::from("x")])));
/// ```
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    stack: Vec<Frame>,
    root: Option<Value>,
}

impl DocumentBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event.
    ///
    /// Events are expected in the order a [`Parser`] produces them. An end
    /// event without an open container, or a value in key position, is
    /// ignored.
    pub fn push_event(&mut self, event: Event) {
        match event {
            Event::BeginArray => self.stack.push(Frame::Array(Vec::new())),
            Event::BeginMap => self.stack.push(Frame::Map { map: Map::new(), key: None }),
            Event::EndArray | Event::EndMap => {
                let finished = match self.stack.pop() {
                    Some(Frame::Array(items)) => Value::Array(Array::List(items)),
                    Some(Frame::Map { map, .. }) => Value::Object(map),
                    None => return,
                };
                self.attach(finished);
            }
            Event::Key(k) => {
                if let Some(Frame::Map { key, .. }) = self.stack.last_mut() {
                    *key = Some(k);
                }
            }
            Event::Null => self.attach(Value::Null),
            Event::Bool(b) => self.attach(Value::Bool(b)),
            Event::Int(n) => self.attach(Value::Int(n)),
            Event::Real(x) => self.attach(Value::Real(x)),
            Event::String(s) => self.attach(Value::String(s)),
            Event::Uniform(u) => self.attach(Value::Array(Array::Uniform(u))),
        }
    }

    fn attach(&mut self, value: Value) {
        match self.stack.last_mut() {
            Some(Frame::Array(items)) => items.push(value),
            Some(Frame::Map { map, key }) => {
                if let Some(k) = key.take() {
                    map.insert(k, value);
                }
            }
            None => self.root = Some(value),
        }
    }

    /// Returns `true` while a container is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.stack.is_empty()
    }

    /// The finished document, if a complete top-level value was seen.
    #[must_use]
    pub fn finish(self) -> Option<Value> {
        if self.is_open() { None } else { self.root }
    }
}

/// Parse a whole binary or text document into a [`Value`].
///
/// ```
/// use houio::{Value, read_document};
///
/// let doc = read_document(&b"[\"pointcount\", 3]"[..]).unwrap();
/// assert_eq!(doc.as_array().and_then(|a| a.int_at(1)), Some(3));
/// ```
pub fn read_document<R: Read>(reader: R) -> Result<Value> {
    let mut parser = Parser::new(reader);
    let builder = parser.by_ref().try_fold(DocumentBuilder::new(), |mut builder, event| {
        builder.push_event(event?);
        Ok::<_, Error>(builder)
    })?;
    builder
        .finish()
        .ok_or_else(|| Error::decode(parser.offset(), DecodeError::UnexpectedEndOfInput))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::UniformArray;

    #[test]
    fn nested_maps_and_arrays() {
        let doc = read_document(&br#"{"a": {"b": [1, [true, null]]}, "c": "d"}"#[..]).unwrap();
        let top = doc.as_object().unwrap();
        assert_eq!(top["c"], Value::from("d"));
        let b = top["a"].as_object().unwrap()["b"].as_array().unwrap();
        assert_eq!(b.int_at(0), Some(1));
        assert_eq!(
            b.array_at(1).and_then(Array::as_list),
            Some(&[Value::Bool(true), Value::Null][..])
        );
    }

    #[test]
    fn uniform_events_stay_dense() {
        let mut builder = DocumentBuilder::new();
        builder.push_event(Event::BeginArray);
        builder.push_event(Event::Uniform(UniformArray::Int32(vec![4, 5, 6])));
        assert!(builder.is_open());
        builder.push_event(Event::EndArray);
        let doc = builder.finish().unwrap();
        let inner = doc.as_array().unwrap().as_list().unwrap();
        assert!(inner[0].as_array().unwrap().is_uniform());
    }

    #[test]
    fn unclosed_document_has_no_result() {
        let mut builder = DocumentBuilder::new();
        builder.push_event(Event::BeginMap);
        builder.push_event(Event::Key("k".into()));
        assert_eq!(builder.finish(), None);
    }

    #[test]
    fn stray_end_is_ignored() {
        let mut builder = DocumentBuilder::new();
        builder.push_event(Event::EndMap);
        builder.push_event(Event::Int(3));
        assert_eq!(builder.finish(), Some(Value::Int(3)));
    }
}
