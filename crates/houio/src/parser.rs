//! Grammar-checking pull parser.
//!
//! [`Parser`] turns the token stream into structural and value [`Event`]s.
//! It tracks a stack of container states so that arrays alternate between
//! values and separators and maps alternate between keys and values. Binary
//! documents carry no separators, so in binary mode the parser advances over
//! the separator positions on its own; text documents must spell them out.
//!
//! # Examples
//!
//! ```
//! use houio::{Event, Parser};
//!
//! let events: Vec<Event> = Parser::new(&b"{\"a\": [1, 2.5]}"[..])
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(
//!     events,
//!     vec![
//!         Event::BeginMap,
//!         Event::Key("a".into()),
//!         Event::BeginArray,
//!         Event::Int(1),
//!         Event::Real(2.5),
//!         Event::EndArray,
//!         Event::EndMap,
//!     ]
//! );
//! ```

use std::io::Read;

use crate::{
    error::{DecodeError, Error, Result},
    token::Token,
    tokenizer::{Encoding, Tokenizer},
    value::UniformArray,
};

/// A structural or value event, in document order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `[`.
    BeginArray,
    /// `]`.
    EndArray,
    /// `{`.
    BeginMap,
    /// `}`.
    EndMap,
    /// A map key. The next value event belongs to it.
    Key(String),
    /// `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// Any integer, widened.
    Int(i64),
    /// Any real, widened.
    Real(f64),
    /// A string value.
    String(String),
    /// A complete uniform array, read in bulk.
    Uniform(UniformArray),
}

/// Deepest container nesting the parser accepts.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Start,
    Complete,
    MapStart,
    MapSeparator,
    MapNeedValue,
    MapGotValue,
    MapNeedKey,
    ArrayStart,
    ArrayNeedValue,
    ArrayGotValue,
    Error,
}

/// Pull parser yielding [`Event`]s from a binary or text stream.
///
/// The iterator ends after the outermost value is closed. Any error is
/// yielded once and ends iteration.
#[derive(Debug)]
pub struct Parser<R> {
    tokenizer: Tokenizer<R>,
    state: ParseState,
    stack: Vec<ParseState>,
    depth: usize,
}

impl<R: Read> Parser<R> {
    /// Create a parser over a stream.
    pub fn new(inner: R) -> Self {
        Self::from_tokenizer(Tokenizer::new(inner))
    }

    /// Create a parser over an existing tokenizer.
    pub fn from_tokenizer(tokenizer: Tokenizer<R>) -> Self {
        Self {
            tokenizer,
            state: ParseState::Start,
            stack: Vec::new(),
            depth: 0,
        }
    }

    /// Nesting depth of the most recently yielded event.
    ///
    /// Begin and end events report the depth of the container they open or
    /// close, so matching pairs share a depth; keys and values report the
    /// depth of their contents.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Detected encoding, once the first token has been read.
    pub fn encoding(&self) -> Option<Encoding> {
        self.tokenizer.encoding()
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.tokenizer.offset()
    }

    /// Returns `true` once the outermost value has been closed.
    pub fn is_complete(&self) -> bool {
        self.state == ParseState::Complete
    }

    /// Hand the underlying stream back to the caller.
    pub fn into_inner(self) -> R {
        self.tokenizer.into_inner()
    }

    fn set_state(&mut self, state: ParseState) {
        self.state = if self.tokenizer.is_binary() {
            match state {
                ParseState::ArrayGotValue => ParseState::ArrayNeedValue,
                ParseState::MapSeparator => ParseState::MapNeedValue,
                ParseState::MapGotValue => ParseState::MapNeedKey,
                other => other,
            }
        } else {
            state
        };
    }

    fn push(&mut self, next: ParseState, at: u64) -> Result<()> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(Error::decode(at, DecodeError::NestingTooDeep(MAX_DEPTH)));
        }
        self.stack.push(self.state);
        self.state = next;
        Ok(())
    }

    fn pop(&mut self) {
        match self.stack.pop() {
            Some(parent) => {
                self.state = parent;
                self.got_value();
            }
            None => self.state = ParseState::Complete,
        }
        self.depth = self.stack.len();
    }

    fn got_value(&mut self) {
        let next = match self.state {
            ParseState::Start => ParseState::Complete,
            ParseState::ArrayStart | ParseState::ArrayNeedValue => ParseState::ArrayGotValue,
            ParseState::MapNeedValue => ParseState::MapGotValue,
            other => other,
        };
        self.set_state(next);
    }

    fn step(&mut self) -> Result<Option<Event>> {
        loop {
            if self.state == ParseState::Complete {
                return Ok(None);
            }
            let at = self.tokenizer.offset();
            let Some(token) = self.tokenizer.next_token()? else {
                return Err(Error::decode(self.tokenizer.offset(), DecodeError::UnexpectedEndOfInput));
            };
            self.depth = self.stack.len();
            let found = token.describe();
            let unexpected = |expected| Error::decode(at, DecodeError::UnexpectedToken { found, expected });

            match self.state {
                ParseState::Start
                | ParseState::ArrayStart
                | ParseState::ArrayNeedValue
                | ParseState::MapNeedValue => {
                    let event = match token {
                        Token::ArrayBegin => {
                            self.push(ParseState::ArrayStart, at)?;
                            return Ok(Some(Event::BeginArray));
                        }
                        Token::MapBegin => {
                            self.push(ParseState::MapStart, at)?;
                            return Ok(Some(Event::BeginMap));
                        }
                        Token::ArrayEnd
                            if matches!(self.state, ParseState::ArrayStart | ParseState::ArrayNeedValue) =>
                        {
                            self.pop();
                            return Ok(Some(Event::EndArray));
                        }
                        Token::ArrayEnd | Token::MapEnd | Token::KeySeparator | Token::ValueSeparator => {
                            return Err(unexpected("expecting a value"));
                        }
                        Token::UniformArray { kind, len } => Event::Uniform(self.tokenizer.read_uniform(kind, len)?),
                        Token::Null => Event::Null,
                        Token::Bool(b) => Event::Bool(b),
                        Token::Int8(n) => Event::Int(n.into()),
                        Token::Int16(n) => Event::Int(n.into()),
                        Token::Int32(n) => Event::Int(n.into()),
                        Token::Int64(n) => Event::Int(n),
                        Token::UInt8(n) => Event::Int(n.into()),
                        Token::UInt16(n) => Event::Int(n.into()),
                        Token::Real16(x) => Event::Real(x.into()),
                        Token::Real32(x) => Event::Real(x.into()),
                        Token::Real64(x) => Event::Real(x),
                        Token::String(s) => Event::String(s),
                    };
                    self.got_value();
                    return Ok(Some(event));
                }
                ParseState::MapStart | ParseState::MapNeedKey => match token {
                    Token::String(key) => {
                        self.set_state(ParseState::MapSeparator);
                        return Ok(Some(Event::Key(key)));
                    }
                    Token::MapEnd => {
                        self.pop();
                        return Ok(Some(Event::EndMap));
                    }
                    _ => return Err(unexpected("expecting a map key")),
                },
                ParseState::MapSeparator => match token {
                    Token::KeySeparator => self.state = ParseState::MapNeedValue,
                    _ => return Err(unexpected("expecting ':'")),
                },
                ParseState::MapGotValue => match token {
                    Token::ValueSeparator => self.state = ParseState::MapNeedKey,
                    Token::MapEnd => {
                        self.pop();
                        return Ok(Some(Event::EndMap));
                    }
                    _ => return Err(unexpected("expecting ',' or '}'")),
                },
                ParseState::ArrayGotValue => match token {
                    Token::ValueSeparator => self.state = ParseState::ArrayNeedValue,
                    Token::ArrayEnd => {
                        self.pop();
                        return Ok(Some(Event::EndArray));
                    }
                    _ => return Err(unexpected("expecting ',' or ']'")),
                },
                ParseState::Complete | ParseState::Error => return Ok(None),
            }
        }
    }
}

impl<R: Read> Iterator for Parser<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, ParseState::Complete | ParseState::Error) {
            return None;
        }
        match self.step() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(err) => {
                self.state = ParseState::Error;
                Some(Err(err))
            }
        }
    }
}
