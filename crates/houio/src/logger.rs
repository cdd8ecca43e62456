//! Human readable event log, one line per parser event.

use std::{fmt::Write as _, io::{Read, Write}};

use crate::{
    error::Result,
    parser::{Event, Parser},
    token::UniformKind,
    value::{UniformArray, write_real},
};

fn kind_name(kind: UniformKind) -> &'static str {
    match kind {
        UniformKind::Bool => "bool",
        UniformKind::Int8 => "int8",
        UniformKind::Int16 => "int16",
        UniformKind::Int32 => "int32",
        UniformKind::Int64 => "int64",
        UniformKind::UInt8 => "uint8",
        UniformKind::UInt16 => "uint16",
        UniformKind::Real16 => "real16",
        UniformKind::Real32 => "real32",
        UniformKind::Real64 => "real64",
        UniformKind::String | UniformKind::StringToken => "string",
    }
}

/// Writes each event on its own line, indented with one tab per nesting level.
///
/// ```
/// use houio::Logger;
///
/// let mut log = Logger::new(Vec::new());
/// log.log_stream(&b"{\"n\": [1]}"[..]).unwrap();
/// let text = String::from_utf8(log.into_inner()).unwrap();
/// assert_eq!(text, "begin map\n\tkey n\n\tbegin array\n\t\tint 1\n\tend array\nend map\n");
/// ```
#[derive(Debug)]
pub struct Logger<W> {
    out: W,
    line: String,
}

impl<W: Write> Logger<W> {
    /// Log to `out`.
    pub fn new(out: W) -> Self {
        Self { out, line: String::new() }
    }

    /// Hand the output back.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Log one event at the given depth.
    pub fn log_event(&mut self, depth: usize, event: &Event) -> Result<()> {
        let line = &mut self.line;
        line.clear();
        line.extend(core::iter::repeat_n('\t', depth));
        // Formatting into a String cannot fail.
        let _ = match event {
            Event::BeginArray => line.write_str("begin array"),
            Event::EndArray => line.write_str("end array"),
            Event::BeginMap => line.write_str("begin map"),
            Event::EndMap => line.write_str("end map"),
            Event::Key(k) => write!(line, "key {k}"),
            Event::Null => line.write_str("null"),
            Event::Bool(b) => write!(line, "bool {b}"),
            Event::Int(n) => write!(line, "int {n}"),
            Event::Real(x) => {
                line.push_str("real ");
                write_real(*x, line)
            }
            Event::String(s) => write!(line, "string {s}"),
            Event::Uniform(u) => write_uniform(line, u),
        };
        line.push('\n');
        self.out.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Parse a whole document, logging every event.
    pub fn log_stream<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut parser = Parser::new(reader);
        while let Some(event) = parser.next() {
            self.log_event(parser.depth(), &event?)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

fn write_uniform(line: &mut String, u: &UniformArray) -> core::fmt::Result {
    write!(line, "uniform {}[{}]", kind_name(u.kind()), u.len())?;
    for i in 0..u.len() {
        line.push(' ');
        if let Some(s) = u.str_at(i) {
            line.push_str(s);
        } else if let Some(b) = u.bool_at(i).filter(|_| matches!(u, UniformArray::Bool(_))) {
            line.push(if b { '1' } else { '0' });
        } else if let Some(n) = u.int_at(i) {
            write!(line, "{n}")?;
        } else if let Some(x) = u.real_at(i) {
            write_real(x, line)?;
        }
    }
    Ok(())
}
