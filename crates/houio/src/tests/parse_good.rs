use half::f16;

use crate::{Encoding, Event, Parser, UniformArray, Value, read_document};

const MAGIC: [u8; 5] = [0x7f, 0x4e, 0x53, 0x4a, 0x62];

fn binary(body: &[u8]) -> Vec<u8> {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(body);
    bytes
}

fn events(bytes: &[u8]) -> Vec<Event> {
    Parser::new(bytes).collect::<Result<_, _>>().unwrap()
}

#[test]
fn binary_map_needs_no_separators() {
    let bytes = binary(&[
        0x7b, 0x27, 1, b'a', 0x11, 5, 0x27, 1, b'b', 0x5b, 0x31, 0x30, 0x00, 0x5d, 0x7d,
    ]);
    assert_eq!(
        events(&bytes),
        vec![
            Event::BeginMap,
            Event::Key("a".into()),
            Event::Int(5),
            Event::Key("b".into()),
            Event::BeginArray,
            Event::Bool(true),
            Event::Bool(false),
            Event::Null,
            Event::EndArray,
            Event::EndMap,
        ]
    );
}

#[test]
fn swapped_magic_reads_big_endian() {
    let bytes = [0x7f, 0x62, 0x4a, 0x53, 0x4e, 0x12, 0x01, 0x00];
    let mut parser = Parser::new(&bytes[..]);
    assert_eq!(parser.next().unwrap().unwrap(), Event::Int(256));
    assert_eq!(parser.encoding(), Some(Encoding::Binary));
    assert!(parser.is_complete());
}

#[test]
fn every_scalar_width_widens() {
    let half = f16::from_f32(1.5).to_bits().to_le_bytes();
    let mut body = vec![0x5b, 0x12, 0x00, 0x80, 0x21, 0xff, 0x22, 0xff, 0xff, 0x18];
    body.extend_from_slice(&half);
    body.push(0x19);
    body.extend_from_slice(&0.25_f32.to_le_bytes());
    body.push(0x14);
    body.extend_from_slice(&i64::MIN.to_le_bytes());
    body.push(0x5d);
    assert_eq!(
        events(&binary(&body)),
        vec![
            Event::BeginArray,
            Event::Int(-32768),
            Event::Int(255),
            Event::Int(65535),
            Event::Real(1.5),
            Event::Real(0.25),
            Event::Int(i64::MIN),
            Event::EndArray,
        ]
    );
}

#[test]
fn uniform_array_is_one_event() {
    let mut body = vec![0x5b, 0x40, 0x19, 2];
    body.extend_from_slice(&1.0_f32.to_le_bytes());
    body.extend_from_slice(&(-2.0_f32).to_le_bytes());
    body.push(0x5d);
    assert_eq!(
        events(&binary(&body)),
        vec![
            Event::BeginArray,
            Event::Uniform(UniformArray::Real32(vec![1.0, -2.0])),
            Event::EndArray,
        ]
    );
}

#[test]
fn string_table_references_become_strings() {
    let body = [0x5b, 0x2b, 0, 1, b'k', 0x26, 0, 0x26, 0, 0x5d];
    assert_eq!(
        events(&binary(&body)),
        vec![
            Event::BeginArray,
            Event::String("k".into()),
            Event::String("k".into()),
            Event::EndArray,
        ]
    );
}

#[test]
fn text_comments_and_trailing_commas() {
    let doc = read_document(&b"// header\n[1, 2.0, \"x\",] // done\n"[..]).unwrap();
    assert_eq!(
        doc,
        Value::from(vec![Value::Int(1), Value::Real(2.0), Value::from("x")])
    );
    let map = read_document(&b"{\"a\": null,}"[..]).unwrap();
    assert_eq!(map.as_object().unwrap()["a"], Value::Null);
}

#[test]
fn text_escapes() {
    let doc = read_document(&br#""a\"b\\c\/d\n""#[..]).unwrap();
    assert_eq!(doc, Value::from("a\"b\\c/d\n"));
}

#[test]
fn text_non_finite_reals() {
    let doc = read_document(&b"[nan, -INF, 1.#IND]"[..]).unwrap();
    let list = doc.as_array().unwrap();
    assert!(list.real_at(0).unwrap().is_nan());
    assert_eq!(list.real_at(1), Some(f64::NEG_INFINITY));
    assert!(list.real_at(2).unwrap().is_nan());
}

#[test]
fn depth_pairs_begin_and_end() {
    let mut parser = Parser::new(&b"{\"a\": [1]}"[..]);
    let mut depths = Vec::new();
    while let Some(event) = parser.next() {
        event.unwrap();
        depths.push(parser.depth());
    }
    assert_eq!(depths, vec![0, 1, 1, 2, 1, 0]);
}

#[test]
fn trailing_bytes_after_the_document_are_ignored() {
    let doc = read_document(&b"[1] garbage"[..]).unwrap();
    assert_eq!(doc, Value::from(vec![Value::Int(1)]));
}
