use quickcheck::QuickCheck;

use crate::{
    BinaryWriter, IntWidth, TextWriter, Value, Writer, WriterOptions,
    depack::{PageLayout, depack},
    read_document, write_value,
};

fn tests() -> u64 {
    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;
    tests
}

fn binary(value: &Value, use_tokens: bool) -> Vec<u8> {
    let mut writer = BinaryWriter::with_options(Vec::new(), WriterOptions { use_tokens }).unwrap();
    write_value(&mut writer, value).unwrap();
    writer.finish().unwrap();
    writer.into_inner()
}

fn text(value: &Value) -> Vec<u8> {
    let mut writer = TextWriter::new(Vec::new());
    write_value(&mut writer, value).unwrap();
    writer.finish().unwrap();
    writer.into_inner()
}

/// Property: a value tree read back from either encoding equals the original.
#[test]
fn value_round_trip_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, use_tokens: bool) -> bool {
        read_document(&binary(&value, use_tokens)[..]).ok() == Some(value.clone())
            && read_document(&text(&value)[..]).ok() == Some(value)
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Value, bool) -> bool);
}

/// Property: the tag chosen for an integer is the narrowest that holds it,
/// and the value survives.
#[test]
fn integer_width_quickcheck() {
    fn prop(n: i64) -> bool {
        let bytes = binary(&Value::Int(n), false);
        let expected_tag = match IntWidth::of(n) {
            IntWidth::W8 => 0x11,
            IntWidth::W16 => 0x12,
            IntWidth::W32 => 0x13,
            IntWidth::W64 => 0x14,
        };
        let narrower_fails = match IntWidth::of(n) {
            IntWidth::W8 => true,
            IntWidth::W16 => i8::try_from(n).is_err(),
            IntWidth::W32 => i16::try_from(n).is_err(),
            IntWidth::W64 => i32::try_from(n).is_err(),
        };
        bytes[5] == expected_tag && narrower_fails && read_document(&bytes[..]).ok() == Some(Value::Int(n))
    }

    QuickCheck::new().tests(tests()).quickcheck(prop as fn(i64) -> bool);
}

/// Property: with one full-width pack that is never constant, depacking over
/// any page size is a flat copy.
#[test]
fn trivial_depack_is_identity_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(values: Vec<i32>, tuple_size: u8, page_size: u8) -> bool {
        let tuple_size = usize::from(tuple_size % 4) + 1;
        let page_size = usize::from(page_size % 16) + 1;
        let elements = values.len() / tuple_size;
        let flat = &values[..elements * tuple_size];
        let layout = PageLayout::dense(tuple_size, page_size);
        depack("q", &layout, tuple_size, elements, flat).ok().as_deref() == Some(flat)
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Vec<i32>, u8, u8) -> bool);
}
