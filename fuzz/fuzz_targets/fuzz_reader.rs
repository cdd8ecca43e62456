#![no_main]
use std::{cell::RefCell, io::Read};

use arbitrary::Arbitrary;
use houio::{
    BinaryWriter, Geo, Logger, Map, Parser, TextWriter, Value, Writer, WriterOptions, write_value,
};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

const HEADER: usize = 5; // 1 flag + 4-byte seed

thread_local! {
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

/// Keys the schema loader looks for, so generated documents reach past the
/// top level.
static KEYS: &[&str] = &[
    "pointcount",
    "vertexcount",
    "primitivecount",
    "topology",
    "pointref",
    "indices",
    "attributes",
    "pointattributes",
    "primitiveattributes",
    "name",
    "type",
    "numeric",
    "string",
    "size",
    "storage",
    "fpreal32",
    "int32",
    "values",
    "pagesize",
    "packing",
    "constantpageflags",
    "rawpagedata",
    "primitives",
    "Volume",
    "Poly",
    "run",
    "runtype",
    "vertex",
    "res",
    "voxels",
    "tiledarray",
    "tiles",
    "compression",
    "data",
];

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        let flags = with_rng(|rng| rng.next_u32() as u8 & 0x1F);
        data[0] = flags;
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let limit = max_size - HEADER;
        HEADER + append_document(&mut data[HEADER..], flags, size.max(HEADER + 1), limit)
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

/// Serialize a random document in the encoding picked by `flags`.
fn append_document(data: &mut [u8], flags: u8, size: usize, limit: usize) -> usize {
    let value = loop {
        let s = with_rng(|rng| rng.random_range(size / 2..size * 2).min(limit));
        let bytes: Vec<u8> = with_rng(|rng| (0..s).map(|_| rng.random::<u8>()).collect());
        if let Ok(value) = ArbitraryValue::arbitrary(&mut arbitrary::Unstructured::new(&bytes)) {
            break value;
        }
    };

    let serialized = match flags & 0x18 {
        0 => serialize(TextWriter::new(Vec::new()), &value.0),
        0x08 => BinaryWriter::new(Vec::new()).and_then(|w| serialize(w, &value.0)),
        _ => BinaryWriter::with_options(Vec::new(), WriterOptions { use_tokens: true })
            .and_then(|w| serialize(w, &value.0)),
    }
    .expect("writing to a Vec never fails");

    let len = serialized.len().min(limit);
    data[..len].copy_from_slice(&serialized[..len]);
    len
}

fn serialize<W: Writer + IntoBytes>(mut writer: W, value: &Value) -> houio::Result<Vec<u8>> {
    write_value(&mut writer, value)?;
    writer.finish()?;
    Ok(writer.into_bytes())
}

trait IntoBytes {
    fn into_bytes(self) -> Vec<u8>;
}

impl IntoBytes for TextWriter<Vec<u8>> {
    fn into_bytes(self) -> Vec<u8> {
        self.into_inner()
    }
}

impl IntoBytes for BinaryWriter<Vec<u8>> {
    fn into_bytes(self) -> Vec<u8> {
        self.into_inner()
    }
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

#[derive(Debug)]
struct ArbitraryValue(Value);

impl<'a> Arbitrary<'a> for ArbitraryValue {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let value = match u.choose_index(24)? {
            0 => Value::Null,
            1 => Value::Bool(u.arbitrary()?),
            2..=4 => Value::Int(u.arbitrary()?),
            5 => Value::Real(u.arbitrary()?),
            6..=8 => Value::String((*u.choose(KEYS)?).to_owned()),
            9..=10 => Value::String(u.arbitrary()?),
            11..=15 => {
                let elems: Vec<ArbitraryValue> = u.arbitrary()?;
                Value::from(elems.into_iter().map(|v| v.0).collect::<Vec<_>>())
            }
            16..=23 => {
                let m: Vec<(usize, ArbitraryValue)> = u.arbitrary()?;
                let map: Map = m
                    .into_iter()
                    .map(|(k, v)| (KEYS[k % KEYS.len()].to_owned(), v.0))
                    .collect();
                Value::Object(map)
            }
            _ => Err(arbitrary::Error::IncorrectFormat)?,
        };
        Ok(ArbitraryValue(value))
    }
}

/// A reader that hands out at most `step` bytes per call, so token payloads
/// straddle read boundaries.
struct ChunkedReader<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for ChunkedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        let (head, tail) = self.data.split_at(n);
        buf[..n].copy_from_slice(head);
        self.data = tail;
        Ok(n)
    }
}

fn reader(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let split_seed = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
    let data = &data[HEADER..];
    let step = (split_seed as usize % 64) + 1;
    let input = || ChunkedReader { data, step };

    // Errors are expected; panics are not.
    if flags & 1 != 0 {
        let _ = Geo::read(input());
    }
    if flags & 2 != 0 {
        let mut logger = Logger::new(std::io::sink());
        let _ = logger.log_stream(input());
    }
    if flags & 4 != 0 {
        for event in Parser::new(input()) {
            if event.is_err() {
                break;
            }
        }
    }
    if flags & 7 == 0 {
        let _ = houio::read_document(input());
    }
}

fuzz_target!(|data: &[u8]| reader(data));
