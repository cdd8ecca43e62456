use quickcheck::{Arbitrary, Gen};

use crate::{Map, Value};

/// Any finite `f64`; NaN would never compare equal after a round trip.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct FiniteReal(pub(crate) f64);

impl Arbitrary for FiniteReal {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut value = f64::arbitrary(g);
        while !value.is_finite() {
            value = f64::arbitrary(g);
        }
        Self(value)
    }
}

impl Arbitrary for Value {
    fn arbitrary(g: &mut Gen) -> Self {
        fn scalar(g: &mut Gen) -> Value {
            match usize::arbitrary(g) % 5 {
                0 => Value::Null,
                1 => Value::Bool(bool::arbitrary(g)),
                2 => Value::Int(i64::arbitrary(g)),
                3 => Value::Real(FiniteReal::arbitrary(g).0),
                _ => Value::String(String::arbitrary(g)),
            }
        }

        fn gen_val(g: &mut Gen, depth: usize) -> Value {
            if depth == 0 {
                return scalar(g);
            }
            match usize::arbitrary(g) % 7 {
                0..=4 => scalar(g),
                5 => {
                    let len = usize::arbitrary(g) % 4;
                    Value::from((0..len).map(|_| gen_val(g, depth - 1)).collect::<Vec<_>>())
                }
                _ => {
                    let len = usize::arbitrary(g) % 4;
                    let mut map = Map::new();
                    for _ in 0..len {
                        map.insert(String::arbitrary(g), gen_val(g, depth - 1));
                    }
                    Value::Object(map)
                }
            }
        }

        let depth = usize::arbitrary(g) % 3;
        gen_val(g, depth)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            Value::Array(crate::Array::List(items)) => Box::new(items.clone().into_iter()),
            Value::Object(map) => Box::new(map.clone().into_values()),
            _ => quickcheck::empty_shrinker(),
        }
    }
}
