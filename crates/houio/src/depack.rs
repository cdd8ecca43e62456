//! Reconstruction of dense attribute data from paged, packed storage.
//!
//! Attribute values are stored as a stream of pages. Inside a page the tuple
//! components are split into packs, and each pack is written either once per
//! element or, when flagged constant for that page, once for the whole page.
//! [`depack`] walks that layout and writes every component to its place in a
//! dense `element * tuple_size + component` buffer.
//!
//! ```
//! use houio::depack::{PageLayout, depack};
//!
//! // Three components, packs [1, 2], pack 0 constant on the only page.
//! let layout = PageLayout {
//!     page_size: 1024,
//!     packing: vec![1, 2],
//!     constant_flags: vec![vec![true], vec![false]],
//! };
//! let raw = [9.0_f32, 1.0, 2.0, 3.0, 4.0];
//! let dense = depack("uv", &layout, 3, 2, &raw).unwrap();
//! assert_eq!(dense, vec![9.0, 1.0, 2.0, 9.0, 3.0, 4.0]);
//! ```

use std::borrow::Cow;

use crate::{
    error::{Result, SchemaError},
    value::{Array, UniformArray},
};

/// How an attribute's values are divided into pages and packs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    /// Elements per page; the last page may be shorter.
    pub page_size: usize,
    /// Component count of each pack, in tuple order.
    pub packing: Vec<usize>,
    /// Per pack, per page: whether the pack holds a single value for the page.
    /// A missing or empty list means the pack is never constant.
    pub constant_flags: Vec<Vec<bool>>,
}

impl PageLayout {
    /// One pack spanning the whole tuple, never constant.
    #[must_use]
    pub fn dense(tuple_size: usize, page_size: usize) -> Self {
        Self {
            page_size,
            packing: vec![tuple_size],
            constant_flags: Vec::new(),
        }
    }

    fn is_constant(&self, name: &str, pack: usize, page: usize) -> Result<bool> {
        match self.constant_flags.get(pack) {
            None => Ok(false),
            Some(flags) if flags.is_empty() => Ok(false),
            Some(flags) => flags.get(page).copied().ok_or_else(|| {
                SchemaError::InvalidPageLayout {
                    name: name.to_owned(),
                    reason: "constant page flags end before the last page",
                }
                .into()
            }),
        }
    }

    fn validate(&self, name: &str, tuple_size: usize, element_count: usize) -> Result<()> {
        let invalid = |reason| SchemaError::InvalidPageLayout {
            name: name.to_owned(),
            reason,
        };
        if self.page_size == 0 && element_count > 0 {
            return Err(invalid("page size is zero").into());
        }
        if self.packing.iter().any(|&pack| pack == 0 || pack > tuple_size) {
            return Err(invalid("pack width outside 1..=tuple size").into());
        }
        if self.packing.iter().sum::<usize>() < tuple_size {
            return Err(invalid("packing does not cover the tuple").into());
        }
        Ok(())
    }
}

/// Element types that attribute pages can be depacked into.
pub trait Component: Copy + Default {
    /// Borrow a uniform array of exactly this element type.
    fn borrow_uniform(array: &UniformArray) -> Option<&[Self]>;
    /// Convert element `i` of any array, if it is representable.
    fn convert(array: &Array, i: usize) -> Option<Self>;
}

impl Component for f32 {
    fn borrow_uniform(array: &UniformArray) -> Option<&[Self]> {
        match array {
            UniformArray::Real32(v) => Some(v),
            _ => None,
        }
    }

    #[expect(clippy::cast_possible_truncation)]
    fn convert(array: &Array, i: usize) -> Option<Self> {
        array.real_at(i).map(|x| x as f32)
    }
}

impl Component for f64 {
    fn borrow_uniform(array: &UniformArray) -> Option<&[Self]> {
        match array {
            UniformArray::Real64(v) => Some(v),
            _ => None,
        }
    }

    fn convert(array: &Array, i: usize) -> Option<Self> {
        array.real_at(i)
    }
}

impl Component for i32 {
    fn borrow_uniform(array: &UniformArray) -> Option<&[Self]> {
        match array {
            UniformArray::Int32(v) => Some(v),
            _ => None,
        }
    }

    fn convert(array: &Array, i: usize) -> Option<Self> {
        array.int_at(i).and_then(|n| i32::try_from(n).ok())
    }
}

/// View `array` as a slice of `T`, borrowing when the element type matches.
pub fn components<'a, T: Component>(array: &'a Array, key: &'static str) -> Result<Cow<'a, [T]>> {
    if let Array::Uniform(u) = array {
        if let Some(slice) = T::borrow_uniform(u) {
            return Ok(Cow::Borrowed(slice));
        }
    }
    (0..array.len())
        .map(|i| {
            T::convert(array, i).ok_or(SchemaError::WrongType {
                key,
                expected: "numbers matching the attribute storage",
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Cow::Owned)
        .map_err(Into::into)
}

/// Expand paged, packed `raw` values into `element_count` dense tuples.
///
/// Every source index is bounds-checked; data that ends early is reported
/// as [`SchemaError::PageDataTooShort`] rather than leaving gaps.
pub fn depack<T: Copy + Default>(
    name: &str,
    layout: &PageLayout,
    tuple_size: usize,
    element_count: usize,
    raw: &[T],
) -> Result<Vec<T>> {
    layout.validate(name, tuple_size, element_count)?;
    let too_short = |needed| SchemaError::PageDataTooShort {
        name: name.to_owned(),
        needed,
        len: raw.len(),
    };
    let invalid = |reason| SchemaError::InvalidPageLayout {
        name: name.to_owned(),
        reason,
    };
    let total = element_count
        .checked_mul(tuple_size)
        .ok_or_else(|| invalid("element count overflows"))?;
    if layout.constant_flags.iter().all(Vec::is_empty) && raw.len() < total {
        return Err(too_short(total - 1).into());
    }
    let pages = if element_count == 0 {
        0
    } else {
        element_count.div_ceil(layout.page_size)
    };
    if layout
        .constant_flags
        .iter()
        .any(|flags| !flags.is_empty() && flags.len() < pages)
    {
        return Err(invalid("constant page flags end before the last page").into());
    }

    let mut dense = Vec::new();
    dense
        .try_reserve_exact(total)
        .map_err(|_| invalid("element count too large to allocate"))?;
    dense.resize(total, T::default());
    let mut cursor = 0;
    let mut page = 0;
    let mut page_start = 0;
    while page_start < element_count {
        let count = (element_count - page_start).min(layout.page_size);
        let mut start_component = 0;
        for (pack_index, &pack) in layout.packing.iter().enumerate() {
            let width = pack.min(tuple_size.saturating_sub(start_component));
            if width == 0 {
                break;
            }
            let constant = layout.is_constant(name, pack_index, page)?;
            for i in 0..count {
                let source = if constant { cursor } else { cursor + i * pack };
                let dest = (page_start + i) * tuple_size + start_component;
                let values = raw
                    .get(source..source + width)
                    .ok_or_else(|| too_short(source + width - 1))?;
                dense[dest..dest + width].copy_from_slice(values);
            }
            start_component += pack;
            cursor += if constant { pack } else { count * pack };
        }
        page_start += count;
        page += 1;
    }
    Ok(dense)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    /// Lays out `dense` the way a writer would for the given packing and flags,
    /// storing one value per constant pack and page.
    fn pack(
        dense: &[f32],
        tuple_size: usize,
        page_size: usize,
        packing: &[usize],
        constant: &[bool],
    ) -> Vec<f32> {
        let elements = dense.len() / tuple_size;
        let mut raw = Vec::new();
        let mut page_start = 0;
        while page_start < elements {
            let count = (elements - page_start).min(page_size);
            let mut start = 0;
            for (p, &width) in packing.iter().enumerate() {
                let rows = if constant[p] { 1 } else { count };
                for i in 0..rows {
                    let e = page_start + i;
                    raw.extend_from_slice(&dense[e * tuple_size + start..e * tuple_size + start + width]);
                }
                start += width;
            }
            page_start += count;
        }
        raw
    }

    /// Dense data where every constant pack really is constant within each page.
    #[expect(clippy::cast_precision_loss)]
    fn sample(elements: usize, tuple_size: usize, page_size: usize, packing: &[usize], constant: &[bool]) -> Vec<f32> {
        let mut dense = Vec::with_capacity(elements * tuple_size);
        for e in 0..elements {
            let mut start = 0;
            for (p, &width) in packing.iter().enumerate() {
                for c in 0..width {
                    let row = if constant[p] { (e / page_size) * page_size } else { e };
                    dense.push((row * 10 + start + c) as f32);
                }
                start += width;
            }
        }
        dense
    }

    #[rstest]
    #[case::single_varying_full(&[3], &[false], 8)]
    #[case::single_varying_partial(&[3], &[false], 7)]
    #[case::single_constant_full(&[3], &[true], 8)]
    #[case::single_constant_partial(&[3], &[true], 7)]
    #[case::multi_varying_full(&[1, 2], &[false, false], 8)]
    #[case::multi_varying_partial(&[1, 2], &[false, false], 7)]
    #[case::multi_constant_full(&[1, 2], &[true, false], 8)]
    #[case::multi_constant_partial(&[1, 2], &[true, false], 7)]
    fn depack_matrix(#[case] packing: &[usize], #[case] constant: &[bool], #[case] elements: usize) {
        let (tuple_size, page_size) = (3, 4);
        let dense = sample(elements, tuple_size, page_size, packing, constant);
        let raw = pack(&dense, tuple_size, page_size, packing, constant);
        let pages = elements.div_ceil(page_size);
        let layout = PageLayout {
            page_size,
            packing: packing.to_vec(),
            constant_flags: constant.iter().map(|&c| vec![c; pages]).collect(),
        };
        assert_eq!(depack("attr", &layout, tuple_size, elements, &raw).unwrap(), dense);
    }

    #[test]
    fn trivial_packing_is_a_flat_copy() {
        let raw: Vec<i32> = (0..30).collect();
        let layout = PageLayout::dense(3, 4);
        assert_eq!(depack("n", &layout, 3, 10, &raw).unwrap(), raw);
    }

    #[test]
    fn constant_pack_replicates_across_the_page() {
        let mut raw = vec![42.0_f32];
        for i in 0..10 {
            raw.push(i as f32);
            raw.push(-(i as f32));
        }
        let layout = PageLayout {
            page_size: 1024,
            packing: vec![1, 2],
            constant_flags: vec![vec![true], vec![false]],
        };
        let dense = depack("Cd", &layout, 3, 10, &raw).unwrap();
        for e in 0..10 {
            assert_eq!(dense[e * 3], 42.0);
            assert_eq!(dense[e * 3 + 1], e as f32);
            assert_eq!(dense[e * 3 + 2], -(e as f32));
        }
    }

    #[test]
    fn short_page_data_is_rejected() {
        let layout = PageLayout::dense(3, 1024);
        let err = depack("P", &layout, 3, 4, &[0.0_f32; 11]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Schema(SchemaError::PageDataTooShort { needed: 11, len: 11, .. })
        ));
    }

    #[test]
    fn short_constant_data_is_rejected() {
        let layout = PageLayout {
            page_size: 2,
            packing: vec![1],
            constant_flags: vec![vec![true, true]],
        };
        let err = depack("c", &layout, 1, 4, &[1.0_f32]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Schema(SchemaError::PageDataTooShort { needed: 1, len: 1, .. })
        ));
    }

    #[test]
    fn missing_page_flags_are_a_layout_error() {
        let layout = PageLayout {
            page_size: 2,
            packing: vec![1],
            constant_flags: vec![vec![false]],
        };
        let err = depack("c", &layout, 1, 4, &[1.0_f32; 4]).unwrap_err();
        assert!(matches!(err, crate::Error::Schema(SchemaError::InvalidPageLayout { .. })));
    }

    #[test]
    fn constant_flags_must_cover_every_page() {
        let layout = PageLayout {
            page_size: 1024,
            packing: vec![1],
            constant_flags: vec![vec![true]],
        };
        let err = depack("id", &layout, 1, 1 << 62, &[1_i32]).unwrap_err();
        assert!(matches!(err, crate::Error::Schema(SchemaError::InvalidPageLayout { .. })));
    }

    #[test]
    fn oversized_constant_page_is_not_allocated() {
        let layout = PageLayout {
            page_size: usize::MAX,
            packing: vec![1],
            constant_flags: vec![vec![true]],
        };
        let err = depack("id", &layout, 1, 1 << 62, &[1_i32]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Schema(SchemaError::InvalidPageLayout { reason: "element count too large to allocate", .. })
        ));
    }

    #[test]
    fn packing_must_cover_the_tuple() {
        let layout = PageLayout {
            page_size: 4,
            packing: vec![1, 1],
            constant_flags: Vec::new(),
        };
        assert!(depack("v", &layout, 3, 1, &[0_i32; 3]).is_err());
    }

    #[test]
    fn components_borrow_matching_uniforms() {
        let exact = Array::Uniform(UniformArray::Real32(vec![1.0, 2.0]));
        assert!(matches!(components::<f32>(&exact, "rawpagedata").unwrap(), Cow::Borrowed(_)));
        let narrow = Array::Uniform(UniformArray::Int16(vec![1, -2]));
        assert_eq!(&*components::<i32>(&narrow, "rawpagedata").unwrap(), &[1, -2]);
        let strings = Array::Uniform(UniformArray::String(vec!["a".into()]));
        assert!(components::<f64>(&strings, "rawpagedata").is_err());
    }
}
