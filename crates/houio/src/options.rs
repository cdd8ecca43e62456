/// Configuration for the [`BinaryWriter`](crate::BinaryWriter).
///
/// # Examples
///
/// ```rust
/// use houio::{BinaryWriter, Writer, WriterOptions};
///
/// let options = WriterOptions { use_tokens: true };
/// let mut writer = BinaryWriter::with_options(Vec::new(), options).unwrap();
/// writer.string("P").unwrap();
/// writer.string("P").unwrap();
/// let bytes = writer.into_inner();
/// // magic, then TOKENDEF 0 "P" + TOKENREF 0, then TOKENREF 0 again
/// assert_eq!(&bytes[5..], &[0x2b, 0, 1, b'P', 0x26, 0, 0x26, 0]);
/// ```
///
/// # Default
///
/// All options default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterOptions {
    /// Whether strings and keys go through the binary string table.
    ///
    /// The first occurrence of a string emits a definition followed by a
    /// reference; later occurrences emit only the reference.
    ///
    /// # Default
    ///
    /// `false`
    pub use_tokens: bool,
}

/// Output encoding of a saved geometry file.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// `.bgeo`: the tagged binary encoding.
    #[default]
    Binary,
    /// `.geo`: the indented text encoding.
    Text,
}

/// Configuration for [`Geo::save`](crate::Geo::save).
///
/// # Default
///
/// Binary output, pages of 1024 elements, no string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Output encoding.
    ///
    /// # Default
    ///
    /// [`Format::Binary`]
    pub format: Format,

    /// Page size declared for attribute data.
    ///
    /// Values are still written as one flat page stream; the page size only
    /// tells readers how the stream is divided.
    ///
    /// # Default
    ///
    /// `1024`
    pub page_size: usize,

    /// Forwarded to [`WriterOptions::use_tokens`] for binary output.
    ///
    /// # Default
    ///
    /// `false`
    pub use_tokens: bool,
}

/// Page size used when a file does not declare one.
pub const DEFAULT_PAGE_SIZE: usize = 1024;

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: Format::Binary,
            page_size: DEFAULT_PAGE_SIZE,
            use_tokens: false,
        }
    }
}
