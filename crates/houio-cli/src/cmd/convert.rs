use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use houio::{DEFAULT_PAGE_SIZE, ExportOptions, Format, Geo};
use tracing::info;

#[derive(clap::Args)]
#[command(group(clap::ArgGroup::new("format").args(["text", "binary"])))]
pub struct Args {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Write the `.geo` text encoding.
    #[arg(long)]
    pub text: bool,
    /// Write the `.bgeo` binary encoding. Chosen from the output extension when
    /// neither flag is given.
    #[arg(long)]
    pub binary: bool,
    /// Intern repeated strings through the binary string table.
    #[arg(long)]
    pub tokens: bool,
    /// Page size declared for attribute data.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

impl Args {
    fn format(&self) -> Format {
        if self.text {
            Format::Text
        } else if self.binary {
            Format::Binary
        } else if self.output.extension().is_some_and(|ext| ext == "geo") {
            Format::Text
        } else {
            Format::Binary
        }
    }
}

/// Load `input` and save it to `output` in the requested encoding.
pub fn run(args: Args) -> houio::Result<()> {
    let geo = Geo::read(super::open(&args.input)?)?;
    let options = ExportOptions {
        format: args.format(),
        page_size: args.page_size,
        use_tokens: args.tokens,
    };
    info!(input = %args.input.display(), output = %args.output.display(), ?options, "converting");

    let out = BufWriter::new(File::create(&args.output)?);
    geo.save(out, options)?.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(output: &str, text: bool, binary: bool) -> Args {
        Args {
            input: PathBuf::from("in.bgeo"),
            output: PathBuf::from(output),
            text,
            binary,
            tokens: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[test]
    fn flags_override_extension() {
        assert_eq!(args("out.geo", false, true).format(), Format::Binary);
        assert_eq!(args("out.bgeo", true, false).format(), Format::Text);
    }

    #[test]
    fn extension_picks_format() {
        assert_eq!(args("out.geo", false, false).format(), Format::Text);
        assert_eq!(args("out.bgeo", false, false).format(), Format::Binary);
        assert_eq!(args("out", false, false).format(), Format::Binary);
    }
}
