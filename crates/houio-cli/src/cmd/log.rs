use std::{io::Write, path::PathBuf};

use houio::Logger;

#[derive(clap::Args)]
pub struct Args {
    pub path: PathBuf,
}

/// Stream the parser events of `path` to stdout.
pub fn run(args: Args) -> houio::Result<()> {
    let reader = super::open(&args.path)?;
    let stdout = std::io::stdout().lock();
    let mut logger = Logger::new(std::io::BufWriter::new(stdout));
    logger.log_stream(reader)?;
    logger.into_inner().flush()?;
    Ok(())
}
