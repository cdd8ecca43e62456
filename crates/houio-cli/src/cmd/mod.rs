pub mod convert;
pub mod info;
pub mod log;

use std::{fs::File, io::BufReader, path::Path};

fn open(path: &Path) -> houio::Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}
