use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store file too small: {len} bytes, need at least {need}")]
    FileTooSmall { len: u64, need: u64 },
    #[error("unsupported store version {0}")]
    UnsupportedVersion(u32),
    #[error("unknown geometry kind {0:#04x}")]
    UnknownGeometryKind(u8),
    #[error("malformed tile layout: {0}")]
    Layout(&'static str),
    #[error("io {0}")]
    Io(#[from] io::Error),
}
