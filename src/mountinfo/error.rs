use std::path::PathBuf;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to detect cgroup v2 mount point in file `{path}`")]
    MissingCgroup2Mount { path: PathBuf },
    #[error("failed to parse line in file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: super::parser::ParseError,
    },
}

impl Error {
    pub fn kind(&self) -> std::io::ErrorKind {
        match self {
            Error::FileOpen(err) => err.source.kind(),
            Error::ReadLine { source, .. } => source.kind(),
            Error::MissingCgroup2Mount { .. } => std::io::ErrorKind::NotFound,
            Error::Parse { .. } => std::io::ErrorKind::InvalidData,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
