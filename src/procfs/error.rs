//! Errors raised while reading and parsing procfs, sysfs and cgroup files.
//!
//! [`StatParseError`] describes a malformed line and converts into an [`std::io::Error`] of
//! kind [`std::io::ErrorKind::InvalidData`], so the line parsers can keep returning
//! `std::io::Result`. [`Error`] adds the path of the file that was being read.

use std::io;
use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;

use thiserror::Error;

use crate::fsutil;

#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("duplicate field '{field}' at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for '{key}' at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid value at line {line}: '{value}': {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid decimal at line {line}: '{value}': {source}")]
    InvalidDecimal {
        value: String,
        line: usize,
        #[source]
        source: ParseFloatError,
    },

    #[error("missing field '{field}' at line {line}")]
    MissingField { field: &'static str, line: usize },

    #[error("error during I/O: {0}")]
    Io(#[from] io::Error),
}

impl From<StatParseError> for io::Error {
    fn from(err: StatParseError) -> Self {
        match err {
            StatParseError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Extracts a `StatParseError` from an `std::io::Error` assuming it was wrapped.
///
/// Panics if the inner error is not a `StatParseError`. Intended for use in test assertions only.
#[cfg(test)]
pub(crate) fn extract_stat_parse_error(err: &io::Error) -> &StatParseError {
    err.get_ref()
        .and_then(|e| e.downcast_ref::<StatParseError>())
        .unwrap()
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    File(#[from] fsutil::FileError),

    #[error("failed to parse file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list directory `{path}`: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat filesystem at `{path}`: {source}")]
    Statvfs {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("`{name}` not found in `{path}`")]
    NoSuchEntry { name: String, path: PathBuf },

    #[error("`{path}` is not available on this kernel")]
    Unsupported { path: PathBuf },
}

impl From<fsutil::FileOpenError> for Error {
    fn from(err: fsutil::FileOpenError) -> Self {
        Error::File(err.into())
    }
}

impl Error {
    /// The I/O error kind closest to this failure.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Error::File(err) => err.kind(),
            Error::Parse { source, .. } => source.kind(),
            Error::ReadDir { source, .. } => source.kind(),
            Error::Statvfs { source, .. } => io::Error::from(*source).kind(),
            Error::NoSuchEntry { .. } => io::ErrorKind::NotFound,
            Error::Unsupported { .. } => io::ErrorKind::Unsupported,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
