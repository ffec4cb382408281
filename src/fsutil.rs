use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Error that occurs when a file was opened but reading it failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file `{path}`: {source}")]
pub struct FileReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Open(#[from] FileOpenError),
    #[error(transparent)]
    Read(#[from] FileReadError),
}

impl FileError {
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            FileError::Open(err) => err.source.kind(),
            FileError::Read(err) => err.source.kind(),
        }
    }
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use service_probe::fsutil;
/// let reader = fsutil::open_file_reader("/proc/loadavg")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads a whole (small) file into a string.
///
/// # Errors
///
/// [`FileError::Open`] when the file cannot be opened, [`FileError::Read`] when its contents
/// cannot be read or are not UTF-8.
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String, FileError> {
    let path = path.as_ref();
    let mut reader = open_file_reader(path)?;
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|source| FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(contents)
}

/// Trimmed contents of a file, or `None` when it cannot be read.
pub fn read_trimmed(path: impl AsRef<Path>) -> Option<String> {
    read_to_string(path).ok().map(|s| s.trim().to_owned())
}
