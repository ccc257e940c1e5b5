//! Thin wrappers around `std::fs` that attach the offending path to every error.

use std::{
    io,
    path::{Path, PathBuf},
};

use log::trace;
use miette::Diagnostic;
use thiserror::Error;

pub(crate) fn read_to_string<P: AsRef<Path> + Into<PathBuf>>(path: P) -> Result<String, Error> {
    std::fs::read_to_string(path.as_ref()).map_err(|source| Error::Read {
        path: path.into(),
        source,
    })
}

/// Like [`read_to_string`], but a file that doesn't exist is `Ok(None)` rather than an error.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, Error> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Read {
            path: path.into(),
            source,
        }),
    }
}

/// Replace the contents of `path` by writing a sibling file and renaming it into place.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), Error> {
    let write_err = |source| Error::Write {
        path: path.into(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    trace!("Writing {} to {}", contents.trim_end(), path.display());
    std::fs::write(&staging, contents).map_err(write_err)?;
    std::fs::rename(&staging, path).map_err(write_err)
}

#[derive(Debug, Diagnostic, Error)]
pub enum Error {
    #[error("Error writing to {path}: {source}")]
    #[diagnostic(
        code(fs::write),
        help("Make sure you have permission to write to this file.")
    )]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error reading from {path}: {source}")]
    #[diagnostic(
        code(fs::read),
        help("Make sure the file exists and you have permission to read it.")
    )]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
