use std::path::{Path, PathBuf};

use log::debug;
use sha2::{Digest, Sha256};

use super::{ChangeDetector, Error};
use crate::fs;

/// Compares a SHA-256 of the changelog against one stored in a state file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fingerprint {
    state_file: PathBuf,
}

impl Fingerprint {
    #[must_use]
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
        }
    }

    #[must_use]
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// The fingerprint from the last successful notification, if there was one.
    ///
    /// ## Errors
    /// If the state file exists but can't be read.
    pub fn stored(&self) -> Result<Option<String>, fs::Error> {
        Ok(fs::read_optional(&self.state_file)?.map(|contents| contents.trim().to_string()))
    }
}

/// Lowercase hex SHA-256 of the whole document.
#[must_use]
pub fn fingerprint(document: &str) -> String {
    hex::encode(Sha256::digest(document.as_bytes()))
}

impl ChangeDetector for Fingerprint {
    fn has_changed(&self, document: &str) -> Result<bool, Error> {
        let current = fingerprint(document);
        let Some(stored) = self.stored()? else {
            debug!(
                "No fingerprint stored at {}, treating changelog as changed",
                self.state_file.display()
            );
            return Ok(true);
        };
        debug!("Stored fingerprint {stored}, current fingerprint {current}");
        Ok(stored != current)
    }

    fn record(&self, document: &str) -> Result<(), Error> {
        let contents = format!("{}\n", fingerprint(document));
        fs::write_atomic(&self.state_file, &contents).map_err(Error::from)
    }
}
