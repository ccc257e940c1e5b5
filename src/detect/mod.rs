//! Deciding whether the changelog changed since the last notification.

use miette::Diagnostic;

pub use self::{
    fingerprint::{fingerprint, Fingerprint},
    git::GitRange,
};
use crate::fs;

mod fingerprint;
mod git;

/// Something that remembers what the changelog looked like when it was last announced.
pub trait ChangeDetector {
    /// Whether `document` differs from what was last announced.
    ///
    /// ## Errors
    /// Whenever the reference point can't be loaded. Implementations should report "changed"
    /// rather than fail when there simply is no reference point yet.
    fn has_changed(&self, document: &str) -> Result<bool, Error>;

    /// Remember `document` as announced. Only called once every destination accepted it.
    ///
    /// ## Errors
    /// If the new reference point can't be stored.
    fn record(&self, _document: &str) -> Result<(), Error> {
        Ok(())
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fs(#[from] fs::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Git(#[from] git::Error),
}
