use std::path::{Path, PathBuf};

use git2::{DiffOptions, Repository, Tree};
use itertools::Itertools;
use log::{debug, warn};
use miette::Diagnostic;

use super::ChangeDetector;

/// Asks Git whether the changelog differs between two revisions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GitRange {
    /// Any directory inside the repository, usually the current one.
    repo_dir: PathBuf,
    /// The changelog, relative to `repo_dir` or absolute.
    document: PathBuf,
    base: Option<String>,
    head: Option<String>,
}

impl GitRange {
    /// With no `head`, `HEAD` is used. With no `base`, the first parent of `head` is used.
    #[must_use]
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        document: impl Into<PathBuf>,
        base: Option<String>,
        head: Option<String>,
    ) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            document: document.into(),
            base,
            head,
        }
    }

    fn head_spec(&self) -> &str {
        self.head.as_deref().unwrap_or("HEAD")
    }

    fn base_spec(&self) -> String {
        self.base
            .clone()
            .unwrap_or_else(|| format!("{}^", self.head_spec()))
    }

    /// The changelog path as a pathspec relative to the root of the work tree.
    fn pathspec(&self, workdir: &Path) -> String {
        let full = self.repo_dir.join(&self.document);
        let relative = match (full.canonicalize(), workdir.canonicalize()) {
            (Ok(full), Ok(workdir)) => full.strip_prefix(workdir).map(Path::to_path_buf).ok(),
            _ => None,
        }
        .unwrap_or_else(|| self.document.clone());
        relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .join("/")
    }
}

impl ChangeDetector for GitRange {
    fn has_changed(&self, _document: &str) -> Result<bool, super::Error> {
        let repo = Repository::discover(&self.repo_dir).map_err(ErrorKind::OpenRepo)?;
        let workdir = repo.workdir().ok_or(ErrorKind::BareRepo)?;
        let pathspec = self.pathspec(workdir);

        let head_spec = self.head_spec();
        let head = resolve_tree(&repo, head_spec).map_err(|source| ErrorKind::Revision {
            revision: head_spec.to_string(),
            source,
        })?;
        let base_spec = self.base_spec();
        let base = match resolve_tree(&repo, &base_spec) {
            Ok(tree) => tree,
            Err(err) => {
                warn!(
                    "Could not resolve base revision {base_spec}, treating changelog as changed: {}",
                    err.message()
                );
                return Ok(true);
            }
        };

        let mut options = DiffOptions::new();
        options.pathspec(pathspec.as_str()).disable_pathspec_match(true);
        let diff = repo
            .diff_tree_to_tree(Some(&base), Some(&head), Some(&mut options))
            .map_err(ErrorKind::Diff)?;
        let changed = diff.deltas().next().is_some();
        debug!("{pathspec} changed between {base_spec} and {head_spec}: {changed}");
        Ok(changed)
    }
}

fn resolve_tree<'repo>(repo: &'repo Repository, spec: &str) -> Result<Tree<'repo>, git2::Error> {
    repo.revparse_single(spec)?.peel_to_tree()
}

#[derive(Debug, Diagnostic, thiserror::Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error(Box<ErrorKind>);

impl<T: Into<ErrorKind>> From<T> for Error {
    fn from(kind: T) -> Self {
        Self(Box::new(kind.into()))
    }
}

impl From<ErrorKind> for super::Error {
    fn from(kind: ErrorKind) -> Self {
        Self::Git(kind.into())
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
enum ErrorKind {
    #[error("Could not open Git repository: {0}")]
    #[diagnostic(
        code(git::open_repo),
        help("Make sure you are in a Git repository and that you have permission to access it.")
    )]
    OpenRepo(#[source] git2::Error),
    #[error("The Git repository has no work tree")]
    #[diagnostic(
        code(git::bare_repo),
        help("Run from a regular checkout, or use CHANGELOG_DETECTOR=hash.")
    )]
    BareRepo,
    #[error("Could not resolve revision {revision}: {source}")]
    #[diagnostic(
        code(git::revision),
        help("Check that CHANGELOG_HEAD_REF names a commit that exists in this clone.")
    )]
    Revision {
        revision: String,
        #[source]
        source: git2::Error,
    },
    #[error("Could not compare revisions: {0}")]
    #[diagnostic(
        code(git::diff),
        help(
            "Something went wrong when interacting with Git that we don't have an explanation for. \
                    Maybe try performing the operation manually?"
        )
    )]
    Diff(#[source] git2::Error),
}
