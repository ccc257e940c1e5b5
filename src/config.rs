use std::path::PathBuf;

use miette::Diagnostic;

use crate::{
    changelog::{HeaderLevel, ParseLevelError},
    deliver::Destination,
    detect::{ChangeDetector, Fingerprint, GitRange},
};

pub const INTERNAL_WEBHOOK: &str = "SLACK_WEBHOOK_INTERNAL";
pub const COMMUNITY_WEBHOOK: &str = "SLACK_WEBHOOK_COMMUNITY";
pub const DETECTOR: &str = "CHANGELOG_DETECTOR";
pub const HASH_FILE: &str = "CHANGELOG_HASH_FILE";
pub const BASE_REF: &str = "CHANGELOG_BASE_REF";
pub const HEAD_REF: &str = "CHANGELOG_HEAD_REF";
pub const CHANGELOG_PATH: &str = "CHANGELOG_PATH";
pub const ENTRY_LEVEL: &str = "CHANGELOG_ENTRY_LEVEL";

pub const DEFAULT_CHANGELOG: &str = "CHANGELOG.md";
pub const DEFAULT_HASH_FILE: &str = ".changelog-hash";

/// Everything a run needs, resolved up front so nothing else reads the environment.
#[derive(Clone, Eq, PartialEq)]
pub struct Config {
    /// The directory relative paths are resolved against, normally the repository root.
    pub root: PathBuf,
    pub changelog: PathBuf,
    /// Pin the heading level of entries instead of detecting it.
    pub entry_level: Option<HeaderLevel>,
    pub detector: DetectorKind,
    pub internal_webhook: Option<String>,
    pub community_webhook: Option<String>,
}

/// Webhook URLs are secrets, only whether they are set is shown.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("root", &self.root)
            .field("changelog", &self.changelog)
            .field("entry_level", &self.entry_level)
            .field("detector", &self.detector)
            .field("internal_webhook", &self.internal_webhook.is_some())
            .field("community_webhook", &self.community_webhook.is_some())
            .finish()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DetectorKind {
    /// Compare a hash of the changelog against one stored in `state_file`.
    Fingerprint { state_file: PathBuf },
    /// Compare the changelog between two Git revisions.
    GitRange {
        base: Option<String>,
        head: Option<String>,
    },
}

impl Config {
    /// Build a config from environment variables, `lookup` is usually `std::env::var(..).ok()`.
    ///
    /// Webhooks are not required here, they're checked by [`Config::destinations`] only once
    /// there's something to send.
    ///
    /// ## Errors
    /// 1. `CHANGELOG_DETECTOR` is neither `hash` nor `git`
    /// 2. `CHANGELOG_ENTRY_LEVEL` is not a heading level
    pub fn from_env<F>(root: PathBuf, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let detector = match lookup(DETECTOR).as_deref().map(str::trim) {
            None | Some("hash") => DetectorKind::Fingerprint {
                state_file: lookup(HASH_FILE).map_or_else(|| DEFAULT_HASH_FILE.into(), PathBuf::from),
            },
            Some("git") => DetectorKind::GitRange {
                base: lookup(BASE_REF),
                head: lookup(HEAD_REF),
            },
            Some(other) => return Err(Error::UnknownDetector(other.to_string())),
        };
        let entry_level = lookup(ENTRY_LEVEL)
            .map(|value| {
                value.parse::<HeaderLevel>().map_err(|source| Error::EntryLevel {
                    value: value.clone(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            root,
            changelog: lookup(CHANGELOG_PATH).map_or_else(|| DEFAULT_CHANGELOG.into(), PathBuf::from),
            entry_level,
            detector,
            internal_webhook: lookup(INTERNAL_WEBHOOK),
            community_webhook: lookup(COMMUNITY_WEBHOOK),
        })
    }

    #[must_use]
    pub fn changelog_path(&self) -> PathBuf {
        self.root.join(&self.changelog)
    }

    #[must_use]
    pub fn detector(&self) -> Box<dyn ChangeDetector> {
        match &self.detector {
            DetectorKind::Fingerprint { state_file } => {
                Box::new(Fingerprint::new(self.root.join(state_file)))
            }
            DetectorKind::GitRange { base, head } => Box::new(GitRange::new(
                self.root.clone(),
                self.changelog.clone(),
                base.clone(),
                head.clone(),
            )),
        }
    }

    /// Where to post, in order.
    ///
    /// ## Errors
    /// If either webhook is unset.
    pub fn destinations(&self) -> Result<Vec<Destination>, Error> {
        let internal = self
            .internal_webhook
            .clone()
            .ok_or(Error::MissingWebhook(INTERNAL_WEBHOOK))?;
        let community = self
            .community_webhook
            .clone()
            .ok_or(Error::MissingWebhook(COMMUNITY_WEBHOOK))?;
        Ok(vec![
            Destination::new("internal", internal),
            Destination::new("community", community),
        ])
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error("{0} is not set")]
    #[diagnostic(
        code(config::missing_webhook),
        help("Set it to the Slack incoming webhook URL for that channel.")
    )]
    MissingWebhook(&'static str),
    #[error("Unknown change detector {0:?}")]
    #[diagnostic(
        code(config::unknown_detector),
        help("CHANGELOG_DETECTOR must be `hash` or `git`.")
    )]
    UnknownDetector(String),
    #[error("Invalid CHANGELOG_ENTRY_LEVEL {value:?}: {source}")]
    #[diagnostic(
        code(config::entry_level),
        help("Use the number of `#` characters in your entry headings, e.g. 3 for `### Feb 20`.")
    )]
    EntryLevel {
        value: String,
        #[source]
        source: ParseLevelError,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Config::from_env(PathBuf::from("/repo"), |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(
            config,
            Config {
                root: PathBuf::from("/repo"),
                changelog: PathBuf::from("CHANGELOG.md"),
                entry_level: None,
                detector: DetectorKind::Fingerprint {
                    state_file: PathBuf::from(".changelog-hash"),
                },
                internal_webhook: None,
                community_webhook: None,
            }
        );
        assert_eq!(config.changelog_path(), PathBuf::from("/repo/CHANGELOG.md"));
    }

    #[test]
    fn everything_set() {
        let config = config(&[
            (DETECTOR, "git"),
            (BASE_REF, "abc"),
            (HEAD_REF, "def"),
            (CHANGELOG_PATH, "docs/changelog.md"),
            (ENTRY_LEVEL, "4"),
            (INTERNAL_WEBHOOK, "https://hooks.test/internal"),
            (COMMUNITY_WEBHOOK, "https://hooks.test/community"),
        ])
        .unwrap();
        assert_eq!(
            config.detector,
            DetectorKind::GitRange {
                base: Some("abc".to_string()),
                head: Some("def".to_string()),
            }
        );
        assert_eq!(config.changelog, PathBuf::from("docs/changelog.md"));
        assert_eq!(config.entry_level, HeaderLevel::new(4));
        assert_eq!(
            config.destinations().unwrap(),
            vec![
                Destination::new("internal", "https://hooks.test/internal"),
                Destination::new("community", "https://hooks.test/community"),
            ]
        );
    }

    #[test]
    fn empty_values_are_unset() {
        let config = config(&[(HASH_FILE, ""), (INTERNAL_WEBHOOK, "  ")]).unwrap();
        assert_eq!(
            config.detector,
            DetectorKind::Fingerprint {
                state_file: PathBuf::from(".changelog-hash"),
            }
        );
        assert_eq!(config.internal_webhook, None);
    }

    #[test]
    fn custom_hash_file() {
        let config = config(&[(DETECTOR, "hash"), (HASH_FILE, ".github/hash")]).unwrap();
        assert_eq!(
            config.detector,
            DetectorKind::Fingerprint {
                state_file: PathBuf::from(".github/hash"),
            }
        );
    }

    #[test]
    fn unknown_detector() {
        assert!(matches!(
            config(&[(DETECTOR, "svn")]),
            Err(Error::UnknownDetector(name)) if name == "svn"
        ));
    }

    #[test]
    fn bad_entry_level() {
        assert!(matches!(
            config(&[(ENTRY_LEVEL, "9")]),
            Err(Error::EntryLevel { .. })
        ));
    }

    #[test]
    fn debug_hides_webhooks() {
        let config = config(&[
            (INTERNAL_WEBHOOK, "https://hooks.test/services/INTERNAL"),
            (COMMUNITY_WEBHOOK, "https://hooks.test/services/COMMUNITY"),
        ])
        .unwrap();

        let debug = format!("{config:?}");

        assert!(!debug.contains("hooks.test"));
        assert!(debug.contains("internal_webhook: true"));
        assert!(debug.contains("community_webhook: true"));
    }

    #[test]
    fn missing_webhooks() {
        let config = config(&[(COMMUNITY_WEBHOOK, "https://hooks.test/community")]).unwrap();
        assert!(matches!(
            config.destinations(),
            Err(Error::MissingWebhook(INTERNAL_WEBHOOK))
        ));

        let config = Config {
            internal_webhook: Some("https://hooks.test/internal".to_string()),
            community_webhook: None,
            ..config
        };
        assert!(matches!(
            config.destinations(),
            Err(Error::MissingWebhook(COMMUNITY_WEBHOOK))
        ));
    }
}
