//! Turns a changelog [`Entry`] into a Slack incoming-webhook payload.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde::Serialize;

use crate::changelog::{Entry, HeaderLevel, Line, Lines};

/// Goes in front of every entry in the section block.
pub const PREFIX: &str = ":mega: *Changelog update*\n\n";

#[allow(clippy::expect_used)]
static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("strong emphasis pattern is valid"));

/// The target stops at the first `)`, so parentheses inside a URL cut it short.
#[allow(clippy::expect_used)]
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("inline link pattern is valid")
});

/// The JSON body posted to each webhook.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Message {
    /// Plain summary shown in notifications and anywhere blocks can't be rendered.
    pub text: String,
    pub blocks: Vec<Block>,
}

impl Message {
    #[must_use]
    pub fn from_entry(entry: &Entry) -> Self {
        let title = entry.title.replace("**", "");
        Self {
            text: format!("Changelog update: {title}"),
            blocks: vec![Block::Section {
                text: Text::mrkdwn(format!(
                    "{PREFIX}{}",
                    to_mrkdwn(&entry.text, entry.level)
                )),
            }],
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: Text },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Text {
    #[serde(rename = "type")]
    kind: TextKind,
    text: String,
}

impl Text {
    fn mrkdwn(text: String) -> Self {
        Self {
            kind: TextKind::Mrkdwn,
            text,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
enum TextKind {
    Mrkdwn,
}

/// Convert the subset of markdown that changelog entries use into Slack's `mrkdwn`.
///
/// Headings at `entry_level` or deeper become bold lines, `**strong**` becomes `*strong*` and
/// `[label](url)` becomes `<url|label>`. Each rewrite runs once over the output of the previous one.
#[must_use]
pub fn to_mrkdwn(markdown: &str, entry_level: HeaderLevel) -> String {
    let headings = Lines::new(markdown)
        .map(|line| match line {
            Line::Heading(heading) if heading.level >= entry_level && !heading.title.is_empty() => {
                format!("*{}*", heading.title)
            }
            Line::Heading(heading) => heading.raw.to_string(),
            Line::Rule(raw) | Line::Text(raw) => raw.to_string(),
        })
        .join("\n");
    let strong = STRONG.replace_all(&headings, "*$1*");
    LINK.replace_all(&strong, "<$2|$1>").into_owned()
}
