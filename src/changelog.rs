use std::{fmt::Display, iter::once, num::ParseIntError, str::FromStr};

use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;

/// The title of the heading that every dated entry lives under.
pub const TIMELINE: &str = "Timeline";

/// Slack rejects section blocks with more text than this.
pub const MAX_ENTRY_CHARS: usize = 3000;

const ELLIPSIS: &str = "...";

/// A changelog document, borrowed for the duration of one extraction.
#[derive(Clone, Debug)]
pub struct Changelog<'a> {
    content: &'a str,
    /// Only headings at exactly this level count as entries. When `None`, the first heading
    /// deeper than the Timeline heading decides the level.
    entry_level: Option<HeaderLevel>,
}

/// The newest dated entry of a changelog.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    /// The heading text without the leading `#`s, e.g. `Feb 20`.
    pub title: String,
    pub level: HeaderLevel,
    /// The entry's markdown, starting with its heading line, with blank and rule lines removed.
    pub text: String,
}

impl<'a> Changelog<'a> {
    #[must_use]
    pub const fn new(content: &'a str) -> Self {
        Self {
            content,
            entry_level: None,
        }
    }

    #[must_use]
    pub fn with_entry_level(mut self, entry_level: Option<HeaderLevel>) -> Self {
        self.entry_level = entry_level;
        self
    }

    /// Find the first entry under the Timeline heading.
    ///
    /// ## Errors
    /// 1. There is no heading titled [`TIMELINE`]
    /// 2. The Timeline section has no entry headings before it ends
    pub fn latest_entry(&self) -> Result<Entry, Error> {
        let mut lines = Lines::new(self.content);

        let timeline_level = lines
            .by_ref()
            .find_map(|line| match line {
                Line::Heading(heading) if heading.title == TIMELINE => Some(heading.level),
                _ => None,
            })
            .ok_or(Error::MissingTimeline)?;

        let heading = loop {
            match lines.next() {
                None => return Err(Error::MissingEntry),
                Some(Line::Heading(heading)) if heading.level <= timeline_level => {
                    return Err(Error::MissingEntry)
                }
                Some(Line::Heading(heading))
                    if self.entry_level.map_or(true, |level| level == heading.level) =>
                {
                    break heading
                }
                Some(_) => continue,
            }
        };

        let body = lines
            .take_while(|line| match line {
                Line::Heading(next) => next.level > heading.level,
                Line::Rule(_) => false,
                Line::Text(_) => true,
            })
            .filter_map(|line| match line {
                Line::Heading(sub_heading) => Some(sub_heading.raw),
                Line::Text(text) if !text.trim().is_empty() => Some(text),
                Line::Text(_) | Line::Rule(_) => None,
            });
        let text = once(heading.raw).chain(body).join("\n");

        Ok(Entry {
            title: heading.title.to_string(),
            level: heading.level,
            text: truncate(text.trim()),
        })
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ENTRY_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text
        .chars()
        .take(MAX_ENTRY_CHARS - ELLIPSIS.len())
        .collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// The depth of an ATX heading, 1 (`#`) through 6 (`######`).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HeaderLevel(u8);

impl HeaderLevel {
    #[must_use]
    pub const fn new(level: u8) -> Option<Self> {
        if level >= 1 && level <= 6 {
            Some(Self(level))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Display for HeaderLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for _ in 0..self.0 {
            f.write_str("#")?;
        }
        Ok(())
    }
}

impl FromStr for HeaderLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = s.trim().parse::<u8>().map_err(ParseLevelError::NotANumber)?;
        Self::new(level).ok_or(ParseLevelError::OutOfRange(level))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParseLevelError {
    #[error("not a number: {0}")]
    NotANumber(#[source] ParseIntError),
    #[error("{0} is not between 1 and 6")]
    OutOfRange(u8),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Heading<'a> {
    pub(crate) level: HeaderLevel,
    pub(crate) title: &'a str,
    pub(crate) raw: &'a str,
}

/// Parse an ATX heading like `## Timeline`. Setext headings aren't supported.
pub(crate) fn parse_heading(line: &str) -> Option<Heading<'_>> {
    let unindented = strip_indent(line)?;
    let hashes = unindented.chars().take_while(|c| *c == '#').count();
    let level = u8::try_from(hashes).ok().and_then(HeaderLevel::new)?;
    #[allow(clippy::indexing_slicing)] // `hashes` ASCII bytes were just counted
    let rest = &unindented[hashes..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        // `#hashtag`, not a heading
        return None;
    }
    let title = rest.trim();
    // An optional closing sequence, `## Timeline ##`, must be separated from the title
    let title = match title.trim_end_matches('#') {
        stripped if stripped.is_empty() || stripped.ends_with([' ', '\t']) => stripped.trim_end(),
        _ => title,
    };
    Some(Heading {
        level,
        title,
        raw: line.trim_end(),
    })
}

/// A thematic break: three or more of the same `-`, `*` or `_`, optionally spaced out.
pub(crate) fn is_rule(line: &str) -> bool {
    let Some(unindented) = strip_indent(line) else {
        return false;
    };
    let mut marks = unindented.chars().filter(|c| !c.is_whitespace());
    let Some(first @ ('-' | '*' | '_')) = marks.next() else {
        return false;
    };
    let mut count = 1;
    for mark in marks {
        if mark != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

/// Markdown allows up to three spaces of indentation before block markers.
fn strip_indent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then(|| line.trim_start_matches(' '))
}

/// The opening marker of a fenced code block: its character and run length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Fence {
    mark: char,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let line = strip_indent(line)?;
        let mark = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = line.len() - line.trim_start_matches(mark).len();
        (len >= 3).then_some(Self { mark, len })
    }

    /// A closing fence uses the same character, at least as many times, and nothing after it.
    fn is_closed_by(self, line: &str) -> bool {
        strip_indent(line).is_some_and(|line| {
            let rest = line.trim_start_matches(self.mark);
            line.len() - rest.len() >= self.len && rest.trim().is_empty()
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Line<'a> {
    Heading(Heading<'a>),
    Rule(&'a str),
    Text(&'a str),
}

/// Classifies each line of a document. Lines inside fenced code blocks are always [`Line::Text`].
///
/// A fence that is never closed is treated as plain text, so it can't hide the headings after it.
pub(crate) struct Lines<'a> {
    inner: std::str::Lines<'a>,
    fence: Option<Fence>,
}

impl<'a> Lines<'a> {
    pub(crate) fn new(content: &'a str) -> Self {
        Self {
            inner: content.lines(),
            fence: None,
        }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.inner.next()?;
        if let Some(fence) = self.fence {
            if fence.is_closed_by(line) {
                self.fence = None;
            }
            return Some(Line::Text(line));
        }
        if let Some(fence) = Fence::open(line) {
            if self.inner.clone().any(|rest| fence.is_closed_by(rest)) {
                self.fence = Some(fence);
            }
            return Some(Line::Text(line));
        }
        if let Some(heading) = parse_heading(line) {
            return Some(Line::Heading(heading));
        }
        if is_rule(line) {
            return Some(Line::Rule(line));
        }
        Some(Line::Text(line))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Diagnostic, Error)]
pub enum Error {
    #[error("The changelog has no Timeline heading")]
    #[diagnostic(
        code(changelog::missing_timeline),
        help("Dated entries must live under a heading titled `Timeline`, e.g. `## Timeline`.")
    )]
    MissingTimeline,
    #[error("No dated entry found under the Timeline heading")]
    #[diagnostic(
        code(changelog::missing_entry),
        help(
            "Each entry must start with a heading one or more levels below the Timeline heading, \
            e.g. `### February 2024` or `#### Feb 20`. If CHANGELOG_ENTRY_LEVEL is set, the heading \
            must be at exactly that level."
        )
    )]
    MissingEntry,
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_parse {
    use super::*;

    #[test]
    fn heading() {
        let heading = parse_heading("#### Feb 20").unwrap();
        assert_eq!(heading.level.get(), 4);
        assert_eq!(heading.title, "Feb 20");
    }

    #[test]
    fn closing_hashes() {
        let heading = parse_heading("## Timeline ##").unwrap();
        assert_eq!(heading.title, "Timeline");
    }

    #[test]
    fn hashtag_is_not_heading() {
        assert!(parse_heading("#release").is_none());
    }

    #[test]
    fn too_deep() {
        assert!(parse_heading("####### seven").is_none());
    }

    #[test]
    fn rules() {
        assert!(is_rule("---"));
        assert!(is_rule("* * *"));
        assert!(is_rule("_____"));
        assert!(!is_rule("--"));
        assert!(!is_rule("-*-"));
        assert!(!is_rule("- item"));
        assert!(!is_rule("    ---"));
    }

    #[test]
    fn level_from_str() {
        assert_eq!("3".parse::<HeaderLevel>().unwrap().to_string(), "###");
        assert_eq!(
            "7".parse::<HeaderLevel>(),
            Err(ParseLevelError::OutOfRange(7))
        );
        assert!(matches!(
            "three".parse::<HeaderLevel>(),
            Err(ParseLevelError::NotANumber(_))
        ));
    }
}
