//! Text wrappers returned by selection and extraction operations.
//!
//! [`TextHandler`] is the string type the whole crate speaks: element text,
//! attribute values, serialized HTML, and generated selectors all come back
//! as `TextHandler` so that regex shortcuts, JSON coercion, and cleaning can
//! chain without leaving the type. [`TextHandlers`] is the ordered
//! collection form with flattening `re`/`re_first`.

use std::fmt;
use std::ops::Deref;

use regex::RegexBuilder;

use crate::error::{Error, Result};

/// Options for [`TextHandler::re`] and [`TextHandler::re_first`].
#[derive(Debug, Clone)]
pub struct RegexOptions {
    /// Decode HTML entity references (`&amp;`, `&#x20;` ...) before matching.
    pub replace_entities: bool,
    /// Collapse whitespace runs and trim before matching.
    pub clean_match: bool,
    /// Compile the pattern case-sensitively.
    pub case_sensitive: bool,
}

impl Default for RegexOptions {
    fn default() -> Self {
        Self {
            replace_entities: true,
            clean_match: false,
            case_sensitive: true,
        }
    }
}

/// Collapse internal whitespace runs to single spaces and trim the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A string with scraping-oriented shortcuts.
///
/// Dereferences to `str`, so the whole `&str` API is available; operations
/// that produce new text return `TextHandler` again so chains stay
/// type-stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextHandler(String);

impl TextHandler {
    /// Wrap an owned or borrowed string.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the underlying text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the underlying `String`.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Run `pattern` over the text and collect every non-overlapping match.
    ///
    /// If the pattern has capture groups, group 1 is returned for each
    /// match; otherwise the whole match is. Entity decoding and whitespace
    /// cleaning are applied to the subject first per `opts`.
    pub fn re(&self, pattern: &str, opts: &RegexOptions) -> Result<TextHandlers> {
        let subject = self.regex_subject(opts);
        let re = compile_pattern(pattern, opts.case_sensitive)?;
        let group = usize::from(re.captures_len() > 1);

        let mut out = Vec::new();
        for caps in re.captures_iter(&subject) {
            if let Some(m) = caps.get(group) {
                out.push(TextHandler::new(m.as_str()));
            }
        }
        Ok(TextHandlers::new(out))
    }

    /// Like [`re`](Self::re), but stop at the first match.
    pub fn re_first(&self, pattern: &str, opts: &RegexOptions) -> Result<Option<TextHandler>> {
        let subject = self.regex_subject(opts);
        let re = compile_pattern(pattern, opts.case_sensitive)?;
        let group = usize::from(re.captures_len() > 1);

        Ok(re
            .captures(&subject)
            .and_then(|caps| caps.get(group).map(|m| TextHandler::new(m.as_str()))))
    }

    /// Parse the text as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.0)?)
    }

    /// Trim the ends, collapse internal whitespace runs to single spaces,
    /// and optionally decode HTML entities.
    #[must_use]
    pub fn clean(&self, remove_entities: bool) -> TextHandler {
        let collapsed = collapse_whitespace(&self.0);
        if remove_entities {
            TextHandler::new(html_escape::decode_html_entities(&collapsed).into_owned())
        } else {
            TextHandler::new(collapsed)
        }
    }

    /// Return the characters sorted.
    #[must_use]
    pub fn sort(&self, reverse: bool) -> TextHandler {
        let mut chars: Vec<char> = self.0.chars().collect();
        chars.sort_unstable();
        if reverse {
            chars.reverse();
        }
        TextHandler::new(chars.into_iter().collect::<String>())
    }

    /// Trimmed copy, staying in `TextHandler`.
    #[must_use]
    pub fn trimmed(&self) -> TextHandler {
        TextHandler::new(self.0.trim())
    }

    fn regex_subject(&self, opts: &RegexOptions) -> String {
        let mut subject = if opts.replace_entities {
            html_escape::decode_html_entities(&self.0).into_owned()
        } else {
            self.0.clone()
        };
        if opts.clean_match {
            subject = collapse_whitespace(&subject);
        }
        subject
    }
}

pub(crate) fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<regex::Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|err| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })
}

impl Deref for TextHandler {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TextHandler {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TextHandler {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for TextHandler {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl From<TextHandler> for String {
    fn from(text: TextHandler) -> Self {
        text.0
    }
}

impl PartialEq<str> for TextHandler {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TextHandler {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for TextHandler {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}

/// An ordered collection of [`TextHandler`] values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextHandlers(Vec<TextHandler>);

impl TextHandlers {
    /// Wrap a vector of handlers.
    #[must_use]
    pub fn new(items: Vec<TextHandler>) -> Self {
        Self(items)
    }

    /// First handler, if any.
    #[must_use]
    pub fn first(&self) -> Option<&TextHandler> {
        self.0.first()
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Run [`TextHandler::re`] on every member and flatten the results.
    pub fn re(&self, pattern: &str, opts: &RegexOptions) -> Result<TextHandlers> {
        let mut out = Vec::new();
        for handler in &self.0 {
            out.extend(handler.re(pattern, opts)?.0);
        }
        Ok(TextHandlers(out))
    }

    /// First match from the first member that yields one.
    pub fn re_first(&self, pattern: &str, opts: &RegexOptions) -> Result<Option<TextHandler>> {
        for handler in &self.0 {
            if let Some(found) = handler.re_first(pattern, opts)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    pub(crate) fn push(&mut self, item: TextHandler) {
        self.0.push(item);
    }
}

impl Deref for TextHandlers {
    type Target = [TextHandler];

    fn deref(&self) -> &[TextHandler] {
        &self.0
    }
}

impl IntoIterator for TextHandlers {
    type Item = TextHandler;
    type IntoIter = std::vec::IntoIter<TextHandler>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TextHandlers {
    type Item = &'a TextHandler;
    type IntoIter = std::slice::Iter<'a, TextHandler>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<String>> for TextHandlers {
    fn from(items: Vec<String>) -> Self {
        Self(items.into_iter().map(TextHandler::from).collect())
    }
}

impl PartialEq<Vec<&str>> for TextHandlers {
    fn eq(&self, other: &Vec<&str>) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}
