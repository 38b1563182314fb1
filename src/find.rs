//! The waterfall filter engine behind `find` / `find_all`.
//!
//! A [`Filter`] collects tag names, attribute constraints, text regexes,
//! and predicate closures. Execution order is fixed regardless of the
//! order stages were added: tags first, then attributes, then regexes,
//! then predicates, each stage narrowing the candidate set and
//! short-circuiting when it empties.

use std::fmt;

use regex::Regex;

use crate::dom;
use crate::element::Element;
use crate::elements::Elements;

/// How an attribute constraint compares its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    /// Exact equality (no suffix).
    Equals,
    /// Substring containment (`name*`).
    Contains,
    /// Prefix match (`name^`).
    StartsWith,
    /// Suffix match (`name$`).
    EndsWith,
    /// Whitespace-separated token match (`name~`).
    Token,
}

#[derive(Debug, Clone)]
struct AttrConstraint {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrConstraint {
    fn parse(name: &str, value: &str) -> Self {
        let (name, op) = match name.chars().last() {
            Some('*') => (&name[..name.len() - 1], AttrOp::Contains),
            Some('^') => (&name[..name.len() - 1], AttrOp::StartsWith),
            Some('$') => (&name[..name.len() - 1], AttrOp::EndsWith),
            Some('~') => (&name[..name.len() - 1], AttrOp::Token),
            _ => (name, AttrOp::Equals),
        };
        Self {
            name: name.to_lowercase(),
            op,
            value: value.to_string(),
        }
    }

    fn matches(&self, element: &Element<'_>) -> bool {
        let Some(actual) = dom::attribute(&element.node(), &self.name) else {
            return false;
        };
        match self.op {
            AttrOp::Equals => actual == self.value,
            AttrOp::Contains => actual.contains(&self.value),
            AttrOp::StartsWith => actual.starts_with(&self.value),
            AttrOp::EndsWith => actual.ends_with(&self.value),
            AttrOp::Token => actual.split_whitespace().any(|token| token == self.value),
        }
    }
}

type Predicate = Box<dyn for<'b> Fn(&Element<'b>) -> bool>;

/// A reusable set of search constraints for `find` / `find_all`.
///
/// ```
/// use scrapling::{Document, Filter};
///
/// let doc = Document::parse(r#"<ul><li class="a">1</li><li class="b">2</li></ul>"#);
/// let hits = doc.root().find_all(&Filter::new().tag("li").attr("class", "a"));
/// assert_eq!(hits.len(), 1);
/// ```
#[derive(Default)]
pub struct Filter {
    tags: Vec<String>,
    attrs: Vec<AttrConstraint>,
    regexes: Vec<Regex>,
    predicates: Vec<Predicate>,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("tags", &self.tags)
            .field("attrs", &self.attrs)
            .field("regexes", &self.regexes)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl Filter {
    /// An empty filter; it matches every element until constraints are
    /// added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict matches to this tag name. May be called repeatedly to
    /// build a tag set.
    #[must_use]
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_lowercase());
        self
    }

    /// Restrict matches to a set of tag names.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags
            .extend(tags.into_iter().map(|tag| tag.as_ref().to_lowercase()));
        self
    }

    /// Add an attribute constraint. The name may carry a trailing operator:
    /// `class` (equals), `class*` (contains), `href^` (starts with),
    /// `src$` (ends with), `class~` (whitespace token).
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push(AttrConstraint::parse(name, value));
        self
    }

    /// Require the element's direct text to match this regex.
    #[must_use]
    pub fn regex(mut self, pattern: Regex) -> Self {
        self.regexes.push(pattern);
        self
    }

    /// Require this predicate to hold.
    #[must_use]
    pub fn predicate(mut self, predicate: impl for<'b> Fn(&Element<'b>) -> bool + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    fn is_unconstrained(&self) -> bool {
        self.tags.is_empty()
            && self.attrs.is_empty()
            && self.regexes.is_empty()
            && self.predicates.is_empty()
    }
}

/// Run the waterfall over the element's descendants (and the element
/// itself on the root handle). Results are in document order; each node
/// appears at most once.
pub(crate) fn find_all<'a>(element: &Element<'a>, filter: &Filter) -> Elements<'a> {
    let doc = element.document();
    let mut candidates: Vec<Element<'a>> = Vec::new();
    if element.is_root() {
        candidates.push(*element);
    }
    candidates.extend(
        dom::descendant_elements(&element.node())
            .into_iter()
            .map(|node| Element::new(node, doc)),
    );

    if filter.is_unconstrained() {
        return Elements::from_vec(candidates);
    }

    // Stage 1: tag names
    if !filter.tags.is_empty() {
        candidates.retain(|el| {
            dom::tag_name(&el.node())
                .is_some_and(|tag| filter.tags.iter().any(|wanted| wanted == &tag))
        });
        if candidates.is_empty() {
            return Elements::from_vec(candidates);
        }
    }

    // Stage 2: attribute constraints (all must hold)
    if !filter.attrs.is_empty() {
        candidates.retain(|el| filter.attrs.iter().all(|constraint| constraint.matches(el)));
        if candidates.is_empty() {
            return Elements::from_vec(candidates);
        }
    }

    // Stage 3: regexes over direct text (all must match)
    if !filter.regexes.is_empty() {
        candidates.retain(|el| {
            let text = dom::direct_text(&el.node());
            filter.regexes.iter().all(|re| re.is_match(&text))
        });
        if candidates.is_empty() {
            return Elements::from_vec(candidates);
        }
    }

    // Stage 4: predicates (all must hold)
    if !filter.predicates.is_empty() {
        candidates.retain(|el| filter.predicates.iter().all(|pred| pred(el)));
    }

    Elements::from_vec(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    const LIST: &str = r#"<html><body><ul>
        <li class="a" data-k="x1">1</li>
        <li class="a b" data-k="x2">2</li>
        <li class="b" data-k="y9">3</li>
    </ul><p class="a">para</p></body></html>"#;

    #[test]
    fn tag_stage_filters_by_name() {
        let doc = Document::parse(LIST);
        let root = doc.root();
        assert_eq!(root.find_all(&Filter::new().tag("li")).len(), 3);
        assert_eq!(root.find_all(&Filter::new().tags(["li", "p"])).len(), 4);
    }

    #[test]
    fn find_all_tag_matches_css_tag() {
        let doc = Document::parse(LIST);
        let root = doc.root();
        let by_find = root.find_all(&Filter::new().tag("li"));
        let by_css = root.css("li").unwrap().into_elements().unwrap();
        assert_eq!(by_find.len(), by_css.len());
        for (a, b) in by_find.iter().zip(by_css.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn attribute_equality_and_token() {
        let doc = Document::parse(LIST);
        let root = doc.root();

        // exact equality: "a" does not equal "a b"
        let exact = root.find_all(&Filter::new().tag("li").attr("class", "a"));
        assert_eq!(exact.len(), 1);
        assert_eq!(exact.first().unwrap().text(), "1");

        // token match finds both
        let tokens = root.find_all(&Filter::new().tag("li").attr("class~", "a"));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn attribute_prefix_suffix_contains() {
        let doc = Document::parse(LIST);
        let root = doc.root();
        assert_eq!(root.find_all(&Filter::new().attr("data-k^", "x")).len(), 2);
        assert_eq!(root.find_all(&Filter::new().attr("data-k$", "9")).len(), 1);
        assert_eq!(root.find_all(&Filter::new().attr("data-k*", "2")).len(), 1);
    }

    #[test]
    fn missing_attribute_never_matches() {
        let doc = Document::parse(LIST);
        let root = doc.root();
        assert!(root.find_all(&Filter::new().attr("missing", "x")).is_empty());
    }

    #[test]
    fn regex_stage_matches_direct_text() {
        let doc = Document::parse(LIST);
        let root = doc.root();
        let found = root.find_all(&Filter::new().tag("li").regex(Regex::new(r"^[12]$").unwrap()));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn predicate_stage_runs_last() {
        let doc = Document::parse(LIST);
        let root = doc.root();
        let found = root.find_all(
            &Filter::new()
                .tag("li")
                .predicate(|el| el.attr("data-k").is_some_and(|v| v.starts_with('x'))),
        );
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn stage_order_is_fixed_regardless_of_call_order() {
        let doc = Document::parse(LIST);
        let root = doc.root();
        let a = root.find_all(&Filter::new().attr("class~", "a").tag("li"));
        let b = root.find_all(&Filter::new().tag("li").attr("class~", "a"));
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn find_returns_first_in_document_order() {
        let doc = Document::parse(LIST);
        let root = doc.root();
        let first = root.find(&Filter::new().tag("li")).unwrap();
        assert_eq!(first.text(), "1");
    }

    #[test]
    fn unconstrained_filter_returns_all_descendants() {
        let doc = Document::parse("<html><body><p>x</p></body></html>");
        let root = doc.root();
        let all = root.find_all(&Filter::new());
        // root itself plus html/head/body/p descendants
        assert!(all.iter().any(|el| el.tag() == "html"));
        assert!(all.iter().any(|el| el.tag() == "p"));
    }
}
