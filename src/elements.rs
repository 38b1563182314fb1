//! Result containers for element selection.
//!
//! [`Elements`] is the ordered collection of element handles; it supports
//! slice-style access plus the chained `css`/`xpath`/`re`/`search`/`filter`
//! operators. [`Selection`] is what `css`/`xpath` return: elements, text,
//! or a mix, depending on the selector's pseudo-elements.

use std::ops::Deref;

use dom_query::NodeRef;

use crate::css;
use crate::document::Document;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::text::{RegexOptions, TextHandler, TextHandlers};

/// One item of a [`Selection`]: an element handle or a piece of text
/// produced by `::text` / `::attr(name)`.
#[derive(Debug, Clone)]
pub enum SelectionItem<'a> {
    /// An element handle.
    Element(Element<'a>),
    /// A text value.
    Text(TextHandler),
}

impl<'a> SelectionItem<'a> {
    /// The element, when this item is one.
    #[must_use]
    pub fn as_element(&self) -> Option<Element<'a>> {
        match self {
            SelectionItem::Element(element) => Some(*element),
            SelectionItem::Text(_) => None,
        }
    }

    /// The text, when this item is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&TextHandler> {
        match self {
            SelectionItem::Element(_) => None,
            SelectionItem::Text(text) => Some(text),
        }
    }
}

/// The outcome of a `css`/`xpath` call.
///
/// - every comma branch ends in `::text`/`::attr(...)` -> [`Strings`](Self::Strings)
/// - no branch does -> [`Elements`](Self::Elements)
/// - branches mix -> [`Mixed`](Self::Mixed), an opaque ordered sequence
#[derive(Debug, Clone)]
pub enum Selection<'a> {
    /// Element results.
    Elements(Elements<'a>),
    /// Text results.
    Strings(TextHandlers),
    /// Branches disagreed; items are in branch order.
    Mixed(Vec<SelectionItem<'a>>),
}

impl<'a> Selection<'a> {
    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Selection::Elements(elements) => elements.len(),
            Selection::Strings(strings) => strings.len(),
            Selection::Mixed(items) => items.len(),
        }
    }

    /// True when nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element results, when this is the element variant.
    #[must_use]
    pub fn as_elements(&self) -> Option<&Elements<'a>> {
        match self {
            Selection::Elements(elements) => Some(elements),
            _ => None,
        }
    }

    /// Consume into element results.
    #[must_use]
    pub fn into_elements(self) -> Option<Elements<'a>> {
        match self {
            Selection::Elements(elements) => Some(elements),
            _ => None,
        }
    }

    /// The text results, when this is the string variant.
    #[must_use]
    pub fn as_strings(&self) -> Option<&TextHandlers> {
        match self {
            Selection::Strings(strings) => Some(strings),
            _ => None,
        }
    }

    /// Consume into text results.
    #[must_use]
    pub fn into_strings(self) -> Option<TextHandlers> {
        match self {
            Selection::Strings(strings) => Some(strings),
            _ => None,
        }
    }

    /// First item, regardless of variant.
    #[must_use]
    pub fn into_first(self) -> Option<SelectionItem<'a>> {
        match self {
            Selection::Elements(elements) => {
                elements.into_iter().next().map(SelectionItem::Element)
            }
            Selection::Strings(strings) => {
                strings.into_iter().next().map(SelectionItem::Text)
            }
            Selection::Mixed(items) => items.into_iter().next(),
        }
    }

    /// Consume into a flat item sequence, preserving order.
    #[must_use]
    pub fn into_items(self) -> Vec<SelectionItem<'a>> {
        match self {
            Selection::Elements(elements) => elements
                .into_iter()
                .map(SelectionItem::Element)
                .collect(),
            Selection::Strings(strings) => {
                strings.into_iter().map(SelectionItem::Text).collect()
            }
            Selection::Mixed(items) => items,
        }
    }
}

/// An ordered collection of element handles.
#[derive(Debug, Clone, Default)]
pub struct Elements<'a> {
    items: Vec<Element<'a>>,
}

impl<'a> Elements<'a> {
    /// Build a collection from handles, which must all belong to the same
    /// document.
    pub fn new(items: Vec<Element<'a>>) -> Result<Self> {
        if let Some(first) = items.first() {
            let doc = first.document();
            if items
                .iter()
                .any(|el| !std::ptr::eq(el.document(), doc))
            {
                return Err(Error::MixedDocument);
            }
        }
        Ok(Self { items })
    }

    pub(crate) fn from_vec(items: Vec<Element<'a>>) -> Self {
        Self { items }
    }

    pub(crate) fn from_nodes(nodes: Vec<NodeRef<'a>>, doc: &'a Document) -> Self {
        Self {
            items: nodes
                .into_iter()
                .map(|node| Element::new(node, doc))
                .collect(),
        }
    }

    /// First handle, if any.
    #[must_use]
    pub fn first(&self) -> Option<Element<'a>> {
        self.items.first().copied()
    }

    /// Number of handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Execute a CSS selector on each handle and concatenate the results,
    /// preserving per-handle order.
    pub fn css(&self, selector: &str) -> Result<Selection<'a>> {
        let compiled = css::compile(selector)?;
        let mut merged: Vec<SelectionItem<'a>> = Vec::new();
        for element in &self.items {
            merged.extend(element.css(selector)?.into_items());
        }
        Ok(css::assemble(merged, compiled.shape()))
    }

    /// First CSS match across the contained handles.
    pub fn css_first(&self, selector: &str) -> Result<Option<SelectionItem<'a>>> {
        for element in &self.items {
            if let Some(item) = element.css_first(selector)? {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Execute an XPath expression on each handle and concatenate.
    pub fn xpath(&self, expression: &str) -> Result<Selection<'a>> {
        let mut merged: Vec<SelectionItem<'a>> = Vec::new();
        let mut shape: Option<css::Shape> = None;
        for element in &self.items {
            let selection = element.xpath(expression)?;
            shape.get_or_insert(match &selection {
                Selection::Elements(_) => css::Shape::Elements,
                Selection::Strings(_) => css::Shape::Strings,
                Selection::Mixed(_) => css::Shape::Mixed,
            });
            merged.extend(selection.into_items());
        }
        Ok(css::assemble(merged, shape.unwrap_or(css::Shape::Elements)))
    }

    /// First XPath result across the contained handles.
    pub fn xpath_first(&self, expression: &str) -> Result<Option<SelectionItem<'a>>> {
        for element in &self.items {
            if let Some(item) = element.xpath_first(expression)? {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Run a regex over each handle's text and flatten the matches.
    pub fn re(&self, pattern: &str, opts: &RegexOptions) -> Result<TextHandlers> {
        let mut out = TextHandlers::default();
        for element in &self.items {
            for found in element.re(pattern, opts)? {
                out.push(found);
            }
        }
        Ok(out)
    }

    /// First regex match from the first handle that yields one.
    pub fn re_first(&self, pattern: &str, opts: &RegexOptions) -> Result<Option<TextHandler>> {
        for element in &self.items {
            if let Some(found) = element.re_first(pattern, opts)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// First handle for which the predicate holds.
    #[must_use]
    pub fn search(&self, predicate: impl Fn(&Element<'a>) -> bool) -> Option<Element<'a>> {
        self.items.iter().find(|el| predicate(el)).copied()
    }

    /// All handles for which the predicate holds.
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&Element<'a>) -> bool) -> Elements<'a> {
        Elements::from_vec(
            self.items
                .iter()
                .filter(|el| predicate(el))
                .copied()
                .collect(),
        )
    }
}

impl<'a> Deref for Elements<'a> {
    type Target = [Element<'a>];

    fn deref(&self) -> &[Element<'a>] {
        &self.items
    }
}

impl<'a> IntoIterator for Elements<'a> {
    type Item = Element<'a>;
    type IntoIter = std::vec::IntoIter<Element<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, 'b> IntoIterator for &'b Elements<'a> {
    type Item = &'b Element<'a>;
    type IntoIter = std::slice::Iter<'b, Element<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
