//! The element handle.
//!
//! [`Element`] wraps one node of a parsed [`Document`](crate::Document) and
//! carries every user-facing operation: navigation, text extraction,
//! attribute access, CSS/XPath selection, the filter and text search
//! engines, selector generation, and the adaptive save/retrieve/relocate
//! calls. Handles are cheap to copy; two handles are equal when they wrap
//! the same node of the same document.

use std::fmt;

use dom_query::NodeRef;

use crate::attributes::Attributes;
use crate::css;
use crate::dom;
use crate::document::Document;
use crate::elements::{Elements, Selection, SelectionItem};
use crate::error::Result;
use crate::find::Filter;
use crate::fingerprint::Fingerprint;
use crate::relocate;
use crate::search::{self, RegexSearchOptions, SimilarOptions, TextSearchOptions};
use crate::selector_gen;
use crate::storage::StorageBackend;
use crate::text::{RegexOptions, TextHandler, TextHandlers};
use crate::xpath;

/// Options for [`Element::get_all_text`].
#[derive(Debug, Clone)]
pub struct AllTextOptions {
    /// Separator placed between text pieces.
    pub separator: String,
    /// Strip each piece before joining.
    pub strip: bool,
    /// Subtrees rooted at these tags are skipped entirely.
    pub ignore_tags: Vec<String>,
    /// Drop empty and whitespace-only pieces before joining.
    pub valid_values: bool,
}

impl Default for AllTextOptions {
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
            strip: false,
            ignore_tags: vec!["script".to_string(), "style".to_string()],
            valid_values: true,
        }
    }
}

/// Tags serialized without a closing tag by [`Element::prettify`].
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// A handle to one element of a parsed document.
#[derive(Clone, Copy)]
pub struct Element<'a> {
    node: NodeRef<'a>,
    doc: &'a Document,
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag().as_str())
            .field("order", &self.doc.order_of(self.node.id))
            .finish()
    }
}

impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.node.id == other.node.id
    }
}

impl<'a> Element<'a> {
    pub(crate) fn new(node: NodeRef<'a>, doc: &'a Document) -> Self {
        Self { node, doc }
    }

    pub(crate) fn node(&self) -> NodeRef<'a> {
        self.node
    }

    pub(crate) fn document(&self) -> &'a Document {
        self.doc
    }

    /// True when this handle wraps the document's root element.
    #[must_use]
    pub fn is_root(&self) -> bool {
        dom::is_root_element(&self.node)
    }

    // === Properties ===

    /// Lowercase tag name.
    #[must_use]
    pub fn tag(&self) -> TextHandler {
        TextHandler::new(dom::tag_name(&self.node).unwrap_or_default())
    }

    /// The element's direct text children, concatenated. Descendant text is
    /// not included; see [`get_all_text`](Self::get_all_text) for that.
    #[must_use]
    pub fn text(&self) -> TextHandler {
        TextHandler::new(dom::direct_text(&self.node))
    }

    /// Snapshot of the element's attributes, in source order.
    #[must_use]
    pub fn attrs(&self) -> Attributes {
        Attributes::new(dom::attributes(&self.node))
    }

    /// Value of one attribute.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<TextHandler> {
        dom::attribute(&self.node, name).map(TextHandler::new)
    }

    /// True if the attribute exists.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        dom::attribute(&self.node, name).is_some()
    }

    /// Exact token match against the `class` attribute.
    #[must_use]
    pub fn has_class(&self, name: &str) -> bool {
        dom::attribute(&self.node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|token| token == name))
    }

    /// The element's outer HTML, re-serialized.
    #[must_use]
    pub fn html_content(&self) -> TextHandler {
        TextHandler::new(dom::outer_html(&self.node))
    }

    /// On the root handle, the document's original source text; on inner
    /// elements, the same as [`html_content`](Self::html_content).
    #[must_use]
    pub fn body(&self) -> TextHandler {
        if self.is_root() {
            self.doc.source()
        } else {
            self.html_content()
        }
    }

    /// Parse content as JSON: the original raw body on the root handle
    /// (which supports non-HTML payloads), the direct text elsewhere.
    pub fn json(&self) -> Result<serde_json::Value> {
        if self.is_root() {
            self.doc.source().json()
        } else {
            self.text().json()
        }
    }

    // === Navigation ===

    /// All ancestors, nearest first. Excludes self.
    #[must_use]
    pub fn path(&self) -> Elements<'a> {
        self.wrap_nodes(dom::ancestor_elements(&self.node))
    }

    /// Parent element, or `None` on the root handle.
    #[must_use]
    pub fn parent(&self) -> Option<Element<'a>> {
        dom::parent_element(&self.node).map(|node| Element::new(node, self.doc))
    }

    /// Element children, in document order.
    #[must_use]
    pub fn children(&self) -> Elements<'a> {
        self.wrap_nodes(dom::element_children(&self.node))
    }

    /// Element siblings under the same parent, excluding self.
    #[must_use]
    pub fn siblings(&self) -> Elements<'a> {
        self.wrap_nodes(dom::element_siblings(&self.node))
    }

    /// Adjacent element sibling after this one.
    #[must_use]
    pub fn next(&self) -> Option<Element<'a>> {
        dom::next_element_sibling(&self.node).map(|node| Element::new(node, self.doc))
    }

    /// Adjacent element sibling before this one.
    #[must_use]
    pub fn previous(&self) -> Option<Element<'a>> {
        dom::prev_element_sibling(&self.node).map(|node| Element::new(node, self.doc))
    }

    /// All descendant elements in document order, excluding self.
    #[must_use]
    pub fn below_elements(&self) -> Elements<'a> {
        self.wrap_nodes(dom::descendant_elements(&self.node))
    }

    /// Iterate over ancestors, nearest first.
    pub fn iterancestors(&self) -> impl Iterator<Item = Element<'a>> + '_ {
        dom::ancestor_elements(&self.node)
            .into_iter()
            .map(move |node| Element::new(node, self.doc))
    }

    /// First ancestor for which the predicate holds.
    #[must_use]
    pub fn find_ancestor(&self, predicate: impl Fn(&Element<'a>) -> bool) -> Option<Element<'a>> {
        self.iterancestors().find(|ancestor| predicate(ancestor))
    }

    // === Text extraction ===

    /// Depth-first concatenation of descendant text.
    ///
    /// Subtrees rooted at `ignore_tags` are skipped; `valid_values` drops
    /// whitespace-only pieces; `strip` trims each piece before joining.
    #[must_use]
    pub fn get_all_text(&self, opts: &AllTextOptions) -> TextHandler {
        let mut pieces = Vec::new();
        collect_text(&self.node, opts, &mut pieces);
        TextHandler::new(pieces.join(&opts.separator))
    }

    /// Run a regex over the element's direct text; see [`TextHandler::re`].
    pub fn re(&self, pattern: &str, opts: &RegexOptions) -> Result<TextHandlers> {
        self.text().re(pattern, opts)
    }

    /// First regex match over the element's direct text.
    pub fn re_first(&self, pattern: &str, opts: &RegexOptions) -> Result<Option<TextHandler>> {
        self.text().re_first(pattern, opts)
    }

    /// Re-serialize the subtree with indentation.
    #[must_use]
    pub fn prettify(&self) -> TextHandler {
        let mut out = String::new();
        prettify_node(&self.node, 0, &mut out);
        TextHandler::new(out)
    }

    /// Resolve a relative reference against the document's URL.
    ///
    /// Without a document URL the input is returned unchanged.
    #[must_use]
    pub fn urljoin(&self, relative: &str) -> TextHandler {
        match self.doc.url().and_then(|base| base.join(relative).ok()) {
            Some(resolved) => TextHandler::new(resolved.to_string()),
            None => TextHandler::new(relative),
        }
    }

    // === Selection ===

    /// Execute a CSS selector against this element's subtree.
    ///
    /// Supports the `::text` and `::attr(name)` pseudo-elements and the
    /// `:contains(...)` pseudo-class on top of standard CSS; the result
    /// container follows the selector per the rules on [`Selection`].
    pub fn css(&self, selector: &str) -> Result<Selection<'a>> {
        self.css_with(selector, &css::QueryOptions::default())
    }

    /// First CSS match, or `None`.
    pub fn css_first(&self, selector: &str) -> Result<Option<SelectionItem<'a>>> {
        self.css_first_with(selector, &css::QueryOptions::default())
    }

    /// [`css`](Self::css) with adaptive options (`auto_save`, `adaptive`,
    /// `identifier`).
    pub fn css_with(&self, selector: &str, opts: &css::QueryOptions) -> Result<Selection<'a>> {
        css::query(self, selector, opts)
    }

    /// [`css_first`](Self::css_first) with adaptive options.
    pub fn css_first_with(
        &self,
        selector: &str,
        opts: &css::QueryOptions,
    ) -> Result<Option<SelectionItem<'a>>> {
        Ok(css::query(self, selector, opts)?.into_first())
    }

    /// Execute an XPath expression with this element as the context node.
    pub fn xpath(&self, expression: &str) -> Result<Selection<'a>> {
        xpath::query(self, expression)
    }

    /// First XPath result, or `None`.
    pub fn xpath_first(&self, expression: &str) -> Result<Option<SelectionItem<'a>>> {
        Ok(xpath::query(self, expression)?.into_first())
    }

    // === Filter search ===

    /// Run the waterfall filter over this element's descendants and return
    /// every element that survives all stages, in document order.
    #[must_use]
    pub fn find_all(&self, filter: &Filter) -> Elements<'a> {
        crate::find::find_all(self, filter)
    }

    /// First element surviving the waterfall filter.
    #[must_use]
    pub fn find(&self, filter: &Filter) -> Option<Element<'a>> {
        crate::find::find_all(self, filter).into_iter().next()
    }

    // === Text & similarity search ===

    /// Elements whose aggregate text matches `query`, in document order.
    #[must_use]
    pub fn find_by_text(&self, query: &str, opts: &TextSearchOptions) -> Elements<'a> {
        search::find_by_text(self, query, opts)
    }

    /// Elements whose aggregate text matches the regex, in document order.
    pub fn find_by_regex(
        &self,
        pattern: &str,
        opts: &RegexSearchOptions,
    ) -> Result<Elements<'a>> {
        search::find_by_regex(self, pattern, opts)
    }

    /// Elements structurally similar to this one within the same document:
    /// same depth, same tag and parent chain, and an attribute set scoring
    /// at or above the threshold. Excludes self.
    #[must_use]
    pub fn find_similar(&self, opts: &SimilarOptions) -> Elements<'a> {
        search::find_similar(self, opts)
    }

    // === Selector generation ===

    /// Shortest CSS selector for this element; anchors on a unique `#id`
    /// when one exists, otherwise falls back to the full structural path.
    #[must_use]
    pub fn generate_css_selector(&self) -> TextHandler {
        TextHandler::new(selector_gen::css_selector(self, false))
    }

    /// Full `body > ... > tag` CSS chain.
    #[must_use]
    pub fn generate_full_css_selector(&self) -> TextHandler {
        TextHandler::new(selector_gen::css_selector(self, true))
    }

    /// Shortest XPath for this element; prefers an `//*[@id='...']` anchor.
    #[must_use]
    pub fn generate_xpath_selector(&self) -> TextHandler {
        TextHandler::new(selector_gen::xpath_selector(self, false))
    }

    /// Full structural XPath from `body`.
    #[must_use]
    pub fn generate_full_xpath_selector(&self) -> TextHandler {
        TextHandler::new(selector_gen::xpath_selector(self, true))
    }

    // === Adaptive ===

    /// Persist this element's fingerprint under `identifier` in the
    /// document's storage domain.
    pub fn save(&self, identifier: &str) -> Result<()> {
        let backend = self.doc.storage_backend()?;
        let fingerprint = Fingerprint::from_element(self);
        backend.save(&self.doc.domain(), identifier, &fingerprint)
    }

    /// Load the fingerprint stored under `identifier`, if any.
    pub fn retrieve(&self, identifier: &str) -> Result<Option<Fingerprint>> {
        let backend: &std::sync::Arc<dyn StorageBackend> = self.doc.storage_backend()?;
        backend.retrieve(&self.doc.domain(), identifier)
    }

    /// Rank this document's elements against a fingerprint and return the
    /// candidates best-score first. An empty result is a normal no-match,
    /// not an error.
    #[must_use]
    pub fn relocate(&self, fingerprint: &Fingerprint) -> Elements<'a> {
        let ranked = relocate::rank(self.doc, fingerprint);
        self.wrap_nodes(ranked.into_iter().map(|(node, _)| node).collect())
    }

    /// [`relocate`](Self::relocate) with custom scoring weights.
    #[must_use]
    pub fn relocate_with(
        &self,
        fingerprint: &Fingerprint,
        weights: &crate::relocate::ScoreWeights,
    ) -> Elements<'a> {
        let ranked = relocate::rank_with(self.doc, fingerprint, weights);
        self.wrap_nodes(ranked.into_iter().map(|(node, _)| node).collect())
    }

    fn wrap_nodes(&self, nodes: Vec<NodeRef<'a>>) -> Elements<'a> {
        Elements::from_nodes(nodes, self.doc)
    }
}

fn collect_text(node: &NodeRef<'_>, opts: &AllTextOptions, pieces: &mut Vec<String>) {
    for child in dom::child_nodes(node) {
        if child.is_text() {
            let mut piece = dom::text_content(&child);
            if opts.strip {
                piece = piece.trim().to_string();
            }
            if opts.valid_values && piece.trim().is_empty() {
                continue;
            }
            pieces.push(piece);
        } else if child.is_element() {
            let tag = dom::tag_name(&child).unwrap_or_default();
            if opts.ignore_tags.iter().any(|ignored| ignored == &tag) {
                continue;
            }
            collect_text(&child, opts, pieces);
        }
    }
}

fn prettify_node(node: &NodeRef<'_>, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    let Some(tag) = dom::tag_name(node) else {
        return;
    };

    out.push_str(&pad);
    out.push('<');
    out.push_str(&tag);
    for (name, value) in &dom::attributes(node) {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&tag.as_str()) {
        out.push('\n');
        return;
    }
    out.push('\n');

    for child in dom::child_nodes(node) {
        if child.is_text() {
            let text = dom::text_content(&child);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push_str(&"  ".repeat(indent + 1));
                out.push_str(trimmed);
                out.push('\n');
            }
        } else if child.is_element() {
            prettify_node(&child, indent + 1, out);
        }
    }

    out.push_str(&pad);
    out.push_str("</");
    out.push_str(&tag);
    out.push_str(">\n");
}
