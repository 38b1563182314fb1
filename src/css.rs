//! CSS selector compilation and execution.
//!
//! Standard CSS3 is compiled straight to a `dom_query::Matcher`. Two
//! non-standard pseudo-elements (`::text`, `::attr(name)`) and the
//! `:contains(...)` pseudo-class are peeled off by a preprocessing pass:
//! the pseudo-element tail decides the result container, and `:contains`
//! becomes a text post-filter over the matched nodes. Compiled selectors
//! are cached by source string, so repeated queries on large pages skip
//! the selector parser.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use dom_query::{Matcher, NodeRef, Selection as DomSelection};
use regex::Regex;

use crate::dom;
use crate::element::Element;
use crate::elements::{Elements, Selection, SelectionItem};
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::relocate;
use crate::text::{TextHandler, TextHandlers};

#[allow(clippy::expect_used)]
static ATTR_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::attr\(\s*([^)]*?)\s*\)\s*$").expect("valid regex"));

static CACHE: LazyLock<Mutex<HashMap<String, Arc<CompiledSelector>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Adaptive options accepted by `css_with`/`css_first_with`.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Persist the first match's fingerprint under `identifier` (or the
    /// selector text when no identifier is given).
    pub auto_save: bool,
    /// On an empty result, load the persisted fingerprint and relocate.
    pub adaptive: bool,
    /// Storage identifier; defaults to the selector text.
    pub identifier: Option<String>,
}

/// What container a selector produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Elements,
    Strings,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tail {
    None,
    Text,
    Attr(String),
}

#[derive(Debug)]
struct Branch {
    matcher: Matcher,
    contains: Vec<String>,
    tail: Tail,
}

/// A comma-separated selector, preprocessed and compiled per branch.
#[derive(Debug)]
pub(crate) struct CompiledSelector {
    branches: Vec<Branch>,
    shape: Shape,
}

impl CompiledSelector {
    pub(crate) fn shape(&self) -> Shape {
        self.shape
    }
}

/// Compile (or fetch from cache) a selector string.
pub(crate) fn compile(source: &str) -> Result<Arc<CompiledSelector>> {
    {
        let cache = lock_cache();
        if let Some(hit) = cache.get(source) {
            log::trace!("selector cache hit: {source:?}");
            return Ok(Arc::clone(hit));
        }
    }

    let compiled = Arc::new(compile_uncached(source)?);
    lock_cache().insert(source.to_string(), Arc::clone(&compiled));
    Ok(compiled)
}

fn lock_cache() -> std::sync::MutexGuard<'static, HashMap<String, Arc<CompiledSelector>>> {
    CACHE
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn compile_uncached(source: &str) -> Result<CompiledSelector> {
    let mut branches = Vec::new();
    for raw_branch in split_top_level_commas(source) {
        let branch = raw_branch.trim();
        if branch.is_empty() {
            return Err(invalid(source, "empty selector branch"));
        }

        let (rest, tail) = strip_tail(branch);
        let (rest, contains) = strip_contains(&rest);
        let rest = if rest.trim().is_empty() {
            "*".to_string()
        } else {
            rest.trim().to_string()
        };

        let matcher = Matcher::new(&rest)
            .map_err(|err| invalid(source, &format!("{err:?}")))?;
        branches.push(Branch {
            matcher,
            contains,
            tail,
        });
    }

    if branches.is_empty() {
        return Err(invalid(source, "empty selector"));
    }

    let shape = if branches.iter().all(|b| b.tail == Tail::None) {
        Shape::Elements
    } else if branches.iter().all(|b| b.tail != Tail::None) {
        Shape::Strings
    } else {
        Shape::Mixed
    };

    Ok(CompiledSelector { branches, shape })
}

fn invalid(selector: &str, message: &str) -> Error {
    Error::InvalidSelector {
        selector: selector.to_string(),
        message: message.to_string(),
    }
}

/// Split on commas that are not inside parentheses, brackets, or quotes.
fn split_top_level_commas(source: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in source.chars() {
        match (quote, ch) {
            (Some(q), _) if ch == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    parts.push(current);
    parts
}

/// Peel a trailing `::text` or `::attr(name)` off the branch.
fn strip_tail(branch: &str) -> (String, Tail) {
    let trimmed = branch.trim_end();
    if let Some(rest) = trimmed.strip_suffix("::text") {
        return (rest.to_string(), Tail::Text);
    }
    if let Some(caps) = ATTR_TAIL_RE.captures(trimmed) {
        let name = caps[1].to_lowercase();
        let rest = trimmed[..caps.get(0).map_or(0, |m| m.start())].to_string();
        return (rest, Tail::Attr(name));
    }
    (trimmed.to_string(), Tail::None)
}

/// Lift every `:contains(...)` occurrence out of the branch.
fn strip_contains(branch: &str) -> (String, Vec<String>) {
    let mut rest = branch.to_string();
    let mut needles = Vec::new();

    while let Some(start) = rest.find(":contains(") {
        let open = start + ":contains(".len();
        let Some(close) = find_balanced_close(&rest[open..]) else {
            break;
        };
        let inner = rest[open..open + close].trim();
        let needle = inner
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
            .unwrap_or(inner);
        needles.push(needle.to_string());
        rest.replace_range(start..open + close + 1, "");
    }

    (rest, needles)
}

/// Offset of the parenthesis closing the group that starts at offset 0.
fn find_balanced_close(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (index, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), _) if ch == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => {
                if depth == 0 {
                    return Some(index);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

/// Execute a selector against one element, applying adaptive options.
pub(crate) fn query<'a>(
    element: &Element<'a>,
    source: &str,
    opts: &QueryOptions,
) -> Result<Selection<'a>> {
    let compiled = compile(source)?;
    let doc = element.document();

    let mut items: Vec<SelectionItem<'a>> = Vec::new();
    let mut matched_elements: Vec<NodeRef<'a>> = Vec::new();

    for branch in &compiled.branches {
        // The root handle searches from the document node so that the root
        // element itself can match (e.g. `css("*")` includes `<html>`).
        let scope = if element.is_root() {
            DomSelection::from(doc.doc_node())
        } else {
            DomSelection::from(element.node())
        };

        let mut nodes: Vec<NodeRef<'a>> = scope.select_matcher(&branch.matcher).nodes().to_vec();
        if !branch.contains.is_empty() {
            nodes.retain(|node| {
                let text = dom::full_text(node);
                branch.contains.iter().all(|needle| text.contains(needle.as_str()))
            });
        }
        matched_elements.extend(nodes.iter().copied());

        match &branch.tail {
            Tail::None => {
                items.extend(
                    nodes
                        .into_iter()
                        .map(|node| SelectionItem::Element(Element::new(node, doc))),
                );
            }
            Tail::Text => {
                for node in nodes {
                    for child in dom::child_nodes(&node) {
                        if child.is_text() {
                            items.push(SelectionItem::Text(TextHandler::new(
                                dom::text_content(&child),
                            )));
                        }
                    }
                }
            }
            Tail::Attr(name) => {
                for node in nodes {
                    if let Some(value) = dom::attribute(&node, name) {
                        items.push(SelectionItem::Text(TextHandler::new(value)));
                    }
                }
            }
        }
    }

    if opts.auto_save {
        if let Some(first) = matched_elements.first() {
            let backend = doc.storage_backend()?;
            let identifier = opts.identifier.clone().unwrap_or_else(|| source.to_string());
            backend.save(&doc.domain(), &identifier, &Fingerprint::from_node(first))?;
        }
    }

    if items.is_empty() && opts.adaptive {
        let backend = doc.storage_backend()?;
        let identifier = opts.identifier.clone().unwrap_or_else(|| source.to_string());
        if let Some(fingerprint) = backend.retrieve(&doc.domain(), &identifier)? {
            let ranked = relocate::rank(doc, &fingerprint);
            if !ranked.is_empty() {
                log::debug!(
                    "selector {source:?} relocated via fingerprint {identifier:?} ({} candidates)",
                    ranked.len()
                );
                return Ok(Selection::Elements(Elements::from_nodes(
                    ranked.into_iter().map(|(node, _)| node).collect(),
                    doc,
                )));
            }
        }
    }

    Ok(assemble(items, compiled.shape()))
}

/// Pack items into the container the selector's shape dictates.
pub(crate) fn assemble<'a>(items: Vec<SelectionItem<'a>>, shape: Shape) -> Selection<'a> {
    match shape {
        Shape::Elements => Selection::Elements(Elements::from_vec(
            items
                .into_iter()
                .filter_map(|item| item.as_element())
                .collect(),
        )),
        Shape::Strings => {
            let mut strings = TextHandlers::default();
            for item in items {
                if let SelectionItem::Text(text) = item {
                    strings.push(text);
                }
            }
            Selection::Strings(strings)
        }
        Shape::Mixed => Selection::Mixed(items),
    }
}
