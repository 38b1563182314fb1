//! XPath 1.0 (practical subset) execution over parsed documents.
//!
//! Expressions are tokenized and parsed once ([`parser`]), cached by
//! source string, and evaluated against the dom_query tree ([`eval`]).
//! The result container mirrors the CSS contract: an element node-set
//! becomes [`Selection::Elements`], attribute or text results become
//! [`Selection::Strings`], and scalar results (e.g. `count(//a)`) are
//! returned as a single string.

mod ast;
mod eval;
mod parser;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use self::ast::Expr;
use self::eval::{Evaluator, NodeItem, Value};

use crate::element::Element;
use crate::elements::{Elements, Selection, SelectionItem};
use crate::error::{Error, Result};
use crate::text::{TextHandler, TextHandlers};

static CACHE: LazyLock<Mutex<HashMap<String, Arc<Expr>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn compile(source: &str) -> Result<Arc<Expr>> {
    {
        let cache = lock_cache();
        if let Some(hit) = cache.get(source) {
            log::trace!("xpath cache hit: {source:?}");
            return Ok(Arc::clone(hit));
        }
    }

    let expr = parser::parse(source).map_err(|message| Error::InvalidSelector {
        selector: source.to_string(),
        message,
    })?;
    log::debug!("parsed xpath: {source:?}");
    let expr = Arc::new(expr);
    lock_cache().insert(source.to_string(), Arc::clone(&expr));
    Ok(expr)
}

fn lock_cache() -> std::sync::MutexGuard<'static, HashMap<String, Arc<Expr>>> {
    CACHE
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Execute an XPath expression with `element` as the context node.
pub(crate) fn query<'a>(element: &Element<'a>, source: &str) -> Result<Selection<'a>> {
    let expr = compile(source)?;
    let doc = element.document();
    let evaluator = Evaluator::new(doc, element.node());
    let value = evaluator
        .evaluate(&expr)
        .map_err(|message| Error::InvalidSelector {
            selector: source.to_string(),
            message,
        })?;

    Ok(match value {
        Value::Nodes(items) => nodes_to_selection(items, element),
        Value::Str(text) => Selection::Strings(TextHandlers::new(vec![TextHandler::new(text)])),
        Value::Num(number) => Selection::Strings(TextHandlers::new(vec![TextHandler::new(
            eval::format_number(number),
        )])),
        Value::Bool(flag) => {
            Selection::Strings(TextHandlers::new(vec![TextHandler::new(flag.to_string())]))
        }
    })
}

fn nodes_to_selection<'a>(items: Vec<NodeItem<'a>>, element: &Element<'a>) -> Selection<'a> {
    let doc = element.document();
    let all_elements = items
        .iter()
        .all(|item| matches!(item, NodeItem::Element(_)));
    let no_elements = items
        .iter()
        .all(|item| !matches!(item, NodeItem::Element(_)));

    if all_elements {
        let nodes = items
            .into_iter()
            .filter_map(|item| match item {
                NodeItem::Element(node) => Some(node),
                _ => None,
            })
            .collect();
        return Selection::Elements(Elements::from_nodes(nodes, doc));
    }

    if no_elements {
        let strings = items
            .iter()
            .map(|item| TextHandler::new(item.string_value()))
            .collect();
        return Selection::Strings(TextHandlers::new(strings));
    }

    Selection::Mixed(
        items
            .into_iter()
            .map(|item| match item {
                NodeItem::Element(node) => {
                    SelectionItem::Element(Element::new(node, doc))
                }
                other => SelectionItem::Text(TextHandler::new(other.string_value())),
            })
            .collect(),
    )
}
