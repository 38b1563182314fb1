//! DOM operations adapter.
//!
//! Node-level helpers over the `dom_query` tree. Everything here works on
//! `NodeRef` directly; the public [`Element`](crate::Element) handle is a
//! thin layer over these functions. Traversals are written against
//! `first_child`/`next_sibling` so document order is guaranteed by
//! construction.

use dom_query::{NodeRef, Selection};
use indexmap::IndexMap;
use tendril::StrTendril;

/// Aggregate text of a node, zero-copy from the tree.
fn node_text(node: &NodeRef<'_>) -> StrTendril {
    Selection::from(*node).text()
}

/// All child nodes (elements, text, comments) in document order.
pub(crate) fn child_nodes<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut current = node.first_child();
    while let Some(child) = current {
        current = child.next_sibling();
        out.push(child);
    }
    out
}

/// Element children only, in document order.
pub(crate) fn element_children<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    child_nodes(node).into_iter().filter(NodeRef::is_element).collect()
}

/// Every descendant node in depth-first pre-order, excluding `node` itself.
pub(crate) fn descendant_nodes<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeRef<'a>> = child_nodes(node);
    stack.reverse();
    while let Some(current) = stack.pop() {
        out.push(current);
        let mut children = child_nodes(&current);
        children.reverse();
        stack.extend(children);
    }
    out
}

/// Every descendant element in document order, excluding `node` itself.
pub(crate) fn descendant_elements<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    descendant_nodes(node)
        .into_iter()
        .filter(NodeRef::is_element)
        .collect()
}

/// Lowercase tag name of an element node.
pub(crate) fn tag_name(node: &NodeRef) -> Option<String> {
    node.node_name().map(|name| name.to_lowercase())
}

/// Character data of the element's direct text children, concatenated.
///
/// Descendant element text is not included.
pub(crate) fn direct_text(node: &NodeRef) -> String {
    child_nodes(node)
        .iter()
        .filter(|child| child.is_text())
        .map(|child| node_text(child).to_string())
        .collect()
}

/// All descendant text, in document order.
pub(crate) fn full_text(node: &NodeRef) -> String {
    node_text(node).to_string()
}

/// Content of a text node.
pub(crate) fn text_content(node: &NodeRef) -> String {
    node_text(node).to_string()
}

/// Outer HTML of the node, re-serialized.
pub(crate) fn outer_html(node: &NodeRef) -> String {
    Selection::from(*node).html().to_string()
}

/// Attributes as an ordered name -> value map, names lowercased.
pub(crate) fn attributes(node: &NodeRef) -> IndexMap<String, String> {
    node.attrs()
        .iter()
        .map(|attr| (attr.name.local.to_lowercase(), attr.value.to_string()))
        .collect()
}

/// Value of a single attribute.
pub(crate) fn attribute(node: &NodeRef, name: &str) -> Option<String> {
    node.attr(name).map(|value| value.to_string())
}

/// Element ancestors, nearest first. The document node is not included.
pub(crate) fn ancestor_elements<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        current = parent.parent();
        if parent.is_element() {
            out.push(parent);
        }
    }
    out
}

/// Parent element, if any.
pub(crate) fn parent_element<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    node.parent().filter(NodeRef::is_element)
}

/// Distance from the document root element (`<html>` is at depth 0).
pub(crate) fn depth(node: &NodeRef) -> usize {
    ancestor_elements(node).len()
}

/// True when the node is the document root element.
pub(crate) fn is_root_element(node: &NodeRef) -> bool {
    node.is_element() && node.parent().is_some_and(|parent| !parent.is_element())
}

/// Next element sibling (skipping text nodes).
pub(crate) fn next_element_sibling<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    let mut sibling = node.next_sibling();
    while let Some(s) = sibling {
        if s.is_element() {
            return Some(s);
        }
        sibling = s.next_sibling();
    }
    None
}

/// Previous element sibling (skipping text nodes).
pub(crate) fn prev_element_sibling<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        if s.is_element() {
            return Some(s);
        }
        sibling = s.prev_sibling();
    }
    None
}

/// Element siblings under the same parent, excluding `node`, document order.
pub(crate) fn element_siblings<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    match node.parent() {
        Some(parent) => element_children(&parent)
            .into_iter()
            .filter(|sibling| sibling.id != node.id)
            .collect(),
        None => Vec::new(),
    }
}

/// Tag names of all element children of the node's parent, including the
/// node itself, in document order.
pub(crate) fn sibling_cohort_tags(node: &NodeRef) -> Vec<String> {
    match node.parent() {
        Some(parent) => element_children(&parent)
            .iter()
            .filter_map(tag_name)
            .collect(),
        None => tag_name(node).into_iter().collect(),
    }
}

/// 1-based index of the node among same-tag element siblings.
pub(crate) fn same_tag_index(node: &NodeRef) -> usize {
    let Some(tag) = tag_name(node) else {
        return 1;
    };
    let Some(parent) = node.parent() else {
        return 1;
    };
    let mut index = 0;
    for sibling in element_children(&parent) {
        if tag_name(&sibling).as_deref() == Some(tag.as_str()) {
            index += 1;
            if sibling.id == node.id {
                return index;
            }
        }
    }
    1
}

/// Number of same-tag element siblings (including the node).
pub(crate) fn same_tag_sibling_count(node: &NodeRef) -> usize {
    let Some(tag) = tag_name(node) else {
        return 1;
    };
    let Some(parent) = node.parent() else {
        return 1;
    };
    element_children(&parent)
        .iter()
        .filter(|sibling| tag_name(sibling).as_deref() == Some(tag.as_str()))
        .count()
}
