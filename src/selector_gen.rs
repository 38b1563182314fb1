//! Unique-selector generation for element handles.
//!
//! Walks the ancestor chain recording one identifying fragment per level:
//! a document-unique `#id` anchors (and, in the short form, stops) the
//! walk, a class token unique for the tag beats a positional index, and
//! `tag:nth-of-type(k)` is the structural fallback. The short form is only
//! guaranteed unique when an id or class anchor exists; without one it is
//! structurally correct but may match siblings of identical shape.

use dom_query::NodeRef;

use crate::dom;
use crate::document::Document;
use crate::element::Element;

/// Generate a CSS selector for the element.
pub(crate) fn css_selector(element: &Element<'_>, full: bool) -> String {
    let doc = element.document();
    let mut fragments: Vec<String> = Vec::new();
    let mut current = Some(element.node());

    while let Some(node) = current {
        let Some(tag) = dom::tag_name(&node) else {
            break;
        };
        if tag == "html" {
            break;
        }
        if tag == "body" {
            fragments.push("body".to_string());
            break;
        }

        if let Some(id) = dom::attribute(&node, "id") {
            if id_is_unique(doc, &id) {
                fragments.push(format!("#{id}"));
                if full {
                    current = dom::parent_element(&node);
                    continue;
                }
                break;
            }
        }

        if let Some(class) = unique_class_for_tag(doc, &node, &tag) {
            fragments.push(format!("{tag}.{class}"));
        } else {
            fragments.push(positional_css_fragment(&node, &tag));
        }
        current = dom::parent_element(&node);
    }

    if fragments.is_empty() {
        return "html".to_string();
    }
    fragments.reverse();
    fragments.join(" > ")
}

/// Generate an XPath expression for the element.
pub(crate) fn xpath_selector(element: &Element<'_>, full: bool) -> String {
    let doc = element.document();
    let mut steps: Vec<String> = Vec::new();
    let mut current = Some(element.node());

    while let Some(node) = current {
        let Some(tag) = dom::tag_name(&node) else {
            break;
        };
        if tag == "html" {
            break;
        }

        if !full {
            if let Some(id) = dom::attribute(&node, "id") {
                if id_is_unique(doc, &id) {
                    steps.reverse();
                    let anchor = format!("//*[@id='{id}']");
                    return if steps.is_empty() {
                        anchor
                    } else {
                        format!("{anchor}/{}", steps.join("/"))
                    };
                }
            }
        }

        if tag == "body" {
            steps.push("body".to_string());
            break;
        }
        steps.push(positional_xpath_step(&node, &tag));
        current = dom::parent_element(&node);
    }

    if steps.is_empty() {
        return "//html".to_string();
    }
    steps.reverse();
    format!("//{}", steps.join("/"))
}

fn positional_css_fragment(node: &NodeRef<'_>, tag: &str) -> String {
    if dom::same_tag_sibling_count(node) > 1 {
        format!("{tag}:nth-of-type({})", dom::same_tag_index(node))
    } else {
        tag.to_string()
    }
}

fn positional_xpath_step(node: &NodeRef<'_>, tag: &str) -> String {
    if dom::same_tag_sibling_count(node) > 1 {
        format!("{tag}[{}]", dom::same_tag_index(node))
    } else {
        tag.to_string()
    }
}

/// True when exactly one element in the document carries this id.
fn id_is_unique(doc: &Document, id: &str) -> bool {
    let root = doc.root().node();
    let mut count = usize::from(dom::attribute(&root, "id").as_deref() == Some(id));
    for node in dom::descendant_elements(&root) {
        if dom::attribute(&node, "id").as_deref() == Some(id) {
            count += 1;
            if count > 1 {
                return false;
            }
        }
    }
    count == 1
}

/// First class token that only this element carries among same-tag
/// elements in the document.
fn unique_class_for_tag(doc: &Document, node: &NodeRef<'_>, tag: &str) -> Option<String> {
    let class_attr = dom::attribute(node, "class")?;
    let root = doc.root().node();
    let mut all = vec![root];
    all.extend(dom::descendant_elements(&root));

    for token in class_attr.split_whitespace() {
        let count = all
            .iter()
            .filter(|candidate| {
                dom::tag_name(candidate).as_deref() == Some(tag)
                    && dom::attribute(candidate, "class").is_some_and(|classes| {
                        classes.split_whitespace().any(|t| t == token)
                    })
            })
            .count();
        if count == 1 {
            return Some(token.to_string());
        }
    }
    None
}
