//! Element fingerprints for adaptive relocation.
//!
//! A fingerprint is the persisted descriptor of an element: enough
//! structural and attribute context to re-find the element after the page
//! drifts. The serialized form is a flat JSON object with stable key names,
//! so stores written by older builds keep working.

use dom_query::NodeRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom;
use crate::element::Element;
use crate::text::collapse_whitespace;

/// The persisted descriptor of an element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Lowercase tag name.
    pub tag: String,
    /// Normalized direct text of the element.
    pub text: String,
    /// Attribute name -> value, names lowercased, values verbatim.
    pub attributes: IndexMap<String, String>,
    /// Tag names of all element children of the parent (the element
    /// included), in document order.
    pub sibling_tags: Vec<String>,
    /// Tag names from the element up to the root, root excluded, root-side
    /// last. Its length is the element's depth.
    pub path_tags: Vec<String>,
    /// Parent tag name, or empty for the root element.
    pub parent_tag: String,
    /// Parent's attributes.
    pub parent_attributes: IndexMap<String, String>,
    /// Parent's normalized direct text.
    pub parent_text: String,
}

impl Fingerprint {
    /// Build a fingerprint from an element handle.
    #[must_use]
    pub fn from_element(element: &Element<'_>) -> Fingerprint {
        Self::from_node(&element.node())
    }

    pub(crate) fn from_node(node: &NodeRef<'_>) -> Fingerprint {
        let tag = dom::tag_name(node).unwrap_or_default();
        let text = collapse_whitespace(&dom::direct_text(node));
        let attributes = dom::attributes(node);
        let sibling_tags = dom::sibling_cohort_tags(node);
        let path_tags = path_tags(node);

        let (parent_tag, parent_attributes, parent_text) = match dom::parent_element(node) {
            Some(parent) => (
                dom::tag_name(&parent).unwrap_or_default(),
                dom::attributes(&parent),
                collapse_whitespace(&dom::direct_text(&parent)),
            ),
            None => (String::new(), IndexMap::new(), String::new()),
        };

        Fingerprint {
            tag,
            text,
            attributes,
            sibling_tags,
            path_tags,
            parent_tag,
            parent_attributes,
            parent_text,
        }
    }

    /// Distance from the root element in the source document.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path_tags.len()
    }
}

/// Tags from the node up to (but excluding) the root element, node first.
fn path_tags(node: &NodeRef<'_>) -> Vec<String> {
    if dom::is_root_element(node) {
        return Vec::new();
    }
    let mut tags: Vec<String> = dom::tag_name(node).into_iter().collect();
    for ancestor in dom::ancestor_elements(node) {
        if dom::is_root_element(&ancestor) {
            break;
        }
        if let Some(tag) = dom::tag_name(&ancestor) {
            tags.push(tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn fingerprint_captures_structure() {
        let doc = Document::parse(
            r#"<html><body><div class="wrap" id="w">
                <h3>head</h3>
                <div id="p1" class="product">  Widget  one </div>
                <span>tail</span>
            </div></body></html>"#,
        );
        let root = doc.root();
        let target = root.css_first("#p1").unwrap().unwrap();
        let fp = Fingerprint::from_element(&target.as_element().unwrap());

        assert_eq!(fp.tag, "div");
        assert_eq!(fp.text, "Widget one");
        assert_eq!(fp.attributes.get("id").map(String::as_str), Some("p1"));
        assert_eq!(fp.sibling_tags, vec!["h3", "div", "span"]);
        assert_eq!(fp.path_tags, vec!["div", "div", "body"]);
        assert_eq!(fp.depth(), 3);
        assert_eq!(fp.parent_tag, "div");
        assert_eq!(fp.parent_attributes.get("id").map(String::as_str), Some("w"));
    }

    #[test]
    fn root_fingerprint_has_empty_parent() {
        let doc = Document::parse("<html><body>x</body></html>");
        let root = doc.root();
        let fp = Fingerprint::from_element(&root);
        assert_eq!(fp.tag, "html");
        assert!(fp.path_tags.is_empty());
        assert_eq!(fp.parent_tag, "");
        assert!(fp.parent_attributes.is_empty());
    }

    #[test]
    fn serialized_form_uses_stable_keys() {
        let doc = Document::parse(r#"<html><body><a href="/x">hi</a></body></html>"#);
        let root = doc.root();
        let a = root.css_first("a").unwrap().unwrap();
        let fp = Fingerprint::from_element(&a.as_element().unwrap());
        let json = serde_json::to_value(&fp).unwrap();

        for key in [
            "tag",
            "text",
            "attributes",
            "sibling_tags",
            "path_tags",
            "parent_tag",
            "parent_attributes",
            "parent_text",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        let back: Fingerprint = serde_json::from_value(json).unwrap();
        assert_eq!(back, fp);
    }
}
