//! Text, regex, and structural-similarity search.
//!
//! `find_by_text` and `find_by_regex` match elements on their aggregate
//! text. `find_similar` discovers the anchor element's cohort inside the
//! current document: same depth, same local tag structure, similar
//! attribute set. Relocation across documents lives in
//! [`relocate`](crate::relocate) and uses a stored fingerprint instead of
//! a live anchor.

use crate::dom;
use crate::element::{AllTextOptions, Element};
use crate::elements::Elements;
use crate::error::Result;
use crate::similarity::{jaccard_pairs, token_set_ratio};
use crate::text::{collapse_whitespace, compile_pattern};

/// Options for [`Element::find_by_text`].
#[derive(Debug, Clone, Default)]
pub struct TextSearchOptions {
    /// Containment instead of equality.
    pub partial: bool,
    /// Collapse whitespace runs before comparing.
    pub clean_match: bool,
    /// Compare case-sensitively. Off by default.
    pub case_sensitive: bool,
}

/// Options for [`Element::find_by_regex`].
#[derive(Debug, Clone)]
pub struct RegexSearchOptions {
    /// Collapse whitespace runs before matching.
    pub clean_match: bool,
    /// Compile the pattern case-sensitively. On by default.
    pub case_sensitive: bool,
}

impl Default for RegexSearchOptions {
    fn default() -> Self {
        Self {
            clean_match: false,
            case_sensitive: true,
        }
    }
}

/// Options for [`Element::find_similar`].
#[derive(Debug, Clone)]
pub struct SimilarOptions {
    /// Minimum attribute-similarity score to keep a candidate.
    pub similarity_threshold: f64,
    /// Attribute names excluded from scoring. Links and image sources
    /// differ between otherwise identical cards, so they are ignored by
    /// default.
    pub ignore_attributes: Vec<String>,
    /// Also require direct-text similarity.
    pub match_text: bool,
}

impl Default for SimilarOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.2,
            ignore_attributes: vec!["href".to_string(), "src".to_string()],
            match_text: false,
        }
    }
}

/// The text an element is matched on: stripped, blank-free aggregate text.
fn match_target(element: &Element<'_>) -> String {
    element
        .get_all_text(&AllTextOptions {
            strip: true,
            valid_values: true,
            ..AllTextOptions::default()
        })
        .into_string()
}

fn candidates<'a>(element: &Element<'a>) -> Vec<Element<'a>> {
    let doc = element.document();
    let mut out = Vec::new();
    if element.is_root() {
        out.push(*element);
    }
    out.extend(
        dom::descendant_elements(&element.node())
            .into_iter()
            .map(|node| Element::new(node, doc)),
    );
    out
}

/// Keep only the deepest matches: an ancestor whose aggregate text matched
/// solely because a matching descendant sits inside it is noise.
fn deepest_only<'a>(matched: Vec<Element<'a>>) -> Vec<Element<'a>> {
    let ids: std::collections::HashSet<_> =
        matched.iter().map(|el| el.node().id).collect();
    matched
        .into_iter()
        .filter(|el| {
            !dom::descendant_elements(&el.node())
                .iter()
                .any(|descendant| ids.contains(&descendant.id))
        })
        .collect()
}

pub(crate) fn find_by_text<'a>(
    element: &Element<'a>,
    query: &str,
    opts: &TextSearchOptions,
) -> Elements<'a> {
    let mut wanted = query.to_string();
    if opts.clean_match {
        wanted = collapse_whitespace(&wanted);
    }
    if !opts.case_sensitive {
        wanted = wanted.to_lowercase();
    }

    let matched = candidates(element)
        .into_iter()
        .filter(|candidate| {
            let mut text = match_target(candidate);
            if opts.clean_match {
                text = collapse_whitespace(&text);
            }
            if !opts.case_sensitive {
                text = text.to_lowercase();
            }
            if opts.partial {
                text.contains(&wanted)
            } else {
                text == wanted
            }
        })
        .collect();
    Elements::from_vec(deepest_only(matched))
}

pub(crate) fn find_by_regex<'a>(
    element: &Element<'a>,
    pattern: &str,
    opts: &RegexSearchOptions,
) -> Result<Elements<'a>> {
    let re = compile_pattern(pattern, opts.case_sensitive)?;
    let matched = candidates(element)
        .into_iter()
        .filter(|candidate| {
            let mut text = match_target(candidate);
            if opts.clean_match {
                text = collapse_whitespace(&text);
            }
            re.is_match(&text)
        })
        .collect();
    Ok(Elements::from_vec(deepest_only(matched)))
}

pub(crate) fn find_similar<'a>(anchor: &Element<'a>, opts: &SimilarOptions) -> Elements<'a> {
    let doc = anchor.document();
    let anchor_node = anchor.node();
    let anchor_depth = dom::depth(&anchor_node);
    let anchor_tag = dom::tag_name(&anchor_node);
    let parent = dom::parent_element(&anchor_node);
    let parent_tag = parent.as_ref().and_then(dom::tag_name);
    let grandparent_tag = parent
        .as_ref()
        .and_then(dom::parent_element)
        .as_ref()
        .and_then(dom::tag_name);

    let anchor_attrs = filtered_attributes(&anchor_node, &opts.ignore_attributes);
    let anchor_text = collapse_whitespace(&dom::direct_text(&anchor_node));

    let root = doc.root();
    let root_node = root.node();

    let mut cohort: Vec<Element<'a>> = Vec::new();
    let mut pool = vec![root_node];
    pool.extend(dom::descendant_elements(&root_node));

    for node in pool {
        if node.id == anchor_node.id {
            continue;
        }
        if dom::depth(&node) != anchor_depth {
            continue;
        }
        if dom::tag_name(&node) != anchor_tag {
            continue;
        }
        let candidate_parent = dom::parent_element(&node);
        if candidate_parent.as_ref().and_then(dom::tag_name) != parent_tag {
            continue;
        }
        let candidate_grandparent = candidate_parent
            .as_ref()
            .and_then(dom::parent_element)
            .as_ref()
            .and_then(dom::tag_name);
        if candidate_grandparent != grandparent_tag {
            continue;
        }

        let candidate_attrs = filtered_attributes(&node, &opts.ignore_attributes);
        let mut score = jaccard_pairs(&anchor_attrs, &candidate_attrs);
        if opts.match_text {
            let candidate_text = collapse_whitespace(&dom::direct_text(&node));
            score = (score + token_set_ratio(&anchor_text, &candidate_text)) / 2.0;
        }

        if score >= opts.similarity_threshold {
            cohort.push(Element::new(node, doc));
        }
    }

    Elements::from_vec(cohort)
}

fn filtered_attributes(
    node: &dom_query::NodeRef<'_>,
    ignore: &[String],
) -> indexmap::IndexMap<String, String> {
    let mut attrs = dom::attributes(node);
    attrs.retain(|name, _| !ignore.iter().any(|ignored| ignored == name));
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    const PRICES: &str = "<html><body><p>Price: £51.77</p><p>Price: £10.00</p></body></html>";

    #[test]
    fn find_by_text_exact_match() {
        let doc = Document::parse(PRICES);
        let root = doc.root();
        let found = root.find_by_text("Price: £51.77", &TextSearchOptions::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().unwrap().tag(), "p");
    }

    #[test]
    fn find_by_text_is_case_insensitive_by_default() {
        let doc = Document::parse(PRICES);
        let root = doc.root();
        let found = root.find_by_text("price: £51.77", &TextSearchOptions::default());
        assert_eq!(found.len(), 1);

        let strict = root.find_by_text(
            "price: £51.77",
            &TextSearchOptions {
                case_sensitive: true,
                ..TextSearchOptions::default()
            },
        );
        assert!(strict.is_empty());
    }

    #[test]
    fn find_by_text_partial_containment() {
        let doc = Document::parse(PRICES);
        let root = doc.root();
        let found = root.find_by_text(
            "£51",
            &TextSearchOptions {
                partial: true,
                ..TextSearchOptions::default()
            },
        );
        assert!(!found.is_empty());
        assert!(found.iter().any(|el| el.tag() == "p"));
    }

    #[test]
    fn find_by_regex_first_and_all() {
        let doc = Document::parse(PRICES);
        let root = doc.root();
        let found = root
            .find_by_regex(r"£[\d.]+", &RegexSearchOptions::default())
            .unwrap();
        let paragraphs: Vec<_> = found.iter().filter(|el| el.tag() == "p").collect();
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].text().contains("£51.77"));
        assert_eq!(
            paragraphs[0].re_first(r"£[\d.]+", &Default::default()).unwrap().unwrap(),
            "£51.77"
        );
    }

    #[test]
    fn find_by_regex_rejects_bad_patterns() {
        let doc = Document::parse(PRICES);
        let root = doc.root();
        assert!(root
            .find_by_regex("(unclosed", &RegexSearchOptions::default())
            .is_err());
    }

    #[test]
    fn find_similar_collects_product_cohort() {
        use crate::find::Filter;

        let doc = Document::parse(
            r#"<html><body><main>
                <article class="product" href="/1"><h3>One</h3></article>
                <article class="product" href="/2"><h3>Two</h3></article>
                <article class="product" href="/3"><h3>Three</h3></article>
                <article class="ad"><h3>Buy now</h3></article>
            </main></body></html>"#,
        );
        let root = doc.root();
        let anchor = root
            .find(&Filter::new().tag("article").attr("class", "product"))
            .unwrap();
        let similar = anchor.find_similar(&SimilarOptions::default());

        assert_eq!(similar.len(), 2);
        for el in &similar {
            assert_eq!(el.tag(), "article");
            assert!(el.has_class("product"));
            assert!(*el != anchor);
        }
    }

    #[test]
    fn find_similar_respects_threshold_zero() {
        let doc = Document::parse(
            r#"<html><body>
                <div class="x">1</div>
                <div class="y">2</div>
            </body></html>"#,
        );
        let root = doc.root();
        let anchor = root.css_first("div.x").unwrap().unwrap().as_element().unwrap();
        let all = anchor.find_similar(&SimilarOptions {
            similarity_threshold: 0.0,
            ..SimilarOptions::default()
        });
        assert_eq!(all.len(), 1);

        let none = anchor.find_similar(&SimilarOptions::default());
        assert!(none.is_empty());
    }

    #[test]
    fn find_similar_can_match_text_too() {
        let doc = Document::parse(
            r#"<html><body>
                <span class="tag">alpha beta</span>
                <span class="tag">alpha beta</span>
                <span class="tag">unrelated words entirely</span>
            </body></html>"#,
        );
        let root = doc.root();
        let anchor = root.css_first("span").unwrap().unwrap().as_element().unwrap();
        let strict = anchor.find_similar(&SimilarOptions {
            match_text: true,
            similarity_threshold: 0.9,
            ..SimilarOptions::default()
        });
        assert_eq!(strict.len(), 1);
        assert_eq!(strict.first().unwrap().text(), "alpha beta");
    }
}
