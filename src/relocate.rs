//! Fingerprint-based element relocation.
//!
//! Given a stored [`Fingerprint`] and a parsed document, produce ranked
//! candidate nodes: a structural cohort at the fingerprint's tree depth is
//! filtered on tag identity, then each survivor is scored by a weighted
//! combination of attribute, text, and structural similarity. An empty
//! result is the normal no-match outcome, never an error.

use dom_query::NodeRef;

use crate::document::Document;
use crate::dom;
use crate::fingerprint::Fingerprint;
use crate::similarity::{attr_similarity, lcs_ratio, token_set_ratio};

/// Weights of the candidate-scoring features. They sum to 1.0, so an
/// unchanged element scores exactly 1.0. Tunable, but the defaults are not
/// part of the public contract.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    /// Own attribute set.
    pub attributes: f64,
    /// Own direct text.
    pub text: f64,
    /// Sibling-tag sequence.
    pub sibling_tags: f64,
    /// Path-tag sequence.
    pub path_tags: f64,
    /// Parent attribute set.
    pub parent_attributes: f64,
    /// Parent direct text.
    pub parent_text: f64,
    /// Tag equality.
    pub tag: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            attributes: 0.25,
            text: 0.15,
            sibling_tags: 0.15,
            path_tags: 0.15,
            parent_attributes: 0.15,
            parent_text: 0.10,
            tag: 0.05,
        }
    }
}

/// Score one candidate fingerprint against the stored one.
#[must_use]
pub fn score(stored: &Fingerprint, candidate: &Fingerprint, weights: &ScoreWeights) -> f64 {
    let tag_score = if stored.tag == candidate.tag { 1.0 } else { 0.0 };

    weights.attributes * attr_similarity(&stored.attributes, &candidate.attributes)
        + weights.text * token_set_ratio(&stored.text, &candidate.text)
        + weights.sibling_tags * lcs_ratio(&stored.sibling_tags, &candidate.sibling_tags)
        + weights.path_tags * lcs_ratio(&stored.path_tags, &candidate.path_tags)
        + weights.parent_attributes
            * attr_similarity(&stored.parent_attributes, &candidate.parent_attributes)
        + weights.parent_text * token_set_ratio(&stored.parent_text, &candidate.parent_text)
        + weights.tag * tag_score
}

/// Rank the document's elements against `fingerprint`, best first.
///
/// Ties are broken by document order. Every candidate that survives the
/// structural filters is returned; callers take the head of the list.
pub(crate) fn rank<'a>(doc: &'a Document, fingerprint: &Fingerprint) -> Vec<(NodeRef<'a>, f64)> {
    rank_with(doc, fingerprint, &ScoreWeights::default())
}

pub(crate) fn rank_with<'a>(
    doc: &'a Document,
    fingerprint: &Fingerprint,
    weights: &ScoreWeights,
) -> Vec<(NodeRef<'a>, f64)> {
    let root = doc.root().node();
    let mut all: Vec<NodeRef<'a>> = vec![root];
    all.extend(dom::descendant_elements(&root));

    let depth = fingerprint.depth();
    let mut cohort: Vec<NodeRef<'a>> = at_depth(&all, depth);
    if cohort.is_empty() && depth > 0 {
        // Widen to adjacent depths when the page gained or lost a wrapper.
        cohort = at_depth(&all, depth - 1);
        cohort.extend(at_depth(&all, depth + 1));
    } else if cohort.is_empty() {
        cohort = at_depth(&all, depth + 1);
    }
    log::debug!(
        "relocation cohort for tag {:?} at depth {depth}: {} candidates",
        fingerprint.tag,
        cohort.len()
    );

    let tag_matches = |node: &NodeRef<'a>| {
        dom::tag_name(node).as_deref() == Some(fingerprint.tag.as_str())
    };
    let parent_matches = |node: &NodeRef<'a>| {
        if fingerprint.parent_tag.is_empty() {
            return true;
        }
        dom::parent_element(node)
            .as_ref()
            .and_then(dom::tag_name)
            .as_deref()
            == Some(fingerprint.parent_tag.as_str())
    };

    // Strict filter first; when the element changed tag or was reparented
    // that rejects everything, so relax to one of the two conditions and
    // let the weighted features do the ranking.
    let mut pool: Vec<NodeRef<'a>> = cohort
        .iter()
        .copied()
        .filter(|node| tag_matches(node) && parent_matches(node))
        .collect();
    if pool.is_empty() {
        pool = cohort.iter().copied().filter(parent_matches).collect();
    }
    if pool.is_empty() {
        pool = cohort.into_iter().filter(tag_matches).collect();
    }

    let mut scored: Vec<(NodeRef<'a>, f64)> = pool
        .into_iter()
        .map(|node| {
            let candidate = Fingerprint::from_node(&node);
            (node, score(fingerprint, &candidate, weights))
        })
        .collect();

    scored.sort_by(|(node_a, score_a), (node_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| doc.order_of(node_a.id).cmp(&doc.order_of(node_b.id)))
    });

    if let Some((_, best)) = scored.first() {
        log::debug!("best relocation score: {best:.3}");
    }
    scored
}

fn at_depth<'a>(all: &[NodeRef<'a>], depth: usize) -> Vec<NodeRef<'a>> {
    all.iter()
        .copied()
        .filter(|node| dom::depth(node) == depth)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn identity_relocation_scores_one() {
        let doc = Document::parse(
            r#"<html><body><div id="p1" class="product"><h3>x</h3></div></body></html>"#,
        );
        let root = doc.root();
        let target = root.css_first("#p1").unwrap().unwrap().as_element().unwrap();
        let fp = Fingerprint::from_element(&target);

        let ranked = rank(&doc, &fp);
        assert!(!ranked.is_empty());
        let (best, best_score) = ranked[0];
        assert_eq!(dom::tag_name(&best).as_deref(), Some("div"));
        assert!((best_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn relocation_survives_structural_drift() {
        let original = Document::parse(
            r#"<html><body><div class="product" id="p1"><h3>Product 1</h3><span class="price">$10</span></div></body></html>"#,
        );
        let target = original
            .root()
            .css_first("#p1")
            .unwrap()
            .unwrap()
            .as_element()
            .unwrap();
        let fp = Fingerprint::from_element(&target);

        let drifted = Document::parse(
            r#"<html><body><article class="product new-class" data-id="p1"><div class="info"><h3>Product 1</h3><span class="price new-price">$10</span></div></article></body></html>"#,
        );
        let ranked = rank(&drifted, &fp);
        assert!(!ranked.is_empty());
        let (best, _) = ranked[0];
        let tag = dom::tag_name(&best).unwrap();
        assert!(tag == "article" || tag == "div", "unexpected tag {tag}");

        let best_el = drifted.root().relocate(&fp);
        let h3_text = best_el
            .first()
            .unwrap()
            .css("h3::text")
            .unwrap()
            .into_strings()
            .unwrap();
        assert!(h3_text.iter().any(|t| t == &"Product 1"));
    }

    #[test]
    fn empty_document_relocates_to_nothing() {
        let doc = Document::parse("<html><body></body></html>");
        let fp = Fingerprint {
            tag: "div".to_string(),
            path_tags: vec!["div".to_string(), "body".to_string()],
            parent_tag: "body".to_string(),
            ..Fingerprint::default()
        };
        assert!(rank(&doc, &fp).is_empty());
    }

    #[test]
    fn ranking_prefers_closer_attribute_sets() {
        let original = Document::parse(
            r#"<html><body><div class="product card" id="k">x</div></body></html>"#,
        );
        let target = original
            .root()
            .css_first("#k")
            .unwrap()
            .unwrap()
            .as_element()
            .unwrap();
        let fp = Fingerprint::from_element(&target);

        let drifted = Document::parse(
            r#"<html><body>
                <div class="banner">y</div>
                <div class="product card" id="k2">x</div>
            </body></html>"#,
        );
        let ranked = rank(&drifted, &fp);
        assert_eq!(ranked.len(), 2);
        let (best, _) = ranked[0];
        assert_eq!(dom::attribute(&best, "class").as_deref(), Some("product card"));
    }
}
