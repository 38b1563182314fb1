//! Filter, text, and similarity search tests.

use regex::Regex;
use scrapling::{Document, Filter, RegexSearchOptions, SimilarOptions, TextSearchOptions};

#[test]
fn filter_based_find_matches_class() {
    let doc = Document::parse(
        r#"<html><body><ul><li class="a">1</li><li class="a">2</li><li class="b">3</li></ul></body></html>"#,
    );
    let root = doc.root();

    let found = root.find_all(&Filter::new().tag("li").attr("class", "a"));
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].text(), "1");
    assert_eq!(found[1].text(), "2");
}

#[test]
fn find_all_equals_css_for_plain_tags() {
    let doc = Document::parse(
        "<html><body><div><p>a</p></div><p>b</p><span>c</span></body></html>",
    );
    let root = doc.root();

    let via_find = root.find_all(&Filter::new().tag("p"));
    let via_css = root.css("p").unwrap().into_elements().unwrap();
    assert_eq!(via_find.len(), via_css.len());
    for (a, b) in via_find.iter().zip(via_css.iter()) {
        assert_eq!(a, b);
    }
}

#[test]
fn regex_search_returns_matches_in_document_order() {
    let doc = Document::parse(
        "<html><body><p>Price: £51.77</p><p>Price: £10.00</p></body></html>",
    );
    let root = doc.root();

    let all = root
        .find_by_regex(r"£[\d.]+", &RegexSearchOptions::default())
        .unwrap()
        .filter(|el| el.tag() == "p");
    assert_eq!(all.len(), 2);

    let first = all.first().unwrap();
    assert!(first.text().contains("£51.77"));
    assert_eq!(
        first
            .re_first(r"£[\d.]+", &Default::default())
            .unwrap()
            .unwrap(),
        "£51.77"
    );
}

#[test]
fn text_search_modes() {
    let doc = Document::parse(
        "<html><body><h2>Contact  Us</h2><p>Contact us today</p></body></html>",
    );
    let root = doc.root();

    // clean_match collapses the double space
    let cleaned = root.find_by_text(
        "contact us",
        &TextSearchOptions {
            clean_match: true,
            ..TextSearchOptions::default()
        },
    );
    assert!(cleaned.iter().any(|el| el.tag() == "h2"));

    // partial containment
    let partial = root.find_by_text(
        "today",
        &TextSearchOptions {
            partial: true,
            ..TextSearchOptions::default()
        },
    );
    assert!(partial.iter().any(|el| el.tag() == "p"));

    // no match is an empty collection
    assert!(root
        .find_by_text("absent", &TextSearchOptions::default())
        .is_empty());
}

#[test]
fn waterfall_combines_all_stages() {
    let doc = Document::parse(
        r#"<html><body>
            <div class="row" data-state="open">alpha 1</div>
            <div class="row" data-state="open">beta 2</div>
            <div class="row" data-state="closed">alpha 3</div>
        </body></html>"#,
    );
    let root = doc.root();

    let found = root.find_all(
        &Filter::new()
            .tag("div")
            .attr("class", "row")
            .attr("data-state", "open")
            .regex(Regex::new(r"alpha").unwrap())
            .predicate(|el| el.text().contains('1')),
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found.first().unwrap().text(), "alpha 1");
}

#[test]
fn find_similar_excludes_the_odd_one_out() {
    let doc = Document::parse(
        r#"<html><body><section>
            <article class="product"><h3>A</h3><span class="price">$1</span></article>
            <article class="product"><h3>B</h3><span class="price">$2</span></article>
            <article class="product"><h3>C</h3><span class="price">$3</span></article>
            <article class="product"><h3>D</h3><span class="price">$4</span></article>
            <article class="ad"><h3>Sponsored</h3></article>
        </section></body></html>"#,
    );
    let root = doc.root();

    let anchor = root
        .find(&Filter::new().tag("article").attr("class", "product"))
        .unwrap();
    let similar = anchor.find_similar(&SimilarOptions::default());

    assert_eq!(similar.len(), 3);
    for el in &similar {
        assert_eq!(el.tag(), "article");
        assert!(el.has_class("product"));
        assert!(*el != anchor);
    }
}

#[test]
fn find_similar_ignores_link_attributes_by_default() {
    let doc = Document::parse(
        r#"<html><body><nav>
            <a class="item" href="/1">one</a>
            <a class="item" href="/2">two</a>
            <a class="item" href="/3">three</a>
        </nav></body></html>"#,
    );
    let root = doc.root();

    let anchor = root.find(&Filter::new().tag("a")).unwrap();
    let similar = anchor.find_similar(&SimilarOptions::default());
    assert_eq!(similar.len(), 2);
}
