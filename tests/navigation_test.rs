//! Tree-structure invariants and selector-generation tests.

use scrapling::{AllTextOptions, Document, Filter};

const PAGE: &str = r#"<html><body>
    <div id="wrap" class="outer">
        <h1>Title</h1>
        <ul class="menu">
            <li><a href="/a">A</a></li>
            <li><a href="/b">B</a></li>
        </ul>
        <p>tail text</p>
    </div>
</body></html>"#;

#[test]
fn every_node_is_in_its_parents_children() {
    let doc = Document::parse(PAGE);
    let root = doc.root();

    for element in root.below_elements().iter() {
        let parent = element.parent().unwrap();
        assert!(
            parent.children().iter().any(|child| child == element),
            "parent of <{}> does not list it as a child",
            element.tag()
        );
    }
}

#[test]
fn document_order_is_stable_across_calls() {
    let doc = Document::parse(PAGE);
    let root = doc.root();

    let first_pass: Vec<String> = root
        .below_elements()
        .iter()
        .map(|el| el.tag().into_string())
        .collect();
    let second_pass: Vec<String> = root
        .below_elements()
        .iter()
        .map(|el| el.tag().into_string())
        .collect();
    assert_eq!(first_pass, second_pass);
}

#[test]
fn siblings_exclude_self_and_keep_order() {
    let doc = Document::parse(PAGE);
    let root = doc.root();
    let ul = root.find(&Filter::new().tag("ul")).unwrap();

    let sibling_tags: Vec<String> = ul.siblings().iter().map(|el| el.tag().into_string()).collect();
    assert_eq!(sibling_tags, vec!["h1", "p"]);
    assert_eq!(ul.previous().unwrap().tag(), "h1");
    assert_eq!(ul.next().unwrap().tag(), "p");
}

#[test]
fn generated_selectors_reselect_their_element() {
    let doc = Document::parse(PAGE);
    let root = doc.root();

    for element in root.below_elements().iter() {
        if element.tag() == "head" {
            continue;
        }
        let short = element.generate_css_selector();
        let found = root.css(&short).unwrap().into_elements().unwrap();
        assert!(
            found.iter().any(|el| el == element),
            "short selector {short} missed <{}>",
            element.tag()
        );

        let full = element.generate_full_css_selector();
        let found = root.css(&full).unwrap().into_elements().unwrap();
        assert!(
            found.iter().any(|el| el == element),
            "full selector {full} missed <{}>",
            element.tag()
        );
    }
}

#[test]
fn generated_xpaths_reselect_their_element() {
    let doc = Document::parse(PAGE);
    let root = doc.root();

    for element in root.below_elements().iter() {
        if element.tag() == "head" {
            continue;
        }
        for xpath in [
            element.generate_xpath_selector(),
            element.generate_full_xpath_selector(),
        ] {
            let found = root.xpath(&xpath).unwrap().into_elements().unwrap();
            assert!(
                found.iter().any(|el| el == element),
                "xpath {xpath} missed <{}>",
                element.tag()
            );
        }
    }
}

#[test]
fn short_selector_anchors_on_id() {
    let doc = Document::parse(PAGE);
    let root = doc.root();
    let h1 = root.find(&Filter::new().tag("h1")).unwrap();
    assert_eq!(h1.generate_css_selector(), "#wrap > h1");
    assert_eq!(h1.generate_xpath_selector(), "//*[@id='wrap']/h1");
}

#[test]
fn serialization_round_trip_preserves_tag_and_attributes() {
    let doc = Document::parse(PAGE);
    let root = doc.root();
    let ul = root.find(&Filter::new().tag("ul")).unwrap();

    let reparsed = Document::parse(&ul.html_content());
    let again = reparsed
        .root()
        .find(&Filter::new().tag("ul"))
        .unwrap();
    assert_eq!(again.tag(), "ul");
    assert_eq!(again.attr("class").unwrap(), "menu");
    assert_eq!(again.children().len(), ul.children().len());
}

#[test]
fn get_all_text_walks_depth_first() {
    let doc = Document::parse(PAGE);
    let root = doc.root();
    let wrap = root.find(&Filter::new().attr("id", "wrap")).unwrap();

    let text = wrap.get_all_text(&AllTextOptions {
        strip: true,
        ..AllTextOptions::default()
    });
    assert_eq!(text, "Title\nA\nB\ntail text");
}

#[test]
fn empty_document_queries_are_empty() {
    let doc = Document::parse("");
    let root = doc.root();

    assert!(root.css("div").unwrap().is_empty());
    assert!(root.find_all(&Filter::new().tag("p")).is_empty());
    assert!(root
        .find_by_text("anything", &Default::default())
        .is_empty());
    assert_eq!(root.get_all_text(&Default::default()), "");
}

#[test]
fn attributes_handler_is_ordered_and_searchable() {
    let doc = Document::parse(
        r#"<html><body><a data-b="2" data-a="1" href="/x">x</a></body></html>"#,
    );
    let root = doc.root();
    let a = root.find(&Filter::new().tag("a")).unwrap();

    let attrs = a.attrs();
    let keys: Vec<&String> = attrs.keys().collect();
    assert_eq!(keys, ["data-b", "data-a", "href"]);

    let hits: Vec<_> = attrs.search_values("1", false).collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, "data-a");
}
