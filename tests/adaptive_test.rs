//! Adaptive storage and relocation tests.

use std::path::PathBuf;
use std::sync::Arc;

use scrapling::{
    Document, DocumentOptions, Error, Fingerprint, QueryOptions, SqliteStorage, StorageBackend,
};

fn adaptive_options(store: &PathBuf) -> DocumentOptions {
    DocumentOptions {
        adaptive: true,
        storage_path: Some(store.clone()),
        ..DocumentOptions::default()
    }
}

fn store_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("fingerprints.sqlite3")
}

#[test]
fn auto_save_then_adaptive_relocation_in_same_document() {
    let dir = tempfile::tempdir().unwrap();
    let doc = Document::from_html(
        r#"<html><body><div id="p1" class="product"><h3>x</h3></div></body></html>"#,
        adaptive_options(&store_path(&dir)),
    )
    .unwrap();
    let root = doc.root();

    let matched = root
        .css_with(
            "#p1",
            &QueryOptions {
                auto_save: true,
                identifier: Some("K".to_string()),
                ..QueryOptions::default()
            },
        )
        .unwrap();
    assert_eq!(matched.len(), 1);

    let relocated = root
        .css_with(
            "#missing",
            &QueryOptions {
                adaptive: true,
                identifier: Some("K".to_string()),
                ..QueryOptions::default()
            },
        )
        .unwrap()
        .into_elements()
        .unwrap();

    assert!(!relocated.is_empty());
    let best = relocated.first().unwrap();
    assert_eq!(best.tag(), "div");
    assert_eq!(best.attr("id").unwrap(), "p1");
    assert_eq!(best.get_all_text(&Default::default()).trimmed(), "x");
}

#[test]
fn relocation_after_structural_drift() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_path(&dir);

    let original = Document::from_html(
        r#"<html><body><div class="product" id="p1"><h3>Product 1</h3><span class="price">$10</span></div></body></html>"#,
        adaptive_options(&store),
    )
    .unwrap();
    original
        .root()
        .css_with(
            "#p1",
            &QueryOptions {
                auto_save: true,
                identifier: Some("K".to_string()),
                ..QueryOptions::default()
            },
        )
        .unwrap();

    let drifted = Document::from_html(
        r#"<html><body><article class="product new-class" data-id="p1"><div class="info"><h3>Product 1</h3><span class="price new-price">$10</span></div></article></body></html>"#,
        adaptive_options(&store),
    )
    .unwrap();
    let new_root = drifted.root();

    let fingerprint = new_root.retrieve("K").unwrap().unwrap();
    let candidates = new_root.relocate(&fingerprint);
    assert!(!candidates.is_empty());

    let best = candidates.first().unwrap();
    let tag = best.tag().into_string();
    assert!(tag == "article" || tag == "div", "unexpected tag {tag}");
    let heading = best.css("h3::text").unwrap().into_strings().unwrap();
    assert!(heading.iter().any(|t| t == &"Product 1"));
}

#[test]
fn default_identifier_is_the_selector_text() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_path(&dir);
    let doc = Document::from_html(
        r#"<html><body><span class="price">$9</span></body></html>"#,
        adaptive_options(&store),
    )
    .unwrap();
    let root = doc.root();

    root.css_with(
        "span.price",
        &QueryOptions {
            auto_save: true,
            ..QueryOptions::default()
        },
    )
    .unwrap();

    let fingerprint = root.retrieve("span.price").unwrap();
    assert!(fingerprint.is_some());
    assert_eq!(fingerprint.unwrap().tag, "span");
}

#[test]
fn save_and_retrieve_round_trip_through_element() {
    let dir = tempfile::tempdir().unwrap();
    let doc = Document::from_html(
        r#"<html><body><div id="a" class="x">text</div></body></html>"#,
        adaptive_options(&store_path(&dir)),
    )
    .unwrap();
    let root = doc.root();
    let target = root.css_first("#a").unwrap().unwrap().as_element().unwrap();

    target.save("slot").unwrap();
    let loaded = root.retrieve("slot").unwrap().unwrap();
    assert_eq!(loaded, Fingerprint::from_element(&target));
}

#[test]
fn retrieve_of_missing_identifier_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let doc = Document::from_html(
        "<html><body></body></html>",
        adaptive_options(&store_path(&dir)),
    )
    .unwrap();
    assert!(doc.root().retrieve("never-saved").unwrap().is_none());
}

#[test]
fn adaptive_query_with_no_stored_fingerprint_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let doc = Document::from_html(
        "<html><body><p>x</p></body></html>",
        adaptive_options(&store_path(&dir)),
    )
    .unwrap();

    let result = doc
        .root()
        .css_with(
            "#nothing",
            &QueryOptions {
                adaptive: true,
                identifier: Some("unsaved".to_string()),
                ..QueryOptions::default()
            },
        )
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn adaptive_calls_require_adaptive_documents() {
    let doc = Document::parse("<html><body><p id=\"x\">x</p></body></html>");
    let root = doc.root();

    assert!(matches!(root.save("k"), Err(Error::AdaptiveDisabled)));
    assert!(matches!(root.retrieve("k"), Err(Error::AdaptiveDisabled)));
    let result = root.css_with(
        "#x",
        &QueryOptions {
            auto_save: true,
            ..QueryOptions::default()
        },
    );
    assert!(matches!(result, Err(Error::AdaptiveDisabled)));
}

#[test]
fn auto_save_persists_only_the_first_match() {
    let dir = tempfile::tempdir().unwrap();
    let doc = Document::from_html(
        r#"<html><body>
            <li class="row" data-n="1">one</li>
            <li class="row" data-n="2">two</li>
        </body></html>"#,
        adaptive_options(&store_path(&dir)),
    )
    .unwrap();
    let root = doc.root();

    root.css_with(
        "li.row",
        &QueryOptions {
            auto_save: true,
            identifier: Some("rows".to_string()),
            ..QueryOptions::default()
        },
    )
    .unwrap();

    let stored = root.retrieve("rows").unwrap().unwrap();
    assert_eq!(
        stored.attributes.get("data-n").map(String::as_str),
        Some("1")
    );
}

#[test]
fn domains_isolate_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_path(&dir);

    let doc_a = Document::from_html(
        r#"<html><body><p id="k">a</p></body></html>"#,
        DocumentOptions {
            url: Some("https://a.example.com/".to_string()),
            ..adaptive_options(&store)
        },
    )
    .unwrap();
    doc_a
        .root()
        .css_with(
            "#k",
            &QueryOptions {
                auto_save: true,
                identifier: Some("shared".to_string()),
                ..QueryOptions::default()
            },
        )
        .unwrap();

    let doc_b = Document::from_html(
        "<html><body></body></html>",
        DocumentOptions {
            url: Some("https://b.example.com/".to_string()),
            ..adaptive_options(&store)
        },
    )
    .unwrap();
    assert!(doc_b.root().retrieve("shared").unwrap().is_none());
    assert!(doc_a.root().retrieve("shared").unwrap().is_some());
}

#[test]
fn custom_backend_plugs_in() {
    #[derive(Default)]
    struct MemoryBackend {
        records: std::sync::Mutex<std::collections::HashMap<(String, String), Fingerprint>>,
    }

    impl StorageBackend for MemoryBackend {
        fn save(
            &self,
            domain: &str,
            identifier: &str,
            fingerprint: &Fingerprint,
        ) -> scrapling::Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert((domain.to_string(), identifier.to_string()), fingerprint.clone());
            Ok(())
        }

        fn retrieve(
            &self,
            domain: &str,
            identifier: &str,
        ) -> scrapling::Result<Option<Fingerprint>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(&(domain.to_string(), identifier.to_string()))
                .cloned())
        }
    }

    let backend = Arc::new(MemoryBackend::default());
    let doc = Document::from_html(
        r#"<html><body><p id="x">x</p></body></html>"#,
        DocumentOptions {
            adaptive: true,
            storage: Some(backend.clone()),
            ..DocumentOptions::default()
        },
    )
    .unwrap();

    doc.root()
        .css_with(
            "#x",
            &QueryOptions {
                auto_save: true,
                identifier: Some("mem".to_string()),
                ..QueryOptions::default()
            },
        )
        .unwrap();
    assert!(doc.root().retrieve("mem").unwrap().is_some());
    assert!(backend.retrieve("default", "mem").unwrap().is_some());
}

#[test]
fn sqlite_store_is_shareable_across_documents() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn StorageBackend> =
        Arc::new(SqliteStorage::open(dir.path().join("shared.sqlite3")).unwrap());

    let doc_one = Document::from_html(
        r#"<html><body><p id="x">x</p></body></html>"#,
        DocumentOptions {
            adaptive: true,
            storage: Some(store.clone()),
            ..DocumentOptions::default()
        },
    )
    .unwrap();
    doc_one.root().css_first("#x").unwrap().unwrap().as_element().unwrap().save("k").unwrap();

    let doc_two = Document::from_html(
        "<html><body></body></html>",
        DocumentOptions {
            adaptive: true,
            storage: Some(store),
            ..DocumentOptions::default()
        },
    )
    .unwrap();
    assert!(doc_two.root().retrieve("k").unwrap().is_some());
}
