//! # scrapling
//!
//! Adaptive HTML parsing and element relocation.
//!
//! This library parses real-world HTML into a read-only tree, wraps nodes
//! in a rich navigation/extraction handle, and answers CSS, XPath, filter,
//! text, and similarity queries over them. Its distinguishing feature is
//! **adaptive selection**: an element's structural fingerprint can be
//! persisted and used to re-find the element after the page layout drifts.
//!
//! ## Quick Start
//!
//! ```rust
//! use scrapling::Document;
//!
//! let doc = Document::parse(r#"<html><body>
//!     <a href="/one">First</a>
//!     <a href="/two">Second</a>
//! </body></html>"#);
//!
//! let root = doc.root();
//! let hrefs = root.css("a::attr(href)")?.into_strings().unwrap_or_default();
//! assert_eq!(hrefs.len(), 2);
//! assert_eq!(hrefs[0], "/one");
//! # Ok::<(), scrapling::Error>(())
//! ```
//!
//! ## Adaptive selection
//!
//! ```rust,no_run
//! use scrapling::{Document, DocumentOptions, QueryOptions};
//!
//! # let page_html = "<html><body><div id=\"price\">$10</div></body></html>";
//! let doc = Document::from_html(page_html, DocumentOptions {
//!     url: Some("https://example.com/p/1".to_string()),
//!     adaptive: true,
//!     ..DocumentOptions::default()
//! })?;
//!
//! // First run: select and save a fingerprint.
//! let root = doc.root();
//! root.css_with("#price", &QueryOptions {
//!     auto_save: true,
//!     identifier: Some("price".to_string()),
//!     ..QueryOptions::default()
//! })?;
//!
//! // Later, after the page changed: relocate from the fingerprint.
//! let found = root.css_with("#price", &QueryOptions {
//!     adaptive: true,
//!     identifier: Some("price".to_string()),
//!     ..QueryOptions::default()
//! })?;
//! # Ok::<(), scrapling::Error>(())
//! ```
//!
//! ## Features
//!
//! - **Forgiving parsing**: malformed HTML and non-markup payloads are
//!   coerced to a usable tree; the raw bytes stay reachable.
//! - **Five selection engines**: CSS (with `::text`, `::attr`,
//!   `:contains`), an XPath subset, waterfall filters, text/regex search,
//!   and in-document similarity search.
//! - **Adaptive relocation**: deterministic fuzzy matching against stored
//!   fingerprints; SQLite-backed storage with a pluggable backend trait.

mod css;
mod dom;
mod error;
mod find;
mod relocate;
mod search;
mod selector_gen;
mod xpath;

/// Read-only ordered attribute maps.
pub mod attributes;

/// Document parsing and configuration.
pub mod document;

/// The element handle: navigation, extraction, selection.
pub mod element;

/// Result containers for element selection.
pub mod elements;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Element fingerprints for adaptive relocation.
pub mod fingerprint;

/// The fetcher-facing response type.
pub mod response;

/// Persistent fingerprint storage.
pub mod storage;

/// Text wrappers with regex/JSON/cleaning shortcuts.
pub mod text;

/// Similarity metrics behind relocation and similar-element search.
mod similarity;

// Public API - re-exports
pub use attributes::Attributes;
pub use css::QueryOptions;
pub use document::{Document, DocumentOptions};
pub use element::{AllTextOptions, Element};
pub use elements::{Elements, Selection, SelectionItem};
pub use error::{Error, Result};
pub use find::Filter;
pub use fingerprint::Fingerprint;
pub use relocate::ScoreWeights;
pub use response::{Response, ResponseInit};
pub use search::{RegexSearchOptions, SimilarOptions, TextSearchOptions};
pub use storage::{SqliteStorage, StorageBackend};
pub use text::{RegexOptions, TextHandler, TextHandlers};
