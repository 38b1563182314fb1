//! Document parsing and configuration.
//!
//! A [`Document`] is parsed once from bytes or a string and is read-only
//! afterwards: every node keeps its identity and document-order position
//! for the document's lifetime, so handles can be compared and result
//! sequences are stable across calls.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use dom_query::{NodeId, NodeRef};
use regex::Regex;
use url::Url;

use crate::dom;
use crate::element::Element;
use crate::encoding;
use crate::error::{Error, Result};
use crate::storage::{SqliteStorage, StorageBackend};
use crate::text::TextHandler;

/// Strip comments before parsing when `keep_comments` is off.
#[allow(clippy::expect_used)]
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// Unwrap CDATA sections into text when `keep_cdata` is off.
#[allow(clippy::expect_used)]
static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));

/// Configuration for [`Document`] construction.
///
/// All fields are public; use struct-update syntax over `Default::default()`
/// to set just what you need.
#[derive(Clone, Default)]
pub struct DocumentOptions {
    /// Source URL of the document. Used for `urljoin` and to derive the
    /// fingerprint-storage domain.
    pub url: Option<String>,

    /// Enable the adaptive subsystem (`auto_save`, `adaptive`, `save`,
    /// `retrieve`, `relocate`). Off by default; adaptive calls on a
    /// non-adaptive document return [`Error::AdaptiveDisabled`].
    pub adaptive: bool,

    /// Override the storage domain derived from `url`.
    pub adaptive_domain: Option<String>,

    /// Character encoding label for byte input. `None` sniffs (BOM, then
    /// meta charset, then UTF-8).
    pub encoding: Option<String>,

    /// Keep comment nodes in the parsed tree. Off by default.
    pub keep_comments: bool,

    /// Preserve `<![CDATA[...]]>` sections verbatim in serialized output.
    /// Off by default, which unwraps them into text.
    pub keep_cdata: bool,

    /// Fingerprint storage backend. When `adaptive` is on and this is
    /// `None`, the default SQLite store is opened at `storage_path`.
    pub storage: Option<Arc<dyn StorageBackend>>,

    /// Path for the default SQLite store. Defaults to a file in the OS
    /// temp directory.
    pub storage_path: Option<PathBuf>,
}

impl fmt::Debug for DocumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentOptions")
            .field("url", &self.url)
            .field("adaptive", &self.adaptive)
            .field("adaptive_domain", &self.adaptive_domain)
            .field("encoding", &self.encoding)
            .field("keep_comments", &self.keep_comments)
            .field("keep_cdata", &self.keep_cdata)
            .field("storage", &self.storage.as_ref().map(|_| "<backend>"))
            .field("storage_path", &self.storage_path)
            .finish()
    }
}

/// A parsed HTML document.
///
/// Parsing coerces any input to a tree rooted at an `<html>` element:
/// malformed HTML is recovered, and non-markup payloads (bare text, raw
/// JSON) are wrapped in `<html><body><p>...</p></body></html>`. The
/// original raw bytes are kept verbatim and stay reachable through
/// [`Element::body`](crate::Element::body) on the root handle.
pub struct Document {
    dom: dom_query::Document,
    raw: Vec<u8>,
    source: String,
    encoding_name: String,
    url: Option<Url>,
    adaptive: bool,
    adaptive_domain: Option<String>,
    keep_comments: bool,
    keep_cdata: bool,
    storage: Option<Arc<dyn StorageBackend>>,
    order: HashMap<NodeId, usize>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("encoding", &self.encoding_name)
            .field("adaptive", &self.adaptive)
            .field("nodes", &self.order.len())
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Parse a UTF-8 HTML string with default options.
    #[must_use]
    pub fn parse(html: &str) -> Document {
        Self::build(
            html.to_string(),
            html.as_bytes().to_vec(),
            "UTF-8".to_string(),
            &DocumentOptions::default(),
            None,
        )
    }

    /// Parse an HTML string with explicit options.
    pub fn from_html(html: &str, options: DocumentOptions) -> Result<Document> {
        let encoding_name = match options.encoding.as_deref() {
            Some(label) => encoding::resolve_label(label)
                .ok_or_else(|| Error::EncodingError(format!("unknown encoding label {label:?}")))?
                .name()
                .to_string(),
            None => "UTF-8".to_string(),
        };
        let storage = Self::init_storage(&options)?;
        Ok(Self::build(
            html.to_string(),
            html.as_bytes().to_vec(),
            encoding_name,
            &options,
            storage,
        ))
    }

    /// Parse raw bytes with explicit options, decoding per the declared
    /// encoding or by sniffing when none is declared.
    pub fn from_bytes(bytes: &[u8], options: DocumentOptions) -> Result<Document> {
        let (source, resolved) = match options.encoding.as_deref() {
            Some(label) => {
                let enc = encoding::resolve_label(label).ok_or_else(|| {
                    Error::EncodingError(format!("unknown encoding label {label:?}"))
                })?;
                (encoding::decode_with(bytes, enc), enc)
            }
            None => encoding::transcode_to_utf8(bytes),
        };
        let storage = Self::init_storage(&options)?;
        Ok(Self::build(
            source,
            bytes.to_vec(),
            resolved.name().to_string(),
            &options,
            storage,
        ))
    }

    fn init_storage(options: &DocumentOptions) -> Result<Option<Arc<dyn StorageBackend>>> {
        if !options.adaptive {
            return Ok(None);
        }
        if let Some(backend) = &options.storage {
            return Ok(Some(Arc::clone(backend)));
        }
        let store = match &options.storage_path {
            Some(path) => SqliteStorage::open(path)?,
            None => SqliteStorage::open_default()?,
        };
        Ok(Some(Arc::new(store)))
    }

    fn build(
        source: String,
        raw: Vec<u8>,
        encoding_name: String,
        options: &DocumentOptions,
        storage: Option<Arc<dyn StorageBackend>>,
    ) -> Document {
        let mut input = source.clone();

        if !options.keep_cdata {
            input = CDATA_RE
                .replace_all(&input, |caps: &regex::Captures<'_>| {
                    html_escape::encode_text(&caps[1]).into_owned()
                })
                .into_owned();
        }
        if !options.keep_comments {
            input = COMMENT_RE.replace_all(&input, "").into_owned();
        }

        let trimmed = input.trim_start_matches('\u{feff}').trim();
        if !trimmed.is_empty() && !trimmed.starts_with('<') {
            log::debug!("input is not markup; wrapping in a body paragraph");
            input = format!("<html><body><p>{input}</p></body></html>");
        }

        let dom = dom_query::Document::from(input);
        let order = document_order(&dom);
        let url = options.url.as_deref().and_then(|raw_url| {
            Url::parse(raw_url)
                .map_err(|err| log::debug!("unparseable document url {raw_url:?}: {err}"))
                .ok()
        });

        Document {
            dom,
            raw,
            source,
            encoding_name,
            url,
            adaptive: options.adaptive,
            adaptive_domain: options.adaptive_domain.clone(),
            keep_comments: options.keep_comments,
            keep_cdata: options.keep_cdata,
            storage,
            order,
        }
    }

    /// Handle to the document's root element (always `<html>`).
    #[must_use]
    pub fn root(&self) -> Element<'_> {
        let doc_node = self.dom.root();
        let root = dom::element_children(&doc_node)
            .into_iter()
            .next()
            .unwrap_or(doc_node);
        Element::new(root, self)
    }

    /// The document URL, if one was supplied.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Resolved name of the encoding the source was decoded with.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding_name
    }

    /// The decoded source text, exactly as supplied (before any coercion).
    #[must_use]
    pub fn source(&self) -> TextHandler {
        TextHandler::from(self.source.as_str())
    }

    /// The raw input bytes, verbatim.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Whether the adaptive subsystem is enabled.
    #[must_use]
    pub fn adaptive(&self) -> bool {
        self.adaptive
    }

    /// Whether comment nodes were kept at parse time.
    #[must_use]
    pub fn keep_comments(&self) -> bool {
        self.keep_comments
    }

    /// Whether CDATA sections were preserved verbatim.
    #[must_use]
    pub fn keep_cdata(&self) -> bool {
        self.keep_cdata
    }

    /// The storage domain adaptive records are keyed under: the
    /// `adaptive_domain` override, else the URL host, else `"default"`.
    #[must_use]
    pub fn domain(&self) -> String {
        if let Some(domain) = &self.adaptive_domain {
            return domain.clone();
        }
        if let Some(host) = self.url.as_ref().and_then(Url::host_str) {
            return host.to_string();
        }
        "default".to_string()
    }

    pub(crate) fn storage_backend(&self) -> Result<&Arc<dyn StorageBackend>> {
        self.storage.as_ref().ok_or(Error::AdaptiveDisabled)
    }

    pub(crate) fn doc_node(&self) -> NodeRef<'_> {
        self.dom.root()
    }

    pub(crate) fn order_of(&self, id: NodeId) -> usize {
        self.order.get(&id).copied().unwrap_or(usize::MAX)
    }
}

/// Assign every node its depth-first pre-order position.
fn document_order(dom: &dom_query::Document) -> HashMap<NodeId, usize> {
    let root = dom.root();
    let mut order = HashMap::new();
    order.insert(root.id, 0);
    for (index, node) in dom::descendant_nodes(&root).iter().enumerate() {
        order.insert(node.id, index + 1);
    }
    order
}
