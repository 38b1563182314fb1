//! The fetcher-facing response type.
//!
//! Fetchers (an HTTP client, a headless browser) live outside this crate;
//! what they hand over is a status line, headers, cookies, and a body.
//! [`Response`] parses that body into a [`Document`] and dereferences to
//! it, so every selection operation is available directly on the
//! response. Construction is the only coupling between a fetcher and the
//! parsing core.

use std::ops::Deref;

use indexmap::IndexMap;

use crate::document::{Document, DocumentOptions};
use crate::element::Element;
use crate::error::Result;

/// Everything a fetcher supplies to build a [`Response`].
#[derive(Debug, Clone, Default)]
pub struct ResponseInit {
    /// Response body bytes.
    pub body: Vec<u8>,
    /// HTTP status code.
    pub status: u16,
    /// HTTP reason phrase.
    pub reason: String,
    /// Response headers.
    pub headers: IndexMap<String, String>,
    /// Cookies set by the response.
    pub cookies: IndexMap<String, String>,
    /// Final URL of the request (after redirects).
    pub url: String,
    /// Headers the request was sent with.
    pub request_headers: IndexMap<String, String>,
    /// URLs of the redirect chain, oldest first.
    pub history: Vec<String>,
    /// Encoding label reported by the transport, if any.
    pub encoding: Option<String>,
    /// Parsing configuration, forwarded verbatim to the document.
    pub options: DocumentOptions,
}

/// A fetched page: response metadata plus the parsed document.
#[derive(Debug)]
pub struct Response {
    status: u16,
    reason: String,
    headers: IndexMap<String, String>,
    cookies: IndexMap<String, String>,
    url: String,
    request_headers: IndexMap<String, String>,
    history: Vec<String>,
    document: Document,
}

impl Response {
    /// Parse the body and assemble the response.
    ///
    /// The response URL wins over any URL in `options`; the transport
    /// encoding (when given) wins over sniffing.
    pub fn build(init: ResponseInit) -> Result<Response> {
        let mut options = init.options;
        options.url = Some(init.url.clone());
        if options.encoding.is_none() {
            options.encoding = init.encoding;
        }
        let document = Document::from_bytes(&init.body, options)?;

        Ok(Response {
            status: init.status,
            reason: init.reason,
            headers: init.headers,
            cookies: init.cookies,
            url: init.url,
            request_headers: init.request_headers,
            history: init.history,
            document,
        })
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// HTTP reason phrase.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Cookies set by the response.
    #[must_use]
    pub fn cookies(&self) -> &IndexMap<String, String> {
        &self.cookies
    }

    /// Final URL of the request.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers the request was sent with.
    #[must_use]
    pub fn request_headers(&self) -> &IndexMap<String, String> {
        &self.request_headers
    }

    /// Redirect chain, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The raw body bytes, verbatim.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.document.raw()
    }

    /// Name of the encoding the body was decoded with.
    #[must_use]
    pub fn encoding(&self) -> &str {
        self.document.encoding()
    }

    /// Handle to the parsed document's root element.
    #[must_use]
    pub fn root(&self) -> Element<'_> {
        self.document.root()
    }
}

impl Deref for Response {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}
