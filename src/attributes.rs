//! Read-only ordered attribute maps.
//!
//! [`Attributes`] is the snapshot of an element's attributes returned by
//! [`Element::attrs`](crate::Element::attrs). Iteration order is source
//! order.

use indexmap::IndexMap;

use crate::error::Result;
use crate::text::TextHandler;

/// A read-only, ordered mapping of attribute names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    map: IndexMap<String, String>,
}

impl Attributes {
    pub(crate) fn new(map: IndexMap<String, String>) -> Self {
        Self { map }
    }

    /// Value of the named attribute, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TextHandler> {
        self.map.get(name).map(|value| TextHandler::from(value.as_str()))
    }

    /// True if the named attribute exists.
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when the element carried no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over `(name, value)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }

    /// Attribute names in source order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }

    /// Attribute values in source order.
    pub fn values(&self) -> impl Iterator<Item = &String> {
        self.map.values()
    }

    /// Yield every `(name, value)` pair whose value equals `query`, or
    /// contains it when `partial` is set.
    pub fn search_values<'q>(
        &'q self,
        query: &'q str,
        partial: bool,
    ) -> impl Iterator<Item = (&'q String, &'q String)> {
        self.map.iter().filter(move |(_, value)| {
            if partial {
                value.contains(query)
            } else {
                value.as_str() == query
            }
        })
    }

    /// Serialize the mapping to JSON bytes.
    pub fn json_string(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.map)?)
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}
