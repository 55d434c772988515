//! Multi-valued header map used by pooled requests and responses.
//!
//! Unlike [`http::HeaderMap`], names are kept as raw, case-sensitive bytes:
//! normalization belongs to the transport. Entries keep the order in which a
//! name was first seen and every value added under that name, so repeated
//! headers such as `Set-Cookie` survive in arrival order.
//!
//! Lookups are linear. A message carries a few dozen headers at most, and a
//! flat vector keeps its allocation across [`Headers::reset`] calls.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;

use crate::protocol::ExchangeError;

/// Ordered multi-valued header map with case-sensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: Bytes,
    // never empty
    values: Vec<Bytes>,
}

/// The value(s) stored under one header name.
///
/// A name holding exactly one value yields [`HeaderValues::One`], a name
/// that was added to several times yields every value in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderValues<'a> {
    One(&'a Bytes),
    Many(&'a [Bytes]),
}

impl<'a> HeaderValues<'a> {
    /// The first value stored for the name.
    pub fn first(&self) -> Option<&'a Bytes> {
        match *self {
            HeaderValues::One(value) => Some(value),
            HeaderValues::Many(values) => values.first(),
        }
    }

    pub fn as_slice(&self) -> &'a [Bytes] {
        match *self {
            HeaderValues::One(value) => std::slice::from_ref(value),
            HeaderValues::Many(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'a, Bytes> {
        self.as_slice().iter()
    }
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Builds a map where each pair overwrites any earlier value for its name.
    pub fn from_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        let mut headers = Headers::new();
        headers.update(items);
        headers
    }

    /// Replaces every value stored for `name` with `value`.
    pub fn set(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> &Bytes {
        let name = name.into();
        let index = match self.position(&name) {
            Some(index) => {
                self.entries[index].values.clear();
                index
            }
            None => self.push_entry(name),
        };

        let values = &mut self.entries[index].values;
        values.push(value.into());
        &values[values.len() - 1]
    }

    /// Appends `value` after any value already stored for `name`.
    pub fn add(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> &Bytes {
        let name = name.into();
        let index = match self.position(&name) {
            Some(index) => index,
            None => self.push_entry(name),
        };

        let values = &mut self.entries[index].values;
        values.push(value.into());
        &values[values.len() - 1]
    }

    /// Sets every pair, later pairs winning over earlier ones.
    pub fn update<I, K, V>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        for (name, value) in items {
            self.set(name, value);
        }
        self
    }

    pub fn has(&self, name: impl AsRef<[u8]>) -> bool {
        self.position(name.as_ref()).is_some()
    }

    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<HeaderValues<'_>> {
        let index = self.position(name.as_ref())?;
        match self.entries[index].values.as_slice() {
            [value] => Some(HeaderValues::One(value)),
            values => Some(HeaderValues::Many(values)),
        }
    }

    pub fn remove(&mut self, name: impl AsRef<[u8]>) -> Option<Vec<Bytes>> {
        let index = self.position(name.as_ref())?;
        Some(self.entries.remove(index).values)
    }

    /// Entries as `(name, values)` pairs, in the order names were first inserted.
    pub fn items(&self) -> impl Iterator<Item = (&Bytes, &[Bytes])> {
        self.entries.iter().map(|entry| (&entry.name, entry.values.as_slice()))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry while keeping the allocated storage for reuse.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Converts into an [`http::HeaderMap`], one appended value per stored value.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidHead`] if a name or value is not legal in HTTP.
    pub fn to_header_map(&self) -> Result<HeaderMap, ExchangeError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            let name = HeaderName::from_bytes(&entry.name)
                .map_err(|e| ExchangeError::invalid_head(format!("header name {:?}: {e}", entry.name)))?;
            for value in &entry.values {
                let value = HeaderValue::from_maybe_shared(value.clone())
                    .map_err(|e| ExchangeError::invalid_head(format!("value of header {name}: {e}")))?;
                map.append(name.clone(), value);
            }
        }
        Ok(map)
    }

    fn position(&self, name: &[u8]) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name.as_ref() == name)
    }

    fn push_entry(&mut self, name: Bytes) -> usize {
        self.entries.push(Entry { name, values: Vec::with_capacity(1) });
        self.entries.len() - 1
    }
}

/// Collects an [`http::HeaderMap`], keeping repeated values in order.
impl From<&HeaderMap> for Headers {
    fn from(map: &HeaderMap) -> Self {
        let mut headers = Headers::with_capacity(map.keys_len());
        headers.extend_from(map);
        headers
    }
}

impl Headers {
    pub(crate) fn extend_from(&mut self, map: &HeaderMap) {
        for (name, value) in map {
            self.add(Bytes::copy_from_slice(name.as_str().as_bytes()), Bytes::copy_from_slice(value.as_bytes()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_add_returns_bare_value() {
        let mut headers = Headers::new();
        assert_eq!(headers.add("Accept", "*/*"), &Bytes::from_static(b"*/*"));
        assert_eq!(headers.get("Accept"), Some(HeaderValues::One(&Bytes::from_static(b"*/*"))));
    }

    #[test]
    fn repeated_add_keeps_call_order() {
        let mut headers = Headers::new();
        headers.add("Set-Cookie", "a=1");
        headers.add("Set-Cookie", "b=2");
        headers.add("Set-Cookie", "c=3");

        let values = headers.get("Set-Cookie").unwrap();
        assert!(matches!(values, HeaderValues::Many(_)));
        assert_eq!(values.as_slice(), [Bytes::from_static(b"a=1"), Bytes::from_static(b"b=2"), Bytes::from_static(b"c=3")]);
        assert_eq!(values.first(), Some(&Bytes::from_static(b"a=1")));
    }

    #[test]
    fn set_discards_prior_values() {
        let mut headers = Headers::new();
        headers.add("Vary", "Accept");
        headers.add("Vary", "Origin");
        assert_eq!(headers.set("Vary", "Cookie"), &Bytes::from_static(b"Cookie"));

        assert_eq!(headers.get("Vary"), Some(HeaderValues::One(&Bytes::from_static(b"Cookie"))));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/html");
        assert!(headers.has("Content-Type"));
        assert!(!headers.has("content-type"));
        assert_eq!(headers.get("content-type"), None);
    }

    #[test]
    fn items_follow_insertion_order() {
        let mut headers = Headers::new();
        headers.set("Host", "localhost");
        headers.add("Accept", "text/html");
        headers.set("Connection", "close");
        headers.add("Accept", "*/*");

        let names: Vec<&[u8]> = headers.items().map(|(name, _)| name.as_ref()).collect();
        assert_eq!(names, [&b"Host"[..], &b"Accept"[..], &b"Connection"[..]]);

        let (_, accept) = headers.items().nth(1).unwrap();
        assert_eq!(accept.len(), 2);
    }

    #[test]
    fn reset_forgets_every_name() {
        let mut headers = Headers::from_items([("Host", "localhost"), ("Accept", "*/*")]);
        headers.reset();

        assert!(!headers.has("Host"));
        assert!(!headers.has("Accept"));
        assert!(headers.is_empty());
        assert!(headers.entries.capacity() >= 2);
    }

    #[test]
    fn from_items_overwrites_duplicates() {
        let headers = Headers::from_items([("X-Id", "1"), ("X-Id", "2")]);
        assert_eq!(headers.get("X-Id"), Some(HeaderValues::One(&Bytes::from_static(b"2"))));
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut headers = Headers::from_items([("Host", "localhost")]);
        assert_eq!(headers.remove("Host"), Some(vec![Bytes::from_static(b"localhost")]));
        assert_eq!(headers.remove("Host"), None);
    }

    #[test]
    fn converts_to_and_from_http_header_map() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        headers.add("Set-Cookie", "a=1");
        headers.add("Set-Cookie", "b=2");

        let map = headers.to_header_map().unwrap();
        assert_eq!(map.get(http::header::CONTENT_TYPE).unwrap(), "text/plain");
        let cookies: Vec<_> = map.get_all(http::header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);

        let back = Headers::from(&map);
        assert_eq!(back.get("set-cookie").unwrap().len(), 2);
        assert_eq!(back.get("content-type"), Some(HeaderValues::One(&Bytes::from_static(b"text/plain"))));
    }

    #[test]
    fn illegal_names_fail_conversion() {
        let mut headers = Headers::new();
        headers.set("Bad Name", "x");
        assert!(matches!(headers.to_header_map(), Err(ExchangeError::InvalidHead { .. })));
    }
}
