//! The Resource value object.
//!
//! A [`Resource`] describes one synchronizable network resource: its URI,
//! last-modification instant, byte length, fixity digests, and the
//! bookkeeping fields the surrounding list documents use (a local path for
//! dump construction, a change type for change lists).
//!
//! Equality is structural over `(uri, timestamp truncated to whole
//! seconds)` only.  Two descriptions of the same resource produced from
//! different `lastmod` dialects, or with digests recorded by different
//! tools, still compare equal.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::hash::{Digests, HashAlg};
use crate::link::Ln;
use crate::timestamp::{Timestamp, TimestampError};

/// Errors raised when constructing or mutating a [`Resource`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The identifying URI must be non-empty.
    #[error("resource uri must not be empty")]
    EmptyUri,

    /// A `lastmod` string failed to normalize; the prior value is kept.
    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    /// A textual length attribute is not a non-negative integer.
    #[error("invalid length '{0}': expected a non-negative integer")]
    InvalidLength(String),
}

/// Change type carried by change list entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    /// The resource was created.
    Created,
    /// The resource was updated.
    Updated,
    /// The resource was deleted.
    Deleted,
}

impl Change {
    /// The wire token for this change type.
    pub fn token(self) -> &'static str {
        match self {
            Change::Created => "created",
            Change::Updated => "updated",
            Change::Deleted => "deleted",
        }
    }

    /// Look up a wire token; `None` for anything else.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "created" => Some(Change::Created),
            "updated" => Some(Change::Updated),
            "deleted" => Some(Change::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Descriptive metadata for one synchronizable resource.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    uri: String,
    #[serde(rename = "lastmod", skip_serializing_if = "Option::is_none")]
    timestamp: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<u64>,
    #[serde(rename = "hash", skip_serializing_if = "Digests::is_empty")]
    digests: Digests,
    // Local bookkeeping, never serialized to list documents.
    #[serde(skip)]
    path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    change: Option<Change>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capability: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ln: Vec<Ln>,
}

impl Resource {
    /// Create a resource identified by `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::EmptyUri`] when `uri` is empty.  The URI is
    /// otherwise opaque; no URI-syntax validation happens here.
    pub fn new(uri: impl Into<String>) -> Result<Self, ResourceError> {
        let uri = uri.into();
        if uri.is_empty() {
            return Err(ResourceError::EmptyUri);
        }
        Ok(Self {
            uri,
            timestamp: None,
            length: None,
            digests: Digests::new(),
            path: None,
            change: None,
            capability: None,
            media_type: None,
            ln: Vec::new(),
        })
    }

    /// Builder form: parse and attach a `lastmod` string.
    ///
    /// # Errors
    ///
    /// Fails like [`Resource::set_lastmod`].
    pub fn with_lastmod(mut self, lastmod: &str) -> Result<Self, ResourceError> {
        self.set_lastmod(lastmod)?;
        Ok(self)
    }

    /// Builder form: attach a byte length.
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Builder form: attach a local file path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// The identifying URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The last-modification instant, if known.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// Set the last-modification instant directly.
    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = Some(timestamp);
    }

    /// The canonical `lastmod` string, if a timestamp is set.
    pub fn lastmod(&self) -> Option<String> {
        self.timestamp.map(|ts| ts.to_string())
    }

    /// Parse a W3C Datetime string and store it as the timestamp.
    ///
    /// # Errors
    ///
    /// Surfaces the [`TimestampError`] unchanged; on failure the previous
    /// timestamp is left untouched (the parse happens before assignment).
    pub fn set_lastmod(&mut self, lastmod: &str) -> Result<(), ResourceError> {
        self.timestamp = Some(Timestamp::parse(lastmod)?);
        Ok(())
    }

    /// The byte length, if known.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Set the byte length.
    pub fn set_length(&mut self, length: u64) {
        self.length = Some(length);
    }

    /// Parse a textual length attribute (as found in list documents).
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidLength`] for negative or
    /// non-numeric text; the previous value is kept.
    pub fn set_length_str(&mut self, text: &str) -> Result<(), ResourceError> {
        let length = text
            .parse::<u64>()
            .map_err(|_| ResourceError::InvalidLength(text.to_string()))?;
        self.length = Some(length);
        Ok(())
    }

    /// The composite hash attribute in canonical order; empty when no
    /// digest is set.
    pub fn hash(&self) -> String {
        self.digests.encode()
    }

    /// Decode a composite hash attribute, fully replacing all digests.
    ///
    /// Lenient by contract: unknown algorithms and malformed tokens are
    /// dropped, so previously set digests they would have named are
    /// cleared rather than kept.
    pub fn set_hash(&mut self, text: &str) {
        self.digests = Digests::decode(text);
    }

    /// The decoded digest slots.
    pub fn digests(&self) -> &Digests {
        &self.digests
    }

    /// The MD5 digest, if set.
    pub fn md5(&self) -> Option<&str> {
        self.digests.get(HashAlg::Md5)
    }

    /// Set the MD5 digest.
    pub fn set_md5(&mut self, value: impl Into<String>) {
        self.digests.set(HashAlg::Md5, value);
    }

    /// The SHA-1 digest, if set.
    pub fn sha1(&self) -> Option<&str> {
        self.digests.get(HashAlg::Sha1)
    }

    /// Set the SHA-1 digest.
    pub fn set_sha1(&mut self, value: impl Into<String>) {
        self.digests.set(HashAlg::Sha1, value);
    }

    /// The SHA-256 digest, if set.
    pub fn sha256(&self) -> Option<&str> {
        self.digests.get(HashAlg::Sha256)
    }

    /// Set the SHA-256 digest.
    pub fn set_sha256(&mut self, value: impl Into<String>) {
        self.digests.set(HashAlg::Sha256, value);
    }

    /// The local file backing this resource, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set the local file path.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// The change type, if this resource is a change list entry.
    pub fn change(&self) -> Option<Change> {
        self.change
    }

    /// Set the change type.
    pub fn set_change(&mut self, change: Change) {
        self.change = Some(change);
    }

    /// The capability name, if this entry points at a capability document.
    pub fn capability(&self) -> Option<&str> {
        self.capability.as_deref()
    }

    /// Set the capability name.
    pub fn set_capability(&mut self, capability: impl Into<String>) {
        self.capability = Some(capability.into());
    }

    /// The media type of the resource, if known.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Set the media type.
    pub fn set_media_type(&mut self, media_type: impl Into<String>) {
        self.media_type = Some(media_type.into());
    }

    /// The links attached to this resource.
    pub fn links(&self) -> &[Ln] {
        &self.ln
    }

    /// Attach a link.
    pub fn add_link(&mut self, ln: Ln) {
        self.ln.push(ln);
    }

    /// The timestamp truncated to whole seconds, the equality view.
    fn equality_instant(&self) -> Option<i64> {
        self.timestamp.map(|ts| ts.whole_seconds())
    }
}

impl<'de> Deserialize<'de> for Resource {
    /// Validated deserialization: the non-empty-URI invariant holds for
    /// deserialized resources just as for constructed ones.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            uri: String,
            #[serde(rename = "lastmod", default)]
            timestamp: Option<Timestamp>,
            #[serde(default)]
            length: Option<u64>,
            #[serde(rename = "hash", default)]
            digests: Digests,
            #[serde(default)]
            change: Option<Change>,
            #[serde(default)]
            capability: Option<String>,
            #[serde(rename = "type", default)]
            media_type: Option<String>,
            #[serde(default)]
            ln: Vec<Ln>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut resource = Resource::new(raw.uri).map_err(serde::de::Error::custom)?;
        resource.timestamp = raw.timestamp;
        resource.length = raw.length;
        resource.digests = raw.digests;
        resource.change = raw.change;
        resource.capability = raw.capability;
        resource.media_type = raw.media_type;
        resource.ln = raw.ln;
        Ok(resource)
    }
}

impl PartialEq for Resource {
    /// Structural equality over `(uri, whole-second timestamp)`.  Length,
    /// digests and local bookkeeping never take part.
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.equality_instant() == other.equality_instant()
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.equality_instant().hash(state);
    }
}

impl fmt::Display for Resource {
    /// Diagnostic form `[ uri | lastmod ]`, not a wire format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {} | {} ]", self.uri, self.lastmod().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_uri_no_timestamp() {
        let r1 = Resource::new("a").unwrap();
        let r2 = Resource::new("a").unwrap();
        assert_eq!(r1, r1);
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_empty_uri_rejected() {
        assert_eq!(Resource::new("").err(), Some(ResourceError::EmptyUri));
    }

    #[test]
    fn test_all_dialects_give_equal_resources() {
        let reference = Resource::new("a")
            .unwrap()
            .with_lastmod("2012-01-01T00:00:00Z")
            .unwrap();
        let mut other = Resource::new("a").unwrap();
        for lastmod in [
            "2012",
            "2012-01",
            "2012-01-01",
            "2012-01-01T00:00Z",
            "2012-01-01T00:00:00Z",
            "2012-01-01T00:00:00.000000Z",
            "2012-01-01T00:00:00.00+00:00",
            "2012-01-01T00:00:00.00-00:00",
            "2012-01-01T02:00:00.00-02:00",
            "2011-12-31T23:00:00.00+01:00",
        ] {
            other.set_lastmod(lastmod).unwrap();
            assert_eq!(reference, other, "lastmod {lastmod}");
        }
    }

    #[test]
    fn test_subsecond_difference_is_equal() {
        let r1 = Resource::new("a")
            .unwrap()
            .with_lastmod("2012-01-02T01:02:03Z")
            .unwrap();
        let r2 = Resource::new("a")
            .unwrap()
            .with_lastmod("2012-01-02T01:02:03.99Z")
            .unwrap();
        // Stored instants differ below a second, resources do not.
        assert_ne!(r1.timestamp(), r2.timestamp());
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_unequal_resources() {
        let a = Resource::new("a").unwrap();
        let b = Resource::new("b").unwrap();
        assert_ne!(a, b);

        let early = Resource::new("a").unwrap().with_lastmod("2012-01-11").unwrap();
        let late = Resource::new("a").unwrap().with_lastmod("2012-01-22").unwrap();
        assert_ne!(early, late);
    }

    #[test]
    fn test_length_and_hashes_not_in_equality() {
        let mut r1 = Resource::new("a").unwrap().with_length(1);
        let mut r2 = Resource::new("a").unwrap().with_length(2);
        r1.set_md5("aaa");
        r2.set_sha1("bbb");
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_bad_lastmod_keeps_prior_value() {
        let mut r = Resource::new("4").unwrap();
        r.set_lastmod("2012-03-14").unwrap();
        assert!(r.set_lastmod("bad_lastmod").is_err());
        assert_eq!(r.lastmod().as_deref(), Some("2012-03-14T00:00:00Z"));
    }

    #[test]
    fn test_lastmod_renders_canonically() {
        let mut r = Resource::new("a").unwrap();
        r.set_lastmod("2012-03-14").unwrap();
        assert_eq!(r.lastmod().as_deref(), Some("2012-03-14T00:00:00Z"));
        r.set_lastmod("2012-03-14T18:37:36Z").unwrap();
        assert_eq!(r.lastmod().as_deref(), Some("2012-03-14T18:37:36Z"));
    }

    #[test]
    fn test_multiple_hashes() {
        let mut r1 = Resource::new("abcd").unwrap();
        r1.set_md5("some_md5");
        r1.set_sha1("some_sha1");
        r1.set_sha256("some_sha256");
        assert_eq!(r1.md5(), Some("some_md5"));
        assert_eq!(r1.sha1(), Some("some_sha1"));
        assert_eq!(r1.sha256(), Some("some_sha256"));
        assert_eq!(r1.hash(), "md5:some_md5 sha-1:some_sha1 sha-256:some_sha256");
    }

    #[test]
    fn test_set_hash_replaces() {
        let mut r2 = Resource::new("def").unwrap();
        r2.set_hash("md5:ddd");
        assert_eq!(r2.md5(), Some("ddd"));
        assert_eq!(r2.sha1(), None);
        r2.set_hash("sha-1:eee");
        assert_eq!(r2.md5(), None);
        assert_eq!(r2.sha1(), Some("eee"));
        r2.set_hash("md5:fff sha-1:eee sha-256:ggg");
        assert_eq!(r2.md5(), Some("fff"));
        assert_eq!(r2.sha1(), Some("eee"));
        assert_eq!(r2.sha256(), Some("ggg"));
    }

    #[test]
    fn test_invalid_length_text() {
        let mut r = Resource::new("a").unwrap();
        assert!(r.set_length_str("-5").is_err());
        assert!(r.set_length_str("abc").is_err());
        r.set_length_str("42").unwrap();
        assert_eq!(r.length(), Some(42));
    }

    #[test]
    fn test_display() {
        let r = Resource::new("abc").unwrap().with_lastmod("2012-01-01").unwrap();
        assert_eq!(r.to_string(), "[ abc | 2012-01-01T00:00:00Z ]");
        let bare = Resource::new("abc").unwrap();
        assert_eq!(bare.to_string(), "[ abc |  ]");
    }

    #[test]
    fn test_deserialize_rejects_empty_uri() {
        assert!(serde_json::from_str::<Resource>(r#"{"uri":""}"#).is_err());
        let r: Resource = serde_json::from_str(r#"{"uri":"http://ex.org/a"}"#).unwrap();
        assert_eq!(r.uri(), "http://ex.org/a");
    }

    #[test]
    fn test_links_and_media_type_roundtrip() {
        let mut r = Resource::new("http://ex.org/a").unwrap();
        r.set_media_type("application/pdf");
        let mut ln = Ln::new("http://ex.org/a.html", "alternate").unwrap();
        ln.set_media_type("text/html");
        r.add_link(ln);

        let json = serde_json::to_string(&r).unwrap();
        let back: Resource = serde_json::from_str(&json).unwrap();
        assert_eq!(back.media_type(), Some("application/pdf"));
        assert_eq!(back.links(), r.links());
    }

    #[test]
    fn test_serialized_form() {
        let mut r = Resource::new("http://ex.org/a")
            .unwrap()
            .with_lastmod("2012-01-01")
            .unwrap()
            .with_length(7)
            .with_path("/tmp/a");
        r.set_md5("ddd");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "uri": "http://ex.org/a",
                "lastmod": "2012-01-01T00:00:00Z",
                "length": 7,
                "hash": "md5:ddd",
            })
        );
    }
}
