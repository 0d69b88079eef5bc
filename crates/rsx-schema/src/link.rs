//! ResourceSync links.
//!
//! An [`Ln`] mirrors the `<rs:ln>` element: a typed link from a list
//! document or a single resource to a related resource (a mirror, a
//! patch, an alternate representation).  `href` and `rel` are mandatory;
//! everything else describes the link target and is optional.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::hash::Digests;
use crate::timestamp::Timestamp;

/// Highest allowed link priority.
pub const PRI_MAX: u32 = 999_999;

/// Errors raised when constructing or mutating an [`Ln`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LnError {
    /// The link target must be non-empty.
    #[error("link href must not be empty")]
    EmptyHref,

    /// The link relation must be non-empty.
    #[error("link rel must not be empty")]
    EmptyRel,

    /// A textual length attribute is not a non-negative integer.
    #[error("invalid link length '{0}': expected a non-negative integer")]
    InvalidLength(String),

    /// A priority outside the allowed range.
    #[error("link pri {0} is outside 1..={PRI_MAX}")]
    PriOutOfRange(u32),

    /// A textual priority attribute is not an integer.
    #[error("invalid link pri '{0}'")]
    InvalidPri(String),
}

/// A typed link carried by a list document or one of its resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ln {
    href: String,
    rel: String,
    #[serde(skip_serializing_if = "Digests::is_empty")]
    hash: Digests,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pri: Option<u32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
}

impl Ln {
    /// Create a link with the two mandatory attributes.
    ///
    /// # Errors
    ///
    /// Returns [`LnError::EmptyHref`] or [`LnError::EmptyRel`] when
    /// either is empty.
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Result<Self, LnError> {
        let href = href.into();
        if href.is_empty() {
            return Err(LnError::EmptyHref);
        }
        let rel = rel.into();
        if rel.is_empty() {
            return Err(LnError::EmptyRel);
        }
        Ok(Self {
            href,
            rel,
            hash: Digests::new(),
            length: None,
            modified: None,
            pri: None,
            media_type: None,
        })
    }

    /// The link target.
    pub fn href(&self) -> &str {
        &self.href
    }

    /// The link relation.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// The composite hash attribute of the link target; empty when no
    /// digest is set.
    pub fn hash(&self) -> String {
        self.hash.encode()
    }

    /// Decode a composite hash attribute, fully replacing all digests.
    pub fn set_hash(&mut self, text: &str) {
        self.hash = Digests::decode(text);
    }

    /// The decoded digest slots of the link target.
    pub fn digests(&self) -> &Digests {
        &self.hash
    }

    /// The link target's byte length, if known.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Set the link target's byte length.
    pub fn set_length(&mut self, length: u64) {
        self.length = Some(length);
    }

    /// Parse a textual length attribute.
    ///
    /// # Errors
    ///
    /// Returns [`LnError::InvalidLength`] for negative or non-numeric
    /// text; the previous value is kept.
    pub fn set_length_str(&mut self, text: &str) -> Result<(), LnError> {
        let length = text
            .parse::<u64>()
            .map_err(|_| LnError::InvalidLength(text.to_string()))?;
        self.length = Some(length);
        Ok(())
    }

    /// The link target's modification instant, if known.
    pub fn modified(&self) -> Option<Timestamp> {
        self.modified
    }

    /// Set the link target's modification instant.
    pub fn set_modified(&mut self, modified: Timestamp) {
        self.modified = Some(modified);
    }

    /// The link priority, if set.
    pub fn pri(&self) -> Option<u32> {
        self.pri
    }

    /// Set the link priority.
    ///
    /// # Errors
    ///
    /// Returns [`LnError::PriOutOfRange`] outside `1..=`[`PRI_MAX`].
    pub fn set_pri(&mut self, pri: u32) -> Result<(), LnError> {
        if !(1..=PRI_MAX).contains(&pri) {
            return Err(LnError::PriOutOfRange(pri));
        }
        self.pri = Some(pri);
        Ok(())
    }

    /// Parse a textual priority attribute.
    ///
    /// # Errors
    ///
    /// Returns [`LnError::InvalidPri`] for non-numeric text and
    /// [`LnError::PriOutOfRange`] outside `1..=`[`PRI_MAX`].
    pub fn set_pri_str(&mut self, text: &str) -> Result<(), LnError> {
        let pri = text
            .parse::<u32>()
            .map_err(|_| LnError::InvalidPri(text.to_string()))?;
        self.set_pri(pri)
    }

    /// The link target's media type, if set.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Set the link target's media type.
    pub fn set_media_type(&mut self, media_type: impl Into<String>) {
        self.media_type = Some(media_type.into());
    }
}

impl<'de> Deserialize<'de> for Ln {
    /// Validated deserialization: the mandatory-attribute and priority
    /// invariants hold for deserialized links too.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            href: String,
            rel: String,
            #[serde(default)]
            hash: Digests,
            #[serde(default)]
            length: Option<u64>,
            #[serde(default)]
            modified: Option<Timestamp>,
            #[serde(default)]
            pri: Option<u32>,
            #[serde(rename = "type", default)]
            media_type: Option<String>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut ln = Ln::new(raw.href, raw.rel).map_err(serde::de::Error::custom)?;
        ln.hash = raw.hash;
        ln.length = raw.length;
        ln.modified = raw.modified;
        if let Some(pri) = raw.pri {
            ln.set_pri(pri).map_err(serde::de::Error::custom)?;
        }
        ln.media_type = raw.media_type;
        Ok(ln)
    }
}
