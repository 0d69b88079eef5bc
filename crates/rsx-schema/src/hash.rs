//! Composite fixity-hash field.
//!
//! ResourceSync expresses content integrity as a single `hash` attribute
//! holding space-separated `algorithm:digest` tokens, e.g.
//! `md5:aaa sha-1:bbb`.  [`Digests`] is the decoded form: one independent
//! slot per recognized algorithm, re-encoded in a fixed canonical order.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The closed set of digest algorithms a ResourceSync document may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlg {
    /// MD5, token `md5`.
    Md5,
    /// SHA-1, token `sha-1`.
    Sha1,
    /// SHA-256, token `sha-256`.
    Sha256,
}

impl HashAlg {
    /// All recognized algorithms, in the canonical encode order.
    pub const ALL: [HashAlg; 3] = [HashAlg::Md5, HashAlg::Sha1, HashAlg::Sha256];

    /// The wire token for this algorithm.
    pub fn token(self) -> &'static str {
        match self {
            HashAlg::Md5 => "md5",
            HashAlg::Sha1 => "sha-1",
            HashAlg::Sha256 => "sha-256",
        }
    }

    /// Look up a wire token; `None` for unrecognized algorithm names.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "md5" => Some(HashAlg::Md5),
            "sha-1" => Some(HashAlg::Sha1),
            "sha-256" => Some(HashAlg::Sha256),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            HashAlg::Md5 => 0,
            HashAlg::Sha1 => 1,
            HashAlg::Sha256 => 2,
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Per-algorithm digest values, decoded from or encoded to the composite
/// `hash` attribute.
///
/// Decoding is deliberately lenient: tokens naming an unrecognized
/// algorithm and tokens without a colon are skipped, never errors.  The
/// encode order is fixed (`md5`, `sha-1`, `sha-256`) regardless of the
/// order digests were set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digests {
    slots: [Option<String>; 3],
}

impl Digests {
    /// An empty set of digests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a composite hash string, fully replacing any prior content.
    pub fn decode(text: &str) -> Self {
        let mut digests = Self::new();
        for token in text.split_ascii_whitespace() {
            let Some((name, value)) = token.split_once(':') else {
                tracing::debug!("skipping malformed hash token '{token}'");
                continue;
            };
            match HashAlg::from_token(name) {
                Some(alg) => digests.set(alg, value),
                None => tracing::debug!("skipping unrecognized hash algorithm '{name}'"),
            }
        }
        digests
    }

    /// Encode the present digests in canonical order, space-separated.
    /// Empty string when no digest is set.
    pub fn encode(&self) -> String {
        let mut tokens = Vec::new();
        for alg in HashAlg::ALL {
            if let Some(value) = self.get(alg) {
                tokens.push(format!("{}:{value}", alg.token()));
            }
        }
        tokens.join(" ")
    }

    /// The digest for one algorithm, if set.
    pub fn get(&self, alg: HashAlg) -> Option<&str> {
        self.slots[alg.slot()].as_deref()
    }

    /// Set the digest for one algorithm.
    pub fn set(&mut self, alg: HashAlg, value: impl Into<String>) {
        self.slots[alg.slot()] = Some(value.into());
    }

    /// Clear the digest for one algorithm.
    pub fn clear(&mut self, alg: HashAlg) {
        self.slots[alg.slot()] = None;
    }

    /// True when no digest is set.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl Serialize for Digests {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Digests {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::decode(&s))
    }
}
