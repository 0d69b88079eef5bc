//! Shared value types for ResourceSync metadata.
//!
//! This crate holds the wire-level value objects the rest of the
//! workspace composes: the [`Resource`] description of one synchronizable
//! resource, its [`Timestamp`] (W3C Datetime normalization) and its
//! [`Digests`] (the composite fixity-hash field).

pub mod hash;
pub mod link;
pub mod resource;
pub mod timestamp;

// Re-exports
pub use hash::{Digests, HashAlg};
pub use link::{Ln, LnError};
pub use resource::{Change, Resource, ResourceError};
pub use timestamp::{Timestamp, TimestampError};
