//! Core library for ResourceSync lists.
//!
//! Composes the value types from [`rsx_schema`] into the collaborator
//! surfaces a synchronization client or server builds on: the ordered
//! [`ResourceList`] container, sitemap XML read/write, directory walking
//! to build lists from disk, and dump size accounting.

pub mod dump;
pub mod list;
pub mod sitemap;
pub mod walk;

// Re-exports
pub use dump::{Dump, DumpError, DumpReport};
pub use list::{ListError, ResourceList};
pub use rsx_schema::{
    Change, Digests, HashAlg, Ln, LnError, Resource, ResourceError, Timestamp, TimestampError,
};
pub use walk::ResourceListBuilder;
