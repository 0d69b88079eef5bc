//! Ordered resource container.
//!
//! A [`ResourceList`] is the in-memory form of a ResourceSync list
//! document: resources in insertion order, indexed by URI, together with
//! the document-level metadata (`capability`, `modified`) that ends up in
//! the sitemap preamble.

use std::collections::HashMap;
use std::slice;

use rsx_schema::{Ln, Resource, Timestamp};
use thiserror::Error;

/// Errors raised when mutating a [`ResourceList`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// A resource with this URI is already in the list.
    #[error("duplicate resource uri '{0}'")]
    Duplicate(String),
}

/// An insertion-ordered collection of resources with URI lookup.
#[derive(Debug, Clone, Default)]
pub struct ResourceList {
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
    capability: Option<String>,
    modified: Option<Timestamp>,
    ln: Vec<Ln>,
}

impl ResourceList {
    /// An empty list with no document metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form: set the capability name of the document this list
    /// will serialize to (`resourcelist`, `changelist`, ...).
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    /// Append a resource, preserving insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Duplicate`] when a resource with the same URI
    /// is already present; the list is unchanged.
    pub fn add(&mut self, resource: Resource) -> Result<(), ListError> {
        if self.index.contains_key(resource.uri()) {
            return Err(ListError::Duplicate(resource.uri().to_string()));
        }
        self.index
            .insert(resource.uri().to_string(), self.resources.len());
        self.resources.push(resource);
        Ok(())
    }

    /// Append a resource, or overwrite an existing one in place.  An
    /// overwritten resource keeps its original insertion slot.
    pub fn add_or_replace(&mut self, resource: Resource) {
        match self.index.get(resource.uri()) {
            Some(&slot) => self.resources[slot] = resource,
            None => {
                self.index
                    .insert(resource.uri().to_string(), self.resources.len());
                self.resources.push(resource);
            }
        }
    }

    /// Look up a resource by URI.
    pub fn get(&self, uri: &str) -> Option<&Resource> {
        self.index.get(uri).map(|&slot| &self.resources[slot])
    }

    /// Mutable lookup by URI.
    pub fn get_mut(&mut self, uri: &str) -> Option<&mut Resource> {
        let slot = *self.index.get(uri)?;
        Some(&mut self.resources[slot])
    }

    /// True when a resource with this URI is present.
    pub fn contains(&self, uri: &str) -> bool {
        self.index.contains_key(uri)
    }

    /// Number of resources in the list.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// True when the list holds no resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterate resources in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    /// Running byte total over the resources with a known length.
    pub fn total_length(&self) -> u64 {
        self.resources.iter().filter_map(Resource::length).sum()
    }

    /// The capability name of this list document, if set.
    pub fn capability(&self) -> Option<&str> {
        self.capability.as_deref()
    }

    /// Set the capability name.
    pub fn set_capability(&mut self, capability: impl Into<String>) {
        self.capability = Some(capability.into());
    }

    /// The document-level modification instant, if set.
    pub fn modified(&self) -> Option<Timestamp> {
        self.modified
    }

    /// Set the document-level modification instant.
    pub fn set_modified(&mut self, modified: Timestamp) {
        self.modified = Some(modified);
    }

    /// The document-level links (`up`, `describedby`, ...).
    pub fn links(&self) -> &[Ln] {
        &self.ln
    }

    /// Attach a document-level link.
    pub fn add_link(&mut self, ln: Ln) {
        self.ln.push(ln);
    }
}

impl<'a> IntoIterator for &'a ResourceList {
    type Item = &'a Resource;
    type IntoIter = slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

impl IntoIterator for ResourceList {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}
