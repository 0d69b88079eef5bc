//! Dump size accounting.
//!
//! A dump bundles resource bodies together with a manifest describing
//! them.  Before any packaging happens the builder needs to know whether
//! the dump fits its size ceiling, so [`Dump::check_files`] walks a
//! [`ResourceList`], stats every resource that has a local path, and
//! accumulates the projected dump size: file bytes plus the exact bytes
//! of each resource's manifest line.  Unreadable files are reported, not
//! fatal; the scan always covers the whole list.

use std::fs;
use std::io::Write;

use rsx_schema::Resource;

use crate::list::ResourceList;

/// Newline framing charged per manifest line.
pub const MANIFEST_FRAME_OVERHEAD: u64 = 1;

/// Errors raised during dump size accounting.
#[derive(thiserror::Error, Debug)]
pub enum DumpError {
    /// The projected dump size exceeds the configured maximum.
    #[error("dump too big: {size} bytes exceeds maximum of {max}")]
    TooBig {
        /// Projected total size in bytes.
        size: u64,
        /// Configured maximum in bytes.
        max: u64,
    },

    /// A manifest line could not be serialized.
    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Writing the manifest failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a [`Dump::check_files`] scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpReport {
    /// Projected dump size: file bytes plus manifest bytes for every
    /// resource that could be sized.
    pub total_size: u64,
    /// URIs of resources whose path could not be stat'ed or is not a
    /// regular file.
    pub unreadable: Vec<String>,
}

/// Size accounting and manifest writing for dump construction.
///
/// The on-disk manifest is JSON lines: one serialized [`Resource`] per
/// line.  The per-entry overhead charged by `check_files` is therefore
/// exact and deterministic (the serialized line length plus
/// [`MANIFEST_FRAME_OVERHEAD`]), not an estimated constant.
#[derive(Debug, Clone)]
pub struct Dump {
    max_size: u64,
}

impl Dump {
    /// Default dump size ceiling: 50 MiB.
    pub const DEFAULT_MAX_SIZE: u64 = 50 * 1024 * 1024;

    /// A dump accountant with the default size ceiling.
    pub fn new() -> Self {
        Self {
            max_size: Self::DEFAULT_MAX_SIZE,
        }
    }

    /// A dump accountant with a custom size ceiling in bytes.
    pub fn with_max_size(max_size: u64) -> Self {
        Self { max_size }
    }

    /// The manifest bytes one resource contributes to the dump total.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError::Manifest`] if the resource cannot be
    /// serialized (not expected for well-formed resources).
    pub fn entry_overhead(resource: &Resource) -> Result<u64, DumpError> {
        Ok(serde_json::to_string(resource)?.len() as u64 + MANIFEST_FRAME_OVERHEAD)
    }

    /// Stat every resource with a local path and accumulate the projected
    /// dump size.
    ///
    /// Resources without a path are skipped.  A path that is missing or
    /// not a regular file puts the resource's URI on the `unreadable`
    /// list and the scan continues; partial failure never aborts the
    /// whole accounting.  The sum is a plain addition, so a parallel
    /// implementation is free to stat concurrently and merge.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError::TooBig`] when the accumulated total exceeds
    /// the configured maximum.
    pub fn check_files(&self, list: &ResourceList) -> Result<DumpReport, DumpError> {
        let mut report = DumpReport::default();
        for resource in list {
            let Some(path) = resource.path() else {
                continue;
            };
            match fs::metadata(path) {
                Ok(meta) if meta.is_file() => {
                    report.total_size += meta.len() + Self::entry_overhead(resource)?;
                }
                Ok(_) => {
                    tracing::warn!("{} is not a regular file for {}", path.display(), resource.uri());
                    report.unreadable.push(resource.uri().to_string());
                }
                Err(err) => {
                    tracing::warn!("cannot stat {} for {}: {err}", path.display(), resource.uri());
                    report.unreadable.push(resource.uri().to_string());
                }
            }
        }
        if report.total_size > self.max_size {
            return Err(DumpError::TooBig {
                size: report.total_size,
                max: self.max_size,
            });
        }
        Ok(report)
    }

    /// Write the JSON-lines manifest for every resource with a path.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError::Manifest`] on serialization failure and
    /// [`DumpError::Io`] on write failure.
    pub fn write_manifest<W: Write>(&self, list: &ResourceList, mut out: W) -> Result<(), DumpError> {
        for resource in list {
            if resource.path().is_none() {
                continue;
            }
            serde_json::to_writer(&mut out, resource)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl Default for Dump {
    fn default() -> Self {
        Self::new()
    }
}
