//! Build a [`ResourceList`] from a directory tree.
//!
//! Maps every regular file under a base directory to a resource: the URI
//! comes from the relative path joined onto a base URI, the length and
//! modification instant from file metadata, and optionally a `sha-256`
//! digest computed by streaming the file contents.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rsx_schema::{Resource, Timestamp};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::list::ResourceList;

/// Walks a directory tree and produces one resource per regular file.
#[derive(Debug, Clone)]
pub struct ResourceListBuilder {
    base_path: PathBuf,
    base_uri: String,
    compute_digests: bool,
}

impl ResourceListBuilder {
    /// Map files under `base_path` to URIs under `base_uri`.
    pub fn new(base_path: impl Into<PathBuf>, base_uri: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_uri: base_uri.into(),
            compute_digests: false,
        }
    }

    /// Also compute a `sha-256` digest for every file.
    pub fn with_digests(mut self) -> Self {
        self.compute_digests = true;
        self
    }

    /// Walk the tree and build the list, in stable filename order.
    ///
    /// # Errors
    ///
    /// Fails if the walk, file metadata, or digest computation fails;
    /// an unreadable tree is an error here, unlike the lenient dump scan.
    pub fn build(&self) -> Result<ResourceList> {
        let mut list = ResourceList::new();
        let base_uri = self.base_uri.trim_end_matches('/');
        for entry in WalkDir::new(&self.base_path).sort_by_file_name() {
            let entry = entry.context("failed to walk resource directory")?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.base_path)
                .context("walked entry outside the base directory")?;
            let uri = format!("{base_uri}/{}", uri_path(relative));

            let meta = entry
                .metadata()
                .with_context(|| format!("failed to stat {}", entry.path().display()))?;
            let mut resource = Resource::new(uri)?
                .with_length(meta.len())
                .with_path(entry.path());
            if let Ok(modified) = meta.modified() {
                resource.set_timestamp(Timestamp::from(DateTime::<Utc>::from(modified)));
            }
            if self.compute_digests {
                let digest = sha256_file(entry.path())
                    .with_context(|| format!("failed to digest {}", entry.path().display()))?;
                resource.set_sha256(digest);
            }
            list.add(resource)?;
        }
        Ok(list)
    }
}

/// Relative path rendered with `/` separators for use in a URI.
fn uri_path(relative: &Path) -> String {
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts.join("/")
}

/// Hex SHA-256 of a file's contents, streamed in 64 KiB chunks.
fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 65536];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_build_maps_files_to_uris() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"abc").unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"defg").unwrap();

        let list = ResourceListBuilder::new(dir.path(), "http://ex.org/")
            .build()
            .unwrap();
        assert_eq!(list.len(), 2);

        let a = list.get("http://ex.org/a.txt").unwrap();
        assert_eq!(a.length(), Some(3));
        assert!(a.timestamp().is_some());
        assert_eq!(a.path(), Some(dir.path().join("a.txt").as_path()));

        let b = list.get("http://ex.org/sub/b.txt").unwrap();
        assert_eq!(b.length(), Some(4));
    }

    #[test]
    fn test_build_with_digests() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"abc").unwrap();

        let list = ResourceListBuilder::new(dir.path(), "http://ex.org")
            .with_digests()
            .build()
            .unwrap();
        assert_eq!(
            list.get("http://ex.org/a.txt").unwrap().sha256(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_built_list_feeds_dump_accounting() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), b"x").unwrap();

        let list = ResourceListBuilder::new(dir.path(), "http://ex.org")
            .build()
            .unwrap();
        let report = crate::dump::Dump::new().check_files(&list).unwrap();
        assert!(report.unreadable.is_empty());
        assert!(report.total_size > 1);
    }
}
