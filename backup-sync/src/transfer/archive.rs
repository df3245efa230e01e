//! In-memory `.tar.gz` construction for an item.

use crate::fs::walker::FileInfo;
use crate::utils::errors::{BackupError, Result};
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Cursor;

/// Default gzip level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// A finished archive, ready to upload.
#[derive(Debug, Clone)]
pub struct ArchiveBlob {
    data: Bytes,
    entries: usize,
    input_bytes: u64,
}

impl ArchiveBlob {
    /// Compressed size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of files in the archive
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Total size of the archived files before compression
    pub fn input_bytes(&self) -> u64 {
        self.input_bytes
    }

    /// Seekable reader over the compressed bytes. Each call starts at 0.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }

    /// Cheap handle to the compressed bytes, for upload.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }
}

/// Build a gzip-compressed tar of `files` for `item_name`.
///
/// Entries are named `<item_name>/<relative path>`, byte for byte as on
/// disk, and appear in the order given. Symlinked files are stored with
/// their target's content. Any file that cannot be read fails the whole
/// archive.
pub fn build_archive(
    item_name: &str,
    files: &[FileInfo],
    compression_level: u32,
) -> Result<ArchiveBlob> {
    if compression_level > 9 {
        return Err(BackupError::Archive(format!(
            "compression level {} out of range 0-9",
            compression_level
        )));
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::new(compression_level));
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(true);

    let mut input_bytes = 0u64;
    for file in files {
        let name = file.rooted_path(item_name);
        builder.append_path_with_name(&file.path, &name).map_err(|e| {
            BackupError::Archive(format!("failed to add {}: {}", file.path.display(), e))
        })?;
        input_bytes += file.size;
    }

    let data = builder.into_inner()?.finish()?;

    Ok(ArchiveBlob {
        data: Bytes::from(data),
        entries: files.len(),
        input_bytes,
    })
}
