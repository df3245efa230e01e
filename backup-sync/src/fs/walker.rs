//! Directory traversal for backup items.
//!
//! Enumerates the top-level items under a backup root and, for each item,
//! the sorted list of files it contains. The sort order is what makes the
//! item fingerprint stable across runs.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Follow symbolic links to directories while descending
    pub follow_links: bool,

    /// File or directory names to leave out (exact match)
    pub exclude_patterns: Vec<String>,
}

/// A top-level directory under the backup root.
#[derive(Debug, Clone)]
pub struct Item {
    /// Directory name, used to derive the remote keys
    pub name: String,

    /// Full path to the item directory
    pub root: PathBuf,
}

/// An entry under the backup root that could not become an [`Item`].
#[derive(Debug, Clone)]
pub struct RejectedEntry {
    /// Lossy rendering of the entry name, for reporting
    pub display_name: String,

    /// Full path to the entry
    pub path: PathBuf,
}

/// Result of listing the backup root.
#[derive(Debug, Default)]
pub struct ItemListing {
    pub items: Vec<Item>,
    pub rejected: Vec<RejectedEntry>,
}

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the item root
    pub relative_path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Is this a symlink?
    pub is_symlink: bool,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// For symlinks, resolves to the target to get the real file size.
    /// Returns None if the entry is a directory, or a symlink whose target
    /// is a directory or cannot be resolved.
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        let is_symlink = entry.path_is_symlink();

        let size = if is_symlink {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_file() => resolved.len(),
                // Symlink to a directory, or broken
                _ => return Ok(None),
            }
        } else if raw_metadata.is_file() {
            raw_metadata.len()
        } else {
            return Ok(None);
        };

        Ok(Some(Self {
            path,
            relative_path,
            size,
            is_symlink,
        }))
    }

    /// Path of this file relative to the backup root: `<item_name>/<path inside item>`.
    ///
    /// Used as the archive entry name. The components are the raw names
    /// from disk, so names that are not valid UTF-8 stay distinct.
    pub fn rooted_path(&self, item_name: &str) -> PathBuf {
        Path::new(item_name).join(&self.relative_path)
    }

    /// Bytes of [`rooted_path`](Self::rooted_path) with `/` separators on
    /// every platform. This is what the fingerprint hashes.
    pub fn rooted_bytes(&self, item_name: &str) -> Vec<u8> {
        let mut bytes = item_name.as_bytes().to_vec();
        for component in self.relative_path.components() {
            match component {
                Component::Normal(part) => {
                    bytes.push(b'/');
                    bytes.extend_from_slice(&name_bytes(part));
                }
                Component::ParentDir => bytes.extend_from_slice(b"/.."),
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
        bytes
    }
}

/// Raw bytes of a file name.
#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_bytes())
}

/// Names on non-unix platforms are UTF-16; unpaired surrogates are the only
/// lossy case.
#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// List the top-level directories under `root`, sorted by name.
///
/// Non-directory entries are skipped. Entries whose name is not valid UTF-8
/// cannot be mapped to a remote key and are returned as rejected.
pub fn list_items(root: &Path, options: &WalkOptions) -> std::io::Result<ItemListing> {
    let mut listing = ItemListing::default();

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();

        // Follows symlinks, so a link to a directory is an item
        if !path.is_dir() {
            tracing::debug!("Skipping non-directory entry: {}", path.display());
            continue;
        }

        let file_name = entry.file_name();
        if is_excluded(&file_name.to_string_lossy(), &options.exclude_patterns) {
            continue;
        }

        match file_name.into_string() {
            Ok(name) => listing.items.push(Item { name, root: path }),
            Err(raw) => listing.rejected.push(RejectedEntry {
                display_name: raw.to_string_lossy().into_owned(),
                path,
            }),
        }
    }

    listing.items.sort_by(|a, b| a.name.cmp(&b.name));
    listing.rejected.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(listing)
}

/// Walk a directory tree and collect all files, sorted by relative path.
///
/// Paths compare component by component, so `a/b` sorts before `a-c`.
///
/// # Arguments
/// * `root` - Root directory to start walking from
/// * `options` - Walking options (filters, link handling)
///
/// # Returns
/// * `Ok(Vec<FileInfo>)` - List of all files found
/// * `Err(io::Error)` - If any directory or entry cannot be read
///
/// # Example
/// ```no_run
/// use backup_sync::fs::walker::{walk_directory, WalkOptions};
/// use std::path::Path;
///
/// let files = walk_directory(Path::new("/data/photos"), &WalkOptions::default()).unwrap();
/// println!("Found {} files", files.len());
/// ```
pub fn walk_directory(root: &Path, options: &WalkOptions) -> std::io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            !is_excluded(&entry.file_name().to_string_lossy(), &options.exclude_patterns)
        });

    for entry in walker {
        let entry = entry?;

        if entry.file_type().is_dir() {
            continue;
        }

        if let Some(file_info) = FileInfo::from_entry(&entry, root)? {
            files.push(file_info);
        }
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(files)
}

fn is_excluded(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| pattern == name)
}
