//! Item fingerprints.
//!
//! A fingerprint is the MD5 digest of an item's sorted file paths and,
//! optionally, their contents. It is the only change-detection signal:
//! archive bytes are never compared.

use crate::fs::walker::{walk_directory, FileInfo, WalkOptions};
use crate::utils::errors::{BackupError, Result};
use md5::{Digest, Md5};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

/// Hex MD5 digest identifying an item's file set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint the directory at `item_root`, walking it with `options`.
///
/// The item name used in the hashed paths is the last component of
/// `item_root`. Pass the same options as the run so the digest matches the
/// one stored in the marker.
pub fn fingerprint(
    item_root: &Path,
    options: &WalkOptions,
    include_content: bool,
) -> Result<Fingerprint> {
    let item_name = item_root
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BackupError::InvalidItemName(item_root.to_path_buf()))?;

    let files = walk_directory(item_root, options)?;
    Ok(fingerprint_files(item_name, &files, include_content)?)
}

/// Fingerprint an already walked, sorted file list.
///
/// Each file contributes the raw bytes of `<item_name>/<relative path>`,
/// followed by its contents when `include_content` is set. A file that cannot be read aborts
/// the whole fingerprint.
pub fn fingerprint_files(
    item_name: &str,
    files: &[FileInfo],
    include_content: bool,
) -> io::Result<Fingerprint> {
    let mut hasher = Md5::new();

    for file in files {
        hasher.update(file.rooted_bytes(item_name));

        if include_content {
            let mut reader = File::open(&file.path)?;
            io::copy(&mut reader, &mut hasher)?;
        }
    }

    Ok(Fingerprint(format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

    fn fp(item: &Path, include_content: bool) -> Result<Fingerprint> {
        fingerprint(item, &WalkOptions::default(), include_content)
    }

    fn photos() -> std::io::Result<(TempDir, PathBuf)> {
        let temp_dir = TempDir::new()?;
        let item = temp_dir.path().join("photos");
        fs::create_dir(&item)?;
        fs::write(item.join("a.jpg"), b"first image")?;
        fs::write(item.join("b.jpg"), b"second image")?;
        Ok((temp_dir, item))
    }

    #[test]
    fn test_empty_item_has_fixed_digest() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let item = temp_dir.path().join("empty");
        fs::create_dir(&item)?;

        assert_eq!(fp(&item, false)?.as_str(), EMPTY_MD5);
        assert_eq!(fp(&item, true)?.as_str(), EMPTY_MD5);
        Ok(())
    }

    #[test]
    fn test_path_only_digest_matches_known_value() -> Result<()> {
        let (_temp, item) = photos()?;
        // md5("photos/a.jpgphotos/b.jpg")
        let expected = format!("{:x}", Md5::digest(b"photos/a.jpgphotos/b.jpg"));
        assert_eq!(fp(&item, false)?.as_str(), expected);
        Ok(())
    }

    #[test]
    fn test_digest_is_lowercase_hex() -> Result<()> {
        let (_temp, item) = photos()?;
        let fp = fp(&item, true)?;
        assert_eq!(fp.as_str().len(), 32);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        Ok(())
    }

    #[test]
    fn test_deterministic_across_calls() -> Result<()> {
        let (_temp, item) = photos()?;
        assert_eq!(fp(&item, true)?, fp(&item, true)?);
        assert_eq!(fp(&item, false)?, fp(&item, false)?);
        Ok(())
    }

    #[test]
    fn test_creation_order_does_not_matter() -> Result<()> {
        let first = TempDir::new()?;
        let second = TempDir::new()?;
        let a = first.path().join("docs");
        let b = second.path().join("docs");
        fs::create_dir_all(a.join("sub"))?;
        fs::create_dir_all(b.join("sub"))?;

        fs::write(a.join("x.txt"), b"x")?;
        fs::write(a.join("sub/y.txt"), b"y")?;
        fs::write(a.join("z.txt"), b"z")?;

        fs::write(b.join("z.txt"), b"z")?;
        fs::write(b.join("sub/y.txt"), b"y")?;
        fs::write(b.join("x.txt"), b"x")?;

        assert_eq!(fp(&a, true)?, fp(&b, true)?);
        Ok(())
    }

    #[test]
    fn test_structural_changes_change_digest() -> Result<()> {
        let (_temp, item) = photos()?;
        let base = fp(&item, false)?;

        fs::write(item.join("c.jpg"), b"third")?;
        let added = fp(&item, false)?;
        assert_ne!(added, base);

        fs::remove_file(item.join("c.jpg"))?;
        assert_eq!(fp(&item, false)?, base);

        fs::rename(item.join("b.jpg"), item.join("renamed.jpg"))?;
        assert_ne!(fp(&item, false)?, base);

        fs::remove_file(item.join("renamed.jpg"))?;
        assert_ne!(fp(&item, false)?, base);
        Ok(())
    }

    #[test]
    fn test_content_change_only_visible_with_content() -> Result<()> {
        let (_temp, item) = photos()?;
        let paths_before = fp(&item, false)?;
        let content_before = fp(&item, true)?;

        fs::write(item.join("a.jpg"), b"edited image")?;

        assert_eq!(fp(&item, false)?, paths_before);
        assert_ne!(fp(&item, true)?, content_before);
        Ok(())
    }

    #[test]
    fn test_mtime_does_not_change_digest() -> Result<()> {
        let (_temp, item) = photos()?;
        let before = fp(&item, true)?;

        let file = fs::File::options().write(true).open(item.join("a.jpg"))?;
        file.set_modified(SystemTime::now() - Duration::from_secs(86_400))?;
        drop(file);

        assert_eq!(fp(&item, true)?, before);
        Ok(())
    }

    #[test]
    fn test_walk_options_are_honoured() -> Result<()> {
        let (_temp, item) = photos()?;
        fs::write(item.join(".DS_Store"), b"finder")?;

        let options = WalkOptions {
            follow_links: false,
            exclude_patterns: vec![".DS_Store".to_string()],
        };
        let excluded = fingerprint(&item, &options, true)?;

        assert_ne!(excluded, fp(&item, true)?);
        fs::remove_file(item.join(".DS_Store"))?;
        assert_eq!(excluded, fp(&item, true)?);
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_rename_between_non_utf8_names_changes_digest() -> Result<()> {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new()?;
        let item = temp_dir.path().join("photos");
        fs::create_dir(&item)?;
        fs::write(item.join(OsStr::from_bytes(b"a\xff")), b"one")?;
        fs::write(item.join(OsStr::from_bytes(b"a\xfe")), b"two")?;

        let before = fp(&item, false)?;
        fs::rename(
            item.join(OsStr::from_bytes(b"a\xff")),
            item.join(OsStr::from_bytes(b"a\xfd")),
        )?;
        assert_ne!(fp(&item, false)?, before);
        Ok(())
    }

    #[test]
    fn test_unreadable_file_fails_content_fingerprint() -> Result<()> {
        let (_temp, item) = photos()?;
        let mut files = walk_directory(&item, &WalkOptions::default())?;
        fs::remove_file(item.join("b.jpg"))?;

        // Path-only hashing never opens the files
        assert!(fingerprint_files("photos", &files, false).is_ok());
        assert!(fingerprint_files("photos", &files, true).is_err());

        files.pop();
        assert!(fingerprint_files("photos", &files, true).is_ok());
        Ok(())
    }
}
