//! # Publish Linker
//!
//! Exposes a model's sprite directory to the web server's static tree through a
//! directory symlink at `static/img/sprites/<category>/<id>`.
//!
//! The alias is recreated on every publish, even when it already points at the
//! right place, so a renamed target never leaves a stale link behind. The path
//! is classified before anything is removed: only a symlink may be replaced.
//! A real directory or file at the alias path is somebody's data and makes the
//! publish fail with a [`ConflictError`], leaving the filesystem untouched.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::FilesystemError;

/// What currently occupies an alias path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Nothing
    Absent,
    /// A symlink, possibly dangling
    Alias,
    /// A real directory
    Directory,
    /// A regular file or other non-directory entry
    File,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "nothing",
            Self::Alias => "alias",
            Self::Directory => "directory",
            Self::File => "file",
        })
    }
}

/// Inspect `path` without following symlinks
pub fn classify(path: &Path) -> Result<EntryKind, FilesystemError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            let file_type = metadata.file_type();
            Ok(if file_type.is_symlink() {
                EntryKind::Alias
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EntryKind::Absent),
        Err(e) => Err(FilesystemError::io("inspect", path, e)),
    }
}

/// Alias path is occupied by real content
#[derive(Error, Debug)]
#[error("Cannot create alias '{alias}' to '{target}': a {existing} with that name already exists")]
pub struct ConflictError {
    /// Path where the alias should go
    pub alias: PathBuf,
    /// Directory the alias would point at
    pub target: PathBuf,
    /// What is in the way
    pub existing: EntryKind,
}

/// Publish errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// Real content occupies the alias path
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Filesystem operation failed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Result of a successful publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No alias existed before
    Created,
    /// An existing alias was replaced
    Replaced,
}

/// Creates and replaces sprite aliases
#[derive(Debug, Default, Clone, Copy)]
pub struct PublishLinker;

impl PublishLinker {
    /// Create a linker
    pub fn new() -> Self {
        Self
    }

    /// Point a fresh alias at `alias_path` to `source_dir`
    ///
    /// `source_dir` is made absolute so the link does not depend on where the
    /// static tree lives relative to the sprites.
    pub fn publish(&self, source_dir: &Path, alias_path: &Path) -> Result<PublishOutcome, PublishError> {
        let target = absolute(source_dir)?;

        let outcome = match classify(alias_path)? {
            EntryKind::Absent => PublishOutcome::Created,
            EntryKind::Alias => {
                remove_alias(alias_path)?;
                PublishOutcome::Replaced
            }
            existing @ (EntryKind::Directory | EntryKind::File) => {
                return Err(ConflictError {
                    alias: alias_path.to_path_buf(),
                    target,
                    existing,
                }
                .into());
            }
        };

        if let Some(parent) = alias_path.parent() {
            fs::create_dir_all(parent).map_err(|e| FilesystemError::io("create directory", parent, e))?;
        }
        symlink_dir(&target, alias_path).map_err(|e| FilesystemError::io("create alias", alias_path, e))?;

        log::debug!("Alias '{}' -> '{}' ({:?})", alias_path.display(), target.display(), outcome);
        Ok(outcome)
    }
}

fn absolute(path: &Path) -> Result<PathBuf, FilesystemError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .map_err(|e| FilesystemError::io("resolve", path, e))
    }
}

#[cfg(unix)]
fn remove_alias(path: &Path) -> Result<(), FilesystemError> {
    fs::remove_file(path).map_err(|e| FilesystemError::io("remove alias", path, e))
}

#[cfg(windows)]
fn remove_alias(path: &Path) -> Result<(), FilesystemError> {
    // Directory symlinks are removed like directories on Windows
    fs::remove_dir(path)
        .or_else(|_| fs::remove_file(path))
        .map_err(|e| FilesystemError::io("remove alias", path, e))
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sprites(root: &Path, name: &str) -> PathBuf {
        let dir = root.join("sprites/items").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("east.png"), b"png").unwrap();
        dir
    }

    #[test]
    fn test_creates_alias_and_parents() {
        let root = tempfile::tempdir().unwrap();
        let source = sprites(root.path(), "axe_old");
        let alias = root.path().join("static/img/sprites/items/axe_old");

        let outcome = PublishLinker::new().publish(&source, &alias).unwrap();

        assert_eq!(outcome, PublishOutcome::Created);
        assert_eq!(classify(&alias).unwrap(), EntryKind::Alias);
        assert_eq!(fs::read_link(&alias).unwrap(), source);
        assert!(alias.join("east.png").is_file());
    }

    #[test]
    fn test_replaces_alias_with_new_target() {
        let root = tempfile::tempdir().unwrap();
        let old = sprites(root.path(), "axe");
        let new = sprites(root.path(), "axe_v2");
        let alias = root.path().join("static/img/sprites/items/axe");
        let linker = PublishLinker::new();

        linker.publish(&old, &alias).unwrap();
        let outcome = linker.publish(&new, &alias).unwrap();

        assert_eq!(outcome, PublishOutcome::Replaced);
        assert_eq!(fs::read_link(&alias).unwrap(), new);
    }

    #[test]
    fn test_republish_same_target_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let source = sprites(root.path(), "axe");
        let alias = root.path().join("static/img/sprites/items/axe");
        let linker = PublishLinker::new();

        linker.publish(&source, &alias).unwrap();
        assert_eq!(linker.publish(&source, &alias).unwrap(), PublishOutcome::Replaced);
        assert_eq!(fs::read_link(&alias).unwrap(), source);
    }

    #[test]
    fn test_replaces_dangling_alias() {
        let root = tempfile::tempdir().unwrap();
        let source = sprites(root.path(), "axe");
        let alias_parent = root.path().join("static/img/sprites/items");
        fs::create_dir_all(&alias_parent).unwrap();
        let alias = alias_parent.join("axe");
        std::os::unix::fs::symlink(root.path().join("sprites/items/renamed"), &alias).unwrap();

        let outcome = PublishLinker::new().publish(&source, &alias).unwrap();

        assert_eq!(outcome, PublishOutcome::Replaced);
        assert_eq!(fs::read_link(&alias).unwrap(), source);
    }

    #[test]
    fn test_real_directory_is_a_conflict_and_untouched() {
        let root = tempfile::tempdir().unwrap();
        let source = sprites(root.path(), "axe");
        let alias = root.path().join("static/img/sprites/items/axe");
        fs::create_dir_all(&alias).unwrap();
        fs::write(alias.join("hand_made.png"), b"precious").unwrap();

        let error = PublishLinker::new().publish(&source, &alias).unwrap_err();

        match error {
            PublishError::Conflict(conflict) => {
                assert_eq!(conflict.existing, EntryKind::Directory);
                assert_eq!(conflict.alias, alias);
            }
            other => panic!("expected a conflict, got {other:?}"),
        }
        assert_eq!(classify(&alias).unwrap(), EntryKind::Directory);
        assert_eq!(fs::read(alias.join("hand_made.png")).unwrap(), b"precious");
    }

    #[test]
    fn test_real_file_is_a_conflict() {
        let root = tempfile::tempdir().unwrap();
        let source = sprites(root.path(), "axe");
        let alias_parent = root.path().join("static/img/sprites/items");
        fs::create_dir_all(&alias_parent).unwrap();
        let alias = alias_parent.join("axe");
        fs::write(&alias, b"file").unwrap();

        let result = PublishLinker::new().publish(&source, &alias);

        assert!(matches!(result, Err(PublishError::Conflict(_))));
        assert_eq!(fs::read(&alias).unwrap(), b"file");
    }
}
