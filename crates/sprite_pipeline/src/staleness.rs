//! # Staleness Oracle
//!
//! Decides whether a model's sprites must be rendered again by comparing the
//! modification time of its source artifact with the newest file of its output
//! directory.
//!
//! ## Threshold comparison
//!
//! The backend saves the source artifact *after* it rendered the sprites, so a
//! freshly rendered model always has a source that is slightly newer than its
//! output. A plain `source > output` test would re-render every model on every
//! run. Instead the source has to lead by more than a threshold (10 seconds by
//! default). Edits made within that window after a render go unnoticed.
//!
//! ## Directory timestamps
//!
//! A directory's own mtime is not bumped on every filesystem when a file inside
//! it is rewritten, so the output time is the maximum over the directory's
//! direct children. Output directories are flat; entries of subdirectories are
//! not looked at.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::error::FilesystemError;

/// Outcome of a staleness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No output directory (or something else occupies its path)
    Missing,
    /// The output directory exists but holds nothing
    Empty,
    /// Output is up to date
    Fresh {
        /// Modification time of the source artifact
        source: SystemTime,
        /// Newest modification time among the output files
        output: SystemTime,
    },
    /// The source artifact was edited after the last render
    Stale {
        /// Modification time of the source artifact
        source: SystemTime,
        /// Newest modification time among the output files
        output: SystemTime,
    },
}

impl Freshness {
    /// Whether this verdict requires a render
    pub fn needs_regeneration(&self) -> bool {
        !matches!(self, Self::Fresh { .. })
    }

    /// Short label for logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Empty => "empty",
            Self::Fresh { .. } => "fresh",
            Self::Stale { .. } => "stale",
        }
    }
}

/// Compares source artifacts against their rendered output
#[derive(Debug, Clone, Copy)]
pub struct StalenessOracle {
    threshold: Duration,
}

impl StalenessOracle {
    /// Create an oracle with the given threshold
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// Lead the source must have over the output to count as edited
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Whether the sprites in `output_dir` must be rendered again from `source_path`
    pub fn needs_regeneration(&self, source_path: &Path, output_dir: &Path) -> Result<bool, FilesystemError> {
        Ok(self.inspect(source_path, output_dir)?.needs_regeneration())
    }

    /// Full verdict for one model
    pub fn inspect(&self, source_path: &Path, output_dir: &Path) -> Result<Freshness, FilesystemError> {
        if !output_dir.is_dir() {
            return Ok(Freshness::Missing);
        }

        let Some(output) = newest_child_mtime(output_dir)? else {
            return Ok(Freshness::Empty);
        };
        let source = modified_time(source_path)?;

        // An output newer than its source is always fresh
        let lead = source.duration_since(output).unwrap_or(Duration::ZERO);
        log::debug!(
            "'{}' leads its sprites by {:.3}s (threshold {:.3}s)",
            source_path.display(),
            lead.as_secs_f64(),
            self.threshold.as_secs_f64()
        );

        if lead > self.threshold {
            Ok(Freshness::Stale { source, output })
        } else {
            Ok(Freshness::Fresh { source, output })
        }
    }
}

impl Default for StalenessOracle {
    fn default() -> Self {
        Self::new(Duration::from_secs_f64(crate::core::config::DEFAULT_STALENESS_THRESHOLD_SECS))
    }
}

/// Newest modification time among the direct children of `dir`, `None` if empty
pub fn newest_child_mtime(dir: &Path) -> Result<Option<SystemTime>, FilesystemError> {
    let entries = fs::read_dir(dir).map_err(|e| FilesystemError::io("list", dir, e))?;

    let mut newest: Option<SystemTime> = None;
    for entry in entries {
        let entry = entry.map_err(|e| FilesystemError::io("list", dir, e))?;
        let modified = modified_time(&entry.path())?;
        newest = Some(newest.map_or(modified, |current| current.max(modified)));
    }

    Ok(newest)
}

fn modified_time(path: &Path) -> Result<SystemTime, FilesystemError> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|e| FilesystemError::io("read modification time of", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes};
    use std::path::PathBuf;

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_times(FileTimes::new().set_modified(time)).unwrap();
    }

    /// Source artifact plus a 4-image output directory rendered at `render_time`
    fn rendered_model(root: &Path, render_time: SystemTime) -> (PathBuf, PathBuf) {
        let source = root.join("axe.blend");
        fs::write(&source, b"scene").unwrap();
        set_mtime(&source, render_time);

        let output = root.join("axe");
        fs::create_dir(&output).unwrap();
        for label in ["east", "north", "west", "south"] {
            let image = output.join(format!("{label}.png"));
            fs::write(&image, b"png").unwrap();
            set_mtime(&image, render_time);
        }
        (source, output)
    }

    fn base_time() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn test_missing_output_needs_render() {
        let root = tempfile::tempdir().unwrap();
        let oracle = StalenessOracle::default();
        let source = root.path().join("axe_old.blend");
        fs::write(&source, b"scene").unwrap();

        let verdict = oracle.inspect(&source, &root.path().join("axe_old")).unwrap();
        assert_eq!(verdict, Freshness::Missing);
        assert!(oracle.needs_regeneration(&source, &root.path().join("axe_old")).unwrap());
    }

    #[test]
    fn test_file_in_place_of_output_counts_as_missing() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("axe.blend");
        fs::write(&source, b"scene").unwrap();
        let not_a_dir = root.path().join("axe");
        fs::write(&not_a_dir, b"oops").unwrap();

        let verdict = StalenessOracle::default().inspect(&source, &not_a_dir).unwrap();
        assert_eq!(verdict, Freshness::Missing);
    }

    #[test]
    fn test_empty_output_needs_render() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("axe.blend");
        fs::write(&source, b"scene").unwrap();
        let output = root.path().join("axe");
        fs::create_dir(&output).unwrap();

        let verdict = StalenessOracle::default().inspect(&source, &output).unwrap();
        assert_eq!(verdict, Freshness::Empty);
        assert!(verdict.needs_regeneration());
    }

    #[test]
    fn test_save_after_render_is_fresh() {
        let root = tempfile::tempdir().unwrap();
        let (source, output) = rendered_model(root.path(), base_time());
        // The backend saves the scene a moment after the last image lands
        set_mtime(&source, base_time() + Duration::from_secs(1));

        assert!(!StalenessOracle::default().needs_regeneration(&source, &output).unwrap());
    }

    #[test]
    fn test_edit_within_threshold_goes_unnoticed() {
        let root = tempfile::tempdir().unwrap();
        let (source, output) = rendered_model(root.path(), base_time());
        set_mtime(&source, base_time() + Duration::from_secs(5));

        let verdict = StalenessOracle::default().inspect(&source, &output).unwrap();
        assert!(matches!(verdict, Freshness::Fresh { .. }));
    }

    #[test]
    fn test_edit_after_threshold_is_stale() {
        let root = tempfile::tempdir().unwrap();
        let (source, output) = rendered_model(root.path(), base_time());
        set_mtime(&source, base_time() + Duration::from_secs(15));

        let verdict = StalenessOracle::default().inspect(&source, &output).unwrap();
        assert_eq!(
            verdict,
            Freshness::Stale {
                source: base_time() + Duration::from_secs(15),
                output: base_time(),
            }
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let root = tempfile::tempdir().unwrap();
        let (source, output) = rendered_model(root.path(), base_time());
        set_mtime(&source, base_time() + Duration::from_secs(10));

        assert!(!StalenessOracle::default().needs_regeneration(&source, &output).unwrap());
    }

    #[test]
    fn test_source_older_than_output_is_fresh() {
        let root = tempfile::tempdir().unwrap();
        let (source, output) = rendered_model(root.path(), base_time());
        set_mtime(&source, base_time() - Duration::from_secs(3600));

        assert!(!StalenessOracle::default().needs_regeneration(&source, &output).unwrap());
    }

    #[test]
    fn test_newest_child_wins_over_directory_mtime() {
        let root = tempfile::tempdir().unwrap();
        let (source, output) = rendered_model(root.path(), base_time());
        // One image re-rendered later; the others keep the old timestamp
        set_mtime(&output.join("west.png"), base_time() + Duration::from_secs(60));
        set_mtime(&source, base_time() + Duration::from_secs(65));

        assert_eq!(
            newest_child_mtime(&output).unwrap(),
            Some(base_time() + Duration::from_secs(60))
        );
        assert!(!StalenessOracle::default().needs_regeneration(&source, &output).unwrap());
    }

    #[test]
    fn test_custom_threshold() {
        let root = tempfile::tempdir().unwrap();
        let (source, output) = rendered_model(root.path(), base_time());
        set_mtime(&source, base_time() + Duration::from_secs(5));

        let strict = StalenessOracle::new(Duration::from_secs(2));
        assert!(strict.needs_regeneration(&source, &output).unwrap());
    }

    #[test]
    fn test_missing_source_with_existing_output_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let (source, output) = rendered_model(root.path(), base_time());
        fs::remove_file(&source).unwrap();

        let result = StalenessOracle::default().needs_regeneration(&source, &output);
        assert!(matches!(result, Err(FilesystemError::Io { .. })));
    }
}
