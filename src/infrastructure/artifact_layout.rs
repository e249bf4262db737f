use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

pub const BACKFILL_DIR: &str = "backfill";
pub const SELECTOR_DIR: &str = "selector";
pub const BACKUP_DIR: &str = "backup";

static BATCH_SCRIPT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^batch_(\d+)\.sql$").expect("batch script pattern should compile")
});

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Unable to remove previous output {}: {source}", .path.display())]
    Reset { path: PathBuf, source: io::Error },
    #[error("Unable to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Unable to list selector scripts in {}: {source}", .path.display())]
    ListSelectors { path: PathBuf, source: io::Error },
    #[error("Selector scripts are not contiguous: batch_{missing}.sql is missing ({found} found)")]
    MissingSelectorBatch { missing: usize, found: usize },
}

/// Directory tree shared by the generator and the runner:
/// `<root>/backfill/batch_<i>.sql`, `<root>/selector/batch_<i>.sql` and
/// `<root>/backup/batch_<i>.csv`.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backfill_dir(&self) -> PathBuf {
        self.root.join(BACKFILL_DIR)
    }

    pub fn selector_dir(&self) -> PathBuf {
        self.root.join(SELECTOR_DIR)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    pub fn update_script_path(&self, index: usize) -> PathBuf {
        self.backfill_dir().join(format!("batch_{index}.sql"))
    }

    pub fn selector_script_path(&self, index: usize) -> PathBuf {
        self.selector_dir().join(format!("batch_{index}.sql"))
    }

    pub fn backup_path(&self, index: usize) -> PathBuf {
        self.backup_dir().join(format!("batch_{index}.csv"))
    }

    /// Removes whatever exists at the root, then recreates the three artifact directories.
    pub fn reset(&self) -> Result<(), LayoutError> {
        let removal = match fs::symlink_metadata(&self.root) {
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&self.root),
            Ok(_) => fs::remove_file(&self.root),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error),
        };
        removal.map_err(|source| LayoutError::Reset {
            path: self.root.clone(),
            source,
        })?;
        debug!(root = %self.root.display(), "output directory reset");

        for dir in [self.backfill_dir(), self.selector_dir(), self.backup_dir()] {
            create_dir(&dir)?;
        }
        Ok(())
    }

    pub fn ensure_backup_dir(&self) -> Result<(), LayoutError> {
        create_dir(&self.backup_dir())
    }

    /// Counts `batch_<n>.sql` selector scripts and checks they cover `0..count` without gaps.
    pub fn discover_batch_count(&self) -> Result<usize, LayoutError> {
        let selector_dir = self.selector_dir();
        let list_error = |source| LayoutError::ListSelectors {
            path: selector_dir.clone(),
            source,
        };

        let mut indices = BTreeSet::new();
        for entry in fs::read_dir(&selector_dir).map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            if !entry.file_type().map_err(list_error)?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(captures) = file_name.to_str().and_then(|name| BATCH_SCRIPT_NAME.captures(name))
            else {
                continue;
            };
            if let Ok(index) = captures[1].parse::<usize>() {
                indices.insert(index);
            }
        }

        let found = indices.len();
        if let Some(missing) = (0..found).zip(&indices).find_map(|(expected, actual)| {
            (expected != *actual).then_some(expected)
        }) {
            return Err(LayoutError::MissingSelectorBatch { missing, found });
        }
        Ok(found)
    }
}

fn create_dir(path: &Path) -> Result<(), LayoutError> {
    fs::create_dir_all(path).map_err(|source| LayoutError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{ArtifactLayout, LayoutError};

    #[test]
    fn reset_replaces_previous_output() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let layout = ArtifactLayout::new(temp.path().join("output"));
        layout.reset().expect("first reset");
        fs::write(layout.update_script_path(9), "stale").expect("stale file written");

        layout.reset().expect("second reset");

        assert!(!layout.update_script_path(9).exists());
        assert!(layout.backfill_dir().is_dir());
        assert!(layout.selector_dir().is_dir());
        assert!(layout.backup_dir().is_dir());
    }

    #[test]
    fn discovers_contiguous_selector_scripts_only() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let layout = ArtifactLayout::new(temp.path());
        layout.reset().expect("reset");
        for index in 0..3 {
            fs::write(layout.selector_script_path(index), "SELECT 1;").expect("write selector");
        }
        fs::write(layout.selector_dir().join("notes.txt"), "ignored").expect("write notes");

        assert_eq!(layout.discover_batch_count().expect("count"), 3);
    }

    #[test]
    fn reports_gap_in_selector_scripts() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let layout = ArtifactLayout::new(temp.path());
        layout.reset().expect("reset");
        fs::write(layout.selector_script_path(0), "SELECT 1;").expect("write selector");
        fs::write(layout.selector_script_path(2), "SELECT 1;").expect("write selector");

        let error = layout
            .discover_batch_count()
            .expect_err("gap should be reported");
        assert!(matches!(
            error,
            LayoutError::MissingSelectorBatch {
                missing: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn missing_selector_directory_is_an_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let layout = ArtifactLayout::new(temp.path().join("absent"));

        assert!(matches!(
            layout.discover_batch_count(),
            Err(LayoutError::ListSelectors { .. })
        ));
    }
}
