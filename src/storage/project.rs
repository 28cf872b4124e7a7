//! Project directory management
//!
//! A conversion of `story.mm` writes the project `story.nw/` next to it.
//! An existing project directory is never overwritten: it is moved aside to
//! the first free backup name (`story.nw.bak`, `story.nw.bk000`, ...).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::domain::IdError;

use super::content::CONTENT_DIR;

/// Project index file name
pub const PROJECT_FILE: &str = "nwProject.nwx";

/// Present while novelWriter has the project open
pub const LOCK_FILE: &str = "nwProject.lock";

/// Extension of the project directory
pub const PROJECT_EXTENSION: &str = "nw";

/// Numbered backups tried after `.bak`
const MAX_BACKUPS: usize = 1000;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Please exit novelWriter.")]
    Locked(PathBuf),

    #[error("No free backup name for \"{0}\".")]
    BackupExhausted(PathBuf),

    #[error("\"{0}\" is not a novelWriter project.")]
    NotAProject(PathBuf),

    #[error("Unsupported project file version \"{0}\".")]
    UnsupportedVersion(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Duplicate handle: {0}")]
    DuplicateHandle(String),

    #[error("Unknown item class: {0}")]
    UnknownClass(String),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Scene references unknown {kind} \"{title}\".")]
    UnresolvedReference { kind: &'static str, title: String },

    #[error("Novel references missing elements: {}", .0.join(", "))]
    DanglingReferences(Vec<String>),

    #[error(transparent)]
    Handle(#[from] IdError),
}

/// The project directory a conversion writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTarget {
    dir: PathBuf,
}

impl ProjectTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the target for a mindmap file: `<dir>/<stem>.nw`
    pub fn for_source(source: &Path) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = source
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(format!("{}.{}", stem, PROJECT_EXTENSION));
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(PROJECT_FILE)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.dir.join(CONTENT_DIR)
    }

    pub fn is_locked(&self) -> bool {
        self.dir.join(LOCK_FILE).exists()
    }

    /// Makes room for a fresh project
    ///
    /// Fails if the project is open in novelWriter. An existing directory is
    /// moved aside and its backup path returned. Creates the content
    /// directory.
    pub fn prepare(&self) -> Result<Option<PathBuf>> {
        if self.is_locked() {
            return Err(ProjectError::Locked(self.dir.clone()).into());
        }

        let backup = if self.dir.exists() {
            Some(self.back_up()?)
        } else {
            None
        };

        let content_dir = self.content_dir();
        fs::create_dir_all(&content_dir)
            .with_context(|| format!("Failed to create directory: {}", content_dir.display()))?;

        Ok(backup)
    }

    /// Renames the project directory to its first free backup name
    fn back_up(&self) -> Result<PathBuf> {
        let backup = backup_path(&self.dir)?;
        fs::rename(&self.dir, &backup).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                self.dir.display(),
                backup.display()
            )
        })?;
        Ok(backup)
    }
}

/// Returns the first unused backup name for `dir`
///
/// Tries `<dir>.bak`, then `<dir>.bk000` through `<dir>.bk999`.
pub fn backup_path(dir: &Path) -> Result<PathBuf, ProjectError> {
    let with_suffix = |suffix: &str| {
        let mut name = dir.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };

    std::iter::once(with_suffix(".bak"))
        .chain((0..MAX_BACKUPS).map(|i| with_suffix(&format!(".bk{:03}", i))))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| ProjectError::BackupExhausted(dir.to_path_buf()))
}

/// Writes `text` to `path` through a temp file and rename
pub(crate) fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, text)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn target_next_to_source() {
        let target = ProjectTarget::for_source(Path::new("/books/story.mm"));

        assert_eq!(target.dir(), Path::new("/books/story.nw"));
        assert_eq!(target.index_path(), PathBuf::from("/books/story.nw/nwProject.nwx"));
        assert_eq!(target.content_dir(), PathBuf::from("/books/story.nw/content"));
    }

    #[test]
    fn prepare_creates_tree() {
        let dir = TempDir::new().unwrap();
        let target = ProjectTarget::new(dir.path().join("story.nw"));

        let backup = target.prepare().unwrap();

        assert_eq!(backup, None);
        assert!(target.content_dir().is_dir());
    }

    #[test]
    fn backups_rotate() {
        let dir = TempDir::new().unwrap();
        let target = ProjectTarget::new(dir.path().join("story.nw"));
        target.prepare().unwrap();

        let first = target.prepare().unwrap().unwrap();
        let second = target.prepare().unwrap().unwrap();
        let third = target.prepare().unwrap().unwrap();

        assert_eq!(first, dir.path().join("story.nw.bak"));
        assert_eq!(second, dir.path().join("story.nw.bk000"));
        assert_eq!(third, dir.path().join("story.nw.bk001"));
        assert!(first.join("content").is_dir());
        assert!(target.content_dir().is_dir());
    }

    #[test]
    fn last_backup_name_is_usable() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("story.nw");
        fs::create_dir(dir.path().join("story.nw.bak")).unwrap();
        for i in 0..999 {
            fs::create_dir(dir.path().join(format!("story.nw.bk{:03}", i))).unwrap();
        }

        assert_eq!(backup_path(&project).unwrap(), dir.path().join("story.nw.bk999"));

        fs::create_dir(dir.path().join("story.nw.bk999")).unwrap();
        assert!(matches!(
            backup_path(&project),
            Err(ProjectError::BackupExhausted(_))
        ));
    }

    #[test]
    fn locked_project_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let target = ProjectTarget::new(dir.path().join("story.nw"));
        fs::create_dir_all(target.dir()).unwrap();
        fs::write(target.dir().join(LOCK_FILE), "").unwrap();

        let err = target.prepare().unwrap_err();

        assert_eq!(err.to_string(), "Please exit novelWriter.");
        assert!(target.dir().join(LOCK_FILE).exists());
        assert!(!dir.path().join("story.nw.bak").exists());
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nwProject.nwx");

        write_atomic(&path, "<x/>").unwrap();
        write_atomic(&path, "<y/>").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "<y/>");
        assert!(!dir.path().join("nwProject.nwx.tmp").exists());
    }
}
