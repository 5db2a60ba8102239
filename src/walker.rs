use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Extensions picked up by the walker, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A discovered image, addressed both absolutely and relative to the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub relative_path: PathBuf,
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Recursively enumerates supported images under a root directory.
///
/// Symlinks and special files are skipped; order is whatever the filesystem returns.
#[derive(Debug, Clone)]
pub struct ImageWalker {
    root: PathBuf,
    exclude: Vec<PathBuf>,
}

impl ImageWalker {
    /// Fails with [`Error::InvalidRoot`] unless `root` is an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let metadata = std::fs::metadata(&root).map_err(|err| Error::InvalidRoot {
            path: root.clone(),
            reason: err.to_string(),
        })?;
        if !metadata.is_dir() {
            return Err(Error::InvalidRoot {
                path: root,
                reason: "not a directory".to_string(),
            });
        }

        Ok(Self {
            root,
            exclude: vec![],
        })
    }

    /// Never descend into `dir`, e.g. an output tree that lives under the root.
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude.push(dir.into());
        self
    }

    /// Lazily walk the tree. Unreadable entries are logged and skipped.
    pub fn files(&self) -> impl Iterator<Item = ImageFile> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| !self.exclude.iter().any(|dir| entry.path() == dir))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_supported_image(entry.path()))
            .filter_map(move |entry| {
                let relative_path = entry.path().strip_prefix(&self.root).ok()?.to_path_buf();
                Some(ImageFile {
                    path: entry.into_path(),
                    relative_path,
                })
            })
    }
}
