use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::DetectorKind;
use crate::walker::ImageFile;

/// Maps input files into one detector's mirrored output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPathMapper {
    root: PathBuf,
}

impl OutputPathMapper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The tree for `kind`, a sibling of `input_root`.
    ///
    /// A root without a parent (`/`) hosts its output trees itself.
    pub fn beside_input(input_root: &Path, kind: DetectorKind) -> Self {
        let parent = input_root.parent().unwrap_or(input_root);
        Self::new(parent.join(kind.output_dir_name()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the output root itself. Existing directories are fine.
    pub fn ensure_root(&self) -> Result<()> {
        create_dir_all(&self.root)
    }

    /// `root / file.relative_path`, with every missing ancestor created.
    ///
    /// Safe to call concurrently for files sharing directories.
    pub fn resolve(&self, file: &ImageFile) -> Result<PathBuf> {
        let target = self.root.join(&file.relative_path);
        if let Some(parent) = target.parent() {
            create_dir_all(parent)?;
        }
        Ok(target)
    }
}

// std's create_dir_all tolerates another thread creating the same directory mid-way.
fn create_dir_all(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| Error::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    fn image_file(root: &Path, relative: &str) -> ImageFile {
        ImageFile {
            path: root.join(relative),
            relative_path: PathBuf::from(relative),
        }
    }

    #[test]
    fn output_roots_sit_beside_the_input() {
        let input = Path::new("/data/photos");
        assert_eq!(
            OutputPathMapper::beside_input(input, DetectorKind::East).root(),
            Path::new("/data/ImagesProcessedWithEAST")
        );
        assert_eq!(
            OutputPathMapper::beside_input(input, DetectorKind::Db).root(),
            Path::new("/data/ImagesProcessedWithDB50")
        );
        assert_eq!(
            OutputPathMapper::beside_input(Path::new("/"), DetectorKind::Db).root(),
            Path::new("/ImagesProcessedWithDB50")
        );
    }

    #[test]
    fn resolve_mirrors_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let mapper = OutputPathMapper::new(dir.path().join("out"));
        let file = image_file(&dir.path().join("in"), "a/b/img.png");

        let target = mapper.resolve(&file).unwrap();

        assert_eq!(target, dir.path().join("out/a/b/img.png"));
        assert!(dir.path().join("out/a/b").is_dir());
        assert!(!target.exists());
    }

    #[test]
    fn resolve_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mapper = OutputPathMapper::new(dir.path().join("out"));
        mapper.ensure_root().unwrap();
        mapper.ensure_root().unwrap();

        let file = image_file(dir.path(), "sub/img.jpg");
        assert_eq!(mapper.resolve(&file).unwrap(), mapper.resolve(&file).unwrap());
    }

    #[test]
    fn concurrent_resolves_into_the_same_directory_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let mapper = Arc::new(OutputPathMapper::new(dir.path().join("out")));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let mapper = Arc::clone(&mapper);
                let barrier = Arc::clone(&barrier);
                let file = image_file(Path::new("/in"), &format!("x/y/z/img{i}.png"));
                std::thread::spawn(move || {
                    barrier.wait();
                    mapper.resolve(&file)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        assert!(dir.path().join("out/x/y/z").is_dir());
    }

    #[test]
    fn blocked_directory_is_a_create_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("out"), b"not a dir").unwrap();
        let mapper = OutputPathMapper::new(dir.path().join("out"));

        let err = mapper.ensure_root().unwrap_err();
        assert!(matches!(err, Error::CreateDir { .. }));
    }
}
