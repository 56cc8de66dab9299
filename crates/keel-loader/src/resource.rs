//! Embedded payloads extracted when a library file is missing on disk.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// A source of library payloads keyed by locator path.
///
/// Consulted only when the located file does not exist; the payload is
/// copied to that location and loaded from there.
pub trait ResourceDomain: Send + Sync {
    /// Whether a payload exists for `path`.
    fn exists(&self, path: &Path) -> bool;

    /// A reader over the payload for `path`.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;
}

/// Payloads stored as files under a root directory, mirroring the locator
/// layout (`<root>/lib/linux64/foo.so`).
#[derive(Clone, Debug)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    /// Resources under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceDomain for DirectoryResources {
    fn exists(&self, path: &Path) -> bool {
        self.root.join(path).is_file()
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(self.root.join(path))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_files_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let rel = Path::new("lib").join("linux64").join("a.so");
        std::fs::create_dir_all(dir.path().join("lib").join("linux64")).unwrap();
        std::fs::write(dir.path().join(&rel), b"payload").unwrap();

        let res = DirectoryResources::new(dir.path());
        assert!(res.exists(&rel));
        assert!(!res.exists(Path::new("lib/linux64/b.so")));
        let mut buf = String::new();
        res.open(&rel).unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "payload");
    }
}
