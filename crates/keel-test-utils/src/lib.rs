//! Test utilities and fakes for Keel development.
//!
//! Provides a [`FakeModuleLoader`] that hands out in-process modules
//! instead of calling the system loader, an in-memory
//! [`MemoryResources`] domain, and helpers for laying out library files
//! in a temporary directory.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

use keel_core::{Bitness, Platform, PlatformType};
use keel_loader::{Module, ModuleLoader, OpenError, ResourceDomain};

/// The platform tests resolve against, independent of the host.
pub fn linux64() -> Platform {
    Platform::new(PlatformType::Linux, Bitness::Bits64)
}

/// Create an empty file at `dir/relative`, with parent directories.
pub fn touch(dir: &Path, relative: impl AsRef<Path>) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, b"").unwrap();
    path
}

/// Path of `name` under the default locator layout for [`linux64`].
pub fn linux64_path(name: &str) -> PathBuf {
    ["lib", "linux64", &format!("{name}.so")].iter().collect()
}

/// A module loader backed by export tables registered in-process.
///
/// Modules are keyed by file name. `open` requires the file to exist on
/// disk, as the system loader would, but never reads it. Clones share the
/// log of opened paths.
#[derive(Clone, Default)]
pub struct FakeModuleLoader {
    modules: HashMap<String, Arc<HashMap<String, usize>>>,
    broken: HashSet<String>,
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module for `file_name` with the given exports.
    pub fn with_module(mut self, file_name: &str, exports: &[(&str, *const c_void)]) -> Self {
        let table = exports
            .iter()
            .map(|(name, address)| (name.to_string(), *address as usize))
            .collect();
        self.modules.insert(file_name.to_string(), Arc::new(table));
        self
    }

    /// Make `file_name` fail to open even though it exists.
    pub fn with_broken(mut self, file_name: &str) -> Self {
        self.broken.insert(file_name.to_string());
        self
    }

    /// Every path successfully opened, in order.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }

    /// File names of [`opened`](Self::opened).
    pub fn opened_names(&self) -> Vec<String> {
        self.opened()
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }
}

impl ModuleLoader for FakeModuleLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn Module>, OpenError> {
        if !path.is_file() {
            return Err(format!("{}: no such file", path.display()).into());
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.broken.contains(&file_name) {
            return Err(format!("{file_name}: invalid module header").into());
        }
        let Some(exports) = self.modules.get(&file_name) else {
            return Err(format!("{file_name}: not a registered module").into());
        };
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(Box::new(FakeModule {
            exports: Arc::clone(exports),
        }))
    }
}

/// An in-process module; exports are plain addresses.
pub struct FakeModule {
    exports: Arc<HashMap<String, usize>>,
}

impl Module for FakeModule {
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        self.exports
            .get(name)
            .and_then(|&address| NonNull::new(address as *mut c_void))
    }
}

/// Resource payloads held in memory, keyed by locator path.
#[derive(Clone, Debug, Default)]
pub struct MemoryResources {
    payloads: HashMap<PathBuf, Vec<u8>>,
    failing: HashSet<PathBuf>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(mut self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        self.payloads.insert(path.into(), bytes.into());
        self
    }

    /// A payload whose reader fails after yielding part of `bytes`.
    pub fn with_failing_payload(
        mut self,
        path: impl Into<PathBuf>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let path = path.into();
        self.failing.insert(path.clone());
        self.payloads.insert(path, bytes.into());
        self
    }
}

impl ResourceDomain for MemoryResources {
    fn exists(&self, path: &Path) -> bool {
        self.payloads.contains_key(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        let bytes = self
            .payloads
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))?;
        if self.failing.contains(path) {
            Ok(Box::new(FailingReader {
                bytes: &bytes[..bytes.len() / 2],
                done: false,
            }))
        } else {
            Ok(Box::new(bytes.as_slice()))
        }
    }
}

struct FailingReader<'a> {
    bytes: &'a [u8],
    done: bool,
}

impl Read for FailingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || self.bytes.is_empty() {
            return Err(io::Error::other("resource stream truncated"));
        }
        let n = self.bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&self.bytes[..n]);
        self.bytes = &self.bytes[n..];
        self.done = self.bytes.is_empty();
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_requires_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeModuleLoader::new().with_module("a.so", &[]);
        assert!(loader.open(&dir.path().join("a.so")).is_err());
        let path = touch(dir.path(), "a.so");
        assert!(loader.open(&path).is_ok());
        assert_eq!(loader.opened_names(), ["a.so"]);
    }

    #[test]
    fn failing_payload_errors_midway() {
        let res = MemoryResources::new().with_failing_payload("x", b"abcdef".to_vec());
        let mut buf = Vec::new();
        let err = res.open(Path::new("x")).unwrap().read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(buf, b"abc");
    }
}
