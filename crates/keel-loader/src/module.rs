//! Opening native modules and looking up their exports.
//!
//! [`ModuleLoader`] is the seam between resolution and the operating
//! system. [`SystemLoader`] goes through `libloading`; tests substitute a
//! loader that hands out fake modules.

#![allow(unsafe_code)]

use std::error::Error;
use std::ffi::c_void;
use std::fmt;
use std::path::Path;
use std::ptr::NonNull;

/// Error type reported by a [`ModuleLoader`].
pub type OpenError = Box<dyn Error + Send + Sync>;

/// An opened native module. Dropping it unloads the module.
pub trait Module: Send + Sync {
    /// Address of the export `name`, or `None` when absent.
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>>;
}

/// Opens native modules from file paths.
pub trait ModuleLoader: Send + Sync {
    /// Open the module at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn Module>, OpenError>;
}

/// Loads modules through the operating system's dynamic loader.
///
/// On Unix modules are opened with `RTLD_NOW | RTLD_GLOBAL`, so symbols
/// from a dependency loaded first are visible to its dependents.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemLoader;

impl ModuleLoader for SystemLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn Module>, OpenError> {
        #[cfg(unix)]
        // SAFETY: loading a library runs its initializers. Libraries are
        // opened only from paths the caller's locator chose.
        let lib = unsafe {
            let flags = libloading::os::unix::RTLD_NOW | libloading::os::unix::RTLD_GLOBAL;
            libloading::os::unix::Library::open(Some(path), flags).map(libloading::Library::from)?
        };
        #[cfg(not(unix))]
        // SAFETY: as above.
        let lib = unsafe { libloading::Library::new(path)? };
        Ok(Box::new(SystemModule(lib)))
    }
}

struct SystemModule(libloading::Library);

impl Module for SystemModule {
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        // SAFETY: the symbol is read as an untyped address; giving it a
        // type is the binder's job.
        let sym = unsafe { self.0.get::<*mut c_void>(name.as_bytes()) }.ok()?;
        NonNull::new(*sym)
    }
}

impl fmt::Debug for SystemModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SystemModule").field(&self.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_fails_to_open() {
        let err = SystemLoader
            .open(Path::new("definitely/not/here/libnothing.so"))
            .err();
        assert!(err.is_some());
    }
}
