//! A loaded native library.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use keel_core::Platform;
use keel_mem::BorrowedPtr;

use crate::bind::{self, BindReport, FunctionTable, SymbolSource};
use crate::error::LoadError;
use crate::module::Module;

/// One opened module, the name it was requested under, and the path it
/// was found at. The module unloads when the last reference drops.
pub struct Library {
    name: String,
    path: PathBuf,
    platform: Platform,
    module: Box<dyn Module>,
}

impl Library {
    /// Wrap an opened module.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        platform: Platform,
        module: Box<dyn Module>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            platform,
            module,
        }
    }

    /// Generic name the library was requested under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the module was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Host description used to gate function-table slots.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Address of export `name`, or `None` when absent.
    pub fn get_export(&self, name: &str) -> Option<NonNull<c_void>> {
        self.module.symbol(name)
    }

    /// Export `name` as a function pointer of type `F`.
    ///
    /// Returns `None` when the export is absent or `F` is not
    /// pointer-sized.
    ///
    /// # Safety
    ///
    /// `F` must be an `extern` function pointer type matching the export.
    pub unsafe fn get_function<F: Copy>(&self, name: &str) -> Option<F> {
        if std::mem::size_of::<F>() != std::mem::size_of::<*mut c_void>() {
            return None;
        }
        let address = self.get_export(name)?.as_ptr();
        // SAFETY: sizes match; the signature is the caller's contract.
        Some(unsafe { std::mem::transmute_copy::<*mut c_void, F>(&address) })
    }

    /// An exported variable, viewed with unknown extent.
    ///
    /// # Safety
    ///
    /// The export must be a `T` (or array of `T`) living as long as the
    /// library.
    pub unsafe fn get_data<T>(&self, name: &str) -> Option<BorrowedPtr<'_, T>> {
        let address = self.get_export(name)?.as_ptr().cast::<T>();
        // SAFETY: forwarded from the caller; the view borrows `self`.
        Some(unsafe { BorrowedPtr::from_raw(address, None) })
    }

    /// Bind `table` from this library's exports.
    ///
    /// # Safety
    ///
    /// See [`bind::bind`].
    pub unsafe fn load_functions<T: FunctionTable>(
        &self,
        table: &mut T,
    ) -> Result<BindReport, LoadError> {
        // SAFETY: forwarded from the caller.
        unsafe { bind::bind(table, self, &self.platform) }
    }

    /// A fresh table bound from this library's exports.
    ///
    /// # Safety
    ///
    /// See [`bind::bind`].
    pub unsafe fn bind_table<T: FunctionTable + Default>(
        &self,
    ) -> Result<(T, BindReport), LoadError> {
        let mut table = T::default();
        // SAFETY: forwarded from the caller.
        let report = unsafe { self.load_functions(&mut table)? };
        Ok((table, report))
    }
}

impl SymbolSource for Library {
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        self.get_export(name)
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{Bitness, PlatformType};
    use keel_mem::ReadPointer;

    static ANSWER: u32 = 42;

    extern "C" fn twice(x: i32) -> i32 {
        x * 2
    }

    struct Exports;

    impl Module for Exports {
        fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
            match name {
                "twice" => NonNull::new(twice as *mut c_void),
                "answer" => NonNull::new(&ANSWER as *const u32 as *mut c_void),
                _ => None,
            }
        }
    }

    fn library() -> Library {
        Library::new(
            "demo",
            "lib/linux64/demo.so",
            Platform::new(PlatformType::Linux, Bitness::Bits64),
            Box::new(Exports),
        )
    }

    #[test]
    fn exports_resolve_by_name() {
        let lib = library();
        assert!(lib.get_export("twice").is_some());
        assert!(lib.get_export("thrice").is_none());
        assert_eq!(lib.name(), "demo");
    }

    #[test]
    fn typed_function_is_callable() {
        let lib = library();
        let f = unsafe { lib.get_function::<extern "C" fn(i32) -> i32>("twice") }.unwrap();
        assert_eq!(f(21), 42);
        assert!(unsafe { lib.get_function::<u8>("twice") }.is_none());
    }

    #[test]
    fn exported_data_is_readable() {
        let lib = library();
        let p = unsafe { lib.get_data::<u32>("answer") }.unwrap();
        assert_eq!(p.value(), Ok(42));
    }
}
