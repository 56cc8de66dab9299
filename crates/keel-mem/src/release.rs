//! How an [`OwnedPtr`](crate::OwnedPtr) gives its memory back.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::fmt;

extern "C" {
    fn free(ptr: *mut c_void);
}

/// Release strategy attached to an owning pointer. Runs at most once.
pub enum Release {
    /// Memory is owned elsewhere; disposal does nothing.
    Nothing,
    /// Memory came from a host `Vec<T>` with this length and capacity.
    /// Disposal drops the elements and returns the buffer to the global
    /// allocator. Only valid for the exact allocation the `Vec` produced.
    Host {
        /// Number of initialized elements.
        len: usize,
        /// Capacity of the original allocation.
        capacity: usize,
    },
    /// Call a native deallocator with the base address.
    Free(unsafe extern "C" fn(*mut c_void)),
    /// Call a native deallocator with the base address and an element count.
    FreeCount(unsafe extern "C" fn(*mut c_void, usize), usize),
    /// Run an arbitrary closure with the base address.
    Custom(Box<dyn FnOnce(*mut c_void) + Send>),
}

impl Release {
    /// Release through the C runtime's `free`.
    pub fn c_free() -> Self {
        Self::Free(free)
    }

    /// Wrap a closure.
    pub fn custom(f: impl FnOnce(*mut c_void) + Send + 'static) -> Self {
        Self::Custom(Box::new(f))
    }

    /// Run the strategy against `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be the allocation this strategy was created for, and it
    /// must not be used afterwards.
    pub(crate) unsafe fn run<T>(self, ptr: *mut T) {
        match self {
            Self::Nothing => {}
            Self::Host { len, capacity } => {
                // SAFETY: caller guarantees `ptr`, `len` and `capacity` are
                // the raw parts of a `Vec<T>` that was forgotten.
                drop(unsafe { Vec::from_raw_parts(ptr, len, capacity) });
            }
            // SAFETY: the deallocator was supplied for this allocation.
            Self::Free(f) => unsafe { f(ptr.cast()) },
            // SAFETY: as above.
            Self::FreeCount(f, count) => unsafe { f(ptr.cast(), count) },
            Self::Custom(f) => f(ptr.cast()),
        }
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "Nothing"),
            Self::Host { len, capacity } => f
                .debug_struct("Host")
                .field("len", len)
                .field("capacity", capacity)
                .finish(),
            Self::Free(func) => f.debug_tuple("Free").field(&(*func as usize)).finish(),
            Self::FreeCount(func, count) => f
                .debug_tuple("FreeCount")
                .field(&(*func as usize))
                .field(count)
                .finish(),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    static FREED_WITH_COUNT: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn record_count(_ptr: *mut c_void, count: usize) {
        FREED_WITH_COUNT.store(count, Ordering::SeqCst);
    }

    #[test]
    fn custom_receives_base_address() {
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let release = Release::custom(move |p| sink.store(p as usize, Ordering::SeqCst));
        unsafe { release.run(0x1000 as *mut u8) };
        assert_eq!(seen.load(Ordering::SeqCst), 0x1000);
    }

    #[test]
    fn free_count_passes_count() {
        let release = Release::FreeCount(record_count, 12);
        unsafe { release.run(0x10 as *mut u32) };
        assert_eq!(FREED_WITH_COUNT.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn c_free_releases_malloc_memory() {
        extern "C" {
            fn malloc(size: usize) -> *mut c_void;
        }
        let p = unsafe { malloc(64) };
        assert!(!p.is_null());
        unsafe { Release::c_free().run(p.cast::<u8>()) };
    }

    #[test]
    fn debug_hides_closure() {
        assert_eq!(format!("{:?}", Release::custom(|_| {})), "Custom(..)");
        assert_eq!(format!("{:?}", Release::Nothing), "Nothing");
    }
}
