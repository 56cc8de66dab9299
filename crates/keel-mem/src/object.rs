//! Opaque handles to pinned host objects.
//!
//! Native callbacks often carry a `void*` "user data" slot. An
//! [`ObjectPtr`] turns a host object into a non-zero `usize` that can
//! travel through that slot and be redeemed later. The object stays alive
//! in a process-wide table until the handle is released; redeeming a
//! released handle fails with [`MemoryError::StaleHandle`].

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use keel_core::MemoryError;

use crate::handle::HandleTable;
use crate::pointer::{ByteView, Pointer, ReadPointer};

type Pinned = Arc<dyn Any + Send + Sync>;

static OBJECTS: Mutex<HandleTable<Pinned>> = Mutex::new(HandleTable::new());

fn objects() -> MutexGuard<'static, HandleTable<Pinned>> {
    OBJECTS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Number of objects currently pinned, across all element types.
pub fn pinned_count() -> usize {
    objects().len()
}

/// Handle to a pinned host object of type `T`.
///
/// Handles are plain values: copying one does not pin again, and any copy
/// may release the object. The memory behind the handle is opaque, so
/// [`ByteView::as_bytes`] always fails and the handle cannot be offset or
/// recast.
pub struct ObjectPtr<T> {
    handle: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ObjectPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ObjectPtr<T> {}

impl<T: Any + Send + Sync> ObjectPtr<T> {
    /// Pin `value` and return its handle.
    pub fn pin(value: T) -> Self {
        Self::pin_arc(Arc::new(value))
    }

    /// Pin an already shared object.
    pub fn pin_arc(value: Arc<T>) -> Self {
        let handle = objects().insert(value);
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    /// Rebuild a handle from a value that came back through native code.
    /// Nothing is checked until the handle is redeemed.
    pub const fn from_handle(handle: usize) -> Self {
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    /// The raw handle value to pass to native code.
    pub const fn handle(&self) -> usize {
        self.handle
    }

    /// Redeem the handle.
    pub fn redeem(&self) -> Result<Arc<T>, MemoryError> {
        let pinned = objects()
            .get(self.handle)
            .cloned()
            .ok_or(MemoryError::StaleHandle {
                handle: self.handle,
            })?;
        downcast(pinned, self.handle)
    }

    /// Unpin the object and hand back the last pinned reference.
    pub fn release(&self) -> Result<Arc<T>, MemoryError> {
        let mut table = objects();
        let matches = table
            .get(self.handle)
            .ok_or(MemoryError::StaleHandle {
                handle: self.handle,
            })?
            .is::<T>();
        if !matches {
            return Err(type_mismatch::<T>(self.handle));
        }
        let pinned = table.remove(self.handle).ok_or(MemoryError::StaleHandle {
            handle: self.handle,
        })?;
        drop(table);
        downcast(pinned, self.handle)
    }

    /// Whether the handle still resolves.
    pub fn is_pinned(&self) -> bool {
        objects().get(self.handle).is_some()
    }
}

fn downcast<T: Any + Send + Sync>(pinned: Pinned, handle: usize) -> Result<Arc<T>, MemoryError> {
    pinned
        .downcast::<T>()
        .map_err(|_| type_mismatch::<T>(handle))
}

fn type_mismatch<T>(handle: usize) -> MemoryError {
    MemoryError::invalid_argument(format!(
        "object handle {handle:#x} does not refer to a {}",
        std::any::type_name::<T>()
    ))
}

impl<T: Any + Send + Sync> Pointer for ObjectPtr<T> {
    type Elem = T;

    fn as_ptr(&self) -> *const T {
        self.handle as *const T
    }

    fn array_size(&self) -> Option<usize> {
        None
    }

    fn dispose(&mut self) {
        let _ = self.release();
    }
}

impl<T: Any + Send + Sync> ReadPointer for ObjectPtr<T> {
    type Output = Arc<T>;

    fn get(&self, index: usize) -> Result<Arc<T>, MemoryError> {
        if self.handle == 0 {
            return Err(MemoryError::NullDereference);
        }
        if index != 0 {
            return Err(MemoryError::OutOfRange { index, len: 1 });
        }
        self.redeem()
    }
}

impl<T: Any + Send + Sync> ByteView for ObjectPtr<T> {
    fn as_bytes(&self) -> Result<&[u8], MemoryError> {
        Err(MemoryError::OpaqueMemory)
    }

    fn as_mut_bytes(&mut self) -> Result<&mut [u8], MemoryError> {
        Err(MemoryError::OpaqueMemory)
    }
}

impl<T> fmt::Debug for ObjectPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPtr({:#x})", self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::ErrorKind;

    #[derive(Debug, PartialEq)]
    struct Session {
        id: u32,
    }

    #[test]
    fn pin_redeem_release() {
        let p = ObjectPtr::pin(Session { id: 7 });
        assert!(p.is_valid());
        assert_eq!(p.value().unwrap().id, 7);

        let through_native = ObjectPtr::<Session>::from_handle(p.handle());
        assert_eq!(through_native.redeem().unwrap().id, 7);

        let last = p.release().unwrap();
        assert_eq!(*last, Session { id: 7 });
        assert!(!p.is_pinned());
    }

    #[test]
    fn stale_handle_fails_fast() {
        let mut p = ObjectPtr::pin(1u64);
        p.dispose();
        p.dispose();
        assert_eq!(
            p.value(),
            Err(MemoryError::StaleHandle { handle: p.handle() })
        );
        assert_eq!(p.release().unwrap_err().kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn wrong_type_is_rejected_and_stays_pinned() {
        let p = ObjectPtr::pin(String::from("abc"));
        let wrong = ObjectPtr::<u32>::from_handle(p.handle());
        assert_eq!(wrong.redeem().unwrap_err().kind(), ErrorKind::ArgumentValidity);
        assert!(wrong.release().is_err());
        assert!(p.is_pinned());
        p.release().unwrap();
    }

    #[test]
    fn memory_is_opaque() {
        let mut p = ObjectPtr::pin([0u8; 4]);
        assert_eq!(p.as_bytes(), Err(MemoryError::OpaqueMemory));
        assert_eq!(p.as_mut_bytes(), Err(MemoryError::OpaqueMemory));
        assert_eq!(p.array_size(), None);
        assert_eq!(p.get(1).unwrap_err().kind(), ErrorKind::OutOfRange);
        p.release().unwrap();
    }

    #[test]
    fn zero_handle_is_null() {
        let p = ObjectPtr::<u8>::from_handle(0);
        assert!(!p.is_valid());
        assert_eq!(p.value(), Err(MemoryError::NullDereference));
    }
}
