//! The null pointer.

use std::fmt;
use std::marker::PhantomData;

use keel_core::MemoryError;

use crate::pointer::{ByteView, MemoryBacked, Pointer, ReadPointer, WritePointer};

/// Zero address, unknown extent. Every access fails with
/// [`MemoryError::NullDereference`].
pub struct NullPtr<T>(PhantomData<fn() -> T>);

impl<T> NullPtr<T> {
    /// The null pointer for `T`.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for NullPtr<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for NullPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NullPtr<T> {}

impl<T> Pointer for NullPtr<T> {
    type Elem = T;

    fn as_ptr(&self) -> *const T {
        std::ptr::null()
    }

    fn array_size(&self) -> Option<usize> {
        None
    }
}

impl<T> ReadPointer for NullPtr<T> {
    type Output = T;

    fn get(&self, _index: usize) -> Result<T, MemoryError> {
        Err(MemoryError::NullDereference)
    }
}

impl<T> WritePointer for NullPtr<T> {
    fn set(&mut self, _index: usize, _value: T) -> Result<(), MemoryError> {
        Err(MemoryError::NullDereference)
    }
}

impl<T> MemoryBacked for NullPtr<T> {}

impl<T> ByteView for NullPtr<T> {
    fn as_bytes(&self) -> Result<&[u8], MemoryError> {
        Err(MemoryError::NullDereference)
    }

    fn as_mut_bytes(&mut self) -> Result<&mut [u8], MemoryError> {
        Err(MemoryError::NullDereference)
    }
}

impl<T> fmt::Debug for NullPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NullPtr<{}>", std::any::type_name::<T>())
    }
}
