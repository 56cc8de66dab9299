//! Non-owning pointers into memory managed elsewhere.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;

use keel_core::MemoryError;

use crate::plain::PlainData;
use crate::pointer::{
    self, byte_len, check_index, ByteView, MemoryBacked, Pointer, ReadPointer, WritePointer,
};

/// A view into native memory owned by someone else: a native library,
/// an arena frame, or a host slice.
///
/// The lifetime ties the view to its owner where the owner is known
/// (slices, arena frames); raw-address views choose it freely and the
/// caller vouches for it. Elements are read and written with unaligned
/// loads and stores, so views produced by [`recast`](Self::recast) at
/// arbitrary byte offsets stay sound.
///
/// A view is not `Copy`. Derived views taken through `&self` are
/// read-only; [`offset_mut`](Self::offset_mut) and
/// [`recast_mut`](Self::recast_mut) keep writability but hold the source
/// exclusively, so two live views never write the same memory.
pub struct BorrowedPtr<'a, T> {
    ptr: *mut T,
    len: Option<usize>,
    read_only: bool,
    _owner: PhantomData<&'a T>,
}

impl<'a, T> BorrowedPtr<'a, T> {
    /// The null view.
    pub const fn null() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: None,
            read_only: false,
            _owner: PhantomData,
        }
    }

    /// View `len` elements at `ptr` (`None` for an unknown extent).
    ///
    /// # Safety
    ///
    /// Unless `ptr` is null, it must address memory valid for reads and
    /// writes of `T` for every index the caller will touch, for all of
    /// `'a`.
    pub unsafe fn from_raw(ptr: *mut T, len: Option<usize>) -> Self {
        Self {
            ptr,
            len,
            read_only: false,
            _owner: PhantomData,
        }
    }

    /// Read-only view over a host slice.
    pub fn from_slice(slice: &'a [T]) -> Self {
        Self {
            ptr: slice.as_ptr() as *mut T,
            len: Some(slice.len()),
            read_only: true,
            _owner: PhantomData,
        }
    }

    /// Writable view over a host slice.
    pub fn from_mut_slice(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: Some(slice.len()),
            read_only: false,
            _owner: PhantomData,
        }
    }

    /// The same view with writes refused.
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Read-only view advanced by `count` elements.
    pub fn offset(&self, count: isize) -> BorrowedPtr<'_, T> {
        pointer::offset(self, count)
    }

    /// View advanced by `count` elements, writable if this one is.
    pub fn offset_mut(&mut self, count: isize) -> BorrowedPtr<'_, T> {
        pointer::offset_mut(self, count)
    }

    /// Read-only view reinterpreted as elements of `U`.
    pub fn recast<U: PlainData>(&self) -> BorrowedPtr<'_, U>
    where
        T: PlainData,
    {
        pointer::recast::<_, U>(self)
    }

    /// View reinterpreted as elements of `U`, writable if this one is.
    pub fn recast_mut<U: PlainData>(&mut self) -> BorrowedPtr<'_, U>
    where
        T: PlainData,
    {
        pointer::recast_mut::<_, U>(self)
    }
}

impl<T: Copy> BorrowedPtr<'_, T> {
    /// Copies every element out. Needs a known extent.
    pub fn to_vec(&self) -> Result<Vec<T>, MemoryError> {
        let len = self.len.ok_or(MemoryError::UnknownLength)?;
        (0..len).map(|i| self.get(i)).collect()
    }
}

impl<T> Pointer for BorrowedPtr<'_, T> {
    type Elem = T;

    fn as_ptr(&self) -> *const T {
        self.ptr
    }

    fn array_size(&self) -> Option<usize> {
        self.len
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl<T: Copy> ReadPointer for BorrowedPtr<'_, T> {
    type Output = T;

    fn get(&self, index: usize) -> Result<T, MemoryError> {
        if self.ptr.is_null() {
            return Err(MemoryError::NullDereference);
        }
        check_index(index, self.len)?;
        // SAFETY: non-null, and `from_raw`'s contract (or the slice borrow)
        // covers every index the caller touches.
        Ok(unsafe { self.ptr.add(index).read_unaligned() })
    }
}

impl<T: Copy> WritePointer for BorrowedPtr<'_, T> {
    fn set(&mut self, index: usize, value: T) -> Result<(), MemoryError> {
        if self.ptr.is_null() {
            return Err(MemoryError::NullDereference);
        }
        if self.read_only {
            return Err(MemoryError::ReadOnly);
        }
        check_index(index, self.len)?;
        // SAFETY: as for `get`.
        unsafe { self.ptr.add(index).write_unaligned(value) };
        Ok(())
    }
}

impl<T> MemoryBacked for BorrowedPtr<'_, T> {}

impl<T: PlainData> ByteView for BorrowedPtr<'_, T> {
    fn as_bytes(&self) -> Result<&[u8], MemoryError> {
        if self.ptr.is_null() {
            return Err(MemoryError::NullDereference);
        }
        let len = byte_len::<T>(self.len)?;
        // SAFETY: `T` is plain data, so every byte is initialized. No other
        // live view can write this range while `&self` is held: views are
        // not `Copy` and writable derived views borrow their source
        // exclusively.
        Ok(unsafe { std::slice::from_raw_parts(self.ptr as *const u8, len) })
    }

    fn as_mut_bytes(&mut self) -> Result<&mut [u8], MemoryError> {
        if self.ptr.is_null() {
            return Err(MemoryError::NullDereference);
        }
        if self.read_only {
            return Err(MemoryError::ReadOnly);
        }
        let len = byte_len::<T>(self.len)?;
        // SAFETY: as for `as_bytes`; `&mut self` makes the borrow exclusive
        // and any byte pattern written back is a valid `T`.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr as *mut u8, len) })
    }
}

impl<T> fmt::Debug for BorrowedPtr<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BorrowedPtr")
            .field("addr", &format_args!("{:#x}", self.ptr as usize))
            .field("len", &self.len)
            .field("read_only", &self.read_only)
            .finish()
    }
}
