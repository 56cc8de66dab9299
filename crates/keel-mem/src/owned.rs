//! Pointers that own their native allocation.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;

use keel_core::MemoryError;

use crate::borrowed::BorrowedPtr;
use crate::plain::PlainData;
use crate::pointer::{
    self, byte_len, check_index, ByteView, MemoryBacked, Pointer, ReadPointer, WritePointer,
};
use crate::release::Release;

/// Exclusive owner of a native allocation.
///
/// The attached [`Release`] runs exactly once: on the first call to
/// [`dispose`](Pointer::dispose), or on drop if the pointer was never
/// disposed. After disposal the pointer reads as null.
///
/// A read-only owner refuses writes even though the memory is writable.
pub struct OwnedPtr<T> {
    ptr: *mut T,
    len: Option<usize>,
    read_only: bool,
    release: Option<Release>,
    _owns: PhantomData<T>,
}

// SAFETY: the pointer owns its elements exclusively, like a `Box<[T]>`.
// `Release::Custom` closures are required to be `Send`.
unsafe impl<T: Send> Send for OwnedPtr<T> {}
// SAFETY: shared access only reads elements.
unsafe impl<T: Sync> Sync for OwnedPtr<T> {}

impl<T> OwnedPtr<T> {
    /// A single host-allocated value.
    pub fn new(value: T) -> Self {
        Self::from_vec(vec![value])
    }

    /// Takes over a host vector's buffer. The extent is its length.
    pub fn from_vec(values: Vec<T>) -> Self {
        let mut values = std::mem::ManuallyDrop::new(values);
        let len = values.len();
        let capacity = values.capacity();
        Self {
            ptr: values.as_mut_ptr(),
            len: Some(len),
            read_only: false,
            release: Some(Release::Host { len, capacity }),
            _owns: PhantomData,
        }
    }

    /// A copy of `values` in a fresh allocation.
    pub fn from_slice(values: &[T]) -> Self
    where
        T: Clone,
    {
        Self::from_vec(values.to_vec())
    }

    /// `count` default-initialized elements.
    pub fn with_len(count: usize) -> Self
    where
        T: Default,
    {
        Self::from_vec(std::iter::repeat_with(T::default).take(count).collect())
    }

    /// `count` zeroed plain-data elements.
    pub fn zeroed(count: usize) -> Self
    where
        T: PlainData,
    {
        Self::from_vec(vec![T::zeroed(); count])
    }

    /// Take ownership of native memory.
    ///
    /// # Safety
    ///
    /// Unless `ptr` is null, it must address initialized `T`s, properly
    /// aligned, valid for every index the caller touches, and `release`
    /// must be the correct way to free it. Nothing else may free it.
    pub unsafe fn from_raw(ptr: *mut T, len: Option<usize>, release: Release) -> Self {
        Self {
            ptr,
            len,
            read_only: false,
            release: Some(release),
            _owns: PhantomData,
        }
    }

    /// The same owner with writes refused.
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// `true` once the release strategy has run.
    pub fn is_disposed(&self) -> bool {
        self.release.is_none()
    }

    /// Read-only borrowed view over the whole allocation.
    pub fn as_borrowed(&self) -> BorrowedPtr<'_, T> {
        pointer::offset(self, 0)
    }

    /// Borrowed view over the whole allocation, writable unless this
    /// owner is read-only.
    pub fn as_borrowed_mut(&mut self) -> BorrowedPtr<'_, T> {
        pointer::offset_mut(self, 0)
    }

    /// Read-only borrowed view advanced by `count` elements.
    pub fn offset(&self, count: isize) -> BorrowedPtr<'_, T> {
        pointer::offset(self, count)
    }

    /// Borrowed view advanced by `count` elements, writable unless this
    /// owner is read-only.
    pub fn offset_mut(&mut self, count: isize) -> BorrowedPtr<'_, T> {
        pointer::offset_mut(self, count)
    }

    /// Read-only borrowed view reinterpreted as `U`.
    pub fn recast<U: PlainData>(&self) -> BorrowedPtr<'_, U>
    where
        T: PlainData,
    {
        pointer::recast::<_, U>(self)
    }

    /// Borrowed view reinterpreted as `U`, writable unless this owner is
    /// read-only.
    pub fn recast_mut<U: PlainData>(&mut self) -> BorrowedPtr<'_, U>
    where
        T: PlainData,
    {
        pointer::recast_mut::<_, U>(self)
    }

    /// The elements as a slice. Needs a live pointer with known extent.
    pub fn as_slice(&self) -> Result<&[T], MemoryError> {
        if self.ptr.is_null() {
            return Err(MemoryError::NullDereference);
        }
        let len = self.len.ok_or(MemoryError::UnknownLength)?;
        // SAFETY: `ptr` owns `len` initialized, aligned elements.
        Ok(unsafe { std::slice::from_raw_parts(self.ptr, len) })
    }

    /// The elements as a mutable slice. Refused when read-only.
    pub fn as_mut_slice(&mut self) -> Result<&mut [T], MemoryError> {
        if self.ptr.is_null() {
            return Err(MemoryError::NullDereference);
        }
        if self.read_only {
            return Err(MemoryError::ReadOnly);
        }
        let len = self.len.ok_or(MemoryError::UnknownLength)?;
        // SAFETY: as above, and `&mut self` makes the borrow exclusive.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr, len) })
    }

    fn live(&self) -> Result<(), MemoryError> {
        if self.ptr.is_null() {
            Err(MemoryError::NullDereference)
        } else {
            Ok(())
        }
    }
}

impl<T> FromIterator<T> for OwnedPtr<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> Pointer for OwnedPtr<T> {
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

    fn dispose(&mut self) {
        if let Some(release) = self.release.take() {
            let ptr = std::mem::replace(&mut self.ptr, std::ptr::null_mut());
            self.len = None;
            // SAFETY: `release` was supplied for exactly this allocation and
            // has been taken, so it cannot run again.
            unsafe { release.run(ptr) };
        }
    }
}

impl<T: Clone> ReadPointer for OwnedPtr<T> {
    type Output = T;

    fn get(&self, index: usize) -> Result<T, MemoryError> {
        self.live()?;
        check_index(index, self.len)?;
        // SAFETY: live, and in bounds when the extent is known.
        Ok(unsafe { (*self.ptr.add(index)).clone() })
    }
}

impl<T> WritePointer for OwnedPtr<T> {
    fn set(&mut self, index: usize, value: T) -> Result<(), MemoryError> {
        self.live()?;
        if self.read_only {
            return Err(MemoryError::ReadOnly);
        }
        check_index(index, self.len)?;
        // SAFETY: live, in bounds, and the slot holds an initialized `T`
        // that this assignment drops.
        unsafe { *self.ptr.add(index) = value };
        Ok(())
    }
}

impl<T> MemoryBacked for OwnedPtr<T> {}

impl<T: PlainData> ByteView for OwnedPtr<T> {
    fn as_bytes(&self) -> Result<&[u8], MemoryError> {
        self.live()?;
        let len = byte_len::<T>(self.len)?;
        // SAFETY: `T` is plain data, so every byte of the owned extent is
        // initialized. Views derived through `&self` are read-only.
        Ok(unsafe { std::slice::from_raw_parts(self.ptr as *const u8, len) })
    }

    fn as_mut_bytes(&mut self) -> Result<&mut [u8], MemoryError> {
        self.live()?;
        if self.read_only {
            return Err(MemoryError::ReadOnly);
        }
        let len = byte_len::<T>(self.len)?;
        // SAFETY: as for `as_bytes`; `&mut self` makes the borrow exclusive
        // and any byte pattern is a valid `T`.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr as *mut u8, len) })
    }
}

impl<T> Drop for OwnedPtr<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> fmt::Debug for OwnedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedPtr")
            .field("addr", &format_args!("{:#x}", self.ptr as usize))
            .field("len", &self.len)
            .field("read_only", &self.read_only)
            .field("release", &self.release)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_release(counter: &Arc<AtomicUsize>) -> Release {
        let counter = Arc::clone(counter);
        Release::custom(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn single_value_round_trip() {
        let mut p = OwnedPtr::new(41i64);
        assert_eq!(p.array_size(), Some(1));
        p.set_value(42).unwrap();
        assert_eq!(p.value(), Ok(42));
    }

    #[test]
    fn array_constructors() {
        let zeros = OwnedPtr::<u32>::zeroed(4);
        assert_eq!(zeros.as_slice().unwrap(), &[0, 0, 0, 0]);

        let defaults = OwnedPtr::<String>::with_len(2);
        assert_eq!(defaults.get(1), Ok(String::new()));

        let collected: OwnedPtr<u8> = (1..=3).collect();
        assert_eq!(collected.as_slice().unwrap(), &[1, 2, 3]);

        let copied = OwnedPtr::from_slice(&[5i16, 6]);
        assert_eq!(copied.get(1), Ok(6));
    }

    #[test]
    fn index_past_known_extent_fails() {
        let mut p = OwnedPtr::from_vec(vec![1u8, 2, 3]);
        assert_eq!(p.get(3).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(p.set(5, 0).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn read_only_refuses_writes_but_reads() {
        let mut p = OwnedPtr::new(7u32).into_read_only();
        assert_eq!(p.set_value(8), Err(MemoryError::ReadOnly));
        assert_eq!(p.as_mut_bytes().unwrap_err(), MemoryError::ReadOnly);
        assert_eq!(p.value(), Ok(7));
    }

    #[test]
    fn dispose_runs_release_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut backing = [0u8; 8];
        let mut p = unsafe {
            OwnedPtr::from_raw(backing.as_mut_ptr(), Some(8), counting_release(&calls))
        };
        p.dispose();
        p.dispose();
        drop(p);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_without_dispose_releases() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut backing = [0u8; 2];
        {
            let _p = unsafe {
                OwnedPtr::from_raw(backing.as_mut_ptr(), Some(2), counting_release(&calls))
            };
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disposed_pointer_reads_as_null() {
        let mut p = OwnedPtr::new(1u8);
        p.dispose();
        assert!(p.is_disposed());
        assert!(!p.is_valid());
        assert_eq!(p.value(), Err(MemoryError::NullDereference));
    }

    #[test]
    fn byte_view_covers_plain_elements() {
        let q = OwnedPtr::from_vec(vec![0x0102u16, 0x0304]);
        assert_eq!(q.as_bytes().unwrap().len(), 4);
        assert_eq!(q.as_bytes().unwrap()[..2], 0x0102u16.to_ne_bytes());

        let mut r = OwnedPtr::<u32>::zeroed(2);
        r.as_mut_bytes().unwrap()[4..].copy_from_slice(&7u32.to_ne_bytes());
        assert_eq!(r.get(1), Ok(7));
    }

    #[test]
    fn byte_view_of_disposed_owner_fails() {
        let mut p = OwnedPtr::from_vec(vec![1u64, 2]);
        p.dispose();
        assert_eq!(p.as_bytes(), Err(MemoryError::NullDereference));
        assert_eq!(p.as_mut_bytes(), Err(MemoryError::NullDereference));
    }

    #[test]
    fn host_release_drops_elements() {
        let marker = Arc::new(());
        let p = OwnedPtr::from_vec(vec![Arc::clone(&marker), Arc::clone(&marker)]);
        assert_eq!(Arc::strong_count(&marker), 3);
        drop(p);
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn borrowed_views_track_extent() {
        let p = OwnedPtr::from_vec(vec![1u32, 2, 3, 4]);
        let tail = p.offset(1);
        assert_eq!(tail.array_size(), Some(3));
        assert_eq!(tail.value(), Ok(2));
        let bytes = p.recast::<u8>();
        assert_eq!(bytes.array_size(), Some(16));
        assert_eq!(p.as_borrowed().addr(), p.addr());
        assert!(p.as_borrowed().is_read_only());
    }

    #[test]
    fn mutable_views_write_through_to_owner() {
        let mut p = OwnedPtr::from_vec(vec![0u32; 3]);
        p.offset_mut(2).set_value(11).unwrap();
        p.as_borrowed_mut().set(0, 4).unwrap();
        p.recast_mut::<u8>().set(4, 1).unwrap();
        assert_eq!(p.as_slice().unwrap()[0], 4);
        assert_eq!(p.get(1), Ok(u32::from_ne_bytes([1, 0, 0, 0])));
        assert_eq!(p.get(2), Ok(11));

        let mut frozen = OwnedPtr::new(1u32).into_read_only();
        assert!(frozen.offset_mut(0).is_read_only());
    }
}
