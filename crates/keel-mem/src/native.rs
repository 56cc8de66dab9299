//! Tagged sum over the memory-backed pointer variants.

use keel_core::MemoryError;

use crate::borrowed::BorrowedPtr;
use crate::owned::OwnedPtr;
use crate::plain::PlainData;
use crate::pointer::{ByteView, MemoryBacked, Pointer, ReadPointer, WritePointer};

/// Any pointer to native memory holding `T`.
///
/// Pinned objects are not memory-backed and stay a separate type,
/// [`ObjectPtr`](crate::ObjectPtr).
#[derive(Debug)]
pub enum NativePtr<'a, T> {
    /// Owns its allocation.
    Owned(OwnedPtr<T>),
    /// Views memory owned elsewhere.
    Borrowed(BorrowedPtr<'a, T>),
    /// The zero address.
    Null,
}

impl<T> Default for NativePtr<'_, T> {
    fn default() -> Self {
        Self::Null
    }
}

impl<T> From<OwnedPtr<T>> for NativePtr<'_, T> {
    fn from(p: OwnedPtr<T>) -> Self {
        Self::Owned(p)
    }
}

impl<'a, T> From<BorrowedPtr<'a, T>> for NativePtr<'a, T> {
    fn from(p: BorrowedPtr<'a, T>) -> Self {
        Self::Borrowed(p)
    }
}

impl<T> Pointer for NativePtr<'_, T> {
    type Elem = T;

    fn as_ptr(&self) -> *const T {
        match self {
            Self::Owned(p) => p.as_ptr(),
            Self::Borrowed(p) => p.as_ptr(),
            Self::Null => std::ptr::null(),
        }
    }

    fn array_size(&self) -> Option<usize> {
        match self {
            Self::Owned(p) => p.array_size(),
            Self::Borrowed(p) => p.array_size(),
            Self::Null => None,
        }
    }

    fn is_read_only(&self) -> bool {
        match self {
            Self::Owned(p) => p.is_read_only(),
            Self::Borrowed(p) => p.is_read_only(),
            Self::Null => false,
        }
    }

    fn dispose(&mut self) {
        if let Self::Owned(p) = self {
            p.dispose();
        }
    }
}

impl<T: Copy> ReadPointer for NativePtr<'_, T> {
    type Output = T;

    fn get(&self, index: usize) -> Result<T, MemoryError> {
        match self {
            Self::Owned(p) => p.get(index),
            Self::Borrowed(p) => p.get(index),
            Self::Null => Err(MemoryError::NullDereference),
        }
    }
}

impl<T: Copy> WritePointer for NativePtr<'_, T> {
    fn set(&mut self, index: usize, value: T) -> Result<(), MemoryError> {
        match self {
            Self::Owned(p) => p.set(index, value),
            Self::Borrowed(p) => p.set(index, value),
            Self::Null => Err(MemoryError::NullDereference),
        }
    }
}

impl<T> MemoryBacked for NativePtr<'_, T> {}

impl<T: PlainData> ByteView for NativePtr<'_, T> {
    fn as_bytes(&self) -> Result<&[u8], MemoryError> {
        match self {
            Self::Owned(p) => p.as_bytes(),
            Self::Borrowed(p) => p.as_bytes(),
            Self::Null => Err(MemoryError::NullDereference),
        }
    }

    fn as_mut_bytes(&mut self) -> Result<&mut [u8], MemoryError> {
        match self {
            Self::Owned(p) => p.as_mut_bytes(),
            Self::Borrowed(p) => p.as_mut_bytes(),
            Self::Null => Err(MemoryError::NullDereference),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum<P: ReadPointer<Output = u32>>(p: &P) -> Result<u32, MemoryError> {
        let n = p.array_size().ok_or(MemoryError::UnknownLength)?;
        (0..n).map(|i| p.get(i)).sum()
    }

    #[test]
    fn variants_share_one_contract() {
        let backing = [1u32, 2, 3];
        let owned: NativePtr<'_, u32> = OwnedPtr::from_vec(vec![4, 5]).into();
        let borrowed: NativePtr<'_, u32> = BorrowedPtr::from_slice(&backing).into();
        let null = NativePtr::<u32>::default();

        assert_eq!(sum(&owned), Ok(9));
        assert_eq!(sum(&borrowed), Ok(6));
        assert_eq!(null.value(), Err(MemoryError::NullDereference));
        assert!(owned.is_valid() && borrowed.is_valid() && !null.is_valid());
    }

    #[test]
    fn writes_dispatch_to_variant() {
        let mut owned: NativePtr<'_, i8> = OwnedPtr::new(0).into();
        owned.set_value(-4).unwrap();
        assert_eq!(owned.value(), Ok(-4));

        let mut null = NativePtr::<i8>::Null;
        assert_eq!(null.set_value(1), Err(MemoryError::NullDereference));
    }

    #[test]
    fn dispose_only_touches_owned() {
        let mut owned: NativePtr<'_, u8> = OwnedPtr::new(1).into();
        owned.dispose();
        assert!(!owned.is_valid());
        let mut null = NativePtr::<u8>::Null;
        null.dispose();
    }

    #[test]
    fn byte_views_dispatch_to_variant() {
        let mut backing = [0u8; 4];
        let mut borrowed: NativePtr<'_, u8> = BorrowedPtr::from_mut_slice(&mut backing).into();
        borrowed.as_mut_bytes().unwrap()[3] = 9;
        assert_eq!(borrowed.as_bytes().unwrap(), &[0, 0, 0, 9]);

        let owned: NativePtr<'_, u16> = OwnedPtr::from_vec(vec![1, 2]).into();
        assert_eq!(owned.as_bytes().unwrap().len(), 4);
        assert_eq!(NativePtr::<u16>::Null.as_bytes(), Err(MemoryError::NullDereference));
    }
}
