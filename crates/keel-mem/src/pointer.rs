//! The pointer capability traits shared by every variant.
//!
//! [`Pointer`] is the read-nothing base: an address, an optional known
//! element count, and disposal. [`ReadPointer`] adds element reads and
//! [`WritePointer`] element writes. [`ByteView`] exposes the pointee as raw
//! bytes and is only implemented over [`PlainData`] elements.
//! [`MemoryBacked`] marks the variants whose address is real memory, which
//! are the only ones [`offset`] and [`recast`] accept. Each variant opts
//! into exactly the capabilities it supports.

use crate::borrowed::BorrowedPtr;
use crate::plain::PlainData;
use keel_core::MemoryError;

/// Raw sentinel used by [`Pointer::raw_array_size`] for an unknown extent.
pub const UNKNOWN_SIZE: isize = -1;

/// An address into native memory with an optionally known extent.
pub trait Pointer {
    /// Element type the pointer addresses.
    type Elem;

    /// The base address, typed.
    fn as_ptr(&self) -> *const Self::Elem;

    /// Known element count, or `None` when the extent is unknown.
    fn array_size(&self) -> Option<usize>;

    /// Whether writes through this pointer are refused.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Release whatever the pointer owns. Safe to call more than once;
    /// variants that own nothing do nothing.
    fn dispose(&mut self) {}

    /// The base address as an integer.
    fn addr(&self) -> usize {
        self.as_ptr() as usize
    }

    /// `true` for any non-zero address.
    fn is_valid(&self) -> bool {
        !self.as_ptr().is_null()
    }

    /// Array size in native form: the count, or [`UNKNOWN_SIZE`].
    fn raw_array_size(&self) -> isize {
        self.array_size()
            .map_or(UNKNOWN_SIZE, |n| isize::try_from(n).unwrap_or(isize::MAX))
    }
}

/// A pointer whose elements can be read.
pub trait ReadPointer: Pointer {
    /// What a read produces. Plain pointers yield the element itself;
    /// object handles yield a shared reference to the pinned object.
    type Output;

    /// Element `index`. Bounds-checked when the extent is known.
    fn get(&self, index: usize) -> Result<Self::Output, MemoryError>;

    /// Element zero.
    fn value(&self) -> Result<Self::Output, MemoryError> {
        self.get(0)
    }
}

/// A pointer whose elements can be written.
pub trait WritePointer: Pointer {
    /// Overwrite element `index`. Bounds-checked when the extent is known.
    fn set(&mut self, index: usize, value: Self::Elem) -> Result<(), MemoryError>;

    /// Overwrite element zero.
    fn set_value(&mut self, value: Self::Elem) -> Result<(), MemoryError> {
        self.set(0, value)
    }

    /// The base address, typed for writing.
    fn as_mut_ptr(&self) -> *mut Self::Elem {
        self.as_ptr() as *mut Self::Elem
    }
}

/// A pointer whose pointee can be viewed as raw bytes.
///
/// Memory-backed variants implement it only for [`PlainData`] elements,
/// so a byte view never exposes padding, references or values with
/// invalid bit patterns. The view covers `array_size * size_of::<Elem>()`
/// bytes, or a single element when the extent is unknown.
pub trait ByteView: Pointer {
    /// The pointee as bytes.
    fn as_bytes(&self) -> Result<&[u8], MemoryError>;

    /// The pointee as mutable bytes. Refused when read-only.
    fn as_mut_bytes(&mut self) -> Result<&mut [u8], MemoryError>;
}

/// Pointers whose address is native memory rather than an opaque token.
///
/// Only these can be offset or recast into a [`BorrowedPtr`].
pub trait MemoryBacked: Pointer {}

/// Read-only view of `ptr` advanced by `count` elements.
///
/// A known extent shrinks to `size - count` while at least one element
/// remains; a negative or overlong offset makes it unknown. Offsetting a
/// null pointer yields null. The view shares `ptr`, so it never writes;
/// use [`offset_mut`] for a writable one.
pub fn offset<P: MemoryBacked>(ptr: &P, count: isize) -> BorrowedPtr<'_, P::Elem> {
    offset_view(ptr, count).into_read_only()
}

/// View of `ptr` advanced by `count` elements that keeps its writability.
///
/// Holds `ptr` exclusively for as long as the view lives.
pub fn offset_mut<P: MemoryBacked>(ptr: &mut P, count: isize) -> BorrowedPtr<'_, P::Elem> {
    offset_view(ptr, count)
}

/// Read-only view of `ptr` reinterpreted as elements of `U`.
///
/// A known count is rescaled by `size_of::<Elem>() / size_of::<U>()`, and
/// becomes unknown if the byte length does not fit in a `usize`.
pub fn recast<P, U>(ptr: &P) -> BorrowedPtr<'_, U>
where
    P: MemoryBacked,
    P::Elem: PlainData,
    U: PlainData,
{
    recast_view(ptr).into_read_only()
}

/// View of `ptr` reinterpreted as elements of `U` that keeps its
/// writability.
pub fn recast_mut<P, U>(ptr: &mut P) -> BorrowedPtr<'_, U>
where
    P: MemoryBacked,
    P::Elem: PlainData,
    U: PlainData,
{
    recast_view(ptr)
}

fn offset_view<P: MemoryBacked>(ptr: &P, count: isize) -> BorrowedPtr<'_, P::Elem> {
    if !ptr.is_valid() {
        return BorrowedPtr::null();
    }
    let base = ptr.as_ptr() as *mut P::Elem;
    let len = offset_extent(ptr.array_size(), count);
    let moved = base.wrapping_offset(count);
    #[allow(unsafe_code)]
    // SAFETY: the result borrows `ptr`, so it cannot outlive the memory
    // the source pointer was constructed over. Callers hand out a
    // writable result only while holding `ptr` exclusively. Address
    // validity past the known extent is the caller's contract.
    let view = unsafe { BorrowedPtr::from_raw(moved, len) };
    if ptr.is_read_only() {
        view.into_read_only()
    } else {
        view
    }
}

fn recast_view<P, U>(ptr: &P) -> BorrowedPtr<'_, U>
where
    P: MemoryBacked,
    P::Elem: PlainData,
    U: PlainData,
{
    if !ptr.is_valid() {
        return BorrowedPtr::null();
    }
    let len = recast_extent::<P::Elem, U>(ptr.array_size());
    #[allow(unsafe_code)]
    // SAFETY: both element types are plain data, so every bit pattern of
    // the source bytes is a valid `U`. Reads go through unaligned loads.
    // Exclusivity is as for `offset_view`.
    let view = unsafe { BorrowedPtr::from_raw(ptr.as_ptr() as *mut U, len) };
    if ptr.is_read_only() {
        view.into_read_only()
    } else {
        view
    }
}

pub(crate) fn check_index(index: usize, size: Option<usize>) -> Result<(), MemoryError> {
    match size {
        Some(len) if index >= len => Err(MemoryError::OutOfRange { index, len }),
        _ => Ok(()),
    }
}

pub(crate) fn offset_extent(size: Option<usize>, count: isize) -> Option<usize> {
    let size = size?;
    let count = usize::try_from(count).ok()?;
    size.checked_sub(count).filter(|&rest| rest >= 1)
}

pub(crate) fn recast_extent<T, U>(size: Option<usize>) -> Option<usize> {
    let to = std::mem::size_of::<U>();
    if to == 0 {
        return None;
    }
    Some(size?.checked_mul(std::mem::size_of::<T>())? / to)
}

/// Length in bytes of a view over `size` elements of `T`.
///
/// Fails with [`MemoryError::UnknownLength`] when the byte count does not
/// fit a slice.
pub(crate) fn byte_len<T>(size: Option<usize>) -> Result<usize, MemoryError> {
    size.unwrap_or(1)
        .checked_mul(std::mem::size_of::<T>())
        .filter(|&n| isize::try_from(n).is_ok())
        .ok_or(MemoryError::UnknownLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_check_only_applies_to_known_extent() {
        assert!(check_index(3, Some(4)).is_ok());
        assert_eq!(
            check_index(4, Some(4)),
            Err(MemoryError::OutOfRange { index: 4, len: 4 })
        );
        assert!(check_index(1_000, None).is_ok());
    }

    #[test]
    fn offset_within_bounds_shrinks_extent() {
        assert_eq!(offset_extent(Some(10), 3), Some(7));
        assert_eq!(offset_extent(Some(10), 0), Some(10));
    }

    #[test]
    fn offset_out_of_bounds_forgets_extent() {
        assert_eq!(offset_extent(Some(10), -1), None);
        assert_eq!(offset_extent(Some(10), 10), None);
        assert_eq!(offset_extent(Some(10), 11), None);
        assert_eq!(offset_extent(None, 2), None);
    }

    #[test]
    fn recast_rescales_count() {
        assert_eq!(recast_extent::<u32, u8>(Some(4)), Some(16));
        assert_eq!(recast_extent::<u8, u32>(Some(10)), Some(2));
        assert_eq!(recast_extent::<u8, u32>(Some(0)), Some(0));
        assert_eq!(recast_extent::<u8, u32>(None), None);
    }

    #[test]
    fn recast_overflow_forgets_extent() {
        assert_eq!(recast_extent::<u64, u8>(Some(usize::MAX / 4)), None);
        assert_eq!(recast_extent::<u32, u16>(Some(usize::MAX)), None);
    }

    #[test]
    fn unknown_extent_views_one_element() {
        assert_eq!(byte_len::<u64>(None), Ok(8));
        assert_eq!(byte_len::<u16>(Some(5)), Ok(10));
    }

    #[test]
    fn oversized_byte_length_is_refused() {
        assert_eq!(byte_len::<u32>(Some(usize::MAX / 2)), Err(MemoryError::UnknownLength));
        assert_eq!(byte_len::<u8>(Some(usize::MAX)), Err(MemoryError::UnknownLength));
    }
}
