//! Stateless operations over raw memory: copy, fill, compare, search and
//! bitwise reinterpretation.
//!
//! Functions taking a [`Pointer`] trust the extent the pointer was built
//! with and check it where known. Functions taking raw addresses are
//! `unsafe` and check nothing beyond null.

#![allow(unsafe_code)]

use keel_core::MemoryError;

use crate::plain::PlainData;
use crate::pointer::{MemoryBacked, Pointer, WritePointer};

/// Copy `len` bytes between raw addresses. Overlapping ranges are allowed.
///
/// # Safety
///
/// Both ranges must be valid for `len` bytes.
pub unsafe fn copy_bytes(dst: *mut u8, src: *const u8, len: usize) {
    // SAFETY: forwarded from the caller.
    unsafe { std::ptr::copy(src, dst, len) };
}

/// Copy `len` bytes from `src` to `dst`.
///
/// Null or read-only destinations fail. Lengths are not reconciled: the
/// caller guarantees both regions hold `len` bytes.
///
/// # Safety
///
/// Both pointers must address at least `len` valid bytes.
pub unsafe fn copy<D, S>(dst: &mut D, src: &S, len: usize) -> Result<(), MemoryError>
where
    D: WritePointer,
    S: Pointer,
{
    check_writable(dst)?;
    if !src.is_valid() {
        return Err(MemoryError::NullDereference);
    }
    // SAFETY: forwarded from the caller.
    unsafe { copy_bytes(dst.as_mut_ptr().cast(), src.as_ptr().cast(), len) };
    Ok(())
}

/// Copy the first `len` bytes of `src` into `dst`.
///
/// # Safety
///
/// `dst` must address at least `len` writable bytes.
pub unsafe fn copy_from_slice<D, T>(dst: &mut D, src: &[T], len: usize) -> Result<(), MemoryError>
where
    D: WritePointer,
    T: Copy,
{
    check_writable(dst)?;
    if len > std::mem::size_of_val(src) {
        return Err(MemoryError::invalid_argument(format!(
            "copy of {len} bytes from a {}-byte slice",
            std::mem::size_of_val(src)
        )));
    }
    // SAFETY: the source range was checked; the destination is the
    // caller's contract.
    unsafe { copy_bytes(dst.as_mut_ptr().cast(), src.as_ptr().cast(), len) };
    Ok(())
}

/// Copy `len` bytes from `src` into the front of `dst`.
///
/// # Safety
///
/// `src` must address at least `len` readable bytes.
pub unsafe fn copy_to_slice<S, T>(dst: &mut [T], src: &S, len: usize) -> Result<(), MemoryError>
where
    S: Pointer,
    T: PlainData,
{
    if !src.is_valid() {
        return Err(MemoryError::NullDereference);
    }
    if len > std::mem::size_of_val(dst) {
        return Err(MemoryError::invalid_argument(format!(
            "copy of {len} bytes into a {}-byte slice",
            std::mem::size_of_val(dst)
        )));
    }
    // SAFETY: the destination range was checked and `T` accepts any bytes;
    // the source is the caller's contract.
    unsafe { copy_bytes(dst.as_mut_ptr().cast(), src.as_ptr().cast(), len) };
    Ok(())
}

/// Read a plain value at an arbitrary, possibly unaligned address.
///
/// # Safety
///
/// `addr` must be valid for `size_of::<T>()` bytes.
pub unsafe fn read_plain<T: PlainData>(addr: *const u8) -> T {
    // SAFETY: forwarded from the caller; `T` accepts any bit pattern.
    unsafe { addr.cast::<T>().read_unaligned() }
}

/// Write a plain value at an arbitrary, possibly unaligned address.
///
/// # Safety
///
/// `addr` must be valid for writes of `size_of::<T>()` bytes.
pub unsafe fn write_plain<T: PlainData>(addr: *mut u8, value: T) {
    // SAFETY: forwarded from the caller.
    unsafe { addr.cast::<T>().write_unaligned(value) };
}

/// Zero `count` elements at `ptr`, or its whole known extent when `count`
/// is `None`.
pub fn zero_fill<P>(ptr: &mut P, count: Option<usize>) -> Result<(), MemoryError>
where
    P: WritePointer,
    P::Elem: PlainData,
{
    check_writable(ptr)?;
    let known = ptr.array_size();
    let count = count.or(known).ok_or(MemoryError::UnknownLength)?;
    if let Some(len) = known {
        if count > len {
            return Err(MemoryError::OutOfRange { index: count - 1, len });
        }
    }
    let bytes = count
        .checked_mul(std::mem::size_of::<P::Elem>())
        .ok_or(MemoryError::UnknownLength)?;
    let dst = ptr.as_mut_ptr().cast::<u8>();
    // SAFETY: non-null, writable, and within the known extent when there
    // is one. An all-zero pattern is a valid plain value.
    unsafe { std::ptr::write_bytes(dst, 0, bytes) };
    Ok(())
}

/// Reinterpret the bytes of `value` as a `B`.
///
/// The first `min(size_of::<A>(), size_of::<B>())` bytes are copied; any
/// remaining bytes of the result are zero.
pub fn bitwise_cast<A: PlainData, B: PlainData>(value: A) -> B {
    let mut out = B::zeroed();
    let src = bytemuck::bytes_of(&value);
    let dst = bytemuck::bytes_of_mut(&mut out);
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    out
}

/// Index of the first element equal to `value`.
pub fn find_first<T: PartialEq>(haystack: &[T], value: &T) -> Option<usize> {
    haystack.iter().position(|item| item == value)
}

/// Index of the first element equal to `value`, scanning at most
/// `max_len` elements, or until found when `max_len` is `None`.
///
/// # Safety
///
/// With a bound, `ptr` must be valid for `max_len` elements. Without one,
/// the scan reads past any intended boundary until it finds `value`; the
/// caller guarantees it is present.
pub unsafe fn find_first_raw<T: PartialEq + Copy>(
    ptr: *const T,
    value: T,
    max_len: Option<usize>,
) -> Option<usize> {
    if ptr.is_null() {
        return None;
    }
    let mut index = 0;
    while max_len.is_none_or(|max| index < max) {
        // SAFETY: within the bound, or before the guaranteed match.
        if unsafe { ptr.add(index).read_unaligned() } == value {
            return Some(index);
        }
        index += 1;
    }
    None
}

/// Element-wise equality of the first `len` elements of two pointers.
///
/// Fails with [`MemoryError::InvalidArgument`] when `len` exceeds either
/// pointer's known extent.
pub fn memory_equal<L, R>(left: &L, right: &R, len: usize) -> Result<bool, MemoryError>
where
    L: MemoryBacked,
    R: MemoryBacked<Elem = L::Elem>,
    L::Elem: PlainData + PartialEq,
{
    for size in [left.array_size(), right.array_size()].into_iter().flatten() {
        if len > size {
            return Err(MemoryError::invalid_argument(format!(
                "comparison length {len} exceeds pointer size {size}"
            )));
        }
    }
    if len == 0 {
        return Ok(true);
    }
    if !left.is_valid() || !right.is_valid() {
        return Err(MemoryError::NullDereference);
    }
    let (l, r) = (left.as_ptr(), right.as_ptr());
    Ok((0..len).all(|i| {
        // SAFETY: `len` is within every known extent; unknown extents are
        // the pointer constructor's contract.
        unsafe { l.add(i).read_unaligned() == r.add(i).read_unaligned() }
    }))
}

fn check_writable<P: Pointer>(ptr: &P) -> Result<(), MemoryError> {
    if !ptr.is_valid() {
        Err(MemoryError::NullDereference)
    } else if ptr.is_read_only() {
        Err(MemoryError::ReadOnly)
    } else {
        Ok(())
    }
}
