//! The downward-growing bump allocator.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ptr::NonNull;

use bytemuck::Zeroable;
use keel_mem::{BorrowedPtr, Encoding, MemoryError, Pointer};
use log::warn;
use smallvec::SmallVec;

use crate::config::StackConfig;
use crate::error::StackError;

/// Alignment of the backing buffer itself.
const BUFFER_ALIGN: usize = 16;

/// A fixed-capacity buffer allocated from the top down, released in LIFO
/// frames.
///
/// The stack pointer starts at `capacity` and only moves down on
/// allocation. [`push_frame`](Self::push_frame) saves it and
/// [`pop_frame`](Self::pop_frame) restores it. Typed allocations are
/// zeroed; [`values`](Self::values) and the text methods overwrite their
/// region in full.
///
/// Allocation methods take `&self` so that pointers from several
/// allocations can be held at once; each pointer borrows the stack and the
/// regions never overlap. Moving the stack pointer back up is what frees
/// memory, so [`pop_frame`](Self::pop_frame) and
/// [`set_pointer`](Self::set_pointer) are `unsafe`; [`scope`](Self::scope)
/// is the safe way to run a balanced frame. The stack is neither `Send`
/// nor `Sync`.
pub struct MemoryStack {
    base: NonNull<u8>,
    layout: Option<Layout>,
    capacity: usize,
    default_alignment: usize,
    offset: Cell<usize>,
    frames: RefCell<SmallVec<[usize; 8]>>,
}

impl MemoryStack {
    /// Allocates the backing buffer.
    pub fn new(config: &StackConfig) -> Result<Self, StackError> {
        config.validate()?;
        let capacity = config.capacity;
        let (base, layout) = if capacity == 0 {
            (NonNull::dangling(), None)
        } else {
            let align = BUFFER_ALIGN.max(config.default_alignment);
            let layout = Layout::from_size_align(capacity, align).map_err(|_| {
                StackError::InvalidAlignment {
                    alignment: config.default_alignment,
                }
            })?;
            // SAFETY: the layout has non-zero size.
            let raw = unsafe { alloc::alloc(layout) };
            let base = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
            (base, Some(layout))
        };
        Ok(Self {
            base,
            layout,
            capacity,
            default_alignment: config.default_alignment,
            offset: Cell::new(capacity),
            frames: RefCell::new(SmallVec::new()),
        })
    }

    /// Saves the stack pointer.
    pub fn push_frame(&self) {
        self.frames.borrow_mut().push(self.offset.get());
    }

    /// Restores the most recently saved stack pointer.
    ///
    /// # Safety
    ///
    /// Every pointer and slice allocated since the matching
    /// [`push_frame`](Self::push_frame) must be dead: their memory is handed
    /// out again by the next allocation.
    pub unsafe fn pop_frame(&self) -> Result<(), StackError> {
        let saved = self.frames.borrow_mut().pop().ok_or(StackError::FrameUnderflow)?;
        self.offset.set(saved);
        Ok(())
    }

    /// Runs `f` inside a frame that is popped when `f` returns.
    ///
    /// Taking `&mut self` guarantees no allocation from outside the frame
    /// is alive, and nothing `f` allocates can escape it.
    pub fn scope<R>(&mut self, f: impl FnOnce(&MemoryStack) -> R) -> R {
        self.push_frame();
        let result = f(self);
        // SAFETY: every allocation made in `f` borrows the `&MemoryStack`
        // it was given, which ends when `f` returns.
        if let Err(e) = unsafe { self.pop_frame() } {
            warn!("memory stack scope lost its frame: {e}");
        }
        result
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Start of the backing buffer.
    pub fn base(&self) -> *const u8 {
        self.base.as_ptr()
    }

    /// Current stack pointer, as an offset from [`base`](Self::base).
    pub fn pointer(&self) -> usize {
        self.offset.get()
    }

    /// Moves the stack pointer. Fails beyond the buffer.
    ///
    /// # Safety
    ///
    /// No live pointer or slice from this stack may address memory below
    /// `offset`.
    pub unsafe fn set_pointer(&self, offset: usize) -> Result<(), StackError> {
        if offset > self.capacity {
            return Err(StackError::InvalidPointer {
                offset,
                capacity: self.capacity,
            });
        }
        self.offset.set(offset);
        Ok(())
    }

    /// Size of the backing buffer in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently allocated.
    pub fn used(&self) -> usize {
        self.capacity - self.offset.get()
    }

    /// Reserves `count` zeroed elements of `T` at the default alignment,
    /// or at `T`'s own alignment when that is stricter.
    pub fn alloc<T: Zeroable>(&self, count: usize) -> Result<BorrowedPtr<'_, T>, StackError> {
        self.alloc_aligned(count, self.default_alignment)
    }

    /// Reserves `count` zeroed elements of `T` at `alignment` (raised to
    /// `T`'s alignment if lower).
    ///
    /// A zero-sized request moves nothing and returns a null pointer with
    /// a known count of zero.
    pub fn alloc_aligned<T: Zeroable>(
        &self,
        count: usize,
        alignment: usize,
    ) -> Result<BorrowedPtr<'_, T>, StackError> {
        let Some(ptr) = self.reserve_zeroed::<T>(count, alignment)? else {
            // SAFETY: a null view with a zero extent is never dereferenced.
            return Ok(unsafe { BorrowedPtr::from_raw(std::ptr::null_mut(), Some(0)) });
        };
        // SAFETY: `reserve_zeroed` returned a fresh, aligned, zeroed region
        // of `count` elements that is not handed out again until the
        // enclosing frame is popped.
        Ok(unsafe { BorrowedPtr::from_raw(ptr.as_ptr(), Some(count)) })
    }

    /// Reserves `count` zeroed elements of `T` as a host slice.
    pub fn alloc_slice<T: Zeroable>(&self, count: usize) -> Result<&mut [T], StackError> {
        match self.reserve_zeroed::<T>(count, self.default_alignment)? {
            // SAFETY: as for `alloc_aligned`; the region is exclusively this
            // slice's until the frame is popped, and zero is a valid `T`.
            Some(ptr) => Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), count) }),
            None => Ok(Default::default()),
        }
    }

    /// Reserves room for `values` and copies them in.
    pub fn values<T: Copy>(&self, values: &[T]) -> Result<BorrowedPtr<'_, T>, StackError> {
        let Some(dst) = self.reserve::<T>(values.len(), self.default_alignment)? else {
            // SAFETY: as in `alloc_aligned`.
            return Ok(unsafe { BorrowedPtr::from_raw(std::ptr::null_mut(), Some(0)) });
        };
        // SAFETY: `dst` was just reserved for `values.len()` aligned `T`s
        // and cannot overlap a host slice. Every element is written before
        // the view is handed out.
        unsafe {
            std::ptr::copy_nonoverlapping(values.as_ptr(), dst.as_ptr(), values.len());
            Ok(BorrowedPtr::from_raw(dst.as_ptr(), Some(values.len())))
        }
    }

    /// Collects `values` and copies them in.
    pub fn values_iter<T, I>(&self, values: I) -> Result<BorrowedPtr<'_, T>, StackError>
    where
        T: Copy,
        I: IntoIterator<Item = T>,
    {
        let staged: SmallVec<[T; 16]> = values.into_iter().collect();
        self.values(&staged)
    }

    /// Encodes `text` with a zero terminator and copies it in.
    pub fn text(&self, text: &str, encoding: Encoding) -> Result<BorrowedPtr<'_, u8>, StackError> {
        let bytes = encoding.encode_terminated(text);
        self.values(&bytes)
    }

    /// Encodes each string as by [`text`](Self::text), then allocates the
    /// array of their addresses in input order.
    pub fn text_array<S: AsRef<str>>(
        &self,
        texts: &[S],
        encoding: Encoding,
    ) -> Result<BorrowedPtr<'_, *const u8>, StackError> {
        let mut addrs: SmallVec<[*const u8; 16]> = SmallVec::with_capacity(texts.len());
        for text in texts {
            addrs.push(self.text(text.as_ref(), encoding)?.as_ptr());
        }
        self.values(&addrs)
    }

    /// Encodes each string as by [`text`](Self::text) and writes their
    /// addresses into the front of `out`, returning the filled prefix.
    ///
    /// Fails with an invalid-argument error before allocating anything if
    /// `out` is shorter than `texts`. The addresses are valid until the
    /// enclosing frame is popped.
    pub fn text_pointers_into<'o, S: AsRef<str>>(
        &self,
        texts: &[S],
        encoding: Encoding,
        out: &'o mut [*const u8],
    ) -> Result<&'o mut [*const u8], StackError> {
        if out.len() < texts.len() {
            return Err(MemoryError::invalid_argument(format!(
                "{} strings do not fit in {} pointer slots",
                texts.len(),
                out.len()
            ))
            .into());
        }
        let filled = &mut out[..texts.len()];
        for (slot, text) in filled.iter_mut().zip(texts) {
            *slot = self.text(text.as_ref(), encoding)?.as_ptr();
        }
        Ok(filled)
    }

    /// Moves the stack pointer down for `count` elements of `T`. `None`
    /// for a zero-byte request, which moves nothing.
    fn reserve<T>(&self, count: usize, alignment: usize) -> Result<Option<NonNull<T>>, StackError> {
        if !alignment.is_power_of_two() {
            return Err(StackError::InvalidAlignment { alignment });
        }
        let alignment = alignment.max(std::mem::align_of::<T>());
        let available = self.offset.get();
        let requested = count.checked_mul(std::mem::size_of::<T>()).ok_or(
            StackError::CapacityExceeded {
                requested: usize::MAX,
                available,
            },
        )?;
        if requested == 0 {
            return Ok(None);
        }
        let exhausted = StackError::CapacityExceeded {
            requested,
            available,
        };
        let unaligned = available.checked_sub(requested).ok_or(exhausted.clone())?;
        let padding = (self.base.as_ptr() as usize).wrapping_add(unaligned) % alignment;
        let offset = unaligned.checked_sub(padding).ok_or(exhausted)?;
        self.offset.set(offset);
        // SAFETY: `offset + requested <= capacity`, so the region lies
        // inside the buffer and is aligned for `T`.
        let ptr = unsafe { self.base.as_ptr().add(offset) }.cast::<T>();
        Ok(NonNull::new(ptr))
    }

    fn reserve_zeroed<T: Zeroable>(
        &self,
        count: usize,
        alignment: usize,
    ) -> Result<Option<NonNull<T>>, StackError> {
        let reserved = self.reserve::<T>(count, alignment)?;
        if let Some(ptr) = reserved {
            // SAFETY: the region was just reserved for `count` elements.
            unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, count) };
        }
        Ok(reserved)
    }
}

impl Drop for MemoryStack {
    fn drop(&mut self) {
        if let Some(layout) = self.layout {
            // SAFETY: allocated in `new` with this layout.
            unsafe { alloc::dealloc(self.base.as_ptr(), layout) };
        }
    }
}

impl fmt::Debug for MemoryStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStack")
            .field("capacity", &self.capacity)
            .field("pointer", &self.offset.get())
            .field("depth", &self.depth())
            .finish()
    }
}
