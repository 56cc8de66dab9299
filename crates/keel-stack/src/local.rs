//! The per-thread arena and its scoped frame guard.

#![allow(unsafe_code)]

use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use bytemuck::Zeroable;
use keel_mem::{BorrowedPtr, Encoding};
use log::{trace, warn};
use smallvec::SmallVec;

use crate::config::StackConfig;
use crate::error::StackError;
use crate::stack::MemoryStack;

thread_local! {
    static CONFIG: RefCell<StackConfig> = RefCell::new(StackConfig::default());
    static CURRENT: OnceCell<Rc<ThreadStack>> = const { OnceCell::new() };
}

/// Sets the configuration this thread's arena will be created with.
///
/// Fails with [`StackError::AlreadyInitialized`] once the arena exists.
pub fn set_thread_config(config: StackConfig) -> Result<(), StackError> {
    config.validate()?;
    if CURRENT.with(|cell| cell.get().is_some()) {
        return Err(StackError::AlreadyInitialized);
    }
    CONFIG.with(|c| *c.borrow_mut() = config);
    Ok(())
}

/// This thread's arena, created on first call.
pub fn current() -> Result<Rc<ThreadStack>, StackError> {
    CURRENT.with(|cell| {
        if let Some(stack) = cell.get() {
            return Ok(Rc::clone(stack));
        }
        let config = CONFIG.with(|c| c.borrow().clone());
        let stack = Rc::new(ThreadStack {
            stack: MemoryStack::new(&config)?,
            closed: RefCell::new(SmallVec::new()),
        });
        trace!(
            "created {}-byte memory stack for {:?}",
            config.capacity,
            std::thread::current().id()
        );
        Ok(Rc::clone(cell.get_or_init(|| stack)))
    })
}

/// Opens a frame on this thread's arena.
///
/// The frame is popped when the returned guard drops, including on early
/// return through `?`.
pub fn push() -> Result<StackFrame, StackError> {
    let stack = current()?;
    stack.stack.push_frame();
    stack.closed.borrow_mut().push(false);
    let depth = stack.depth();
    Ok(StackFrame { stack, depth })
}

/// Runs `f` inside a fresh frame.
pub fn with_frame<R>(f: impl FnOnce(&StackFrame) -> R) -> Result<R, StackError> {
    let frame = push()?;
    Ok(f(&frame))
}

/// A thread's arena seen from outside its frames.
///
/// Only reports state: memory is allocated through a [`StackFrame`], and
/// frames are popped only by their guards.
#[derive(Debug)]
pub struct ThreadStack {
    stack: MemoryStack,
    // One flag per open frame, set once its guard drops.
    closed: RefCell<SmallVec<[bool; 8]>>,
}

impl ThreadStack {
    /// Start of the backing buffer.
    pub fn base(&self) -> *const u8 {
        self.stack.base()
    }

    /// Current stack pointer, as an offset from [`base`](Self::base).
    pub fn pointer(&self) -> usize {
        self.stack.pointer()
    }

    /// Number of open frames, counting frames whose guard dropped while a
    /// newer frame was still open.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Size of the backing buffer in bytes.
    pub fn capacity(&self) -> usize {
        self.stack.capacity()
    }

    /// Bytes currently allocated.
    pub fn used(&self) -> usize {
        self.stack.used()
    }
}

/// An open frame on the thread's arena. Pops exactly one frame on drop.
///
/// Pointers allocated through the guard borrow it and cannot outlive it.
/// Only the innermost open frame allocates; an outer guard fails with
/// [`StackError::InactiveFrame`] until the inner ones drop. A guard
/// dropped out of order leaves its frame in place until every newer frame
/// has closed, so memory still referenced by a newer guard is never
/// reused.
#[derive(Debug)]
pub struct StackFrame {
    stack: Rc<ThreadStack>,
    depth: usize,
}

impl StackFrame {
    /// The arena this frame lives on.
    pub fn stack(&self) -> &ThreadStack {
        &self.stack
    }

    /// Depth of this frame, 1 for the outermost.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether this is the innermost open frame.
    pub fn is_current(&self) -> bool {
        self.stack.depth() == self.depth
    }

    fn active(&self) -> Result<&MemoryStack, StackError> {
        let top = self.stack.depth();
        if top == self.depth {
            Ok(&self.stack.stack)
        } else {
            Err(StackError::InactiveFrame {
                depth: self.depth,
                top,
            })
        }
    }

    /// See [`MemoryStack::alloc`].
    pub fn alloc<T: Zeroable>(&self, count: usize) -> Result<BorrowedPtr<'_, T>, StackError> {
        self.active()?.alloc(count)
    }

    /// See [`MemoryStack::alloc_aligned`].
    pub fn alloc_aligned<T: Zeroable>(
        &self,
        count: usize,
        alignment: usize,
    ) -> Result<BorrowedPtr<'_, T>, StackError> {
        self.active()?.alloc_aligned(count, alignment)
    }

    /// See [`MemoryStack::alloc_slice`].
    pub fn alloc_slice<T: Zeroable>(&self, count: usize) -> Result<&mut [T], StackError> {
        self.active()?.alloc_slice(count)
    }

    /// See [`MemoryStack::values`].
    pub fn values<T: Copy>(&self, values: &[T]) -> Result<BorrowedPtr<'_, T>, StackError> {
        self.active()?.values(values)
    }

    /// See [`MemoryStack::values_iter`].
    pub fn values_iter<T, I>(&self, values: I) -> Result<BorrowedPtr<'_, T>, StackError>
    where
        T: Copy,
        I: IntoIterator<Item = T>,
    {
        self.active()?.values_iter(values)
    }

    /// See [`MemoryStack::text`].
    pub fn text(&self, text: &str, encoding: Encoding) -> Result<BorrowedPtr<'_, u8>, StackError> {
        self.active()?.text(text, encoding)
    }

    /// See [`MemoryStack::text_array`].
    pub fn text_array<S: AsRef<str>>(
        &self,
        texts: &[S],
        encoding: Encoding,
    ) -> Result<BorrowedPtr<'_, *const u8>, StackError> {
        self.active()?.text_array(texts, encoding)
    }

    /// See [`MemoryStack::text_pointers_into`]. The addresses stay valid
    /// while this guard lives.
    pub fn text_pointers_into<'o, S: AsRef<str>>(
        &self,
        texts: &[S],
        encoding: Encoding,
        out: &'o mut [*const u8],
    ) -> Result<&'o mut [*const u8], StackError> {
        self.active()?.text_pointers_into(texts, encoding, out)
    }
}

impl Drop for StackFrame {
    fn drop(&mut self) {
        let mut closed = self.stack.closed.borrow_mut();
        match closed.get_mut(self.depth - 1) {
            Some(flag) => *flag = true,
            None => {
                warn!("frame guard at depth {} has no frame to close", self.depth);
                return;
            }
        }
        if closed.len() > self.depth {
            warn!(
                "frame at depth {} closed under {} open frames; pop deferred",
                self.depth,
                closed.len()
            );
        }
        while closed.last() == Some(&true) {
            closed.pop();
            // SAFETY: only the innermost frame allocates, and the guards of
            // this frame and every newer one have dropped, so nothing
            // allocated since this frame was pushed is still borrowed.
            if let Err(e) = unsafe { self.stack.stack.pop_frame() } {
                warn!("frame guard dropped on unbalanced memory stack: {e}");
                break;
            }
        }
    }
}
