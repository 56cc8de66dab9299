//! Frame-scoped bump arena for transient native buffers.
//!
//! Each thread lazily owns one [`MemoryStack`]: a fixed-capacity buffer
//! that grows downward from its top, with an explicit stack of saved
//! offsets ("frames"). Allocations are released in bulk when their frame
//! is popped.
//!
//! ```text
//! thread_local CURRENT ── Rc<ThreadStack> ── MemoryStack
//!                              │
//!   push() ──► StackFrame ─────┤  saves offset on entry
//!                              │  restores it on drop
//!   frame.alloc / values / text / text_array ──► BorrowedPtr<'frame, T>
//!   frame.alloc_slice ──► &'frame mut [T]
//! ```
//!
//! Pointers handed out by a frame borrow the [`StackFrame`] guard, so they
//! cannot outlive it. Only the innermost open frame allocates, and a guard
//! dropped out of order defers its pop until the newer frames close.
//! Raw addresses copied out of a view carry no lifetime; using one after
//! its frame closes, or on another thread, is a contract violation.
//!
//! A standalone [`MemoryStack`] allocates through `&self`. Its safe frame
//! is [`MemoryStack::scope`]; the raw [`MemoryStack::pop_frame`] and
//! [`MemoryStack::set_pointer`] are `unsafe`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod local;
pub mod stack;

pub use config::StackConfig;
pub use error::StackError;
pub use local::{current, push, set_thread_config, with_frame, StackFrame, ThreadStack};
pub use stack::MemoryStack;
