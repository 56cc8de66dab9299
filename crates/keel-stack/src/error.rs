//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use keel_core::{ErrorKind, MemoryError};

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackError {
    /// The allocation does not fit below the current stack pointer.
    CapacityExceeded {
        /// Bytes requested, before alignment padding.
        requested: usize,
        /// Bytes free below the stack pointer.
        available: usize,
    },
    /// `pop_frame` with no open frame.
    FrameUnderflow,
    /// An alignment that is not a power of two.
    InvalidAlignment {
        /// The rejected alignment.
        alignment: usize,
    },
    /// `set_pointer` beyond the buffer.
    InvalidPointer {
        /// The rejected offset.
        offset: usize,
        /// The buffer size.
        capacity: usize,
    },
    /// The thread's arena already exists, so its configuration is fixed.
    AlreadyInitialized,
    /// Allocation through a frame guard while a newer frame is open.
    InactiveFrame {
        /// Depth of the guard's own frame.
        depth: usize,
        /// Depth of the innermost open frame.
        top: usize,
    },
    /// Encoding or copying into the allocation failed.
    Memory(MemoryError),
}

impl StackError {
    /// The coarse class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CapacityExceeded { .. } => ErrorKind::OutOfRange,
            Self::FrameUnderflow | Self::AlreadyInitialized | Self::InactiveFrame { .. } => {
                ErrorKind::InvalidOperation
            }
            Self::InvalidAlignment { .. } | Self::InvalidPointer { .. } => {
                ErrorKind::ArgumentValidity
            }
            Self::Memory(e) => e.kind(),
        }
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                available,
            } => {
                write!(
                    f,
                    "memory stack exhausted: requested {requested} bytes, \
                     {available} bytes available"
                )
            }
            Self::FrameUnderflow => write!(f, "pop_frame called with no open frame"),
            Self::InvalidAlignment { alignment } => {
                write!(f, "alignment {alignment} is not a power of two")
            }
            Self::InvalidPointer { offset, capacity } => {
                write!(f, "stack pointer {offset} is outside a {capacity}-byte buffer")
            }
            Self::AlreadyInitialized => {
                write!(f, "memory stack for this thread is already initialized")
            }
            Self::InactiveFrame { depth, top } => {
                write!(f, "frame at depth {depth} cannot allocate under open frame {top}")
            }
            Self::Memory(e) => write!(f, "{e}"),
        }
    }
}

impl Error for StackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Memory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MemoryError> for StackError {
    fn from(e: MemoryError) -> Self {
        Self::Memory(e)
    }
}
