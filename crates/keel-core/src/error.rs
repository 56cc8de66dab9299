//! Error types for native memory access.
//!
//! [`MemoryError`] covers every failure the pointer model and the memory
//! utilities can raise. Each variant maps onto one of the coarse
//! [`ErrorKind`] classes so callers can react to the class without
//! matching on payloads.

use std::error::Error;
use std::fmt;

/// Coarse classification of interop failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Access through a null pointer.
    NullDereference,
    /// Index outside a known extent, or an allocation past capacity.
    OutOfRange,
    /// The operation is not permitted on this pointer or element type.
    InvalidOperation,
    /// An argument cannot be honoured (buffer too small, bad type, ...).
    ArgumentValidity,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullDereference => write!(f, "null dereference"),
            Self::OutOfRange => write!(f, "out of range"),
            Self::InvalidOperation => write!(f, "invalid operation"),
            Self::ArgumentValidity => write!(f, "invalid argument"),
        }
    }
}

/// Errors raised when reading, writing, or reinterpreting native memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryError {
    /// A value or indexed access went through a null address.
    NullDereference,
    /// Indexed access beyond the pointer's known element count.
    OutOfRange {
        /// The requested element index.
        index: usize,
        /// The known element count.
        len: usize,
    },
    /// Write through a pointer that was created read-only.
    ReadOnly,
    /// A byte view was requested for an opaque object handle.
    OpaqueMemory,
    /// A caller-supplied argument cannot be honoured.
    InvalidArgument {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// A pinned-object handle that was released or never issued.
    StaleHandle {
        /// The raw handle value.
        handle: usize,
    },
    /// A fill or copy needed an element count but neither the caller nor
    /// the pointer supplied one, or the extent in bytes overflows.
    UnknownLength,
}

impl MemoryError {
    /// Shorthand for [`MemoryError::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// The coarse class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NullDereference => ErrorKind::NullDereference,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::ReadOnly | Self::OpaqueMemory | Self::StaleHandle { .. } => {
                ErrorKind::InvalidOperation
            }
            Self::InvalidArgument { .. } | Self::UnknownLength => ErrorKind::ArgumentValidity,
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullDereference => write!(f, "dereference of null pointer"),
            Self::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for pointer of {len} elements")
            }
            Self::ReadOnly => write!(f, "cannot write through read-only pointer"),
            Self::OpaqueMemory => write!(f, "object handle memory is opaque"),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::StaleHandle { handle } => {
                write!(f, "object handle {handle:#x} is stale or was never issued")
            }
            Self::UnknownLength => {
                write!(f, "no explicit or known element count for pointer")
            }
        }
    }
}

impl Error for MemoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_is_invalid_operation() {
        assert_eq!(MemoryError::ReadOnly.kind(), ErrorKind::InvalidOperation);
        assert_eq!(MemoryError::OpaqueMemory.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn out_of_range_display_names_index_and_len() {
        let e = MemoryError::OutOfRange { index: 7, len: 4 };
        assert_eq!(e.kind(), ErrorKind::OutOfRange);
        assert_eq!(
            e.to_string(),
            "index 7 out of range for pointer of 4 elements"
        );
    }

    #[test]
    fn invalid_argument_shorthand() {
        let e = MemoryError::invalid_argument("no room for terminator");
        assert_eq!(e.kind(), ErrorKind::ArgumentValidity);
        assert!(e.to_string().contains("no room for terminator"));
    }
}
