//! Keel: typed native pointers, a thread-local memory stack, and a native
//! library loader.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Keel sub-crates. For most users, adding `keel` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use keel::prelude::*;
//! use keel::mem::text;
//!
//! // An owned buffer released exactly once, on drop.
//! let mut buf = OwnedPtr::<u32>::zeroed(4);
//! buf.set(2, 7).unwrap();
//! assert_eq!(buf.get(2), Ok(7));
//! assert!(buf.get(4).is_err());
//!
//! // Transient strings on the calling thread's memory stack.
//! let decoded = keel::stack::with_frame(|frame| {
//!     let s = frame.text("héllo", Encoding::Utf8).unwrap();
//!     text::decode(&s, Encoding::Utf8, -1, true)
//! })
//! .unwrap();
//! assert_eq!(decoded.as_deref(), Some("héllo"));
//!
//! // Null pointers fail every access.
//! let null = NullPtr::<u8>::new();
//! assert_eq!(null.value().unwrap_err().kind(), ErrorKind::NullDereference);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `keel-core` | Error taxonomy, platform description |
//! | [`mem`] | `keel-mem` | Pointer variants, memory utilities, text codecs |
//! | [`stack`] | `keel-stack` | Thread-local bump arena and frames |
//! | [`loader`] | `keel-loader` | Library resolution, caching, function tables |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Error kinds and the host platform description (`keel-core`).
pub use keel_core as types;

/// Pointer variants and memory utilities (`keel-mem`).
///
/// [`mem::OwnedPtr`], [`mem::BorrowedPtr`], [`mem::ObjectPtr`] and
/// [`mem::NullPtr`] are also available in the [`prelude`]; the byte-level
/// helpers live in [`mem::util`] and [`mem::text`].
pub use keel_mem as mem;

/// The per-thread memory stack (`keel-stack`).
///
/// [`stack::push`] and [`stack::with_frame`] open a frame on the calling
/// thread's arena, creating it on first use.
pub use keel_stack as stack;

/// Native library loading (`keel-loader`).
///
/// Resolve libraries with [`loader::LibraryManager`] and bind exports
/// into tables declared with [`loader::function_table!`].
pub use keel_loader as loader;

pub use keel_loader::function_table;

/// Common imports for typical Keel usage.
///
/// ```rust
/// use keel::prelude::*;
/// ```
pub mod prelude {
    // Errors and platform
    pub use keel_core::{ErrorKind, MemoryError, Platform, PlatformType};

    // Pointers
    pub use keel_mem::{
        BorrowedPtr, ByteView, Encoding, NativePtr, NullPtr, ObjectPtr, OwnedPtr, PlainData,
        Pointer, ReadPointer, Release, WritePointer,
    };

    // Memory stack
    pub use keel_stack::{MemoryStack, StackConfig, StackError, StackFrame, ThreadStack};

    // Loader
    pub use keel_loader::{
        FunctionTable, Library, LibraryManager, LibrarySpec, LoadError, LoaderConfig,
    };
}
