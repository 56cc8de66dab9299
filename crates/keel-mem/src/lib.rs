//! Native pointer model and memory utilities.
//!
//! Pointers into native memory come in a small closed set of variants,
//! all behind the [`Pointer`], [`ReadPointer`], [`WritePointer`] and
//! [`ByteView`] traits:
//!
//! ```text
//! Pointer (address, known extent, read-only flag)
//! ├── OwnedPtr<T>     owns an allocation, runs its Release exactly once
//! ├── BorrowedPtr<T>  non-owning view into memory owned elsewhere
//! ├── ObjectPtr<T>    opaque handle to a pinned host object
//! └── NullPtr<T>      zero address, every access fails
//! ```
//!
//! [`NativePtr`] is the tagged sum of the memory-backed variants for
//! call sites that accept "any pointer".
//!
//! The free functions in [`util`] and [`text`] copy, search, reinterpret
//! and transcode raw byte ranges.
//!
//! # Unsafe code
//!
//! This crate is one of two (with `keel-stack`) that may contain `unsafe`
//! code. Every block carries a `// SAFETY:` comment. Constructing a
//! pointer from a raw address is `unsafe`; once constructed, accesses
//! are bounds-checked whenever the extent is known. Byte views exist only
//! over [`PlainData`] elements, and a writable view is never reachable
//! from two live handles at once.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod borrowed;
mod handle;
pub mod native;
pub mod null;
pub mod object;
pub mod owned;
pub mod plain;
pub mod pointer;
pub mod release;
pub mod text;
pub mod util;

pub use borrowed::BorrowedPtr;
pub use keel_core::{ErrorKind, MemoryError};
pub use native::NativePtr;
pub use null::NullPtr;
pub use object::ObjectPtr;
pub use owned::OwnedPtr;
pub use plain::PlainData;
pub use pointer::{ByteView, MemoryBacked, Pointer, ReadPointer, WritePointer, UNKNOWN_SIZE};
pub use release::Release;
pub use text::Encoding;
