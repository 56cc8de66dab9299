//! Core types for the Keel native-interop workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! memory-access error taxonomy shared by the pointer model and the memory
//! stack, and the description of the host platform used by the library
//! loader to pick file names and gate platform-specific exports.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod platform;

pub use error::{ErrorKind, MemoryError};
pub use platform::{Bitness, Platform, PlatformType, SubPlatform};
