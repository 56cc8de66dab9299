//! Native library resolution, caching, and function-table binding.
//!
//! A [`LibrarySpec`] names a library generically (`"SDL2"`), with fallback
//! names and dependencies. [`LibraryManager::load`] turns it into a
//! [`Library`]:
//!
//! 1. Dependencies load first, depth-first.
//! 2. Each candidate name goes through the [`Locator`]
//!    (`lib/linux64/SDL2.so` by default) relative to the base directory.
//! 3. A file missing on disk is extracted from the [`ResourceDomain`], if
//!    one is configured.
//! 4. The first file that opens wins and is cached under the generic name.
//!
//! Exports are then bound into tables declared with [`function_table!`].
//! Each slot carries an [`ExternDecl`] policy: alternate export names,
//! `relaxed` (may stay empty), `manual` (left to the caller), and platform
//! or sub-platform gating.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod bind;
pub mod error;
pub mod library;
pub mod locate;
mod macros;
pub mod manager;
pub mod module;
pub mod resource;
pub mod spec;

pub use bind::{bind, BindReport, ExternDecl, FunctionTable, SymbolSource};
pub use error::LoadError;
pub use library::Library;
pub use locate::{default_locator, Locator};
pub use manager::{LibraryManager, LoaderConfig};
pub use module::{Module, ModuleLoader, OpenError, SystemLoader};
pub use resource::{DirectoryResources, ResourceDomain};
pub use spec::LibrarySpec;

#[doc(hidden)]
pub mod __private {
    pub use paste::paste;
}
