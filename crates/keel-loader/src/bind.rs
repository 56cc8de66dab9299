//! Binding function tables from a declarative list of exports.
//!
//! A [`FunctionTable`] is a struct of optional function pointers plus a
//! constant list of [`ExternDecl`]s, one per slot. [`bind`] walks the
//! list in order: skip manual and platform-gated slots, try the export
//! name and then each alternate, and either fill the slot, leave a relaxed
//! slot empty, or fail the whole table.
//!
//! Tables are normally generated with [`function_table!`](crate::function_table).

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::ptr::NonNull;

use keel_core::{Platform, PlatformType, SubPlatform};
use log::{debug, trace};

use crate::error::LoadError;

/// Binding policy for one function-table slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExternDecl {
    /// Slot name, also the primary export name.
    pub name: &'static str,
    /// Export names tried in order when `name` is absent.
    pub alt_names: &'static [&'static str],
    /// Leave the slot empty instead of failing when no export is found.
    pub relaxed: bool,
    /// The caller fills the slot itself; the binder never touches it.
    pub manual: bool,
    /// Only bind on this platform family.
    pub platform: Option<PlatformType>,
    /// Only bind on this sub-platform.
    pub sub_platform: Option<SubPlatform>,
}

impl ExternDecl {
    /// A required slot bound from the export of the same name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            alt_names: &[],
            relaxed: false,
            manual: false,
            platform: None,
            sub_platform: None,
        }
    }

    /// Export names to try after `name`.
    pub const fn alt_names(mut self, names: &'static [&'static str]) -> Self {
        self.alt_names = names;
        self
    }

    /// Tolerate a missing export.
    pub const fn relaxed(mut self) -> Self {
        self.relaxed = true;
        self
    }

    /// Leave the slot to the caller.
    pub const fn manual(mut self) -> Self {
        self.manual = true;
        self
    }

    /// Restrict to a platform family.
    pub const fn platform(mut self, platform: PlatformType) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Restrict to a sub-platform.
    pub const fn sub_platform(mut self, sub_platform: SubPlatform) -> Self {
        self.sub_platform = Some(sub_platform);
        self
    }

    /// Whether the binder should look this slot up on `host`.
    pub fn applies_to(&self, host: &Platform) -> bool {
        !self.manual && host.matches(self.platform, self.sub_platform)
    }

    /// The export name followed by the alternates.
    pub fn export_names(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.alt_names.iter().copied())
    }
}

/// Anything that resolves export names to addresses.
pub trait SymbolSource {
    /// Address of export `name`, or `None`.
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>>;
}

impl<F> SymbolSource for F
where
    F: Fn(&str) -> Option<NonNull<c_void>>,
{
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        self(name)
    }
}

/// A record of function-pointer slots with one declaration per slot.
pub trait FunctionTable {
    /// Table name, used in errors.
    const NAME: &'static str;

    /// One entry per slot, in binding order.
    const DECLARATIONS: &'static [ExternDecl];

    /// Store `address` in the slot named `field`, or clear it on `None`.
    /// Returns `false` if there is no such slot.
    ///
    /// # Safety
    ///
    /// `address` must point to a function whose ABI and signature match
    /// the slot's declared type.
    unsafe fn set_slot(&mut self, field: &str, address: Option<NonNull<c_void>>) -> bool;
}

/// Outcome of a successful [`bind`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Slots that received an address.
    pub bound: Vec<&'static str>,
    /// Relaxed slots left empty because no export was found.
    pub unbound: Vec<&'static str>,
    /// Manual or platform-gated slots that were not looked up.
    pub skipped: Vec<&'static str>,
}

impl BindReport {
    /// `true` when every looked-up slot was bound.
    pub fn is_complete(&self) -> bool {
        self.unbound.is_empty()
    }
}

/// Fill every applicable slot of `table` from `symbols`.
///
/// Fails with [`LoadError::MissingFunction`] on the first required slot
/// with no export, and with [`LoadError::UnknownSlot`] when a declaration
/// names a field `set_slot` does not recognise. Slots bound before the failure keep their values; a
/// table whose bind failed should not be used.
///
/// # Safety
///
/// Every export found must match the signature declared for its slot.
pub unsafe fn bind<T, S>(
    table: &mut T,
    symbols: &S,
    host: &Platform,
) -> Result<BindReport, LoadError>
where
    T: FunctionTable,
    S: SymbolSource + ?Sized,
{
    let mut report = BindReport::default();
    for decl in T::DECLARATIONS {
        if !decl.applies_to(host) {
            trace!("{}: skipping {}", T::NAME, decl.name);
            report.skipped.push(decl.name);
            continue;
        }
        let address = decl.export_names().find_map(|name| symbols.symbol(name));
        if address.is_none() && !decl.relaxed {
            return Err(LoadError::MissingFunction {
                table: T::NAME,
                function: decl.name,
            });
        }
        // SAFETY: forwarded from the caller.
        if !unsafe { table.set_slot(decl.name, address) } {
            return Err(LoadError::UnknownSlot {
                table: T::NAME,
                function: decl.name,
            });
        }
        if address.is_some() {
            report.bound.push(decl.name);
        } else {
            debug!("{}: relaxed function {} left unbound", T::NAME, decl.name);
            report.unbound.push(decl.name);
        }
    }
    Ok(report)
}
