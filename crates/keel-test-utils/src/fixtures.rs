//! Exported functions for function-table tests.
//!
//! [`math_exports`] lists them under the names a fake "math" module
//! exports, including one under an alternate name only.

use std::ffi::c_void;

pub extern "C" fn fixture_add(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

pub extern "C" fn fixture_negate(x: i32) -> i32 {
    x.wrapping_neg()
}

pub extern "C" fn fixture_version() -> u32 {
    3
}

/// Exports of the fake math module: `math_add`, `math_version`, and
/// `math_negate_v2` (the only name `negate` is exported under).
pub fn math_exports() -> Vec<(&'static str, *const c_void)> {
    vec![
        ("math_add", fixture_add as *const c_void),
        ("math_version", fixture_version as *const c_void),
        ("math_negate_v2", fixture_negate as *const c_void),
    ]
}
