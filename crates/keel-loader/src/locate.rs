//! Mapping generic library names to platform file paths.

use std::path::PathBuf;
use std::sync::Arc;

use keel_core::Platform;

/// A pure function from a host description and a generic name to a path,
/// relative to the loader's base directory.
pub type Locator = Arc<dyn Fn(&Platform, &str) -> PathBuf + Send + Sync>;

/// `lib/<platform><bits>/<name>.<ext>`, e.g. `lib/linux64/SDL2.so`.
///
/// On an unknown platform the name is placed directly under `lib/` with
/// no extension.
pub fn default_locator(platform: &Platform, name: &str) -> PathBuf {
    let mut path = PathBuf::from("lib");
    if let Some(dir) = platform.platform_type.directory_name() {
        path.push(format!("{dir}{}", platform.bitness.bits()));
    }
    match platform.platform_type.library_extension() {
        Some(ext) => path.push(format!("{name}.{ext}")),
        None => path.push(name),
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{Bitness, PlatformType};

    #[test]
    fn layout_per_platform() {
        let cases = [
            (PlatformType::Windows, Bitness::Bits64, "lib/win64/zstd.dll"),
            (PlatformType::Windows, Bitness::Bits32, "lib/win32/zstd.dll"),
            (PlatformType::Linux, Bitness::Bits64, "lib/linux64/zstd.so"),
            (PlatformType::MacOs, Bitness::Bits64, "lib/macosx64/zstd.dylib"),
            (PlatformType::Unknown, Bitness::Bits64, "lib/zstd"),
        ];
        for (os, bits, expected) in cases {
            let path = default_locator(&Platform::new(os, bits), "zstd");
            let expected: PathBuf = expected.split('/').collect();
            assert_eq!(path, expected);
        }
    }
}
