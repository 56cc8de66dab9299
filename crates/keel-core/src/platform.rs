//! Description of the host platform.
//!
//! The loader uses [`Platform`] to compute conventional library paths
//! (`lib/<platform><bits>/<name>.<ext>`) and to skip exports that are
//! declared for a different operating system or sub-platform.

use std::fmt;

/// Operating system family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlatformType {
    /// Microsoft Windows.
    Windows,
    /// Linux, including Android.
    Linux,
    /// macOS, including iOS.
    MacOs,
    /// Anything else. No library directory or extension is known.
    Unknown,
}

impl PlatformType {
    /// The platform family this binary was compiled for.
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(any(target_os = "linux", target_os = "android")) {
            Self::Linux
        } else if cfg!(any(target_os = "macos", target_os = "ios")) {
            Self::MacOs
        } else {
            Self::Unknown
        }
    }

    /// Directory stem used by the default library layout.
    pub const fn directory_name(self) -> Option<&'static str> {
        match self {
            Self::Windows => Some("win"),
            Self::Linux => Some("linux"),
            Self::MacOs => Some("macosx"),
            Self::Unknown => None,
        }
    }

    /// File extension of shared libraries, without the leading dot.
    pub const fn library_extension(self) -> Option<&'static str> {
        match self {
            Self::Windows => Some("dll"),
            Self::Linux => Some("so"),
            Self::MacOs => Some("dylib"),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "macos"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A specialisation of a [`PlatformType`] with its own export surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubPlatform {
    /// Android on a Linux kernel.
    Android,
    /// iOS on a Darwin kernel.
    Ios,
}

impl SubPlatform {
    /// The sub-platform this binary was compiled for, if any.
    pub const fn current() -> Option<Self> {
        if cfg!(target_os = "android") {
            Some(Self::Android)
        } else if cfg!(target_os = "ios") {
            Some(Self::Ios)
        } else {
            None
        }
    }
}

/// Native pointer width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bitness {
    /// 32-bit address space.
    Bits32,
    /// 64-bit address space.
    Bits64,
}

impl Bitness {
    /// Pointer width of the running binary.
    pub const fn current() -> Self {
        if cfg!(target_pointer_width = "64") {
            Self::Bits64
        } else {
            Self::Bits32
        }
    }

    /// `32` or `64`.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }
}

/// Full description of a host: OS family, optional sub-platform, and
/// pointer width.
///
/// [`Platform::current`] describes the running process; tests construct
/// other platforms explicitly to exercise path computation and export
/// gating for hosts they are not running on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system family.
    pub platform_type: PlatformType,
    /// Sub-platform, when the OS family has one.
    pub sub_platform: Option<SubPlatform>,
    /// Pointer width.
    pub bitness: Bitness,
}

impl Platform {
    /// The running host.
    pub const fn current() -> Self {
        Self {
            platform_type: PlatformType::current(),
            sub_platform: SubPlatform::current(),
            bitness: Bitness::current(),
        }
    }

    /// A platform with no sub-platform.
    pub const fn new(platform_type: PlatformType, bitness: Bitness) -> Self {
        Self {
            platform_type,
            sub_platform: None,
            bitness,
        }
    }

    /// Same platform, tagged with a sub-platform.
    pub const fn with_sub_platform(mut self, sub_platform: SubPlatform) -> Self {
        self.sub_platform = Some(sub_platform);
        self
    }

    /// Whether this host matches an optional platform and sub-platform
    /// requirement. `None` matches anything.
    pub fn matches(
        &self,
        platform: Option<PlatformType>,
        sub_platform: Option<SubPlatform>,
    ) -> bool {
        platform.is_none_or(|p| p == self.platform_type)
            && sub_platform.is_none_or(|s| Some(s) == self.sub_platform)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.platform_type, self.bitness.bits())?;
        if let Some(sub) = self.sub_platform {
            write!(f, " ({sub:?})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_follow_os_convention() {
        assert_eq!(PlatformType::Windows.library_extension(), Some("dll"));
        assert_eq!(PlatformType::Linux.library_extension(), Some("so"));
        assert_eq!(PlatformType::MacOs.library_extension(), Some("dylib"));
        assert_eq!(PlatformType::Unknown.library_extension(), None);
    }

    #[test]
    fn unconstrained_requirement_matches_any_host() {
        let host = Platform::new(PlatformType::Linux, Bitness::Bits64);
        assert!(host.matches(None, None));
    }

    #[test]
    fn platform_gate_rejects_other_os() {
        let host = Platform::new(PlatformType::Linux, Bitness::Bits64);
        assert!(host.matches(Some(PlatformType::Linux), None));
        assert!(!host.matches(Some(PlatformType::Windows), None));
    }

    #[test]
    fn sub_platform_gate_requires_exact_sub_platform() {
        let desktop = Platform::new(PlatformType::Linux, Bitness::Bits64);
        let android = desktop.with_sub_platform(SubPlatform::Android);
        assert!(!desktop.matches(Some(PlatformType::Linux), Some(SubPlatform::Android)));
        assert!(android.matches(Some(PlatformType::Linux), Some(SubPlatform::Android)));
        assert!(!android.matches(None, Some(SubPlatform::Ios)));
    }

    #[test]
    fn current_bitness_matches_pointer_width() {
        assert_eq!(
            Bitness::current().bits() as usize,
            std::mem::size_of::<usize>() * 8
        );
    }
}
