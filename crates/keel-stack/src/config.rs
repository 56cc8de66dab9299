//! Arena configuration parameters.

use crate::error::StackError;

/// Configuration for a [`MemoryStack`](crate::MemoryStack).
///
/// Fixed at construction. The thread-local arena reads it once, on first
/// use, from [`set_thread_config`](crate::set_thread_config) or the
/// default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackConfig {
    /// Size of the backing buffer in bytes.
    ///
    /// Default: 65_536.
    pub capacity: usize,

    /// Alignment applied when an allocation does not request one.
    ///
    /// Default: the native word size. Must be a power of two.
    pub default_alignment: usize,
}

impl StackConfig {
    /// Default buffer size: 64KB.
    pub const DEFAULT_CAPACITY: usize = 65_536;

    /// Default alignment: one native word.
    pub const DEFAULT_ALIGNMENT: usize = std::mem::size_of::<usize>();

    /// A config with the given capacity and default alignment.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            default_alignment: Self::DEFAULT_ALIGNMENT,
        }
    }

    /// Same config with another default alignment.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.default_alignment = alignment;
        self
    }

    /// Checks that the default alignment is a power of two.
    pub fn validate(&self) -> Result<(), StackError> {
        if self.default_alignment.is_power_of_two() {
            Ok(())
        } else {
            Err(StackError::InvalidAlignment {
                alignment: self.default_alignment,
            })
        }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StackConfig::default();
        assert_eq!(config.capacity, 65_536);
        assert_eq!(config.default_alignment, std::mem::size_of::<usize>());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_power_of_two_alignment_rejected() {
        let config = StackConfig::new(1024).with_alignment(12);
        assert_eq!(
            config.validate(),
            Err(StackError::InvalidAlignment { alignment: 12 })
        );
        assert!(StackConfig::new(1024).with_alignment(0).validate().is_err());
    }
}
