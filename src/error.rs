//! Error types for link operations.

use thiserror::Error;

/// Failure reported by an external driver primitive.
///
/// Carries the driver's own code; `0` means the driver supplied none.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("driver reported failure (code {0})")]
pub struct DriverError(pub i32);

impl DriverError {
    /// A failure with no driver-specific code.
    pub const UNSPECIFIED: DriverError = DriverError(0);

    /// The code forwarded to the event notifier.
    pub fn code(&self) -> i32 {
        self.0
    }
}

/// Errors surfaced by the byte path of a link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The driver rejected a transmission with a negative code.
    #[error("Transmit failed (code {code}): {reason}")]
    Transmit { code: i32, reason: &'static str },

    /// The driver accepted fewer bytes than requested.
    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Payload exceeds what the medium can carry in one frame.
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Waiting for a state timed out.
    #[error("Operation timed out")]
    Timeout,
}

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    /// Create a transmit error from a raw driver code.
    pub fn transmit(code: i32, reason: &'static str) -> Self {
        Self::Transmit { code, reason }
    }

    /// Check if retrying the same operation later may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transmit { code, .. } => matches!(code, -1 | -4 | -6),
            Self::ShortWrite { .. } | Self::Timeout => true,
            Self::PayloadTooLarge { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LinkError::PayloadTooLarge { size: 300, max: 242 };
        assert_eq!(
            format!("{err}"),
            "Payload too large: 300 bytes exceeds maximum of 242 bytes"
        );

        let err = LinkError::transmit(-4, "chip is busy");
        assert_eq!(format!("{err}"), "Transmit failed (code -4): chip is busy");

        assert_eq!(
            format!("{}", DriverError(-2)),
            "driver reported failure (code -2)"
        );
    }

    #[test]
    fn test_recoverable() {
        assert!(LinkError::transmit(-4, "busy").is_recoverable());
        assert!(!LinkError::transmit(-3, "wrong param").is_recoverable());
        assert!(!LinkError::PayloadTooLarge { size: 1, max: 0 }.is_recoverable());
        assert!(LinkError::Timeout.is_recoverable());
        assert_eq!(DriverError::UNSPECIFIED.code(), 0);
    }
}
