//! Kernel error taxonomy. Driver code never panics and never allocates;
//! every fallible operation returns one of these kinds (or, at the
//! `init_context`/`deinit_context` lifecycle-hook boundary, the `i32`
//! convention those hooks were specified with).

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum KernelError {
    /// Driver/device mismatch, invalid BAR, feature negotiation rejected.
    /// Surfaced to the resource manager as "not a match," not an error.
    Configuration(&'static str),
    /// Descriptor id out of range, zero-length completion. Consumed
    /// silently by the caller; logged at debug.
    RingProtocol(&'static str),
    /// Transmit polling exhausted.
    Timeout,
    /// Receive called on an empty ring.
    WouldBlock,
    /// Resource pool full, no descriptor free, no device context free.
    ResourceExhausted,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Configuration(reason) => write!(f, "configuration error: {reason}"),
            KernelError::RingProtocol(reason) => write!(f, "ring protocol error: {reason}"),
            KernelError::Timeout => write!(f, "timeout"),
            KernelError::WouldBlock => write!(f, "would block"),
            KernelError::ResourceExhausted => write!(f, "resource exhausted"),
        }
    }
}

pub type KResult<T> = Result<T, KernelError>;

/// Converts a driver lifecycle hook's `i32` result into a try-next-device
/// decision, matching the resource manager's "non-zero -> not a match"
/// contract (see `drivers::resource`).
pub fn hook_ok(code: i32) -> bool {
    code == 0
}

/// Handles the one error class the platform port owns directly: an
/// illegal instruction or other unexpected synchronous trap. Prints a
/// one-line diagnostic and halts. Never returns.
pub fn report_fatal(address: usize, reason: &str) -> ! {
    crate::log_service::log_line_fatal(address, reason);
    crate::arch::halt();
}
