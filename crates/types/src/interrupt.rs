use core::fmt;

use serde::{Deserialize, Serialize};

use crate::HwError;

/// System call numbers, carried in the CPU `complement` field when a
/// `SYSCALL` instruction traps.
pub mod syscall {
    use crate::Word;

    /// Read one word from device `A`. Result: `A` = error code, `X` = value.
    pub const READ: Word = 1;
    /// Write `X` to device `A`. Result: `A` = error code.
    pub const WRITE: Word = 2;
    /// Terminate the calling process.
    pub const EXIT: Word = 3;
    /// Create a process running program `A`. Result: `A` = new pid or -1.
    pub const CREATE: Word = 7;

    pub fn name(id: Word) -> &'static str {
        match id {
            READ => "read",
            WRITE => "write",
            EXIT => "exit",
            CREATE => "create",
            _ => "unknown",
        }
    }
}

/// Reason the hardware loop handed control to the kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterruptCause {
    Syscall,
    TimerTick,
    PageFault,
    InvalidPageAccess,
    /// Any other hardware error (bad instruction, memory bounds, ...).
    Other(HwError),
}

impl InterruptCause {
    /// Map the CPU error register to the interrupt it raises, if any.
    pub fn from_error(err: HwError) -> Option<Self> {
        match err {
            HwError::Ok => None,
            HwError::Syscall => Some(InterruptCause::Syscall),
            HwError::Timer => Some(InterruptCause::TimerTick),
            HwError::PageFault => Some(InterruptCause::PageFault),
            HwError::InvalidPage => Some(InterruptCause::InvalidPageAccess),
            other => Some(InterruptCause::Other(other)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            InterruptCause::Syscall => "syscall".to_string(),
            InterruptCause::TimerTick => "timer".to_string(),
            InterruptCause::PageFault => "page_fault".to_string(),
            InterruptCause::InvalidPageAccess => "invalid_page".to_string(),
            InterruptCause::Other(err) => format!("other({})", err),
        }
    }
}

impl fmt::Display for InterruptCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
