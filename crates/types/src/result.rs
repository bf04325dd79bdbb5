use core::fmt;

use serde::{Deserialize, Serialize};

use crate::Word;

/// Hardware error codes.
///
/// The CPU records one of these in its error register when an instruction
/// cannot complete, and the kernel writes them back into a process's `A`
/// register as the outcome of an I/O request. The numeric codes are stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum HwError {
    #[default]
    Ok = 0,
    InvalidAddress = 1,
    InvalidOp = 2,
    InvalidDevice = 3,
    InvalidInstruction = 4,
    PageFault = 5,
    InvalidPage = 6,
    Syscall = 7,
    Timer = 8,
}

impl HwError {
    pub const ALL: [HwError; 9] = [
        HwError::Ok,
        HwError::InvalidAddress,
        HwError::InvalidOp,
        HwError::InvalidDevice,
        HwError::InvalidInstruction,
        HwError::PageFault,
        HwError::InvalidPage,
        HwError::Syscall,
        HwError::Timer,
    ];

    pub fn code(self) -> Word {
        self as Word
    }

    pub fn from_code(code: Word) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    pub fn is_ok(self) -> bool {
        self == HwError::Ok
    }

    pub fn name(self) -> &'static str {
        match self {
            HwError::Ok => "ok",
            HwError::InvalidAddress => "invalid address",
            HwError::InvalidOp => "invalid operation",
            HwError::InvalidDevice => "invalid device",
            HwError::InvalidInstruction => "invalid instruction",
            HwError::PageFault => "page fault",
            HwError::InvalidPage => "invalid page",
            HwError::Syscall => "system call",
            HwError::Timer => "timer",
        }
    }
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::error::Error for HwError {}
