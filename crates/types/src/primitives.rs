use core::fmt;

use serde::{Deserialize, Serialize};

/// Machine word. Registers, memory cells and device values are all words.
pub type Word = i32;

/// Identifier of a program image known to the program loader.
pub type ProgramId = Word;

/// Physical frame number.
pub type FrameNumber = usize;

/// Virtual page number.
pub type PageNumber = usize;

/// Simulated clock reading, in ticks.
pub type Tick = u64;

/// Process identifier. Assigned monotonically and never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(pub u32);

impl Pid {
    /// The pid as a register value; -1 if it does not fit in a word.
    pub fn as_word(self) -> Word {
        Word::try_from(self.0).unwrap_or(-1)
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid{}", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of an I/O request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    Read,
    Write,
}

/// CPU privilege mode.
///
/// `Idle` is the "zombie" mode: no process is loaded and the CPU only waits
/// for the next timer interrupt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuMode {
    #[default]
    Supervisor,
    User,
    Idle,
}
