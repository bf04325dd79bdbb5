use core::fmt;

use types::{ConfigError, HwError, PageNumber, Pid, Word};
use vm::LoadError;

/// Failures inside the kernel control plane.
///
/// Everything except `Config` is scoped to a single process: the dispatcher
/// terminates the offending process and keeps the system running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    Config(ConfigError),
    /// Machine built with a different memory or frame size than the kernel config.
    HardwareMismatch { memory_size: usize, frame_size: usize },
    Load(LoadError),
    NoRunningProcess,
    UnknownProcess(Pid),
    UnknownSyscall(Word),
    /// Access outside the process address space.
    InvalidPage { pid: Pid, address: Word },
    PageOutOfRange { pid: Pid, page: PageNumber },
    /// The frame table has nothing to allocate or evict.
    NoFrames,
    /// Instruction-level fault other than paging (bad opcode, bounds, ...).
    Fault { pid: Pid, err: HwError },
    Hardware(HwError),
    Invariant(String),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Config(err) => write!(f, "invalid configuration: {}", err),
            KernelError::HardwareMismatch {
                memory_size,
                frame_size,
            } => write!(
                f,
                "machine has {} words in frames of {}, config disagrees",
                memory_size, frame_size
            ),
            KernelError::Load(err) => write!(f, "program load failed: {}", err),
            KernelError::NoRunningProcess => write!(f, "no process is running"),
            KernelError::UnknownProcess(pid) => write!(f, "no process {}", pid),
            KernelError::UnknownSyscall(id) => write!(f, "unknown syscall {}", id),
            KernelError::InvalidPage { pid, address } => {
                write!(f, "process {} accessed invalid address {}", pid, address)
            }
            KernelError::PageOutOfRange { pid, page } => {
                write!(f, "process {} has no page {}", pid, page)
            }
            KernelError::NoFrames => write!(f, "no physical frame available"),
            KernelError::Fault { pid, err } => write!(f, "process {} faulted: {}", pid, err),
            KernelError::Hardware(err) => write!(f, "hardware error: {}", err),
            KernelError::Invariant(msg) => write!(f, "invariant violated: {}", msg),
        }
    }
}

impl std::error::Error for KernelError {}

impl From<ConfigError> for KernelError {
    fn from(err: ConfigError) -> Self {
        KernelError::Config(err)
    }
}

impl From<LoadError> for KernelError {
    fn from(err: LoadError) -> Self {
        KernelError::Load(err)
    }
}

impl From<HwError> for KernelError {
    fn from(err: HwError) -> Self {
        KernelError::Hardware(err)
    }
}
