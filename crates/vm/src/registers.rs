use types::{CpuMode, HwError, Word};

/// Architectural CPU state: the snapshot the kernel saves on every interrupt
/// and restores on dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuState {
    /// Program counter (virtual address of the next instruction).
    pub pc: Word,
    /// Accumulator. Syscall argument and result register.
    pub a: Word,
    /// Auxiliary register. Carries I/O values.
    pub x: Word,
    /// Extra information about the last error: syscall number or faulting address.
    pub complement: Word,
    pub mode: CpuMode,
    /// Pending error / interrupt condition. `Ok` when nothing is pending.
    pub err: HwError,
}

impl CpuState {
    /// Fresh user-mode state starting at address 0.
    pub fn user() -> Self {
        Self {
            mode: CpuMode::User,
            ..Self::default()
        }
    }

    pub fn idle() -> Self {
        Self {
            mode: CpuMode::Idle,
            ..Self::default()
        }
    }

    pub fn clear_error(&mut self) {
        self.err = HwError::Ok;
        self.complement = 0;
    }
}
