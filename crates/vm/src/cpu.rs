use types::{CpuMode, HwError, Logger, Word, trace};

use crate::isa::{INSTRUCTION_WIDTH, Opcode};
use crate::memory::Memory;
use crate::mmu::Mmu;
use crate::registers::CpuState;

/// The simulated processor.
///
/// EDUCATIONAL: a real CPU repeats fetch, decode and execute forever. Here one
/// call to [`Cpu::execute`] runs exactly one instruction. When an instruction
/// cannot complete (a syscall, a page that is not resident, an unknown opcode)
/// the CPU does not advance the PC; it records the condition in the error
/// register and the machine turns it into an interrupt. The kernel later
/// restores a state whose error register is clear, and execution resumes by
/// retrying the same instruction (or the next one, if the kernel advanced the
/// PC as it does after a completed system call).
#[derive(Debug)]
pub struct Cpu {
    state: CpuState,
    log: Logger,
}

impl Cpu {
    pub fn new(log: Logger) -> Self {
        Self {
            state: CpuState::default(),
            log: log.scoped("cpu"),
        }
    }

    /// Copy of the live register state.
    pub fn save_state(&self) -> CpuState {
        self.state
    }

    pub fn restore_state(&mut self, state: &CpuState) {
        self.state = *state;
    }

    pub fn state(&self) -> &CpuState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    pub fn mode(&self) -> CpuMode {
        self.state.mode
    }

    pub fn set_mode(&mut self, mode: CpuMode) {
        self.state.mode = mode;
    }

    pub fn pc(&self) -> Word {
        self.state.pc
    }

    pub fn set_pc(&mut self, pc: Word) {
        self.state.pc = pc;
    }

    pub fn a(&self) -> Word {
        self.state.a
    }

    pub fn set_a(&mut self, value: Word) {
        self.state.a = value;
    }

    pub fn x(&self) -> Word {
        self.state.x
    }

    pub fn set_x(&mut self, value: Word) {
        self.state.x = value;
    }

    pub fn complement(&self) -> Word {
        self.state.complement
    }

    pub fn err(&self) -> HwError {
        self.state.err
    }

    /// Acknowledge the pending interrupt.
    pub fn clear_error(&mut self) {
        self.state.clear_error();
    }

    /// Run one instruction. An idle CPU does nothing.
    pub fn execute(&mut self, mmu: &mut Mmu, memory: &mut Memory) -> Result<(), HwError> {
        if self.state.mode == CpuMode::Idle {
            return Ok(());
        }
        if !self.state.err.is_ok() {
            // An unacknowledged interrupt blocks execution.
            return Err(self.state.err);
        }

        let pc = self.state.pc;
        let opcode = self.load(mmu, memory, pc)?;
        let arg = self.load(mmu, memory, pc.wrapping_add(1))?;
        let Some(op) = Opcode::from_word(opcode) else {
            return Err(self.fail(HwError::InvalidInstruction, opcode));
        };
        trace!(self.log, "pc={:5} {:<7} {:6} a={} x={}", pc, op, arg, self.state.a, self.state.x);

        let mut next_pc = pc.wrapping_add(INSTRUCTION_WIDTH);
        match op {
            Opcode::Nop => {}
            Opcode::LoadI => self.state.a = arg,
            Opcode::LoadM => self.state.a = self.load(mmu, memory, arg)?,
            Opcode::StoreM => self.store(mmu, memory, arg, self.state.a)?,
            Opcode::Add => {
                let v = self.load(mmu, memory, arg)?;
                self.state.a = self.state.a.wrapping_add(v);
            }
            Opcode::Sub => {
                let v = self.load(mmu, memory, arg)?;
                self.state.a = self.state.a.wrapping_sub(v);
            }
            Opcode::Inc => self.state.a = self.state.a.wrapping_add(1),
            Opcode::Dec => self.state.a = self.state.a.wrapping_sub(1),
            Opcode::SwapX => core::mem::swap(&mut self.state.a, &mut self.state.x),
            Opcode::Jmp => next_pc = arg,
            Opcode::Jz => {
                if self.state.a == 0 {
                    next_pc = arg;
                }
            }
            Opcode::Jnz => {
                if self.state.a != 0 {
                    next_pc = arg;
                }
            }
            Opcode::Syscall => return Err(self.fail(HwError::Syscall, arg)),
        }
        self.state.pc = next_pc;
        Ok(())
    }

    fn load(&mut self, mmu: &mut Mmu, memory: &Memory, vaddr: Word) -> Result<Word, HwError> {
        mmu.read(memory, vaddr).map_err(|e| self.fail(e, vaddr))
    }

    fn store(
        &mut self,
        mmu: &mut Mmu,
        memory: &mut Memory,
        vaddr: Word,
        value: Word,
    ) -> Result<(), HwError> {
        mmu.write(memory, vaddr, value).map_err(|e| self.fail(e, vaddr))
    }

    fn fail(&mut self, err: HwError, complement: Word) -> HwError {
        self.state.err = err;
        self.state.complement = complement;
        err
    }
}
