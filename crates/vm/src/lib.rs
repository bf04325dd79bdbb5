//! Simulated hardware driven by the kernel.
//!
//! The [`Machine`] owns every device the kernel talks to: the clock, the CPU
//! register file and instruction executor, physical memory, the address
//! translation unit and the I/O devices. It runs one instruction per tick and
//! hands every interrupt to an [`InterruptHandler`].

pub mod clock;
pub mod cpu;
pub mod devices;
pub mod isa;
pub mod loader;
pub mod machine;
pub mod memory;
pub mod mmu;
pub mod registers;

pub use clock::Clock;
pub use cpu::Cpu;
pub use devices::{DEV_RANDOM, DEV_TERMINAL, Devices, IoDevice, RandomDevice, ScriptedDevice, Terminal};
pub use isa::{AsmError, Assembler, INSTRUCTION_WIDTH, Opcode, Operand};
pub use loader::{LoadError, ProgramLoader, ProgramTable, parse_words};
pub use machine::{InterruptHandler, Machine, RunOutcome};
pub use memory::Memory;
pub use mmu::{Mmu, PageTable, PageTableEntry, SharedPageTable};
pub use registers::CpuState;
