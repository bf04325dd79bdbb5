#![allow(dead_code)]

use kernel::Kernel;
use once_cell::sync::Lazy;
use types::{BufferWriter, Config, HwError, InterruptCause, Level, Logger, Pid, Word};
use vm::{Assembler, Devices, InterruptHandler, Machine, ProgramTable, ScriptedDevice};

/// Endless loop; fits in one instruction.
pub static SPIN: Lazy<Vec<Word>> = Lazy::new(|| {
    let mut asm = Assembler::new();
    asm.label("spin").jmp("spin");
    asm.finish().unwrap()
});

/// Small machine: `frames` frames of `frame_size` words.
pub fn config(frames: usize, frame_size: usize) -> Config {
    Config {
        memory_size: frames * frame_size,
        frame_size,
        max_quantum: 2,
        timer_interval: 10,
        ..Config::default()
    }
}

/// Image of `pages` full pages whose words are all `fill`.
pub fn filled(pages: usize, frame_size: usize, fill: Word) -> Vec<Word> {
    vec![fill; pages * frame_size]
}

/// A kernel and its machine, driven by hand: tests set up the CPU state an
/// instruction would have produced and deliver the interrupt directly.
pub struct Rig {
    pub machine: Machine,
    pub kernel: Kernel,
    pub log: BufferWriter,
}

impl Rig {
    pub fn boot(config: Config, programs: Vec<Vec<Word>>) -> Rig {
        Self::boot_with(config, programs, Devices::new())
    }

    pub fn boot_with(config: Config, programs: Vec<Vec<Word>>, devices: Devices) -> Rig {
        let (logger, log) = Logger::buffered(Level::Info);
        let mut machine = Machine::new(&config, devices, logger.clone());
        let loader = Box::new(ProgramTable::from_programs(programs));
        let kernel = Kernel::boot(config, loader, logger, &mut machine).unwrap();
        Rig {
            machine,
            kernel,
            log,
        }
    }

    pub fn current(&self) -> Option<Pid> {
        self.kernel.current_pid()
    }

    pub fn advance(&mut self, ticks: u64) {
        self.machine.clock.advance(ticks);
    }

    fn deliver(&mut self, err: HwError, cause: InterruptCause) {
        self.machine.cpu.state_mut().err = err;
        self.kernel.handle_interrupt(&mut self.machine, cause);
        self.kernel.check_invariants().unwrap();
    }

    /// The running process executes `SYSCALL id` with the given registers.
    pub fn syscall(&mut self, id: Word, a: Word, x: Word) {
        let state = self.machine.cpu.state_mut();
        state.a = a;
        state.x = x;
        state.complement = id;
        self.deliver(HwError::Syscall, InterruptCause::Syscall);
    }

    pub fn timer(&mut self) {
        self.advance(1);
        self.deliver(HwError::Timer, InterruptCause::TimerTick);
    }

    /// The running process touches virtual address `addr`.
    pub fn touch(&mut self, addr: Word) {
        match self.machine.mmu.translate(addr) {
            Ok(_) => {}
            Err(HwError::PageFault) => self.deliver(HwError::PageFault, InterruptCause::PageFault),
            Err(HwError::InvalidPage) => {
                self.deliver(HwError::InvalidPage, InterruptCause::InvalidPageAccess)
            }
            Err(err) => panic!("unexpected translation error {err}"),
        }
    }

    /// Create a child running `program`; returns its pid as seen by the caller.
    pub fn create(&mut self, program: Word) -> Word {
        let caller = self.current().unwrap();
        self.syscall(types::syscall::CREATE, program, 0);
        self.kernel.process(caller).unwrap().registers().a
    }

    pub fn scripted(&mut self, id: Word) -> &mut ScriptedDevice {
        self.machine.devices.get_mut::<ScriptedDevice>(id).unwrap()
    }
}
