use types::{Config, CpuMode, HwError, InterruptCause, Logger, Tick, log};

use crate::clock::Clock;
use crate::cpu::Cpu;
use crate::devices::Devices;
use crate::memory::Memory;
use crate::mmu::Mmu;

/// Receiver of hardware interrupts: the operating system.
pub trait InterruptHandler {
    /// Called once per interrupt, synchronously, before the next instruction.
    fn handle_interrupt(&mut self, machine: &mut Machine, cause: InterruptCause);

    /// False once the handler has shut down; the machine stops calling it.
    fn is_running(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The handler stopped running at the given tick.
    Halted(Tick),
    /// The tick budget ran out first.
    TickLimit(Tick),
}

/// The hardware controller: every device plus the execution loop.
#[derive(Debug)]
pub struct Machine {
    pub clock: Clock,
    pub cpu: Cpu,
    pub memory: Memory,
    pub mmu: Mmu,
    pub devices: Devices,
    timer_pending: bool,
    log: Logger,
}

impl Machine {
    pub fn new(config: &Config, devices: Devices, log: Logger) -> Self {
        Self {
            clock: Clock::new(config.timer_interval),
            cpu: Cpu::new(log.clone()),
            memory: Memory::new(config.memory_size),
            mmu: Mmu::new(config.frame_size),
            devices,
            timer_pending: false,
            log: log.scoped("machine"),
        }
    }

    /// Advance one tick: execute one instruction (unless idle) and report the
    /// interrupt to deliver, if any. An instruction error takes priority; a
    /// timer interrupt that coincides with it is delivered on a later tick.
    pub fn step(&mut self) -> Option<InterruptCause> {
        self.clock.tick();
        if self.clock.timer_due() {
            self.timer_pending = true;
        }

        if self.cpu.mode() != CpuMode::Idle {
            if let Err(err) = self.cpu.execute(&mut self.mmu, &mut self.memory) {
                return InterruptCause::from_error(err);
            }
        }

        if self.timer_pending {
            self.timer_pending = false;
            let state = self.cpu.state_mut();
            state.err = HwError::Timer;
            return Some(InterruptCause::TimerTick);
        }
        None
    }

    /// Run until the handler stops or `max_ticks` clock ticks have elapsed.
    pub fn run<H: InterruptHandler + ?Sized>(
        &mut self,
        handler: &mut H,
        max_ticks: Option<Tick>,
    ) -> RunOutcome {
        while handler.is_running() {
            if max_ticks.is_some_and(|limit| self.clock.now() >= limit) {
                log!(self.log, "tick limit reached at {}", self.clock.now());
                return RunOutcome::TickLimit(self.clock.now());
            }
            if let Some(cause) = self.step() {
                handler.handle_interrupt(self, cause);
            }
        }
        log!(self.log, "handler stopped at tick {}", self.clock.now());
        RunOutcome::Halted(self.clock.now())
    }
}
