use kernel::{Kernel, KernelError};
use types::{Config, Logger, Tick, Word};
use vm::{DEV_TERMINAL, Devices, Machine, ProgramLoader, RunOutcome, Terminal};

/// A machine with the kernel booted on it.
#[derive(Debug)]
pub struct Bootloader {
    pub machine: Machine,
    pub kernel: Kernel,
}

impl Bootloader {
    /// Build the machine described by `config` and boot the kernel.
    pub fn boot(
        config: Config,
        loader: Box<dyn ProgramLoader>,
        devices: Devices,
        log: Logger,
    ) -> Result<Self, KernelError> {
        config.validate()?;
        let mut machine = Machine::new(&config, devices, log.clone());
        let kernel = Kernel::boot(config, loader, log, &mut machine)?;
        Ok(Self { machine, kernel })
    }

    /// Run until the kernel halts. When `max_ticks` runs out first the
    /// kernel is shut down, so reports are always produced.
    pub fn run(&mut self, max_ticks: Option<Tick>) -> RunOutcome {
        let outcome = self.machine.run(&mut self.kernel, max_ticks);
        if let RunOutcome::TickLimit(_) = outcome {
            self.kernel.shutdown(&mut self.machine);
        }
        outcome
    }

    /// Everything written to the terminal device, if one is attached.
    pub fn terminal_output(&self) -> &[Word] {
        self.machine
            .devices
            .get::<Terminal>(DEV_TERMINAL)
            .map(Terminal::output)
            .unwrap_or(&[])
    }
}
