//! Interrupt dispatcher.

use types::{HwError, InterruptCause, log};
use vm::{InterruptHandler, Machine};

use crate::error::KernelError;
use crate::system::Kernel;

impl Kernel {
    /// Save the running process's registers, route by cause, then sweep the
    /// blocked queue, reschedule and dispatch.
    fn dispatch_interrupt(&mut self, machine: &mut Machine, cause: InterruptCause) {
        self.metrics.record_interrupt(cause);
        if let Some(process) = self.table.running_process_mut() {
            process.regs = machine.cpu.save_state();
            process.regs.err = HwError::Ok;
        }

        let handled = match cause {
            InterruptCause::Syscall => self.handle_syscall(machine),
            InterruptCause::TimerTick => {
                if let Some(process) = self.table.running_process_mut() {
                    self.scheduler.on_tick(process);
                }
                Ok(())
            }
            InterruptCause::PageFault => self.handle_page_fault(machine),
            InterruptCause::InvalidPageAccess => match self.table.running() {
                Some(pid) => Err(KernelError::InvalidPage {
                    pid,
                    address: machine.mmu.last_fault_address(),
                }),
                None => Err(KernelError::NoRunningProcess),
            },
            InterruptCause::Other(err) => match self.table.running() {
                Some(pid) => Err(KernelError::Fault { pid, err }),
                None => Err(KernelError::Hardware(err)),
            },
        };
        if let Err(err) = handled {
            self.fail_running(machine, err);
        }

        self.sweep_blocked(machine);
        self.schedule(machine);
        machine.cpu.clear_error();
    }

    fn handle_page_fault(&mut self, machine: &mut Machine) -> Result<(), KernelError> {
        let pid = self.table.running().ok_or(KernelError::NoRunningProcess)?;
        let address = machine.mmu.last_fault_address();
        let outcome = self.vm.handle_page_fault(
            &mut self.frames,
            &mut self.table,
            &mut machine.memory,
            pid,
            address,
        )?;
        self.metrics.page_faults += 1;
        if outcome.evicted.is_some() {
            self.metrics.evictions += 1;
        }
        log!(
            self.log,
            "process {} page fault at {}: page {} -> frame {}",
            pid,
            address,
            outcome.page,
            outcome.frame
        );
        Ok(())
    }

    /// Per-process error: the running process is terminated, the system
    /// carries on.
    fn fail_running(&mut self, machine: &mut Machine, err: KernelError) {
        log!(self.log, "error: {}", err);
        if let Some(pid) = self.table.running() {
            self.terminate(pid, machine, "error");
        }
    }
}

impl InterruptHandler for Kernel {
    fn handle_interrupt(&mut self, machine: &mut Machine, cause: InterruptCause) {
        if !self.running {
            return;
        }
        self.dispatch_interrupt(machine, cause);
    }

    fn is_running(&self) -> bool {
        Kernel::is_running(self)
    }
}
