//! System-call handlers.
//!
//! Arguments come from the caller's saved registers: `A` holds the device
//! or program id, `X` the value to write. Completed calls advance the saved
//! program counter past the `SYSCALL` instruction.

use types::{AccessMode, HwError, Pid, Tick, log, syscall, trace};
use vm::{CpuState, Devices, INSTRUCTION_WIDTH, Machine};

use crate::error::KernelError;
use crate::system::Kernel;
use crate::task::PendingIo;

impl Kernel {
    pub(crate) fn handle_syscall(&mut self, machine: &mut Machine) -> Result<(), KernelError> {
        let pid = self.table.running().ok_or(KernelError::NoRunningProcess)?;
        let id = self
            .table
            .get(pid)
            .map(|p| p.regs.complement)
            .ok_or(KernelError::UnknownProcess(pid))?;
        self.metrics.syscalls += 1;
        trace!(self.log, "process {} syscall {}", pid, syscall::name(id));

        match id {
            syscall::READ => self.sys_io(machine, pid, AccessMode::Read),
            syscall::WRITE => self.sys_io(machine, pid, AccessMode::Write),
            syscall::EXIT => {
                self.terminate(pid, machine, "exit");
                Ok(())
            }
            syscall::CREATE => self.sys_create(machine, pid),
            other => Err(KernelError::UnknownSyscall(other)),
        }
    }

    /// Transfer now if the device is ready, otherwise block the caller.
    fn sys_io(
        &mut self,
        machine: &mut Machine,
        pid: Pid,
        mode: AccessMode,
    ) -> Result<(), KernelError> {
        let now = machine.clock.now();
        let process = self
            .table
            .get_mut(pid)
            .ok_or(KernelError::UnknownProcess(pid))?;
        let io = PendingIo {
            device: process.regs.a,
            mode,
        };
        if machine.devices.ready(io.device, io.mode, now) {
            complete_io(&mut process.regs, &mut machine.devices, now, io);
            return Ok(());
        }

        process.pending_io = Some(io);
        let ran = process.metrics.blocked(now);
        self.scheduler.on_preempt_or_block(process, ran);
        self.table.block_running();
        self.metrics.blocks += 1;
        log!(
            self.log,
            "process {} blocked on device {} ({:?})",
            pid,
            io.device,
            io.mode
        );
        Ok(())
    }

    /// Start program `A` in a new process. `A` gets the new pid, or -1.
    fn sys_create(&mut self, machine: &mut Machine, pid: Pid) -> Result<(), KernelError> {
        let program = self
            .table
            .get(pid)
            .map(|p| p.regs.a)
            .ok_or(KernelError::UnknownProcess(pid))?;
        let result = match self.spawn(program, machine.clock.now()) {
            Ok(child) => child.as_word(),
            Err(_) => -1,
        };
        if let Some(process) = self.table.get_mut(pid) {
            process.regs.a = result;
            process.regs.pc += INSTRUCTION_WIDTH;
        }
        Ok(())
    }

    /// Complete the I/O of every blocked process whose device became ready.
    pub(crate) fn sweep_blocked(&mut self, machine: &mut Machine) {
        let now = machine.clock.now();
        let blocked: Vec<Pid> = self.table.blocked().iter().copied().collect();
        for pid in blocked {
            let Some(process) = self.table.get_mut(pid) else {
                continue;
            };
            let Some(io) = process.pending_io else {
                continue;
            };
            if !machine.devices.ready(io.device, io.mode, now) {
                continue;
            }
            complete_io(&mut process.regs, &mut machine.devices, now, io);
            process.metrics.unblocked(now);
            let waited = process.metrics.last_block;
            self.table.unblock(pid);
            log!(
                self.log,
                "process {} unblocked after {} ticks on device {}",
                pid,
                waited,
                io.device
            );
        }
    }
}

/// Perform the transfer and write the outcome into the saved registers:
/// `A` = error code, `X` = value read.
fn complete_io(regs: &mut CpuState, devices: &mut Devices, now: Tick, io: PendingIo) {
    let result = match io.mode {
        AccessMode::Read => devices.read(io.device, now).map(|value| regs.x = value),
        AccessMode::Write => devices.write(io.device, regs.x, now),
    };
    regs.a = match result {
        Ok(()) => HwError::Ok.code(),
        Err(err) => err.code(),
    };
    regs.pc += INSTRUCTION_WIDTH;
}
