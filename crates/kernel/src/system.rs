use std::time::Instant;

use types::{Config, Logger, Pid, ProgramId, Tick, log, trace};
use vm::{CpuState, Machine, ProgramLoader};

use crate::error::KernelError;
use crate::frames::{FrameOwner, FrameTable};
use crate::metrics::{ProcessReport, SystemMetrics, SystemReport};
use crate::mmu::VmManager;
use crate::report::ReportSink;
use crate::sched::{self, Scheduler};
use crate::task::{Process, ProcessState, ProcessTable};

/// The kernel handle.
///
/// Owns every piece of kernel state. The hardware loop reaches it only
/// through [`vm::InterruptHandler`]; each call runs to completion.
#[derive(Debug)]
pub struct Kernel {
    config: Config,
    loader: Box<dyn ProgramLoader>,
    pub(crate) table: ProcessTable,
    pub(crate) frames: FrameTable,
    pub(crate) vm: VmManager,
    pub(crate) scheduler: Box<dyn Scheduler>,
    pub(crate) metrics: SystemMetrics,
    sink: ReportSink,
    process_reports: Vec<ProcessReport>,
    system_report: Option<SystemReport>,
    pub(crate) running: bool,
    wall_start: Instant,
    pub(crate) log: Logger,
}

impl Kernel {
    /// Kernel with no processes yet.
    pub fn new(
        config: Config,
        loader: Box<dyn ProgramLoader>,
        log: Logger,
    ) -> Result<Self, KernelError> {
        config.validate()?;
        let log = log.scoped("kernel");
        Ok(Self {
            loader,
            table: ProcessTable::new(),
            frames: FrameTable::new(config.frame_count()),
            vm: VmManager::new(config.eviction, config.frame_size, config.rng_seed, log.clone()),
            scheduler: sched::from_kind(config.scheduler, config.max_quantum),
            metrics: SystemMetrics::default(),
            sink: ReportSink::new(config.report_dir.clone(), config.report_format, log.clone()),
            process_reports: Vec::new(),
            system_report: None,
            running: true,
            wall_start: Instant::now(),
            log,
            config,
        })
    }

    /// Create the kernel, start the init process and put it on the CPU.
    ///
    /// If the init program cannot be loaded there is nothing to run, and the
    /// returned kernel has already halted.
    pub fn boot(
        config: Config,
        loader: Box<dyn ProgramLoader>,
        log: Logger,
        machine: &mut Machine,
    ) -> Result<Self, KernelError> {
        let mut kernel = Self::new(config, loader, log)?;
        kernel.check_hardware(machine)?;
        log!(
            kernel.log,
            "booting: {} frames of {} words, {} scheduler, {:?} eviction",
            kernel.frames.len(),
            kernel.config.frame_size,
            kernel.scheduler.name(),
            kernel.vm.policy()
        );

        let init = kernel.config.init_program;
        if let Err(err) = kernel.spawn(init, machine.clock.now()) {
            log!(kernel.log, "init program {} failed: {}", init, err);
            kernel.halt(machine, "init program could not be loaded");
            return Ok(kernel);
        }
        kernel.schedule(machine);
        Ok(kernel)
    }

    fn check_hardware(&self, machine: &Machine) -> Result<(), KernelError> {
        if machine.memory.size() != self.config.memory_size
            || machine.mmu.page_size() != self.config.frame_size
        {
            return Err(KernelError::HardwareMismatch {
                memory_size: machine.memory.size(),
                frame_size: machine.mmu.page_size(),
            });
        }
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// False once the system has halted; the hardware loop must stop.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_pid(&self) -> Option<Pid> {
        self.table.running()
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.table.get(pid)
    }

    pub fn process_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.table.get_mut(pid)
    }

    pub fn ready_pids(&self) -> Vec<Pid> {
        self.table.ready().iter().copied().collect()
    }

    pub fn blocked_pids(&self) -> Vec<Pid> {
        self.table.blocked().iter().copied().collect()
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn metrics(&self) -> &SystemMetrics {
        &self.metrics
    }

    pub fn scheduler_name(&self) -> &'static str {
        self.scheduler.name()
    }

    /// Reports of every terminated process, in termination order.
    pub fn process_reports(&self) -> &[ProcessReport] {
        &self.process_reports
    }

    /// Present once the system has halted.
    pub fn system_report(&self) -> Option<&SystemReport> {
        self.system_report.as_ref()
    }

    /// Stop the system from outside: terminate every process and emit the
    /// system report.
    pub fn shutdown(&mut self, machine: &mut Machine) {
        self.halt(machine, "shutdown requested");
    }

    /// Load `program` into a new ready process.
    ///
    /// A pid is consumed even when loading fails; the would-be process is
    /// counted as terminated at birth.
    pub(crate) fn spawn(&mut self, program: ProgramId, now: Tick) -> Result<Pid, KernelError> {
        let pid = self.table.allocate_pid();
        let image = match self.loader.load(program) {
            Ok(image) => image,
            Err(err) => {
                self.metrics.failed_creations += 1;
                log!(self.log, "process {} terminated at creation: {}", pid, err);
                return Err(err.into());
            }
        };
        let process = Process::new(
            pid,
            program,
            &image,
            self.config.frame_size,
            self.config.max_quantum,
            now,
        );
        log!(
            self.log,
            "process {} created: program {}, {} pages",
            pid,
            program,
            process.pages()
        );
        self.table.insert(process);
        self.metrics.processes_created += 1;
        Ok(pid)
    }

    /// Remove `pid` from the system, free its frames and emit its report.
    pub(crate) fn terminate(&mut self, pid: Pid, machine: &mut Machine, reason: &str) {
        let now = machine.clock.now();
        let Some(mut process) = self.table.remove(pid) else {
            return;
        };
        let state = process.state();
        if state == ProcessState::Running {
            machine.mmu.deactivate();
        }
        process.metrics.finish(now, state);
        let released = self.frames.release_owned_by(pid);

        let report = ProcessReport::new(pid, process.program(), process.metrics(), now);
        log!(
            self.log,
            "process {} terminated ({}): lifetime {}, cpu {}, {} frames released",
            pid,
            reason,
            report.lifetime,
            report.cpu_time,
            released.len()
        );
        self.sink.emit_process(&report);
        self.process_reports.push(report);
        self.metrics.processes_terminated += 1;
    }

    /// Panic path: terminate everything left, emit the system report and
    /// refuse further interrupts.
    pub(crate) fn halt(&mut self, machine: &mut Machine, reason: &str) {
        if !self.running {
            return;
        }
        for pid in self.table.pids() {
            self.terminate(pid, machine, "system halt");
        }
        let now = machine.clock.now();
        self.metrics.leave_idle(now);
        let report = SystemReport::new(
            reason,
            &self.metrics,
            now,
            self.wall_start.elapsed().as_secs_f64(),
        );
        log!(self.log, "halt at tick {}: {}", now, reason);
        self.sink.emit_system(&report);
        self.system_report = Some(report);
        self.running = false;
        machine.cpu.restore_state(&CpuState::idle());
        machine.mmu.deactivate();
    }

    /// Decide who runs next and put it on the CPU.
    pub(crate) fn schedule(&mut self, machine: &mut Machine) {
        let now = machine.clock.now();
        if let Some(pid) = self.table.running() {
            let preempt = self
                .table
                .running_process()
                .is_some_and(|p| self.scheduler.should_preempt(p, &self.table));
            if !preempt {
                self.resume(pid, machine);
                return;
            }
            self.preempt(pid, now);
        }

        match self.scheduler.select_next(&self.table) {
            Some(pid) => self.dispatch(pid, machine),
            None if !self.table.blocked().is_empty() => self.idle(machine),
            None => self.halt(machine, "no processes left"),
        }
    }

    fn preempt(&mut self, pid: Pid, now: Tick) {
        if let Some(process) = self.table.get_mut(pid) {
            let ran = process.metrics.preempted(now);
            self.scheduler.on_preempt_or_block(process, ran);
            trace!(
                self.log,
                "process {} preempted after {} ticks, estimate {}",
                pid,
                ran,
                process.burst_estimate()
            );
        }
        self.table.preempt_running();
        self.metrics.preemptions += 1;
    }

    /// Context switch to a ready process.
    fn dispatch(&mut self, pid: Pid, machine: &mut Machine) {
        let now = machine.clock.now();
        if !self.table.set_running(pid) {
            log!(self.log, "cannot dispatch process {}", pid);
            return;
        }
        self.metrics.leave_idle(now);
        let Some(process) = self.table.get_mut(pid) else {
            return;
        };
        process.metrics.dispatched(now);
        self.scheduler.on_dispatch(process);
        machine.cpu.restore_state(&process.regs);
        machine.mmu.activate_page_table(process.shared_page_table());
        trace!(self.log, "dispatch process {} at tick {}", pid, now);
    }

    /// Keep the current process on the CPU with its (possibly updated) registers.
    fn resume(&mut self, pid: Pid, machine: &mut Machine) {
        if let Some(process) = self.table.get(pid) {
            machine.cpu.restore_state(&process.regs);
            machine.mmu.activate_page_table(process.shared_page_table());
        }
    }

    fn idle(&mut self, machine: &mut Machine) {
        let now = machine.clock.now();
        if !self.metrics.is_idle() {
            log!(
                self.log,
                "cpu idle at tick {}: {} processes blocked",
                now,
                self.table.blocked().len()
            );
        }
        self.metrics.enter_idle(now);
        machine.cpu.restore_state(&CpuState::idle());
        machine.mmu.deactivate();
    }

    /// Verify process placement and page-table / frame-table agreement.
    pub fn check_invariants(&self) -> Result<(), KernelError> {
        self.table.check_placement().map_err(KernelError::Invariant)?;

        for process in self.table.iter() {
            let pid = process.pid();
            for (page, frame) in process.page_table().resident() {
                let owner = self
                    .frames
                    .get(frame)
                    .filter(|f| f.occupied)
                    .and_then(|f| f.owner);
                if owner != Some(FrameOwner { pid, page }) {
                    return Err(KernelError::Invariant(format!(
                        "{:?} page {} maps frame {} owned by {:?}",
                        pid, page, frame, owner
                    )));
                }
            }
        }

        for (n, frame) in self.frames.iter().filter(|(_, f)| f.occupied) {
            let Some(owner) = frame.owner else {
                return Err(KernelError::Invariant(format!(
                    "frame {} occupied without owner",
                    n
                )));
            };
            let mapped = self.table.get(owner.pid).and_then(|p| p.frame_of(owner.page));
            if mapped != Some(n) {
                return Err(KernelError::Invariant(format!(
                    "frame {} claims {:?} page {}, which maps {:?}",
                    n, owner.pid, owner.page, mapped
                )));
            }
        }
        Ok(())
    }
}
