use core::cell::Ref;

use types::{AccessMode, PageNumber, Pid, ProgramId, Tick, Word};
use vm::{CpuState, Memory, PageTable, SharedPageTable};

use crate::metrics::ProcessMetrics;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
}

/// The I/O request a blocked process is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingIo {
    pub device: Word,
    pub mode: AccessMode,
}

/// One simulated process.
///
/// The backing store holds the whole address space rounded up to whole pages.
/// Resident pages live in physical frames and are copied back here on eviction.
#[derive(Debug)]
pub struct Process {
    pid: Pid,
    program: ProgramId,
    pub(crate) state: ProcessState,
    pub(crate) regs: CpuState,
    page_table: SharedPageTable,
    pub(crate) backing: Memory,
    pub(crate) pending_io: Option<PendingIo>,
    /// Timer ticks left before the process may be preempted.
    pub(crate) quantum: u32,
    /// Smoothed prediction of the next run length, in clock ticks.
    pub(crate) burst_estimate: u32,
    pub(crate) metrics: ProcessMetrics,
}

impl Process {
    pub fn new(
        pid: Pid,
        program: ProgramId,
        image: &[Word],
        page_size: usize,
        max_quantum: u32,
        now: Tick,
    ) -> Self {
        let pages = image.len().div_ceil(page_size).max(1);
        Self {
            pid,
            program,
            state: ProcessState::Ready,
            regs: CpuState::user(),
            page_table: PageTable::shared(pages),
            backing: Memory::with_image(image, pages * page_size),
            pending_io: None,
            quantum: max_quantum,
            burst_estimate: max_quantum,
            metrics: ProcessMetrics::new(now),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Register snapshot taken at the last interrupt.
    pub fn registers(&self) -> &CpuState {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut CpuState {
        &mut self.regs
    }

    pub fn page_table(&self) -> Ref<'_, PageTable> {
        self.page_table.borrow()
    }

    pub(crate) fn shared_page_table(&self) -> SharedPageTable {
        SharedPageTable::clone(&self.page_table)
    }

    pub fn pages(&self) -> usize {
        self.page_table.borrow().len()
    }

    pub fn backing(&self) -> &Memory {
        &self.backing
    }

    pub fn pending_io(&self) -> Option<PendingIo> {
        self.pending_io
    }

    pub fn quantum(&self) -> u32 {
        self.quantum
    }

    pub fn burst_estimate(&self) -> u32 {
        self.burst_estimate
    }

    pub fn set_burst_estimate(&mut self, estimate: u32) {
        self.burst_estimate = estimate;
    }

    pub fn metrics(&self) -> &ProcessMetrics {
        &self.metrics
    }

    /// Frame backing `page`, if resident.
    pub fn frame_of(&self, page: PageNumber) -> Option<usize> {
        self.page_table.borrow().frame_of(page)
    }
}
