//! Process selection policies.
//!
//! Both policies preempt the running process only once its quantum is used
//! up and someone else is ready. They differ in who gets picked next.

use core::fmt;

use types::{Pid, SchedulerKind, Tick};

use crate::task::{Process, ProcessTable};

pub trait Scheduler: fmt::Debug {
    /// Policy name as it appears in logs and reports.
    fn name(&self) -> &'static str;

    /// Choose among the ready processes. `None` when the ready queue is empty.
    fn select_next(&self, table: &ProcessTable) -> Option<Pid>;

    /// Timer interrupt while `process` is running.
    fn on_tick(&mut self, process: &mut Process) {
        process.quantum = process.quantum.saturating_sub(1);
    }

    /// `process` is leaving the CPU (preempted or blocked) after running
    /// for `ran` clock ticks.
    fn on_preempt_or_block(&mut self, _process: &mut Process, _ran: Tick) {}

    fn on_dispatch(&mut self, process: &mut Process) {
        process.quantum = self.max_quantum();
    }

    /// Timer interrupts a process may run before it can be preempted.
    fn max_quantum(&self) -> u32;

    /// Should the running process give up the CPU now?
    fn should_preempt(&self, running: &Process, table: &ProcessTable) -> bool {
        running.quantum == 0 && !table.ready().is_empty()
    }
}

/// Build the policy named by the configuration.
pub fn from_kind(kind: SchedulerKind, max_quantum: u32) -> Box<dyn Scheduler> {
    match kind {
        SchedulerKind::RoundRobin => Box::new(RoundRobin::new(max_quantum)),
        SchedulerKind::Shortest => Box::new(ShortestBurst::new(max_quantum)),
    }
}

/// Strict FIFO over the ready queue.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    max_quantum: u32,
}

impl RoundRobin {
    pub fn new(max_quantum: u32) -> Self {
        Self { max_quantum }
    }
}

impl Scheduler for RoundRobin {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn select_next(&self, table: &ProcessTable) -> Option<Pid> {
        table.ready().front().copied()
    }

    fn max_quantum(&self) -> u32 {
        self.max_quantum
    }
}

/// Picks the ready process with the smallest burst estimate. Ties go to the
/// one closest to the head of the ready queue.
#[derive(Debug, Clone)]
pub struct ShortestBurst {
    max_quantum: u32,
}

impl ShortestBurst {
    pub fn new(max_quantum: u32) -> Self {
        Self { max_quantum }
    }

    /// Exponential smoothing with weight 1/2.
    pub fn smooth(estimate: u32, actual: Tick) -> u32 {
        let smoothed = (u64::from(estimate) + actual) / 2;
        u32::try_from(smoothed).unwrap_or(u32::MAX)
    }
}

impl Scheduler for ShortestBurst {
    fn name(&self) -> &'static str {
        "shortest"
    }

    fn select_next(&self, table: &ProcessTable) -> Option<Pid> {
        let mut best: Option<&Process> = None;
        for process in table.ready_processes() {
            if best.is_none_or(|b| process.burst_estimate < b.burst_estimate) {
                best = Some(process);
            }
        }
        best.map(Process::pid)
    }

    fn on_preempt_or_block(&mut self, process: &mut Process, ran: Tick) {
        process.burst_estimate = Self::smooth(process.burst_estimate, ran);
    }

    fn max_quantum(&self) -> u32 {
        self.max_quantum
    }
}
