//! Process and system accounting.
//!
//! Every process-state transition closes the current time segment and
//! charges it to exactly one of wait, cpu or blocked time, so that at
//! termination `lifetime == wait_time + cpu_time + blocked_time`.

use core::fmt;
use std::collections::BTreeMap;

use serde::Serialize;
use types::{InterruptCause, Pid, ProgramId, Tick};

use crate::task::ProcessState;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessMetrics {
    pub created_at: Tick,
    /// Start of the current time segment.
    pub state_since: Tick,
    pub cpu_time: Tick,
    pub blocked_time: Tick,
    pub wait_time: Tick,
    pub dispatches: u64,
    pub blocks: u64,
    pub preemptions: u64,
    pub page_faults: u64,
    /// Duration of the most recent block.
    pub last_block: Tick,
    unblocked_at: Option<Tick>,
    pub avg_turnaround: f64,
    pub turnaround_samples: u64,
}

impl ProcessMetrics {
    pub fn new(now: Tick) -> Self {
        Self {
            created_at: now,
            state_since: now,
            ..Self::default()
        }
    }

    fn close_segment(&mut self, now: Tick) -> Tick {
        let elapsed = now.saturating_sub(self.state_since);
        self.state_since = now;
        elapsed
    }

    /// Ready -> Running.
    pub fn dispatched(&mut self, now: Tick) {
        let waited = self.close_segment(now);
        self.wait_time += waited;
        self.dispatches += 1;
        if let Some(unblocked_at) = self.unblocked_at.take() {
            let sample = (now - unblocked_at + self.last_block) as f64;
            self.avg_turnaround = if self.turnaround_samples == 0 {
                sample
            } else {
                (self.avg_turnaround + sample) / 2.0
            };
            self.turnaround_samples += 1;
        }
    }

    /// Running -> Ready. Returns the length of the run just ended.
    pub fn preempted(&mut self, now: Tick) -> Tick {
        let ran = self.close_segment(now);
        self.cpu_time += ran;
        self.preemptions += 1;
        ran
    }

    /// Running -> Blocked. Returns the length of the run just ended.
    pub fn blocked(&mut self, now: Tick) -> Tick {
        let ran = self.close_segment(now);
        self.cpu_time += ran;
        self.blocks += 1;
        ran
    }

    /// Blocked -> Ready.
    pub fn unblocked(&mut self, now: Tick) {
        let duration = self.close_segment(now);
        self.blocked_time += duration;
        self.last_block = duration;
        self.unblocked_at = Some(now);
    }

    /// Charge the open segment according to the state the process dies in.
    pub fn finish(&mut self, now: Tick, state: ProcessState) {
        let pending = self.close_segment(now);
        match state {
            ProcessState::Running => self.cpu_time += pending,
            ProcessState::Ready => self.wait_time += pending,
            ProcessState::Blocked => self.blocked_time += pending,
        }
    }

    pub fn lifetime(&self, now: Tick) -> Tick {
        now.saturating_sub(self.created_at)
    }
}

/// System-wide counters, aggregated across all processes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemMetrics {
    pub interrupts: u64,
    pub interrupts_by_cause: BTreeMap<String, u64>,
    pub syscalls: u64,
    pub page_faults: u64,
    pub evictions: u64,
    pub preemptions: u64,
    pub blocks: u64,
    pub processes_created: u64,
    pub processes_terminated: u64,
    pub failed_creations: u64,
    pub idle_time: Tick,
    idle_since: Option<Tick>,
}

impl SystemMetrics {
    pub fn record_interrupt(&mut self, cause: InterruptCause) {
        self.interrupts += 1;
        *self.interrupts_by_cause.entry(cause.label()).or_insert(0) += 1;
    }

    pub fn enter_idle(&mut self, now: Tick) {
        if self.idle_since.is_none() {
            self.idle_since = Some(now);
        }
    }

    pub fn leave_idle(&mut self, now: Tick) {
        if let Some(since) = self.idle_since.take() {
            self.idle_time += now.saturating_sub(since);
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle_since.is_some()
    }
}

/// Final accounting for one process.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessReport {
    pub pid: Pid,
    pub program: ProgramId,
    pub created_at: Tick,
    pub terminated_at: Tick,
    pub lifetime: Tick,
    pub blocked_time: Tick,
    pub cpu_time: Tick,
    pub wait_time: Tick,
    pub avg_turnaround: f64,
    pub dispatches: u64,
    pub blocks: u64,
    pub preemptions: u64,
    pub page_faults: u64,
}

impl ProcessReport {
    pub fn new(pid: Pid, program: ProgramId, metrics: &ProcessMetrics, now: Tick) -> Self {
        Self {
            pid,
            program,
            created_at: metrics.created_at,
            terminated_at: now,
            lifetime: metrics.lifetime(now),
            blocked_time: metrics.blocked_time,
            cpu_time: metrics.cpu_time,
            wait_time: metrics.wait_time,
            avg_turnaround: metrics.avg_turnaround,
            dispatches: metrics.dispatches,
            blocks: metrics.blocks,
            preemptions: metrics.preemptions,
            page_faults: metrics.page_faults,
        }
    }
}

impl fmt::Display for ProcessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "process {} (program {})", self.pid, self.program)?;
        writeln!(f, "{:<22}{}", "created at:", self.created_at)?;
        writeln!(f, "{:<22}{}", "terminated at:", self.terminated_at)?;
        writeln!(f, "{:<22}{}", "total lifetime:", self.lifetime)?;
        writeln!(f, "{:<22}{}", "blocked time:", self.blocked_time)?;
        writeln!(f, "{:<22}{}", "cpu time:", self.cpu_time)?;
        writeln!(f, "{:<22}{}", "wait time:", self.wait_time)?;
        writeln!(f, "{:<22}{:.2}", "average turnaround:", self.avg_turnaround)?;
        writeln!(f, "{:<22}{}", "dispatches:", self.dispatches)?;
        writeln!(f, "{:<22}{}", "blocks:", self.blocks)?;
        writeln!(f, "{:<22}{}", "preemptions:", self.preemptions)?;
        writeln!(f, "{:<22}{}", "page faults:", self.page_faults)
    }
}

/// Accounting for the whole run, produced once at shutdown.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemReport {
    pub reason: String,
    pub total_time: Tick,
    pub active_time: Tick,
    pub idle_time: Tick,
    pub wall_seconds: f64,
    pub interrupts: u64,
    pub interrupts_by_cause: BTreeMap<String, u64>,
    pub syscalls: u64,
    pub page_faults: u64,
    pub evictions: u64,
    pub preemptions: u64,
    pub blocks: u64,
    pub processes_created: u64,
    pub processes_terminated: u64,
    pub failed_creations: u64,
}

impl SystemReport {
    pub fn new(reason: &str, metrics: &SystemMetrics, now: Tick, wall_seconds: f64) -> Self {
        Self {
            reason: reason.to_string(),
            total_time: now,
            active_time: now.saturating_sub(metrics.idle_time),
            idle_time: metrics.idle_time,
            wall_seconds,
            interrupts: metrics.interrupts,
            interrupts_by_cause: metrics.interrupts_by_cause.clone(),
            syscalls: metrics.syscalls,
            page_faults: metrics.page_faults,
            evictions: metrics.evictions,
            preemptions: metrics.preemptions,
            blocks: metrics.blocks,
            processes_created: metrics.processes_created,
            processes_terminated: metrics.processes_terminated,
            failed_creations: metrics.failed_creations,
        }
    }
}

impl fmt::Display for SystemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "system halted: {}", self.reason)?;
        writeln!(f, "{:<22}{}", "total time:", self.total_time)?;
        writeln!(f, "{:<22}{}", "active time:", self.active_time)?;
        writeln!(f, "{:<22}{}", "idle time:", self.idle_time)?;
        writeln!(f, "{:<22}{:.3}", "wall seconds:", self.wall_seconds)?;
        writeln!(f, "{:<22}{}", "interrupts:", self.interrupts)?;
        for (cause, count) in &self.interrupts_by_cause {
            writeln!(f, "  {:<20}{}", format!("{}:", cause), count)?;
        }
        writeln!(f, "{:<22}{}", "syscalls:", self.syscalls)?;
        writeln!(f, "{:<22}{}", "page faults:", self.page_faults)?;
        writeln!(f, "{:<22}{}", "evictions:", self.evictions)?;
        writeln!(f, "{:<22}{}", "preemptions:", self.preemptions)?;
        writeln!(f, "{:<22}{}", "blocks:", self.blocks)?;
        writeln!(f, "{:<22}{}", "processes created:", self.processes_created)?;
        writeln!(f, "{:<22}{}", "processes terminated:", self.processes_terminated)?;
        writeln!(f, "{:<22}{}", "failed creations:", self.failed_creations)
    }
}
