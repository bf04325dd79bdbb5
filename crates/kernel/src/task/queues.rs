use std::collections::{BTreeMap, VecDeque};

use types::Pid;

use super::process::{Process, ProcessState};

/// Arena of live processes plus their placement.
///
/// Every live process is in exactly one of: the running slot, the ready
/// queue (FIFO), or the blocked queue. The `state` field of each process
/// mirrors its placement; only this table changes it.
#[derive(Debug, Default)]
pub struct ProcessTable {
    procs: BTreeMap<Pid, Process>,
    ready: VecDeque<Pid>,
    blocked: VecDeque<Pid>,
    running: Option<Pid>,
    next_pid: u32,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            next_pid: 1,
            ..Self::default()
        }
    }

    /// Hand out the next pid. Pids are never reused.
    pub fn allocate_pid(&mut self) -> Pid {
        let pid = Pid(self.next_pid);
        self.next_pid += 1;
        pid
    }

    /// Add a new process at the tail of the ready queue.
    pub fn insert(&mut self, mut process: Process) {
        let pid = process.pid();
        process.state = ProcessState::Ready;
        self.procs.insert(pid, process);
        self.ready.push_back(pid);
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.procs.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.procs.get_mut(&pid)
    }

    pub fn running(&self) -> Option<Pid> {
        self.running
    }

    pub fn running_process(&self) -> Option<&Process> {
        self.running.and_then(|pid| self.procs.get(&pid))
    }

    pub fn running_process_mut(&mut self) -> Option<&mut Process> {
        self.running.and_then(|pid| self.procs.get_mut(&pid))
    }

    pub fn ready(&self) -> &VecDeque<Pid> {
        &self.ready
    }

    pub fn blocked(&self) -> &VecDeque<Pid> {
        &self.blocked
    }

    /// Ready processes in queue order.
    pub fn ready_processes(&self) -> impl Iterator<Item = &Process> + '_ {
        self.ready.iter().filter_map(|pid| self.procs.get(pid))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> + '_ {
        self.procs.values()
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.procs.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    /// True when nothing is running, ready or blocked.
    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    /// Move a ready process into the running slot. Fails if the slot is taken
    /// or `pid` is not ready.
    pub fn set_running(&mut self, pid: Pid) -> bool {
        if self.running.is_some() {
            return false;
        }
        let Some(pos) = self.ready.iter().position(|&p| p == pid) else {
            return false;
        };
        self.ready.remove(pos);
        self.running = Some(pid);
        if let Some(process) = self.procs.get_mut(&pid) {
            process.state = ProcessState::Running;
        }
        true
    }

    /// Running -> tail of the ready queue.
    pub fn preempt_running(&mut self) -> Option<Pid> {
        let pid = self.running.take()?;
        if let Some(process) = self.procs.get_mut(&pid) {
            process.state = ProcessState::Ready;
        }
        self.ready.push_back(pid);
        Some(pid)
    }

    /// Running -> blocked queue.
    pub fn block_running(&mut self) -> Option<Pid> {
        let pid = self.running.take()?;
        if let Some(process) = self.procs.get_mut(&pid) {
            process.state = ProcessState::Blocked;
        }
        self.blocked.push_back(pid);
        Some(pid)
    }

    /// Blocked -> tail of the ready queue.
    pub fn unblock(&mut self, pid: Pid) -> bool {
        let Some(pos) = self.blocked.iter().position(|&p| p == pid) else {
            return false;
        };
        self.blocked.remove(pos);
        if let Some(process) = self.procs.get_mut(&pid) {
            process.state = ProcessState::Ready;
            process.pending_io = None;
        }
        self.ready.push_back(pid);
        true
    }

    /// Take a process out of the table, whatever its placement.
    pub fn remove(&mut self, pid: Pid) -> Option<Process> {
        if self.running == Some(pid) {
            self.running = None;
        }
        self.ready.retain(|&p| p != pid);
        self.blocked.retain(|&p| p != pid);
        self.procs.remove(&pid)
    }

    /// Check that every process sits in exactly one place, matching its state.
    pub fn check_placement(&self) -> Result<(), String> {
        let mut seen = BTreeMap::new();
        let places = self
            .running
            .iter()
            .map(|&pid| (pid, ProcessState::Running))
            .chain(self.ready.iter().map(|&pid| (pid, ProcessState::Ready)))
            .chain(self.blocked.iter().map(|&pid| (pid, ProcessState::Blocked)));
        for (pid, place) in places {
            if let Some(previous) = seen.insert(pid, place) {
                return Err(format!("{:?} is both {:?} and {:?}", pid, previous, place));
            }
            match self.procs.get(&pid) {
                None => return Err(format!("{:?} is queued but not in the table", pid)),
                Some(p) if p.state != place => {
                    return Err(format!("{:?} is {:?} but queued as {:?}", pid, p.state, place));
                }
                Some(_) => {}
            }
        }
        if seen.len() != self.procs.len() {
            return Err(format!(
                "{} processes in the table but {} placed",
                self.procs.len(),
                seen.len()
            ));
        }
        Ok(())
    }
}
