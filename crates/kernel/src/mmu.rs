//! Demand paging: page-fault service and frame eviction.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use types::{EvictionKind, FrameNumber, Logger, PageNumber, Pid, Word, log, trace};
use vm::Memory;

use crate::error::KernelError;
use crate::frames::{FrameOwner, FrameTable};
use crate::task::ProcessTable;

/// What a serviced page fault did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultOutcome {
    pub page: PageNumber,
    pub frame: FrameNumber,
    /// Page pushed out to make room, if memory was full.
    pub evicted: Option<FrameOwner>,
}

#[derive(Debug)]
pub struct VmManager {
    policy: EvictionKind,
    page_size: usize,
    rng: StdRng,
    log: Logger,
}

impl VmManager {
    pub fn new(policy: EvictionKind, page_size: usize, seed: u64, log: Logger) -> Self {
        Self {
            policy,
            page_size,
            rng: StdRng::seed_from_u64(seed),
            log: log.scoped("vm"),
        }
    }

    pub fn policy(&self) -> EvictionKind {
        self.policy
    }

    /// Bring the page containing `address` of process `pid` into a frame,
    /// evicting another page when no frame is free.
    pub fn handle_page_fault(
        &mut self,
        frames: &mut FrameTable,
        procs: &mut ProcessTable,
        memory: &mut Memory,
        pid: Pid,
        address: Word,
    ) -> Result<FaultOutcome, KernelError> {
        let ps = self.page_size;
        if address < 0 {
            return Err(KernelError::InvalidPage { pid, address });
        }
        let page = address as usize / ps;
        let pages = procs.get(pid).ok_or(KernelError::UnknownProcess(pid))?.pages();
        if page >= pages {
            return Err(KernelError::PageOutOfRange { pid, page });
        }

        let (frame, evicted) = match frames.find_free() {
            Some(frame) => (frame, None),
            None => {
                let victim = self.choose_victim(frames).ok_or(KernelError::NoFrames)?;
                let owner = self.evict(frames, procs, memory, victim)?;
                (victim, owner)
            }
        };

        let process = procs.get_mut(pid).ok_or(KernelError::UnknownProcess(pid))?;
        memory.copy_from(frame * ps, &process.backing, page * ps, ps)?;
        process.shared_page_table().borrow_mut().map(page, frame)?;
        let order = frames
            .occupy(frame, pid, page)
            .ok_or(KernelError::NoFrames)?;
        process.metrics.page_faults += 1;

        trace!(
            self.log,
            "{:?} page {} -> frame {} (order {})",
            pid,
            page,
            frame,
            order
        );
        Ok(FaultOutcome {
            page,
            frame,
            evicted,
        })
    }

    fn choose_victim(&mut self, frames: &FrameTable) -> Option<FrameNumber> {
        match self.policy {
            EvictionKind::Fifo => frames.oldest(),
            EvictionKind::Random => {
                let occupied: Vec<FrameNumber> = frames
                    .iter()
                    .filter(|(_, f)| f.occupied)
                    .map(|(n, _)| n)
                    .collect();
                if occupied.is_empty() {
                    return None;
                }
                Some(occupied[self.rng.gen_range(0..occupied.len())])
            }
        }
    }

    /// Invalidate the victim's mapping, write its contents back to the
    /// owner's backing store, and free the frame.
    fn evict(
        &mut self,
        frames: &mut FrameTable,
        procs: &mut ProcessTable,
        memory: &Memory,
        frame: FrameNumber,
    ) -> Result<Option<FrameOwner>, KernelError> {
        let ps = self.page_size;
        let owner = frames.get(frame).and_then(|f| f.owner);
        if let Some(FrameOwner { pid, page }) = owner {
            if let Some(victim) = procs.get_mut(pid) {
                victim.shared_page_table().borrow_mut().invalidate(page)?;
                victim.backing.copy_from(page * ps, memory, frame * ps, ps)?;
            }
            log!(self.log, "evicted {:?} page {} from frame {}", pid, page, frame);
        }
        frames.release(frame);
        Ok(owner)
    }
}
