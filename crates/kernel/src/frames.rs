//! Physical frame allocator.

use serde::Serialize;
use types::{FrameNumber, PageNumber, Pid};

/// The (process, virtual page) a frame currently holds. A plain key into the
/// process table; it keeps nothing alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FrameOwner {
    pub pid: Pid,
    pub page: PageNumber,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub occupied: bool,
    pub owner: Option<FrameOwner>,
    /// Allocation order stamp. Meaningful only while occupied.
    pub order: u64,
}

/// Fixed pool of physical frames with FIFO allocation stamps.
#[derive(Clone, Debug)]
pub struct FrameTable {
    frames: Vec<Frame>,
    next_order: u64,
}

impl FrameTable {
    pub fn new(count: usize) -> Self {
        Self {
            frames: vec![Frame::default(); count],
            next_order: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame: FrameNumber) -> Option<&Frame> {
        self.frames.get(frame)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FrameNumber, &Frame)> + '_ {
        self.frames.iter().enumerate()
    }

    /// Lowest-numbered free frame.
    pub fn find_free(&self) -> Option<FrameNumber> {
        self.frames.iter().position(|f| !f.occupied)
    }

    /// Occupied frame with the smallest allocation stamp.
    pub fn oldest(&self) -> Option<FrameNumber> {
        self.iter()
            .filter(|(_, f)| f.occupied)
            .min_by_key(|(_, f)| f.order)
            .map(|(n, _)| n)
    }

    pub fn occupied_count(&self) -> usize {
        self.frames.iter().filter(|f| f.occupied).count()
    }

    /// Stamp that the next `occupy` will hand out.
    pub fn next_order(&self) -> u64 {
        self.next_order
    }

    /// Frame holding `page` of `pid`, if any.
    pub fn owned_by(&self, pid: Pid, page: PageNumber) -> Option<FrameNumber> {
        let key = FrameOwner { pid, page };
        self.frames
            .iter()
            .position(|f| f.occupied && f.owner == Some(key))
    }

    /// Mark `frame` as holding `page` of `pid`. Returns the allocation stamp,
    /// or `None` if the frame does not exist.
    pub fn occupy(&mut self, frame: FrameNumber, pid: Pid, page: PageNumber) -> Option<u64> {
        let order = self.next_order;
        let slot = self.frames.get_mut(frame)?;
        *slot = Frame {
            occupied: true,
            owner: Some(FrameOwner { pid, page }),
            order,
        };
        self.next_order += 1;
        Some(order)
    }

    /// Free `frame`, returning its former owner.
    pub fn release(&mut self, frame: FrameNumber) -> Option<FrameOwner> {
        let slot = self.frames.get_mut(frame)?;
        let owner = slot.owner.take();
        *slot = Frame::default();
        owner
    }

    /// Free every frame owned by `pid`. Returns the released frame numbers.
    pub fn release_owned_by(&mut self, pid: Pid) -> Vec<FrameNumber> {
        let owned: Vec<FrameNumber> = self
            .iter()
            .filter(|(_, f)| f.owner.is_some_and(|o| o.pid == pid))
            .map(|(n, _)| n)
            .collect();
        for &frame in &owned {
            self.release(frame);
        }
        owned
    }
}
