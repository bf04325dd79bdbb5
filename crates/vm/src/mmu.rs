use core::cell::RefCell;
use std::rc::Rc;

use types::{FrameNumber, HwError, PageNumber, Word};

use crate::memory::Memory;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageTableEntry {
    pub frame: FrameNumber,
    pub valid: bool,
}

/// Per-process map from virtual page to physical frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageTable {
    entries: Vec<PageTableEntry>,
}

/// A page table is owned by its process and shared with the MMU while that
/// process is dispatched, so kernel updates are visible to translation at once.
pub type SharedPageTable = Rc<RefCell<PageTable>>;

impl PageTable {
    /// Table of `pages` entries, all invalid.
    pub fn new(pages: usize) -> Self {
        Self {
            entries: vec![PageTableEntry::default(); pages],
        }
    }

    pub fn shared(pages: usize) -> SharedPageTable {
        Rc::new(RefCell::new(Self::new(pages)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, page: PageNumber) -> Option<PageTableEntry> {
        self.entries.get(page).copied()
    }

    /// Frame backing `page`, if the page is resident.
    pub fn frame_of(&self, page: PageNumber) -> Option<FrameNumber> {
        self.entries
            .get(page)
            .filter(|e| e.valid)
            .map(|e| e.frame)
    }

    pub fn map(&mut self, page: PageNumber, frame: FrameNumber) -> Result<(), HwError> {
        let entry = self.entries.get_mut(page).ok_or(HwError::InvalidPage)?;
        entry.frame = frame;
        entry.valid = true;
        Ok(())
    }

    pub fn invalidate(&mut self, page: PageNumber) -> Result<(), HwError> {
        let entry = self.entries.get_mut(page).ok_or(HwError::InvalidPage)?;
        entry.valid = false;
        Ok(())
    }

    /// Resident pages as `(page, frame)` pairs.
    pub fn resident(&self) -> impl Iterator<Item = (PageNumber, FrameNumber)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.valid)
            .map(|(page, e)| (page, e.frame))
    }
}

/// Address translation unit.
///
/// With no page table active, addresses are physical (supervisor access).
#[derive(Debug)]
pub struct Mmu {
    page_size: usize,
    table: Option<SharedPageTable>,
    last_fault: Word,
}

impl Mmu {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            table: None,
            last_fault: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn activate_page_table(&mut self, table: SharedPageTable) {
        self.table = Some(table);
    }

    pub fn deactivate(&mut self) {
        self.table = None;
    }

    pub fn active_table(&self) -> Option<&SharedPageTable> {
        self.table.as_ref()
    }

    /// Virtual address of the most recent failed translation.
    pub fn last_fault_address(&self) -> Word {
        self.last_fault
    }

    pub fn translate(&mut self, vaddr: Word) -> Result<usize, HwError> {
        let Some(table) = &self.table else {
            return usize::try_from(vaddr).map_err(|_| HwError::InvalidAddress);
        };
        let Ok(addr) = usize::try_from(vaddr) else {
            self.last_fault = vaddr;
            return Err(HwError::InvalidPage);
        };
        let page = addr / self.page_size;
        let offset = addr % self.page_size;
        match table.borrow().entry(page) {
            None => {
                self.last_fault = vaddr;
                Err(HwError::InvalidPage)
            }
            Some(entry) if !entry.valid => {
                self.last_fault = vaddr;
                Err(HwError::PageFault)
            }
            Some(entry) => Ok(entry.frame * self.page_size + offset),
        }
    }

    pub fn read(&mut self, memory: &Memory, vaddr: Word) -> Result<Word, HwError> {
        let addr = self.translate(vaddr)?;
        memory.read(addr)
    }

    pub fn write(&mut self, memory: &mut Memory, vaddr: Word, value: Word) -> Result<(), HwError> {
        let addr = self.translate(vaddr)?;
        memory.write(addr, value)
    }
}
