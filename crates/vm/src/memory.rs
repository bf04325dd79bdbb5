use types::{HwError, Word};

/// Word-addressed memory. Used both as the machine's physical memory and as
/// each process's backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size],
        }
    }

    /// Memory of `size` words whose prefix holds `image`.
    pub fn with_image(image: &[Word], size: usize) -> Self {
        let mut cells = vec![0; size.max(image.len())];
        cells[..image.len()].copy_from_slice(image);
        Self { cells }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn read(&self, addr: usize) -> Result<Word, HwError> {
        self.cells.get(addr).copied().ok_or(HwError::InvalidAddress)
    }

    pub fn write(&mut self, addr: usize, value: Word) -> Result<(), HwError> {
        match self.cells.get_mut(addr) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(HwError::InvalidAddress),
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> Option<&[Word]> {
        if start > end || end > self.cells.len() {
            return None;
        }
        Some(&self.cells[start..end])
    }

    /// Copy `len` words from `src[src_addr..]` into `self[dst_addr..]`.
    pub fn copy_from(
        &mut self,
        dst_addr: usize,
        src: &Memory,
        src_addr: usize,
        len: usize,
    ) -> Result<(), HwError> {
        let words = src
            .slice(src_addr, src_addr + len)
            .ok_or(HwError::InvalidAddress)?;
        let dst = self
            .cells
            .get_mut(dst_addr..dst_addr + len)
            .ok_or(HwError::InvalidAddress)?;
        dst.copy_from_slice(words);
        Ok(())
    }
}
