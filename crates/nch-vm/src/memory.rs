//! Frame memory

use crate::error::{VmError, VmResult};
use crate::word::{self, Word, WORD_SIZE};

/// Byte-addressable memory of one call frame.
///
/// The length is always a multiple of the word size and never shrinks.
/// `last_gas_cost` records the total expansion cost already billed for the
/// current size, so that only the increment is charged on growth.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
    last_gas_cost: u64,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Current size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no memory has been touched
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total expansion gas billed so far
    pub fn last_gas_cost(&self) -> u64 {
        self.last_gas_cost
    }

    pub(crate) fn set_last_gas_cost(&mut self, cost: u64) {
        self.last_gas_cost = cost;
    }

    /// Grow to at least `size` bytes, rounded up to a whole word
    pub fn resize(&mut self, size: u64) {
        let aligned = word::to_word_size(size).saturating_mul(WORD_SIZE) as usize;
        if aligned > self.data.len() {
            self.data.resize(aligned, 0);
        }
    }

    fn check(&self, offset: u64, size: u64) -> VmResult<(usize, usize)> {
        let end = offset.checked_add(size).ok_or(VmError::MemoryOutOfBounds)?;
        if end > self.data.len() as u64 {
            return Err(VmError::MemoryOutOfBounds);
        }
        Ok((offset as usize, end as usize))
    }

    /// Write `size` bytes at `offset` from `value`.
    ///
    /// `value` may be shorter than `size`; only its bytes are copied.
    pub fn set(&mut self, offset: u64, size: u64, value: &[u8]) -> VmResult<()> {
        if size == 0 {
            return Ok(());
        }
        let (start, end) = self.check(offset, size)?;
        let n = value.len().min(end - start);
        self.data[start..start + n].copy_from_slice(&value[..n]);
        Ok(())
    }

    /// Write a word, big-endian, at `offset`
    pub fn set32(&mut self, offset: u64, value: &Word) -> VmResult<()> {
        let (start, end) = self.check(offset, WORD_SIZE)?;
        value.to_big_endian(&mut self.data[start..end]);
        Ok(())
    }

    /// Write a single byte
    pub fn set_byte(&mut self, offset: u64, value: u8) -> VmResult<()> {
        let (start, _) = self.check(offset, 1)?;
        self.data[start] = value;
        Ok(())
    }

    /// Owned copy of a range; empty when `size` is zero
    pub fn get_copy(&self, offset: u64, size: u64) -> VmResult<Vec<u8>> {
        Ok(self.get_ptr(offset, size)?.to_vec())
    }

    /// Borrowed view of a range; empty when `size` is zero
    pub fn get_ptr(&self, offset: u64, size: u64) -> VmResult<&[u8]> {
        if size == 0 {
            return Ok(&[]);
        }
        let (start, end) = self.check(offset, size)?;
        Ok(&self.data[start..end])
    }

    /// Word stored at `offset`
    pub fn get_word(&self, offset: u64) -> VmResult<Word> {
        Ok(Word::from_big_endian(self.get_ptr(offset, WORD_SIZE)?))
    }

    /// Raw contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_rounds_to_words_and_never_shrinks() {
        let mut mem = Memory::new();
        mem.resize(1);
        assert_eq!(mem.len(), 32);
        mem.resize(33);
        assert_eq!(mem.len(), 64);
        mem.resize(10);
        assert_eq!(mem.len(), 64);
        mem.resize(0);
        assert_eq!(mem.len(), 64);
    }

    #[test]
    fn test_set32_get_word() {
        let mut mem = Memory::new();
        mem.resize(64);
        mem.set32(16, &Word::from(0xabcdu64)).unwrap();
        assert_eq!(mem.get_word(16).unwrap(), Word::from(0xabcdu64));
        assert_eq!(mem.data()[47], 0xcd);
        assert_eq!(mem.data()[46], 0xab);
    }

    #[test]
    fn test_set_copies_shorter_value() {
        let mut mem = Memory::new();
        mem.resize(32);
        mem.set(0, 4, &[1, 2]).unwrap();
        assert_eq!(mem.get_copy(0, 4).unwrap(), vec![1, 2, 0, 0]);
    }

    #[test]
    fn test_access_without_resize_is_reported() {
        let mut mem = Memory::new();
        assert_eq!(mem.set32(0, &Word::one()), Err(VmError::MemoryOutOfBounds));
        assert_eq!(mem.get_copy(0, 1), Err(VmError::MemoryOutOfBounds));
        assert_eq!(mem.get_copy(u64::MAX, 2), Err(VmError::MemoryOutOfBounds));
        assert_eq!(mem.get_copy(100, 0), Ok(Vec::new()));
        mem.resize(32);
        assert_eq!(mem.set_byte(32, 1), Err(VmError::MemoryOutOfBounds));
        assert!(mem.set_byte(31, 1).is_ok());
    }
}
