//! Operand stack

use crate::error::{VmError, VmResult};
use crate::word::Word;

/// Maximum stack depth
pub const STACK_LIMIT: usize = 1024;

/// Bounded operand stack of one call frame.
///
/// Failed operations leave the stack untouched.
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<Word>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(STACK_LIMIT),
        }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: Word) -> VmResult<()> {
        if self.data.len() >= STACK_LIMIT {
            return Err(VmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> VmResult<Word> {
        self.data.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pop `N` values, top first
    pub fn pop_n<const N: usize>(&mut self) -> VmResult<[Word; N]> {
        if self.data.len() < N {
            return Err(VmError::StackUnderflow);
        }
        let mut out = [Word::zero(); N];
        for slot in out.iter_mut() {
            *slot = self.pop()?;
        }
        Ok(out)
    }

    /// Top of the stack
    pub fn peek(&self) -> VmResult<&Word> {
        self.data.last().ok_or(VmError::StackUnderflow)
    }

    /// n-th element from the top (0 = top), without removing it
    pub fn back(&self, n: usize) -> VmResult<&Word> {
        if n >= self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        Ok(&self.data[self.data.len() - 1 - n])
    }

    /// Push a copy of the n-th element (1 = top)
    pub fn dup(&mut self, n: usize) -> VmResult<()> {
        if n == 0 || n > self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        let value = self.data[self.data.len() - n];
        self.push(value)
    }

    /// Swap the top with the (n+1)-th element (1 = second)
    pub fn swap(&mut self, n: usize) -> VmResult<()> {
        if n == 0 || n >= self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Get current stack size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(n: u64) -> Word {
        Word::from(n)
    }

    #[test]
    fn test_stack_push_pop() {
        let mut stack = Stack::new();
        stack.push(w(1)).unwrap();
        stack.push(w(2)).unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap(), w(2));
        assert_eq!(stack.pop().unwrap(), w(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_stack_underflow_leaves_stack_unchanged() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(VmError::StackUnderflow));
        stack.push(w(9)).unwrap();
        assert_eq!(stack.pop_n::<2>(), Err(VmError::StackUnderflow));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.back(1), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_stack_overflow_on_limit_plus_one() {
        let mut stack = Stack::new();
        for i in 0..STACK_LIMIT {
            stack.push(w(i as u64)).unwrap();
        }
        assert_eq!(stack.push(w(0)), Err(VmError::StackOverflow));
        assert_eq!(stack.len(), STACK_LIMIT);
        assert_eq!(*stack.peek().unwrap(), w(STACK_LIMIT as u64 - 1));
        assert_eq!(stack.dup(1), Err(VmError::StackOverflow));
    }

    #[test]
    fn test_stack_back() {
        let mut stack = Stack::new();
        for i in 1..=3 {
            stack.push(w(i)).unwrap();
        }
        assert_eq!(*stack.back(0).unwrap(), w(3));
        assert_eq!(*stack.back(2).unwrap(), w(1));
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_stack_pop_n_order() {
        let mut stack = Stack::new();
        for i in 1..=3 {
            stack.push(w(i)).unwrap();
        }
        let [a, b] = stack.pop_n::<2>().unwrap();
        assert_eq!((a, b), (w(3), w(2)));
    }

    #[test]
    fn test_stack_dup_swap() {
        let mut stack = Stack::new();
        stack.push(w(1)).unwrap();
        stack.push(w(2)).unwrap();
        stack.dup(2).unwrap();
        assert_eq!(*stack.peek().unwrap(), w(1));
        stack.swap(1).unwrap();
        assert_eq!(*stack.peek().unwrap(), w(2));
        assert_eq!(*stack.back(1).unwrap(), w(1));
        assert_eq!(stack.swap(3), Err(VmError::StackUnderflow));
        assert_eq!(stack.dup(0), Err(VmError::StackUnderflow));
    }
}
