//! Bounded FIFO ring buffer.
//!
//! The queue has no internal locking. Methods take `&mut self`, so sharing
//! one between threads means wrapping it in a lock or pairing it with a
//! [`Semaphore`](super::Semaphore).

use crate::errors::{QueueError, QueueFull};
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Fixed-capacity FIFO queue with heap-allocated storage.
pub struct Queue<T> {
    slots: Box<[Option<T>]>,
    /// Read cursor
    head: usize,
    /// Write cursor
    tail: usize,
    count: usize,
}

impl<T> Queue<T> {
    /// Allocate a queue holding up to `length` elements.
    ///
    /// # Errors
    ///
    /// `ZeroLength` for an empty queue, `AllocationFailed` when the storage
    /// cannot be reserved.
    pub fn create(length: usize) -> Result<Self, QueueError> {
        if length == 0 {
            return Err(QueueError::ZeroLength);
        }
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(length)
            .map_err(|_| QueueError::AllocationFailed)?;
        storage.resize_with(length, || None);

        Ok(Self {
            slots: storage.into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
        })
    }

    /// Append `value` at the tail.
    ///
    /// A full queue is left untouched and the value is handed back.
    pub fn write(&mut self, value: T) -> Result<(), QueueFull<T>> {
        if self.is_full() {
            return Err(QueueFull(value));
        }
        self.slots[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.slots.len();
        self.count += 1;
        Ok(())
    }

    /// Remove the element at the head.
    pub fn read(&mut self) -> Result<T, QueueError> {
        if self.is_empty() {
            return Err(QueueError::Empty);
        }
        let value = self.slots[self.head].take().ok_or(QueueError::Empty)?;
        self.head = (self.head + 1) % self.slots.len();
        self.count -= 1;
        Ok(value)
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Maximum number of elements.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Size in bytes of one element.
    pub const fn element_size(&self) -> usize {
        core::mem::size_of::<T>()
    }
}
