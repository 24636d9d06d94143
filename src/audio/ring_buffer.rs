//! Bounded rolling window of recent audio blocks.
//!
//! The capture callback pushes one block per delivery; the transcription
//! thread drains everything at once. Overflow evicts the oldest block, so
//! the buffer always holds the most recent `capacity` blocks of speech.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// One capture delivery: mono 16-bit PCM samples of one block duration.
pub type AudioBlock = Vec<i16>;

/// Bounded FIFO of audio blocks shared between the capture callback
/// (producer) and the transcription thread (consumer).
///
/// Push and drain are mutually exclusive; a block pushed concurrently with
/// a drain lands in either the current window or the next one, never both,
/// never neither. A push wakes a consumer blocked in
/// [`wait_until_nonempty`](Self::wait_until_nonempty).
pub struct AudioRingBuffer {
    blocks: Mutex<VecDeque<AudioBlock>>,
    nonempty: Condvar,
    capacity: usize,
}

impl AudioRingBuffer {
    /// Creates a buffer holding at most `capacity` blocks (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            nonempty: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends a block, evicting the oldest one when full.
    pub fn push(&self, block: AudioBlock) {
        let mut blocks = self.lock();
        if blocks.len() == self.capacity {
            blocks.pop_front();
        }
        blocks.push_back(block);
        drop(blocks);
        self.nonempty.notify_one();
    }

    /// Returns the concatenation of all held blocks in arrival order and
    /// atomically empties the buffer. An empty buffer yields an empty
    /// window.
    pub fn drain(&self) -> Vec<i16> {
        let mut blocks = self.lock();
        blocks.drain(..).flatten().collect()
    }

    /// Blocks until the buffer is non-empty or the timeout elapses.
    ///
    /// Returns whether the buffer held at least one block on wake-up. The
    /// timeout bounds the wait so the caller can observe shutdown; see
    /// [`wake_all`](Self::wake_all).
    pub fn wait_until_nonempty(&self, timeout: Duration) -> bool {
        let blocks = self.lock();
        if !blocks.is_empty() {
            return true;
        }
        let result = self
            .nonempty
            .wait_timeout_while(blocks, timeout, |blocks| blocks.is_empty());
        match result {
            Ok((blocks, _)) => !blocks.is_empty(),
            Err(poisoned) => !poisoned.into_inner().0.is_empty(),
        }
    }

    /// Wakes every waiter regardless of buffer state. Called on shutdown so
    /// a consumer parked in [`wait_until_nonempty`](Self::wait_until_nonempty)
    /// re-checks its running flag promptly.
    pub fn wake_all(&self) {
        self.nonempty.notify_all();
    }

    /// Whether the buffer currently holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of blocks currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Maximum number of blocks held before eviction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AudioBlock>> {
        // Plain sample data; continuing past a poisoned lock is sound.
        match self.blocks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_drain_on_empty_buffer_returns_empty_window() {
        let buffer = AudioRingBuffer::new(5);
        assert_eq!(buffer.drain(), Vec::<i16>::new());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_concatenates_in_arrival_order() {
        let buffer = AudioRingBuffer::new(5);
        buffer.push(vec![1, 2]);
        buffer.push(vec![3, 4]);
        buffer.push(vec![5]);

        assert_eq!(buffer.drain(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_drain_empties_the_buffer() {
        let buffer = AudioRingBuffer::new(5);
        buffer.push(vec![1, 2, 3]);

        assert!(!buffer.drain().is_empty());
        assert!(buffer.is_empty());
        assert_eq!(buffer.drain(), Vec::<i16>::new());
    }

    #[test]
    fn test_overflow_evicts_oldest_first() {
        // Capacity 3, push 4 blocks: drain returns the 3 most recent.
        let buffer = AudioRingBuffer::new(3);
        buffer.push(vec![1]);
        buffer.push(vec![2]);
        buffer.push(vec![3]);
        buffer.push(vec![4]);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.drain(), vec![2, 3, 4]);
    }

    #[test]
    fn test_capacity_is_at_least_one() {
        let buffer = AudioRingBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);

        buffer.push(vec![1]);
        buffer.push(vec![2]);
        assert_eq!(buffer.drain(), vec![2]);
    }

    #[test]
    fn test_wait_returns_true_when_data_already_present() {
        let buffer = AudioRingBuffer::new(5);
        buffer.push(vec![1]);
        assert!(buffer.wait_until_nonempty(Duration::from_millis(1)));
    }

    #[test]
    fn test_wait_times_out_on_empty_buffer() {
        let buffer = AudioRingBuffer::new(5);
        assert!(!buffer.wait_until_nonempty(Duration::from_millis(10)));
    }

    #[test]
    fn test_push_wakes_a_waiting_consumer() {
        let buffer = Arc::new(AudioRingBuffer::new(5));

        let consumer = {
            let buffer = buffer.clone();
            thread::spawn(move || buffer.wait_until_nonempty(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(20));
        buffer.push(vec![7]);

        assert!(consumer.join().expect("consumer panicked"));
    }

    #[test]
    fn test_wake_all_releases_waiter_without_data() {
        let buffer = Arc::new(AudioRingBuffer::new(5));

        let consumer = {
            let buffer = buffer.clone();
            thread::spawn(move || buffer.wait_until_nonempty(Duration::from_millis(200)))
        };

        thread::sleep(Duration::from_millis(20));
        buffer.wake_all();

        // Spurious wake with an empty buffer: waiter keeps waiting until the
        // timeout, then reports no data.
        assert!(!consumer.join().expect("consumer panicked"));
    }

    #[test]
    fn test_no_block_lost_across_concurrent_drains() {
        // A producer pushes numbered blocks while a consumer drains
        // repeatedly. Every pushed sample must show up in exactly one
        // window, in order.
        let buffer = Arc::new(AudioRingBuffer::new(1024));
        const BLOCKS: i16 = 500;

        let producer = {
            let buffer = buffer.clone();
            thread::spawn(move || {
                for i in 0..BLOCKS {
                    buffer.push(vec![i]);
                }
            })
        };

        let mut collected = Vec::new();
        while collected.len() < BLOCKS as usize {
            collected.extend(buffer.drain());
            thread::yield_now();
        }
        producer.join().expect("producer panicked");
        collected.extend(buffer.drain());

        let expected: Vec<i16> = (0..BLOCKS).collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn test_eviction_under_concurrent_pressure_keeps_most_recent() {
        let buffer = Arc::new(AudioRingBuffer::new(4));
        for i in 0..100i16 {
            buffer.push(vec![i]);
        }
        assert_eq!(buffer.drain(), vec![96, 97, 98, 99]);
    }
}
