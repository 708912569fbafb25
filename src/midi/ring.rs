// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Lock-free single-producer/single-consumer message queue.
//!
//! The producer is the driver callback, which may run on a real-time OS
//! thread and must never block, so there is no mutex anywhere in here.
//! Cursors and slots are atomics with sequentially consistent ordering: a
//! slot write is always visible before the cursor increment that publishes it.
//!
//! Each slot holds one [`MidiMessage`] packed into a single `AtomicU64`, so a
//! slot is always read or written whole.
//!
//! # Usage contract
//!
//! Exactly one context may call [`RingBuffer::push`] and exactly one context
//! may call [`RingBuffer::pop`]. Calling either from more than one thread at a
//! time is a misuse; it cannot corrupt memory but messages may be lost or
//! duplicated.
//!
//! # Overflow
//!
//! The writer never looks at the read cursor. When the reader falls more than
//! `capacity` messages behind, the oldest unread slots have already been
//! overwritten. The reader then skips forward so each surviving slot is read
//! once, and counts the skipped messages in [`RingBuffer::dropped`]. A write
//! that races a read of the same slot may hand the reader the newer message.
//! Overflow is silent data loss, never an error.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::MidiMessage;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 128;

/// Fixed-capacity circular queue of messages.
#[derive(Debug)]
pub struct RingBuffer {
    slots: Box<[AtomicU64]>,
    /// Only mutated by the writer.
    write_index: AtomicUsize,
    /// Only mutated by the reader.
    read_index: AtomicUsize,
    /// Only mutated by the reader.
    dropped: AtomicUsize,
}

impl RingBuffer {
    /// Create a buffer holding `capacity` messages (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity.max(1)).map(|_| AtomicU64::new(0)).collect();
        Self {
            slots,
            write_index: AtomicUsize::new(0),
            read_index: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Append a message. Writer side only.
    #[inline]
    pub fn push(&self, msg: MidiMessage) {
        let write = self.write_index.load(Ordering::SeqCst);
        self.slots[write % self.capacity()].store(msg.pack(), Ordering::SeqCst);
        self.write_index.store(write.wrapping_add(1), Ordering::SeqCst);
    }

    /// Take the oldest unread message, or `None` if nothing is pending.
    /// Reader side only.
    #[inline]
    pub fn pop(&self) -> Option<MidiMessage> {
        let write = self.write_index.load(Ordering::SeqCst);
        let mut read = self.read_index.load(Ordering::SeqCst);
        if write == read {
            return None;
        }

        let behind = write.wrapping_sub(read);
        if behind > self.capacity() {
            let lost = behind - self.capacity();
            self.dropped.fetch_add(lost, Ordering::SeqCst);
            read = read.wrapping_add(lost);
        }

        let word = self.slots[read % self.capacity()].load(Ordering::SeqCst);
        self.read_index.store(read.wrapping_add(1), Ordering::SeqCst);
        Some(MidiMessage::unpack(word))
    }

    /// Messages waiting to be read, capped at capacity.
    pub fn len(&self) -> usize {
        let write = self.write_index.load(Ordering::SeqCst);
        let read = self.read_index.load(Ordering::SeqCst);
        write.wrapping_sub(read).min(self.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total messages lost to overflow so far.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Discard everything pending. Reader side only.
    pub fn clear(&self) {
        let write = self.write_index.load(Ordering::SeqCst);
        self.read_index.store(write, Ordering::SeqCst);
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
