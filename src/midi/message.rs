// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Decoded MIDI message value.

use std::fmt;

use super::status::{is_channel_message, length_for};

/// One framed MIDI message.
///
/// `data2` is only meaningful for 3-byte messages and `data1` only for 2 and
/// 3-byte messages; unused bytes are zero. `timestamp_ms` counts milliseconds
/// since the port's connection was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MidiMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    pub timestamp_ms: u32,
}

impl MidiMessage {
    pub const fn new(status: u8, data1: u8, data2: u8, timestamp_ms: u32) -> Self {
        Self {
            status,
            data1,
            data2,
            timestamp_ms,
        }
    }

    /// Number of significant bytes, as decided by the status byte.
    pub const fn byte_len(&self) -> usize {
        length_for(self.status)
    }

    /// Channel (0-15) for channel voice messages.
    pub const fn channel(&self) -> Option<u8> {
        if is_channel_message(self.status) {
            Some(self.status & 0x0F)
        } else {
            None
        }
    }

    /// Message type: upper nibble for channel messages, the full byte for
    /// system messages.
    pub const fn kind(&self) -> u8 {
        if is_channel_message(self.status) {
            self.status & 0xF0
        } else {
            self.status
        }
    }

    /// Raw bytes; only the first [`byte_len`](Self::byte_len) are significant.
    pub const fn raw(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    /// Significant bytes as an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.raw()[..self.byte_len()].to_vec()
    }

    /// Pack into one word: `timestamp_ms << 32 | status << 16 | data1 << 8 | data2`.
    pub(crate) const fn pack(&self) -> u64 {
        ((self.timestamp_ms as u64) << 32)
            | ((self.status as u64) << 16)
            | ((self.data1 as u64) << 8)
            | self.data2 as u64
    }

    pub(crate) const fn unpack(word: u64) -> Self {
        Self {
            status: (word >> 16) as u8,
            data1: (word >> 8) as u8,
            data2: word as u8,
            timestamp_ms: (word >> 32) as u32,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>8}ms]", self.timestamp_ms)?;
        for byte in &self.raw()[..self.byte_len()] {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}
