// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Packet framing.
//!
//! A driver delivers packets: a run of raw bytes plus one timestamp for the
//! whole run. The framer splits a packet into discrete [`MidiMessage`]s that
//! all share the packet's timestamp.
//!
//! Framing rules:
//! - an empty packet, or one whose first byte is a data byte, is noise and
//!   yields nothing (some drivers emit this right after a replug)
//! - `0xF0` (SysEx start) ends the packet; messages framed before it are kept
//! - a data byte where a status byte is expected (running status) ends the packet
//! - a message whose declared length runs past the packet ends the packet
//!
//! Framing never allocates, so it is safe to run on the driver's callback thread.

use std::iter::FusedIterator;

use super::messages;
use super::status::{is_status, length_for};
use super::MidiMessage;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Converts driver timestamps into session-relative milliseconds and frames packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framer {
    epoch_ns: u64,
}

impl Framer {
    /// Create a framer whose zero point is `epoch_ns` on the driver's monotonic clock.
    pub const fn new(epoch_ns: u64) -> Self {
        Self { epoch_ns }
    }

    pub const fn epoch_ns(&self) -> u64 {
        self.epoch_ns
    }

    /// Milliseconds since the epoch, never zero and saturating at `u32::MAX`.
    ///
    /// Timestamps earlier than the epoch (packets queued before the connection
    /// completed) count as zero elapsed time.
    pub fn timestamp_ms(&self, nanos: u64) -> u32 {
        let elapsed = nanos.saturating_sub(self.epoch_ns) / NANOS_PER_MILLI;
        u32::try_from(elapsed).unwrap_or(u32::MAX).max(1)
    }

    /// Frame a packet stamped at `nanos` on the driver's monotonic clock.
    pub fn frame<'a>(&self, data: &'a [u8], nanos: u64) -> Frames<'a> {
        frame_packet(data, self.timestamp_ms(nanos))
    }
}

/// Frame a packet whose messages all carry `timestamp_ms`.
pub fn frame_packet(data: &[u8], timestamp_ms: u32) -> Frames<'_> {
    let noise = data.first().map_or(true, |&first| !is_status(first));
    Frames {
        data,
        offset: 0,
        timestamp_ms,
        done: noise,
    }
}

/// Iterator over the messages of one packet.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    data: &'a [u8],
    offset: usize,
    timestamp_ms: u32,
    done: bool,
}

impl<'a> Frames<'a> {
    /// Bytes not yet consumed by framing.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.offset.min(self.data.len())..]
    }
}

impl Iterator for Frames<'_> {
    type Item = MidiMessage;

    fn next(&mut self) -> Option<MidiMessage> {
        if self.done {
            return None;
        }

        let data = self.data;
        let rest = &data[self.offset..];
        let Some(&status) = rest.first() else {
            self.done = true;
            return None;
        };

        if status == messages::SYSEX_START || !is_status(status) {
            self.done = true;
            return None;
        }

        let len = length_for(status);
        if len > rest.len() {
            self.done = true;
            return None;
        }

        let data1 = if len > 1 { rest[1] } else { 0 };
        let data2 = if len > 2 { rest[2] } else { 0 };
        self.offset += len;

        Some(MidiMessage::new(status, data1, data2, self.timestamp_ms))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.data.len() - self.offset))
        }
    }
}

impl FusedIterator for Frames<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(data: &[u8]) -> Vec<MidiMessage> {
        frame_packet(data, 7).collect()
    }

    #[test]
    fn test_frames_mixed_lengths() {
        let packet = [
            0x90, 60, 100, // note on
            0xC1, 5, // program change
            0xF8, // clock
            0xE0, 0x00, 0x40, // pitch bend
            0xF1, 0x23, // MTC quarter frame
        ];
        let msgs = collect(&packet);
        assert_eq!(
            msgs,
            vec![
                MidiMessage::new(0x90, 60, 100, 7),
                MidiMessage::new(0xC1, 5, 0, 7),
                MidiMessage::new(0xF8, 0, 0, 7),
                MidiMessage::new(0xE0, 0x00, 0x40, 7),
                MidiMessage::new(0xF1, 0x23, 0, 7),
            ]
        );
    }

    #[test]
    fn test_empty_packet_yields_nothing() {
        assert!(collect(&[]).is_empty());
    }

    #[test]
    fn test_leading_data_byte_is_noise() {
        assert!(collect(&[0x40, 0x90, 0x40, 0x7F]).is_empty());
    }

    #[test]
    fn test_sysex_first_yields_nothing() {
        assert!(collect(&[0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7]).is_empty());
    }

    #[test]
    fn test_sysex_keeps_earlier_messages() {
        let msgs = collect(&[0x80, 0x40, 0x00, 0xF0, 0x01, 0x02, 0xF7, 0x90, 0x40, 0x7F]);
        assert_eq!(msgs, vec![MidiMessage::new(0x80, 0x40, 0x00, 7)]);
    }

    #[test]
    fn test_truncated_message_stops_framing() {
        let msgs = collect(&[0xB0, 7, 100, 0x90, 60]);
        assert_eq!(msgs, vec![MidiMessage::new(0xB0, 7, 100, 7)]);
    }

    #[test]
    fn test_running_status_stops_framing() {
        let msgs = collect(&[0x90, 60, 100, 62, 100]);
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn test_remaining_after_sysex() {
        let mut frames = frame_packet(&[0xFE, 0xF0, 0x01], 1);
        assert_eq!(frames.next(), Some(MidiMessage::new(0xFE, 0, 0, 1)));
        assert_eq!(frames.next(), None);
        assert_eq!(frames.remaining(), &[0xF0, 0x01]);
        assert_eq!(frames.next(), None);
    }

    #[test]
    fn test_timestamp_relative_to_epoch() {
        let framer = Framer::new(1_000_000_000);
        assert_eq!(framer.timestamp_ms(1_005_000_000), 5);
        assert_eq!(framer.timestamp_ms(1_005_999_999), 5);
    }

    #[test]
    fn test_timestamp_never_zero() {
        let framer = Framer::new(2_000_000);
        assert_eq!(framer.timestamp_ms(2_000_000), 1);
        assert_eq!(framer.timestamp_ms(2_500_000), 1);
        // Packets stamped before the epoch
        assert_eq!(framer.timestamp_ms(0), 1);
    }

    #[test]
    fn test_timestamp_saturates() {
        let framer = Framer::new(0);
        assert_eq!(framer.timestamp_ms(u64::MAX), u32::MAX);
    }

    #[test]
    fn test_frame_applies_packet_timestamp_to_all() {
        let framer = Framer::new(0);
        let msgs: Vec<_> = framer.frame(&[0xFA, 0xF8, 0xFC], 42_000_000).collect();
        assert_eq!(msgs.len(), 3);
        assert!(msgs.iter().all(|m| m.timestamp_ms == 42));
    }
}
