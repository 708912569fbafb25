// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Status byte decoding.
//!
//! Maps a status byte to the total length of the message it starts. The
//! mapping is total: data bytes and unknown system bytes resolve to 1.

use super::messages;

/// Total message length (1, 2 or 3 bytes) for a status byte.
#[inline]
pub const fn length_for(status: u8) -> usize {
    match status {
        // Note off, note on, poly aftertouch, control change
        0x80..=0xBF => 3,
        // Program change, channel aftertouch
        0xC0..=0xDF => 2,
        // Pitch bend
        0xE0..=0xEF => 3,
        messages::MTC_QUARTER_FRAME => 2,
        messages::SONG_POSITION => 3,
        _ => 1,
    }
}

/// True if the byte has its high bit set.
#[inline]
pub const fn is_status(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// True for channel voice messages (`0x80..=0xEF`).
#[inline]
pub const fn is_channel_message(status: u8) -> bool {
    status >= 0x80 && status < 0xF0
}

/// True for system real-time bytes (`0xF8..=0xFF`).
#[inline]
pub const fn is_realtime(status: u8) -> bool {
    status >= 0xF8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_byte_messages() {
        for status in 0x80..=0xBFu8 {
            assert_eq!(length_for(status), 3, "status {:#04x}", status);
        }
        for status in 0xE0..=0xEFu8 {
            assert_eq!(length_for(status), 3, "status {:#04x}", status);
        }
        assert_eq!(length_for(0xF2), 3);
    }

    #[test]
    fn test_two_byte_messages() {
        for status in 0xC0..=0xDFu8 {
            assert_eq!(length_for(status), 2, "status {:#04x}", status);
        }
        assert_eq!(length_for(0xF1), 2);
    }

    #[test]
    fn test_everything_else_is_one_byte() {
        for byte in 0x00..=0x7Fu8 {
            assert_eq!(length_for(byte), 1, "data byte {:#04x}", byte);
        }
        assert_eq!(length_for(0xF0), 1);
        for status in 0xF3..=0xFFu8 {
            assert_eq!(length_for(status), 1, "status {:#04x}", status);
        }
    }

    #[test]
    fn test_total_over_byte_range() {
        for byte in 0..=u8::MAX {
            assert!((1..=3).contains(&length_for(byte)));
        }
    }

    #[test]
    fn test_classification() {
        assert!(!is_status(0x7F));
        assert!(is_status(0x80));
        assert!(is_channel_message(0x9F));
        assert!(!is_channel_message(0xF0));
        assert!(is_realtime(messages::TIMING_CLOCK));
        assert!(!is_realtime(messages::SYSEX_END));
    }
}
