// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input capture.
//!
//! Data flows from a platform driver callback through the [`framer`] into the
//! lock-free [`ring`], and from there to the application through
//! [`MidiSession::read_message`]. The platform backend is chosen at build
//! time as [`PlatformDriver`].

#[cfg(target_os = "macos")]
pub mod coremidi_backend;
pub mod driver;
pub mod framer;
pub mod message;
pub mod midir_backend;
pub mod reconnect;
pub mod ring;
pub mod session;
pub mod status;
pub mod virtual_driver;

use crate::error::MidiError;

#[cfg(target_os = "macos")]
pub use coremidi_backend::CoreMidiDriver;
pub use driver::{MidiDriver, MonotonicClock, PacketHandler};
pub use framer::{frame_packet, Framer, Frames};
pub use message::MidiMessage;
pub use midir_backend::MidirDriver;
pub use reconnect::{
    Clock, ManualClock, ReconnectPolicy, ReconnectStatus, Reconnector, SystemClock,
};
pub use ring::{RingBuffer, DEFAULT_CAPACITY};
pub use session::{ConnectionState, MidiSession, SessionOptions};
pub use status::length_for;
pub use virtual_driver::{VirtualController, VirtualDriver};

/// Driver for the host platform.
#[cfg(target_os = "macos")]
pub type PlatformDriver = CoreMidiDriver;

/// Driver for the host platform.
#[cfg(not(target_os = "macos"))]
pub type PlatformDriver = MidirDriver;

/// Create the platform client and wrap it in a session.
pub fn open_platform_session(
    client_name: &str,
    options: SessionOptions,
) -> Result<MidiSession<PlatformDriver>, MidiError> {
    let driver = PlatformDriver::new(client_name).map_err(MidiError::ClientInit)?;
    Ok(MidiSession::new(driver, options))
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    // System Common Messages
    pub const SYSEX_START: u8 = 0xF0;
    pub const MTC_QUARTER_FRAME: u8 = 0xF1;
    pub const SONG_POSITION: u8 = 0xF2;
    pub const SONG_SELECT: u8 = 0xF3;
    pub const TUNE_REQUEST: u8 = 0xF6;
    pub const SYSEX_END: u8 = 0xF7;

    // System Real-Time Messages
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;
    pub const ACTIVE_SENSING: u8 = 0xFE;
    pub const RESET: u8 = 0xFF;
}
