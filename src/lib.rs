// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MiniMIDI - minimal MIDI input capture.
//!
//! Opens one MIDI input source, frames the raw packets the platform delivers
//! into timestamped [`MidiMessage`]s and hands them to the application through
//! a lock-free single-producer/single-consumer queue.
//!
//! ```no_run
//! use minimidi::midi::{open_platform_session, SessionOptions};
//!
//! let mut session = open_platform_session("MiniMIDI", SessionOptions::default())?;
//! session.connect(0, "MiniMIDI example")?;
//! while let Some(msg) = session.read_message() {
//!     println!("{}", msg);
//! }
//! # Ok::<(), minimidi::MidiError>(())
//! ```

pub mod config;
pub mod error;
pub mod midi;

pub use error::{DriverError, MidiError};
pub use midi::{MidiMessage, MidiSession};
