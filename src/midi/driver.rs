// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Platform driver abstraction.
//!
//! A driver is the thin binding to an OS MIDI subsystem. It enumerates
//! sources, opens one at a time and delivers raw packets to a registered
//! handler. Framing, queueing and connection state live above this trait in
//! [`MidiSession`](super::MidiSession).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use crate::error::DriverError;

/// Packet handler registered with an open port.
///
/// Called on a driver-owned thread with the packet's timestamp in nanoseconds
/// on the driver's monotonic clock (see [`MidiDriver::now_nanos`]) and the raw
/// packet bytes. It must not block.
pub type PacketHandler = Box<dyn FnMut(u64, &[u8]) + Send + 'static>;

/// Collaborator contract every platform backend satisfies.
pub trait MidiDriver {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Number of input sources currently enumerated.
    fn port_count(&self) -> usize;

    /// Display name of the source at `index`.
    fn port_name(&self, index: usize) -> Result<String, DriverError>;

    /// True if `index` currently resolves to a backing device.
    fn has_port(&self, index: usize) -> bool {
        index < self.port_count()
    }

    /// Open the source at `index` and start delivering packets to `handler`.
    ///
    /// # Arguments
    /// * `index` - Source index, `0..port_count()`
    /// * `label` - Port name shown to other MIDI clients
    /// * `handler` - Called once per packet on the driver's thread
    ///
    /// # Returns
    /// * `Ok(())` once delivery has started
    /// * `Err` if the index is invalid, a port is already open or the
    ///   platform refused the connection
    fn open(&mut self, index: usize, label: &str, handler: PacketHandler)
        -> Result<(), DriverError>;

    /// Stop delivery and release the port. No packet is delivered after this
    /// returns. Calling it with nothing open is a no-op.
    fn close(&mut self);

    /// Current time on the clock packet timestamps are expressed in.
    fn now_nanos(&self) -> u64;

    /// Whether this platform needs the application to handle replugging.
    fn supports_hotplug(&self) -> bool {
        false
    }

    /// Ask to have `removed` set when the device behind `index` disappears.
    fn watch_removal(&mut self, index: usize, removed: Arc<AtomicBool>) -> Result<(), DriverError> {
        let _ = (index, removed);
        Err(DriverError::unsupported("device-removal notification"))
    }

    /// Drop any registration made by [`watch_removal`](Self::watch_removal).
    fn unwatch_removal(&mut self) {}
}

/// Monotonic nanosecond clock anchored at its creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_nanos(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let a = clock.now_nanos();
        thread::sleep(Duration::from_millis(2));
        let b = clock.now_nanos();
        assert!(b > a);
        assert!(b - a >= 2_000_000);
    }
}
