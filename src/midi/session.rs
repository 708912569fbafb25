// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input session.
//!
//! A [`MidiSession`] owns a platform driver, the message queue shared with the
//! driver callback, and the connection state. The driver thread frames packets
//! and pushes them; the application thread polls [`MidiSession::read_message`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::MidiError;

use super::driver::{MidiDriver, PacketHandler};
use super::framer::Framer;
use super::ring::{RingBuffer, DEFAULT_CAPACITY};
use super::MidiMessage;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Session tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Queue capacity in messages.
    pub buffer_capacity: usize,
    /// Pause between closing and reopening the port in `try_reconnect`.
    pub reconnect_settle: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            reconnect_settle: Duration::from_millis(50),
        }
    }
}

/// Input capture session over a [`MidiDriver`].
pub struct MidiSession<D: MidiDriver> {
    driver: D,
    ring: Arc<RingBuffer>,
    state: ConnectionState,
    current_port: Option<usize>,
    last_port: Option<usize>,
    epoch_ns: Option<u64>,
    removed: Arc<AtomicBool>,
    watching_removal: bool,
    watch_error: Option<MidiError>,
    reconnect_settle: Duration,
    reported_dropped: usize,
}

impl<D: MidiDriver> MidiSession<D> {
    pub fn new(driver: D, options: SessionOptions) -> Self {
        debug!(driver = driver.name(), capacity = options.buffer_capacity, "MIDI session created");
        Self {
            driver,
            ring: Arc::new(RingBuffer::with_capacity(options.buffer_capacity)),
            state: ConnectionState::Disconnected,
            current_port: None,
            last_port: None,
            epoch_ns: None,
            removed: Arc::new(AtomicBool::new(false)),
            watching_removal: false,
            watch_error: None,
            reconnect_settle: options.reconnect_settle,
            reported_dropped: 0,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Port currently connected.
    pub fn current_port(&self) -> Option<usize> {
        self.current_port
    }

    /// Port of the most recent successful connection, kept across disconnects.
    pub fn last_port(&self) -> Option<usize> {
        self.last_port
    }

    /// Driver-clock nanoseconds that message timestamps count from.
    pub fn connection_epoch_ns(&self) -> Option<u64> {
        self.epoch_ns
    }

    /// Messages lost to queue overflow since the session was created.
    pub fn dropped_messages(&self) -> usize {
        self.ring.dropped()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Whether the platform needs the application to handle replugging.
    pub fn hotplug_supported(&self) -> bool {
        self.driver.supports_hotplug()
    }

    /// Why removal notification is off for the current connection, if it
    /// failed to register.
    pub fn removal_watch_error(&self) -> Option<&MidiError> {
        self.watch_error.as_ref()
    }

    pub fn port_count(&self) -> usize {
        self.driver.port_count()
    }

    /// Display name of a source.
    ///
    /// # Arguments
    /// * `index` - Source index, `0..port_count()`
    ///
    /// # Returns
    /// * `Ok(name)` on success
    /// * `Err(MidiError::PortName)` if the index is out of range or the
    ///   driver cannot read the name
    pub fn port_name(&self, index: usize) -> Result<String, MidiError> {
        self.driver
            .port_name(index)
            .map_err(|source| MidiError::PortName { index, source })
    }

    /// All sources as (index, name) pairs.
    pub fn port_names(&self) -> Vec<(usize, String)> {
        (0..self.driver.port_count())
            .map(|i| {
                let name = self
                    .driver
                    .port_name(i)
                    .unwrap_or_else(|_| format!("Unknown {}", i));
                (i, name)
            })
            .collect()
    }

    /// First source whose name contains `name`, ignoring case.
    pub fn find_port(&self, name: &str) -> Option<usize> {
        let needle = name.to_lowercase();
        self.port_names()
            .into_iter()
            .find(|(_, n)| n.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
    }

    /// Connect to the source at `index`, registering the port as `label`.
    ///
    /// Only valid while disconnected. On failure nothing stays acquired and the
    /// session remains disconnected. Message timestamps restart from zero.
    ///
    /// # Arguments
    /// * `index` - Source index, `0..port_count()`
    /// * `label` - Port name shown to other MIDI clients
    ///
    /// # Returns
    /// * `Ok(())` once packets are being delivered
    /// * `Err(MidiError::AlreadyConnected)` if a port is already connected
    /// * `Err(MidiError::SourceLookup)` if no device backs `index`
    /// * `Err(MidiError::PortOpen)` if the driver failed to open the port
    pub fn connect(&mut self, index: usize, label: &str) -> Result<(), MidiError> {
        if let Some(current) = self.current_port {
            return Err(MidiError::AlreadyConnected { index: current });
        }

        if !self.driver.has_port(index) {
            return Err(MidiError::SourceLookup {
                index,
                available: self.driver.port_count(),
            });
        }

        let epoch_ns = self.driver.now_nanos();
        let handler = packet_handler(Arc::clone(&self.ring), Framer::new(epoch_ns));

        if let Err(source) = self.driver.open(index, label, handler) {
            self.driver.close();
            return Err(MidiError::PortOpen { index, source });
        }

        self.state = ConnectionState::Connected;
        self.current_port = Some(index);
        self.last_port = Some(index);
        self.epoch_ns = Some(epoch_ns);
        self.removed.store(false, Ordering::SeqCst);
        self.watch_error = None;

        if self.driver.supports_hotplug() {
            match self.driver.watch_removal(index, Arc::clone(&self.removed)) {
                Ok(()) => self.watching_removal = true,
                Err(source) => {
                    warn!(port = index, error = %source, "hotplug detection disabled");
                    self.watch_error = Some(MidiError::NotificationRegistration(source));
                }
            }
        }

        info!(port = index, label, driver = self.driver.name(), "MIDI port connected");
        Ok(())
    }

    /// Release the port and any removal notification. Idempotent.
    pub fn disconnect(&mut self) {
        if self.watching_removal {
            self.driver.unwatch_removal();
            self.watching_removal = false;
        }
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.driver.close();
        if let Some(port) = self.current_port.take() {
            info!(port, "MIDI port disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Next pending message, if any. Never fails.
    pub fn read_message(&mut self) -> Option<MidiMessage> {
        let msg = self.ring.pop();
        let dropped = self.ring.dropped();
        if dropped > self.reported_dropped {
            warn!(
                lost = dropped - self.reported_dropped,
                capacity = self.ring.capacity(),
                "MIDI input buffer overflowed"
            );
            self.reported_dropped = dropped;
        }
        msg
    }

    /// Iterate over every pending message.
    pub fn drain(&mut self) -> impl Iterator<Item = MidiMessage> + '_ {
        std::iter::from_fn(move || self.read_message())
    }

    /// True once after the connected device was removed. Always false on
    /// platforms that handle replugging themselves.
    pub fn should_reconnect(&self) -> bool {
        self.driver.supports_hotplug() && self.removed.swap(false, Ordering::SeqCst)
    }

    /// Reopen the most recently connected port if it is enumerated again.
    ///
    /// Closes the current connection first, waits the configured settle
    /// delay, then connects again to the same index.
    ///
    /// # Arguments
    /// * `label` - Port name shown to other MIDI clients
    ///
    /// # Returns
    /// * `Ok(())` when the port is connected again
    /// * `Err(MidiError::NothingToReconnect)` if nothing was ever connected
    /// * `Err(MidiError::SourceLookup)` while the device is still missing
    /// * any error from [`connect`](Self::connect)
    pub fn try_reconnect(&mut self, label: &str) -> Result<(), MidiError> {
        let index = self.last_port.ok_or(MidiError::NothingToReconnect)?;

        if !self.driver.has_port(index) {
            return Err(MidiError::SourceLookup {
                index,
                available: self.driver.port_count(),
            });
        }

        self.disconnect();
        if !self.reconnect_settle.is_zero() {
            thread::sleep(self.reconnect_settle);
        }
        self.connect(index, label)
    }
}

impl<D: MidiDriver> Drop for MidiSession<D> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn packet_handler(ring: Arc<RingBuffer>, framer: Framer) -> PacketHandler {
    Box::new(move |nanos, bytes| {
        for msg in framer.frame(bytes, nanos) {
            ring.push(msg);
        }
    })
}
