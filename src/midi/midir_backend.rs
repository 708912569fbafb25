// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! `midir` backend.
//!
//! Used on every platform except macOS. Port indices are not stable across
//! an unplug here, so the backend reports device removal: a watcher thread
//! polls the source list and raises the session's flag once the connected
//! device's name disappears.
//!
//! midir hands each packet a microsecond stamp. On ALSA and WinMM it counts
//! from the moment the connection started, so the driver maps it onto its
//! [`MonotonicClock`] by adding the clock reading taken just before
//! connecting. Stamps that would land in the future (a host API with another
//! origin) are clamped to the arrival time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use midir::{Ignore, MidiInput, MidiInputConnection};
use tracing::debug;

use crate::error::DriverError;

use super::driver::{MidiDriver, MonotonicClock, PacketHandler};

/// Interval between removal-watcher scans.
pub const DEFAULT_REMOVAL_POLL: Duration = Duration::from_millis(500);

/// Map a midir stamp onto the driver clock.
fn stamp_to_nanos(opened_at: u64, stamp_us: u64, now: u64) -> u64 {
    opened_at
        .saturating_add(stamp_us.saturating_mul(1_000))
        .min(now)
}

fn new_input(client_name: &str) -> Result<MidiInput, DriverError> {
    let mut input = MidiInput::new(client_name).map_err(init_error)?;
    input.ignore(Ignore::None);
    Ok(input)
}

/// Driver built on `midir`.
pub struct MidirDriver {
    client_name: String,
    /// Enumeration client, alive for the driver's lifetime.
    enumerator: MidiInput,
    /// Connecting client; owned by `connection` while a port is open.
    input: Option<MidiInput>,
    connection: Option<MidiInputConnection<()>>,
    clock: MonotonicClock,
    removal_poll: Duration,
    watcher: Option<RemovalWatcher>,
}

fn init_error(err: midir::InitError) -> DriverError {
    DriverError::new(format!("failed to initialise midir: {}", err))
}

impl MidirDriver {
    /// Create the platform client.
    pub fn new(client_name: &str) -> Result<Self, DriverError> {
        Ok(Self {
            client_name: client_name.to_string(),
            enumerator: new_input(client_name)?,
            input: Some(new_input(client_name)?),
            connection: None,
            clock: MonotonicClock::new(),
            removal_poll: DEFAULT_REMOVAL_POLL,
            watcher: None,
        })
    }

    /// Change how often the removal watcher scans the source list.
    pub fn with_removal_poll(mut self, interval: Duration) -> Self {
        self.removal_poll = interval;
        self
    }
}

fn port_name_of(input: &MidiInput, index: usize) -> Result<String, DriverError> {
    let ports = input.ports();
    let port = ports
        .get(index)
        .ok_or_else(|| DriverError::new(format!("MIDI source {} not found", index)))?;
    input
        .port_name(port)
        .map_err(|e| DriverError::new(format!("failed to read port name: {}", e)))
}

impl MidiDriver for MidirDriver {
    fn name(&self) -> &'static str {
        "midir"
    }

    fn port_count(&self) -> usize {
        self.enumerator.port_count()
    }

    fn port_name(&self, index: usize) -> Result<String, DriverError> {
        port_name_of(&self.enumerator, index)
    }

    fn open(
        &mut self,
        index: usize,
        label: &str,
        handler: PacketHandler,
    ) -> Result<(), DriverError> {
        if self.connection.is_some() {
            return Err(DriverError::new("a port is already open"));
        }

        let input = match self.input.take() {
            Some(input) => input,
            None => new_input(&self.client_name)?,
        };

        let ports = input.ports();
        let Some(port) = ports.get(index).cloned() else {
            self.input = Some(input);
            return Err(DriverError::new(format!("MIDI source {} not found", index)));
        };

        let clock = self.clock;
        let mut handler = handler;
        let opened_at = clock.now_nanos();
        match input.connect(
            &port,
            label,
            move |stamp, bytes, _| {
                handler(stamp_to_nanos(opened_at, stamp, clock.now_nanos()), bytes)
            },
            (),
        ) {
            Ok(connection) => {
                self.connection = Some(connection);
                Ok(())
            }
            Err(err) => {
                let message = format!("failed to connect to MIDI source {}: {}", index, err);
                self.input = Some(err.into_inner());
                Err(DriverError::new(message))
            }
        }
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            let (input, ()) = connection.close();
            self.input = Some(input);
        }
    }

    fn now_nanos(&self) -> u64 {
        self.clock.now_nanos()
    }

    fn supports_hotplug(&self) -> bool {
        true
    }

    fn watch_removal(&mut self, index: usize, removed: Arc<AtomicBool>) -> Result<(), DriverError> {
        self.unwatch_removal();
        let name = self.port_name(index)?;
        let watcher = RemovalWatcher::spawn(
            format!("{} (hotplug)", self.client_name),
            name,
            removed,
            self.removal_poll,
        )?;
        self.watcher = Some(watcher);
        Ok(())
    }

    fn unwatch_removal(&mut self) {
        self.watcher = None;
    }
}

impl Drop for MidirDriver {
    fn drop(&mut self) {
        self.unwatch_removal();
        self.close();
    }
}

/// Background thread that flags removal of one named source.
struct RemovalWatcher {
    stop_tx: Option<Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RemovalWatcher {
    fn spawn(
        client_name: String,
        port_name: String,
        removed: Arc<AtomicBool>,
        interval: Duration,
    ) -> Result<Self, DriverError> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("minimidi-hotplug".into())
            .spawn(move || {
                let input = match MidiInput::new(&client_name) {
                    Ok(input) => input,
                    Err(err) => {
                        debug!(%err, "hotplug watcher could not create a client");
                        return;
                    }
                };
                while stop_rx.try_recv().is_err() {
                    let present = input
                        .ports()
                        .iter()
                        .any(|p| input.port_name(p).map_or(false, |n| n == port_name));
                    if !present {
                        debug!(port = %port_name, "MIDI source removed");
                        removed.store(true, Ordering::SeqCst);
                        return;
                    }
                    thread::park_timeout(interval);
                }
            })
            .map_err(|e| DriverError::new(format!("failed to start hotplug watcher: {}", e)))?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(handle),
        })
    }
}

impl Drop for RemovalWatcher {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}
