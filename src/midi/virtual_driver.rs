// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! In-process driver for tests and offline demos.
//!
//! [`VirtualDriver`] behaves like a platform backend whose device list,
//! packets, clock and failures are scripted through a cloned
//! [`VirtualController`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::DriverError;

use super::driver::{MidiDriver, PacketHandler};

#[derive(Default)]
struct VirtualState {
    ports: Vec<String>,
    handler: Option<PacketHandler>,
    open_port: Option<usize>,
    open_label: Option<String>,
    now_ns: u64,
    hotplug: bool,
    fail_next_open: Option<DriverError>,
    fail_watch: bool,
    removal: Option<(usize, Arc<AtomicBool>)>,
    open_count: usize,
    close_count: usize,
}

fn lock(state: &Mutex<VirtualState>) -> MutexGuard<'_, VirtualState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted driver.
pub struct VirtualDriver {
    state: Arc<Mutex<VirtualState>>,
}

/// Handle used to drive a [`VirtualDriver`] from the outside.
#[derive(Clone)]
pub struct VirtualController {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualDriver {
    /// Driver exposing `ports`, without hotplug support.
    pub fn new<I, S>(ports: I) -> (Self, VirtualController)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = Arc::new(Mutex::new(VirtualState {
            ports: ports.into_iter().map(Into::into).collect(),
            ..VirtualState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            VirtualController { state },
        )
    }

    /// Driver that, like platforms without stable device indices, reports
    /// device removal to the session.
    pub fn with_hotplug<I, S>(ports: I) -> (Self, VirtualController)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (driver, controller) = Self::new(ports);
        lock(&driver.state).hotplug = true;
        (driver, controller)
    }
}

impl MidiDriver for VirtualDriver {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn port_count(&self) -> usize {
        lock(&self.state).ports.len()
    }

    fn port_name(&self, index: usize) -> Result<String, DriverError> {
        lock(&self.state)
            .ports
            .get(index)
            .cloned()
            .ok_or_else(|| DriverError::new(format!("no virtual port {}", index)))
    }

    fn open(
        &mut self,
        index: usize,
        label: &str,
        handler: PacketHandler,
    ) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        if let Some(err) = state.fail_next_open.take() {
            return Err(err);
        }
        if index >= state.ports.len() {
            return Err(DriverError::new(format!("no virtual port {}", index)));
        }
        if state.handler.is_some() {
            return Err(DriverError::new("virtual port already open"));
        }
        state.handler = Some(handler);
        state.open_port = Some(index);
        state.open_label = Some(label.to_string());
        state.open_count += 1;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = lock(&self.state);
        if state.handler.take().is_some() {
            state.close_count += 1;
        }
        state.open_port = None;
        state.open_label = None;
    }

    fn now_nanos(&self) -> u64 {
        lock(&self.state).now_ns
    }

    fn supports_hotplug(&self) -> bool {
        lock(&self.state).hotplug
    }

    fn watch_removal(&mut self, index: usize, removed: Arc<AtomicBool>) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        if !state.hotplug || state.fail_watch {
            return Err(DriverError::unsupported("device-removal notification"));
        }
        state.removal = Some((index, removed));
        Ok(())
    }

    fn unwatch_removal(&mut self) {
        lock(&self.state).removal = None;
    }
}

impl VirtualController {
    /// Deliver a packet stamped with the current virtual time.
    /// Returns false if no port is open.
    pub fn send(&self, bytes: &[u8]) -> bool {
        let now = lock(&self.state).now_ns;
        self.send_at(now, bytes)
    }

    /// Deliver a packet stamped `nanos` on the virtual clock.
    pub fn send_at(&self, nanos: u64, bytes: &[u8]) -> bool {
        let mut state = lock(&self.state);
        match state.handler.as_mut() {
            Some(handler) => {
                handler(nanos, bytes);
                true
            }
            None => false,
        }
    }

    /// Deliver several packets in one callback run, like a platform packet
    /// list. Each packet keeps its own stamp.
    pub fn send_batch(&self, packets: &[(u64, &[u8])]) -> bool {
        let mut state = lock(&self.state);
        match state.handler.as_mut() {
            Some(handler) => {
                for &(nanos, bytes) in packets {
                    handler(nanos, bytes);
                }
                true
            }
            None => false,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = lock(&self.state);
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        state.now_ns = state.now_ns.saturating_add(by);
    }

    pub fn now_nanos(&self) -> u64 {
        lock(&self.state).now_ns
    }

    pub fn add_port(&self, name: impl Into<String>) -> usize {
        let mut state = lock(&self.state);
        state.ports.push(name.into());
        state.ports.len() - 1
    }

    /// Unplug the device at `index`. If it is the open port, delivery stops
    /// and any removal watcher is notified.
    pub fn unplug(&self, index: usize) {
        let mut state = lock(&self.state);
        if index >= state.ports.len() {
            return;
        }
        state.ports.remove(index);
        if state.open_port == Some(index) {
            state.handler = None;
            if let Some((watched, flag)) = state.removal.as_ref() {
                if *watched == index {
                    flag.store(true, Ordering::SeqCst);
                }
            }
        }
    }

    /// Plug a device back in at `index`.
    pub fn replug(&self, index: usize, name: impl Into<String>) {
        let mut state = lock(&self.state);
        let index = index.min(state.ports.len());
        state.ports.insert(index, name.into());
    }

    /// Make the next `open` fail with `err`.
    pub fn fail_next_open(&self, err: DriverError) {
        lock(&self.state).fail_next_open = Some(err);
    }

    /// Make removal registration fail.
    pub fn fail_watch(&self, fail: bool) {
        lock(&self.state).fail_watch = fail;
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).handler.is_some()
    }

    pub fn open_port(&self) -> Option<usize> {
        lock(&self.state).open_port
    }

    pub fn open_label(&self) -> Option<String> {
        lock(&self.state).open_label.clone()
    }

    pub fn is_watching(&self) -> bool {
        lock(&self.state).removal.is_some()
    }

    pub fn open_count(&self) -> usize {
        lock(&self.state).open_count
    }

    pub fn close_count(&self) -> usize {
        lock(&self.state).close_count
    }
}
