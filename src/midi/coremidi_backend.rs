// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Core MIDI backend for macOS.
//!
//! Core MIDI keeps endpoint identity across an unplug and reattaches a
//! replugged device to existing connections, so this backend needs no
//! removal notification and reports no hotplug support.
//!
//! Packet timestamps are Core MIDI host times (`mach_absolute_time` ticks).
//! The driver clock is the same host clock converted to nanoseconds, so the
//! session epoch and packet stamps share one origin.

use coremidi::{Client, InputPort, PacketList, Source, Sources};
use tracing::debug;

use crate::error::DriverError;

use super::driver::{MidiDriver, PacketHandler};

fn os_error(status: i32, what: &str) -> DriverError {
    DriverError::with_code(i64::from(status), what)
}

/// Host tick to nanosecond conversion.
fn ticks_to_nanos(ticks: u64, numer: u32, denom: u32) -> u64 {
    let nanos = u128::from(ticks) * u128::from(numer) / u128::from(denom.max(1));
    u64::try_from(nanos).unwrap_or(u64::MAX)
}

/// Core MIDI host clock in nanoseconds.
#[derive(Debug, Clone, Copy)]
struct HostClock {
    numer: u32,
    denom: u32,
}

impl HostClock {
    #[allow(deprecated)]
    fn new() -> Self {
        let mut info = libc::mach_timebase_info { numer: 0, denom: 0 };
        // SAFETY: `info` is a valid, writable timebase struct.
        let status = unsafe { libc::mach_timebase_info(&mut info) };
        if status != 0 || info.numer == 0 || info.denom == 0 {
            debug!(status, "mach_timebase_info failed, assuming 1:1");
            return Self { numer: 1, denom: 1 };
        }
        Self {
            numer: info.numer,
            denom: info.denom,
        }
    }

    #[allow(deprecated)]
    fn now_nanos(&self) -> u64 {
        // SAFETY: no preconditions.
        let ticks = unsafe { libc::mach_absolute_time() };
        ticks_to_nanos(ticks, self.numer, self.denom)
    }

    /// Nanoseconds for a packet's host time. Zero means "now".
    fn packet_nanos(&self, host_time: u64) -> u64 {
        if host_time == 0 {
            self.now_nanos()
        } else {
            ticks_to_nanos(host_time, self.numer, self.denom)
        }
    }
}

/// Core MIDI input driver.
pub struct CoreMidiDriver {
    client: Client,
    port: Option<InputPort>,
    source: Option<Source>,
    clock: HostClock,
}

impl CoreMidiDriver {
    /// Create the Core MIDI client.
    pub fn new(client_name: &str) -> Result<Self, DriverError> {
        let client = Client::new(client_name)
            .map_err(|status| os_error(status, "MIDIClientCreate failed"))?;
        Ok(Self {
            client,
            port: None,
            source: None,
            clock: HostClock::new(),
        })
    }
}

impl MidiDriver for CoreMidiDriver {
    fn name(&self) -> &'static str {
        "coremidi"
    }

    fn port_count(&self) -> usize {
        Sources::count()
    }

    fn port_name(&self, index: usize) -> Result<String, DriverError> {
        let source = Source::from_index(index)
            .ok_or_else(|| DriverError::new(format!("MIDI source {} not found", index)))?;
        source
            .display_name()
            .ok_or_else(|| DriverError::new(format!("MIDI source {} has no display name", index)))
    }

    fn has_port(&self, index: usize) -> bool {
        Source::from_index(index).is_some()
    }

    fn open(
        &mut self,
        index: usize,
        label: &str,
        handler: PacketHandler,
    ) -> Result<(), DriverError> {
        if self.port.is_some() {
            return Err(DriverError::new("a port is already open"));
        }

        let source = Source::from_index(index)
            .ok_or_else(|| DriverError::new(format!("MIDI source {} not found", index)))?;

        let clock = self.clock;
        let mut handler = handler;
        let port = self
            .client
            .input_port(label, move |packets: &PacketList| {
                for packet in packets.iter() {
                    handler(clock.packet_nanos(packet.timestamp()), packet.data());
                }
            })
            .map_err(|status| os_error(status, "MIDIInputPortCreate failed"))?;

        // Dropping `port` on failure disposes it.
        port.connect_source(&source)
            .map_err(|status| os_error(status, "MIDIPortConnectSource failed"))?;

        debug!(index, "Core MIDI source connected");
        self.port = Some(port);
        self.source = Some(source);
        Ok(())
    }

    fn close(&mut self) {
        if let (Some(port), Some(source)) = (self.port.as_ref(), self.source.as_ref()) {
            if let Err(status) = port.disconnect_source(source) {
                debug!(status, "MIDIPortDisconnectSource failed");
            }
        }
        self.port = None;
        self.source = None;
    }

    fn now_nanos(&self) -> u64 {
        self.clock.now_nanos()
    }
}

impl Drop for CoreMidiDriver {
    fn drop(&mut self) {
        self.close();
    }
}
