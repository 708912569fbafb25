// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for MiniMIDI.
//!
//! `DriverError` is what a platform backend reports. `MidiError` is the
//! portable failure surfaced by a session; it keeps the driver error as its
//! source so the platform code is still available for diagnostics.

use std::fmt;

use thiserror::Error;

/// Failure reported by a platform driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct DriverError {
    /// Platform status code, if the backend exposes one (e.g. an `OSStatus`).
    pub code: Option<i64>,
    /// Human readable description from the backend.
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Error used by drivers that have no device-removal notification.
    pub fn unsupported(what: &str) -> Self {
        Self::new(format!("{} is not supported by this driver", what))
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors surfaced by a [`MidiSession`](crate::midi::MidiSession).
#[derive(Debug, Error)]
pub enum MidiError {
    /// The platform client handle could not be created.
    #[error("failed to create MIDI client")]
    ClientInit(#[source] DriverError),

    /// Invalid index, busy device or driver failure while opening the port.
    #[error("failed to open MIDI port {index}")]
    PortOpen {
        index: usize,
        #[source]
        source: DriverError,
    },

    /// The index resolved to no backing device (usually a race with unplugging).
    #[error("MIDI source {index} not found (only {available} available)")]
    SourceLookup { index: usize, available: usize },

    /// Hotplug notifications could not be registered. Non-fatal.
    #[error("failed to register device-removal notification")]
    NotificationRegistration(#[source] DriverError),

    /// `connect` was called while a port is already connected.
    #[error("session is already connected to port {index}")]
    AlreadyConnected { index: usize },

    /// The display name of a port could not be read.
    #[error("failed to read name of MIDI port {index}")]
    PortName {
        index: usize,
        #[source]
        source: DriverError,
    },

    /// Reconnect was requested but no port was ever connected.
    #[error("no previously connected port to reconnect to")]
    NothingToReconnect,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MidiError {
    /// True for failures that happen while establishing a connection.
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            MidiError::PortOpen { .. } | MidiError::SourceLookup { .. }
        )
    }

    /// Platform status code carried by the underlying driver error, if any.
    pub fn platform_code(&self) -> Option<i64> {
        match self {
            MidiError::ClientInit(e)
            | MidiError::NotificationRegistration(e)
            | MidiError::PortOpen { source: e, .. }
            | MidiError::PortName { source: e, .. } => e.code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_driver_error_display() {
        assert_eq!(DriverError::new("busy").to_string(), "busy");
        assert_eq!(
            DriverError::with_code(-10830, "busy").to_string(),
            "busy (code -10830)"
        );
    }

    #[test]
    fn test_port_open_keeps_platform_code() {
        let err = MidiError::PortOpen {
            index: 2,
            source: DriverError::with_code(7, "device busy"),
        };
        assert!(err.is_connect_failure());
        assert_eq!(err.platform_code(), Some(7));
        assert_eq!(err.to_string(), "failed to open MIDI port 2");
        assert_eq!(err.source().map(|s| s.to_string()), Some("device busy (code 7)".into()));
    }

    #[test]
    fn test_already_connected_is_not_connect_failure() {
        let err = MidiError::AlreadyConnected { index: 0 };
        assert!(!err.is_connect_failure());
        assert_eq!(err.platform_code(), None);
    }
}
