// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for MiniMIDI
//!
//! These drive a full session (driver callback -> framer -> queue -> reader)
//! through the virtual driver, without MIDI hardware.

use std::thread;
use std::time::Duration;

use minimidi::midi::{
    frame_packet, Clock, ConnectionState, ManualClock, MidiSession, ReconnectPolicy,
    ReconnectStatus, Reconnector, RingBuffer, SessionOptions, VirtualController, VirtualDriver,
};
use minimidi::{MidiError, MidiMessage};

fn options() -> SessionOptions {
    SessionOptions {
        buffer_capacity: 128,
        reconnect_settle: Duration::ZERO,
    }
}

fn connected(ports: &[&str]) -> (MidiSession<VirtualDriver>, VirtualController) {
    let (driver, controller) = VirtualDriver::new(ports.iter().copied());
    let mut session = MidiSession::new(driver, options());
    session.connect(0, "test").unwrap();
    (session, controller)
}

/// Note on injected 5ms after connecting comes out as one message.
#[test]
fn test_note_on_scenario() {
    let (mut session, controller) = connected(&["Keys"]);

    controller.advance(Duration::from_millis(5));
    controller.send(&[0x90, 0x40, 0x7F]);

    let msg = session.read_message().expect("one message");
    assert_eq!(msg.status, 0x90);
    assert_eq!(msg.data1, 0x40);
    assert_eq!(msg.data2, 0x7F);
    assert!(msg.timestamp_ms > 0);
    assert_eq!(msg.timestamp_ms, 5);
    assert_eq!(session.read_message(), None);
}

/// A SysEx packet after a note off contributes nothing.
#[test]
fn test_sysex_packet_after_note_off() {
    let (mut session, controller) = connected(&["Keys"]);

    controller.send(&[0x80, 0x40, 0x00]);
    controller.send(&[0xF0, 0x01, 0x02]);

    let msgs: Vec<MidiMessage> = session.drain().collect();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].status, 0x80);
    assert_eq!(msgs[0].data1, 0x40);
}

/// Noise packets (empty or starting with a data byte) are discarded whole.
#[test]
fn test_noise_packets_after_replug() {
    let (mut session, controller) = connected(&["Keys"]);

    controller.send(&[]);
    controller.send(&[0x00, 0x00, 0x00]);
    controller.send(&[0x7F, 0x90, 60, 100]);
    assert_eq!(session.read_message(), None);

    controller.send(&[0xB0, 64, 127]);
    assert_eq!(session.read_message().map(|m| m.data1), Some(64));
}

/// Framing a packet built from known messages gives them back in order.
#[test]
fn test_frame_known_messages() {
    let expected = vec![
        MidiMessage::new(0x91, 60, 90, 9),
        MidiMessage::new(0xD1, 40, 0, 9),
        MidiMessage::new(0xF2, 0x10, 0x02, 9),
        MidiMessage::new(0xFE, 0, 0, 9),
        MidiMessage::new(0xB1, 7, 127, 9),
    ];
    let packet: Vec<u8> = expected.iter().flat_map(|m| m.to_vec()).collect();

    let framed: Vec<MidiMessage> = frame_packet(&packet, 9).collect();
    assert_eq!(framed, expected);
}

/// Timestamps count from the connection, and every packet keeps its own.
#[test]
fn test_timestamps_relative_to_connection() {
    let (driver, controller) = VirtualDriver::new(["Keys"]);
    controller.advance(Duration::from_secs(3600));
    let mut session = MidiSession::new(driver, options());
    session.connect(0, "test").unwrap();

    controller.advance(Duration::from_millis(250));
    controller.send(&[0xF8, 0xF8]);
    controller.advance(Duration::from_millis(250));
    controller.send(&[0xF8]);

    let stamps: Vec<u32> = session.drain().map(|m| m.timestamp_ms).collect();
    assert_eq!(stamps, vec![250, 250, 500]);
}

/// Packets delivered together keep their own hardware stamps.
#[test]
fn test_batched_packets_keep_their_stamps() {
    let (mut session, controller) = connected(&["Keys"]);
    let base = controller.now_nanos();

    assert!(controller.send_batch(&[
        (base + 1_000_000, &[0x90u8, 60, 100][..]),
        (base + 4_000_000, &[0x80u8, 60, 0][..]),
    ]));

    let stamps: Vec<u32> = session.drain().map(|m| m.timestamp_ms).collect();
    assert_eq!(stamps, vec![1, 4]);
}

/// Reconnecting resets the time base.
#[test]
fn test_new_connection_new_epoch() {
    let (mut session, controller) = connected(&["Keys"]);
    controller.advance(Duration::from_secs(2));
    session.disconnect();
    session.connect(0, "test").unwrap();

    controller.advance(Duration::from_millis(20));
    controller.send(&[0x90, 1, 1]);
    assert_eq!(session.read_message().map(|m| m.timestamp_ms), Some(20));
}

#[test]
fn test_connect_twice_rejected() {
    let (mut session, _controller) = connected(&["Keys"]);
    assert!(matches!(
        session.connect(0, "again"),
        Err(MidiError::AlreadyConnected { index: 0 })
    ));
    assert_eq!(session.state(), ConnectionState::Connected);
}

#[test]
fn test_disconnect_when_disconnected() {
    let (driver, controller) = VirtualDriver::new(["Keys"]);
    let mut session = MidiSession::new(driver, options());
    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(controller.close_count(), 0);
}

/// No packets are read after disconnect.
#[test]
fn test_no_delivery_after_disconnect() {
    let (mut session, controller) = connected(&["Keys"]);
    session.disconnect();
    assert!(!controller.send(&[0x90, 60, 100]));
    assert_eq!(session.read_message(), None);
}

/// Pushing capacity + 1 messages loses only the oldest.
#[test]
fn test_queue_overflow() {
    let ring = RingBuffer::with_capacity(128);
    for n in 0..=128u32 {
        ring.push(MidiMessage::new(0xB0, 1, (n % 128) as u8, n + 1));
    }

    let stamps: Vec<u32> = std::iter::from_fn(|| ring.pop())
        .map(|m| m.timestamp_ms)
        .collect();
    assert_eq!(stamps.len(), 128);
    assert_eq!(stamps.first(), Some(&2));
    assert_eq!(stamps.last(), Some(&129));
    assert_eq!(ring.dropped(), 1);
}

/// Producer on its own thread, consumer polling, like a driver callback.
#[test]
fn test_callback_thread_to_poll_loop() {
    let (mut session, controller) = connected(&["Keys"]);
    let count = 100u8;

    let producer = {
        let controller = controller.clone();
        thread::spawn(move || {
            for note in 0..count {
                controller.send(&[0x90, note, 100]);
                if note % 10 == 0 {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        })
    };

    let mut notes = Vec::new();
    while notes.len() < count as usize {
        match session.read_message() {
            Some(msg) => notes.push(msg.data1),
            None => thread::sleep(Duration::from_millis(1)),
        }
    }
    producer.join().unwrap();

    assert_eq!(notes, (0..count).collect::<Vec<_>>());
    assert_eq!(session.dropped_messages(), 0);
}

/// Full hotplug episode: unplug, probe until the device is back, resume.
#[test]
fn test_hotplug_reconnect_episode() {
    let (driver, controller) = VirtualDriver::with_hotplug(["Keys"]);
    let mut session = MidiSession::new(driver, options());
    session.connect(0, "test").unwrap();

    controller.unplug(0);
    assert!(session.should_reconnect());
    assert!(!session.should_reconnect());

    let clock = ManualClock::new();
    let mut episode = Reconnector::start(ReconnectPolicy::default(), clock.now());

    // Device stays away for one second.
    for _ in 0..10 {
        let status = episode.poll(clock.now(), || session.try_reconnect("test").is_ok());
        assert_eq!(status, ReconnectStatus::Waiting);
        clock.advance(Duration::from_millis(100));
    }

    controller.replug(0, "Keys");
    let status = episode.poll(clock.now(), || session.try_reconnect("test").is_ok());
    assert_eq!(status, ReconnectStatus::Reconnected);
    assert_eq!(episode.attempts(), 11);
    assert!(session.is_connected());

    controller.send(&[0x90, 60, 1]);
    assert!(session.read_message().is_some());
}

/// Episode gives up when the device never returns.
#[test]
fn test_hotplug_gives_up() {
    let (driver, controller) = VirtualDriver::with_hotplug(["Keys"]);
    let mut session = MidiSession::new(driver, options());
    session.connect(0, "test").unwrap();
    controller.unplug(0);
    assert!(session.should_reconnect());

    let clock = ManualClock::new();
    let policy = ReconnectPolicy {
        interval: Duration::from_millis(100),
        timeout: Duration::from_secs(1),
    };
    let mut episode = Reconnector::start(policy, clock.now());
    let mut status = ReconnectStatus::Waiting;
    while status == ReconnectStatus::Waiting {
        status = episode.poll(clock.now(), || session.try_reconnect("test").is_ok());
        clock.advance(Duration::from_millis(100));
    }

    assert_eq!(status, ReconnectStatus::GaveUp);
    assert_eq!(episode.attempts(), 10);
    assert_eq!(session.last_port(), Some(0));
}

/// Platforms that handle replugging never ask for a reconnect.
#[test]
fn test_no_hotplug_platform() {
    let (session, controller) = connected(&["Keys"]);
    controller.unplug(0);
    assert!(!session.should_reconnect());
}

/// Dropping the session disconnects first.
#[test]
fn test_drop_closes_port() {
    let (session, controller) = connected(&["Keys"]);
    assert!(controller.is_open());
    drop(session);
    assert!(!controller.is_open());
}
