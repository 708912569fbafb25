// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Bounded hotplug reconnect policy.
//!
//! After a device is unplugged the application retries the reconnect at a
//! fixed interval until it succeeds or a timeout budget is spent. The retry
//! state is explicit and time is read through [`Clock`], so the loop can be
//! driven from a timer and tested with a [`ManualClock`].

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Default time between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Default time budget before giving up (2 minutes).
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(120);

/// Source of elapsed time.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Retry cadence and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            timeout: DEFAULT_RETRY_TIMEOUT,
        }
    }
}

/// Outcome of one [`Reconnector::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStatus {
    /// Not reconnected yet, keep polling.
    Waiting,
    /// The attempt succeeded.
    Reconnected,
    /// The time budget is spent; manual intervention is needed.
    GaveUp,
}

/// Retry state for one reconnect episode.
#[derive(Debug, Clone)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    started_at: Duration,
    next_attempt_at: Duration,
    attempts: u32,
    finished: Option<ReconnectStatus>,
}

impl Reconnector {
    /// Begin an episode at `now`; the first attempt is due immediately.
    pub fn start(policy: ReconnectPolicy, now: Duration) -> Self {
        Self {
            policy,
            started_at: now,
            next_attempt_at: now,
            attempts: 0,
            finished: None,
        }
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Point in time after which no further attempt is made.
    pub fn deadline(&self) -> Duration {
        self.started_at + self.policy.timeout
    }

    pub fn next_attempt_at(&self) -> Duration {
        self.next_attempt_at
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Advance to `now`, calling `attempt` if an attempt is due.
    ///
    /// Once the episode has ended every further call returns the final status
    /// without attempting again.
    pub fn poll(&mut self, now: Duration, attempt: impl FnOnce() -> bool) -> ReconnectStatus {
        if let Some(status) = self.finished {
            return status;
        }
        if now >= self.deadline() {
            self.finished = Some(ReconnectStatus::GaveUp);
            return ReconnectStatus::GaveUp;
        }
        if now < self.next_attempt_at {
            return ReconnectStatus::Waiting;
        }

        self.attempts += 1;
        if attempt() {
            self.finished = Some(ReconnectStatus::Reconnected);
            return ReconnectStatus::Reconnected;
        }
        self.next_attempt_at = now + self.policy.interval;
        ReconnectStatus::Waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(100));
        assert_eq!(policy.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_first_attempt_is_immediate() {
        let clock = ManualClock::new();
        let mut r = Reconnector::start(ReconnectPolicy::default(), clock.now());
        assert_eq!(r.poll(clock.now(), || true), ReconnectStatus::Reconnected);
        assert_eq!(r.attempts(), 1);
        assert!(r.is_finished());
    }

    #[test]
    fn test_waits_for_interval() {
        let clock = ManualClock::new();
        let mut r = Reconnector::start(ReconnectPolicy::default(), clock.now());
        assert_eq!(r.poll(clock.now(), || false), ReconnectStatus::Waiting);

        clock.advance(Duration::from_millis(50));
        let mut called = false;
        assert_eq!(
            r.poll(clock.now(), || {
                called = true;
                true
            }),
            ReconnectStatus::Waiting
        );
        assert!(!called);

        clock.advance(Duration::from_millis(50));
        assert_eq!(r.poll(clock.now(), || true), ReconnectStatus::Reconnected);
        assert_eq!(r.attempts(), 2);
    }

    #[test]
    fn test_gives_up_after_timeout() {
        let clock = ManualClock::new();
        let mut r = Reconnector::start(ReconnectPolicy::default(), clock.now());

        let mut status = ReconnectStatus::Waiting;
        while status == ReconnectStatus::Waiting {
            status = r.poll(clock.now(), || false);
            clock.advance(Duration::from_millis(100));
        }

        assert_eq!(status, ReconnectStatus::GaveUp);
        assert_eq!(r.attempts(), 1200);
        assert_eq!(r.poll(clock.now(), || true), ReconnectStatus::GaveUp);
        assert_eq!(r.attempts(), 1200);
    }

    #[test]
    fn test_deadline_is_relative_to_start() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(5));
        let policy = ReconnectPolicy {
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(30),
        };
        let r = Reconnector::start(policy, clock.now());
        assert_eq!(r.deadline(), Duration::from_millis(5030));
        assert_eq!(r.next_attempt_at(), Duration::from_secs(5));
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
