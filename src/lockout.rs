/*
 * This file is part of fphal.
 *
 * Copyright (C) 2025 fphal contributors
 *
 * fphal is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * fphal is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with fphal. If not, see <https://www.gnu.org/licenses/>.
 */

//! Failed authentication accounting

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

/// Consecutive failures that start a timed lockout
pub const TIMED_LOCKOUT_THRESHOLD: u32 = 5;
/// Consecutive failures that lock the sensor until a reset
pub const PERMANENT_LOCKOUT_THRESHOLD: u32 = 20;
pub const TIMED_LOCKOUT_DURATION: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutMode {
    None,
    Timed,
    Permanent,
}

#[derive(Debug, Default)]
struct LockoutState {
    failures: u32,
    timed_since: Option<Instant>,
}

/// Tracks failed attempts for one adapter. Shared by all of its sessions.
#[derive(Debug, Default)]
pub struct LockoutTracker {
    state: Mutex<LockoutState>,
}

impl LockoutTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> u32 {
        self.state.lock().failures
    }

    /// Record a failure and return the lockout mode it leaves the sensor in
    pub fn add_failed_attempt(&self) -> LockoutMode {
        self.add_failed_attempt_at(Instant::now())
    }

    pub fn add_failed_attempt_at(&self, now: Instant) -> LockoutMode {
        let mut state = self.state.lock();
        state.failures = state.failures.saturating_add(1);

        if state.failures >= PERMANENT_LOCKOUT_THRESHOLD {
            warn!(failures = state.failures, "Fingerprint sensor locked out permanently");
            state.timed_since = None;
            LockoutMode::Permanent
        } else if state.failures >= TIMED_LOCKOUT_THRESHOLD {
            if state.timed_since.is_none() {
                warn!(
                    failures = state.failures,
                    "Fingerprint sensor locked out for {}s",
                    TIMED_LOCKOUT_DURATION.as_secs()
                );
            }
            state.timed_since = Some(now);
            LockoutMode::Timed
        } else {
            LockoutMode::None
        }
    }

    pub fn mode(&self) -> LockoutMode {
        self.mode_at(Instant::now())
    }

    pub fn mode_at(&self, now: Instant) -> LockoutMode {
        let state = self.state.lock();
        if state.failures >= PERMANENT_LOCKOUT_THRESHOLD {
            return LockoutMode::Permanent;
        }
        match state.timed_since {
            Some(since) if now.saturating_duration_since(since) < TIMED_LOCKOUT_DURATION => LockoutMode::Timed,
            _ => LockoutMode::None,
        }
    }

    /// Time left on a timed lockout, `None` when not timed-locked
    pub fn remaining_timed_lockout(&self) -> Option<Duration> {
        self.remaining_timed_lockout_at(Instant::now())
    }

    pub fn remaining_timed_lockout_at(&self, now: Instant) -> Option<Duration> {
        if self.mode_at(now) != LockoutMode::Timed {
            return None;
        }
        let since = self.state.lock().timed_since?;
        Some(TIMED_LOCKOUT_DURATION.saturating_sub(now.saturating_duration_since(since)))
    }

    /// Forget all failures. Returns whether a lockout was cleared.
    pub fn reset(&self) -> bool {
        let mut state = self.state.lock();
        let was_locked = state.failures >= TIMED_LOCKOUT_THRESHOLD;
        *state = LockoutState::default();
        if was_locked {
            info!("Fingerprint lockout cleared");
        }
        was_locked
    }
}
