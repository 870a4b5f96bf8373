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

//! Client sessions
//!
//! A [`Session`] is what a client holds between `create_session` and the
//! moment it closes (or dies). It forwards client requests to the vendor
//! device and turns the raw driver events the router hands it into
//! [`SessionCallback`] calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use fp_error::{FingerprintError, Result};
use fp_protocol::{AcquiredInfo, ErrorCode};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::driver::{FingerprintDevice, FingerprintMsg, STATUS_OK};
use crate::lockout::{LockoutMode, LockoutTracker};
use crate::udfps::UdfpsHandler;

/// Timeout handed to the driver for one enrollment, in seconds
pub const ENROLL_TIMEOUT_SECS: u32 = 60;

/// Called once when the client process behind a callback goes away
pub type DeathRecipient = Box<dyn FnOnce() + Send>;

/// Client side event sink
pub trait SessionCallback: Send + Sync {
    fn on_challenge_generated(&self, challenge: i64);
    fn on_challenge_revoked(&self, challenge: i64);
    fn on_acquired(&self, info: AcquiredInfo, vendor_code: i32);
    fn on_error(&self, error: ErrorCode, vendor_code: i32);
    fn on_enrollment_progress(&self, enrollment_id: i32, remaining: i32);
    fn on_authentication_succeeded(&self, enrollment_id: i32, hat: &[u8]);
    fn on_authentication_failed(&self);
    fn on_lockout_timed(&self, duration_ms: i64);
    fn on_lockout_permanent(&self);
    fn on_lockout_cleared(&self);
    fn on_interaction_detected(&self);
    fn on_enrollments_enumerated(&self, enrollment_ids: &[i32]);
    fn on_enrollments_removed(&self, enrollment_ids: &[i32]);
    fn on_authenticator_id_retrieved(&self, authenticator_id: i64);
    fn on_session_closed(&self);

    /// Arrange for `recipient` to run when the client dies
    fn link_to_death(&self, recipient: DeathRecipient) -> Result<()>;
}

pub fn store_path_for_user(user_id: i32) -> String {
    format!("/data/vendor_de/{}/fpdata/", user_id)
}

pub struct Session {
    device: Arc<dyn FingerprintDevice>,
    udfps: Option<Arc<dyn UdfpsHandler>>,
    user_id: i32,
    cb: Arc<dyn SessionCallback>,
    lockout: Arc<LockoutTracker>,
    closed: AtomicBool,
    detecting: AtomicBool,
    // Partial results of enumerate and remove, flushed when the driver
    // reports nothing remaining
    enumerated: Mutex<Vec<i32>>,
    removed: Mutex<Vec<i32>>,
}

impl Session {
    pub fn new(
        device: Arc<dyn FingerprintDevice>,
        udfps: Option<Arc<dyn UdfpsHandler>>,
        user_id: i32,
        cb: Arc<dyn SessionCallback>,
        lockout: Arc<LockoutTracker>,
    ) -> Self {
        let store_path = store_path_for_user(user_id);
        let status = device.set_active_group(user_id as u32, &store_path);
        if status != STATUS_OK {
            error!(user_id, %store_path, status, "Failed to set active fingerprint group");
        } else {
            debug!(user_id, %store_path, "Active fingerprint group set");
        }

        Self {
            device,
            udfps,
            user_id,
            cb,
            lockout,
            closed: AtomicBool::new(false),
            detecting: AtomicBool::new(false),
            enumerated: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn user_id(&self) -> i32 {
        self.user_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(FingerprintError::SessionClosed);
        }
        Ok(())
    }

    fn group_id(&self) -> u32 {
        self.user_id as u32
    }

    fn check(op: &'static str, status: i32) -> Result<()> {
        if status != STATUS_OK {
            error!(op, status, "Fingerprint driver operation failed");
            return Err(FingerprintError::driver(op, status));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Client requests
    // ------------------------------------------------------------------

    pub fn generate_challenge(&self) -> Result<i64> {
        self.ensure_open()?;
        let challenge = self.device.pre_enroll() as i64;
        self.cb.on_challenge_generated(challenge);
        Ok(challenge)
    }

    pub fn revoke_challenge(&self, challenge: i64) -> Result<()> {
        self.ensure_open()?;
        Self::check("post_enroll", self.device.post_enroll())?;
        self.cb.on_challenge_revoked(challenge);
        Ok(())
    }

    pub fn enroll(&self, hat: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.detecting.store(false, Ordering::Release);
        Self::check("enroll", self.device.enroll(hat, self.group_id(), ENROLL_TIMEOUT_SECS))
    }

    /// Start authentication, unless the sensor is locked out
    pub fn authenticate(&self, operation_id: i64) -> Result<()> {
        self.ensure_open()?;
        match self.lockout.mode() {
            LockoutMode::Permanent => {
                self.cb.on_lockout_permanent();
                return Ok(());
            }
            LockoutMode::Timed => {
                let remaining = self.lockout.remaining_timed_lockout().unwrap_or_default();
                self.cb.on_lockout_timed(remaining.as_millis() as i64);
                return Ok(());
            }
            LockoutMode::None => {}
        }
        self.detecting.store(false, Ordering::Release);
        Self::check("authenticate", self.device.authenticate(operation_id as u64, self.group_id()))
    }

    /// Wait for any finger on the sensor without matching it
    pub fn detect_interaction(&self) -> Result<()> {
        self.ensure_open()?;
        self.detecting.store(true, Ordering::Release);
        let result = Self::check("authenticate", self.device.authenticate(0, self.group_id()));
        if result.is_err() {
            self.detecting.store(false, Ordering::Release);
        }
        result
    }

    pub fn enumerate_enrollments(&self) -> Result<()> {
        self.ensure_open()?;
        self.enumerated.lock().clear();
        Self::check("enumerate", self.device.enumerate())
    }

    pub fn remove_enrollments(&self, enrollment_ids: &[i32]) -> Result<()> {
        self.ensure_open()?;
        self.removed.lock().clear();
        for &id in enrollment_ids {
            Self::check("remove", self.device.remove(self.group_id(), id as u32))?;
        }
        Ok(())
    }

    pub fn get_authenticator_id(&self) -> Result<i64> {
        self.ensure_open()?;
        let id = self.device.get_authenticator_id() as i64;
        self.cb.on_authenticator_id_retrieved(id);
        Ok(id)
    }

    pub fn reset_lockout(&self) -> Result<()> {
        self.ensure_open()?;
        self.lockout.reset();
        self.cb.on_lockout_cleared();
        Ok(())
    }

    pub fn cancel(&self) -> Result<()> {
        self.ensure_open()?;
        if let Some(udfps) = &self.udfps {
            udfps.cancel();
        }
        self.detecting.store(false, Ordering::Release);
        Self::check("cancel", self.device.cancel())
    }

    pub fn on_pointer_down(&self, x: u32, y: u32, minor: f32, major: f32) -> Result<()> {
        self.ensure_open()?;
        match &self.udfps {
            Some(udfps) => udfps.on_finger_down(x, y, minor, major),
            None => debug!("Pointer down without an under-display handler, ignoring"),
        }
        Ok(())
    }

    pub fn on_pointer_up(&self) -> Result<()> {
        self.ensure_open()?;
        match &self.udfps {
            Some(udfps) => udfps.on_finger_up(),
            None => debug!("Pointer up without an under-display handler, ignoring"),
        }
        Ok(())
    }

    pub fn on_ui_ready(&self) -> Result<()> {
        self.ensure_open()?;
        match &self.udfps {
            Some(udfps) => udfps.on_ui_ready(),
            None => debug!("UI ready without an under-display handler, ignoring"),
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Close the session. Only the first call has any effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(user_id = self.user_id, "Fingerprint session closed");
        self.cb.on_session_closed();
    }

    pub fn close_on_client_death(&self) {
        warn!(user_id = self.user_id, "Fingerprint client died, closing its session");
        self.close();
    }

    /// Close this session when the client behind its callback dies
    pub fn link_to_death(self: &Arc<Self>) -> Result<()> {
        let session: Weak<Session> = Arc::downgrade(self);
        self.cb.link_to_death(Box::new(move || {
            if let Some(session) = session.upgrade() {
                session.close_on_client_death();
            }
        }))
    }

    // ------------------------------------------------------------------
    // Driver events
    // ------------------------------------------------------------------

    pub fn notify(&self, msg: &FingerprintMsg) {
        match msg {
            FingerprintMsg::Error { error } => {
                let (code, vendor) = ErrorCode::from_legacy(*error);
                debug!(error, ?code, vendor, "driver error");
                self.detecting.store(false, Ordering::Release);
                self.cb.on_error(code, vendor);
            }
            FingerprintMsg::Acquired { acquired_info } => {
                let (info, vendor) = AcquiredInfo::from_legacy(*acquired_info);
                if let Some(udfps) = &self.udfps {
                    udfps.on_acquired(*acquired_info, vendor);
                }
                self.cb.on_acquired(info, vendor);
            }
            FingerprintMsg::TemplateEnrolling {
                finger_id,
                samples_remaining,
                ..
            } => {
                self.cb
                    .on_enrollment_progress(*finger_id as i32, *samples_remaining as i32);
            }
            FingerprintMsg::Authenticated { finger_id, hat, .. } => {
                self.on_authenticated(*finger_id, hat);
            }
            FingerprintMsg::TemplateRemoved {
                finger_id,
                remaining_templates,
                ..
            } => {
                Self::accumulate(&self.removed, *finger_id, *remaining_templates, |ids| {
                    self.cb.on_enrollments_removed(ids)
                });
            }
            FingerprintMsg::TemplateEnumerating {
                finger_id,
                remaining_templates,
                ..
            } => {
                Self::accumulate(&self.enumerated, *finger_id, *remaining_templates, |ids| {
                    self.cb.on_enrollments_enumerated(ids)
                });
            }
        }
    }

    fn on_authenticated(&self, finger_id: u32, hat: &[u8]) {
        if self.detecting.swap(false, Ordering::AcqRel) {
            self.cb.on_interaction_detected();
            return;
        }

        if finger_id != 0 {
            self.cb.on_authentication_succeeded(finger_id as i32, hat);
            if self.lockout.reset() {
                self.cb.on_lockout_cleared();
            }
            return;
        }

        self.cb.on_authentication_failed();
        match self.lockout.add_failed_attempt() {
            LockoutMode::Timed => {
                let remaining = self.lockout.remaining_timed_lockout().unwrap_or_default();
                self.cb.on_lockout_timed(remaining.as_millis() as i64);
            }
            LockoutMode::Permanent => self.cb.on_lockout_permanent(),
            LockoutMode::None => {}
        }
    }

    // Finger id 0 carries no template, it only signals the end of the list
    fn accumulate(pending: &Mutex<Vec<i32>>, finger_id: u32, remaining: u32, report: impl FnOnce(&[i32])) {
        let ids = {
            let mut pending = pending.lock();
            if finger_id != 0 {
                pending.push(finger_id as i32);
            }
            if remaining != 0 {
                return;
            }
            std::mem::take(&mut *pending)
        };
        report(&ids);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("closed", &self.is_closed())
            .field("udfps", &self.udfps.is_some())
            .finish()
    }
}
