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

//! Driver notification routing
//!
//! Vendor drivers call back through a plain function pointer with no
//! caller context. [`notify`] is that function: it looks the device key up
//! in the process-wide [`NotifyRegistry`] and hands the event to whatever
//! session is open in the adapter that owns the device.
//!
//! Everything here runs on driver threads. Nothing may panic back into
//! the driver, so failures are logged and the event is dropped.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;
use tracing::{error, trace};

use crate::driver::{DeviceKey, FingerprintMsg};
use crate::session::Session;

static GLOBAL_REGISTRY: OnceLock<NotifyRegistry> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    /// A session is being built; events are dropped as if none existed
    Creating,
    Open,
    Closed,
}

#[derive(Default)]
struct SlotInner {
    session: Option<Arc<Session>>,
    creating: bool,
}

/// The adapter's single session slot.
///
/// `install_with` is the only writer; it moves the slot from Absent or
/// Closed through Creating to Open. Open to Closed happens inside the
/// session itself.
#[derive(Default)]
pub struct SessionSlot {
    inner: RwLock<SlotInner>,
}

/// Clears the creating mark if the builder unwinds
struct CreatingGuard<'a> {
    inner: &'a RwLock<SlotInner>,
}

impl Drop for CreatingGuard<'_> {
    fn drop(&mut self) {
        self.inner.write().creating = false;
    }
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        let inner = self.inner.read();
        match inner.session.as_ref() {
            _ if inner.creating => SessionState::Creating,
            None => SessionState::Absent,
            Some(s) if s.is_closed() => SessionState::Closed,
            Some(_) => SessionState::Open,
        }
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.inner.read().session.clone()
    }

    /// Install a new session built by `make`, unless an open one exists.
    ///
    /// The slot is marked as creating under the write lock, `make` runs
    /// with no lock held, and the built session is published under a
    /// second write lock. `make` may therefore raise driver events that
    /// route back into this slot; those are dropped. Returns `None`,
    /// without calling `make`, when a session is open or being created.
    pub fn install_with<F>(&self, make: F) -> Option<Arc<Session>>
    where
        F: FnOnce() -> Arc<Session>,
    {
        {
            let mut inner = self.inner.write();
            let open = matches!(inner.session.as_ref(), Some(s) if !s.is_closed());
            if open || inner.creating {
                return None;
            }
            inner.creating = true;
        }

        let guard = CreatingGuard { inner: &self.inner };
        let session = make();
        {
            let mut inner = self.inner.write();
            inner.session = Some(Arc::clone(&session));
            inner.creating = false;
        }
        drop(guard);
        Some(session)
    }

    /// Deliver `msg` to the open session. Returns whether it was delivered.
    pub fn dispatch(&self, msg: &FingerprintMsg) -> bool {
        // Clone out so the lock is not held while the session runs
        let session = self.current();
        match session {
            Some(session) if !session.is_closed() => {
                let result = catch_unwind(AssertUnwindSafe(|| session.notify(msg)));
                if result.is_err() {
                    error!(?msg, "Session panicked while handling a driver callback");
                }
                true
            }
            _ => {
                error!("Receiving callbacks before a session is opened.");
                false
            }
        }
    }
}

/// Device key to session slot lookup used by [`notify`]
#[derive(Default)]
pub struct NotifyRegistry {
    routes: RwLock<HashMap<DeviceKey, Weak<SessionSlot>>>,
}

impl NotifyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry consulted by the driver callback trampoline
    pub fn global() -> &'static NotifyRegistry {
        GLOBAL_REGISTRY.get_or_init(NotifyRegistry::new)
    }

    pub fn register(&self, key: DeviceKey, slot: &Arc<SessionSlot>) {
        self.routes.write().insert(key, Arc::downgrade(slot));
        trace!(%key, "registered notify route");
    }

    pub fn unregister(&self, key: DeviceKey) {
        self.routes.write().remove(&key);
        trace!(%key, "removed notify route");
    }

    pub fn is_registered(&self, key: DeviceKey) -> bool {
        self.routes.read().contains_key(&key)
    }

    /// Route one driver event. Returns whether a session received it.
    pub fn route(&self, key: DeviceKey, msg: &FingerprintMsg) -> bool {
        let slot = self.routes.read().get(&key).and_then(Weak::upgrade);
        match slot {
            Some(slot) => slot.dispatch(msg),
            None => {
                error!(%key, "Receiving callbacks before a session is opened.");
                false
            }
        }
    }
}

/// Notification trampoline registered with every vendor device
pub fn notify(key: DeviceKey, msg: &FingerprintMsg) {
    NotifyRegistry::global().route(key, msg);
}
