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

//! Vendor driver interface
//!
//! The vendor fingerprint module is consumed through three traits that
//! mirror the legacy hardware module ABI:
//!
//! - [`ModuleLoader`] finds a module by (module group, class)
//! - [`HwModule`] opens a device
//! - [`FingerprintDevice`] is the opened device: notify registration,
//!   close, and the operation surface sessions drive
//!
//! Status returning methods use the vendor convention: `0` is success,
//! anything else (usually a negative errno) is a failure.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fp_error::FingerprintError;
use parking_lot::Mutex;
use tracing::{debug, error, info};

/// Status value the vendor ABI uses for success
pub const STATUS_OK: i32 = 0;

static NEXT_DEVICE_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of one opened device, used to route its notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey(u64);

impl DeviceKey {
    /// Allocate a key never handed out before in this process
    pub fn next() -> Self {
        DeviceKey(NEXT_DEVICE_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fpdev#{}", self.0)
    }
}

/// Raw event delivered by the vendor driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintMsg {
    Error {
        error: i32,
    },
    Acquired {
        acquired_info: i32,
    },
    TemplateEnrolling {
        finger_id: u32,
        group_id: u32,
        samples_remaining: u32,
    },
    TemplateRemoved {
        finger_id: u32,
        group_id: u32,
        remaining_templates: u32,
    },
    Authenticated {
        finger_id: u32,
        group_id: u32,
        hat: Vec<u8>,
    },
    TemplateEnumerating {
        finger_id: u32,
        group_id: u32,
        remaining_templates: u32,
    },
}

/// Context-free notification callback, as the vendor ABI requires.
///
/// The driver shim passes back the key the device was opened with so the
/// callback can find its way to the right adapter.
pub type NotifyFn = fn(DeviceKey, &FingerprintMsg);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("module not found")]
    NotFound,
    #[error("no valid open method")]
    NoOpenMethod,
    #[error("status {0}")]
    Status(i32),
}

pub trait ModuleLoader: Send + Sync {
    fn load_module_by_class(&self, module_id: &str, class_name: &str) -> Result<Box<dyn HwModule>, DriverError>;
}

pub trait HwModule: Send {
    fn open(&self, key: DeviceKey) -> Result<Arc<dyn FingerprintDevice>, DriverError>;
}

pub trait FingerprintDevice: Send + Sync {
    fn set_notify(&self, notify: NotifyFn) -> i32;
    fn close(&self) -> i32;

    fn pre_enroll(&self) -> u64;
    fn enroll(&self, hat: &[u8], group_id: u32, timeout_sec: u32) -> i32;
    fn post_enroll(&self) -> i32;
    fn get_authenticator_id(&self) -> u64;
    fn cancel(&self) -> i32;
    fn enumerate(&self) -> i32;
    fn remove(&self, group_id: u32, finger_id: u32) -> i32;
    fn set_active_group(&self, group_id: u32, store_path: &str) -> i32;
    fn authenticate(&self, operation_id: u64, group_id: u32) -> i32;
}

/// Loader that never finds a module. Leaves the adapter without a driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLoader;

impl ModuleLoader for NullLoader {
    fn load_module_by_class(&self, _module_id: &str, _class_name: &str) -> Result<Box<dyn HwModule>, DriverError> {
        Err(DriverError::NotFound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Open,
    Closed,
    /// Close was attempted and failed. Terminal: the handle is never reused.
    ClosedWithError(i32),
}

/// The one opened vendor device owned by an adapter
pub struct DriverHandle {
    key: DeviceKey,
    class_name: String,
    module_id: String,
    device: Arc<dyn FingerprintDevice>,
    state: Mutex<HandleState>,
}

impl DriverHandle {
    pub fn new(key: DeviceKey, class_name: &str, module_id: &str, device: Arc<dyn FingerprintDevice>) -> Self {
        Self {
            key,
            class_name: class_name.to_string(),
            module_id: module_id.to_string(),
            device,
            state: Mutex::new(HandleState::Open),
        }
    }

    pub fn key(&self) -> DeviceKey {
        self.key
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn device(&self) -> &Arc<dyn FingerprintDevice> {
        &self.device
    }

    pub fn state(&self) -> HandleState {
        *self.state.lock()
    }

    /// Close the device once. Later calls are no-ops, failed closes are not retried.
    pub fn close(&self) -> Result<(), FingerprintError> {
        let mut state = self.state.lock();
        if *state != HandleState::Open {
            debug!(key = %self.key, state = ?*state, "fingerprint device already closed");
            return Ok(());
        }

        let status = self.device.close();
        if status != STATUS_OK {
            error!("Can't close fingerprint module, error: {}", status);
            *state = HandleState::ClosedWithError(status);
            return Err(FingerprintError::DeviceClose { status });
        }

        info!(class = %self.class_name, module_id = %self.module_id, "Closed fingerprint HAL");
        *state = HandleState::Closed;
        Ok(())
    }
}

impl fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverHandle")
            .field("key", &self.key)
            .field("class_name", &self.class_name)
            .field("module_id", &self.module_id)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        // Errors were already logged by close()
        let _ = self.close();
    }
}
