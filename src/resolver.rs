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

//! Vendor driver probing
//!
//! Devices ship one of several vendor fingerprint modules. The resolver
//! walks a fixed candidate list in order and keeps the first module that
//! loads, opens and accepts the notify callback.

use std::sync::Arc;

use fp_error::FingerprintError;
use tracing::{debug, error, info};

use crate::driver::{DeviceKey, DriverHandle, ModuleLoader, NotifyFn, STATUS_OK};
use crate::router::{NotifyRegistry, SessionSlot};

/// Module group used when a candidate does not name one
pub const DEFAULT_MODULE_ID: &str = "fingerprint";

/// Probe order. `class:group` names a module group, a bare class uses
/// [`DEFAULT_MODULE_ID`].
pub const MODULE_CANDIDATES: &[&str] = &[
    "fortsense",
    "fpc",
    "fpc_fod",
    "goodix",
    "goodix:gf_fingerprint",
    "goodix_fod",
    "goodix_fod6",
    "silead",
    "syna",
    "goodix_us",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCandidate {
    pub class_name: String,
    pub module_id: String,
}

impl DriverCandidate {
    /// Split an identifier into class and module group.
    ///
    /// Anything that is not exactly two `:`-separated parts is taken as a
    /// bare class name.
    pub fn parse(identifier: &str) -> Self {
        let parts: Vec<&str> = identifier.split(':').collect();
        match parts.as_slice() {
            [class_name, module_id] => Self {
                class_name: class_name.to_string(),
                module_id: module_id.to_string(),
            },
            _ => Self {
                class_name: identifier.to_string(),
                module_id: DEFAULT_MODULE_ID.to_string(),
            },
        }
    }
}

/// Open the first working candidate.
///
/// On success the device's notify callback is `notify` and its key is
/// registered in `registry`, pointing at `slot`. Returns `None` when every
/// candidate failed.
pub fn resolve(
    loader: &dyn ModuleLoader,
    candidates: &[&str],
    registry: &NotifyRegistry,
    slot: &Arc<SessionSlot>,
    notify: NotifyFn,
) -> Option<DriverHandle> {
    for identifier in candidates {
        let candidate = DriverCandidate::parse(identifier);
        match open_candidate(loader, &candidate, registry, slot, notify) {
            Ok(handle) => {
                info!(
                    "Opened fingerprint HAL, class: {}, module_id: {}",
                    candidate.class_name, candidate.module_id
                );
                return Some(handle);
            }
            Err(e) => {
                error!(
                    "Can't open HAL module, class: {}, module_id: {}: {}",
                    candidate.class_name, candidate.module_id, e
                );
            }
        }
    }

    error!("Can't open any fingerprint HAL module");
    None
}

fn open_candidate(
    loader: &dyn ModuleLoader,
    candidate: &DriverCandidate,
    registry: &NotifyRegistry,
    slot: &Arc<SessionSlot>,
    notify: NotifyFn,
) -> Result<DriverHandle, FingerprintError> {
    let DriverCandidate { class_name, module_id } = candidate;
    debug!(%class_name, %module_id, "Opening fingerprint hal library...");

    let module = loader
        .load_module_by_class(module_id, class_name)
        .map_err(|e| FingerprintError::ModuleLoad {
            class_name: class_name.clone(),
            module_id: module_id.clone(),
            reason: e.to_string(),
        })?;

    let key = DeviceKey::next();
    let device = module.open(key).map_err(|e| FingerprintError::ModuleOpen {
        class_name: class_name.clone(),
        module_id: module_id.clone(),
        reason: e.to_string(),
    })?;

    // Route before the callback goes live so no early event is lost
    registry.register(key, slot);
    let status = device.set_notify(notify);
    if status != STATUS_OK {
        registry.unregister(key);
        let close_status = device.close();
        if close_status != STATUS_OK {
            error!("Can't close fingerprint module, error: {}", close_status);
        }
        return Err(FingerprintError::NotifyRegistration { status });
    }

    Ok(DriverHandle::new(key, class_name, module_id, device))
}
