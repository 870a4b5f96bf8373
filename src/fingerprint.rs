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

//! The fingerprint adapter
//!
//! [`Fingerprint`] owns the one vendor device of the process, answers
//! capability queries from config and hands out sessions, one open at a
//! time.

use std::sync::Arc;

use fp_error::{FingerprintError, Result};
use fp_protocol::{SensorProps, SensorType};
use tracing::{debug, error, info, warn};

use crate::config::{FingerprintConfig, KEY_TYPE};
use crate::driver::{DriverHandle, ModuleLoader};
use crate::lockout::LockoutTracker;
use crate::props::{build_sensor_props, sensor_type_from_config};
use crate::resolver::{resolve, MODULE_CANDIDATES};
use crate::router::{notify, NotifyRegistry, SessionSlot, SessionState};
use crate::session::{Session, SessionCallback};
use crate::udfps::{UdfpsHandler, UdfpsHandlerFactory};

struct Udfps {
    factory: Arc<dyn UdfpsHandlerFactory>,
    handler: Arc<dyn UdfpsHandler>,
}

pub struct Fingerprint {
    config: Arc<FingerprintConfig>,
    driver: Option<DriverHandle>,
    sensor_type: SensorType,
    udfps: Option<Udfps>,
    slot: Arc<SessionSlot>,
    lockout: Arc<LockoutTracker>,
}

impl Fingerprint {
    /// Build the adapter, probing the built-in vendor module list.
    ///
    /// Fails only when the configured sensor type is not recognized. Not
    /// finding any driver is logged and leaves the adapter able to answer
    /// capability queries only.
    pub fn new(
        config: Arc<FingerprintConfig>,
        loader: &dyn ModuleLoader,
        udfps_factory: Option<Arc<dyn UdfpsHandlerFactory>>,
    ) -> Result<Self> {
        Self::with_candidates(config, loader, MODULE_CANDIDATES, udfps_factory)
    }

    pub fn with_candidates(
        config: Arc<FingerprintConfig>,
        loader: &dyn ModuleLoader,
        candidates: &[&str],
        udfps_factory: Option<Arc<dyn UdfpsHandlerFactory>>,
    ) -> Result<Self> {
        let sensor_type_prop = config.get_string(KEY_TYPE);
        let sensor_type = sensor_type_from_config(&sensor_type_prop)?;
        info!("sensorTypeProp: {}", sensor_type_prop);

        let slot = Arc::new(SessionSlot::new());
        let driver = resolve(loader, candidates, NotifyRegistry::global(), &slot, notify);

        let udfps = if sensor_type.is_under_display() {
            Self::create_udfps(udfps_factory, driver.as_ref())
        } else {
            None
        };

        Ok(Self {
            config,
            driver,
            sensor_type,
            udfps,
            slot,
            lockout: Arc::new(LockoutTracker::new()),
        })
    }

    fn create_udfps(factory: Option<Arc<dyn UdfpsHandlerFactory>>, driver: Option<&DriverHandle>) -> Option<Udfps> {
        let Some(factory) = factory else {
            error!("Can't get UdfpsHandlerFactory");
            return None;
        };
        let Some(handler) = factory.create() else {
            error!("Can't create UdfpsHandler");
            return None;
        };
        match driver {
            Some(driver) => handler.init(Arc::clone(driver.device())),
            None => warn!("No fingerprint device, UdfpsHandler left uninitialized"),
        }
        Some(Udfps { factory, handler })
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn has_device(&self) -> bool {
        self.driver.is_some()
    }

    pub fn has_udfps_handler(&self) -> bool {
        self.udfps.is_some()
    }

    pub fn session_state(&self) -> SessionState {
        self.slot.state()
    }

    pub fn config(&self) -> &Arc<FingerprintConfig> {
        &self.config
    }

    /// Capability descriptors, rebuilt from config on every call
    pub fn get_sensor_props(&self) -> Vec<SensorProps> {
        vec![build_sensor_props(&self.config, self.sensor_type)]
    }

    /// Open a session for `user_id`.
    ///
    /// # Panics
    ///
    /// If a session is already open. Callers must close the previous
    /// session first.
    pub fn create_session(&self, sensor_id: i32, user_id: i32, cb: Arc<dyn SessionCallback>) -> Result<Arc<Session>> {
        let driver = self.driver.as_ref().ok_or(FingerprintError::DeviceUnavailable)?;
        debug!(sensor_id, user_id, "creating fingerprint session");

        let device = Arc::clone(driver.device());
        let udfps = self.udfps.as_ref().map(|u| Arc::clone(&u.handler));
        let lockout = Arc::clone(&self.lockout);
        let client = Arc::clone(&cb);
        let installed = self
            .slot
            .install_with(|| Arc::new(Session::new(device, udfps, user_id, client, lockout)));
        let Some(session) = installed else {
            panic!("Open session already exists!");
        };

        if let Err(e) = session.link_to_death() {
            warn!("Failed to link to client death: {}", e);
            session.close();
            return Err(e);
        }

        Ok(session)
    }
}

impl Drop for Fingerprint {
    fn drop(&mut self) {
        debug!("dropping fingerprint adapter");
        // A client may still hold the session; stop it reaching the handler
        if let Some(session) = self.slot.current() {
            session.close();
        }
        if let Some(Udfps { factory, handler }) = self.udfps.take() {
            factory.destroy(handler);
        }

        let Some(driver) = self.driver.take() else {
            error!("No valid device");
            return;
        };
        NotifyRegistry::global().unregister(driver.key());
        // A failed close is logged and recorded by the handle
        let _ = driver.close();
    }
}
