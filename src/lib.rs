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

//! fphal - Fingerprint sensor HAL adapter
//!
//! This library sits between a biometric framework and a legacy vendor
//! fingerprint driver: it probes the vendor modules, reports sensor
//! capabilities from configuration, and routes driver events to the one
//! open client session.

pub mod config;
pub mod driver;
pub mod fingerprint;
pub mod location;
pub mod lockout;
pub mod logging;
pub mod props;
pub mod resolver;
pub mod router;
pub mod session;
pub mod udfps;

pub use fingerprint::Fingerprint;
pub use fp_error::{FingerprintError, Result};
pub use fp_protocol as protocol;

#[cfg(test)]
pub mod test_utils;
