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

//! Under-display sensor plugin interface
//!
//! Device specific UDFPS behavior (illumination, touch handling) lives in a
//! vendor plugin. The adapter obtains a handler from the factory when the
//! configured sensor type is under-display and hands it to every session.

use std::sync::Arc;

use crate::driver::FingerprintDevice;

pub trait UdfpsHandler: Send + Sync {
    fn init(&self, device: Arc<dyn FingerprintDevice>);
    fn on_finger_down(&self, x: u32, y: u32, minor: f32, major: f32);
    fn on_finger_up(&self);
    fn on_ui_ready(&self);
    /// Raw acquired value and vendor code of every acquired event
    fn on_acquired(&self, result: i32, vendor_code: i32);
    fn cancel(&self);
}

pub trait UdfpsHandlerFactory: Send + Sync {
    fn create(&self) -> Option<Arc<dyn UdfpsHandler>>;
    fn destroy(&self, handler: Arc<dyn UdfpsHandler>);
}
