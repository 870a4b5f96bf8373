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

//! Sensor type resolution and capability assembly

use fp_error::{FingerprintError, Result};
use fp_protocol::{CommonProps, ComponentInfo, SensorProps, SensorStrength, SensorType, MAX_ENROLLMENTS_PER_USER};
use tracing::{info, warn};

use crate::config::{
    FingerprintConfig, KEY_CONTROL_ILLUMINATION, KEY_DETECT_INTERACTION, KEY_DISPLAY_TOUCH,
    KEY_NAVIGATION_GESTURE, KEY_SENSOR_ID, KEY_SENSOR_LOCATION, KEY_SENSOR_STRENGTH,
};
use crate::location::{describe_locations, parse_sensor_locations};

/// Map the `type` config value onto a sensor type.
///
/// Matching is exact and case sensitive.
pub fn sensor_type_from_config(value: &str) -> Result<SensorType> {
    match value {
        "udfps" => Ok(SensorType::UnderDisplayUltrasonic),
        "udfps_optical" => Ok(SensorType::UnderDisplayOptical),
        "side" => Ok(SensorType::PowerButton),
        "home" => Ok(SensorType::HomeButton),
        "rear" => Ok(SensorType::Rear),
        other => Err(FingerprintError::UnsupportedSensorType(other.to_string())),
    }
}

/// Build the capability descriptor from the current config.
pub fn build_sensor_props(config: &FingerprintConfig, sensor_type: SensorType) -> SensorProps {
    let raw_strength = config.get_int(KEY_SENSOR_STRENGTH);
    let (sensor_strength, clamped) = SensorStrength::from_raw(raw_strength);
    if clamped {
        warn!(
            raw_strength,
            ?sensor_strength,
            "sensor_strength out of range, clamped"
        );
    }

    let common_props = CommonProps {
        sensor_id: config.get_int(KEY_SENSOR_ID),
        sensor_strength,
        max_enrollments_per_user: MAX_ENROLLMENTS_PER_USER,
        component_info: vec![ComponentInfo::hardware(), ComponentInfo::software()],
    };

    let sensor_locations = parse_sensor_locations(&config.get_string(KEY_SENSOR_LOCATION));
    info!(
        "sensor type: {}, location: {}",
        sensor_type,
        describe_locations(&sensor_locations)
    );

    SensorProps {
        common_props,
        sensor_type,
        sensor_locations,
        supports_navigation_gestures: config.get_bool(KEY_NAVIGATION_GESTURE),
        supports_detect_interaction: config.get_bool(KEY_DETECT_INTERACTION),
        hal_handles_display_touches: config.get_bool(KEY_DISPLAY_TOUCH),
        hal_controls_illumination: config.get_bool(KEY_CONTROL_ILLUMINATION),
        touch_detection_parameters: None,
    }
}
