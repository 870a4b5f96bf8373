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

//! Sensor location parsing.
//!
//! The `sensor_location` config value is a comma separated list of entries,
//! each `x|y|radius` or `x|y|radius|display`. Bad entries are skipped.

use fp_protocol::SensorLocation;
use tracing::warn;

const ENTRY_SEPARATOR: char = ',';
const FIELD_SEPARATOR: char = '|';

/// Parse every well-formed entry of `text`, in input order
pub fn parse_sensor_locations(text: &str) -> Vec<SensorLocation> {
    text.split(ENTRY_SEPARATOR)
        .filter_map(|entry| parse_entry(text, entry))
        .collect()
}

fn parse_entry(text: &str, entry: &str) -> Option<SensorLocation> {
    let fields: Vec<&str> = entry.split(FIELD_SEPARATOR).collect();

    if fields.len() != 3 && fields.len() != 4 {
        // An empty value just means no locations are configured
        if !text.is_empty() {
            warn!(
                "Invalid sensor location input (x|y|radius) or (x|y|radius|display): {}",
                text
            );
        }
        return None;
    }

    let x = fields[0].parse::<i32>().ok();
    let y = fields[1].parse::<i32>().ok();
    let radius = fields[2].parse::<i32>().ok();
    let (Some(x), Some(y), Some(radius)) = (x, y, radius) else {
        warn!(entry, "Sensor location has a non-integer coordinate, skipping");
        return None;
    };

    if radius < 0 {
        warn!(entry, radius, "Sensor location has a negative radius, skipping");
        return None;
    }

    let display = match fields.get(3) {
        Some(d) if d.is_empty() => {
            warn!(entry, "Sensor location has an empty display id, skipping");
            return None;
        }
        Some(d) => d.to_string(),
        None => String::new(),
    };

    Some(SensorLocation {
        sensor_location_x: x,
        sensor_location_y: y,
        sensor_radius: radius,
        display,
    })
}

/// Human readable join of locations, used for logging
pub fn describe_locations(locations: &[SensorLocation]) -> String {
    locations
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
