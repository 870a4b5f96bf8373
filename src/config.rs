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

//! Typed key/value configuration for the sensor.
//!
//! Every key has a declared type and a default. Values live behind a lock
//! so they can be changed while the adapter is serving requests; readers
//! always see the latest value.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::Path;

use fp_error::{FingerprintError, Result};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

/// Environment variable naming a JSON config file
pub const CONFIG_ENV_VAR: &str = "FPHAL_CONFIG";

pub const KEY_TYPE: &str = "type";
pub const KEY_SENSOR_LOCATION: &str = "sensor_location";
pub const KEY_SENSOR_ID: &str = "sensor_id";
pub const KEY_SENSOR_STRENGTH: &str = "sensor_strength";
pub const KEY_NAVIGATION_GESTURE: &str = "navigation_gesture";
pub const KEY_DETECT_INTERACTION: &str = "detect_interaction";
pub const KEY_DISPLAY_TOUCH: &str = "display_touch";
pub const KEY_CONTROL_ILLUMINATION: &str = "control_illumination";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i32),
    Str(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigKind {
    Bool,
    Int,
    Str,
}

impl ConfigValue {
    pub fn kind(&self) -> ConfigKind {
        match self {
            ConfigValue::Bool(_) => ConfigKind::Bool,
            ConfigValue::Int(_) => ConfigKind::Int,
            ConfigValue::Str(_) => ConfigKind::Str,
        }
    }
}

/// Known keys with their defaults. The default also fixes the key's type.
fn default_value(key: &str) -> Option<ConfigValue> {
    let value = match key {
        KEY_TYPE => ConfigValue::Str(String::new()),
        KEY_SENSOR_LOCATION => ConfigValue::Str(String::new()),
        KEY_SENSOR_ID => ConfigValue::Int(0),
        KEY_SENSOR_STRENGTH => ConfigValue::Int(2),
        KEY_NAVIGATION_GESTURE => ConfigValue::Bool(false),
        KEY_DETECT_INTERACTION => ConfigValue::Bool(false),
        KEY_DISPLAY_TOUCH => ConfigValue::Bool(true),
        KEY_CONTROL_ILLUMINATION => ConfigValue::Bool(false),
        _ => return None,
    };
    Some(value)
}

pub const KNOWN_KEYS: &[&str] = &[
    KEY_TYPE,
    KEY_SENSOR_LOCATION,
    KEY_SENSOR_ID,
    KEY_SENSOR_STRENGTH,
    KEY_NAVIGATION_GESTURE,
    KEY_DETECT_INTERACTION,
    KEY_DISPLAY_TOUCH,
    KEY_CONTROL_ILLUMINATION,
];

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "1" | "y" | "yes" | "on" | "true" => Some(true),
        "0" | "n" | "no" | "off" | "false" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub struct FingerprintConfig {
    values: RwLock<HashMap<String, ConfigValue>>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintConfig {
    /// A config holding the default for every known key
    pub fn new() -> Self {
        let values = KNOWN_KEYS
            .iter()
            .filter_map(|k| default_value(k).map(|v| (k.to_string(), v)))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    /// Load from the file named by `FPHAL_CONFIG`, or defaults when unset
    pub fn from_env() -> Result<Self> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::load_json(Path::new(&path)),
            _ => {
                debug!("{} not set, using default fingerprint config", CONFIG_ENV_VAR);
                Ok(Self::new())
            }
        }
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| FingerprintError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    /// Parse a JSON object of key -> value on top of the defaults.
    ///
    /// Strings are accepted for int and bool keys and parsed the same way
    /// [`FingerprintConfig::set`] parses them.
    pub fn from_json_str(data: &str) -> Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(data)?;
        let config = Self::new();
        for (key, value) in map {
            match value {
                serde_json::Value::String(s) => config.set(&key, &s)?,
                serde_json::Value::Bool(b) => config.set_value(&key, ConfigValue::Bool(b))?,
                serde_json::Value::Number(n) => {
                    let v = n
                        .as_i64()
                        .and_then(|v| i32::try_from(v).ok())
                        .ok_or_else(|| FingerprintError::invalid_config(&key, format!("{} is not a 32-bit integer", n)))?;
                    config.set_value(&key, ConfigValue::Int(v))?
                }
                other => {
                    return Err(FingerprintError::invalid_config(
                        &key,
                        format!("unsupported JSON value {}", other),
                    ))
                }
            }
        }
        Ok(config)
    }

    /// Set a key from its textual form, parsed according to the key's type
    pub fn set(&self, key: &str, raw: &str) -> Result<()> {
        let kind = default_value(key)
            .ok_or_else(|| FingerprintError::MissingConfig(key.to_string()))?
            .kind();
        let value = match kind {
            ConfigKind::Str => ConfigValue::Str(raw.to_string()),
            ConfigKind::Int => ConfigValue::Int(
                raw.trim()
                    .parse::<i32>()
                    .map_err(|e| FingerprintError::invalid_config(key, e.to_string()))?,
            ),
            ConfigKind::Bool => ConfigValue::Bool(
                parse_bool(raw).ok_or_else(|| FingerprintError::invalid_config(key, format!("{:?} is not a boolean", raw)))?,
            ),
        };
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    pub fn set_value(&self, key: &str, value: ConfigValue) -> Result<()> {
        let expected = default_value(key)
            .ok_or_else(|| FingerprintError::MissingConfig(key.to_string()))?
            .kind();
        if value.kind() != expected {
            return Err(FingerprintError::invalid_config(
                key,
                format!("expected {:?}, got {:?}", expected, value.kind()),
            ));
        }
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        let value = self.values.read().get(key).cloned();
        if value.is_none() {
            warn!(key, "unknown fingerprint config key");
        }
        value
    }

    pub fn get_string(&self, key: &str) -> String {
        match self.get(key) {
            Some(ConfigValue::Str(s)) => s,
            Some(other) => {
                warn!(key, value = ?other, "config key is not a string");
                String::new()
            }
            None => String::new(),
        }
    }

    pub fn get_int(&self, key: &str) -> i32 {
        match self.get(key) {
            Some(ConfigValue::Int(v)) => v,
            Some(other) => {
                warn!(key, value = ?other, "config key is not an integer");
                0
            }
            None => 0,
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.get(key) {
            Some(ConfigValue::Bool(b)) => b,
            Some(other) => {
                warn!(key, value = ?other, "config key is not a boolean");
                false
            }
            None => false,
        }
    }

    /// Ordered copy of all current values, for diagnostics
    pub fn snapshot(&self) -> BTreeMap<String, ConfigValue> {
        self.values
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
