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

//! Process-wide logging setup

use tracing::error;

/// Environment variable holding the log filter (trace, debug, info, warn, error)
pub const LOG_ENV_VAR: &str = "FPHAL_LOG";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn log_level_from_env() -> String {
    std::env::var(LOG_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Install the global subscriber, writing to stderr.
///
/// Returns false if a subscriber was already installed.
pub fn init_logging() -> bool {
    let log_level = log_level_from_env();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(log_level.as_str())
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Log panics through tracing before unwinding continues.
///
/// Driver callbacks catch panics, so without this the message would only
/// reach stderr.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        error!("PANIC at {}: {}", location, message);
    }));
}
