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

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{debug, info};

use fphal::config::FingerprintConfig;
use fphal::driver::NullLoader;
use fphal::location::parse_sensor_locations;
use fphal::logging::{init_logging, install_panic_hook, LOG_ENV_VAR};
use fphal::Fingerprint;

const VERSION: &str = env!("CARGO_PKG_VERSION");

enum Command {
    Props { config: Option<PathBuf> },
    Locations { text: String },
}

fn print_help() {
    eprintln!("fphal {} - fingerprint sensor HAL adapter", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    fphal props [--config <file>]   Print the sensor props as JSON");
    eprintln!("    fphal locations <text>          Parse a sensor_location value");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help       Print help information");
    eprintln!("    -v, --version    Print version information");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    FPHAL_CONFIG     Config file used when --config is not given");
    eprintln!("    {}        Log level (trace, debug, info, warn, error)", LOG_ENV_VAR);
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<Command>> {
    let Some(command) = args.get(1) else {
        print_help();
        return Ok(None);
    };

    match command.as_str() {
        "-h" | "--help" => {
            print_help();
            Ok(None)
        }
        "-v" | "--version" => {
            println!("fphal {}", VERSION);
            Ok(None)
        }
        "props" => {
            let mut config = None;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "-c" | "--config" => {
                        i += 1;
                        let path = args.get(i).context("--config requires a path argument")?;
                        config = Some(PathBuf::from(path));
                    }
                    arg => bail!("Unknown argument: {}", arg),
                }
                i += 1;
            }
            Ok(Some(Command::Props { config }))
        }
        "locations" => {
            let text = args.get(2).context("locations requires a text argument")?;
            Ok(Some(Command::Locations { text: text.clone() }))
        }
        other => bail!("Unknown command: {}", other),
    }
}

fn run_props(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => FingerprintConfig::load_json(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => FingerprintConfig::from_env().context("loading config from environment")?,
    };
    debug!(config = %serde_json::to_string(&config.snapshot())?, "fingerprint config");

    // Vendor modules come from the embedding process, so none resolve here
    let fingerprint = Fingerprint::new(Arc::new(config), &NullLoader, None)?;
    let props = fingerprint.get_sensor_props();
    println!("{}", serde_json::to_string_pretty(&props)?);
    Ok(())
}

fn run_locations(text: &str) -> anyhow::Result<()> {
    let locations = parse_sensor_locations(text);
    info!("Parsed {} sensor location(s)", locations.len());
    println!("{}", serde_json::to_string_pretty(&locations)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    install_panic_hook();
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let command = match parse_args(&args) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    match command {
        Command::Props { config } => run_props(config),
        Command::Locations { text } => run_locations(&text),
    }
}
