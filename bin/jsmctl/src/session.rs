//! ---
//! jsm_section: "05-external-interfaces"
//! jsm_subsection: "binary"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Configuration, logging and translator setup for the console."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsm_common::config::AppConfig;
use jsm_common::logging::init_tracing;
use jsm_core::validate::required_fields;
use jsm_core::{Command, DeviceState, Translator};
use jsm_sim::SimulatedMeter;
use tracing::info;

const SERVICE_NAME: &str = "jsmctl";

/// Effective configuration and where it came from.
#[derive(Debug)]
pub struct Session {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

/// Load `explicit` if given, otherwise the first discovered candidate, falling
/// back to built-in defaults.
pub fn load_config(explicit: Option<&Path>, candidates: &[&str]) -> Result<Session> {
    let loaded = match explicit {
        Some(path) => Some(AppConfig::from_path(path.to_path_buf())?),
        None => AppConfig::discover(candidates)?,
    };
    Ok(match loaded {
        Some(loaded) => Session {
            config: loaded.config,
            source: Some(loaded.source),
        },
        None => Session {
            config: AppConfig::default(),
            source: None,
        },
    })
}

impl Session {
    /// File-backed logging when a configuration file was found, stderr only otherwise.
    pub fn init_logging(&self) -> Result<()> {
        match &self.source {
            Some(path) => {
                init_tracing(SERVICE_NAME, &self.config.logging)
                    .context("failed to initialise logging")?;
                info!(config = %path.display(), "configuration loaded");
            }
            None => jsm_logging::init(),
        }
        Ok(())
    }

    /// A translator bound to a fresh simulated meter seeded from the configuration.
    pub fn translator(&self) -> Result<Translator<SimulatedMeter>> {
        self.config
            .meter
            .validate()
            .context("invalid [meter] configuration")?;
        let meter = SimulatedMeter::from_config(&self.config.meter);
        let mut translator = Translator::new(meter, self.config.translator.clone());
        translator.begin(DeviceState::default().shared());
        Ok(translator)
    }
}

/// Print one line per command: wire name, direction and required payload fields.
pub fn print_commands() {
    for cmd in Command::all() {
        let fields = required_fields(cmd);
        if fields.is_empty() {
            println!("{:<22} {:<9} -", cmd.wire_name(), cmd.direction().as_ref());
        } else {
            println!("{:<22} {:<9} {}", cmd.wire_name(), cmd.direction().as_ref(), fields.join(", "));
        }
    }
}
