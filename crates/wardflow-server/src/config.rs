//! Runtime configuration for the simulator binary.
//!
//! Loaded from a TOML file plus `WARDFLOW__`-prefixed environment overrides,
//! e.g. `WARDFLOW__SERVER__PORT=9090` or
//! `WARDFLOW__SIMULATION__PATHWAYS_PER_HOUR=60`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wardflow_engine::{ED, LocationDefinition};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Points of care by name. An `ED` entry is required; admissions without
    /// a prior location fall back to it.
    #[serde(default = "default_locations")]
    pub locations: HashMap<String, LocationDefinition>,
    #[serde(default)]
    pub output: OutputConfig,
    /// Canned message bodies by name, selected by hardcoded-message steps.
    #[serde(default)]
    pub hardcoded_messages: HashMap<String, CannedMessageConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            simulation: SimulationConfig::default(),
            locations: default_locations(),
            output: OutputConfig::default(),
            hardcoded_messages: HashMap::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if !self.simulation.pathways_per_hour.is_finite()
            || self.simulation.pathways_per_hour < 0.0
        {
            return Err("simulation.pathways_per_hour must be >= 0".into());
        }
        if self.simulation.sleep_for.is_zero() {
            return Err("simulation.sleep_for must be > 0".into());
        }
        if self.simulation.pathways_file.is_empty() {
            return Err("simulation.pathways_file must not be empty".into());
        }
        if !self.locations.contains_key(ED) {
            return Err(format!("locations must define \"{ED}\""));
        }
        if self.output.target == OutputTarget::File && self.output.file.is_empty() {
            return Err("output.file must not be empty when output.target is \"file\"".into());
        }
        for (name, message) in &self.hardcoded_messages {
            if message.body.is_empty() {
                return Err(format!("hardcoded_messages.{name}.body must not be empty"));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Starting pathway rate; adjustable at runtime over HTTP.
    #[serde(default = "default_pathways_per_hour")]
    pub pathways_per_hour: f64,
    /// Stop creating pathways after this many. Negative means no bound.
    #[serde(default = "default_max_pathways")]
    pub max_pathways: i64,
    /// Polling interval of the event and message loops, e.g. "1s".
    #[serde(default = "default_sleep_for", with = "humantime_serde")]
    pub sleep_for: Duration,
    /// Drop finished patients from memory instead of keeping a soft-deleted
    /// copy around for late cross-patient references.
    #[serde(default)]
    pub delete_patients_from_memory: bool,
    /// TOML file holding the pathway definitions to cycle through.
    #[serde(default = "default_pathways_file")]
    pub pathways_file: String,
}

fn default_pathways_per_hour() -> f64 {
    1.0
}
fn default_max_pathways() -> i64 {
    -1
}
fn default_sleep_for() -> Duration {
    Duration::from_secs(1)
}
fn default_pathways_file() -> String {
    "pathways.toml".into()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            pathways_per_hour: default_pathways_per_hour(),
            max_pathways: default_max_pathways(),
            sleep_for: default_sleep_for(),
            delete_patients_from_memory: false,
            pathways_file: default_pathways_file(),
        }
    }
}

fn default_locations() -> HashMap<String, LocationDefinition> {
    HashMap::from([(ED.to_string(), LocationDefinition::default())])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    Stdout,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_target")]
    pub target: OutputTarget,
    /// Destination path when `target` is `file`.
    #[serde(default = "default_output_file")]
    pub file: String,
}

fn default_output_target() -> OutputTarget {
    OutputTarget::Stdout
}
fn default_output_file() -> String {
    "messages.out".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target: default_output_target(),
            file: default_output_file(),
        }
    }
}

/// One canned message body. `%MRN%`, `%FIRST_NAME%`, `%SURNAME%` and `%NOW%`
/// placeholders are filled in when the message is selected.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CannedMessageConfig {
    pub message_type: String,
    pub trigger_event: String,
    pub body: String,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("wardflow.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("WARDFLOW")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
