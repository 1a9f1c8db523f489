//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, UbxNavError};

/// Baud rates the receiver UART supports, fastest first
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [230400, 115200, 57600, 38400, 19200, 9600];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    #[serde(default)]
    pub gps: GpsSettings,
    #[serde(default)]
    pub timing: TimingConfig,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    /// Target baud rate the receiver is switched to
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Receiver dynamic platform model
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DynamicsProfile {
    Pedestrian,
    #[default]
    AirLowDynamics,
    AirHighDynamics,
}

/// SBAS augmentation choice
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SbasMode {
    #[default]
    Auto,
    Egnos,
    Waas,
    Msas,
    Gagan,
    None,
}

/// Receiver product line, selects the measurement rate tier
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Ublox,
    /// u-blox 7 and newer modules running at 10 Hz
    Ublox7Plus,
}

/// Receiver configuration policy
#[derive(Debug, Deserialize, Clone)]
pub struct GpsSettings {
    #[serde(default = "default_true")]
    pub auto_baud: bool,

    #[serde(default = "default_true")]
    pub auto_config: bool,

    #[serde(default)]
    pub dynamics: DynamicsProfile,

    #[serde(default)]
    pub sbas: SbasMode,

    #[serde(default)]
    pub use_galileo: bool,

    #[serde(default)]
    pub provider: Provider,
}

/// Sequencer and inactivity timing
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,

    #[serde(default = "default_version_retries")]
    pub version_retries: u32,

    #[serde(default = "default_baud_change_delay_ms")]
    pub baud_change_delay_ms: u64,

    #[serde(default = "default_solution_timeout_ms")]
    pub solution_timeout_ms: u64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Daily-rolling log file directory; stdout only when unset
    #[serde(default)]
    pub directory: Option<String>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_read_timeout_ms() -> u64 { 10 }

fn default_true() -> bool { true }

fn default_command_timeout_ms() -> u64 { 200 }
fn default_ack_timeout_ms() -> u64 { 500 }
fn default_version_retries() -> u32 { 2 }
fn default_baud_change_delay_ms() -> u64 { 200 }
fn default_solution_timeout_ms() -> u64 { 2500 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_log_level() -> String { "info".to_string() }

impl Default for GpsSettings {
    fn default() -> Self {
        Self {
            auto_baud: true,
            auto_config: true,
            dynamics: DynamicsProfile::default(),
            sbas: SbasMode::default(),
            use_galileo: false,
            provider: Provider::default(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            ack_timeout_ms: default_ack_timeout_ms(),
            version_retries: default_version_retries(),
            baud_change_delay_ms: default_baud_change_delay_ms(),
            solution_timeout_ms: default_solution_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

/// Settings the driver engine reads
///
/// Derived from `[serial]`, `[gps]` and `[timing]`; the engine never sees
/// the file-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpsConfig {
    pub auto_baud: bool,
    pub auto_config: bool,
    pub target_baud: u32,
    pub dynamics: DynamicsProfile,
    pub sbas: SbasMode,
    pub use_galileo: bool,
    pub provider: Provider,
    pub command_timeout: Duration,
    pub ack_timeout: Duration,
    pub version_retries: u32,
    pub baud_change_delay: Duration,
}

impl Default for GpsConfig {
    fn default() -> Self {
        let timing = TimingConfig::default();
        let gps = GpsSettings::default();
        Self {
            auto_baud: gps.auto_baud,
            auto_config: gps.auto_config,
            target_baud: default_baud_rate(),
            dynamics: gps.dynamics,
            sbas: gps.sbas,
            use_galileo: gps.use_galileo,
            provider: gps.provider,
            command_timeout: Duration::from_millis(timing.command_timeout_ms),
            ack_timeout: Duration::from_millis(timing.ack_timeout_ms),
            version_retries: timing.version_retries,
            baud_change_delay: Duration::from_millis(timing.baud_change_delay_ms),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> UbxNavError {
    UbxNavError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ubx_nav::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400",
            ));
        }

        if self.serial.read_timeout_ms == 0 || self.serial.read_timeout_ms > 1000 {
            return Err(invalid("read_timeout_ms must be between 1 and 1000"));
        }

        if self.timing.command_timeout_ms == 0 || self.timing.command_timeout_ms > 10000 {
            return Err(invalid("command_timeout_ms must be between 1 and 10000"));
        }

        if self.timing.ack_timeout_ms == 0 || self.timing.ack_timeout_ms > 10000 {
            return Err(invalid("ack_timeout_ms must be between 1 and 10000"));
        }

        if !(1..=10).contains(&self.timing.version_retries) {
            return Err(invalid("version_retries must be between 1 and 10"));
        }

        if self.timing.baud_change_delay_ms > 5000 {
            return Err(invalid("baud_change_delay_ms must be at most 5000"));
        }

        if self.timing.solution_timeout_ms <= self.timing.ack_timeout_ms {
            return Err(invalid("solution_timeout_ms must be greater than ack_timeout_ms"));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.logging.level.trim().is_empty() {
            return Err(invalid("logging level cannot be empty"));
        }

        Ok(())
    }

    /// Driver settings derived from this configuration
    pub fn gps_config(&self) -> GpsConfig {
        GpsConfig {
            auto_baud: self.gps.auto_baud,
            auto_config: self.gps.auto_config,
            target_baud: self.serial.baud_rate,
            dynamics: self.gps.dynamics,
            sbas: self.gps.sbas,
            use_galileo: self.gps.use_galileo,
            provider: self.gps.provider,
            command_timeout: Duration::from_millis(self.timing.command_timeout_ms),
            ack_timeout: Duration::from_millis(self.timing.ack_timeout_ms),
            version_retries: self.timing.version_retries,
            baud_change_delay: Duration::from_millis(self.timing.baud_change_delay_ms),
        }
    }

    /// Inactivity bound after which the application restarts the driver
    pub fn solution_timeout(&self) -> Duration {
        Duration::from_millis(self.timing.solution_timeout_ms)
    }
}
