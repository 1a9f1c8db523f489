//! # UBX Nav
//!
//! Reads navigation solutions from a u-blox receiver on a serial port.
//!
//! The application opens the port, lets the driver negotiate baud rate and
//! message configuration, then logs every delivered solution.

use anyhow::{Context, Result};
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use ubx_nav::config::{Config, LoggingConfig};
use ubx_nav::driver::UbloxDriver;
use ubx_nav::serial::{BufferedTransport, GpsSerial, DEFAULT_DEVICE_PATHS};
use ubx_nav::telemetry::SolutionLogger;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Interval between status log messages
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Main entry point for UBX Nav
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (path from the first argument)
///    - Set up logging, optionally to a daily-rolling file
///    - Open the serial port and create the driver
///
/// 2. **Main Loop**
///    - Read serial input with a short timeout and tick the driver
///    - Execute queued writes and baud changes
///    - Record delivered solutions to telemetry
///    - Restart the driver when solutions stop arriving
///
/// 3. **Graceful Shutdown** on Ctrl+C
///
/// # Errors
///
/// Returns error if the configuration is invalid, the serial port cannot be
/// opened or the telemetry directory cannot be created.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging)?;

    info!("UBX Nav v{} starting...", env!("CARGO_PKG_VERSION"));

    let paths = device_paths(&config.serial.port);
    let mut serial = GpsSerial::open_with_paths(&paths, config.serial.baud_rate)?;
    info!("GPS serial port opened at: {}", serial.device_path());

    let mut transport = BufferedTransport::new(config.serial.baud_rate);
    let mut driver = UbloxDriver::new(config.gps_config());

    let mut logger = if config.telemetry.enabled {
        Some(SolutionLogger::new(
            &config.telemetry.log_dir,
            config.telemetry.max_records_per_file,
            config.telemetry.max_files_to_keep,
        )?)
    } else {
        None
    };

    let read_timeout = Duration::from_millis(config.serial.read_timeout_ms);
    let solution_timeout = config.solution_timeout();
    let mut status_interval = interval(STATUS_INTERVAL);

    let mut watchdog = SolutionWatchdog::new(solution_timeout, Instant::now());
    let mut solution_count: u64 = 0;

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            received = serial.receive(&mut transport, read_timeout) => {
                if let Err(e) = received {
                    warn!("{}", e);
                    tokio::time::sleep(read_timeout).await;
                }

                let now = Instant::now();
                driver.tick(&mut transport, now);

                if let Err(e) = serial.flush_ops(&mut transport).await {
                    warn!("{}", e);
                }

                let hardware = driver.hardware_generation();
                if let Some(solution) = driver.take_solution() {
                    solution_count += 1;
                    watchdog.solution_delivered(now);
                    debug!(
                        "Fix {:?}: lat {} lon {} alt {} cm, {} sats",
                        solution.fix_type, solution.lat, solution.lon, solution.alt_cm, solution.num_sat
                    );

                    if let Some(logger) = logger.as_mut() {
                        if let Err(e) = logger.log(solution, hardware) {
                            warn!("Failed to record solution: {}", e);
                        }
                    }
                }

                if watchdog.restart_due(driver.is_configured(), now) {
                    warn!("No solution for {:?}, restarting receiver configuration", solution_timeout);
                    transport.clear();
                    driver.restart();
                }
            }

            _ = status_interval.tick() => {
                let stats = driver.stats();
                info!(
                    "{} solutions, {} packets, {} errors ({:?}, configured: {})",
                    solution_count,
                    stats.packet_count,
                    stats.errors,
                    driver.hardware_generation(),
                    driver.is_configured()
                );
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total solutions received: {}", solution_count);
                break;
            }
        }
    }

    Ok(())
}

/// Decides when a configured receiver has gone quiet for too long
///
/// The timeout only runs while the receiver is configured, and starts over
/// each time configuration finishes.
#[derive(Debug)]
struct SolutionWatchdog {
    timeout: Duration,
    last_activity: Instant,
    was_configured: bool,
}

impl SolutionWatchdog {
    fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_activity: now,
            was_configured: false,
        }
    }

    fn solution_delivered(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Whether the driver should be restarted now
    ///
    /// A `true` result assumes the caller restarts, so configuration is
    /// expected to begin again.
    fn restart_due(&mut self, configured: bool, now: Instant) -> bool {
        if !configured {
            self.was_configured = false;
            return false;
        }
        if !self.was_configured {
            self.was_configured = true;
            self.last_activity = now;
            return false;
        }
        if now.duration_since(self.last_activity) > self.timeout {
            self.was_configured = false;
            self.last_activity = now;
            return true;
        }
        false
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// must stay alive for file output to be flushed.
fn init_logging(logging: &LoggingConfig) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "ubx-nav.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Configured port first, then the fallbacks not already listed
fn device_paths(configured: &str) -> Vec<&str> {
    let mut paths = vec![configured];
    paths.extend(DEFAULT_DEVICE_PATHS.iter().copied().filter(|p| *p != configured));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_paths_configured_first() {
        assert_eq!(device_paths("/dev/ttyS1"), vec!["/dev/ttyS1", "/dev/ttyUSB0", "/dev/ttyACM0"]);
    }

    #[test]
    fn test_device_paths_no_duplicates() {
        assert_eq!(device_paths("/dev/ttyACM0"), vec!["/dev/ttyACM0", "/dev/ttyUSB0"]);
    }

    #[test]
    fn test_watchdog_ignores_configuration_time() {
        let timeout = Duration::from_millis(5000);
        let start = Instant::now();
        let mut watchdog = SolutionWatchdog::new(timeout, start);

        // Configuration outlasts the timeout
        assert!(!watchdog.restart_due(false, start + Duration::from_millis(7800)));

        let configured = start + Duration::from_millis(7850);
        assert!(!watchdog.restart_due(true, configured));
        assert!(!watchdog.restart_due(true, configured + timeout));
        assert!(watchdog.restart_due(true, configured + timeout + Duration::from_millis(1)));
    }

    #[test]
    fn test_watchdog_solutions_keep_it_quiet() {
        let timeout = Duration::from_millis(1000);
        let start = Instant::now();
        let mut watchdog = SolutionWatchdog::new(timeout, start);
        assert!(!watchdog.restart_due(true, start));

        for step in 1..=10u64 {
            let now = start + Duration::from_millis(600 * step);
            watchdog.solution_delivered(now);
            assert!(!watchdog.restart_due(true, now));
        }
    }

    #[test]
    fn test_watchdog_rearms_after_restart() {
        let timeout = Duration::from_millis(1000);
        let start = Instant::now();
        let mut watchdog = SolutionWatchdog::new(timeout, start);

        assert!(!watchdog.restart_due(true, start));
        let fired = start + Duration::from_millis(1001);
        assert!(watchdog.restart_due(true, fired));

        // Second configuration takes longer than the timeout again
        let reconfigured = fired + Duration::from_millis(3000);
        assert!(!watchdog.restart_due(false, fired + Duration::from_millis(10)));
        assert!(!watchdog.restart_due(true, reconfigured));
        assert!(!watchdog.restart_due(true, reconfigured + Duration::from_millis(500)));
    }

    #[test]
    fn test_status_interval() {
        assert_eq!(STATUS_INTERVAL, Duration::from_secs(5));
    }
}
