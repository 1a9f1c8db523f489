//! # Telemetry Module
//!
//! Records delivered navigation solutions to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting each solution as one JSON object per line
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the newest M files

pub mod logger;

pub use logger::{SolutionLogger, SolutionRecord};
