//! # UBX Nav Library
//!
//! Driver for u-blox GNSS receivers speaking the UBX binary protocol.
//!
//! This library provides the byte-level frame decoder, the interpreter that
//! assembles navigation solutions from UBX packets, and the sequencer that
//! negotiates baud rate and message configuration with the receiver.

pub mod config;
pub mod error;
pub mod ubx;
pub mod navigation;
pub mod driver;
pub mod serial;
pub mod telemetry;
