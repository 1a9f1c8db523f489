//! # UBX Protocol Module
//!
//! Implementation of the u-blox UBX binary protocol.
//!
//! This module handles:
//! - Fletcher-8 checksum accumulation shared by decoding and encoding
//! - Byte-at-a-time frame synchronization and validation
//! - Payload decoding for the navigation, monitoring and ack messages
//! - Interpretation of packets into a navigation solution
//! - Configuration command encoding and acknowledgement tracking

pub mod protocol;
pub mod checksum;
pub mod decoder;
pub mod packets;
pub mod interpreter;
pub mod encoder;
pub mod ack;
