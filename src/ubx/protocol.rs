//! # UBX Protocol Constants and Types
//!
//! Core wire definitions for the UBX binary protocol.
//!
//! Frame layout:
//! ```text
//! 0xB5 0x62 | class | id | len_lo len_hi | payload (len bytes) | ck_a ck_b
//! ```
//! The checksum covers class, id, both length bytes and the payload.

use serde::Serialize;

/// First UBX sync byte
pub const UBX_SYNC_1: u8 = 0xB5;

/// Second UBX sync byte
pub const UBX_SYNC_2: u8 = 0x62;

/// Header size: sync(2) + class(1) + id(1) + length(2)
pub const UBX_HEADER_LEN: usize = 6;

/// Trailing checksum size
pub const UBX_CHECKSUM_LEN: usize = 2;

/// Largest payload the decoder will accept
pub const UBX_MAX_PAYLOAD_SIZE: usize = 256;

// Message classes
pub const CLASS_NAV: u8 = 0x01;
pub const CLASS_ACK: u8 = 0x05;
pub const CLASS_CFG: u8 = 0x06;
pub const CLASS_MON: u8 = 0x0A;
pub const CLASS_NMEA: u8 = 0xF0;

// ACK class ids
pub const MSG_ACK_NACK: u8 = 0x00;
pub const MSG_ACK_ACK: u8 = 0x01;

// NAV class ids
pub const MSG_NAV_POSLLH: u8 = 0x02;
pub const MSG_NAV_STATUS: u8 = 0x03;
pub const MSG_NAV_SOL: u8 = 0x06;
pub const MSG_NAV_PVT: u8 = 0x07;
pub const MSG_NAV_VELNED: u8 = 0x12;
pub const MSG_NAV_TIMEUTC: u8 = 0x21;
pub const MSG_NAV_SVINFO: u8 = 0x30;
pub const MSG_NAV_SAT: u8 = 0x35;
pub const MSG_NAV_SIG: u8 = 0x43;

// CFG class ids
pub const MSG_CFG_MSG: u8 = 0x01;
pub const MSG_CFG_RATE: u8 = 0x08;
pub const MSG_CFG_SBAS: u8 = 0x16;
pub const MSG_CFG_NAV5: u8 = 0x24;
pub const MSG_CFG_GNSS: u8 = 0x3E;

// MON class ids
pub const MSG_MON_VER: u8 = 0x04;

/// Legacy NMEA sentence ids (class 0xF0) switched off during configuration:
/// GGA, GLL, GSA, GSV, RMC, VTG
pub const NMEA_SENTENCE_IDS: [u8; 6] = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05];

/// Fix-valid bit in the NAV-STATUS / NAV-SOL / NAV-PVT flags byte
pub const NAV_FLAGS_FIX_VALID: u8 = 0x01;

/// Date-valid bit in the NAV-TIMEUTC / NAV-PVT validity byte
pub const TIME_VALID_DATE: u8 = 0x01;

/// Time-valid bit in the NAV-TIMEUTC / NAV-PVT validity byte
pub const TIME_VALID_TIME: u8 = 0x02;

/// Fix type as reported by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UbxFixType {
    NoFix,
    DeadReckoning,
    Fix2D,
    Fix3D,
    GpsDeadReckoning,
    TimeOnly,
    /// Values outside the documented range
    Reserved(u8),
}

impl From<u8> for UbxFixType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::NoFix,
            1 => Self::DeadReckoning,
            2 => Self::Fix2D,
            3 => Self::Fix3D,
            4 => Self::GpsDeadReckoning,
            5 => Self::TimeOnly,
            other => Self::Reserved(other),
        }
    }
}

/// Receiver hardware generation, derived from the MON-VER hardware string
///
/// Variants are declared oldest first so that ordering comparisons
/// (`generation >= HardwareGeneration::Ublox8`) follow hardware age.
/// `Unknown` sorts below every known generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareGeneration {
    #[default]
    Unknown,
    Ublox5,
    Ublox6,
    Ublox7,
    Ublox8,
    Ublox9,
    Ublox10,
}

/// Known MON-VER `hwVersion` strings
const HW_VERSION_TABLE: [(&str, HardwareGeneration); 6] = [
    ("00040005", HardwareGeneration::Ublox5),
    ("00040007", HardwareGeneration::Ublox6),
    ("00070000", HardwareGeneration::Ublox7),
    ("00080000", HardwareGeneration::Ublox8),
    ("00190000", HardwareGeneration::Ublox9),
    ("000A0000", HardwareGeneration::Ublox10),
];

impl HardwareGeneration {
    /// Look up a generation from the MON-VER hardware version string
    ///
    /// Unrecognized strings map to `Unknown`; this is never an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use ubx_nav::ubx::protocol::HardwareGeneration;
    ///
    /// assert_eq!(HardwareGeneration::from_hw_version("00080000"), HardwareGeneration::Ublox8);
    /// assert_eq!(HardwareGeneration::from_hw_version("DEADBEEF"), HardwareGeneration::Unknown);
    /// ```
    pub fn from_hw_version(hw_version: &str) -> Self {
        HW_VERSION_TABLE
            .iter()
            .find(|(version, _)| *version == hw_version)
            .map(|&(_, generation)| generation)
            .unwrap_or(HardwareGeneration::Unknown)
    }

    /// Whether the generation was identified
    pub fn is_known(self) -> bool {
        self != HardwareGeneration::Unknown
    }
}

/// A framed, checksum-verified UBX packet
///
/// Borrows the payload from the decoder's buffer; it is valid until the
/// next byte is fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    /// Message class
    pub class: u8,

    /// Message id
    pub id: u8,

    /// Length declared in the header
    pub declared_length: u16,

    /// Payload bytes (never longer than `UBX_MAX_PAYLOAD_SIZE`)
    pub payload: &'a [u8],
}
