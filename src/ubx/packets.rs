//! # UBX Payload Decoding
//!
//! Typed views of the messages the driver consumes. Every field is read at
//! an explicit offset with explicit little-endian conversion, so the wire
//! layout is reproduced exactly without reinterpreting memory.

use super::protocol::*;
use crate::error::{Result, UbxNavError};

/// NAV-POSLLH payload size
pub const NAV_POSLLH_LEN: usize = 28;

/// NAV-STATUS payload size
pub const NAV_STATUS_LEN: usize = 16;

/// NAV-SOL payload size
pub const NAV_SOL_LEN: usize = 52;

/// NAV-VELNED payload size
pub const NAV_VELNED_LEN: usize = 36;

/// NAV-TIMEUTC payload size
pub const NAV_TIMEUTC_LEN: usize = 20;

/// NAV-PVT bytes consumed (through pDOP); newer firmware sends 92
pub const NAV_PVT_MIN_LEN: usize = 78;

/// MON-VER fixed part: swVersion(30) + hwVersion(10)
pub const MON_VER_MIN_LEN: usize = 40;

/// Size of each MON-VER extension string slot
pub const MON_VER_EXTENSION_LEN: usize = 30;

/// ACK-ACK / ACK-NACK payload size
pub const ACK_LEN: usize = 2;

/// Geodetic position solution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavPosLlh {
    /// GPS time of week (ms)
    pub itow: u32,
    /// Longitude (deg × 1e7)
    pub lon: i32,
    /// Latitude (deg × 1e7)
    pub lat: i32,
    /// Height above ellipsoid (mm)
    pub height: i32,
    /// Height above mean sea level (mm)
    pub height_msl: i32,
    /// Horizontal accuracy estimate (mm)
    pub h_acc: u32,
    /// Vertical accuracy estimate (mm)
    pub v_acc: u32,
}

/// Receiver navigation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavStatus {
    pub itow: u32,
    pub fix_type: UbxFixType,
    pub flags: u8,
}

/// Navigation solution information (ECEF fields are not consumed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavSol {
    pub itow: u32,
    pub fix_type: UbxFixType,
    pub flags: u8,
    /// Position DOP (× 0.01)
    pub pdop: u16,
    /// Satellites used in the solution
    pub num_sv: u8,
}

/// Velocity solution in NED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavVelNed {
    pub itow: u32,
    /// North velocity (cm/s)
    pub vel_n: i32,
    /// East velocity (cm/s)
    pub vel_e: i32,
    /// Down velocity (cm/s)
    pub vel_d: i32,
    /// 3D speed (cm/s)
    pub speed: u32,
    /// Ground speed (cm/s)
    pub ground_speed: u32,
    /// Heading of motion (deg × 1e5)
    pub heading: i32,
    /// Speed accuracy (cm/s)
    pub s_acc: u32,
    /// Course accuracy (deg × 1e5)
    pub c_acc: u32,
}

/// UTC calendar time, shared by NAV-TIMEUTC and NAV-PVT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
    /// Fraction of second (ns), may be negative
    pub nano: i32,
    /// Validity flags
    pub valid: u8,
}

impl UtcTime {
    /// Both the date-valid and time-valid bits are set
    pub fn is_valid(&self) -> bool {
        self.valid & TIME_VALID_DATE != 0 && self.valid & TIME_VALID_TIME != 0
    }
}

/// UTC time solution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavTimeUtc {
    pub itow: u32,
    /// Time accuracy (ns)
    pub t_acc: u32,
    pub utc: UtcTime,
}

/// Combined position, velocity and time solution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavPvt {
    pub itow: u32,
    pub utc: UtcTime,
    pub t_acc: u32,
    pub fix_type: UbxFixType,
    pub flags: u8,
    pub num_sv: u8,
    /// Longitude (deg × 1e7)
    pub lon: i32,
    /// Latitude (deg × 1e7)
    pub lat: i32,
    /// Height above ellipsoid (mm)
    pub height: i32,
    /// Height above mean sea level (mm)
    pub height_msl: i32,
    /// Horizontal accuracy (mm)
    pub h_acc: u32,
    /// Vertical accuracy (mm)
    pub v_acc: u32,
    /// North velocity (mm/s)
    pub vel_n: i32,
    /// East velocity (mm/s)
    pub vel_e: i32,
    /// Down velocity (mm/s)
    pub vel_d: i32,
    /// Ground speed (mm/s)
    pub ground_speed: i32,
    /// Heading of motion (deg × 1e5)
    pub heading: i32,
    pub s_acc: u32,
    pub head_acc: u32,
    /// Position DOP (× 0.01)
    pub pdop: u16,
}

/// Receiver and software version (borrowed view of the payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonVer<'a> {
    payload: &'a [u8],
}

impl<'a> MonVer<'a> {
    /// Raw zero-terminated software version field
    pub fn sw_version_bytes(&self) -> &'a [u8] {
        &self.payload[0..30]
    }

    /// Software version string, e.g. `ROM CORE 3.01 (107888)`
    pub fn sw_version(&self) -> &'a str {
        c_str(self.sw_version_bytes())
    }

    /// Hardware version string, e.g. `00080000`
    pub fn hw_version(&self) -> &'a str {
        c_str(&self.payload[30..40])
    }

    /// Extension string slots following the fixed part
    ///
    /// A trailing partial slot is yielded as-is.
    pub fn extensions(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.payload[MON_VER_MIN_LEN..].chunks(MON_VER_EXTENSION_LEN)
    }
}

/// Acknowledged (or rejected) request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPayload {
    /// Class of the acknowledged request
    pub class: u8,
    /// Id of the acknowledged request
    pub id: u8,
}

/// Decoded UBX packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UbxPacket<'a> {
    NavPosLlh(NavPosLlh),
    NavStatus(NavStatus),
    NavSol(NavSol),
    NavVelNed(NavVelNed),
    NavTimeUtc(NavTimeUtc),
    NavPvt(NavPvt),
    MonVer(MonVer<'a>),
    AckAck(AckPayload),
    AckNack(AckPayload),
    /// Any message the driver does not consume
    Other { class: u8, id: u8 },
}

impl<'a> UbxPacket<'a> {
    /// Decode a verified frame
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooShort` if a recognized message carries fewer bytes
    /// than its layout requires. Unrecognized messages are never an error.
    pub fn parse(frame: &RawFrame<'a>) -> Result<Self> {
        let p = frame.payload;

        let packet = match (frame.class, frame.id) {
            (CLASS_NAV, MSG_NAV_POSLLH) => {
                require("NAV-POSLLH", p, NAV_POSLLH_LEN)?;
                UbxPacket::NavPosLlh(NavPosLlh {
                    itow: le_u32(p, 0),
                    lon: le_i32(p, 4),
                    lat: le_i32(p, 8),
                    height: le_i32(p, 12),
                    height_msl: le_i32(p, 16),
                    h_acc: le_u32(p, 20),
                    v_acc: le_u32(p, 24),
                })
            }
            (CLASS_NAV, MSG_NAV_STATUS) => {
                require("NAV-STATUS", p, NAV_STATUS_LEN)?;
                UbxPacket::NavStatus(NavStatus {
                    itow: le_u32(p, 0),
                    fix_type: UbxFixType::from(p[4]),
                    flags: p[5],
                })
            }
            (CLASS_NAV, MSG_NAV_SOL) => {
                require("NAV-SOL", p, NAV_SOL_LEN)?;
                UbxPacket::NavSol(NavSol {
                    itow: le_u32(p, 0),
                    fix_type: UbxFixType::from(p[10]),
                    flags: p[11],
                    pdop: le_u16(p, 44),
                    num_sv: p[47],
                })
            }
            (CLASS_NAV, MSG_NAV_VELNED) => {
                require("NAV-VELNED", p, NAV_VELNED_LEN)?;
                UbxPacket::NavVelNed(NavVelNed {
                    itow: le_u32(p, 0),
                    vel_n: le_i32(p, 4),
                    vel_e: le_i32(p, 8),
                    vel_d: le_i32(p, 12),
                    speed: le_u32(p, 16),
                    ground_speed: le_u32(p, 20),
                    heading: le_i32(p, 24),
                    s_acc: le_u32(p, 28),
                    c_acc: le_u32(p, 32),
                })
            }
            (CLASS_NAV, MSG_NAV_TIMEUTC) => {
                require("NAV-TIMEUTC", p, NAV_TIMEUTC_LEN)?;
                UbxPacket::NavTimeUtc(NavTimeUtc {
                    itow: le_u32(p, 0),
                    t_acc: le_u32(p, 4),
                    utc: UtcTime {
                        nano: le_i32(p, 8),
                        year: le_u16(p, 12),
                        month: p[14],
                        day: p[15],
                        hour: p[16],
                        min: p[17],
                        sec: p[18],
                        valid: p[19],
                    },
                })
            }
            (CLASS_NAV, MSG_NAV_PVT) => {
                require("NAV-PVT", p, NAV_PVT_MIN_LEN)?;
                UbxPacket::NavPvt(NavPvt {
                    itow: le_u32(p, 0),
                    utc: UtcTime {
                        year: le_u16(p, 4),
                        month: p[6],
                        day: p[7],
                        hour: p[8],
                        min: p[9],
                        sec: p[10],
                        valid: p[11],
                        nano: le_i32(p, 16),
                    },
                    t_acc: le_u32(p, 12),
                    fix_type: UbxFixType::from(p[20]),
                    flags: p[21],
                    num_sv: p[23],
                    lon: le_i32(p, 24),
                    lat: le_i32(p, 28),
                    height: le_i32(p, 32),
                    height_msl: le_i32(p, 36),
                    h_acc: le_u32(p, 40),
                    v_acc: le_u32(p, 44),
                    vel_n: le_i32(p, 48),
                    vel_e: le_i32(p, 52),
                    vel_d: le_i32(p, 56),
                    ground_speed: le_i32(p, 60),
                    heading: le_i32(p, 64),
                    s_acc: le_u32(p, 68),
                    head_acc: le_u32(p, 72),
                    pdop: le_u16(p, 76),
                })
            }
            (CLASS_MON, MSG_MON_VER) => {
                require("MON-VER", p, MON_VER_MIN_LEN)?;
                UbxPacket::MonVer(MonVer { payload: p })
            }
            (CLASS_ACK, MSG_ACK_ACK) => {
                require("ACK-ACK", p, ACK_LEN)?;
                UbxPacket::AckAck(AckPayload { class: p[0], id: p[1] })
            }
            (CLASS_ACK, MSG_ACK_NACK) => {
                require("ACK-NACK", p, ACK_LEN)?;
                UbxPacket::AckNack(AckPayload { class: p[0], id: p[1] })
            }
            (class, id) => UbxPacket::Other { class, id },
        };

        Ok(packet)
    }
}

fn require(message: &'static str, payload: &[u8], min: usize) -> Result<()> {
    if payload.len() < min {
        return Err(UbxNavError::PayloadTooShort {
            message,
            len: payload.len(),
            min,
        });
    }
    Ok(())
}

#[inline]
fn le_u16(p: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([p[offset], p[offset + 1]])
}

#[inline]
fn le_u32(p: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([p[offset], p[offset + 1], p[offset + 2], p[offset + 3]])
}

#[inline]
fn le_i32(p: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([p[offset], p[offset + 1], p[offset + 2], p[offset + 3]])
}

/// Text up to the first NUL; non-UTF-8 content reads as empty
fn c_str(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).unwrap_or("")
}
