//! # UBX Command Encoder
//!
//! Builds outgoing configuration and poll packets.
//!
//! Packets are assembled into one reusable buffer: header, payload, then the
//! checksum over class through payload. The returned slice is valid until the
//! next `encode` call.

use bytes::{BufMut, BytesMut};

use super::checksum::ubx_checksum;
use super::protocol::*;
use crate::config::{DynamicsProfile, SbasMode};
use crate::error::{Result, UbxNavError};

/// Most constellation blocks a CFG-GNSS command may carry
pub const GNSS_MAX_BLOCKS: usize = 7;

/// GNSS id of SBAS in CFG-GNSS
pub const GNSS_ID_SBAS: u8 = 1;

/// GNSS id of Galileo in CFG-GNSS
pub const GNSS_ID_GALILEO: u8 = 2;

/// Tracking channels offered to CFG-GNSS
const GNSS_TRACKING_CHANNELS: u8 = 32;

/// CFG-NAV5 fix mode: automatic 2D / 3D
pub const FIX_MODE_AUTO: u8 = 3;

/// Default CFG-NAV5 engine settings
///
/// Byte 2 (dynamic model) and byte 3 (fix mode) are patched per command.
const NAV5_TEMPLATE: [u8; 36] = [
    0xFF, 0xFF, 0x03, 0x03, 0x00, 0x00, 0x00, 0x00, 0x10, 0x27, 0x00, 0x00, //
    0x05, 0x00, 0xFA, 0x00, 0xFA, 0x00, 0x64, 0x00, 0x2C, 0x01, 0x00, 0x3C, //
    0x00, 0x00, 0x00, 0x00, 0xC8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Build a complete UBX frame
///
/// # Arguments
///
/// * `class` - Message class
/// * `id` - Message id
/// * `payload` - Payload bytes
///
/// # Returns
///
/// * `Vec<u8>` - Sync bytes, header, payload and checksum
///
/// # Examples
///
/// ```
/// use ubx_nav::ubx::encoder::build_frame;
///
/// let frame = build_frame(0x0A, 0x04, &[]);
/// assert_eq!(frame, vec![0xB5, 0x62, 0x0A, 0x04, 0x00, 0x00, 0x0E, 0x34]);
/// ```
pub fn build_frame(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(UBX_HEADER_LEN + payload.len() + UBX_CHECKSUM_LEN);
    frame.push(UBX_SYNC_1);
    frame.push(UBX_SYNC_2);
    frame.push(class);
    frame.push(id);
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(payload);

    let (ck_a, ck_b) = ubx_checksum(&frame[2..]);
    frame.push(ck_a);
    frame.push(ck_b);
    frame
}

/// CFG-NAV5 dynamic platform model for a profile
pub fn dynamic_model(profile: DynamicsProfile) -> u8 {
    match profile {
        DynamicsProfile::Pedestrian => 3,
        DynamicsProfile::AirLowDynamics => 6,
        DynamicsProfile::AirHighDynamics => 8,
    }
}

/// SBAS PRN search mask (bit n = PRN 120 + n)
pub fn sbas_scan_mask(mode: SbasMode) -> u32 {
    fn prns(list: &[u32]) -> u32 {
        list.iter().fold(0, |mask, prn| mask | 1 << (prn - 120))
    }

    match mode {
        SbasMode::Auto | SbasMode::None => 0,
        SbasMode::Egnos => prns(&[123, 126, 136]),
        SbasMode::Waas => prns(&[131, 133, 138]),
        SbasMode::Msas => prns(&[129, 137]),
        SbasMode::Gagan => prns(&[127, 128]),
    }
}

/// One constellation entry of CFG-GNSS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GnssBlock {
    pub gnss_id: u8,
    pub res_trk_ch: u8,
    pub max_trk_ch: u8,
    pub enabled: bool,
    pub sig_cfg_mask: u8,
}

/// Ordered constellation list for CFG-GNSS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GnssConfigBlock {
    blocks: Vec<GnssBlock>,
}

impl GnssConfigBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the list sent during configuration
    ///
    /// The SBAS entry is always present and enabled unless SBAS is switched
    /// off. The Galileo entry is added only when the receiver reported
    /// Galileo support and it is enabled in the configuration.
    ///
    /// # Errors
    ///
    /// Returns `GnssBlockOverflow` if the list would exceed `GNSS_MAX_BLOCKS`.
    pub fn for_receiver(sbas: SbasMode, galileo: bool) -> Result<Self> {
        let mut config = Self::new();
        let sbas_enabled = sbas != SbasMode::None;

        config.push(GnssBlock {
            gnss_id: GNSS_ID_SBAS,
            res_trk_ch: u8::from(sbas_enabled),
            max_trk_ch: 3,
            enabled: sbas_enabled,
            sig_cfg_mask: 1,
        })?;

        if galileo {
            config.push(GnssBlock {
                gnss_id: GNSS_ID_GALILEO,
                res_trk_ch: 4,
                max_trk_ch: 8,
                enabled: true,
                sig_cfg_mask: 1,
            })?;
        }

        Ok(config)
    }

    /// Append a constellation entry
    ///
    /// # Errors
    ///
    /// Returns `GnssBlockOverflow` when the list is already full.
    pub fn push(&mut self, block: GnssBlock) -> Result<()> {
        if self.blocks.len() >= GNSS_MAX_BLOCKS {
            return Err(UbxNavError::GnssBlockOverflow(GNSS_MAX_BLOCKS));
        }
        self.blocks.push(block);
        Ok(())
    }

    pub fn blocks(&self) -> &[GnssBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Outgoing command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UbxCommand {
    /// MON-VER poll (empty payload)
    PollVersion,
    /// CFG-MSG: output rate of one message on the current port
    SetMessageRate { class: u8, id: u8, rate: u8 },
    /// CFG-NAV5 with automatic fix mode
    SetNavSettings { dynamics: DynamicsProfile },
    /// CFG-RATE: measurement interval
    SetRate { meas_rate_ms: u16 },
    /// CFG-SBAS
    SetSbas(SbasMode),
    /// CFG-GNSS
    SetGnss(GnssConfigBlock),
}

impl UbxCommand {
    /// Class and id of the packet this command produces
    pub fn class_id(&self) -> (u8, u8) {
        match self {
            UbxCommand::PollVersion => (CLASS_MON, MSG_MON_VER),
            UbxCommand::SetMessageRate { .. } => (CLASS_CFG, MSG_CFG_MSG),
            UbxCommand::SetNavSettings { .. } => (CLASS_CFG, MSG_CFG_NAV5),
            UbxCommand::SetRate { .. } => (CLASS_CFG, MSG_CFG_RATE),
            UbxCommand::SetSbas(_) => (CLASS_CFG, MSG_CFG_SBAS),
            UbxCommand::SetGnss(_) => (CLASS_CFG, MSG_CFG_GNSS),
        }
    }

    fn write_payload(&self, buf: &mut BytesMut) {
        match self {
            UbxCommand::PollVersion => {}
            UbxCommand::SetMessageRate { class, id, rate } => {
                buf.put_u8(*class);
                buf.put_u8(*id);
                buf.put_u8(*rate);
            }
            UbxCommand::SetNavSettings { dynamics } => {
                let mut payload = NAV5_TEMPLATE;
                payload[2] = dynamic_model(*dynamics);
                payload[3] = FIX_MODE_AUTO;
                buf.put_slice(&payload);
            }
            UbxCommand::SetRate { meas_rate_ms } => {
                buf.put_u16_le(*meas_rate_ms);
                // One measurement per solution, aligned to GPS time
                buf.put_u16_le(1);
                buf.put_u16_le(1);
            }
            UbxCommand::SetSbas(mode) => {
                buf.put_u8(if *mode == SbasMode::None { 2 } else { 3 });
                buf.put_u8(3); // usage: range + differential corrections
                buf.put_u8(3); // max SBAS channels
                buf.put_u8(0); // scanmode2
                buf.put_u32_le(sbas_scan_mask(*mode));
            }
            UbxCommand::SetGnss(config) => {
                buf.put_u8(0); // msgVer
                buf.put_u8(0); // numTrkChHw, read-only
                buf.put_u8(GNSS_TRACKING_CHANNELS);
                buf.put_u8(config.len() as u8);
                for block in config.blocks() {
                    buf.put_u8(block.gnss_id);
                    buf.put_u8(block.res_trk_ch);
                    buf.put_u8(block.max_trk_ch);
                    buf.put_u8(0);
                    buf.put_u8(u8::from(block.enabled));
                    buf.put_u8(0);
                    buf.put_u8(block.sig_cfg_mask);
                    buf.put_u8(0);
                }
            }
        }
    }
}

/// Encoder with a reusable output buffer
#[derive(Debug)]
pub struct CommandEncoder {
    buffer: BytesMut,
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandEncoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(UBX_HEADER_LEN + UBX_MAX_PAYLOAD_SIZE + UBX_CHECKSUM_LEN),
        }
    }

    /// Encode a command into the internal buffer
    ///
    /// # Arguments
    ///
    /// * `command` - Command to encode
    ///
    /// # Returns
    ///
    /// * `&[u8]` - Complete frame ready for the transport
    pub fn encode(&mut self, command: &UbxCommand) -> &[u8] {
        let (class, id) = command.class_id();

        self.buffer.clear();
        self.buffer.put_u8(UBX_SYNC_1);
        self.buffer.put_u8(UBX_SYNC_2);
        self.buffer.put_u8(class);
        self.buffer.put_u8(id);
        self.buffer.put_u16_le(0);

        command.write_payload(&mut self.buffer);

        let payload_len = (self.buffer.len() - UBX_HEADER_LEN) as u16;
        self.buffer[4..6].copy_from_slice(&payload_len.to_le_bytes());

        let (ck_a, ck_b) = ubx_checksum(&self.buffer[2..]);
        self.buffer.put_u8(ck_a);
        self.buffer.put_u8(ck_b);

        &self.buffer
    }
}

/// NMEA `$PUBX,41` sentence switching the receiver's UART to `baud`
///
/// Input protocols UBX + NMEA, output UBX only.
///
/// # Examples
///
/// ```
/// use ubx_nav::ubx::encoder::baud_change_sentence;
///
/// assert_eq!(baud_change_sentence(115200), "$PUBX,41,1,0003,0001,115200,0*1E\r\n");
/// ```
pub fn baud_change_sentence(baud: u32) -> String {
    let body = format!("PUBX,41,1,0003,0001,{},0", baud);
    format!("${}*{:02X}\r\n", body, nmea_checksum(&body))
}

/// XOR of all characters between `$` and `*`
fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}
