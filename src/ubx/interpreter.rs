//! # UBX Packet Interpreter
//!
//! Applies verified packets to the navigation solution and tracks the
//! state that spans several packets:
//!
//! - **Pending fix type**: NAV-STATUS / NAV-SOL report whether a fix is
//!   valid, NAV-POSLLH reports where it is. The fix type learned from the
//!   former is applied on the next position update.
//! - **Dirty flags**: a solution is complete only once both a position and a
//!   velocity have been written; completion clears both at once so a
//!   velocity is never published with a position from another epoch.
//! - **Hardware capabilities**: generation and Galileo support learned from
//!   MON-VER.
//! - **Acknowledgements**: routed to the [`AckTracker`].

use tracing::{debug, info};

use super::ack::AckTracker;
use super::packets::*;
use super::protocol::*;
use crate::navigation::{constrain_epe, constrain_hdop, FixType, GpsDateTime, NavigationSolution};

/// Extension marker announcing Galileo support
const GALILEO_MARKER: &[u8] = b"GAL";

/// Index of the major firmware digit in the MON-VER software string
/// (`ROM CORE 3.01 ...`); only firmware newer than 2.x lists GNSS support
/// in the extension strings.
const SW_VERSION_MAJOR_INDEX: usize = 9;

/// What the receiver told us about itself
///
/// Both fields are written once per session and read afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareCapabilities {
    generation: HardwareGeneration,
    galileo: bool,
}

impl HardwareCapabilities {
    pub fn generation(&self) -> HardwareGeneration {
        self.generation
    }

    pub fn supports_galileo(&self) -> bool {
        self.galileo
    }

    #[cfg(test)]
    pub(crate) fn with(generation: HardwareGeneration, galileo: bool) -> Self {
        Self { generation, galileo }
    }
}

/// Packet-to-solution interpreter
#[derive(Debug, Clone, Default)]
pub struct PacketInterpreter {
    solution: NavigationSolution,
    pending_fix: FixType,
    capabilities: HardwareCapabilities,
}

/// Map the receiver's fix report onto the solution fix type
///
/// Only a valid 2D or 3D fix counts; dead reckoning and time-only
/// solutions are reported as no fix.
pub fn map_fix_type(fix_valid: bool, fix_type: UbxFixType) -> FixType {
    match (fix_valid, fix_type) {
        (true, UbxFixType::Fix2D) => FixType::Fix2D,
        (true, UbxFixType::Fix3D) => FixType::Fix3D,
        _ => FixType::NoFix,
    }
}

/// Heading (deg × 1e5) to course over ground (deg × 100)
fn course_from_heading(heading: i32) -> u16 {
    (heading / 1000).clamp(0, 36_000) as u16
}

impl PacketInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn solution(&self) -> &NavigationSolution {
        &self.solution
    }

    pub fn capabilities(&self) -> HardwareCapabilities {
        self.capabilities
    }

    /// Fix type waiting for the next position update
    pub fn pending_fix(&self) -> FixType {
        self.pending_fix
    }

    /// Forget everything learned about the receiver and any pending
    /// cross-packet state
    ///
    /// The last solution values are kept so consumers see the last known
    /// position across a restart; only the dirty flags are cleared.
    pub fn reset(&mut self) {
        self.pending_fix = FixType::NoFix;
        self.capabilities = HardwareCapabilities::default();
        self.solution.has_new_position = false;
        self.solution.has_new_velocity = false;
    }

    /// Apply one verified frame
    ///
    /// # Arguments
    ///
    /// * `frame` - Checksum-verified frame from the decoder
    /// * `ack` - Tracker updated by ACK-ACK / ACK-NACK packets
    ///
    /// # Returns
    ///
    /// * `bool` - True when this packet completed a position + velocity
    ///   pair; both dirty flags have then been cleared
    pub fn apply(&mut self, frame: &RawFrame<'_>, ack: &mut AckTracker) -> bool {
        let packet = match UbxPacket::parse(frame) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("Ignoring UBX 0x{:02X}/0x{:02X}: {}", frame.class, frame.id, e);
                return false;
            }
        };

        match packet {
            UbxPacket::NavPosLlh(pos) => self.apply_position(&pos),
            UbxPacket::NavStatus(status) => {
                self.apply_fix_report(status.flags, status.fix_type);
            }
            UbxPacket::NavSol(sol) => {
                self.apply_fix_report(sol.flags, sol.fix_type);
                self.solution.num_sat = sol.num_sv;
                self.solution.hdop = constrain_hdop(sol.pdop);
            }
            UbxPacket::NavVelNed(vel) => self.apply_velocity(&vel),
            UbxPacket::NavTimeUtc(time) => self.apply_time(&time.utc),
            UbxPacket::NavPvt(pvt) => self.apply_pvt(&pvt),
            UbxPacket::MonVer(ver) => self.apply_version(&ver),
            UbxPacket::AckAck(answer) => ack.on_ack(&answer),
            UbxPacket::AckNack(answer) => ack.on_nack(&answer),
            UbxPacket::Other { .. } => return false,
        }

        self.solution.take_complete()
    }

    fn apply_position(&mut self, pos: &NavPosLlh) {
        let sol = &mut self.solution;
        sol.lon = pos.lon;
        sol.lat = pos.lat;
        sol.alt_cm = pos.height_msl / 10;
        sol.eph = constrain_epe(pos.h_acc);
        sol.epv = constrain_epe(pos.v_acc);
        sol.flags.valid_epe = true;

        if self.pending_fix != FixType::NoFix {
            sol.fix_type = self.pending_fix;
        }
        sol.has_new_position = true;
    }

    /// Losing fix validity shows up immediately, without waiting for the
    /// next position; position and velocity keep their last values.
    fn apply_fix_report(&mut self, flags: u8, fix_type: UbxFixType) {
        self.pending_fix = map_fix_type(flags & NAV_FLAGS_FIX_VALID != 0, fix_type);
        if self.pending_fix == FixType::NoFix {
            self.solution.fix_type = FixType::NoFix;
        }
    }

    fn apply_velocity(&mut self, vel: &NavVelNed) {
        let sol = &mut self.solution;
        sol.ground_speed = vel.ground_speed;
        sol.ground_course = course_from_heading(vel.heading);
        sol.vel_ned = [vel.vel_n, vel.vel_e, vel.vel_d];
        sol.flags.valid_vel_ne = true;
        sol.flags.valid_vel_d = true;
        sol.has_new_velocity = true;
    }

    fn apply_time(&mut self, utc: &UtcTime) {
        if utc.is_valid() {
            self.solution.time = GpsDateTime {
                year: utc.year,
                month: utc.month,
                day: utc.day,
                hours: utc.hour,
                minutes: utc.min,
                seconds: utc.sec,
                millis: (utc.nano / 1_000_000).max(0) as u16,
            };
            self.solution.flags.valid_time = true;
        } else {
            self.solution.flags.valid_time = false;
        }
    }

    fn apply_pvt(&mut self, pvt: &NavPvt) {
        self.pending_fix = map_fix_type(pvt.flags & NAV_FLAGS_FIX_VALID != 0, pvt.fix_type);

        let sol = &mut self.solution;
        sol.fix_type = self.pending_fix;
        sol.lon = pvt.lon;
        sol.lat = pvt.lat;
        sol.alt_cm = pvt.height_msl / 10;
        // PVT velocities are mm/s
        sol.vel_ned = [pvt.vel_n / 10, pvt.vel_e / 10, pvt.vel_d / 10];
        sol.ground_speed = (pvt.ground_speed / 10).max(0) as u32;
        sol.ground_course = course_from_heading(pvt.heading);
        sol.num_sat = pvt.num_sv;
        sol.eph = constrain_epe(pvt.h_acc);
        sol.epv = constrain_epe(pvt.v_acc);
        sol.hdop = constrain_hdop(pvt.pdop);
        sol.flags.valid_vel_ne = true;
        sol.flags.valid_vel_d = true;
        sol.flags.valid_epe = true;

        self.apply_time(&pvt.utc);

        self.solution.has_new_position = true;
        self.solution.has_new_velocity = true;
    }

    fn apply_version(&mut self, ver: &MonVer<'_>) {
        if self.capabilities.generation.is_known() {
            debug!("Ignoring repeated MON-VER, hardware already identified");
            return;
        }

        let generation = HardwareGeneration::from_hw_version(ver.hw_version());
        self.capabilities.generation = generation;
        info!(
            "Receiver hardware {:?} (hw {}, sw {})",
            generation,
            ver.hw_version(),
            ver.sw_version()
        );

        let sw_major = ver.sw_version_bytes()[SW_VERSION_MAJOR_INDEX];
        if generation >= HardwareGeneration::Ublox8 && sw_major > b'2' {
            let galileo = ver.extensions().any(|slot| {
                let text = slot.split(|&b| b == 0).next().unwrap_or(slot);
                text.windows(GALILEO_MARKER.len()).any(|w| w == GALILEO_MARKER)
            });
            if galileo {
                info!("Receiver supports Galileo");
                self.capabilities.galileo = true;
            }
        }
    }
}
