//! # Navigation Solution
//!
//! The canonical record written by the packet interpreter and handed to
//! consumers once a matching position + velocity pair has been assembled.
//!
//! Units follow the flight-controller conventions used on the wire side:
//! - latitude / longitude: degrees × 1e7
//! - altitude, error estimates: centimeters
//! - velocities, ground speed: cm/s
//! - ground course: degrees × 100

use serde::Serialize;

/// Upper bound for the horizontal / vertical error estimates (cm)
pub const EPE_MAX: u16 = 9999;

/// Upper bound for the dilution of precision (× 0.01)
pub const HDOP_MAX: u16 = 9999;

/// Quality of the current fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FixType {
    #[default]
    #[serde(rename = "no_fix")]
    NoFix,
    #[serde(rename = "2d")]
    Fix2D,
    #[serde(rename = "3d")]
    Fix3D,
}

/// UTC date and time of the solution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GpsDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub millis: u16,
}

/// Validity of the individual solution parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SolutionFlags {
    pub valid_vel_ne: bool,
    pub valid_vel_d: bool,
    pub valid_epe: bool,
    pub valid_time: bool,
}

/// Navigation solution record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NavigationSolution {
    pub fix_type: FixType,
    pub num_sat: u8,

    /// Latitude (deg × 1e7)
    pub lat: i32,
    /// Longitude (deg × 1e7)
    pub lon: i32,
    /// Altitude above mean sea level (cm)
    pub alt_cm: i32,

    /// Velocity north / east / down (cm/s)
    pub vel_ned: [i32; 3],
    /// Ground speed (cm/s)
    pub ground_speed: u32,
    /// Course over ground (deg × 100)
    pub ground_course: u16,

    /// Horizontal position error estimate (cm)
    pub eph: u16,
    /// Vertical position error estimate (cm)
    pub epv: u16,
    /// Horizontal dilution of precision (× 0.01)
    pub hdop: u16,

    pub time: GpsDateTime,
    pub flags: SolutionFlags,

    #[serde(skip)]
    pub(crate) has_new_position: bool,
    #[serde(skip)]
    pub(crate) has_new_velocity: bool,
}

impl NavigationSolution {
    /// Position was written since the last completed solution
    pub fn has_new_position(&self) -> bool {
        self.has_new_position
    }

    /// Velocity was written since the last completed solution
    pub fn has_new_velocity(&self) -> bool {
        self.has_new_velocity
    }

    /// Clear both dirty flags if both are set
    ///
    /// Returns true exactly when a position and a velocity from the same
    /// update pass were pending; the flags are then cleared together.
    pub(crate) fn take_complete(&mut self) -> bool {
        if self.has_new_position && self.has_new_velocity {
            self.has_new_position = false;
            self.has_new_velocity = false;
            true
        } else {
            false
        }
    }
}

/// Clamp an accuracy estimate (mm) to centimeters within `EPE_MAX`
pub fn constrain_epe(accuracy_mm: u32) -> u16 {
    (accuracy_mm / 10).min(u32::from(EPE_MAX)) as u16
}

/// Clamp a dilution of precision to `HDOP_MAX`
pub fn constrain_hdop(dop: u16) -> u16 {
    dop.min(HDOP_MAX)
}
