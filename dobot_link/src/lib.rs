use int_enum::IntEnum;
use serde::{Deserialize, Serialize};

pub mod errors;
pub mod protocol;
pub use errors::*;

#[cfg(feature = "driver")]
pub mod drivers;

/// Firmware flavor reported by the controller.
///
/// The mode byte of the firmware-mode command selects which firmware the
/// controller is currently running (or should reboot into, for the switch
/// command). `Upgrade` is the bootloader mode used for flashing; issuing the
/// switch is in scope for this crate, transferring the image is not.
#[repr(u8)]
#[derive(Debug, Serialize, Deserialize, IntEnum, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareKind {
    Dobot = 0,
    Marlin = 1,
    Upgrade = 2,
}

/// Firmware version as reported by the device-version command.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
    pub hardware: u8,
}

impl std::fmt::Display for DeviceVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{} (hw {})",
            self.major, self.minor, self.revision, self.hardware
        )
    }
}

/// Result of the connect handshake: what is on the other end of the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ConnectInfo {
    pub firmware: FirmwareKind,
    pub version: DeviceVersion,
    /// Seconds since the controller powered up.
    pub device_time_secs: u32,
}
