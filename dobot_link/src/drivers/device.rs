//! Typed wrappers over the protocol engine.
//!
//! A representative slice of the controller surface, each one the same
//! three-step shape: build params, exchange, unpack the ack. The full
//! catalogue lives with callers; anything not covered here goes through
//! [`DobotDriver::submit_immediate`] or [`DobotDriver::submit_queued`]
//! with a hand-built payload.

use crate::errors::DobotError;
use crate::protocol::{
    params::{ParamReader, ParamWriter},
    Message, ProtocolId, MAX_PARAMS_LEN,
};
use crate::{DeviceVersion, FirmwareKind};

use super::DobotDriver;

impl DobotDriver {
    pub async fn device_sn(&self) -> Result<String, DobotError> {
        let ack = self.call_and_wait(&Message::read(ProtocolId::DeviceSn)).await?;
        Ok(ParamReader::new(&ack.params).cstr())
    }

    pub async fn set_device_sn(&self, sn: &str) -> Result<(), DobotError> {
        let params = cstr_params(sn, "serial number")?;
        self.call_and_wait(&Message::write(ProtocolId::DeviceSn, params))
            .await?;
        Ok(())
    }

    pub async fn device_name(&self) -> Result<String, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::DeviceName))
            .await?;
        Ok(ParamReader::new(&ack.params).cstr())
    }

    pub async fn set_device_name(&self, name: &str) -> Result<(), DobotError> {
        let params = cstr_params(name, "device name")?;
        self.call_and_wait(&Message::write(ProtocolId::DeviceName, params))
            .await?;
        Ok(())
    }

    pub async fn device_version(&self) -> Result<DeviceVersion, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::DeviceVersion))
            .await?;
        let mut r = ParamReader::new(&ack.params);
        Ok(DeviceVersion {
            major: r.u8()?,
            minor: r.u8()?,
            revision: r.u8()?,
            hardware: r.u8().unwrap_or(0),
        })
    }

    /// Seconds since the controller powered up.
    pub async fn device_time(&self) -> Result<u32, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::DeviceTime))
            .await?;
        ParamReader::new(&ack.params).u32()
    }

    /// Raw alarm bitmap; one bit per alarm condition.
    pub async fn alarms_state(&self) -> Result<Vec<u8>, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::AlarmsState))
            .await?;
        Ok(ack.params)
    }

    pub async fn clear_all_alarms(&self) -> Result<(), DobotError> {
        self.call_and_wait(&Message::write(ProtocolId::AlarmsState, Vec::new()))
            .await?;
        Ok(())
    }

    pub async fn wifi_config_mode(&self) -> Result<bool, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::WifiConfigMode))
            .await?;
        ParamReader::new(&ack.params).bool()
    }

    pub async fn set_wifi_config_mode(&self, enabled: bool) -> Result<(), DobotError> {
        let params = ParamWriter::new().put_bool(enabled).into_params();
        self.call_and_wait(&Message::write(ProtocolId::WifiConfigMode, params))
            .await?;
        Ok(())
    }

    pub async fn wifi_ssid(&self) -> Result<String, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::WifiSsid))
            .await?;
        Ok(ParamReader::new(&ack.params).cstr())
    }

    pub async fn set_wifi_ssid(&self, ssid: &str) -> Result<(), DobotError> {
        let params = cstr_params(ssid, "SSID")?;
        self.call_and_wait(&Message::write(ProtocolId::WifiSsid, params))
            .await?;
        Ok(())
    }

    pub async fn wifi_password(&self) -> Result<String, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::WifiPassword))
            .await?;
        Ok(ParamReader::new(&ack.params).cstr())
    }

    pub async fn set_wifi_password(&self, password: &str) -> Result<(), DobotError> {
        let params = cstr_params(password, "password")?;
        self.call_and_wait(&Message::write(ProtocolId::WifiPassword, params))
            .await?;
        Ok(())
    }

    pub async fn firmware_mode(&self) -> Result<FirmwareKind, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::FirmwareMode))
            .await?;
        let mode = ParamReader::new(&ack.params).u8()?;
        FirmwareKind::try_from(mode)
            .map_err(|_| DobotError::Protocol(format!("unknown firmware mode {}", mode)))
    }

    /// Reboots the controller into another firmware. The device drops the
    /// connection instead of acking, so this is a one-way write; the actual
    /// image transfer happens out of band.
    pub async fn switch_firmware_mode(&self, kind: FirmwareKind) -> Result<(), DobotError> {
        let params = ParamWriter::new().put_u8(u8::from(kind)).into_params();
        self.send_oneway(&Message::write(ProtocolId::FirmwareSwitch, params))
            .await
    }
}

/// NUL-terminated string payload, validated before any I/O.
fn cstr_params(s: &str, what: &str) -> Result<Vec<u8>, DobotError> {
    if s.is_empty() {
        return Err(DobotError::InvalidParams(format!("empty {}", what)));
    }
    if s.len() + 1 > MAX_PARAMS_LEN {
        return Err(DobotError::InvalidParams(format!(
            "{} of {} bytes does not fit a frame",
            what,
            s.len()
        )));
    }
    Ok(ParamWriter::new().put_cstr(s).into_params())
}
