//! In-process arm controller simulator.
//!
//! Speaks the serial wire protocol over any byte stream and models the parts
//! of the firmware the driver engine depends on: device identity, the queued
//! command buffer with its strictly increasing indices, execution control and
//! the free-slot counter. Queue execution advances one command per
//! current-index poll while running, which keeps tests deterministic.

use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use dobot_link::protocol::{
    encode, params::{ParamReader, ParamWriter}, Direction, FrameBuffer, Message, ProtocolId,
};
use dobot_link::FirmwareKind;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub serial_number: String,
    pub device_name: String,
    pub version: [u8; 4],
    pub firmware: FirmwareKind,
    pub queue_capacity: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            serial_number: "SIM0001".to_string(),
            device_name: "dobot-sim".to_string(),
            version: [3, 2, 1, 0],
            firmware: FirmwareKind::Dobot,
            queue_capacity: 32,
        }
    }
}

/// Controller state machine; one per connection.
pub struct DobotSim {
    config: SimConfig,
    serial_number: String,
    device_name: String,
    started: Instant,
    running: bool,
    latest_index: u64,
    current_index: u64,
    left_space: u32,
    wifi_config_mode: bool,
    wifi_ssid: String,
    wifi_password: String,
}

impl DobotSim {
    pub fn new(config: SimConfig) -> Self {
        Self {
            serial_number: config.serial_number.clone(),
            device_name: config.device_name.clone(),
            started: Instant::now(),
            running: false,
            latest_index: 0,
            current_index: 0,
            left_space: config.queue_capacity,
            wifi_config_mode: false,
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            config,
        }
    }

    /// One request, at most one response. `None` means the firmware would
    /// not answer (e.g. the reboot into another firmware).
    pub fn handle(&mut self, msg: Message) -> Option<Message> {
        // Any queued write lands in the buffer and is acked with its index,
        // whatever the command id.
        if msg.queued && msg.direction == Direction::Write {
            if self.left_space == 0 {
                tracing::warn!(id = msg.id, "queue full, command dropped");
                return None;
            }
            self.left_space -= 1;
            self.latest_index += 1;
            return Some(Message {
                params: ParamWriter::new().put_u64(self.latest_index).into_params(),
                ..msg
            });
        }

        let id = ProtocolId::try_from(msg.id).ok()?;
        let reading = msg.direction == Direction::Read;
        let params = match id {
            ProtocolId::DeviceSn if reading => {
                ParamWriter::new().put_cstr(&self.serial_number).into_params()
            }
            ProtocolId::DeviceSn => {
                self.serial_number = ParamReader::new(&msg.params).cstr();
                Vec::new()
            }
            ProtocolId::DeviceName if reading => {
                ParamWriter::new().put_cstr(&self.device_name).into_params()
            }
            ProtocolId::DeviceName => {
                self.device_name = ParamReader::new(&msg.params).cstr();
                Vec::new()
            }
            ProtocolId::DeviceVersion if reading => self.config.version.to_vec(),
            ProtocolId::DeviceTime if reading => ParamWriter::new()
                .put_u32(self.started.elapsed().as_secs() as u32)
                .into_params(),
            ProtocolId::AlarmsState if reading => vec![0u8; 16],
            ProtocolId::AlarmsState => Vec::new(),
            ProtocolId::WifiConfigMode if reading => {
                ParamWriter::new().put_bool(self.wifi_config_mode).into_params()
            }
            ProtocolId::WifiConfigMode => {
                self.wifi_config_mode = !msg.params.is_empty() && msg.params[0] != 0;
                Vec::new()
            }
            ProtocolId::WifiSsid if reading => {
                ParamWriter::new().put_cstr(&self.wifi_ssid).into_params()
            }
            ProtocolId::WifiSsid => {
                self.wifi_ssid = ParamReader::new(&msg.params).cstr();
                Vec::new()
            }
            ProtocolId::WifiPassword if reading => {
                ParamWriter::new().put_cstr(&self.wifi_password).into_params()
            }
            ProtocolId::WifiPassword => {
                self.wifi_password = ParamReader::new(&msg.params).cstr();
                Vec::new()
            }
            ProtocolId::FirmwareMode if reading => ParamWriter::new()
                .put_u8(u8::from(self.config.firmware))
                .into_params(),
            // A real controller reboots here; no ack ever comes back.
            ProtocolId::FirmwareSwitch => return None,
            ProtocolId::QueuedCmdStartExec => {
                self.running = true;
                Vec::new()
            }
            ProtocolId::QueuedCmdStopExec | ProtocolId::QueuedCmdForceStopExec => {
                self.running = false;
                Vec::new()
            }
            ProtocolId::QueuedCmdClear => {
                self.latest_index = self.current_index;
                self.left_space = self.config.queue_capacity;
                Vec::new()
            }
            ProtocolId::QueuedCmdCurrentIndex if reading => {
                if self.running && self.current_index < self.latest_index {
                    self.current_index += 1;
                    self.left_space = (self.left_space + 1).min(self.config.queue_capacity);
                }
                ParamWriter::new().put_u64(self.current_index).into_params()
            }
            ProtocolId::QueuedCmdMotionFinish if reading => ParamWriter::new()
                .put_bool(self.current_index >= self.latest_index)
                .into_params(),
            ProtocolId::QueuedCmdLeftSpace if reading => {
                ParamWriter::new().put_u32(self.left_space).into_params()
            }
            // Unmodelled commands still ack so exchanges resolve.
            _ => Vec::new(),
        };
        Some(Message { params, ..msg })
    }
}

/// Serves one connection until the peer hangs up.
pub async fn serve<S>(stream: S, config: SimConfig) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut read, mut write) = tokio::io::split(stream);
    let mut sim = DobotSim::new(config);
    let mut frames = FrameBuffer::new();
    let mut chunk = [0u8; 512];
    loop {
        let n = match read.read(&mut chunk).await {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) => return Err(e),
        };
        frames.extend(&chunk[..n]);
        while let Some(msg) = frames.next_frame() {
            tracing::debug!(id = msg.id, direction = ?msg.direction, "sim request");
            if let Some(reply) = sim.handle(msg) {
                let bytes = encode(&reply)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                write.write_all(&bytes).await?;
                write.flush().await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_indices_are_strictly_increasing() {
        let mut sim = DobotSim::new(SimConfig::default());
        let mut last = 0u64;
        for _ in 0..5 {
            let ack = sim
                .handle(Message::queued_write(ProtocolId::PtpCmd, vec![0; 17]))
                .expect("queued write acks");
            let index = ParamReader::new(&ack.params).u64().expect("index payload");
            assert!(index > last);
            last = index;
        }
    }

    #[test]
    fn current_index_advances_only_while_running() {
        let mut sim = DobotSim::new(SimConfig::default());
        sim.handle(Message::queued_write(ProtocolId::PtpCmd, vec![0; 17]));

        let ack = sim
            .handle(Message::read(ProtocolId::QueuedCmdCurrentIndex))
            .expect("read acks");
        assert_eq!(ParamReader::new(&ack.params).u64().unwrap(), 0);

        sim.handle(Message::write(ProtocolId::QueuedCmdStartExec, Vec::new()));
        let ack = sim
            .handle(Message::read(ProtocolId::QueuedCmdCurrentIndex))
            .expect("read acks");
        assert_eq!(ParamReader::new(&ack.params).u64().unwrap(), 1);
    }

    #[test]
    fn firmware_switch_gets_no_ack() {
        let mut sim = DobotSim::new(SimConfig::default());
        let params = ParamWriter::new().put_u8(1).into_params();
        assert!(sim
            .handle(Message::write(ProtocolId::FirmwareSwitch, params))
            .is_none());
    }
}
