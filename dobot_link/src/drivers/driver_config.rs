use serde::{Deserialize, Serialize};

/// Where the controller is reachable.
///
/// Serial is the normal channel (8 data bits, no parity, one stop bit); the
/// firmware also listens on a plain TCP socket when the arm is on WiFi, and
/// the simulator uses the same path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Endpoint {
    Serial { port: String, baud_rate: u32 },
    Tcp { addr: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DobotDriverConfig {
    pub endpoint: Endpoint,
    /// Deadline for one command/response exchange, captured at submission.
    pub cmd_timeout_ms: u64,
    /// Total sends for one exchange; a timed-out exchange is re-sent until
    /// this many attempts have gone out, then Timeout surfaces.
    pub retries: u32,
    /// Pause between current-index polls while waiting on a queued command.
    pub poll_interval_ms: u64,
}

impl DobotDriverConfig {
    pub fn serial(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            endpoint: Endpoint::Serial {
                port: port.into(),
                // The controller ships at 115200; zero means "use default".
                baud_rate: if baud_rate == 0 { 115_200 } else { baud_rate },
            },
            ..Self::default()
        }
    }

    pub fn tcp(addr: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::Tcp { addr: addr.into() },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match &self.endpoint {
            Endpoint::Serial { port, baud_rate } => {
                if port.is_empty() {
                    return Err("Serial port name cannot be empty.".to_string());
                }
                if *baud_rate == 0 {
                    return Err("Baud rate must be greater than 0.".to_string());
                }
            }
            Endpoint::Tcp { addr } => {
                if addr.is_empty() {
                    return Err("TCP address cannot be empty.".to_string());
                }
            }
        }
        if self.cmd_timeout_ms == 0 {
            return Err("Command timeout must be greater than 0.".to_string());
        }
        if self.retries == 0 {
            return Err("Retry count must be at least 1.".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("Poll interval must be greater than 0.".to_string());
        }
        Ok(())
    }
}

impl Default for DobotDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Serial {
                port: "/dev/ttyUSB0".to_string(),
                baud_rate: 115_200,
            },
            cmd_timeout_ms: 3000,
            retries: 3,
            poll_interval_ms: 20,
        }
    }
}
