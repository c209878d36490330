use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Error taxonomy for one protocol exchange.
///
/// `InvalidParams` and `Busy` are returned before any I/O happens. `Timeout`
/// and `Disconnected` resolve a submitted exchange after the fact. `Protocol`
/// covers malformed content inside an otherwise matched response; corrupt
/// frames on the wire are dropped and resynchronized without surfacing here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum DobotError {
    InvalidParams(String),
    Busy(String),
    Timeout,
    Disconnected,
    Protocol(String),
    FailedToSend(String),
    Io(String),
}

impl Error for DobotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for DobotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DobotError::InvalidParams(ref msg) => write!(f, "invalid parameters: {}", msg),
            DobotError::Busy(ref msg) => write!(f, "busy: {}", msg),
            DobotError::Timeout => write!(f, "no matching response before the deadline"),
            DobotError::Disconnected => write!(f, "controller appears to be disconnected"),
            DobotError::Protocol(ref msg) => write!(f, "protocol error: {}", msg),
            DobotError::FailedToSend(ref msg) => write!(f, "send error: {}", msg),
            DobotError::Io(ref msg) => write!(f, "io error: {}", msg),
        }
    }
}
