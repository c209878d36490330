use serde::{Deserialize, Serialize};

use super::ProtocolId;

/// Read queries the current value of a field; Write sets it or triggers an
/// action. The controller echoes the direction bit back in its response, so a
/// read and a write of the same command id are distinct exchanges on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

const CTRL_RW: u8 = 0x01;
const CTRL_QUEUED: u8 = 0x02;

/// One protocol message, host- or device-originated.
///
/// `id` is kept as the raw byte rather than [`ProtocolId`] so that inbound
/// frames with ids this crate does not catalogue still decode and can be
/// matched or dropped; the typed enum is for the host-facing surface.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u8,
    pub direction: Direction,
    pub queued: bool,
    pub params: Vec<u8>,
}

impl Message {
    /// A Read query. Read commands are never queued.
    pub fn read(id: ProtocolId) -> Self {
        Self {
            id: u8::from(id),
            direction: Direction::Read,
            queued: false,
            params: Vec::new(),
        }
    }

    /// A Write command carrying `params`, executed immediately.
    pub fn write(id: ProtocolId, params: Vec<u8>) -> Self {
        Self {
            id: u8::from(id),
            direction: Direction::Write,
            queued: false,
            params,
        }
    }

    /// A Write command buffered into the device execution queue. The ack
    /// payload carries the assigned 64-bit queue index.
    pub fn queued_write(id: ProtocolId, params: Vec<u8>) -> Self {
        Self {
            id: u8::from(id),
            direction: Direction::Write,
            queued: true,
            params,
        }
    }

    /// Pack direction and queued flag into the wire ctrl byte.
    pub fn ctrl(&self) -> u8 {
        let mut ctrl = 0u8;
        if self.direction == Direction::Write {
            ctrl |= CTRL_RW;
        }
        if self.queued {
            ctrl |= CTRL_QUEUED;
        }
        ctrl
    }

    /// Split a wire ctrl byte back into direction and queued flag.
    pub fn from_ctrl(id: u8, ctrl: u8, params: Vec<u8>) -> Self {
        Self {
            id,
            direction: if ctrl & CTRL_RW != 0 {
                Direction::Write
            } else {
                Direction::Read
            },
            queued: ctrl & CTRL_QUEUED != 0,
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_bits_round_trip() {
        let msg = Message::queued_write(ProtocolId::PtpCmd, vec![1, 2]);
        assert_eq!(msg.ctrl(), 0x03);
        let back = Message::from_ctrl(msg.id, msg.ctrl(), msg.params.clone());
        assert_eq!(back, msg);

        let read = Message::read(ProtocolId::GetPose);
        assert_eq!(read.ctrl(), 0x00);
        assert_eq!(read.id, 11);

        let write = Message::write(ProtocolId::DeviceName, vec![b'x']);
        assert_eq!(write.ctrl(), 0x01);
    }
}
