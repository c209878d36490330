use bytes::{Buf, BytesMut};

use super::Message;
use crate::errors::DobotError;

/// Start-of-frame marker, repeated twice.
pub const SYNC_BYTE: u8 = 0xAA;

/// The length byte counts id + ctrl + payload and must stay below the sync
/// byte so a length can never be mistaken for the start of a frame.
pub const MAX_PARAMS_LEN: usize = SYNC_BYTE as usize - 1 - 2;

/// Wire layout: `[0xAA][0xAA][len][id][ctrl][params…][checksum]` where
/// `len = params.len() + 2` and the checksum is the two's complement of the
/// byte sum over id, ctrl and params (summing id through checksum gives 0).
pub fn encode(msg: &Message) -> Result<Vec<u8>, DobotError> {
    if msg.params.len() > MAX_PARAMS_LEN {
        return Err(DobotError::InvalidParams(format!(
            "payload of {} bytes exceeds the {} byte frame limit",
            msg.params.len(),
            MAX_PARAMS_LEN
        )));
    }
    let ctrl = msg.ctrl();
    let mut out = Vec::with_capacity(msg.params.len() + 6);
    out.push(SYNC_BYTE);
    out.push(SYNC_BYTE);
    out.push(msg.params.len() as u8 + 2);
    out.push(msg.id);
    out.push(ctrl);
    out.extend_from_slice(&msg.params);
    out.push(checksum(msg.id, ctrl, &msg.params));
    Ok(out)
}

fn checksum(id: u8, ctrl: u8, params: &[u8]) -> u8 {
    let mut sum = id.wrapping_add(ctrl);
    for b in params {
        sum = sum.wrapping_add(*b);
    }
    0u8.wrapping_sub(sum)
}

/// Outcome of one decode attempt over a byte window.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A full frame was parsed.
    Complete(Message),
    /// More bytes are needed before a verdict is possible.
    Incomplete,
    /// The window starts with bytes that cannot open a valid frame; the
    /// consumed count skips exactly one byte past the candidate sync so the
    /// scan can resynchronize.
    Invalid,
}

/// Decode one frame from the front of `buf`.
///
/// Returns the outcome together with the number of bytes the caller must
/// discard before retrying. Leading garbage up to the first sync byte is
/// consumed even on `Incomplete`, so a misaligned stream converges on a
/// frame boundary without stalling.
pub fn decode(buf: &[u8]) -> (Decoded, usize) {
    // Skip to the first candidate sync byte.
    let start = match buf.iter().position(|&b| b == SYNC_BYTE) {
        Some(pos) => pos,
        None => return (Decoded::Incomplete, buf.len()),
    };
    let frame = &buf[start..];
    if frame.len() < 3 {
        return (Decoded::Incomplete, start);
    }
    if frame[1] != SYNC_BYTE {
        return (Decoded::Invalid, start + 1);
    }
    let len = frame[2] as usize;
    // A length byte >= SYNC_BYTE means we latched onto a stray 0xAA pair
    // (e.g. the tail of AA AA AA); shift by one and rescan.
    if len >= SYNC_BYTE as usize || len < 2 {
        return (Decoded::Invalid, start + 1);
    }
    let total = 3 + len + 1;
    if frame.len() < total {
        return (Decoded::Incomplete, start);
    }
    // id + ctrl + params + checksum must sum to zero mod 256.
    let mut sum = 0u8;
    for b in &frame[3..total] {
        sum = sum.wrapping_add(*b);
    }
    if sum != 0 {
        return (Decoded::Invalid, start + 1);
    }
    let id = frame[3];
    let ctrl = frame[4];
    let params = frame[5..total - 1].to_vec();
    (Decoded::Complete(Message::from_ctrl(id, ctrl, params)), start + total)
}

/// Accumulates inbound bytes and yields decoded frames, discarding corrupt
/// spans one byte at a time until the stream realigns.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete frame, if the buffer holds one.
    pub fn next_frame(&mut self) -> Option<Message> {
        loop {
            let (decoded, consumed) = decode(&self.buf);
            self.buf.advance(consumed);
            match decoded {
                Decoded::Complete(msg) => return Some(msg),
                Decoded::Incomplete => return None,
                Decoded::Invalid => {
                    tracing::debug!("discarding one byte while resynchronizing frame stream");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Direction, ProtocolId};

    #[test]
    fn encode_decode_round_trip() {
        let msg = Message::queued_write(ProtocolId::PtpCmd, vec![0x01, 0x02, 0xFF, 0x00]);
        let bytes = encode(&msg).unwrap();
        let (decoded, consumed) = decode(&bytes);
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, Decoded::Complete(msg));
    }

    #[test]
    fn zero_length_payload_is_valid() {
        let msg = Message::write(ProtocolId::QueuedCmdStartExec, Vec::new());
        let bytes = encode(&msg).unwrap();
        assert_eq!(bytes[2], 2);
        let (decoded, _) = decode(&bytes);
        assert_eq!(decoded, Decoded::Complete(msg));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let msg = Message::write(ProtocolId::DeviceSn, vec![0u8; MAX_PARAMS_LEN + 1]);
        assert!(matches!(encode(&msg), Err(DobotError::InvalidParams(_))));
        let msg = Message::write(ProtocolId::DeviceSn, vec![0u8; MAX_PARAMS_LEN]);
        assert!(encode(&msg).is_ok());
    }

    #[test]
    fn bad_checksum_is_invalid() {
        let msg = Message::read(ProtocolId::GetPose);
        let mut bytes = encode(&msg).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = bytes[last].wrapping_add(1);
        let (decoded, consumed) = decode(&bytes);
        assert_eq!(decoded, Decoded::Invalid);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn leading_garbage_is_skipped() {
        let msg = Message::read(ProtocolId::DeviceVersion);
        let mut stream = vec![0x00, 0x13, 0x37];
        stream.extend(encode(&msg).unwrap());
        let mut fb = FrameBuffer::new();
        fb.extend(&stream);
        assert_eq!(fb.next_frame(), Some(msg));
        assert_eq!(fb.next_frame(), None);
    }

    #[test]
    fn resynchronizes_after_corrupt_frame() {
        let good = Message::write(ProtocolId::DeviceName, b"arm".to_vec());
        let mut corrupt = encode(&Message::read(ProtocolId::GetPose)).unwrap();
        corrupt[4] ^= 0x40; // flip a ctrl bit without fixing the checksum
        let mut stream = corrupt;
        stream.extend(encode(&good).unwrap());

        let mut fb = FrameBuffer::new();
        fb.extend(&stream);
        assert_eq!(fb.next_frame(), Some(good));
        assert_eq!(fb.next_frame(), None);
    }

    #[test]
    fn stray_sync_run_before_frame() {
        let msg = Message::read(ProtocolId::DeviceTime);
        let mut stream = vec![SYNC_BYTE];
        stream.extend(encode(&msg).unwrap());
        let mut fb = FrameBuffer::new();
        fb.extend(&stream);
        assert_eq!(fb.next_frame(), Some(msg));
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let msg = Message::write(ProtocolId::WifiSsid, b"lab".to_vec());
        let bytes = encode(&msg).unwrap();
        let mut fb = FrameBuffer::new();
        fb.extend(&bytes[..4]);
        assert_eq!(fb.next_frame(), None);
        fb.extend(&bytes[4..]);
        assert_eq!(fb.next_frame(), Some(msg));
    }

    #[test]
    fn frames_split_across_arbitrary_chunks() {
        let a = Message::read(ProtocolId::QueuedCmdCurrentIndex);
        let b = Message::queued_write(ProtocolId::WaitCmd, vec![100, 0, 0, 0]);
        let mut stream = encode(&a).unwrap();
        stream.extend(encode(&b).unwrap());

        let mut fb = FrameBuffer::new();
        let mut seen = Vec::new();
        for chunk in stream.chunks(3) {
            fb.extend(chunk);
            while let Some(msg) = fb.next_frame() {
                seen.push(msg);
            }
        }
        assert_eq!(seen, vec![a, b]);
    }

    #[test]
    fn response_direction_distinguishes_read_and_write() {
        let read_ack = Message::read(ProtocolId::DeviceSn);
        let write_ack = Message::write(ProtocolId::DeviceSn, Vec::new());
        let (a, _) = decode(&encode(&read_ack).unwrap());
        let (b, _) = decode(&encode(&write_ack).unwrap());
        match (a, b) {
            (Decoded::Complete(a), Decoded::Complete(b)) => {
                assert_eq!(a.direction, Direction::Read);
                assert_eq!(b.direction, Direction::Write);
            }
            other => panic!("expected two frames, got {:?}", other),
        }
    }
}
