//! ---
//! jsm_section: "04-simulation"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Hex frame passthrough for the simulated meter."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::collections::VecDeque;

use jsm_core::DeviceFault;

use crate::meter::DEVICE_FAULT_KIND;

/// Loopback serial line carrying raw frames as hex text.
///
/// Sent frames are recorded and echoed as the current incoming frame.
/// Frames queued with [`RawLink::queue_incoming`] are delivered one per poll.
#[derive(Debug, Default, Clone)]
pub struct RawLink {
    sent: Vec<Vec<u8>>,
    pending: VecDeque<Vec<u8>>,
    current: String,
}

impl RawLink {
    /// Queue a frame for a later poll.
    pub fn queue_incoming(&mut self, frame: impl Into<Vec<u8>>) {
        self.pending.push_back(frame.into());
    }

    /// Frames transmitted so far, in order.
    pub fn sent_frames(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Uppercase hex of the current incoming frame, empty when none.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Make the next queued frame current, or clear it when nothing is queued.
    pub fn poll(&mut self) {
        self.current = self
            .pending
            .pop_front()
            .map(hex::encode_upper)
            .unwrap_or_default();
    }

    /// Decode `text` and transmit it. Whitespace between bytes is ignored.
    pub fn send(&mut self, text: &str) -> Result<(), DeviceFault> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(DeviceFault::new(DEVICE_FAULT_KIND, "Empty raw message"));
        }
        let frame = hex::decode(&compact).map_err(|err| {
            DeviceFault::new(DEVICE_FAULT_KIND, format!("Invalid hex message: {err}"))
        })?;
        self.current = hex::encode_upper(&frame);
        self.sent.push(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_records_and_echoes_frame() {
        let mut link = RawLink::default();
        link.send("01 03 00 0a").unwrap();
        assert_eq!(link.sent_frames(), &[vec![0x01, 0x03, 0x00, 0x0a]]);
        assert_eq!(link.current(), "0103000A");
    }

    #[test]
    fn invalid_hex_is_a_device_fault() {
        let mut link = RawLink::default();
        let err = link.send("0g").unwrap_err();
        assert_eq!(err.kind, DEVICE_FAULT_KIND);
        assert!(err.description.starts_with("Invalid hex message"));
        assert!(link.send("   ").is_err());
        assert!(link.send("123").is_err());
        assert!(link.sent_frames().is_empty());
    }

    #[test]
    fn poll_delivers_each_queued_frame_once() {
        let mut link = RawLink::default();
        link.queue_incoming(vec![0xde, 0xad]);
        link.queue_incoming([0xbe_u8, 0xef]);
        link.poll();
        assert_eq!(link.current(), "DEAD");
        link.poll();
        assert_eq!(link.current(), "BEEF");
        link.poll();
        assert_eq!(link.current(), "");
    }
}
