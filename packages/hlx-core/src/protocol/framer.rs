//! Inbound byte-stream framing.
//!
//! Every protocol message is printable ASCII enclosed in `[` … `]`;
//! brackets never appear inside a payload. The framer scans a duplex byte
//! stream for frames, discarding anything between them (Telnet chatter,
//! line endings), and enforces a hard per-frame byte cap.

use bytes::BytesMut;

/// Hard cap on a single frame, in bytes, brackets included.
pub const FRAME_MAX: usize = 256;

/// One framing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerEvent {
    /// A complete frame payload, brackets stripped.
    Frame(String),
    /// A frame exceeded [`FRAME_MAX`] and was discarded through its
    /// closing bracket.
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between frames; bytes are chatter.
    Idle,
    /// Accumulating a frame payload.
    InFrame,
    /// Discarding an oversized frame until it closes.
    Overflow,
}

/// Incremental scanner turning raw bytes into [`FramerEvent`]s.
#[derive(Debug)]
pub struct Framer {
    state: State,
    payload: BytesMut,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    /// Creates an idle framer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            payload: BytesMut::with_capacity(FRAME_MAX),
        }
    }

    /// Feeds bytes into the framer, returning every event they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<FramerEvent> {
        let mut events = Vec::new();
        for &byte in bytes {
            self.push_byte(byte, &mut events);
        }
        events
    }

    fn push_byte(&mut self, byte: u8, events: &mut Vec<FramerEvent>) {
        match self.state {
            State::Idle => {
                if byte == b'[' {
                    self.payload.clear();
                    self.state = State::InFrame;
                }
            }
            State::InFrame => match byte {
                b']' => {
                    // Payload is printable ASCII by construction of the
                    // protocol; junk frames fall out at the dispatch layer.
                    let payload = String::from_utf8_lossy(&self.payload).into_owned();
                    self.payload.clear();
                    self.state = State::Idle;
                    events.push(FramerEvent::Frame(payload));
                }
                b'[' => {
                    // An opening bracket mid-frame means the previous one
                    // never closed; restart on the new frame.
                    self.payload.clear();
                }
                _ => {
                    // +2 accounts for the brackets in the cap.
                    if self.payload.len() + 2 >= FRAME_MAX {
                        self.payload.clear();
                        self.state = State::Overflow;
                    } else {
                        self.payload.extend_from_slice(&[byte]);
                    }
                }
            },
            State::Overflow => {
                if byte == b']' {
                    self.state = State::Idle;
                    events.push(FramerEvent::Overflow);
                }
            }
        }
    }

    /// True when no frame is partially accumulated.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_yields_payload() {
        let mut framer = Framer::new();
        assert_eq!(
            framer.push(b"[VO3R-25]"),
            vec![FramerEvent::Frame("VO3R-25".to_string())]
        );
        assert!(framer.is_idle());
    }

    #[test]
    fn chatter_between_frames_is_discarded() {
        let mut framer = Framer::new();
        let events = framer.push(b"\r\n[QO1]garbage[QO2]\r\n");
        assert_eq!(
            events,
            vec![
                FramerEvent::Frame("QO1".to_string()),
                FramerEvent::Frame("QO2".to_string()),
            ]
        );
    }

    #[test]
    fn frames_split_across_reads_reassemble() {
        let mut framer = Framer::new();
        assert!(framer.push(b"[VMO").is_empty());
        assert!(!framer.is_idle());
        assert_eq!(
            framer.push(b"12]"),
            vec![FramerEvent::Frame("VMO12".to_string())]
        );
    }

    #[test]
    fn reopened_bracket_restarts_the_frame() {
        let mut framer = Framer::new();
        let events = framer.push(b"[QO1[QO2]");
        assert_eq!(events, vec![FramerEvent::Frame("QO2".to_string())]);
    }

    #[test]
    fn oversized_frame_is_discarded_with_recovery_event() {
        let mut framer = Framer::new();
        let mut stream = Vec::new();
        stream.push(b'[');
        stream.extend(std::iter::repeat(b'A').take(FRAME_MAX));
        stream.push(b']');
        stream.extend_from_slice(b"[QO1]");

        let events = framer.push(&stream);
        assert_eq!(
            events,
            vec![
                FramerEvent::Overflow,
                FramerEvent::Frame("QO1".to_string()),
            ]
        );
    }

    #[test]
    fn maximum_sized_frame_still_passes() {
        let mut framer = Framer::new();
        // FRAME_MAX bytes total: 2 brackets + 254 payload bytes.
        let payload = "B".repeat(FRAME_MAX - 2);
        let wire = format!("[{payload}]");
        assert_eq!(
            framer.push(wire.as_bytes()),
            vec![FramerEvent::Frame(payload)]
        );
    }

    #[test]
    fn empty_frame_yields_empty_payload() {
        let mut framer = Framer::new();
        assert_eq!(framer.push(b"[]"), vec![FramerEvent::Frame(String::new())]);
    }
}
