//! snaplink wire protocol: control frames and the literals they are built from.

/// Current protocol version. Exported over the C ABI so hosts can check compatibility.
pub const PROTOCOL_VERSION: u8 = 1;

/// Prefix of the transfer-start control frame: `START:<size>[:<timestamp>]`.
pub const START_PREFIX: &str = "START:";

/// Exact literal of the transfer-end control frame.
pub const END_MARKER: &str = "END";

/// Field separator inside a `START` frame.
pub const FIELD_SEPARATOR: char = ':';

/// Optional command written to the camera's control channel to trigger a capture.
pub const CAPTURE_COMMAND: &[u8] = b"CAPTURE";

/// Control frames. Encoding is plain ASCII text; see the wire module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFrame {
    /// A new photo follows. `timestamp` is the camera's capture counter, used to drop
    /// duplicate or delayed `START` notifications.
    Start {
        expected_size: u64,
        timestamp: Option<u32>,
    },
    /// All chunks of the current photo have been sent.
    End,
}

/// One link message after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    Control(ControlFrame),
    /// Text that is not a control frame. Photo bytes when a transfer is active, noise otherwise.
    Text(&'a str),
    /// Binary payload (not valid UTF-8).
    Chunk(&'a [u8]),
}

impl<'a> Frame<'a> {
    /// Raw bytes of a data frame, `None` for control frames.
    pub fn payload(&self) -> Option<&'a [u8]> {
        match *self {
            Frame::Control(_) => None,
            Frame::Text(s) => Some(s.as_bytes()),
            Frame::Chunk(b) => Some(b),
        }
    }
}
