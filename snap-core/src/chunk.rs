//! Transfer state: accumulate chunks of the photo in flight, track progress, reassemble.

/// Default chunk size in bytes for the sender side. Fits a BLE notification at a 185-byte MTU.
pub const DEFAULT_CHUNK_SIZE: usize = 180;

/// Split a photo into link-sized slices, in order.
pub fn split_payload(photo: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    let size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };
    photo.chunks(size).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Receiving,
}

/// Transfer progress after an accepted chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// `received / expected`. Can exceed 1.0 if the sender overshoots the declared size.
    Fraction(f32),
    /// Declared size was 0, so there is nothing to measure against.
    Indeterminate,
}

/// Per-connection reassembly state. One transfer at a time; chunks are kept in arrival order.
#[derive(Debug)]
pub struct TransferState {
    phase: Phase,
    transfer_id: [u8; 16],
    expected_size: u64,
    received_bytes: u64,
    chunks: Vec<Vec<u8>>,
    last_accepted_timestamp: u32,
}

impl TransferState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            transfer_id: [0u8; 16],
            expected_size: 0,
            received_bytes: 0,
            chunks: Vec::new(),
            last_accepted_timestamp: 0,
        }
    }

    /// A `START` with this timestamp would replay an already accepted photo.
    /// Absent and zero timestamps are never stale; neither is anything before the first stamp.
    pub fn is_stale(&self, timestamp: Option<u32>) -> bool {
        match timestamp {
            Some(ts) if ts != 0 => {
                self.last_accepted_timestamp != 0 && ts <= self.last_accepted_timestamp
            }
            _ => false,
        }
    }

    /// Reset, then start receiving a new photo. Partial bytes of a previous transfer are dropped.
    pub fn begin(&mut self, transfer_id: [u8; 16], expected_size: u64, timestamp: Option<u32>) {
        self.reset();
        self.transfer_id = transfer_id;
        self.expected_size = expected_size;
        if let Some(ts) = timestamp {
            self.last_accepted_timestamp = self.last_accepted_timestamp.max(ts);
        }
        self.phase = Phase::Receiving;
    }

    /// Append one chunk. Returns the running byte count.
    pub fn push_chunk(&mut self, payload: &[u8]) -> u64 {
        debug_assert_eq!(self.phase, Phase::Receiving);
        self.chunks.push(payload.to_vec());
        self.received_bytes += payload.len() as u64;
        self.received_bytes
    }

    pub fn progress(&self) -> Progress {
        if self.expected_size > 0 {
            Progress::Fraction(self.received_bytes as f32 / self.expected_size as f32)
        } else {
            Progress::Indeterminate
        }
    }

    /// Concatenate chunks in arrival order.
    pub fn reassemble_into_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.received_bytes as usize);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Back to idle. Keeps the freshness baseline.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.transfer_id = [0u8; 16];
        self.expected_size = 0;
        self.received_bytes = 0;
        self.chunks.clear();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_receiving(&self) -> bool {
        self.phase == Phase::Receiving
    }

    pub fn transfer_id(&self) -> [u8; 16] {
        self.transfer_id
    }

    pub fn expected_size(&self) -> u64 {
        self.expected_size
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn last_accepted_timestamp(&self) -> u32 {
        self.last_accepted_timestamp
    }
}

impl Default for TransferState {
    fn default() -> Self {
        Self::new()
    }
}
