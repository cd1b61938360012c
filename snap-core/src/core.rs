//! Host-driven API: PhotoReceiver takes link messages one at a time and returns outcomes.

use crate::chunk::{Progress, TransferState};
use crate::config::Config;
use crate::integrity::{self, AssembledPhoto, AssemblyError, AssemblyWarning};
use crate::protocol::{ControlFrame, Frame};
use crate::wire;

/// Main coordinator. Owns the transfer state; the host feeds messages in arrival order.
pub struct PhotoReceiver {
    config: Config,
    state: TransferState,
}

impl PhotoReceiver {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            state: TransferState::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read-only view of the transfer in flight.
    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// Process one link message.
    pub fn on_message_received(&mut self, bytes: &[u8]) -> Outcome {
        match wire::classify(bytes) {
            Frame::Control(ControlFrame::Start {
                expected_size,
                timestamp,
            }) => self.on_start(expected_size, timestamp),
            Frame::Control(ControlFrame::End) => self.on_end(),
            Frame::Text(_) | Frame::Chunk(_) => self.on_chunk(bytes),
        }
    }

    fn on_start(&mut self, expected_size: u64, timestamp: Option<u32>) -> Outcome {
        if self.state.is_stale(timestamp) {
            let last_accepted = self.state.last_accepted_timestamp();
            let timestamp = timestamp.unwrap_or_default();
            tracing::debug!(event = "photo_start_stale", timestamp, last_accepted);
            return Outcome::Ignored(IgnoreReason::Stale {
                timestamp,
                last_accepted,
            });
        }
        if self.state.is_receiving() {
            tracing::info!(
                event = "photo_transfer_abandoned",
                transfer_id = %uuid::Uuid::from_bytes(self.state.transfer_id()),
                received = self.state.received_bytes(),
                expected = self.state.expected_size()
            );
        }
        let transfer_id: [u8; 16] = uuid::Uuid::new_v4().into_bytes();
        self.state.begin(transfer_id, expected_size, timestamp);
        tracing::info!(
            event = "photo_transfer_started",
            transfer_id = %uuid::Uuid::from_bytes(transfer_id),
            expected_size,
            timestamp
        );
        Outcome::Started {
            transfer_id,
            expected_size,
            timestamp,
        }
    }

    fn on_chunk(&mut self, payload: &[u8]) -> Outcome {
        if !self.state.is_receiving() {
            tracing::debug!(event = "photo_data_while_idle", len = payload.len());
            return Outcome::Ignored(IgnoreReason::DataWhileIdle { len: payload.len() });
        }
        if let Some(limit) = self.config.max_photo_bytes {
            if self.state.received_bytes() + payload.len() as u64 > limit {
                tracing::warn!(
                    event = "photo_too_large",
                    transfer_id = %uuid::Uuid::from_bytes(self.state.transfer_id()),
                    received = self.state.received_bytes(),
                    limit
                );
                self.state.reset();
                return Outcome::Failed {
                    reason: AssemblyError::TooLarge { limit },
                    warnings: Vec::new(),
                };
            }
        }
        let received_bytes = self.state.push_chunk(payload);
        let expected_size = self.state.expected_size();
        tracing::trace!(event = "photo_chunk", received_bytes, expected_size);
        Outcome::Progress {
            received_bytes,
            expected_size,
            progress: self.state.progress(),
        }
    }

    fn on_end(&mut self) -> Outcome {
        if !self.state.is_receiving() {
            tracing::debug!(event = "photo_end_while_idle");
            return Outcome::Ignored(IgnoreReason::EndWhileIdle);
        }
        let transfer_id = uuid::Uuid::from_bytes(self.state.transfer_id());
        let expected_size = self.state.expected_size();
        let bytes = self.state.reassemble_into_bytes();
        tracing::debug!(
            event = "photo_assembling",
            %transfer_id,
            chunks = self.state.chunk_count(),
            received = bytes.len(),
            expected_size
        );
        self.state.reset();
        let assembly = integrity::assemble(bytes, expected_size, &self.config);
        match assembly.result {
            Ok(photo) => {
                tracing::info!(
                    event = "photo_received",
                    %transfer_id,
                    bytes = photo.len(),
                    width = photo.dimensions().0,
                    height = photo.dimensions().1,
                    warnings = assembly.warnings.len()
                );
                Outcome::Completed {
                    photo,
                    warnings: assembly.warnings,
                }
            }
            Err(reason) => {
                tracing::warn!(event = "photo_failed", %transfer_id, reason = %reason);
                Outcome::Failed {
                    reason,
                    warnings: assembly.warnings,
                }
            }
        }
    }
}

impl Default for PhotoReceiver {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a message changed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `START` whose timestamp does not exceed the last accepted one.
    Stale { timestamp: u32, last_accepted: u32 },
    /// `END` with no transfer in flight.
    EndWhileIdle,
    /// Data (binary or stray text) with no transfer in flight.
    DataWhileIdle { len: usize },
}

/// What one message did to the receiver.
#[derive(Debug)]
pub enum Outcome {
    Started {
        transfer_id: [u8; 16],
        expected_size: u64,
        timestamp: Option<u32>,
    },
    Progress {
        received_bytes: u64,
        expected_size: u64,
        progress: Progress,
    },
    /// Terminal: photo decoded. Emitted once per transfer.
    Completed {
        photo: AssembledPhoto,
        warnings: Vec<AssemblyWarning>,
    },
    /// Terminal: transfer ended without a photo. Emitted once per transfer.
    Failed {
        reason: AssemblyError,
        warnings: Vec<AssemblyWarning>,
    },
    Ignored(IgnoreReason),
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Completed { .. } | Outcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Phase;
    use crate::integrity::tests::sample_jpeg;
    use crate::wire::encode_transfer;
    use rand::Rng;

    fn feed_all(rx: &mut PhotoReceiver, messages: &[Vec<u8>]) -> Vec<Outcome> {
        messages
            .iter()
            .map(|m| rx.on_message_received(m))
            .collect()
    }

    fn assert_idle(rx: &PhotoReceiver) {
        assert_eq!(rx.state().phase(), Phase::Idle);
        assert_eq!(rx.state().received_bytes(), 0);
        assert_eq!(rx.state().chunk_count(), 0);
        assert_eq!(rx.state().expected_size(), 0);
    }

    #[test]
    fn complete_jpeg_transfer() {
        let jpeg = sample_jpeg(32, 24);
        let mut rx = PhotoReceiver::new();
        let messages = encode_transfer(&jpeg, 100, None);
        let mut outcomes = feed_all(&mut rx, &messages);

        assert!(matches!(
            outcomes[0],
            Outcome::Started {
                timestamp: None,
                ..
            }
        ));
        for o in &outcomes[1..outcomes.len() - 1] {
            assert!(matches!(o, Outcome::Progress { .. }));
        }
        match outcomes.pop().unwrap() {
            Outcome::Completed { photo, warnings } => {
                assert!(warnings.is_empty());
                assert_eq!(photo.bytes(), &jpeg[..]);
                assert_eq!(photo.dimensions(), (32, 24));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_idle(&rx);
    }

    #[test]
    fn single_chunk_transfer_has_no_warnings() {
        let jpeg = sample_jpeg(8, 8);
        let mut rx = PhotoReceiver::new();
        let start = format!("START:{}", jpeg.len());
        rx.on_message_received(start.as_bytes());
        rx.on_message_received(&jpeg);
        match rx.on_message_received(b"END") {
            Outcome::Completed { photo, warnings } => {
                assert!(warnings.is_empty());
                assert_eq!(photo.len(), jpeg.len());
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn assembled_bytes_are_concatenation_in_order() {
        let mut rng = rand::thread_rng();
        let jpeg = sample_jpeg(40, 40);
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(format!("START:{}", jpeg.len()).as_bytes());
        let mut offset = 0;
        let mut sum = 0u64;
        while offset < jpeg.len() {
            let len = rng.gen_range(1..=64).min(jpeg.len() - offset);
            let o = rx.on_message_received(&jpeg[offset..offset + len]);
            sum += len as u64;
            match o {
                Outcome::Progress { received_bytes, .. } => assert_eq!(received_bytes, sum),
                other => panic!("unexpected outcome {other:?}"),
            }
            offset += len;
        }
        match rx.on_message_received(b"END") {
            Outcome::Completed { photo, .. } => assert_eq!(photo.bytes(), &jpeg[..]),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn progress_is_fraction_of_declared_size() {
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:400");
        match rx.on_message_received(&[0xAB; 100]) {
            Outcome::Progress {
                received_bytes,
                expected_size,
                progress,
            } => {
                assert_eq!(received_bytes, 100);
                assert_eq!(expected_size, 400);
                assert_eq!(progress, Progress::Fraction(0.25));
            }
            other => panic!("expected Progress, got {other:?}"),
        }
    }

    #[test]
    fn zero_size_reports_indeterminate_progress() {
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:garbage");
        assert_eq!(rx.state().phase(), Phase::Receiving);
        match rx.on_message_received(&[0xAB; 10]) {
            Outcome::Progress { progress, .. } => assert_eq!(progress, Progress::Indeterminate),
            other => panic!("expected Progress, got {other:?}"),
        }
    }

    #[test]
    fn stale_start_is_ignored() {
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:50:10");
        rx.on_message_received(&[0xAA; 50]);
        let end = rx.on_message_received(b"END");
        assert!(end.is_terminal());
        assert_idle(&rx);

        let o = rx.on_message_received(b"START:50:5");
        assert!(matches!(
            o,
            Outcome::Ignored(IgnoreReason::Stale {
                timestamp: 5,
                last_accepted: 10
            })
        ));
        assert_idle(&rx);
        assert_eq!(rx.state().last_accepted_timestamp(), 10);

        // the chunk that follows a rejected START has nowhere to go
        let o = rx.on_message_received(&[0xAA; 50]);
        assert!(matches!(o, Outcome::Ignored(IgnoreReason::DataWhileIdle { len: 50 })));
    }

    #[test]
    fn stale_start_mid_transfer_leaves_state_untouched() {
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:100:20");
        rx.on_message_received(&[1u8; 30]);
        let before = rx.state().transfer_id();

        let o = rx.on_message_received(b"START:100:20");
        assert!(matches!(o, Outcome::Ignored(IgnoreReason::Stale { .. })));
        assert_eq!(rx.state().phase(), Phase::Receiving);
        assert_eq!(rx.state().received_bytes(), 30);
        assert_eq!(rx.state().chunk_count(), 1);
        assert_eq!(rx.state().expected_size(), 100);
        assert_eq!(rx.state().transfer_id(), before);
    }

    #[test]
    fn zero_or_absent_timestamp_always_accepted() {
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:10:10");
        rx.on_message_received(b"END");

        assert!(matches!(
            rx.on_message_received(b"START:10:0"),
            Outcome::Started {
                timestamp: Some(0),
                ..
            }
        ));
        rx.on_message_received(b"END");
        assert!(matches!(
            rx.on_message_received(b"START:10"),
            Outcome::Started { timestamp: None, .. }
        ));
        assert_eq!(rx.state().last_accepted_timestamp(), 10);
    }

    #[test]
    fn newer_timestamp_advances_baseline() {
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:10:3");
        assert!(matches!(
            rx.on_message_received(b"START:10:4"),
            Outcome::Started { .. }
        ));
        assert_eq!(rx.state().last_accepted_timestamp(), 4);
    }

    #[test]
    fn restart_discards_partial_transfer() {
        let jpeg = sample_jpeg(8, 8);
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:999");
        rx.on_message_received(&[0x55; 120]);
        rx.on_message_received(&[0x66; 120]);

        rx.on_message_received(format!("START:{}", jpeg.len()).as_bytes());
        assert_eq!(rx.state().received_bytes(), 0);
        assert_eq!(rx.state().chunk_count(), 0);
        assert_eq!(rx.state().expected_size(), jpeg.len() as u64);

        rx.on_message_received(&jpeg);
        match rx.on_message_received(b"END") {
            Outcome::Completed { photo, warnings } => {
                assert!(warnings.is_empty());
                assert_eq!(photo.bytes(), &jpeg[..]);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn short_transfer_warns_and_still_decodes() {
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:100");
        rx.on_message_received(&[0xFF, 0xD8, 0xFF]);
        rx.on_message_received(&[0u8; 57]);
        let o = rx.on_message_received(b"END");
        let warnings = match o {
            Outcome::Completed { warnings, .. } | Outcome::Failed { warnings, .. } => warnings,
            other => panic!("expected terminal outcome, got {other:?}"),
        };
        assert_eq!(
            warnings,
            vec![AssemblyWarning::SizeMismatch {
                expected: 100,
                received: 60
            }]
        );
        assert_idle(&rx);
    }

    #[test]
    fn undecodable_bytes_fail() {
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:10");
        rx.on_message_received(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
        match rx.on_message_received(b"END") {
            Outcome::Failed { reason, .. } => assert_eq!(reason.to_string(), "decode failed"),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_idle(&rx);

        // the next transfer starts clean
        let jpeg = sample_jpeg(8, 8);
        let messages = encode_transfer(&jpeg, 64, None);
        let last = feed_all(&mut rx, &messages).pop().unwrap();
        assert!(matches!(last, Outcome::Completed { .. }));
    }

    #[test]
    fn data_while_idle_is_ignored() {
        let mut rx = PhotoReceiver::new();
        let o = rx.on_message_received(&[0xFF, 0xD8, 0xFF, 0xE0]);
        assert!(matches!(o, Outcome::Ignored(IgnoreReason::DataWhileIdle { len: 4 })));
        let o = rx.on_message_received(b"hello");
        assert!(matches!(o, Outcome::Ignored(IgnoreReason::DataWhileIdle { len: 5 })));
        assert_idle(&rx);
        assert_eq!(rx.state().last_accepted_timestamp(), 0);
    }

    #[test]
    fn end_while_idle_is_ignored() {
        let mut rx = PhotoReceiver::new();
        assert!(matches!(
            rx.on_message_received(b"END"),
            Outcome::Ignored(IgnoreReason::EndWhileIdle)
        ));
        assert_idle(&rx);
    }

    #[test]
    fn text_is_a_chunk_while_receiving() {
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(b"START:0");
        let o = rx.on_message_received(b"hello");
        assert!(matches!(o, Outcome::Progress { received_bytes: 5, .. }));
    }

    #[test]
    fn oversized_transfer_fails_and_resets() {
        let config = Config {
            max_photo_bytes: Some(100),
            ..Config::default()
        };
        let mut rx = PhotoReceiver::with_config(config);
        rx.on_message_received(b"START:0");
        assert!(matches!(
            rx.on_message_received(&[0xEE; 100]),
            Outcome::Progress { .. }
        ));
        match rx.on_message_received(&[0xEE; 1]) {
            Outcome::Failed { reason, warnings } => {
                assert!(matches!(reason, AssemblyError::TooLarge { limit: 100 }));
                assert!(warnings.is_empty());
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_idle(&rx);
        assert!(matches!(
            rx.on_message_received(b"END"),
            Outcome::Ignored(IgnoreReason::EndWhileIdle)
        ));
    }

    #[test]
    fn large_transfer_reaches_end_without_a_cap() {
        let total: u64 = 9 * 1024 * 1024;
        let chunk = vec![0xFF; 64 * 1024];
        let mut rx = PhotoReceiver::new();
        rx.on_message_received(format!("START:{total}").as_bytes());
        let mut last = None;
        for _ in 0..total / chunk.len() as u64 {
            last = Some(rx.on_message_received(&chunk));
        }
        assert!(matches!(
            last,
            Some(Outcome::Progress { received_bytes, .. }) if received_bytes == total
        ));
        match rx.on_message_received(b"END") {
            Outcome::Failed { reason, warnings } => {
                assert!(matches!(reason, AssemblyError::DecodeFailed(_)));
                assert!(!warnings
                    .iter()
                    .any(|w| matches!(w, AssemblyWarning::SizeMismatch { .. })));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_idle(&rx);
    }

    #[test]
    fn strict_marker_rejects_headerless_photo() {
        let config = Config {
            strict_marker: true,
            ..Config::default()
        };
        let mut rx = PhotoReceiver::with_config(config);
        rx.on_message_received(b"START:4");
        rx.on_message_received(&[0x00, 0x00, 0x00, 0x00]);
        match rx.on_message_received(b"END") {
            Outcome::Failed { reason, warnings } => {
                assert!(matches!(reason, AssemblyError::MissingMarker));
                assert_eq!(warnings.len(), 1);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
