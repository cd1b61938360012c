//! Receiver task: sole owner of the PhotoReceiver. Completed photos are saved, analyzed and
//! spoken on separate tasks so the link is never held up by downstream work.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use snap_core::{AnalysisKind, AssembledPhoto, Outcome, PhotoReceiver, Progress};
use tokio::sync::mpsc;

use crate::analysis::Analyzer;
use crate::link::LinkMessage;
use crate::playback::Speaker;

/// Downstream consumers of a completed photo.
pub struct Sinks {
    pub output_dir: PathBuf,
    pub analyzer: Option<Analyzer>,
    pub analysis: AnalysisKind,
    pub playback: Speaker,
}

/// Drain the link channel in arrival order until it closes.
pub async fn run_receiver(
    mut receiver: PhotoReceiver,
    mut rx: mpsc::UnboundedReceiver<LinkMessage>,
    sinks: Arc<Sinks>,
) {
    while let Some(msg) = rx.recv().await {
        tracing::trace!(event = "link_message", from = %msg.from, len = msg.bytes.len());
        let outcome = receiver.on_message_received(&msg.bytes);
        if let Some(photo) = report(outcome) {
            let sinks = sinks.clone();
            tokio::spawn(async move {
                handle_photo(photo, &sinks).await;
            });
        }
    }
    tracing::info!(event = "receiver_stopped");
}

/// Log an outcome; hand back the photo if the transfer completed.
pub fn report(outcome: Outcome) -> Option<AssembledPhoto> {
    match outcome {
        Outcome::Started { expected_size, .. } => {
            tracing::info!(event = "receiving_photo", expected_size);
            None
        }
        Outcome::Progress {
            received_bytes,
            expected_size,
            progress,
        } => {
            match progress {
                Progress::Fraction(f) => tracing::debug!(
                    event = "transfer_progress",
                    received_bytes,
                    expected_size,
                    percent = (f * 100.0) as u32
                ),
                Progress::Indeterminate => {
                    tracing::debug!(event = "transfer_progress", received_bytes)
                }
            }
            None
        }
        Outcome::Completed { photo, warnings } => {
            for w in &warnings {
                tracing::warn!(event = "photo_warning", warning = %w);
            }
            Some(photo)
        }
        Outcome::Failed { reason, warnings } => {
            for w in &warnings {
                tracing::warn!(event = "photo_warning", warning = %w);
            }
            tracing::error!(event = "photo_transfer_failed", reason = %reason);
            None
        }
        Outcome::Ignored(reason) => {
            tracing::debug!(event = "message_ignored", reason = ?reason);
            None
        }
    }
}

async fn handle_photo(photo: AssembledPhoto, sinks: &Sinks) {
    match save_photo(&photo, &sinks.output_dir).await {
        Ok(path) => tracing::info!(event = "photo_saved", path = %path.display()),
        Err(e) => tracing::error!(event = "photo_save_failed", error = %e),
    }
    let Some(analyzer) = &sinks.analyzer else {
        return;
    };
    let text = match analyzer.analyze(&photo, sinks.analysis.prompt()).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(event = "analysis_failed", error = %e);
            return;
        }
    };
    tracing::info!(event = "analysis_result", kind = sinks.analysis.name(), chars = text.len());
    if let Err(e) = sinks.playback.speak(&text).await {
        tracing::error!(event = "playback_failed", error = %e);
    }
}

/// File name: `photo-<unix seconds>-<first 8 hex of sha256>.<ext>`.
pub fn photo_file_name(photo: &AssembledPhoto, unix_secs: u64) -> String {
    let digest = photo.digest_hex();
    format!("photo-{unix_secs}-{}.{}", &digest[..8], photo.extension())
}

pub async fn save_photo(photo: &AssembledPhoto, dir: &Path) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = dir.join(photo_file_name(photo, secs));
    tokio::fs::write(&path, photo.bytes()).await?;
    Ok(path)
}
