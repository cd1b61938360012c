//! `--send`: play the camera's side of the protocol over UDP, for exercising a running daemon.

use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use snap_core::chunk::DEFAULT_CHUNK_SIZE;
use tokio::net::UdpSocket;

/// Gap between datagrams so a local receiver is not flooded.
const SEND_INTERVAL: Duration = Duration::from_millis(2);

pub async fn send_photo(path: &Path, to: SocketAddr) -> anyhow::Result<usize> {
    let photo = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    // seconds since the epoch fit u32 until 2106
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .ok();
    let messages = snap_core::encode_transfer(&photo, DEFAULT_CHUNK_SIZE, timestamp);
    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .await
        .context("failed to bind sender socket")?;
    for m in &messages {
        socket
            .send_to(m, to)
            .await
            .with_context(|| format!("failed to send to {to}"))?;
        tokio::time::sleep(SEND_INTERVAL).await;
    }
    tracing::info!(event = "photo_sent", bytes = photo.len(), messages = messages.len(), %to);
    Ok(messages.len())
}
