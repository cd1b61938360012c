//! Datagram link: one UDP datagram carries one camera notification payload.
//! Stands in for the radio link; message boundaries and arrival order are whatever UDP delivers.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// One message as delivered by the link.
#[derive(Debug)]
pub struct LinkMessage {
    pub from: SocketAddr,
    pub bytes: Vec<u8>,
}

pub async fn bind(listen_port: u16) -> std::io::Result<UdpSocket> {
    UdpSocket::bind(("0.0.0.0", listen_port)).await
}

/// Receive datagrams and forward them, in arrival order, to the single receiver task.
/// With `capture` set, the capture command is sent once, to the sender of the first datagram.
pub async fn run_link(
    socket: Arc<UdpSocket>,
    max_message_len: usize,
    capture: bool,
    tx: mpsc::UnboundedSender<LinkMessage>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; 65536];
    let mut last_peer: Option<SocketAddr> = None;
    let mut capture_pending = capture;
    loop {
        let (n, from) = socket.recv_from(&mut buf).await?;
        if n > max_message_len {
            tracing::warn!(event = "link_message_oversized", len = n, max = max_message_len, %from);
            continue;
        }
        if last_peer != Some(from) {
            tracing::info!(event = "link_peer", %from);
            last_peer = Some(from);
        }
        if capture_pending {
            capture_pending = false;
            request_capture(&socket, from).await;
        }
        let msg = LinkMessage {
            from,
            bytes: buf[..n].to_vec(),
        };
        if tx.send(msg).is_err() {
            // receiver task gone; shutting down
            return Ok(());
        }
    }
}

/// Write the capture command to the camera's control channel.
pub async fn request_capture(socket: &UdpSocket, to: SocketAddr) {
    match socket.send_to(snap_core::CAPTURE_COMMAND, to).await {
        Ok(_) => tracing::info!(event = "capture_requested", %to),
        Err(e) => tracing::warn!(event = "capture_request_failed", %to, error = %e),
    }
}
