// snaplink Linux: receive photos over a datagram link, save them, analyze and speak the result.

mod analysis;
mod config;
mod link;
mod logging;
mod pipeline;
mod playback;
mod sender;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: snap-linux [--capture] | --send <photo> [--to <host:port>] | --version";

/// Parsed command line.
#[derive(Debug, PartialEq)]
enum Mode {
    Version,
    Receive { capture: bool },
    Send { path: PathBuf, to: Option<SocketAddr> },
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Mode, String> {
    let mut capture = false;
    let mut send: Option<PathBuf> = None;
    let mut to: Option<SocketAddr> = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(Mode::Version),
            "--capture" => capture = true,
            "--send" => {
                let p = args.next().ok_or("--send needs a file")?;
                send = Some(PathBuf::from(p));
            }
            "--to" => {
                let a = args.next().ok_or("--to needs an address")?;
                to = Some(a.parse().map_err(|_| format!("bad address: {a}"))?);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    match send {
        Some(path) => Ok(Mode::Send { path, to }),
        None if to.is_some() => Err("--to only applies to --send".to_string()),
        None => Ok(Mode::Receive { capture }),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mode = match parse_args(std::env::args().skip(1)) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };
    if mode == Mode::Version {
        println!("snap-linux {}", VERSION);
        return Ok(());
    }

    logging::init().map_err(|e| e as Box<dyn std::error::Error>)?;
    let cfg = config::load()?;

    let rt = tokio::runtime::Runtime::new()?;
    let result: anyhow::Result<()> = rt.block_on(async {
        match mode {
            Mode::Send { path, to } => {
                let to = to.unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], cfg.listen_port)));
                sender::send_photo(&path, to).await.map(|_| ())
            }
            Mode::Receive { capture } => run_daemon(cfg, capture).await,
            Mode::Version => Ok(()),
        }
    });
    result?;
    Ok(())
}

async fn run_daemon(cfg: config::Config, capture: bool) -> anyhow::Result<()> {
    let socket = link::bind(cfg.listen_port)
        .await
        .with_context(|| format!("failed to bind UDP port {}", cfg.listen_port))?;
    tracing::info!(
        event = "daemon_started",
        version = VERSION,
        listen_port = cfg.listen_port,
        output_dir = %cfg.output_dir.display()
    );

    let analyzer = match analysis::from_config(&cfg) {
        Ok(a) => Some(a),
        Err(e) => {
            tracing::warn!(event = "analysis_disabled", reason = %e);
            None
        }
    };
    let sinks = Arc::new(pipeline::Sinks {
        output_dir: cfg.output_dir.clone(),
        analyzer,
        analysis: cfg.analysis,
        playback: playback::from_command(cfg.playback_command.as_deref()),
    });
    let receiver = snap_core::PhotoReceiver::with_config(cfg.receiver.clone());

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let link_task = tokio::spawn(link::run_link(
        Arc::new(socket),
        cfg.max_message_len,
        capture,
        tx,
    ));
    let receiver_task = tokio::spawn(pipeline::run_receiver(receiver, rx, sinks));

    tokio::select! {
        r = link_task => {
            match r {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e).context("link failed"),
                Err(e) => return Err(e).context("link task panicked"),
            }
        }
        r = shutdown_signal() => r?,
    }
    receiver_task.abort();
    tracing::info!(event = "daemon_stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_is_receive() {
        assert_eq!(parse_args(args(&[])), Ok(Mode::Receive { capture: false }));
        assert_eq!(
            parse_args(args(&["--capture"])),
            Ok(Mode::Receive { capture: true })
        );
    }

    #[test]
    fn version_wins() {
        assert_eq!(parse_args(args(&["--capture", "-V"])), Ok(Mode::Version));
    }

    #[test]
    fn send_with_target() {
        assert_eq!(
            parse_args(args(&["--send", "cat.jpg", "--to", "10.0.0.2:45690"])),
            Ok(Mode::Send {
                path: PathBuf::from("cat.jpg"),
                to: Some("10.0.0.2:45690".parse().unwrap()),
            })
        );
    }

    #[test]
    fn bad_arguments() {
        assert!(parse_args(args(&["--send"])).is_err());
        assert!(parse_args(args(&["--to", "nowhere"])).is_err());
        assert!(parse_args(args(&["--to", "127.0.0.1:1"])).is_err());
        assert!(parse_args(args(&["--proxy"])).is_err());
    }
}
