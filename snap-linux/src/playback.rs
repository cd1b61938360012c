//! Playback collaborator: hand analysis text to a speech program, verbatim.

use snap_core::collab::{is_blank, CollabFuture, Playback};
use tokio::process::Command;

pub type Speaker = Box<dyn Playback<Error = std::io::Error>>;

/// Parse a command line such as `espeak -s 150`. Blank or unset means stdout.
pub fn from_command(command: Option<&str>) -> Speaker {
    match command.and_then(CommandPlayback::parse) {
        Some(cmd) => Box::new(cmd),
        None => Box::new(StdoutPlayback),
    }
}

/// Print to stdout.
pub struct StdoutPlayback;

impl Playback for StdoutPlayback {
    type Error = std::io::Error;

    fn speak<'a>(&'a self, text: &'a str) -> CollabFuture<'a, std::io::Result<()>> {
        Box::pin(async move {
            if is_blank(text) {
                tracing::debug!(event = "playback_skipped_empty");
                return Ok(());
            }
            println!("{text}");
            Ok(())
        })
    }
}

/// Program plus leading arguments; the text goes last.
#[derive(Debug, PartialEq)]
pub struct CommandPlayback {
    program: String,
    args: Vec<String>,
}

impl CommandPlayback {
    pub fn parse(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }
}

impl Playback for CommandPlayback {
    type Error = std::io::Error;

    fn speak<'a>(&'a self, text: &'a str) -> CollabFuture<'a, std::io::Result<()>> {
        Box::pin(async move {
            if is_blank(text) {
                tracing::debug!(event = "playback_skipped_empty");
                return Ok(());
            }
            let status = Command::new(&self.program)
                .args(&self.args)
                .arg(text)
                .status()
                .await?;
            if !status.success() {
                tracing::warn!(event = "playback_command_failed", program = self.program.as_str(), %status);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_is_split() {
        assert_eq!(
            CommandPlayback::parse("espeak -s 150"),
            Some(CommandPlayback {
                program: "espeak".to_string(),
                args: vec!["-s".to_string(), "150".to_string()],
            })
        );
    }

    #[test]
    fn blank_command_is_none() {
        assert_eq!(CommandPlayback::parse(""), None);
        assert_eq!(CommandPlayback::parse("   "), None);
    }

    #[tokio::test]
    async fn stdout_is_the_fallback() {
        let speaker = from_command(None);
        assert!(speaker.speak("hello").await.is_ok());
        let speaker = from_command(Some("  "));
        assert!(speaker.speak("").await.is_ok());
    }

    #[tokio::test]
    async fn empty_text_skips_command() {
        let p = from_command(Some("/nonexistent/tts"));
        assert!(p.speak("  \n").await.is_ok());
        assert!(p.speak("hello").await.is_err());
    }
}
