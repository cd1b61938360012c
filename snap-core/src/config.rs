//! Receiver options. Embedded by hosts in their own config (e.g. `[receiver]` in TOML).

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Fail the transfer when received bytes differ from the declared size (default: warn only).
    #[serde(default)]
    pub strict_size: bool,
    /// Fail the transfer when the buffer lacks the JPEG start-of-image marker (default: warn only).
    #[serde(default)]
    pub strict_marker: bool,
    /// Abort a transfer whose accumulated bytes would exceed this many bytes.
    /// Unset (the default) means no cap: a transfer holds its bytes until `END` or a new `START`.
    #[serde(default)]
    pub max_photo_bytes: Option<u64>,
}
