//! snaplink photo-transfer receiver.
//! Host-driven: no I/O; host passes link messages and receives outcomes.

pub mod analysis;
pub mod chunk;
pub mod collab;
pub mod config;
pub mod core;
pub mod ffi;
pub mod integrity;
pub mod protocol;
pub mod wire;

pub use analysis::AnalysisKind;
pub use chunk::{Phase, Progress, TransferState};
pub use collab::{PhotoAnalyzer, Playback};
pub use config::Config;
pub use crate::core::{IgnoreReason, Outcome, PhotoReceiver};
pub use integrity::{AssembledPhoto, AssemblyError, AssemblyWarning};
pub use protocol::{ControlFrame, Frame, CAPTURE_COMMAND, PROTOCOL_VERSION};
pub use wire::{classify, encode_control, encode_transfer};
