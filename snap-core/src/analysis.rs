//! Analysis requests handed to the vision-model collaborator. The core only picks the prompt;
//! hosts perform the call.

use std::str::FromStr;

use serde::Deserialize;

/// API key value that makes hosts answer locally instead of calling the model.
pub const TEST_MODE_KEY: &str = "TEST_MODE";

/// Canned answer used in test mode.
pub const TEST_MODE_RESULT: &str = "This is a test analysis result. The image appears to show a sample object for testing the audio playback functionality.";

/// Upper bound on the model's answer length, in tokens.
pub const MAX_TOKENS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    #[default]
    General,
    Detailed,
    Objects,
    Text,
    Food,
    Landmarks,
    Books,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 7] = [
        AnalysisKind::General,
        AnalysisKind::Detailed,
        AnalysisKind::Objects,
        AnalysisKind::Text,
        AnalysisKind::Food,
        AnalysisKind::Landmarks,
        AnalysisKind::Books,
    ];

    pub fn prompt(self) -> &'static str {
        match self {
            AnalysisKind::General => {
                "What do you see in this image? Describe the main objects and their details."
            }
            AnalysisKind::Detailed => {
                "Describe what you see in this image. Be as specific as possible."
            }
            AnalysisKind::Objects => {
                "What is this object? Provide the name and key characteristics."
            }
            AnalysisKind::Text => "Extract and transcribe any text visible in this image.",
            AnalysisKind::Food => "If this is food, identify the dish, ingredients, and estimate nutritional information. If not food, say so.",
            AnalysisKind::Landmarks => "If this is a landmark, identify any notable features and history. If not a landmark, say so.",
            AnalysisKind::Books => "If this is a book, write a summary and get its rating if possible. If not a book, say so.",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::General => "general",
            AnalysisKind::Detailed => "detailed",
            AnalysisKind::Objects => "objects",
            AnalysisKind::Text => "text",
            AnalysisKind::Food => "food",
            AnalysisKind::Landmarks => "landmarks",
            AnalysisKind::Books => "books",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown analysis kind: {0}")]
pub struct UnknownAnalysisKind(String);

impl FromStr for AnalysisKind {
    type Err = UnknownAnalysisKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AnalysisKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| UnknownAnalysisKind(s.to_string()))
    }
}
