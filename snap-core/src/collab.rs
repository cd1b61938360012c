//! Collaborators a host plugs in behind a finished photo. The core never calls them;
//! hosts drive them from their own runtime.

use std::future::Future;
use std::pin::Pin;

use crate::integrity::AssembledPhoto;

pub type CollabFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Vision-model call: one photo plus a prompt in, free text out. Not retried.
pub trait PhotoAnalyzer: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn analyze<'a>(
        &'a self,
        photo: &'a AssembledPhoto,
        prompt: &'a str,
    ) -> CollabFuture<'a, Result<String, Self::Error>>;
}

/// Speech or text output of an analysis result. Text is passed verbatim;
/// implementations skip text that is empty after trimming (see [`is_blank`]).
pub trait Playback: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn speak<'a>(&'a self, text: &'a str) -> CollabFuture<'a, Result<(), Self::Error>>;
}

/// Text with nothing to say.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
