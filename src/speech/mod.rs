//! Speech engine capability.
//!
//! An engine accepts an [`UtteranceRequest`], speaks it on its own thread and
//! reports progress through the [`EngineSink`] it was handed. Range events
//! must be emitted in increasing offset order, one at a time.

pub(crate) mod clock;
pub mod piper;
pub mod word_clock;

pub use piper::PiperEngine;
pub use word_clock::WordClockEngine;

use std::{path::PathBuf, sync::Arc};

use thiserror::Error;

use crate::{events::EngineSink, voices::VoiceDescriptor};

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("failed to spawn speech thread: {0}")]
    Thread(#[source] std::io::Error),
    #[error("failed to spawn Piper process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Piper exited with status {status}: {stderr}")]
    PiperFailure { status: i32, stderr: String },
    #[error("piper executable not found under {0} and python is not on PATH")]
    PiperUnavailable(PathBuf),
    #[error(transparent)]
    Voice(#[from] crate::voices::piper::VoiceError),
    #[error("audio playback failed: {0}")]
    Audio(String),
    #[error("{0}")]
    Other(String),
}

/// Speaking rate on a `0.0..=1.0` scale where `0.5` is the engine's natural
/// pace.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SpeechRate(f32);

impl SpeechRate {
    pub const NORMAL: f32 = 0.5;
    const MIN: f32 = 0.05;

    pub fn new(rate: f32) -> Self {
        if rate.is_finite() {
            Self(rate.clamp(Self::MIN, 1.0))
        } else {
            Self(Self::NORMAL)
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Words per minute, 180 at the natural pace.
    pub fn words_per_minute(self) -> f32 {
        self.0 * 360.0
    }

    /// Piper's `--length_scale`: larger is slower, `1.0` at the natural pace.
    pub fn length_scale(self) -> f32 {
        Self::NORMAL / self.0
    }
}

impl Default for SpeechRate {
    fn default() -> Self {
        Self(Self::NORMAL)
    }
}

/// One full text buffer submitted for narration.
#[derive(Debug, Clone)]
pub struct UtteranceRequest {
    pub text: Arc<str>,
    pub rate: SpeechRate,
    /// `None` lets the engine use its default voice.
    pub voice: Option<VoiceDescriptor>,
}

pub trait SpeechEngine {
    /// Begin speaking asynchronously. Any utterance still playing is
    /// cancelled first.
    fn speak(&mut self, request: UtteranceRequest, sink: EngineSink) -> Result<(), SpeechError>;

    /// Pause at the next word boundary.
    fn pause(&mut self);

    fn resume(&mut self);

    /// Cancel immediately; no further events are emitted for the utterance.
    fn stop(&mut self);
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    fn speak(&mut self, request: UtteranceRequest, sink: EngineSink) -> Result<(), SpeechError> {
        (**self).speak(request, sink)
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}
