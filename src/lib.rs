//! Read PDF documents aloud and keep the viewer's highlight in step with the
//! narration.
//!
//! [`NarrationController`] is the entry point: load a [`Document`], call
//! [`NarrationController::start`], and pump engine events on the UI thread to
//! receive [`ResolvedSelection`]s.

pub mod cache;
pub mod config;
pub mod document;
pub mod events;
pub mod narration;
pub mod resolver;
pub mod speech;
pub mod text;
pub mod util;
pub mod voices;

pub use cache::PageTextCache;
pub use document::{Document, MemoryDocument, PdfDocument};
pub use events::{Generation, SelectionObserver, SelectionSlot};
pub use narration::{NarrationController, NarrationError, NarrationState};
pub use resolver::{ResolvedSelection, SpeechRangeResolver};
pub use speech::{PiperEngine, SpeechEngine, WordClockEngine};
pub use text::CharRange;
pub use voices::{PiperVoiceLibrary, VoiceCatalog, VoiceDescriptor, VoicePreferences};
