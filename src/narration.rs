//! The narration controller: owns the speech engine, the page cache and the
//! playback state, and turns engine progress into viewer selections.

use std::{
    path::Path,
    sync::{
        mpsc::{channel, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    time::Duration,
};

use log::{debug, error, info, trace, warn};
use serde::Serialize;
use thiserror::Error;

use crate::{
    cache::PageTextCache,
    document::{Document, DocumentError, PdfDocument},
    events::{
        EngineEvent, EngineSink, Generation, SelectionObserver, SelectionSlot, TaggedEvent,
    },
    resolver::{ResolvedSelection, SpeechRangeEvent, SpeechRangeResolver},
    speech::{SpeechEngine, SpeechError, UtteranceRequest},
    text::{CharRange, ExtractError, TextExtractor},
    voices::{VoiceCatalog, VoicePreferences},
};

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("no document is loaded")]
    NoDocumentLoaded,
    #[error("the document could not be opened: {0}")]
    DocumentUnreadable(#[from] DocumentError),
    #[error("the document has no extractable text")]
    NoExtractableText,
    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: NarrationState,
    },
    #[error(transparent)]
    Engine(#[from] SpeechError),
}

impl From<ExtractError> for NarrationError {
    fn from(value: ExtractError) -> Self {
        match value {
            ExtractError::NoExtractableText => NarrationError::NoExtractableText,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NarrationState {
    Idle,
    Speaking,
    Paused,
}

pub struct NarrationController<E: SpeechEngine> {
    engine: E,
    voices: Arc<dyn VoiceCatalog>,
    preferences: VoicePreferences,
    document: Option<Arc<dyn Document>>,
    cache: PageTextCache,
    state: NarrationState,
    generation: Generation,
    buffer: Option<Arc<str>>,
    events_tx: Sender<TaggedEvent>,
    events_rx: Receiver<TaggedEvent>,
    selection: SelectionSlot,
    observers: Vec<Box<dyn SelectionObserver>>,
}

impl<E: SpeechEngine> NarrationController<E> {
    pub fn new(engine: E, voices: Arc<dyn VoiceCatalog>, preferences: VoicePreferences) -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            engine,
            voices,
            preferences,
            document: None,
            cache: PageTextCache::new(),
            state: NarrationState::Idle,
            generation: Generation::default(),
            buffer: None,
            events_tx,
            events_rx,
            selection: SelectionSlot::default(),
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> NarrationState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Text of the utterance currently being spoken.
    pub fn narration_buffer(&self) -> Option<&str> {
        self.buffer.as_deref()
    }

    pub fn current_selection(&self) -> Option<ResolvedSelection> {
        self.selection.get()
    }

    /// A handle renderers can keep to read the latest selection.
    pub fn selection_slot(&self) -> SelectionSlot {
        self.selection.clone()
    }

    pub fn cache(&self) -> &PageTextCache {
        &self.cache
    }

    pub fn document(&self) -> Option<&Arc<dyn Document>> {
        self.document.as_ref()
    }

    pub fn add_observer(&mut self, observer: Box<dyn SelectionObserver>) {
        self.observers.push(observer);
    }

    pub fn preferences(&self) -> &VoicePreferences {
        &self.preferences
    }

    pub fn set_language(&mut self, language: &str) {
        self.preferences.set_language(self.voices.as_ref(), language);
    }

    pub fn select_voice(&mut self, identifier: Option<String>) {
        self.preferences.select_voice(identifier);
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.preferences.set_rate(rate);
    }

    /// Replace the loaded document. Narration of the previous one is
    /// cancelled and its cached text dropped.
    pub fn load_document(&mut self, document: Arc<dyn Document>) {
        self.cancel_current();
        self.cache.clear();
        info!(
            "Loaded {} ({} pages)",
            document.source(),
            document.page_count()
        );
        self.document = Some(document);
    }

    pub fn open_pdf(&mut self, path: impl AsRef<Path>) -> Result<(), NarrationError> {
        let document = PdfDocument::open(path)?;
        self.load_document(Arc::new(document));
        Ok(())
    }

    /// Start narrating the loaded document from the beginning.
    pub fn start(&mut self) -> Result<Generation, NarrationError> {
        let document = self
            .document
            .clone()
            .ok_or(NarrationError::NoDocumentLoaded)?;

        self.cancel_current();

        let pages = TextExtractor::page_texts(document.as_ref());
        if self.cache.is_empty() {
            self.cache.fill(document.source(), &pages);
        }
        let text: Arc<str> = Arc::from(TextExtractor::narration_text(&pages).map_err(|err| {
            warn!("Nothing to narrate in {}: {err}", document.source());
            NarrationError::from(err)
        })?);

        let request = UtteranceRequest {
            text: Arc::clone(&text),
            rate: self.preferences.rate(),
            voice: self.preferences.resolve_voice(self.voices.as_ref()),
        };
        let sink = EngineSink::new(self.generation, self.events_tx.clone());
        self.engine.speak(request, sink).map_err(|err| {
            error!("Speech engine refused the utterance: {err}");
            NarrationError::from(err)
        })?;

        info!(
            "Narrating {} characters of {} (generation {})",
            text.chars().count(),
            document.source(),
            self.generation.value()
        );
        self.buffer = Some(text);
        self.state = NarrationState::Speaking;
        Ok(self.generation)
    }

    pub fn pause(&mut self) -> Result<(), NarrationError> {
        if self.state != NarrationState::Speaking {
            return Err(NarrationError::InvalidTransition {
                action: "pause",
                state: self.state,
            });
        }
        self.engine.pause();
        self.state = NarrationState::Paused;
        debug!("Narration paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), NarrationError> {
        if self.state != NarrationState::Paused {
            return Err(NarrationError::InvalidTransition {
                action: "resume",
                state: self.state,
            });
        }
        self.engine.resume();
        self.state = NarrationState::Speaking;
        debug!("Narration resumed");
        Ok(())
    }

    pub fn stop(&mut self) {
        self.cancel_current();
    }

    /// Handle every event already queued by the engine. Call from the thread
    /// that owns the viewer. Returns how many selections were published.
    pub fn pump(&mut self) -> usize {
        let mut published = 0;
        while let Ok(tagged) = self.events_rx.try_recv() {
            if self.dispatch(tagged) {
                published += 1;
            }
        }
        published
    }

    /// Like [`pump`](Self::pump) but waits up to `timeout` for the first
    /// event.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(tagged) => usize::from(self.dispatch(tagged)) + self.pump(),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn cancel_current(&mut self) {
        if self.state != NarrationState::Idle {
            info!("Cancelling generation {}", self.generation.value());
            self.engine.stop();
        }
        self.generation = self.generation.next();
        self.state = NarrationState::Idle;
        self.buffer = None;
        self.selection.clear();
    }

    fn dispatch(&mut self, tagged: TaggedEvent) -> bool {
        if tagged.generation != self.generation {
            trace!(
                "Discarding {:?} from stale generation {}",
                tagged.event,
                tagged.generation.value()
            );
            return false;
        }

        match tagged.event {
            EngineEvent::Range(range) => self.publish_range(range),
            EngineEvent::Finished => {
                info!("Narration finished (generation {})", self.generation.value());
                self.state = NarrationState::Idle;
                false
            }
            EngineEvent::Failed(reason) => {
                error!("Narration aborted: {reason}");
                self.state = NarrationState::Idle;
                false
            }
        }
    }

    fn publish_range(&mut self, range: CharRange) -> bool {
        if self.state == NarrationState::Idle {
            return false;
        }
        let Some(utterance) = self.buffer.as_deref() else {
            return false;
        };

        let event = SpeechRangeEvent { utterance, range };
        match SpeechRangeResolver::new(&self.cache).resolve(&event) {
            Ok(selection) => {
                trace!("Range {range:?} resolved to {selection:?}");
                self.selection.set(selection);
                for observer in &mut self.observers {
                    observer.selection_changed(&selection);
                }
                true
            }
            Err(err) => {
                trace!("Keeping previous selection: {err}");
                false
            }
        }
    }
}
