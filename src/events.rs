//! Event plumbing between speech engines, the narration controller and the
//! viewer.
//!
//! Engines never call back into the controller directly. They push
//! [`EngineEvent`]s through an [`EngineSink`] that stamps every event with the
//! [`Generation`] of the utterance it belongs to. The controller drains the
//! channel on the thread that owns the UI and drops anything stamped with an
//! older generation.

use std::sync::{mpsc::Sender, Arc};

use parking_lot::RwLock;
use serde::Serialize;

use crate::{resolver::ResolvedSelection, text::CharRange};

/// Monotonic tag of a narration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The engine is about to speak this range of the utterance.
    Range(CharRange),
    /// The utterance played to the end.
    Finished,
    /// The engine gave up on the utterance.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TaggedEvent {
    pub generation: Generation,
    pub event: EngineEvent,
}

/// Handle an engine uses to report progress for one utterance.
///
/// Sending never blocks. Every method returns `false` once the receiving
/// controller is gone, which engines treat as a request to stop.
#[derive(Debug, Clone)]
pub struct EngineSink {
    generation: Generation,
    tx: Sender<TaggedEvent>,
}

impl EngineSink {
    pub(crate) fn new(generation: Generation, tx: Sender<TaggedEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn range(&self, range: CharRange) -> bool {
        self.send(EngineEvent::Range(range))
    }

    pub fn finished(&self) -> bool {
        self.send(EngineEvent::Finished)
    }

    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.send(EngineEvent::Failed(reason.into()))
    }

    fn send(&self, event: EngineEvent) -> bool {
        self.tx
            .send(TaggedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Latest published selection, shared with whatever renders it.
#[derive(Debug, Clone, Default)]
pub struct SelectionSlot {
    inner: Arc<RwLock<Option<ResolvedSelection>>>,
}

impl SelectionSlot {
    pub fn get(&self) -> Option<ResolvedSelection> {
        *self.inner.read()
    }

    pub(crate) fn set(&self, selection: ResolvedSelection) {
        *self.inner.write() = Some(selection);
    }

    pub(crate) fn clear(&self) {
        *self.inner.write() = None;
    }
}

/// Viewer side of the narration: scrolls to and highlights selections.
pub trait SelectionObserver {
    fn selection_changed(&mut self, selection: &ResolvedSelection);
}

impl<F> SelectionObserver for F
where
    F: FnMut(&ResolvedSelection),
{
    fn selection_changed(&mut self, selection: &ResolvedSelection) {
        self(selection)
    }
}
