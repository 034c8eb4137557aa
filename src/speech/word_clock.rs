use std::{sync::Arc, thread, time::Duration};

use log::debug;

use super::{
    clock::{fixed_schedule, WordClock},
    SpeechEngine, SpeechError, UtteranceRequest,
};
use crate::events::EngineSink;

/// Silent engine that "speaks" one word per tick of a timer.
///
/// The tick follows the requested rate unless a fixed interval is set, which
/// is what dry runs and tests use.
#[derive(Debug, Default)]
pub struct WordClockEngine {
    interval: Option<Duration>,
    current: Option<Arc<WordClock>>,
}

impl WordClockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            current: None,
        }
    }
}

impl SpeechEngine for WordClockEngine {
    fn speak(&mut self, request: UtteranceRequest, sink: EngineSink) -> Result<(), SpeechError> {
        self.stop();

        let interval = self.interval.unwrap_or_else(|| {
            Duration::from_secs_f32(60.0 / request.rate.words_per_minute())
        });
        let (schedule, tail) = fixed_schedule(&request.text, interval);
        debug!(
            "Word clock speaking {} words every {interval:?} for generation {}",
            schedule.len(),
            sink.generation().value()
        );

        let clock = WordClock::new();
        let runner = Arc::clone(&clock);
        thread::Builder::new()
            .name("word-clock".into())
            .spawn(move || {
                runner.run(&schedule, tail, &sink, &());
            })
            .map_err(SpeechError::Thread)?;

        self.current = Some(clock);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(clock) = &self.current {
            clock.request_pause();
        }
    }

    fn resume(&mut self) {
        if let Some(clock) = &self.current {
            clock.resume();
        }
    }

    fn stop(&mut self) {
        if let Some(clock) = self.current.take() {
            clock.stop();
        }
    }
}

impl Drop for WordClockEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
