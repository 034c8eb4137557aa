use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{events::EngineSink, text::CharRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    PauseRequested,
    Paused,
    Stopped,
}

/// Callbacks run on the clock thread when a pause takes effect or ends.
pub(crate) trait ClockHooks {
    fn paused(&self) {}
    fn resumed(&self) {}
}

impl ClockHooks for () {}

/// Word range paired with its start offset from the beginning of playback.
pub(crate) type Schedule = Vec<(CharRange, Duration)>;

/// Emits word ranges on a timetable, pausing only between words.
#[derive(Debug)]
pub(crate) struct WordClock {
    phase: Mutex<Phase>,
    wake: Condvar,
}

impl WordClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            phase: Mutex::new(Phase::Running),
            wake: Condvar::new(),
        })
    }

    pub fn request_pause(&self) {
        let mut phase = self.phase.lock();
        if *phase == Phase::Running {
            *phase = Phase::PauseRequested;
        }
        self.wake.notify_all();
    }

    pub fn resume(&self) {
        let mut phase = self.phase.lock();
        if matches!(*phase, Phase::PauseRequested | Phase::Paused) {
            *phase = Phase::Running;
        }
        self.wake.notify_all();
    }

    pub fn stop(&self) {
        *self.phase.lock() = Phase::Stopped;
        self.wake.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.phase.lock() == Phase::Stopped
    }

    /// Play `schedule` on the calling thread, then wait `tail` and report the
    /// end of the utterance. Returns `false` when stopped before the end.
    pub fn run(
        &self,
        schedule: &[(CharRange, Duration)],
        tail: Duration,
        sink: &EngineSink,
        hooks: &dyn ClockHooks,
    ) -> bool {
        let started = Instant::now();
        let mut paused_for = Duration::ZERO;

        for &(range, offset) in schedule {
            if !self.wait_until(started + paused_for + offset) {
                return false;
            }
            match self.hold_at_boundary(hooks) {
                Some(held) => paused_for += held,
                None => return false,
            }
            if !sink.range(range) {
                return false;
            }
        }

        let end = schedule.last().map(|&(_, offset)| offset).unwrap_or_default() + tail;
        if !self.wait_until(started + paused_for + end) {
            return false;
        }
        if self.hold_at_boundary(hooks).is_none() {
            return false;
        }
        sink.finished();
        true
    }

    fn wait_until(&self, deadline: Instant) -> bool {
        let mut phase = self.phase.lock();
        loop {
            if *phase == Phase::Stopped {
                return false;
            }
            if Instant::now() >= deadline {
                return true;
            }
            self.wake.wait_until(&mut phase, deadline);
        }
    }

    /// Returns how long playback was held, or `None` if stopped meanwhile.
    fn hold_at_boundary(&self, hooks: &dyn ClockHooks) -> Option<Duration> {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::Stopped => return None,
            Phase::PauseRequested => *phase = Phase::Paused,
            _ => return Some(Duration::ZERO),
        }

        let since = Instant::now();
        hooks.paused();
        while *phase == Phase::Paused {
            self.wake.wait(&mut phase);
        }
        if *phase == Phase::Stopped {
            return None;
        }
        hooks.resumed();
        Some(since.elapsed())
    }
}

/// One word every `interval`, with one more interval before finishing.
pub(crate) fn fixed_schedule(text: &str, interval: Duration) -> (Schedule, Duration) {
    let schedule = crate::text::word_ranges(text)
        .into_iter()
        .enumerate()
        .map(|(position, range)| (range, interval * position as u32))
        .collect();
    (schedule, interval)
}

/// Spread words over `total` in proportion to their character offset.
pub(crate) fn proportional_schedule(text: &str, total: Duration) -> (Schedule, Duration) {
    let total_chars = text.chars().count().max(1) as f64;
    let schedule: Schedule = crate::text::word_ranges(text)
        .into_iter()
        .map(|range| {
            let share = range.start as f64 / total_chars;
            (range, total.mul_f64(share))
        })
        .collect();
    let last = schedule.last().map(|&(_, offset)| offset).unwrap_or_default();
    (schedule, total.saturating_sub(last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EngineEvent, Generation};
    use std::sync::mpsc::channel;
    use std::thread;

    #[test]
    fn fixed_schedule_spaces_words_evenly() {
        let (schedule, tail) = fixed_schedule("one two three", Duration::from_millis(10));
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[2], (CharRange::new(8, 5), Duration::from_millis(20)));
        assert_eq!(tail, Duration::from_millis(10));
    }

    #[test]
    fn proportional_schedule_follows_character_offsets() {
        let (schedule, tail) = proportional_schedule("abc defg", Duration::from_millis(500));
        assert_eq!(schedule[0].1, Duration::ZERO);
        assert_eq!(schedule[1].1, Duration::from_millis(250));
        assert_eq!(tail, Duration::from_millis(250));
    }

    #[test]
    fn runs_schedule_and_finishes() {
        let (tx, rx) = channel();
        let sink = EngineSink::new(Generation::default(), tx);
        let (schedule, tail) = fixed_schedule("a b c", Duration::from_millis(1));
        assert!(WordClock::new().run(&schedule, tail, &sink, &()));

        let events: Vec<_> = rx.try_iter().map(|tagged| tagged.event).collect();
        assert_eq!(
            events,
            vec![
                EngineEvent::Range(CharRange::new(0, 1)),
                EngineEvent::Range(CharRange::new(2, 1)),
                EngineEvent::Range(CharRange::new(4, 1)),
                EngineEvent::Finished,
            ]
        );
    }

    #[test]
    fn stop_interrupts_a_long_wait() {
        let (tx, rx) = channel();
        let sink = EngineSink::new(Generation::default(), tx);
        let clock = WordClock::new();
        let runner = Arc::clone(&clock);
        let handle = thread::spawn(move || {
            let (schedule, tail) = fixed_schedule("a b", Duration::from_secs(30));
            runner.run(&schedule, tail, &sink, &())
        });

        thread::sleep(Duration::from_millis(20));
        clock.stop();
        assert!(!handle.join().unwrap());
        let events: Vec<_> = rx.try_iter().map(|tagged| tagged.event).collect();
        assert_eq!(events, vec![EngineEvent::Range(CharRange::new(0, 1))]);
    }

    #[test]
    fn pause_holds_until_resumed() {
        let (tx, rx) = channel();
        let sink = EngineSink::new(Generation::default(), tx);
        let clock = WordClock::new();
        clock.request_pause();
        let runner = Arc::clone(&clock);
        let handle = thread::spawn(move || {
            let (schedule, tail) = fixed_schedule("a b", Duration::from_millis(1));
            runner.run(&schedule, tail, &sink, &())
        });

        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
        clock.resume();
        assert!(handle.join().unwrap());
        assert_eq!(rx.try_iter().count(), 3);
    }
}
