use std::{
    fs::{self, File},
    io::{BufReader, Read, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use log::{error, info, warn};
use rodio::{Decoder, OutputStream, Sink, Source};

use super::{
    clock::{proportional_schedule, ClockHooks, WordClock},
    SpeechEngine, SpeechError, SpeechRate, UtteranceRequest,
};
use crate::{
    events::EngineSink,
    util::piper_path::{self, PiperCommand, PiperPathError},
    voices::piper::{PiperVoice, PiperVoiceLibrary},
};

const SYNTHESIS_POLL: Duration = Duration::from_millis(20);

/// Speaks through a Piper subprocess and plays the result with `rodio`.
///
/// Piper renders the whole utterance to a WAV file before playback starts;
/// word ranges are then emitted on a clock scaled to the audio duration.
pub struct PiperEngine {
    library: Arc<PiperVoiceLibrary>,
    command: PiperCommand,
    output_dir: PathBuf,
    current: Option<Arc<WordClock>>,
}

impl PiperEngine {
    pub fn new(
        library: Arc<PiperVoiceLibrary>,
        runtime_dir: &Path,
        output_dir: PathBuf,
        command_override: Option<&str>,
    ) -> Result<Self, SpeechError> {
        let command = piper_path::resolve(runtime_dir, command_override).map_err(|err| match err {
            PiperPathError::Unavailable(dir) => SpeechError::PiperUnavailable(dir),
            other => SpeechError::Other(other.to_string()),
        })?;
        info!("Using Piper command {command:?}");
        Ok(Self {
            library,
            command,
            output_dir,
            current: None,
        })
    }

    fn voice_for(&self, request: &UtteranceRequest) -> Result<PiperVoice, SpeechError> {
        let selected = request
            .voice
            .as_ref()
            .and_then(|voice| self.library.get(&voice.identifier).ok());
        match selected {
            Some(voice) => Ok(voice),
            None => Ok(self.library.default_voice()?),
        }
    }
}

impl SpeechEngine for PiperEngine {
    fn speak(&mut self, request: UtteranceRequest, sink: EngineSink) -> Result<(), SpeechError> {
        self.stop();

        let voice = self.voice_for(&request)?;
        let job = PiperJob {
            command: self.command.clone(),
            model_path: voice.model_path,
            output_path: self
                .output_dir
                .join(format!("utterance-{}.wav", sink.generation().value())),
            text: request.text,
            rate: request.rate,
        };

        let clock = WordClock::new();
        let runner = Arc::clone(&clock);
        thread::Builder::new()
            .name("piper-playback".into())
            .spawn(move || {
                if let Err(err) = play(&job, &runner, &sink) {
                    error!("Piper narration failed: {err}");
                    sink.failed(err.to_string());
                }
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

impl Drop for PiperEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PiperJob {
    command: PiperCommand,
    model_path: PathBuf,
    output_path: PathBuf,
    text: Arc<str>,
    rate: SpeechRate,
}

impl PiperJob {
    fn build_command(&self) -> Command {
        let mut command = self.command.to_command();
        command.arg("--model");
        command.arg(&self.model_path);
        command.arg("--output_file");
        command.arg(&self.output_path);
        command.arg("--length_scale");
        command.arg(format!("{:.2}", self.rate.length_scale()));
        command
    }

    /// Render the utterance to `output_path`. Returns `None` when `clock` was
    /// stopped first, in which case the Piper process is killed.
    fn synthesize(&self, clock: &WordClock) -> Result<Option<Duration>, SpeechError> {
        let start = Instant::now();
        if let Some(parent) = self
            .output_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|err| {
                SpeechError::Other(format!(
                    "Unable to create output directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let mut child = self
            .build_command()
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SpeechError::Spawn)?;
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut captured = String::new();
                let _ = stderr.read_to_string(&mut captured);
                captured
            })
        });
        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| SpeechError::Other("Failed to access Piper stdin".into()))?;
            stdin
                .write_all(self.text.as_bytes())
                .map_err(|err| SpeechError::Other(err.to_string()))?;
        }

        let status = loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|err| SpeechError::Other(err.to_string()))?
            {
                break status;
            }
            if clock.is_stopped() {
                info!("Killing Piper process {}", child.id());
                if let Err(err) = child.kill() {
                    warn!("Failed to kill Piper process {}: {err}", child.id());
                }
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(SYNTHESIS_POLL);
        };
        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default()
            .trim()
            .to_string();

        if !status.success() {
            return Err(SpeechError::PiperFailure {
                status: status.code().unwrap_or_default(),
                stderr,
            });
        }
        if !self.output_path.exists() {
            warn!(
                "Piper succeeded but the expected output {:?} was not created",
                self.output_path
            );
        }
        Ok(Some(start.elapsed()))
    }

    fn discard_output(&self) {
        if !self.output_path.exists() {
            return;
        }
        if let Err(err) = fs::remove_file(&self.output_path) {
            warn!("Failed to remove {:?}: {err}", self.output_path);
        }
    }
}

/// Pauses and resumes the audio sink from the clock thread.
struct SinkHooks<'a>(&'a Sink);

impl ClockHooks for SinkHooks<'_> {
    fn paused(&self) {
        self.0.pause();
    }

    fn resumed(&self) {
        self.0.play();
    }
}

/// Synthesize and play one utterance; the WAV is removed afterwards.
fn play(job: &PiperJob, clock: &WordClock, sink: &EngineSink) -> Result<(), SpeechError> {
    let result = render_and_play(job, clock, sink);
    job.discard_output();
    result
}

fn render_and_play(job: &PiperJob, clock: &WordClock, sink: &EngineSink) -> Result<(), SpeechError> {
    let Some(took) = job.synthesize(clock)? else {
        return Ok(());
    };
    info!(
        "Piper rendered generation {} in {} ms",
        sink.generation().value(),
        took.as_millis()
    );
    if clock.is_stopped() {
        return Ok(());
    }

    let file = File::open(&job.output_path).map_err(|err| SpeechError::Audio(err.to_string()))?;
    let decoder =
        Decoder::new(BufReader::new(file)).map_err(|err| SpeechError::Audio(err.to_string()))?;
    let total = decoder
        .total_duration()
        .unwrap_or_else(|| estimated_duration(&job.text, job.rate));

    // The stream must stay alive for as long as the sink plays.
    let (_stream, handle) =
        OutputStream::try_default().map_err(|err| SpeechError::Audio(err.to_string()))?;
    let audio = Sink::try_new(&handle).map_err(|err| SpeechError::Audio(err.to_string()))?;
    audio.append(decoder);

    let (schedule, tail) = proportional_schedule(&job.text, total);
    if !clock.run(&schedule, tail, sink, &SinkHooks(&audio)) {
        audio.stop();
    }
    Ok(())
}

fn estimated_duration(text: &str, rate: SpeechRate) -> Duration {
    let words = crate::text::word_ranges(text).len() as f32;
    Duration::from_secs_f32(words * 60.0 / rate.words_per_minute())
}
