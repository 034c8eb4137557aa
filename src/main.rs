use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use log::{error, info, warn};
use voz_reader::{
    config::{EngineKind, ReaderConfig},
    util::logging,
    NarrationController, NarrationState, PiperEngine, PiperVoiceLibrary, ResolvedSelection,
    SelectionObserver, SpeechEngine, VoiceCatalog, VoicePreferences, WordClockEngine,
};

/// Writes every selection as one JSON object per line on stdout.
struct JsonLinesViewer<W: Write> {
    out: W,
}

impl<W: Write> SelectionObserver for JsonLinesViewer<W> {
    fn selection_changed(&mut self, selection: &ResolvedSelection) {
        let written = serde_json::to_string(selection)
            .map_err(io::Error::from)
            .and_then(|line| writeln!(self.out, "{line}"));
        if let Err(err) = written {
            warn!("Failed to write selection: {err}");
        }
    }
}

fn main() -> ExitCode {
    let config = match ReaderConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = logging::init(&config.log_dir) {
        eprintln!("Failed to initialise logger: {err}");
    }
    info!("Starting VozPDF reader");

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: ReaderConfig) -> Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: voz-reader <file.pdf>")?;

    let library = Arc::new(PiperVoiceLibrary::new(config.voices_dir.clone()));
    match config.engine {
        EngineKind::Piper => {
            let engine = PiperEngine::new(
                Arc::clone(&library),
                &config.runtime_dir,
                config.output_dir.clone(),
                config.piper_command.as_deref(),
            )
            .context("unable to prepare the Piper engine")?;
            narrate(engine, library, &config, &path)
        }
        EngineKind::Silent => narrate(WordClockEngine::new(), library, &config, &path),
    }
}

fn narrate<E: SpeechEngine>(
    engine: E,
    voices: Arc<dyn VoiceCatalog>,
    config: &ReaderConfig,
    path: &Path,
) -> Result<()> {
    let mut preferences = VoicePreferences::detect(voices.as_ref(), config.region.as_deref());
    if let Some(language) = &config.language {
        preferences.set_language(voices.as_ref(), language);
    }
    if let Some(voice) = &config.voice {
        preferences.select_voice(Some(voice.clone()));
    }
    if let Some(rate) = config.rate {
        preferences.set_rate(rate);
    }
    info!(
        "Narration language {} with voice {:?} at rate {:.2}",
        preferences.language(),
        preferences.voice(),
        preferences.rate().value()
    );

    let mut controller = NarrationController::new(engine, voices, preferences);
    controller.add_observer(Box::new(JsonLinesViewer { out: io::stdout() }));
    controller
        .open_pdf(path)
        .with_context(|| format!("unable to open {}", path.display()))?;
    controller.start().context("unable to start narration")?;

    while controller.state() != NarrationState::Idle {
        controller.pump_timeout(Duration::from_millis(250));
    }
    info!("Done narrating {}", path.display());
    Ok(())
}
