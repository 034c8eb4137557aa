use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

use super::{VoiceCatalog, VoiceDescriptor};

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice '{0}' not found")]
    NotFound(String),
    #[error("no Piper voices installed under {0}")]
    NoneInstalled(PathBuf),
}

/// An installed Piper voice model.
#[derive(Debug, Clone)]
pub struct PiperVoice {
    pub descriptor: VoiceDescriptor,
    pub model_path: PathBuf,
    pub config_path: Option<PathBuf>,
}

/// Piper voice models (`*.onnx`) discovered under a directory.
#[derive(Default)]
pub struct PiperVoiceLibrary {
    base_dir: PathBuf,
    voices: RwLock<HashMap<String, PiperVoice>>,
}

impl PiperVoiceLibrary {
    pub fn new(base_dir: PathBuf) -> Self {
        let library = Self {
            base_dir,
            voices: RwLock::new(HashMap::new()),
        };
        library.refresh();
        library
    }

    pub fn refresh(&self) {
        let mut discovered = HashMap::new();
        if self.base_dir.exists() {
            for entry in WalkDir::new(&self.base_dir)
                .into_iter()
                .filter_map(Result::ok)
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("onnx") {
                    continue;
                }
                if let Some(voice) = build_voice(path) {
                    discovered.insert(voice.descriptor.identifier.clone(), voice);
                }
            }
        }
        log::info!(
            "Discovered {} Piper voices under {}",
            discovered.len(),
            self.base_dir.display()
        );
        *self.voices.write() = discovered;
    }

    pub fn get(&self, identifier: &str) -> Result<PiperVoice, VoiceError> {
        self.voices
            .read()
            .get(identifier)
            .cloned()
            .ok_or_else(|| VoiceError::NotFound(identifier.to_string()))
    }

    /// The voice used when no voice is selected: the first one by label.
    pub fn default_voice(&self) -> Result<PiperVoice, VoiceError> {
        let voices = self.voices.read();
        voices
            .values()
            .min_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name))
            .cloned()
            .ok_or_else(|| VoiceError::NoneInstalled(self.base_dir.clone()))
    }
}

impl VoiceCatalog for PiperVoiceLibrary {
    fn list_voices(&self) -> Vec<VoiceDescriptor> {
        let mut voices: Vec<_> = self
            .voices
            .read()
            .values()
            .map(|voice| voice.descriptor.clone())
            .collect();
        voices.sort_by(|a, b| a.name.cmp(&b.name));
        voices
    }
}

fn build_voice(path: &Path) -> Option<PiperVoice> {
    let id = path.file_stem()?.to_string_lossy().to_string();
    let metadata_path = metadata_path_for(path);
    let metadata = metadata_path
        .as_ref()
        .and_then(|path| match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str::<Value>(&contents)
                .map_err(|err| {
                    log::warn!("Failed to parse metadata {}: {err}", path.display());
                    err
                })
                .ok(),
            Err(err) => {
                log::warn!("Failed to read metadata {}: {err}", path.display());
                None
            }
        });

    let language = metadata.as_ref().and_then(|value| value.get("language"));

    let name = language
        .and_then(|lang| lang.get("name_native").or_else(|| lang.get("name")))
        .and_then(Value::as_str)
        .map(|lang| format!("{lang} · {id}"))
        .unwrap_or_else(|| id.clone());

    // Piper writes codes as `pt_BR`; fall back to the model name prefix.
    let code = language
        .and_then(|lang| lang.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| id.split('-').next().map(str::to_string))
        .unwrap_or_default()
        .replace('_', "-");

    let quality = metadata
        .as_ref()
        .and_then(|value| value.get("audio"))
        .and_then(|audio| audio.get("quality"))
        .and_then(Value::as_str)
        .map(|s| s.to_string());

    Some(PiperVoice {
        descriptor: VoiceDescriptor {
            identifier: id,
            name,
            language: code,
            quality,
        },
        model_path: path.to_path_buf(),
        config_path: metadata_path,
    })
}

fn metadata_path_for(path: &Path) -> Option<PathBuf> {
    let mut metadata_path = path.to_path_buf();
    metadata_path.set_extension("onnx.json");
    if metadata_path.exists() {
        Some(metadata_path)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn discovers_voices_in_nested_directories() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("pt/pt_BR-faber-medium.onnx").touch().unwrap();
        temp.child("en/en_US-amy-low.onnx").touch().unwrap();
        temp.child("en/README.md").touch().unwrap();

        let library = PiperVoiceLibrary::new(temp.path().to_path_buf());
        let voices = library.list_voices();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].identifier, "en_US-amy-low");
        assert_eq!(voices[0].language, "en-US");
        assert!(library.get("pt_BR-faber-medium").is_ok());
        assert!(matches!(library.get("missing"), Err(VoiceError::NotFound(_))));
    }

    #[test]
    fn reads_metadata_next_to_model() {
        let temp = assert_fs::TempDir::new().unwrap();
        let model = temp.child("demo.onnx");
        model.touch().unwrap();
        temp.child("demo.onnx.json")
            .write_str(
                r#"{"language":{"code":"es_ES","name_native":"Español"},"audio":{"quality":"high"}}"#,
            )
            .unwrap();

        let voice = build_voice(model.path()).unwrap();
        assert!(voice.descriptor.name.contains("Español"));
        assert_eq!(voice.descriptor.language, "es-ES");
        assert_eq!(voice.descriptor.quality.as_deref(), Some("high"));
        assert!(voice.config_path.is_some());
    }

    #[test]
    fn empty_library_has_no_default_voice() {
        let temp = assert_fs::TempDir::new().unwrap();
        let library = PiperVoiceLibrary::new(temp.path().to_path_buf());
        assert!(matches!(
            library.default_voice(),
            Err(VoiceError::NoneInstalled(_))
        ));
    }
}
