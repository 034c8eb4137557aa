use std::{env, fs, path::PathBuf, str::FromStr};

use anyhow::{bail, Context, Result};

use crate::voices::{region_from_locale, supported_language};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Piper,
    Silent,
}

impl FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "piper" => Ok(Self::Piper),
            "silent" | "clock" => Ok(Self::Silent),
            other => bail!("unknown speech engine '{other}' (expected 'piper' or 'silent')"),
        }
    }
}

/// Reader settings, read from `READER_*` environment variables.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub runtime_dir: PathBuf,
    pub voices_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub engine: EngineKind,
    pub language: Option<String>,
    pub voice: Option<String>,
    pub rate: Option<f32>,
    pub piper_command: Option<String>,
    /// Region of the user's locale, used to pick the default language.
    pub region: Option<String>,
}

impl ReaderConfig {
    pub fn from_env() -> Result<Self> {
        let runtime_dir = path_var("READER_RUNTIME_DIR", "runtime");
        let voices_dir = path_var("READER_VOICES_DIR", "assets/voices");
        let output_dir = path_var("READER_OUTPUT_DIR", "runtime/output");
        let log_dir = path_var("READER_LOG_DIR", "logs");

        let engine = match non_empty_var("READER_ENGINE") {
            Some(value) => value.parse().context("invalid READER_ENGINE")?,
            None => EngineKind::Piper,
        };
        let rate = non_empty_var("READER_RATE")
            .map(|value| {
                value
                    .parse::<f32>()
                    .with_context(|| format!("invalid READER_RATE '{value}'"))
            })
            .transpose()?;
        let language = non_empty_var("READER_LANGUAGE")
            .map(|value| match supported_language(&value) {
                Some(language) => Ok(language.to_string()),
                None => bail!("unsupported READER_LANGUAGE '{value}'"),
            })
            .transpose()?;

        fs::create_dir_all(&output_dir).with_context(|| {
            format!("unable to create output directory {}", output_dir.display())
        })?;

        let region = ["LC_ALL", "LANG"]
            .iter()
            .filter_map(|key| non_empty_var(key))
            .find_map(|locale| region_from_locale(&locale));

        Ok(Self {
            runtime_dir,
            voices_dir,
            output_dir,
            log_dir,
            engine,
            language,
            voice: non_empty_var("READER_VOICE"),
            rate,
            piper_command: non_empty_var("READER_PIPER_COMMAND"),
            region,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn path_var(key: &str, default: &str) -> PathBuf {
    non_empty_var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn scoped_env(key: &'static str, value: &str) -> EnvGuard {
        let previous = env::var(key).ok();
        env::set_var(key, value);
        EnvGuard { key, previous }
    }

    #[test]
    #[serial]
    fn reads_overrides_and_creates_output_dir() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out");
        let _output = scoped_env("READER_OUTPUT_DIR", output.to_str().unwrap());
        let _engine = scoped_env("READER_ENGINE", "Silent");
        let _rate = scoped_env("READER_RATE", "0.45");
        let _voice = scoped_env("READER_VOICE", "pt_BR-faber-medium");
        let _lang = scoped_env("LC_ALL", "pt_BR.UTF-8");
        let _language = scoped_env("READER_LANGUAGE", "el_gr");

        let config = ReaderConfig::from_env().unwrap();
        assert!(output.is_dir());
        assert_eq!(config.output_dir, output);
        assert_eq!(config.engine, EngineKind::Silent);
        assert_eq!(config.rate, Some(0.45));
        assert_eq!(config.voice.as_deref(), Some("pt_BR-faber-medium"));
        assert_eq!(config.region.as_deref(), Some("BR"));
        assert_eq!(config.language.as_deref(), Some("el-GR"));
    }

    #[test]
    #[serial]
    fn rejects_unsupported_language() {
        let temp = TempDir::new().unwrap();
        let _output = scoped_env("READER_OUTPUT_DIR", temp.path().to_str().unwrap());
        let _language = scoped_env("READER_LANGUAGE", "klingon");
        let err = ReaderConfig::from_env().unwrap_err();
        assert!(format!("{err:#}").contains("klingon"));
    }

    #[test]
    #[serial]
    fn rejects_unknown_engine() {
        let temp = TempDir::new().unwrap();
        let _output = scoped_env("READER_OUTPUT_DIR", temp.path().to_str().unwrap());
        let _engine = scoped_env("READER_ENGINE", "espeak");
        let err = ReaderConfig::from_env().unwrap_err();
        assert!(format!("{err:#}").contains("espeak"));
    }

    #[test]
    #[serial]
    fn rejects_malformed_rate() {
        let temp = TempDir::new().unwrap();
        let _output = scoped_env("READER_OUTPUT_DIR", temp.path().to_str().unwrap());
        let _rate = scoped_env("READER_RATE", "fast");
        assert!(ReaderConfig::from_env().is_err());
    }
}
