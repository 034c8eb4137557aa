//! Voice catalog capability and the language/voice/rate preferences built on
//! top of it.

pub mod piper;

pub use piper::PiperVoiceLibrary;

use serde::Serialize;

use crate::speech::SpeechRate;

pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Languages offered to the user when picking a narration voice.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "af-ZA", "ar-SA", "bn-IN", "ca-ES", "cs-CZ", "da-DK", "de-DE", "el-GR", "en-AU", "en-GB",
    "en-IE", "en-IN", "en-US", "en-ZA", "es-ES", "es-MX", "es-US", "fi-FI", "fr-CA", "fr-FR",
    "he-IL", "hi-IN", "hu-HU", "id-ID", "it-IT", "ja-JP", "ko-KR", "ms-MY", "nb-NO", "nl-BE",
    "nl-NL", "pl-PL", "pt-BR", "pt-PT", "ro-RO", "ru-RU", "sk-SK", "sv-SE", "ta-IN", "te-IN",
    "th-TH", "tr-TR", "uk-UA", "vi-VN", "zh-CN", "zh-HK", "zh-TW",
];

/// Bounds and step of the user-facing rate control.
pub const RATE_MIN: f32 = 0.3;
pub const RATE_MAX: f32 = 0.6;
const RATE_STEP: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceDescriptor {
    pub identifier: String,
    pub name: String,
    /// BCP 47 style tag such as `pt-BR`.
    pub language: String,
    pub quality: Option<String>,
}

/// Something that can enumerate the voices installed on this machine.
pub trait VoiceCatalog: Send + Sync {
    fn list_voices(&self) -> Vec<VoiceDescriptor>;
}

/// Extract the region part of a locale string such as `pt_BR.UTF-8`.
pub fn region_from_locale(locale: &str) -> Option<String> {
    let tag = locale.split(['.', '@']).next()?;
    let region = tag.split(['_', '-']).nth(1)?;
    if region.is_empty() {
        None
    } else {
        Some(region.to_ascii_uppercase())
    }
}

/// Canonical form of `tag` if it names a supported language. Accepts `_` as
/// separator and any letter case, so `pt_br` yields `pt-BR`.
pub fn supported_language(tag: &str) -> Option<&'static str> {
    let normalized = tag.trim().replace('_', "-");
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|supported| supported.eq_ignore_ascii_case(&normalized))
}

/// The narration settings the user can change between utterances.
#[derive(Debug, Clone, PartialEq)]
pub struct VoicePreferences {
    language: String,
    voice: Option<String>,
    rate: SpeechRate,
}

impl Default for VoicePreferences {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            voice: None,
            rate: SpeechRate::default(),
        }
    }
}

impl VoicePreferences {
    /// Pick the first installed language matching the device region and the
    /// first voice of that language.
    pub fn detect(catalog: &dyn VoiceCatalog, region: Option<&str>) -> Self {
        let suffix = region.unwrap_or_default();
        let language = catalog
            .list_voices()
            .into_iter()
            .find(|voice| voice.language.ends_with(suffix))
            .map(|voice| voice.language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let mut preferences = Self::default();
        preferences.set_language(catalog, &language);
        preferences
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn rate(&self) -> SpeechRate {
        self.rate
    }

    /// Switch language and select the first voice available for it.
    pub fn set_language(&mut self, catalog: &dyn VoiceCatalog, language: &str) {
        self.language = language.to_string();
        self.voice = voices_for_language(catalog, language)
            .into_iter()
            .next()
            .map(|voice| voice.identifier);
    }

    pub fn select_voice(&mut self, identifier: Option<String>) {
        self.voice = identifier;
    }

    /// Clamp to the rate control's bounds and snap to its step.
    pub fn set_rate(&mut self, rate: f32) {
        let clamped = if rate.is_finite() {
            rate.clamp(RATE_MIN, RATE_MAX)
        } else {
            SpeechRate::default().value()
        };
        let snapped = (clamped / RATE_STEP).round() * RATE_STEP;
        self.rate = SpeechRate::new(snapped.clamp(RATE_MIN, RATE_MAX));
    }

    /// Descriptor of the selected voice, or `None` when nothing is selected or
    /// the identifier is not installed, in which case engines use their
    /// default voice.
    pub fn resolve_voice(&self, catalog: &dyn VoiceCatalog) -> Option<VoiceDescriptor> {
        let identifier = self.voice.as_deref()?;
        catalog
            .list_voices()
            .into_iter()
            .find(|voice| voice.identifier == identifier)
    }
}

pub fn voices_for_language(catalog: &dyn VoiceCatalog, language: &str) -> Vec<VoiceDescriptor> {
    catalog
        .list_voices()
        .into_iter()
        .filter(|voice| voice.language == language)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub struct StaticCatalog(pub Vec<VoiceDescriptor>);

    impl VoiceCatalog for StaticCatalog {
        fn list_voices(&self) -> Vec<VoiceDescriptor> {
            self.0.clone()
        }
    }

    pub fn voice(identifier: &str, language: &str) -> VoiceDescriptor {
        VoiceDescriptor {
            identifier: identifier.into(),
            name: identifier.into(),
            language: language.into(),
            quality: None,
        }
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog(vec![
            voice("luciana", "pt-BR"),
            voice("samantha", "en-US"),
            voice("daniel", "en-GB"),
            voice("felipe", "pt-BR"),
        ])
    }

    #[test]
    fn canonicalizes_supported_languages() {
        assert_eq!(supported_language("pt_br"), Some("pt-BR"));
        assert_eq!(supported_language(" EL-gr "), Some("el-GR"));
        assert_eq!(supported_language("xx-YY"), None);
        assert_eq!(supported_language("pt"), None);
    }

    #[test]
    fn detects_language_from_region() {
        let preferences = VoicePreferences::detect(&catalog(), Some("GB"));
        assert_eq!(preferences.language(), "en-GB");
        assert_eq!(preferences.voice(), Some("daniel"));
    }

    #[test]
    fn falls_back_to_default_language() {
        let preferences = VoicePreferences::detect(&catalog(), Some("JP"));
        assert_eq!(preferences.language(), DEFAULT_LANGUAGE);
        assert_eq!(preferences.voice(), Some("samantha"));

        let empty = VoicePreferences::detect(&StaticCatalog(Vec::new()), Some("BR"));
        assert_eq!(empty.language(), DEFAULT_LANGUAGE);
        assert_eq!(empty.voice(), None);
    }

    #[test]
    fn changing_language_selects_its_first_voice() {
        let catalog = catalog();
        let mut preferences = VoicePreferences::detect(&catalog, Some("US"));
        preferences.set_language(&catalog, "pt-BR");
        assert_eq!(preferences.voice(), Some("luciana"));
        assert_eq!(voices_for_language(&catalog, "pt-BR").len(), 2);
    }

    #[test]
    fn unknown_voice_resolves_to_engine_default() {
        let catalog = catalog();
        let mut preferences = VoicePreferences::default();
        preferences.select_voice(Some("felipe".into()));
        assert_eq!(
            preferences.resolve_voice(&catalog).map(|v| v.identifier),
            Some("felipe".to_string())
        );
        preferences.select_voice(Some("ghost".into()));
        assert_eq!(preferences.resolve_voice(&catalog), None);
    }

    #[test]
    fn rate_is_clamped_and_snapped() {
        let mut preferences = VoicePreferences::default();
        assert!((preferences.rate().value() - 0.5).abs() < f32::EPSILON);

        preferences.set_rate(0.93);
        assert!((preferences.rate().value() - RATE_MAX).abs() < 1e-6);
        preferences.set_rate(0.1);
        assert!((preferences.rate().value() - RATE_MIN).abs() < 1e-6);
        preferences.set_rate(0.43);
        assert!((preferences.rate().value() - 0.45).abs() < 1e-6);
    }

    #[test]
    fn parses_locale_regions() {
        assert_eq!(region_from_locale("pt_BR.UTF-8").as_deref(), Some("BR"));
        assert_eq!(region_from_locale("en-gb").as_deref(), Some("GB"));
        assert_eq!(region_from_locale("C"), None);
        assert_eq!(region_from_locale("C.UTF-8"), None);
    }
}
