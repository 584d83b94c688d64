//! Live speech synthesis: utterances, voice inventory, and the heuristic
//! voice picker.
//!
//! Voice selection is a prioritized list of matchers evaluated top to
//! bottom against the platform's reported voices, so the priority order
//! is testable on its own. The platform engine sits behind
//! [`VoiceProvider`]; the shipped backend drives an `espeak-ng`
//! subprocess.

use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tracing::{debug, info, warn};

/// Platform-reported quality tier for a synthesis voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoiceQuality {
    Standard,
    Enhanced,
    Premium,
}

/// A voice reported by the synthesis backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthVoice {
    pub name: String,
    /// BCP-47-ish tag, e.g. "en-GB".
    pub language: String,
    pub quality: VoiceQuality,
    pub is_default: bool,
}

/// What the deployment asked for.
#[derive(Debug, Clone)]
pub struct VoicePreferences {
    /// Explicit voice name; empty means "pick heuristically".
    pub requested: Option<String>,
    pub language: String,
}

/// Name prefixes of the platform "premium assistant" voices.
const ASSISTANT_VOICE_PREFIXES: &[&str] = &["Siri", "Ava"];

fn normalize_tag(tag: &str) -> String {
    tag.replace('_', "-").to_lowercase()
}

fn base_language(tag: &str) -> String {
    normalize_tag(tag)
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn language_matches(voice: &SynthVoice, target: &str) -> bool {
    normalize_tag(&voice.language) == normalize_tag(target)
}

fn base_language_matches(voice: &SynthVoice, target: &str) -> bool {
    base_language(&voice.language) == base_language(target)
}

/// One tier of the voice-selection heuristic.
pub struct VoiceMatcher {
    pub name: &'static str,
    pub matches: fn(&SynthVoice, &VoicePreferences) -> bool,
}

/// Ordered matcher tiers: requested name, premium assistant voices in the
/// target language, enhanced local voices in the target language, any
/// voice sharing the base language code, then the platform default. No
/// match at all means the backend speaks with whatever it has.
pub const VOICE_MATCHERS: &[VoiceMatcher] = &[
    VoiceMatcher {
        name: "requested-name",
        matches: |voice, prefs| prefs.requested.as_deref() == Some(voice.name.as_str()),
    },
    VoiceMatcher {
        name: "assistant-prefix",
        matches: |voice, prefs| {
            language_matches(voice, &prefs.language)
                && ASSISTANT_VOICE_PREFIXES
                    .iter()
                    .any(|prefix| voice.name.starts_with(prefix))
        },
    },
    VoiceMatcher {
        name: "enhanced-local",
        matches: |voice, prefs| {
            language_matches(voice, &prefs.language) && voice.quality >= VoiceQuality::Enhanced
        },
    },
    VoiceMatcher {
        name: "base-language",
        matches: |voice, prefs| base_language_matches(voice, &prefs.language),
    },
    VoiceMatcher {
        name: "platform-default",
        matches: |voice, _| voice.is_default,
    },
];

/// Pick a voice by walking the matcher tiers in order. Returns the tier
/// name alongside the voice for logging.
pub fn select_voice<'a>(
    voices: &'a [SynthVoice],
    prefs: &VoicePreferences,
) -> Option<(&'static str, &'a SynthVoice)> {
    for matcher in VOICE_MATCHERS {
        if let Some(voice) = voices.iter().find(|v| (matcher.matches)(v, prefs)) {
            return Some((matcher.name, voice));
        }
    }
    None
}

/// A single synthesis request. Rate defaults slightly below normal —
/// tuned for comprehension rather than throughput.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub ssml: bool,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ssml: false,
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
        }
    }

    /// SSML utterance that spells characters out one by one, so letter
    /// names are rendered exactly ("b" is "bee", not a mumble).
    pub fn spell_out(characters: &str) -> Self {
        let text = format!(
            "<speak><say-as interpret-as=\"characters\">{}</say-as></speak>",
            characters.to_uppercase()
        );
        Self {
            ssml: true,
            ..Self::text(text)
        }
    }
}

/// Seam to the platform synthesis engine.
pub trait VoiceProvider: Send + Sync {
    /// Voices reported so far. May be empty until the backend finishes
    /// its first inventory pass.
    fn voices(&self) -> Vec<SynthVoice>;

    fn voices_ready(&self) -> bool;

    /// Speak an utterance, blocking until done or cancelled. `voice` is
    /// `None` when selection fell through to the platform default.
    fn speak(
        &self,
        utterance: &Utterance,
        voice: Option<&SynthVoice>,
        cancel: &AtomicBool,
    ) -> Result<(), String>;
}

/// Wait for the provider's voice inventory with a bounded timeout, then
/// return whatever is available — possibly nothing, never an error.
pub async fn wait_for_voices(provider: &dyn VoiceProvider, timeout: Duration) -> Vec<SynthVoice> {
    let deadline = tokio::time::Instant::now() + timeout;
    while !provider.voices_ready() {
        if tokio::time::Instant::now() >= deadline {
            warn!("Voice inventory not ready after {timeout:?}, continuing without it");
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    provider.voices()
}

/// `espeak-ng` subprocess backend.
///
/// The inventory is loaded once on a background thread from
/// `espeak-ng --voices=<base-lang>`; speaking spawns one process per
/// utterance and polls it against the cancel flag, killing on cancel.
pub struct EspeakProvider {
    language: String,
    inventory: Arc<OnceLock<Vec<SynthVoice>>>,
    children: Mutex<()>,
}

impl EspeakProvider {
    pub fn new(language: &str) -> Self {
        let provider = Self {
            language: language.to_string(),
            inventory: Arc::new(OnceLock::new()),
            children: Mutex::new(()),
        };

        let inventory = provider.inventory.clone();
        let base = base_language(language);
        std::thread::spawn(move || {
            let voices = load_espeak_voices(&base);
            info!("espeak-ng reported {} voices for {base}", voices.len());
            let _ = inventory.set(voices);
        });

        provider
    }
}

impl VoiceProvider for EspeakProvider {
    fn voices(&self) -> Vec<SynthVoice> {
        self.inventory.get().cloned().unwrap_or_default()
    }

    fn voices_ready(&self) -> bool {
        self.inventory.get().is_some()
    }

    fn speak(
        &self,
        utterance: &Utterance,
        voice: Option<&SynthVoice>,
        cancel: &AtomicBool,
    ) -> Result<(), String> {
        // Serialize subprocess spawns; the gateway queue already enforces
        // one utterance at a time, this guards direct callers.
        let _guard = self.children.lock().unwrap();

        let voice_arg = voice
            .map(|v| v.name.clone())
            .unwrap_or_else(|| base_language(&self.language));

        // espeak-ng speaks ~175 wpm at its default rate.
        let words_per_minute = (utterance.rate * 175.0).round() as i64;
        let pitch = (utterance.pitch * 50.0).clamp(0.0, 99.0).round() as i64;
        let amplitude = (utterance.volume * 100.0).clamp(0.0, 200.0).round() as i64;

        let mut command = Command::new("espeak-ng");
        command
            .arg("-v")
            .arg(&voice_arg)
            .arg("-s")
            .arg(words_per_minute.to_string())
            .arg("-p")
            .arg(pitch.to_string())
            .arg("-a")
            .arg(amplitude.to_string());
        if utterance.ssml {
            command.arg("-m");
        }
        command.arg(&utterance.text);
        command.stdout(Stdio::null()).stderr(Stdio::null());

        let mut child = command
            .spawn()
            .map_err(|e| format!("failed to spawn espeak-ng: {e}"))?;

        loop {
            if cancel.load(Ordering::Relaxed) {
                let _ = child.kill();
                let _ = child.wait();
                debug!("Utterance cancelled");
                return Ok(());
            }

            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => return Err(format!("espeak-ng exited with {status}")),
                Ok(None) => std::thread::sleep(Duration::from_millis(50)),
                Err(e) => return Err(format!("failed to wait for espeak-ng: {e}")),
            }
        }
    }
}

/// Parse `espeak-ng --voices=<lang>` output into the voice model.
/// Columns: Pty Language Age/Gender VoiceName File.
fn load_espeak_voices(base_lang: &str) -> Vec<SynthVoice> {
    let output = match Command::new("espeak-ng")
        .arg(format!("--voices={base_lang}"))
        .output()
    {
        Ok(o) if o.status.success() => o,
        Ok(o) => {
            warn!("espeak-ng --voices exited with {}", o.status);
            return Vec::new();
        }
        Err(e) => {
            warn!("espeak-ng unavailable: {e}");
            return Vec::new();
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .skip(1) // header row
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            let language = fields[1].to_string();
            let name = fields[3].to_string();
            Some(SynthVoice {
                is_default: language == base_lang,
                name,
                language,
                quality: VoiceQuality::Standard,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, language: &str, quality: VoiceQuality) -> SynthVoice {
        SynthVoice {
            name: name.into(),
            language: language.into(),
            quality,
            is_default: false,
        }
    }

    fn prefs(requested: Option<&str>, language: &str) -> VoicePreferences {
        VoicePreferences {
            requested: requested.map(String::from),
            language: language.into(),
        }
    }

    #[test]
    fn test_requested_name_wins_over_everything() {
        let voices = vec![
            voice("Siri Voice 2", "en-GB", VoiceQuality::Premium),
            voice("Kate", "en-GB", VoiceQuality::Standard),
        ];
        let (tier, picked) = select_voice(&voices, &prefs(Some("Kate"), "en-GB")).unwrap();
        assert_eq!(tier, "requested-name");
        assert_eq!(picked.name, "Kate");
    }

    #[test]
    fn test_assistant_prefix_filtered_to_language() {
        let voices = vec![
            voice("Siri Voice 1", "en-US", VoiceQuality::Premium),
            voice("Siri Voice 2", "en-GB", VoiceQuality::Premium),
            voice("Kate (Enhanced)", "en-GB", VoiceQuality::Enhanced),
        ];
        let (tier, picked) = select_voice(&voices, &prefs(None, "en-GB")).unwrap();
        assert_eq!(tier, "assistant-prefix");
        assert_eq!(picked.name, "Siri Voice 2");
    }

    #[test]
    fn test_enhanced_local_before_base_language() {
        let voices = vec![
            voice("Fred", "en-US", VoiceQuality::Standard),
            voice("Kate (Enhanced)", "en-GB", VoiceQuality::Enhanced),
        ];
        let (tier, picked) = select_voice(&voices, &prefs(None, "en-GB")).unwrap();
        assert_eq!(tier, "enhanced-local");
        assert_eq!(picked.name, "Kate (Enhanced)");
    }

    #[test]
    fn test_base_language_fallback() {
        let voices = vec![
            voice("Amelie", "fr-FR", VoiceQuality::Standard),
            voice("Fred", "en-US", VoiceQuality::Standard),
        ];
        let (tier, picked) = select_voice(&voices, &prefs(None, "en-GB")).unwrap();
        assert_eq!(tier, "base-language");
        assert_eq!(picked.name, "Fred");
    }

    #[test]
    fn test_platform_default_is_last_resort() {
        let mut amelie = voice("Amelie", "fr-FR", VoiceQuality::Standard);
        amelie.is_default = true;
        let voices = [amelie];
        let (tier, picked) = select_voice(&voices, &prefs(None, "en-GB")).unwrap();
        assert_eq!(tier, "platform-default");
        assert_eq!(picked.name, "Amelie");
    }

    #[test]
    fn test_no_match_falls_through() {
        let voices = vec![voice("Amelie", "fr-FR", VoiceQuality::Standard)];
        assert!(select_voice(&voices, &prefs(None, "en-GB")).is_none());
    }

    #[test]
    fn test_language_tag_normalization() {
        let voices = vec![voice("Kate (Enhanced)", "en_gb", VoiceQuality::Enhanced)];
        let (tier, _) = select_voice(&voices, &prefs(None, "en-GB")).unwrap();
        assert_eq!(tier, "enhanced-local");
    }

    #[test]
    fn test_spell_out_emits_characters_ssml() {
        let utterance = Utterance::spell_out("b");
        assert!(utterance.ssml);
        assert_eq!(
            utterance.text,
            "<speak><say-as interpret-as=\"characters\">B</say-as></speak>"
        );
    }

    #[test]
    fn test_utterance_defaults_tuned_for_comprehension() {
        let utterance = Utterance::text("Toilet");
        assert!(utterance.rate < 1.0);
        assert_eq!(utterance.volume, 1.0);
        assert!(!utterance.ssml);
    }

    #[tokio::test]
    async fn test_wait_for_voices_times_out_to_empty() {
        struct NeverReady;
        impl VoiceProvider for NeverReady {
            fn voices(&self) -> Vec<SynthVoice> {
                Vec::new()
            }
            fn voices_ready(&self) -> bool {
                false
            }
            fn speak(
                &self,
                _utterance: &Utterance,
                _voice: Option<&SynthVoice>,
                _cancel: &AtomicBool,
            ) -> Result<(), String> {
                Ok(())
            }
        }

        let voices = wait_for_voices(&NeverReady, Duration::from_millis(50)).await;
        assert!(voices.is_empty());
    }
}
