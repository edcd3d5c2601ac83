//! Spoken narration.
//!
//! The [`Narrator`] turns prompts into speech through a [`SpeechBackend`] and
//! reports when an utterance has finished. At most one utterance plays at a
//! time: every `speak` cancels the previous one first.
//!
//! Completion rules:
//! - muted: nothing is spoken and the completion is never called
//! - no backend, or the backend fails: the completion is called right away, so
//!   anything waiting on narration still moves forward

#[cfg(any(not(target_os = "linux"), test))]
mod completion;
mod espeak;
#[cfg(not(target_os = "linux"))]
mod platform;

pub use espeak::{parse_voice_list, speech_args, EspeakBackend};
#[cfg(not(target_os = "linux"))]
pub use platform::TtsBackend;

use crate::config::VoiceConfig;
use crate::Result;
use std::sync::Arc;

/// Callback fired when an utterance finishes playing
///
/// May be called from another thread, and more than once if a backend both
/// fails and reports completion; receivers must tolerate duplicates.
pub type OnComplete = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceGender {
    Female,
    Male,
}

impl VoiceGender {
    pub fn label(&self) -> &'static str {
        match self {
            VoiceGender::Female => "female",
            VoiceGender::Male => "male",
        }
    }
}

/// A voice offered by a speech backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    /// Backend-specific identifier used to select the voice
    pub id: String,
    pub name: String,
    /// Language tag, e.g. `en-US`
    pub language: String,
    pub gender: Option<VoiceGender>,
}

/// One request to speak, with fixed delivery parameters
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// Relative speed, 1.0 is the backend's normal rate
    pub rate: f32,
    /// Relative pitch, 1.0 is the backend's normal pitch
    pub pitch: f32,
    /// 0.0 to 1.0
    pub volume: f32,
    /// `None` leaves the platform default voice
    pub voice: Option<Voice>,
}

/// A text-to-speech engine
pub trait SpeechBackend {
    fn name(&self) -> &str;

    /// Voices available right now; may be empty while the engine warms up
    fn voices(&mut self) -> Vec<Voice>;

    /// Start speaking. `on_complete` fires when playback ends on its own,
    /// not when it is cancelled.
    fn speak(&mut self, utterance: Utterance, on_complete: OnComplete) -> Result<()>;

    /// Stop the current utterance, if any
    fn cancel(&mut self);
}

/// Pick the preferred voice for `locale`
///
/// A voice qualifies when its language starts with the locale's primary
/// subtag and either its name contains one of `markers` or its reported
/// gender matches one. Returns `None` to keep the platform default.
pub fn select_voice(voices: &[Voice], locale: &str, markers: &[String]) -> Option<Voice> {
    let language = primary_subtag(locale);
    let markers: Vec<String> = markers.iter().map(|m| m.to_lowercase()).collect();

    voices
        .iter()
        .find(|voice| {
            let name = voice.name.to_lowercase();
            let gender = voice.gender.map(|g| g.label());
            let marked = markers
                .iter()
                .any(|marker| name.contains(marker.as_str()) || gender == Some(marker.as_str()));
            marked && voice.language.to_lowercase().starts_with(&language)
        })
        .cloned()
}

fn primary_subtag(locale: &str) -> String {
    locale
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Speaks prompts through an optional backend
pub struct Narrator {
    backend: Option<Box<dyn SpeechBackend>>,
    config: VoiceConfig,
    locale: String,
    muted: bool,
}

impl Narrator {
    pub fn new(backend: Option<Box<dyn SpeechBackend>>, config: VoiceConfig) -> Self {
        let locale = config.effective_locale();
        Self {
            backend,
            config,
            locale,
            muted: false,
        }
    }

    /// Narrator with no backend: every `speak` completes immediately
    pub fn silent(config: VoiceConfig) -> Self {
        Self::new(None, config)
    }

    /// Use the best speech engine this machine offers
    pub fn detect(config: VoiceConfig) -> Self {
        let backend = platform_backend(&config);
        match &backend {
            Some(backend) => tracing::info!("Narration via {}", backend.name()),
            None => tracing::warn!("No speech engine found, narration disabled"),
        }
        Self::new(backend, config)
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Muting also stops whatever is being spoken
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            self.cancel();
        }
    }

    pub fn speak(&mut self, text: &str, on_complete: OnComplete) {
        if self.muted {
            tracing::debug!("Muted, not speaking: {}", text);
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            on_complete();
            return;
        };

        backend.cancel();
        let voice = select_voice(&backend.voices(), &self.locale, &self.config.gender_markers);
        let utterance = Utterance {
            text: text.to_string(),
            rate: self.config.rate,
            pitch: self.config.pitch,
            volume: self.config.volume,
            voice,
        };

        if let Err(err) = backend.speak(utterance, Arc::clone(&on_complete)) {
            tracing::warn!("Speech failed, continuing without it: {}", err);
            on_complete();
        }
    }

    pub fn cancel(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            backend.cancel();
        }
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(target_os = "linux")]
fn platform_backend(config: &VoiceConfig) -> Option<Box<dyn SpeechBackend>> {
    EspeakBackend::detect(&config.command).map(|b| Box::new(b) as Box<dyn SpeechBackend>)
}

#[cfg(not(target_os = "linux"))]
fn platform_backend(config: &VoiceConfig) -> Option<Box<dyn SpeechBackend>> {
    match TtsBackend::new() {
        Ok(backend) => Some(Box::new(backend)),
        Err(err) => {
            tracing::debug!("Platform speech unavailable ({}), trying {}", err, config.command);
            EspeakBackend::detect(&config.command).map(|b| Box::new(b) as Box<dyn SpeechBackend>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded {
        spoken: Vec<Utterance>,
        cancels: usize,
    }

    struct RecordingBackend {
        log: Arc<Mutex<Recorded>>,
        voices: Vec<Voice>,
        fail: bool,
    }

    impl SpeechBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        fn voices(&mut self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn speak(&mut self, utterance: Utterance, _on_complete: OnComplete) -> Result<()> {
            if self.fail {
                return Err(Error::Speech("device busy".into()));
            }
            self.log.lock().unwrap().spoken.push(utterance);
            Ok(())
        }

        fn cancel(&mut self) {
            self.log.lock().unwrap().cancels += 1;
        }
    }

    fn voice(name: &str, language: &str, gender: Option<VoiceGender>) -> Voice {
        Voice {
            id: name.to_lowercase(),
            name: name.into(),
            language: language.into(),
            gender,
        }
    }

    fn markers() -> Vec<String> {
        VoiceConfig::default().gender_markers
    }

    fn counter() -> (Arc<AtomicUsize>, OnComplete) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (
            count,
            Arc::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    fn narrator_with(fail: bool, voices: Vec<Voice>) -> (Narrator, Arc<Mutex<Recorded>>) {
        let log = Arc::new(Mutex::new(Recorded::default()));
        let backend = RecordingBackend {
            log: Arc::clone(&log),
            voices,
            fail,
        };
        let config = VoiceConfig {
            locale: Some("en-US".into()),
            ..VoiceConfig::default()
        };
        (Narrator::new(Some(Box::new(backend)), config), log)
    }

    #[test]
    fn test_select_voice_prefers_marked_voice_in_locale() {
        let voices = vec![
            voice("Daniel", "en-GB", Some(VoiceGender::Male)),
            voice("Amelie Female", "fr-CA", None),
            voice("Samantha Female", "en-US", None),
        ];

        let picked = select_voice(&voices, "en-AU", &markers()).unwrap();
        assert_eq!(picked.name, "Samantha Female");
    }

    #[test]
    fn test_select_voice_uses_reported_gender() {
        let voices = vec![
            voice("Daniel", "en-GB", Some(VoiceGender::Male)),
            voice("Karen", "en-AU", Some(VoiceGender::Female)),
        ];

        let picked = select_voice(&voices, "en_US", &markers()).unwrap();
        assert_eq!(picked.name, "Karen");
    }

    #[test]
    fn test_select_voice_falls_back_to_default() {
        assert!(select_voice(&[], "en-US", &markers()).is_none());

        let voices = vec![voice("Woman Voice", "de-DE", None)];
        assert!(select_voice(&voices, "en-US", &markers()).is_none());
    }

    #[test]
    fn test_speak_cancels_previous_and_uses_config() {
        let voices = vec![voice("Girl", "en-US", None)];
        let (mut narrator, log) = narrator_with(false, voices);
        let (_, done) = counter();

        narrator.speak("First", Arc::clone(&done));
        narrator.speak("Second", done);

        let log = log.lock().unwrap();
        assert_eq!(log.cancels, 2);
        assert_eq!(log.spoken.len(), 2);
        let last = &log.spoken[1];
        assert_eq!(last.text, "Second");
        assert_eq!(last.rate, 0.9);
        assert_eq!(last.pitch, 1.0);
        assert_eq!(last.volume, 0.8);
        assert_eq!(last.voice.as_ref().unwrap().name, "Girl");
    }

    #[test]
    fn test_muted_speak_never_completes() {
        let (mut narrator, log) = narrator_with(false, vec![]);
        let (count, done) = counter();

        narrator.set_muted(true);
        narrator.speak("Hello", done);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(log.lock().unwrap().spoken.is_empty());
    }

    #[test]
    fn test_missing_backend_completes_immediately() {
        let mut narrator = Narrator::silent(VoiceConfig::default());
        let (count, done) = counter();

        assert!(!narrator.is_available());
        narrator.speak("Hello", done);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backend_failure_completes_immediately() {
        let (mut narrator, _log) = narrator_with(true, vec![]);
        let (count, done) = counter();

        narrator.speak("Hello", done);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_muting_cancels_current_speech() {
        let (mut narrator, log) = narrator_with(false, vec![]);
        let (_, done) = counter();
        narrator.speak("Hello", done);

        narrator.set_muted(true);
        assert_eq!(log.lock().unwrap().cancels, 2);
    }
}
