//! Speech through the `espeak` / `espeak-ng` command.
//!
//! Each utterance is one child process. A watcher thread polls it and fires
//! the completion when it exits; cancelling kills the child and the watcher
//! returns without firing.

use super::{OnComplete, SpeechBackend, Utterance, Voice, VoiceGender};
use crate::{Error, Result};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const NORMAL_WPM: f32 = 175.0;
const NORMAL_PITCH: f32 = 50.0;
const NORMAL_AMPLITUDE: f32 = 100.0;

type ChildSlot = Arc<Mutex<Option<Child>>>;

pub struct EspeakBackend {
    command: String,
    voices: Option<Vec<Voice>>,
    current: Option<ChildSlot>,
}

impl EspeakBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            voices: None,
            current: None,
        }
    }

    /// Returns a backend if `command --version` runs successfully
    pub fn detect(command: &str) -> Option<Self> {
        let status = Command::new(command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Some(Self::new(command)),
            Ok(status) => {
                tracing::debug!("{} --version exited with {}", command, status);
                None
            }
            Err(err) => {
                tracing::debug!("{} not usable: {}", command, err);
                None
            }
        }
    }

    fn list_voices(&self) -> Vec<Voice> {
        match Command::new(&self.command).arg("--voices").output() {
            Ok(output) if output.status.success() => {
                parse_voice_list(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                tracing::debug!("{} --voices exited with {}", self.command, output.status);
                Vec::new()
            }
            Err(err) => {
                tracing::debug!("Failed to list voices: {}", err);
                Vec::new()
            }
        }
    }
}

impl SpeechBackend for EspeakBackend {
    fn name(&self) -> &str {
        &self.command
    }

    fn voices(&mut self) -> Vec<Voice> {
        if self.voices.is_none() {
            self.voices = Some(self.list_voices());
        }
        self.voices.clone().unwrap_or_default()
    }

    fn speak(&mut self, utterance: Utterance, on_complete: OnComplete) -> Result<()> {
        self.cancel();

        let child = Command::new(&self.command)
            .args(speech_args(&utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Speech(format!("failed to run {}: {}", self.command, e)))?;

        let slot: ChildSlot = Arc::new(Mutex::new(Some(child)));
        self.current = Some(Arc::clone(&slot));
        std::thread::spawn(move || watch(slot, on_complete));
        Ok(())
    }

    fn cancel(&mut self) {
        let Some(slot) = self.current.take() else {
            return;
        };
        let child = lock(&slot).take();
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for EspeakBackend {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(slot: &ChildSlot) -> MutexGuard<'_, Option<Child>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn watch(slot: ChildSlot, on_complete: OnComplete) {
    loop {
        {
            let mut guard = lock(&slot);
            // Taken by cancel()
            let Some(child) = guard.as_mut() else {
                return;
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        tracing::debug!("Speech process exited with {}", status);
                    }
                    guard.take();
                    break;
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("Lost track of speech process: {}", err);
                    guard.take();
                    break;
                }
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    on_complete();
}

/// Command-line arguments for one utterance
pub fn speech_args(utterance: &Utterance) -> Vec<String> {
    let wpm = (NORMAL_WPM * utterance.rate).round().clamp(80.0, 450.0) as u32;
    let pitch = (NORMAL_PITCH * utterance.pitch).round().clamp(0.0, 99.0) as u32;
    let amplitude = (NORMAL_AMPLITUDE * utterance.volume).round().clamp(0.0, 200.0) as u32;

    let mut args = vec![
        "-s".to_string(),
        wpm.to_string(),
        "-p".to_string(),
        pitch.to_string(),
        "-a".to_string(),
        amplitude.to_string(),
    ];
    if let Some(voice) = &utterance.voice {
        args.push("-v".to_string());
        args.push(voice.id.clone());
    }
    args.push(utterance.text.clone());
    args
}

/// Parse the table printed by `espeak --voices`
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File          Other Languages
///  5  en-us           --/M      English_(America)  gmw/en-US     (en 8)
/// ```
///
/// Older espeak prints a bare `M`/`F` in the gender column.
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            let gender = match fields[2].rsplit('/').next() {
                Some("F") => Some(VoiceGender::Female),
                Some("M") => Some(VoiceGender::Male),
                _ => None,
            };
            Some(Voice {
                id: fields[4].to_string(),
                name: fields[3].replace('_', " "),
                language: fields[1].to_string(),
                gender,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn utterance(voice: Option<Voice>) -> Utterance {
        Utterance {
            text: "Plank. Hold a straight line.".into(),
            rate: 1.2,
            pitch: 1.0,
            volume: 0.8,
            voice,
        }
    }

    #[test]
    fn test_speech_args_scale_parameters() {
        let args = speech_args(&utterance(None));
        assert_eq!(
            args,
            vec!["-s", "210", "-p", "50", "-a", "80", "Plank. Hold a straight line."]
        );
    }

    #[test]
    fn test_speech_args_include_voice() {
        let voice = Voice {
            id: "gmw/en-US".into(),
            name: "English (America)".into(),
            language: "en-us".into(),
            gender: Some(VoiceGender::Male),
        };
        let args = speech_args(&utterance(Some(voice)));
        assert_eq!(args[6], "-v");
        assert_eq!(args[7], "gmw/en-US");
        assert_eq!(args.last().unwrap(), "Plank. Hold a straight line.");
    }

    #[test]
    fn test_parse_voice_list_ng_format() {
        let output = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-us           --/F      English_(America)  gmw/en-US            (en 8)
";
        let voices = parse_voice_list(output);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[1].language, "en-us");
        assert_eq!(voices[1].name, "English (America)");
        assert_eq!(voices[1].id, "gmw/en-US");
        assert_eq!(voices[1].gender, Some(VoiceGender::Female));
    }

    #[test]
    fn test_parse_voice_list_legacy_format() {
        let output = "\
Pty Language Age/Gender VoiceName       File        Other Langs
 5  en-uk          M  english         default
 2  en-us          F  english-us      en/en-us    (en 3)
 garbage
";
        let voices = parse_voice_list(output);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].gender, Some(VoiceGender::Male));
        assert_eq!(voices[1].id, "en/en-us");
    }

    #[test]
    fn test_detect_missing_command() {
        assert!(EspeakBackend::detect("definitely-not-a-speech-engine-4821").is_none());
    }

    fn counting_completion() -> (Arc<AtomicUsize>, OnComplete) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (
            count,
            Arc::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_process_exit_fires_completion() {
        // `true` ignores its arguments and exits straight away
        let mut backend = EspeakBackend::new("true");
        let (count, done) = counting_completion();

        backend.speak(utterance(None), done).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_kills_process_without_completion() {
        // `yes` runs until killed
        let mut backend = EspeakBackend::new("yes");
        let (count, done) = counting_completion();

        backend.speak(utterance(None), done).unwrap();
        backend.cancel();
        backend.cancel();

        std::thread::sleep(POLL_INTERVAL * 4);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(backend.current.is_none());
    }
}
