//! Native speech (SAPI, AVFoundation, ...) through the `tts` crate.

use super::completion::CompletionSlot;
use super::{OnComplete, SpeechBackend, Utterance, Voice, VoiceGender};
use crate::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tts::{Gender, Tts, UtteranceId};

type SharedSlot = Arc<Mutex<CompletionSlot<UtteranceId>>>;

pub struct TtsBackend {
    tts: Tts,
    features: tts::Features,
    voices: Vec<tts::Voice>,
    completions: SharedSlot,
}

fn lock(slot: &SharedSlot) -> MutexGuard<'_, CompletionSlot<UtteranceId>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TtsBackend {
    pub fn new() -> Result<Self> {
        let tts = Tts::default().map_err(|e| Error::Speech(e.to_string()))?;
        let features = tts.supported_features();
        let completions: SharedSlot = Arc::new(Mutex::new(CompletionSlot::new()));

        if features.utterance_callbacks {
            let slot = Arc::clone(&completions);
            tts.on_utterance_end(Some(Box::new(move |id| {
                let done = lock(&slot).finish(id);
                if let Some(done) = done {
                    done();
                }
            })))
            .map_err(|e| Error::Speech(e.to_string()))?;
        }

        let voices = if features.voice {
            tts.voices().unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(Self {
            tts,
            features,
            voices,
            completions,
        })
    }

    fn apply_parameters(&mut self, utterance: &Utterance) -> Result<()> {
        let speech_err = |e: tts::Error| Error::Speech(e.to_string());

        if self.features.rate {
            let rate = (self.tts.normal_rate() * utterance.rate)
                .clamp(self.tts.min_rate(), self.tts.max_rate());
            self.tts.set_rate(rate).map_err(speech_err)?;
        }
        if self.features.pitch {
            let pitch = (self.tts.normal_pitch() * utterance.pitch)
                .clamp(self.tts.min_pitch(), self.tts.max_pitch());
            self.tts.set_pitch(pitch).map_err(speech_err)?;
        }
        if self.features.volume {
            let volume = (self.tts.max_volume() * utterance.volume)
                .clamp(self.tts.min_volume(), self.tts.max_volume());
            self.tts.set_volume(volume).map_err(speech_err)?;
        }
        if self.features.voice {
            let wanted = utterance
                .voice
                .as_ref()
                .and_then(|v| self.voices.iter().find(|candidate| candidate.id() == v.id));
            if let Some(voice) = wanted {
                self.tts.set_voice(voice).map_err(speech_err)?;
            }
        }
        Ok(())
    }
}

impl SpeechBackend for TtsBackend {
    fn name(&self) -> &str {
        "platform speech"
    }

    fn voices(&mut self) -> Vec<Voice> {
        self.voices
            .iter()
            .map(|voice| Voice {
                id: voice.id(),
                name: voice.name(),
                language: voice.language().to_string(),
                gender: voice.gender().map(|gender| match gender {
                    Gender::Female => VoiceGender::Female,
                    Gender::Male => VoiceGender::Male,
                }),
            })
            .collect()
    }

    fn speak(&mut self, utterance: Utterance, on_complete: OnComplete) -> Result<()> {
        self.apply_parameters(&utterance)?;
        lock(&self.completions).clear();

        let id = self
            .tts
            .speak(utterance.text, true)
            .map_err(|e| Error::Speech(e.to_string()))?;

        // Without end callbacks there is no way to wait; let the caller move on
        if !self.features.utterance_callbacks {
            on_complete();
            return Ok(());
        }

        // The interrupted utterance may still report its end; only `id` counts
        let ready = lock(&self.completions).arm(id, on_complete);
        if let Some(done) = ready {
            done();
        }
        Ok(())
    }

    fn cancel(&mut self) {
        lock(&self.completions).clear();
        if self.features.stop {
            let _ = self.tts.stop();
        }
    }
}
