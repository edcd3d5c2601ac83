//! Transition chime.
//!
//! A single sine tone with a linear attack and a linear decay, rendered once
//! into a sample buffer and handed to a [`ToneBackend`] on every ring. Ringing
//! never blocks and never fails: a missing output device only means silence.

use crate::config::ChimeConfig;
use crate::Result;
use std::f32::consts::TAU;
use std::sync::Arc;

/// Plays mono sample buffers
pub trait ToneBackend {
    /// Start playback and return without waiting for it to finish
    fn play(&self, samples: Arc<[f32]>, sample_rate: u32) -> Result<()>;
}

/// Render the chime: sine at `frequency_hz`, ramping 0 → `peak_gain` over
/// `attack_seconds`, then back to 0 at `duration_seconds`
pub fn render_chime(config: &ChimeConfig) -> Vec<f32> {
    let rate = config.sample_rate as f32;
    let total = (config.duration_seconds * rate).round() as usize;
    let decay = (config.duration_seconds - config.attack_seconds).max(f32::EPSILON);

    (0..total)
        .map(|i| {
            let t = i as f32 / rate;
            let envelope = if t < config.attack_seconds {
                config.peak_gain * t / config.attack_seconds
            } else {
                config.peak_gain * (config.duration_seconds - t) / decay
            };
            envelope.max(0.0) * (TAU * config.frequency_hz * t).sin()
        })
        .collect()
}

pub struct Chime {
    backend: Option<Box<dyn ToneBackend>>,
    samples: Arc<[f32]>,
    sample_rate: u32,
    muted: bool,
}

impl Chime {
    pub fn new(backend: Option<Box<dyn ToneBackend>>, config: &ChimeConfig) -> Self {
        Self {
            backend,
            samples: render_chime(config).into(),
            sample_rate: config.sample_rate,
            muted: false,
        }
    }

    /// Chime with no output device; every ring is a no-op
    pub fn silent(config: &ChimeConfig) -> Self {
        Self::new(None, config)
    }

    /// Use the default audio output if this build has one
    pub fn detect(config: &ChimeConfig) -> Self {
        let backend = output_backend();
        if backend.is_none() {
            tracing::warn!("No audio output available, chimes disabled");
        }
        Self::new(backend, config)
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn ring(&self) {
        if self.muted {
            return;
        }
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(err) = backend.play(Arc::clone(&self.samples), self.sample_rate) {
            tracing::debug!("Chime playback failed: {}", err);
        }
    }
}

#[cfg(feature = "audio")]
fn output_backend() -> Option<Box<dyn ToneBackend>> {
    rodio_output::RodioBackend::detect().map(|b| Box::new(b) as Box<dyn ToneBackend>)
}

#[cfg(not(feature = "audio"))]
fn output_backend() -> Option<Box<dyn ToneBackend>> {
    tracing::debug!("Built without the `audio` feature");
    None
}

#[cfg(feature = "audio")]
mod rodio_output {
    use super::ToneBackend;
    use crate::{Error, Result};
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, Sink};
    use std::sync::Arc;

    /// Default output device via rodio; each tone plays on its own thread
    pub struct RodioBackend;

    impl RodioBackend {
        pub fn detect() -> Option<Self> {
            match OutputStream::try_default() {
                Ok(_) => Some(Self),
                Err(err) => {
                    tracing::debug!("No default audio output: {}", err);
                    None
                }
            }
        }
    }

    impl ToneBackend for RodioBackend {
        fn play(&self, samples: Arc<[f32]>, sample_rate: u32) -> Result<()> {
            std::thread::Builder::new()
                .name("chime".into())
                .spawn(move || {
                    let Ok((_stream, handle)) = OutputStream::try_default() else {
                        return;
                    };
                    let Ok(sink) = Sink::try_new(&handle) else {
                        return;
                    };
                    sink.append(SamplesBuffer::new(1, sample_rate, samples.to_vec()));
                    sink.sleep_until_end();
                })
                .map(|_| ())
                .map_err(|e| Error::Audio(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        plays: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ToneBackend for CountingBackend {
        fn play(&self, samples: Arc<[f32]>, sample_rate: u32) -> Result<()> {
            assert_eq!(sample_rate, 48_000);
            assert!(!samples.is_empty());
            self.plays.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Audio("device closed".into()));
            }
            Ok(())
        }
    }

    fn counting_chime(fail: bool) -> (Chime, Arc<AtomicUsize>) {
        let plays = Arc::new(AtomicUsize::new(0));
        let backend = CountingBackend {
            plays: Arc::clone(&plays),
            fail,
        };
        (
            Chime::new(Some(Box::new(backend)), &ChimeConfig::default()),
            plays,
        )
    }

    #[test]
    fn test_render_length_and_bounds() {
        let config = ChimeConfig::default();
        let samples = render_chime(&config);

        assert_eq!(samples.len(), 96_000);
        assert_eq!(samples[0], 0.0);
        assert!(samples.iter().all(|s| s.abs() <= config.peak_gain + 1e-6));
    }

    #[test]
    fn test_render_envelope_peaks_after_attack() {
        let config = ChimeConfig::default();
        let samples = render_chime(&config);
        let window = |from: f32, to: f32| {
            let start = (from * 48_000.0) as usize;
            let end = (to * 48_000.0) as usize;
            samples[start..end]
                .iter()
                .fold(0.0f32, |peak, s| peak.max(s.abs()))
        };

        // Loudest right after the attack, quiet at both ends
        assert!(window(0.09, 0.12) > 0.28);
        assert!(window(0.0, 0.01) < 0.04);
        assert!(window(1.98, 2.0) < 0.01);
        assert!(window(0.5, 0.52) > window(1.5, 1.52));
    }

    #[test]
    fn test_ring_plays_through_backend() {
        let (chime, plays) = counting_chime(false);
        chime.ring();
        chime.ring();
        assert_eq!(plays.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_muted_chime_is_silent() {
        let (mut chime, plays) = counting_chime(false);
        chime.set_muted(true);
        chime.ring();
        assert_eq!(plays.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_backend_failure_is_swallowed() {
        let (chime, plays) = counting_chime(true);
        chime.ring();
        assert_eq!(plays.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_silent_chime_rings_without_backend() {
        let chime = Chime::silent(&ChimeConfig::default());
        assert!(!chime.is_available());
        chime.ring();
    }
}
