//! Session runtime.
//!
//! [`Session`] wires the pure [`SessionState`] to the real world: it shuffles
//! the exercises, runs effects against the [`Narrator`], [`Chime`] and
//! [`Ticker`], and feeds ticks and narration completions back in as events.
//!
//! Everything runs on the caller's task. Callbacks only ever send an
//! [`Event`] into the session's channel; the owner drains it with
//! [`Session::next_event`] and [`Session::handle`], so transitions are applied
//! one at a time in arrival order.

use crate::chime::Chime;
use crate::config::{Config, SessionConfig};
use crate::machine::{Effect, Event, SessionState, Timings};
use crate::narrator::Narrator;
use crate::shuffle;
use crate::timer::Ticker;
use crate::{ExerciseRecord, Stage};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Bookkeeping for one run from START to COMPLETE (or reset)
#[derive(Clone, Debug, PartialEq)]
pub struct PracticeRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PracticeRun {
    fn begin() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Wall time from start to completion, once complete
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }
}

pub struct Session<R> {
    state: SessionState,
    config: SessionConfig,
    catalogue: Vec<ExerciseRecord>,
    rng: R,
    narrator: Narrator,
    chime: Chime,
    ticker: Ticker,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    run: Option<PracticeRun>,
}

impl<R: Rng> Session<R> {
    pub fn new(
        config: &Config,
        catalogue: Vec<ExerciseRecord>,
        mut narrator: Narrator,
        mut chime: Chime,
        rng: R,
    ) -> Self {
        let muted = config.session.start_muted;
        narrator.set_muted(muted);
        chime.set_muted(muted);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: SessionState::new(Timings::from(&config.session), muted),
            config: config.session.clone(),
            catalogue,
            rng,
            narrator,
            chime,
            ticker: Ticker::new(config.session.tick_period()),
            events_tx,
            events_rx,
            run: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The current or last finished run; `None` before start and after reset
    pub fn run(&self) -> Option<&PracticeRun> {
        self.run.as_ref()
    }

    pub fn start_practice(&mut self) {
        if self.state.stage() != Stage::Start {
            tracing::debug!("Ignoring start: session in {:?}", self.state.stage());
            return;
        }
        let selection = shuffle::select(&self.catalogue, self.config.exercise_count, &mut self.rng);
        self.dispatch(Event::StartPractice { selection });
    }

    /// The per-exercise "Go"
    pub fn start_exercise(&mut self) {
        self.dispatch(Event::StartExercise);
    }

    pub fn listen_again(&mut self) {
        self.dispatch(Event::ListenAgain);
    }

    pub fn reset_practice(&mut self) {
        self.dispatch(Event::Reset);
    }

    pub fn toggle_mute(&mut self) {
        self.dispatch(Event::ToggleMute);
    }

    /// Wait for the next timer tick or narration completion
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events_rx.recv().await
    }

    /// Apply an event received from [`Session::next_event`]
    pub fn handle(&mut self, event: Event) {
        self.dispatch(event);
    }

    fn dispatch(&mut self, event: Event) {
        let before = self.state.stage();
        let effects = self.state.apply(event);
        self.track_run(before);
        for effect in effects {
            self.execute(effect);
        }
    }

    fn track_run(&mut self, before: Stage) {
        let after = self.state.stage();
        if before == after {
            return;
        }
        // A zero-length warm-up skips straight past WarmUp
        if before == Stage::Start {
            let run = PracticeRun::begin();
            tracing::info!(run = %run.id, "Practice run started");
            self.run = Some(run);
        }
        match after {
            Stage::Complete => {
                if let Some(run) = self.run.as_mut() {
                    run.completed_at = Some(Utc::now());
                    let seconds = run.elapsed().map(|d| d.num_seconds()).unwrap_or_default();
                    tracing::info!(run = %run.id, seconds, "Practice run complete");
                }
            }
            Stage::Start => {
                if let Some(run) = self.run.take() {
                    tracing::info!(run = %run.id, "Practice run abandoned");
                }
            }
            _ => {}
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Speak { text, utterance } => {
                let tx = self.events_tx.clone();
                self.narrator.speak(
                    &text,
                    Arc::new(move || {
                        let _ = tx.send(Event::NarrationFinished { utterance });
                    }),
                );
            }
            Effect::CancelSpeech => self.narrator.cancel(),
            Effect::StartTimer { seconds, timer } => {
                let tx = self.events_tx.clone();
                self.ticker
                    .start(seconds, move || tx.send(Event::Tick { timer }).is_ok());
            }
            Effect::CancelTimer => self.ticker.cancel(),
            Effect::Chime => self.chime.ring(),
            Effect::SetMuted(muted) => {
                self.narrator.set_muted(muted);
                self.chime.set_muted(muted);
            }
        }
    }
}
