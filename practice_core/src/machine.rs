//! Session state machine.
//!
//! Transitions are pure: [`SessionState::apply`] takes an [`Event`], updates
//! the state and returns the [`Effect`]s the runtime must carry out (speak,
//! ring, start or cancel the timer). Nothing in here sleeps, plays audio or
//! spawns tasks.
//!
//! Asynchronous work is identified by generation numbers. Timer ticks carry
//! the countdown generation they were started under and narration completions
//! carry the utterance number they belong to; anything that does not match
//! the current generation is dropped.

use crate::config::SessionConfig;
use crate::prompts;
use crate::timer::{Countdown, TickOutcome};
use crate::{ExerciseRecord, Stage};

/// Stage durations in countdown seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timings {
    pub warm_up_seconds: u32,
    pub exercise_seconds: u32,
    pub cool_down_seconds: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for Timings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            warm_up_seconds: config.warm_up_seconds,
            exercise_seconds: config.exercise_seconds,
            cool_down_seconds: config.cool_down_seconds,
        }
    }
}

/// Something that happened: a user action or a callback
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Begin a session with an already shuffled selection
    StartPractice { selection: Vec<ExerciseRecord> },
    /// The "Go" button for the current exercise
    StartExercise,
    /// Repeat the current exercise's instructions
    ListenAgain,
    Reset,
    ToggleMute,
    /// One elapsed second from the timer run `timer`
    Tick { timer: u64 },
    /// Narration `utterance` finished playing
    NarrationFinished { utterance: u64 },
}

/// Something the runtime must do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Speak `text`; report completion as `NarrationFinished { utterance }`
    Speak { text: String, utterance: u64 },
    CancelSpeech,
    /// Deliver `seconds` ticks tagged with `timer`, one per tick period
    StartTimer { seconds: u32, timer: u64 },
    CancelTimer,
    Chime,
    SetMuted(bool),
}

/// Everything the presentation layer reads, plus the generation bookkeeping
#[derive(Clone, Debug)]
pub struct SessionState {
    stage: Stage,
    countdown: Countdown,
    exercise_index: usize,
    selected: Vec<ExerciseRecord>,
    muted: bool,
    last_utterance: u64,
    /// Utterance whose completion starts the exercise timer
    pending_narration: Option<u64>,
    timings: Timings,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Timings::default(), false)
    }
}

impl SessionState {
    pub fn new(timings: Timings, muted: bool) -> Self {
        Self {
            stage: Stage::Start,
            countdown: Countdown::new(),
            exercise_index: 0,
            selected: Vec::new(),
            muted,
            last_utterance: 0,
            pending_narration: None,
            timings,
        }
    }

    /// Apply one event and return the effects to execute, in order
    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            Event::StartPractice { selection } => self.start_practice(selection, &mut effects),
            Event::StartExercise => self.start_exercise(&mut effects),
            Event::ListenAgain => self.listen_again(&mut effects),
            Event::Reset => self.reset(&mut effects),
            Event::ToggleMute => self.toggle_mute(&mut effects),
            Event::Tick { timer } => self.tick(timer, &mut effects),
            Event::NarrationFinished { utterance } => {
                self.narration_finished(utterance, &mut effects)
            }
        }
        effects
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    fn start_practice(&mut self, selection: Vec<ExerciseRecord>, effects: &mut Vec<Effect>) {
        if self.stage != Stage::Start {
            tracing::debug!("Ignoring start: session already in {:?}", self.stage);
            return;
        }
        if selection.is_empty() {
            tracing::debug!("Ignoring start: no exercises selected");
            return;
        }

        self.selected = selection;
        self.exercise_index = 0;
        self.stage = Stage::WarmUp;
        tracing::info!(
            "Practice started with {} exercises, warming up",
            self.selected.len()
        );

        self.speak(prompts::WARM_UP, effects);
        self.start_timer(self.timings.warm_up_seconds, effects);
    }

    fn start_exercise(&mut self, effects: &mut Vec<Effect>) {
        if self.stage != Stage::Exercise
            || self.countdown.is_running()
            || self.pending_narration.is_some()
        {
            tracing::debug!(
                "Ignoring go: stage {:?}, timer running {}, narration pending {}",
                self.stage,
                self.countdown.is_running(),
                self.pending_narration.is_some()
            );
            return;
        }
        let Some(exercise) = self.selected.get(self.exercise_index) else {
            tracing::debug!("Ignoring go: no exercise at index {}", self.exercise_index);
            return;
        };

        let text = exercise.instructions();
        tracing::info!(
            "Exercise {} of {}: {}",
            self.exercise_index + 1,
            self.selected.len(),
            exercise.name
        );

        // The timer starts once the instructions have been read out
        match self.speak(text, effects) {
            Some(utterance) => self.pending_narration = Some(utterance),
            None => self.start_timer(self.timings.exercise_seconds, effects),
        }
    }

    fn listen_again(&mut self, effects: &mut Vec<Effect>) {
        if self.stage != Stage::Exercise || self.countdown.is_running() || self.muted {
            tracing::debug!("Ignoring listen-again in {:?}", self.stage);
            return;
        }
        let Some(text) = self.current_exercise().map(ExerciseRecord::instructions) else {
            return;
        };

        let utterance = self.speak(text, effects);
        if self.pending_narration.is_some() {
            self.pending_narration = utterance;
        }
    }

    fn reset(&mut self, effects: &mut Vec<Effect>) {
        effects.push(Effect::CancelTimer);
        effects.push(Effect::CancelSpeech);

        self.countdown.clear();
        self.stage = Stage::Start;
        self.exercise_index = 0;
        self.selected.clear();
        self.pending_narration = None;
        tracing::info!("Practice reset");
    }

    fn toggle_mute(&mut self, effects: &mut Vec<Effect>) {
        self.muted = !self.muted;
        effects.push(Effect::SetMuted(self.muted));
        tracing::info!("Muted: {}", self.muted);

        if self.muted {
            effects.push(Effect::CancelSpeech);
            // Nothing will report completion now, so start the timer here
            if self.pending_narration.take().is_some() {
                self.start_timer(self.timings.exercise_seconds, effects);
            }
        }
    }

    fn tick(&mut self, timer: u64, effects: &mut Vec<Effect>) {
        match self.countdown.tick(timer) {
            None => tracing::debug!("Discarding stale tick from timer {}", timer),
            Some(TickOutcome::Remaining(1)) => self.chime(effects),
            Some(TickOutcome::Remaining(_)) => {}
            Some(TickOutcome::Expired) => self.expire(effects),
        }
    }

    fn expire(&mut self, effects: &mut Vec<Effect>) {
        match self.stage {
            Stage::WarmUp => {
                self.stage = Stage::Exercise;
                self.exercise_index = 0;
                tracing::info!("Warm-up complete");
                self.speak(prompts::WARM_UP_COMPLETE, effects);
            }
            Stage::Exercise => {
                self.chime(effects);
                if self.exercise_index + 1 < self.selected.len() {
                    self.exercise_index += 1;
                    tracing::info!(
                        "Exercise complete, next is {} of {}",
                        self.exercise_index + 1,
                        self.selected.len()
                    );
                    self.speak(prompts::EXERCISE_COMPLETE, effects);
                } else {
                    self.stage = Stage::CoolDown;
                    tracing::info!("All exercises complete, cooling down");
                    self.speak(prompts::COOL_DOWN, effects);
                    self.start_timer(self.timings.cool_down_seconds, effects);
                }
            }
            Stage::CoolDown => {
                self.stage = Stage::Complete;
                tracing::info!("Practice complete");
                self.chime(effects);
                self.speak(prompts::PRACTICE_COMPLETE, effects);
            }
            Stage::Start | Stage::Complete => {
                tracing::warn!("Timer expired with no timed stage ({:?})", self.stage);
            }
        }
    }

    fn narration_finished(&mut self, utterance: u64, effects: &mut Vec<Effect>) {
        if self.pending_narration != Some(utterance) {
            tracing::debug!("Discarding completion of utterance {}", utterance);
            return;
        }
        self.pending_narration = None;
        if self.stage == Stage::Exercise && !self.countdown.is_running() {
            self.start_timer(self.timings.exercise_seconds, effects);
        }
    }

    // ------------------------------------------------------------------------
    // Effect helpers
    // ------------------------------------------------------------------------

    /// Queue narration unless muted; returns the utterance number
    fn speak(&mut self, text: impl Into<String>, effects: &mut Vec<Effect>) -> Option<u64> {
        if self.muted {
            return None;
        }
        self.last_utterance += 1;
        effects.push(Effect::Speak {
            text: text.into(),
            utterance: self.last_utterance,
        });
        Some(self.last_utterance)
    }

    fn chime(&self, effects: &mut Vec<Effect>) {
        if !self.muted {
            effects.push(Effect::Chime);
        }
    }

    /// A zero-length stage expires on the spot; no ticks will ever arrive
    fn start_timer(&mut self, seconds: u32, effects: &mut Vec<Effect>) {
        let timer = self.countdown.start(seconds);
        if seconds == 0 {
            tracing::debug!("Zero-length {:?} stage, expiring now", self.stage);
            effects.push(Effect::CancelTimer);
            self.expire(effects);
            return;
        }
        effects.push(Effect::StartTimer { seconds, timer });
    }

    // ------------------------------------------------------------------------
    // Read-only view
    // ------------------------------------------------------------------------

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn timer_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn exercise_index(&self) -> usize {
        self.exercise_index
    }

    pub fn selected_exercises(&self) -> &[ExerciseRecord] {
        &self.selected
    }

    pub fn total_exercises(&self) -> usize {
        self.selected.len()
    }

    /// The exercise being shown, only while in the exercise stage
    pub fn current_exercise(&self) -> Option<&ExerciseRecord> {
        if self.stage == Stage::Exercise {
            self.selected.get(self.exercise_index)
        } else {
            None
        }
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Go was pressed and the instructions are still being read
    pub fn awaiting_narration(&self) -> bool {
        self.pending_narration.is_some()
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }
}
