//! Session controller: the exercise playback state machine.
//!
//! The outer state tracks the session (ready, intro, exercising, completed).
//! The inner state tracks the current exercise (intro, preparation, executing,
//! holding, resting, completed). A countdown runs inside `holding`.
//!
//! Every inner transition is one call to [`SessionController::advance`].
//! [`SessionController::run`] drives those calls with the auto-advance delay,
//! so exactly one transition is in flight at a time. While a step waits on
//! narration or on the clock it keeps polling for control events, and a reset
//! or quit abandons the step on the spot.

use crate::catalog::{CLOSING_MESSAGE, SIDE_SWITCH_CUE, WELCOME_MESSAGE};
use crate::clock::Clock;
use crate::config::PacingConfig;
use crate::narrator::Narrator;
use crate::store::KeyValueStore;
use crate::tally::DailyTally;
use crate::{Catalog, Error, Exercise, ExerciseState, Result, SessionState, Side, TimingPattern};
use std::time::Duration;
use uuid::Uuid;

/// Longest stretch a step waits without checking for control events
const CONTROL_SLICE: Duration = Duration::from_millis(50);

/// Fixed waits of the session timeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pacing {
    /// Delay before each inner transition
    pub auto_advance: Duration,
    /// One breath of a breathing exercise
    pub breath: Duration,
    /// One movement of a plain repetition exercise
    pub movement: Duration,
    /// Pause between reps
    pub rest: Duration,
    /// One countdown tick
    pub tick: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from(&PacingConfig::default())
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(config: &PacingConfig) -> Self {
        Self {
            auto_advance: Duration::from_millis(config.auto_advance_ms),
            breath: Duration::from_secs(config.breath_secs),
            movement: Duration::from_secs(config.movement_secs),
            rest: Duration::from_secs(config.rest_secs),
            tick: Duration::from_millis(config.tick_ms),
        }
    }
}

/// User controls accepted while a session runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    Start,
    Reset,
    ToggleAudio,
    Quit,
}

/// How [`SessionController::run`] ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every exercise finished and the tally was bumped
    Completed,
    /// The user reset the session
    Reset,
    /// The user asked to quit; the session was reset
    Quit,
    /// No session was running
    Idle,
}

/// Control that cut a step short
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Interrupt {
    Reset,
    Quit,
}

type Flow = std::result::Result<(), Interrupt>;

/// Something that happened on the session timeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SessionStateChanged(SessionState),
    ExerciseStarted { index: usize, exercise_id: u32 },
    ExerciseStateChanged { exercise_id: u32, state: ExerciseState },
    RepStarted { exercise_id: u32, rep: u32, side: Option<Side> },
    CountdownTick { remaining: u32 },
    SideSwitched { exercise_id: u32 },
    SessionCompleted { sessions_today: u32 },
    Reset,
    AudioToggled { enabled: bool },
}

/// Read-only view of the controller for display
#[derive(Clone, Debug)]
pub struct Snapshot<'a> {
    pub session_state: SessionState,
    pub exercise: &'a Exercise,
    pub exercise_index: usize,
    pub exercise_count: usize,
    pub exercise_state: ExerciseState,
    pub rep: u32,
    pub side: Side,
    pub countdown: u32,
    pub audio_enabled: bool,
    pub narration_ready: bool,
    pub sessions_today: u32,
}

impl Snapshot<'_> {
    /// Share of the catalog finished, 0-100
    pub fn session_progress(&self) -> f32 {
        let done = self.exercise_index + usize::from(self.exercise_state == ExerciseState::Completed);
        done as f32 / self.exercise_count as f32 * 100.0
    }

    /// Share of the current exercise's reps finished, 0-100
    ///
    /// Bilateral exercises count right-side reps after all left-side reps.
    pub fn exercise_progress(&self) -> f32 {
        let timing = &self.exercise.timing;
        let mut done = self.rep.saturating_sub(1);
        if timing.has_sides && self.side == Side::Right {
            done += timing.repetitions;
        }
        done as f32 / timing.total_reps() as f32 * 100.0
    }

    /// Share of the running hold elapsed, 0-100
    pub fn countdown_progress(&self) -> f32 {
        match self.exercise.timing.hold_duration {
            Some(hold) if self.countdown > 0 => {
                (hold.saturating_sub(self.countdown)) as f32 / hold as f32 * 100.0
            }
            _ => 100.0,
        }
    }

    pub fn status_label(&self) -> &'static str {
        self.exercise_state.label()
    }
}

/// Drives a session through the catalog
///
/// Narration, waits and persistence are injected so tests can run a whole
/// session in virtual time against fakes.
pub struct SessionController<N: Narrator, C: Clock, S: KeyValueStore> {
    catalog: Catalog,
    pacing: Pacing,
    narrator: N,
    clock: C,
    store: S,
    session_state: SessionState,
    exercise_index: usize,
    exercise_state: ExerciseState,
    rep: u32,
    side: Side,
    countdown: u32,
    audio_enabled: bool,
    sessions_today: u32,
    run_id: Option<Uuid>,
    events: Vec<SessionEvent>,
}

impl<N: Narrator, C: Clock, S: KeyValueStore> SessionController<N, C, S> {
    /// Build a controller in the `ready` state
    ///
    /// Today's session count is read from `store` here and cached.
    pub fn new(catalog: Catalog, pacing: Pacing, narrator: N, clock: C, store: S) -> Result<Self> {
        if catalog.is_empty() {
            return Err(Error::CatalogValidation("Catalog has no exercises".into()));
        }

        let sessions_today = DailyTally::count(&store, clock.today());
        tracing::debug!("{} sessions already completed today", sessions_today);

        Ok(Self {
            catalog,
            pacing,
            narrator,
            clock,
            store,
            session_state: SessionState::Ready,
            exercise_index: 0,
            exercise_state: ExerciseState::Intro,
            rep: 1,
            side: Side::Left,
            countdown: 0,
            audio_enabled: true,
            sessions_today,
            run_id: None,
            events: Vec::new(),
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn exercise_state(&self) -> ExerciseState {
        self.exercise_state
    }

    pub fn current_exercise_index(&self) -> usize {
        self.exercise_index
    }

    pub fn current_exercise(&self) -> &Exercise {
        &self.catalog.exercises[self.exercise_index]
    }

    pub fn current_rep(&self) -> u32 {
        self.rep
    }

    pub fn current_side(&self) -> Side {
        self.side
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn sessions_today(&self) -> u32 {
        self.sessions_today
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            session_state: self.session_state,
            exercise: self.current_exercise(),
            exercise_index: self.exercise_index,
            exercise_count: self.catalog.len(),
            exercise_state: self.exercise_state,
            rep: self.rep,
            side: self.side,
            countdown: self.countdown,
            audio_enabled: self.audio_enabled,
            narration_ready: self.narrator.is_ready(),
            sessions_today: self.sessions_today,
        }
    }

    /// Take the events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------------
    // User controls
    // ------------------------------------------------------------------------

    /// Start a session in `intro` and begin the welcome narration
    ///
    /// The next step waits for the welcome to finish and moves on to the
    /// first exercise. From `completed` this starts another session from
    /// scratch. Ignored while a session is already running.
    pub fn start(&mut self) {
        match self.session_state {
            SessionState::Ready => {}
            SessionState::Completed => self.reset(),
            SessionState::Intro | SessionState::Exercising => {
                tracing::debug!("Start ignored, session already running");
                return;
            }
        }

        let run_id = Uuid::new_v4();
        self.run_id = Some(run_id);
        tracing::info!(%run_id, "Starting exercise session");

        self.set_session_state(SessionState::Intro);
        self.cue(WELCOME_MESSAGE);
    }

    /// Stop narration and return to `ready` with all counters cleared
    pub fn reset(&mut self) {
        self.narrator.stop();
        if let Some(run_id) = self.run_id.take() {
            tracing::info!(%run_id, "Session reset");
        }
        self.session_state = SessionState::Ready;
        self.exercise_index = 0;
        self.exercise_state = ExerciseState::Intro;
        self.rep = 1;
        self.side = Side::Left;
        self.countdown = 0;
        self.events.push(SessionEvent::Reset);
    }

    /// Flip narration on or off; turning it off silences the narrator
    pub fn toggle_audio(&mut self) {
        if self.audio_enabled {
            self.narrator.stop();
        }
        self.audio_enabled = !self.audio_enabled;
        tracing::debug!("Audio enabled: {}", self.audio_enabled);
        self.events.push(SessionEvent::AudioToggled {
            enabled: self.audio_enabled,
        });
    }

    // ------------------------------------------------------------------------
    // Timeline
    // ------------------------------------------------------------------------

    /// Whether the next step waits for the auto-advance delay
    ///
    /// The welcome hands over to the first exercise directly, and a running
    /// countdown is paced by its own ticks.
    fn waits_for_auto_advance(&self) -> bool {
        self.session_state == SessionState::Exercising
            && !(self.exercise_state == ExerciseState::Holding && self.countdown > 0)
    }

    fn is_running(&self) -> bool {
        matches!(
            self.session_state,
            SessionState::Intro | SessionState::Exercising
        )
    }

    /// Run the session until it completes or a control event stops it
    ///
    /// `poll` is checked between steps and throughout every wait inside a
    /// step; `observe` sees every event together with the state after the
    /// step that produced it.
    pub fn run<P, O>(&mut self, mut poll: P, mut observe: O) -> RunOutcome
    where
        P: FnMut() -> Option<ControlEvent>,
        O: FnMut(&SessionEvent, &Snapshot<'_>),
    {
        let span = tracing::info_span!(
            "session",
            run_id = %self.run_id.map(|id| id.to_string()).unwrap_or_default()
        );
        let _guard = span.enter();

        loop {
            self.flush_events(&mut observe);

            match self.session_state {
                SessionState::Intro | SessionState::Exercising => {}
                SessionState::Completed => return RunOutcome::Completed,
                SessionState::Ready => return RunOutcome::Idle,
            }

            if let Err(interrupt) = self.next_step(&mut poll) {
                self.flush_events(&mut observe);
                return match interrupt {
                    Interrupt::Reset => RunOutcome::Reset,
                    Interrupt::Quit => RunOutcome::Quit,
                };
            }
        }
    }

    fn next_step<P>(&mut self, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        self.check_controls(poll)?;
        if self.waits_for_auto_advance() {
            self.pause(self.pacing.auto_advance, poll)?;
        }
        self.step(poll)
    }

    fn flush_events<O>(&mut self, observe: &mut O)
    where
        O: FnMut(&SessionEvent, &Snapshot<'_>),
    {
        if self.events.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.events);
        let snapshot = self.snapshot();
        for event in &events {
            observe(event, &snapshot);
        }
    }

    /// Apply pending control events; reset and quit end the current step
    fn check_controls<P>(&mut self, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        while let Some(control) = poll() {
            match control {
                ControlEvent::Reset => {
                    self.reset();
                    return Err(Interrupt::Reset);
                }
                ControlEvent::Quit => {
                    self.reset();
                    return Err(Interrupt::Quit);
                }
                ControlEvent::ToggleAudio => self.toggle_audio(),
                ControlEvent::Start => tracing::debug!("Session already running"),
            }
        }
        Ok(())
    }

    /// Sleep `duration` on the clock in slices, checking controls after each
    fn pause<P>(&mut self, duration: Duration, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        let mut left = duration;
        while !left.is_zero() {
            let slice = left.min(CONTROL_SLICE);
            self.clock.sleep(slice);
            left -= slice;
            self.check_controls(poll)?;
        }
        Ok(())
    }

    /// Perform one inner transition
    ///
    /// Returns `false` without doing anything when no session is running,
    /// so a step that fires after a reset is a no-op.
    pub fn advance(&mut self) -> bool {
        if !self.is_running() {
            tracing::debug!("Advance ignored in {:?}", self.session_state);
            return false;
        }
        // Without a control source nothing can interrupt the step
        let _ = self.step(&mut || None);
        true
    }

    fn step<P>(&mut self, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        if self.session_state == SessionState::Intro {
            return self.finish_welcome(poll);
        }

        let exercise = self.current_exercise().clone();
        match self.exercise_state {
            ExerciseState::Intro => {
                self.narrate(&exercise.audio_instructions.introduction, poll)?;
                self.enter(&exercise, ExerciseState::Preparation);
            }
            ExerciseState::Preparation => {
                self.narrate(&exercise.audio_instructions.preparation, poll)?;
                self.rep = 1;
                self.side = Side::Left;
                self.enter(&exercise, ExerciseState::Executing);
            }
            ExerciseState::Executing => self.execute(&exercise, poll)?,
            ExerciseState::Holding => self.hold(&exercise, poll)?,
            ExerciseState::Resting => {
                self.pause(self.pacing.rest, poll)?;
                self.enter(&exercise, ExerciseState::Executing);
            }
            ExerciseState::Completed => self.finish_exercise(&exercise, poll)?,
        }
        Ok(())
    }

    fn finish_welcome<P>(&mut self, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        self.wait_for_narration(poll)?;
        self.set_session_state(SessionState::Exercising);
        let exercise_id = self.current_exercise().id;
        self.events.push(SessionEvent::ExerciseStarted {
            index: self.exercise_index,
            exercise_id,
        });
        Ok(())
    }

    fn execute<P>(&mut self, exercise: &Exercise, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        let timing = &exercise.timing;
        self.events.push(SessionEvent::RepStarted {
            exercise_id: exercise.id,
            rep: self.rep,
            side: timing.has_sides.then_some(self.side),
        });
        let cue = self.execution_cue(exercise);
        self.narrate(&cue, poll)?;

        match timing.pattern() {
            TimingPattern::Breathing => {
                self.pause(self.pacing.breath, poll)?;
                if self.rep < timing.repetitions {
                    self.rep += 1;
                } else {
                    self.enter(exercise, ExerciseState::Completed);
                }
            }
            TimingPattern::Hold(secs) => {
                self.countdown = secs;
                self.enter(exercise, ExerciseState::Holding);
                if let Some(hold) = &exercise.audio_instructions.hold {
                    self.narrate(hold, poll)?;
                }
            }
            TimingPattern::Repetition => {
                self.pause(self.pacing.movement, poll)?;
                if self.rep < timing.repetitions {
                    self.rep += 1;
                    self.enter(exercise, ExerciseState::Resting);
                } else {
                    self.enter(exercise, ExerciseState::Completed);
                }
            }
        }
        Ok(())
    }

    /// One countdown tick, or the end of the hold once it reaches zero
    ///
    /// The 3-2-1 cues are started without waiting, so they play during the
    /// tick instead of lengthening it.
    fn hold<P>(&mut self, exercise: &Exercise, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        if self.countdown > 0 {
            let remaining = self.countdown;
            if remaining <= 3 {
                self.cue(&remaining.to_string());
            }
            self.pause(self.pacing.tick, poll)?;
            self.countdown = remaining - 1;
            self.events.push(SessionEvent::CountdownTick {
                remaining: self.countdown,
            });
            return Ok(());
        }

        let timing = &exercise.timing;
        if self.rep < timing.repetitions {
            self.rep += 1;
            self.enter(exercise, ExerciseState::Resting);
        } else if timing.has_sides && self.side == Side::Left {
            self.narrate(SIDE_SWITCH_CUE, poll)?;
            self.side = Side::Right;
            self.rep = 1;
            self.events.push(SessionEvent::SideSwitched {
                exercise_id: exercise.id,
            });
            self.enter(exercise, ExerciseState::Executing);
        } else {
            self.enter(exercise, ExerciseState::Completed);
        }
        Ok(())
    }

    fn finish_exercise<P>(&mut self, exercise: &Exercise, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        self.narrate(&exercise.audio_instructions.completion, poll)?;

        if self.exercise_index + 1 < self.catalog.len() {
            self.exercise_index += 1;
            self.exercise_state = ExerciseState::Intro;
            self.rep = 1;
            self.side = Side::Left;
            self.countdown = 0;
            let exercise_id = self.current_exercise().id;
            self.events.push(SessionEvent::ExerciseStarted {
                index: self.exercise_index,
                exercise_id,
            });
            Ok(())
        } else {
            self.finish_session(poll)
        }
    }

    fn finish_session<P>(&mut self, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        self.set_session_state(SessionState::Completed);

        match DailyTally::increment(&mut self.store, self.clock.today()) {
            Ok(count) => self.sessions_today = count,
            Err(e) => {
                tracing::warn!("Failed to record completed session: {}", e);
                self.sessions_today += 1;
            }
        }
        tracing::info!(
            sessions_today = self.sessions_today,
            "Exercise session completed"
        );
        self.events.push(SessionEvent::SessionCompleted {
            sessions_today: self.sessions_today,
        });

        self.run_id = None;
        self.narrate(CLOSING_MESSAGE, poll)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn set_session_state(&mut self, state: SessionState) {
        self.session_state = state;
        self.events.push(SessionEvent::SessionStateChanged(state));
    }

    fn enter(&mut self, exercise: &Exercise, state: ExerciseState) {
        tracing::debug!(
            exercise = exercise.id,
            rep = self.rep,
            side = %self.side,
            "{:?} -> {:?}",
            self.exercise_state,
            state
        );
        self.exercise_state = state;
        self.events.push(SessionEvent::ExerciseStateChanged {
            exercise_id: exercise.id,
            state,
        });
    }

    /// Execution narration followed by the rep number
    fn execution_cue(&self, exercise: &Exercise) -> String {
        let execution = &exercise.audio_instructions.execution;
        if exercise.timing.has_sides {
            let side = match self.side {
                Side::Left => "Left",
                Side::Right => "Right",
            };
            format!("{} side. {} {}", side, execution, self.rep)
        } else {
            format!("{} {}", execution, self.rep)
        }
    }

    /// Start speaking if audio is on and the narrator works
    ///
    /// Returns whether an utterance was started. Failures never stop the
    /// session.
    fn cue(&mut self, text: &str) -> bool {
        if !self.audio_enabled {
            tracing::trace!("Audio off, skipping: {}", text);
            return false;
        }
        if !self.narrator.is_ready() {
            tracing::trace!("Narrator not ready, skipping: {}", text);
            return false;
        }
        match self.narrator.begin(text) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Speech error: {}", e);
                false
            }
        }
    }

    /// Speak `text` and wait for it, still answering controls meanwhile
    fn narrate<P>(&mut self, text: &str, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        if self.cue(text) {
            self.wait_for_narration(poll)?;
        }
        Ok(())
    }

    /// Wait for the current utterance; muting ends the wait early
    fn wait_for_narration<P>(&mut self, poll: &mut P) -> Flow
    where
        P: FnMut() -> Option<ControlEvent>,
    {
        while self.audio_enabled && self.narrator.is_ready() {
            match self.narrator.wait_idle(CONTROL_SLICE) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Speech error: {}", e);
                    break;
                }
            }
            self.check_controls(poll)?;
        }
        Ok(())
    }
}
