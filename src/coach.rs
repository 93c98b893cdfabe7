//! A coaching session: chat in, routines out, one sequence at a time.

use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use crate::assistant::Assistant;
use crate::celebration::Celebration;
use crate::clock::Clock;
use crate::commands::Command;
use crate::error::{InputError, Result, StateError};
use crate::history::HistoryDb;
use crate::instructions::{extract, InstructionStep, StepId};
use crate::ledger::{ExerciseRecord, Leaderboard, SessionLedger};
use crate::pain::{classify, PainLocation};
use crate::sequencer::{Completion, Sequencer, SequencerEvent};
use crate::session::SessionConfig;
use crate::speech::Announcer;
use crate::util::{format_countdown, progress_percentage, reserve_ids_above};

/// How long a new routine's region stays highlighted.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCard {
    User(String),
    /// A step of some routine; flags follow the sequencer while it runs.
    Step(InstructionStep),
    Notice(String),
}

/// What the caller should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Handled,
    ShowLeaderboard,
    ShowSettings,
    Quit,
}

/// Readout for the running step.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub step_number: usize,
    pub total: usize,
    pub percentage: f64,
    pub remaining_secs: u32,
    pub countdown: String,
    pub text: String,
}

pub struct Coach<C: Clock + Clone> {
    config: SessionConfig,
    clock: C,
    sequencer: Sequencer<C>,
    ledger: SessionLedger,
    assistant: Box<dyn Assistant>,
    announcer: Box<dyn Announcer>,
    history: Option<HistoryDb>,
    transcript: Vec<ChatCard>,
    focus: Option<PainLocation>,
    highlight: Option<(PainLocation, Duration)>,
    celebration: Option<Celebration>,
}

impl<C: Clock + Clone> std::fmt::Debug for Coach<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coach")
            .field("config", &self.config)
            .field("state", &self.sequencer.state())
            .field("session_points", &self.ledger.session_points())
            .field("cards", &self.transcript.len())
            .finish()
    }
}

impl<C: Clock + Clone> Coach<C> {
    pub fn new(
        config: SessionConfig,
        clock: C,
        assistant: Box<dyn Assistant>,
        announcer: Box<dyn Announcer>,
    ) -> Self {
        Self {
            config,
            sequencer: Sequencer::new(clock.clone()),
            clock,
            ledger: SessionLedger::default(),
            assistant,
            announcer,
            history: None,
            transcript: Vec::new(),
            focus: None,
            highlight: None,
            celebration: None,
        }
    }

    /// Persist completions to `db` and pick up where the user left off.
    /// On error the session keeps its in-memory ledger.
    pub fn attach_history(&mut self, db: HistoryDb) -> Result<()> {
        let history = db.load_history(&self.config.user_name)?;
        // new records must not reuse ids from earlier runs
        reserve_ids_above(db.max_record_id()?);
        let mut board = Leaderboard::community();
        board.overlay(db.load_leaderboard()?);
        info!(
            user = %self.config.user_name,
            records = history.len(),
            "restored exercise history"
        );
        self.ledger = SessionLedger::restore(history, board);
        self.history = Some(db);
        Ok(())
    }

    pub fn with_ledger(mut self, ledger: SessionLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &Sequencer<C> {
        &self.sequencer
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn history(&self) -> Option<&HistoryDb> {
        self.history.as_ref()
    }

    pub fn transcript(&self) -> &[ChatCard] {
        &self.transcript
    }

    pub fn is_exercising(&self) -> bool {
        !self.sequencer.is_idle()
    }

    /// Region the running step works on.
    pub fn focus(&self) -> Option<PainLocation> {
        self.focus
    }

    pub fn highlighted(&self) -> Option<PainLocation> {
        let now = self.clock.now();
        self.highlight
            .filter(|(_, until)| now < *until)
            .map(|(loc, _)| loc)
    }

    pub fn celebration(&self) -> Option<&Celebration> {
        let now = self.clock.now();
        self.celebration.as_ref().filter(|c| c.is_active(now))
    }

    pub fn panel_visible(&self) -> bool {
        self.is_exercising() && self.sequencer.panel_visible()
    }

    pub fn progress(&self) -> Option<Progress> {
        let step = self.sequencer.current_step()?;
        let remaining_secs = self.sequencer.remaining_secs()?;
        let total = self.sequencer.batch().len();
        Some(Progress {
            step_number: step.step_number,
            total,
            percentage: progress_percentage(step.step_number - 1, total),
            remaining_secs,
            countdown: format_countdown(remaining_secs),
            text: step.text.clone(),
        })
    }

    /// Ask for a routine and start running it.
    ///
    /// Returns the number of steps started. Nothing is added to the
    /// transcript when the message is rejected.
    pub fn send_message(&mut self, text: &str) -> Result<usize> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InputError::BlankMessage.into());
        }
        if self.is_exercising() {
            return Err(StateError::AlreadyRunning.into());
        }

        self.transcript.push(ChatCard::User(text.to_string()));
        let location = classify(text);

        let reply = match self.assistant.respond(text, location) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("assistant failed: {e}");
                self.notice("Sorry, I could not come up with a routine right now.");
                return Err(e);
            }
        };

        let steps = extract(&reply, location);
        if steps.is_empty() {
            self.notice("I could not turn that into exercise steps. Try describing where it hurts.");
            return Err(InputError::NoInstructions.into());
        }

        let count = steps.len();
        self.transcript
            .extend(steps.iter().cloned().map(ChatCard::Step));
        if location != PainLocation::General {
            self.highlight = Some((location, self.clock.now() + HIGHLIGHT_DURATION));
        }
        self.celebration = None;

        let events = self.sequencer.start(steps)?;
        self.apply(&events);
        Ok(count)
    }

    /// Fire due timers and fold their effects into the session.
    pub fn poll(&mut self) -> Vec<SequencerEvent> {
        let events = self.sequencer.poll();
        self.apply(&events);

        let now = self.clock.now();
        if matches!(self.highlight, Some((_, until)) if now >= until) {
            self.highlight = None;
        }
        if matches!(&self.celebration, Some(c) if !c.is_active(now)) {
            self.celebration = None;
        }
        events
    }

    pub fn skip(&mut self) -> Result<()> {
        let events = self.sequencer.skip()?;
        self.apply(&events);
        Ok(())
    }

    /// Complete the running step.
    pub fn complete(&mut self) -> Result<()> {
        let id = match self.sequencer.current_step() {
            Some(step) => step.id,
            None => return self.skip(),
        };
        self.complete_step(id)
    }

    pub fn complete_step(&mut self, id: StepId) -> Result<()> {
        let events = self.sequencer.manual_complete(id)?;
        self.apply(&events);
        Ok(())
    }

    pub fn minimize(&mut self) {
        self.sequencer.minimize();
    }

    pub fn restore(&mut self) {
        self.sequencer.restore_panel_view();
    }

    /// Drop the conversation, keeping the cards of a routine still running.
    pub fn clear_chat(&mut self) {
        let running: Vec<StepId> = self.sequencer.batch().iter().map(|s| s.id).collect();
        self.transcript
            .retain(|card| matches!(card, ChatCard::Step(step) if running.contains(&step.id)));
    }

    pub fn run_command(&mut self, command: Command) -> Result<CommandOutcome> {
        match command {
            Command::Skip => self.skip()?,
            Command::Complete => self.complete()?,
            Command::Minimize => self.minimize(),
            Command::Restore => self.restore(),
            Command::ClearChat => self.clear_chat(),
            Command::Leaderboard => return Ok(CommandOutcome::ShowLeaderboard),
            Command::Settings => return Ok(CommandOutcome::ShowSettings),
            Command::Help => {
                let lines: Vec<String> = Command::all()
                    .map(|c| format!("/{}", c.phrases().join(", /")))
                    .collect();
                self.notice(format!("Commands: {}", lines.join("  ")));
            }
            Command::Quit => return Ok(CommandOutcome::Quit),
        }
        Ok(CommandOutcome::Handled)
    }

    /// Stop any running routine without awarding points.
    pub fn shutdown(&mut self) {
        if self.sequencer.cancel() {
            self.notice("Exercise stopped.");
        }
        self.focus = None;
        self.highlight = None;
    }

    fn notice(&mut self, text: impl Into<String>) {
        self.transcript.push(ChatCard::Notice(text.into()));
    }

    fn step_card_mut(&mut self, id: StepId) -> Option<&mut InstructionStep> {
        self.transcript.iter_mut().rev().find_map(|card| match card {
            ChatCard::Step(step) if step.id == id => Some(step),
            _ => None,
        })
    }

    fn apply(&mut self, events: &[SequencerEvent]) {
        for event in events {
            match event {
                SequencerEvent::StepStarted {
                    id,
                    step_number,
                    total,
                    text,
                    focus,
                    ..
                } => {
                    if let Some(card) = self.step_card_mut(*id) {
                        card.active = true;
                    }
                    self.focus = Some(*focus);
                    self.announce(&format!("Step {step_number} of {total}: {text}"));
                }
                SequencerEvent::Countdown { .. } => {}
                SequencerEvent::StepCompleted { id, .. } => {
                    if let Some(card) = self.step_card_mut(*id) {
                        card.active = false;
                        card.completed = true;
                    }
                }
                SequencerEvent::SequenceCompleted(completion) => self.on_completed(completion),
            }
        }
    }

    fn on_completed(&mut self, completion: &Completion) {
        let record = ExerciseRecord::from_completion(completion, Local::now());
        let user_name = self.config.user_name.clone();
        self.ledger.record_completion(record.clone(), &user_name);

        if let Some(db) = self.history.as_mut() {
            if let Some(entry) = self.ledger.leaderboard().get(&user_name) {
                if let Err(e) = db.record_completion(&user_name, &record, entry) {
                    warn!("could not save completed exercise: {e}");
                }
            }
        }

        self.focus = None;
        self.highlight = None;
        self.celebration = Some(Celebration::from_completion(completion, self.clock.now()));

        let message = format!(
            "Exercise complete! You earned {} points.",
            completion.points_awarded
        );
        self.notice(message.clone());
        self.announce(&message);
    }

    fn announce(&mut self, text: &str) {
        if !self.config.announce {
            return;
        }
        if let Err(e) = self.announcer.speak(text, &self.config.voice) {
            warn!("announcement failed: {e}");
        }
    }
}
