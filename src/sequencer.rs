//! Step-by-step runner for one batch of instructions.
//!
//! The sequencer is polled: callers invoke [`Sequencer::poll`] whenever they
//! like (the terminal loop does so on every tick) and every timer that fell
//! due since the last poll fires in order. Time comes from the injected
//! [`Clock`], so tests drive it with a [`crate::clock::ManualClock`].

use std::time::Duration;

use tracing::{debug, info};

use crate::clock::{Clock, TimerSlot};
use crate::error::{InputError, Result, StateError};
use crate::instructions::{InstructionStep, StepId};
use crate::ledger::points_for;
use crate::pain::{classify_from_instruction_text, PainLocation};

pub const TICK: Duration = Duration::from_secs(1);
/// Pause between finishing one step and starting the next.
pub const REST_BETWEEN_STEPS: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Timer {
    Countdown,
    Advance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Running {
        current_index: usize,
        remaining_secs: u32,
    },
    /// Between two steps; nothing is active until the rest is over.
    Resting { next_index: usize },
}

/// Summary handed out once when the last step of a batch completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub pain_location: PainLocation,
    pub step_count: usize,
    pub points_awarded: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SequencerEvent {
    StepStarted {
        id: StepId,
        step_number: usize,
        total: usize,
        text: String,
        duration_secs: u32,
        /// Region to highlight while this step runs.
        focus: PainLocation,
    },
    Countdown {
        id: StepId,
        remaining_secs: u32,
    },
    StepCompleted {
        id: StepId,
        step_number: usize,
        manual: bool,
    },
    SequenceCompleted(Completion),
}

#[derive(Debug)]
pub struct Sequencer<C: Clock> {
    clock: C,
    batch: Vec<InstructionStep>,
    state: SequencerState,
    timer: TimerSlot<Timer>,
    panel_visible: bool,
}

impl<C: Clock> Sequencer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            batch: Vec::new(),
            state: SequencerState::Idle,
            timer: TimerSlot::new(),
            panel_visible: false,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SequencerState::Idle
    }

    /// The batch in progress; empty while idle.
    pub fn batch(&self) -> &[InstructionStep] {
        &self.batch
    }

    pub fn current_step(&self) -> Option<&InstructionStep> {
        match self.state {
            SequencerState::Running { current_index, .. } => self.batch.get(current_index),
            _ => None,
        }
    }

    pub fn remaining_secs(&self) -> Option<u32> {
        match self.state {
            SequencerState::Running { remaining_secs, .. } => Some(remaining_secs),
            _ => None,
        }
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn minimize(&mut self) {
        self.panel_visible = false;
    }

    pub fn restore_panel_view(&mut self) {
        self.panel_visible = true;
    }

    /// Begin running `batch` from its first step.
    pub fn start(&mut self, batch: Vec<InstructionStep>) -> Result<Vec<SequencerEvent>> {
        if !self.is_idle() {
            return Err(StateError::AlreadyRunning.into());
        }
        if batch.is_empty() {
            return Err(InputError::EmptyBatch.into());
        }

        info!(
            steps = batch.len(),
            location = %batch[0].pain_location,
            "starting exercise sequence"
        );

        self.batch = batch;
        for step in &mut self.batch {
            step.active = false;
            step.completed = false;
        }
        self.panel_visible = true;

        let now = self.clock.now();
        Ok(vec![self.begin_step(0, now)])
    }

    /// Fire every timer that is due, in order.
    pub fn poll(&mut self) -> Vec<SequencerEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        while let Some(deadline) = self.timer.take_due(now) {
            match deadline.kind {
                Timer::Countdown => self.on_tick(deadline.due, &mut events),
                Timer::Advance => {
                    if let SequencerState::Resting { next_index } = self.state {
                        events.push(self.begin_step(next_index, deadline.due));
                    }
                }
            }
        }

        events
    }

    /// Finish the current step now, as if its countdown had elapsed.
    pub fn manual_complete(&mut self, id: StepId) -> Result<Vec<SequencerEvent>> {
        match self.state {
            SequencerState::Running { current_index, .. } => {
                let current = self.batch[current_index].id;
                if current != id {
                    return Err(StateError::NotCurrentStep {
                        requested: id,
                        current,
                    }
                    .into());
                }
                let mut events = Vec::new();
                let now = self.clock.now();
                self.complete_current(now, true, &mut events);
                Ok(events)
            }
            SequencerState::Resting { .. } => Err(StateError::Resting.into()),
            SequencerState::Idle => Err(StateError::NotRunning.into()),
        }
    }

    /// Complete whatever step is running, regardless of time left.
    pub fn skip(&mut self) -> Result<Vec<SequencerEvent>> {
        match self.current_step() {
            Some(step) => {
                let id = step.id;
                self.manual_complete(id)
            }
            None if matches!(self.state, SequencerState::Resting { .. }) => {
                Err(StateError::Resting.into())
            }
            None => Err(StateError::NotRunning.into()),
        }
    }

    /// Abandon the batch without awarding anything. Returns whether a
    /// sequence was in progress.
    pub fn cancel(&mut self) -> bool {
        self.timer.cancel();
        if self.is_idle() {
            return false;
        }
        info!(steps = self.batch.len(), "exercise sequence cancelled");
        self.batch.clear();
        self.state = SequencerState::Idle;
        self.panel_visible = false;
        true
    }

    fn begin_step(&mut self, index: usize, at: Duration) -> SequencerEvent {
        let total = self.batch.len();
        let step = &mut self.batch[index];
        step.active = true;

        self.state = SequencerState::Running {
            current_index: index,
            remaining_secs: step.duration_secs,
        };
        self.timer.arm(Timer::Countdown, at + TICK);

        debug!(step = step.step_number, total, secs = step.duration_secs, "step started");

        SequencerEvent::StepStarted {
            id: step.id,
            step_number: step.step_number,
            total,
            text: step.text.clone(),
            duration_secs: step.duration_secs,
            focus: classify_from_instruction_text(&step.text, step.pain_location),
        }
    }

    fn on_tick(&mut self, at: Duration, events: &mut Vec<SequencerEvent>) {
        let SequencerState::Running {
            current_index,
            remaining_secs,
        } = self.state
        else {
            return;
        };

        if remaining_secs <= 1 {
            self.state = SequencerState::Running {
                current_index,
                remaining_secs: 0,
            };
            self.complete_current(at, false, events);
        } else {
            let remaining_secs = remaining_secs - 1;
            self.state = SequencerState::Running {
                current_index,
                remaining_secs,
            };
            self.timer.arm(Timer::Countdown, at + TICK);
            events.push(SequencerEvent::Countdown {
                id: self.batch[current_index].id,
                remaining_secs,
            });
        }
    }

    fn complete_current(&mut self, at: Duration, manual: bool, events: &mut Vec<SequencerEvent>) {
        let SequencerState::Running { current_index, .. } = self.state else {
            return;
        };
        self.timer.cancel();

        let step = &mut self.batch[current_index];
        step.completed = true;
        step.active = false;
        debug!(step = step.step_number, manual, "step completed");
        events.push(SequencerEvent::StepCompleted {
            id: step.id,
            step_number: step.step_number,
            manual,
        });

        if current_index + 1 < self.batch.len() {
            self.state = SequencerState::Resting {
                next_index: current_index + 1,
            };
            self.timer.arm(Timer::Advance, at + REST_BETWEEN_STEPS);
        } else {
            events.push(SequencerEvent::SequenceCompleted(self.finish()));
        }
    }

    fn finish(&mut self) -> Completion {
        let step_count = self.batch.len();
        let completion = Completion {
            pain_location: self
                .batch
                .first()
                .map(|step| step.pain_location)
                .unwrap_or(PainLocation::General),
            step_count,
            points_awarded: points_for(step_count),
        };
        info!(
            steps = step_count,
            points = completion.points_awarded,
            "exercise sequence completed"
        );

        self.timer.cancel();
        self.batch.clear();
        self.state = SequencerState::Idle;
        self.panel_visible = false;
        completion
    }
}
