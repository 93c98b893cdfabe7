//! Turning a free-text assistant reply into an ordered batch of timed steps.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pain::PainLocation;
use crate::util::next_id;

/// Most steps a single batch may hold.
pub const MAX_STEPS: usize = 8;
pub const DEFAULT_STEP_SECS: u32 = 15;

const HOLD_SECS: u32 = 20;
const REPEAT_SECS: u32 = 25;
const STRETCH_SECS: u32 = 30;
const POSITION_SECS: u32 = 10;

static ORDINAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.\s*").expect("valid ordinal regex"));
static BULLET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-•*]\s*").expect("valid bullet regex"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence regex"));
static TIMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+)\s*(second|minute|min|sec)").expect("valid duration regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One guided instruction. Only the sequencer flips `active`/`completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionStep {
    pub id: StepId,
    pub text: String,
    pub pain_location: PainLocation,
    pub step_number: usize,
    pub duration_secs: u32,
    pub completed: bool,
    pub active: bool,
}

impl InstructionStep {
    pub fn new(text: impl Into<String>, pain_location: PainLocation, step_number: usize) -> Self {
        let text = text.into();
        Self {
            id: StepId(next_id()),
            duration_secs: infer_duration(&text),
            text,
            pain_location,
            step_number,
            completed: false,
            active: false,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Lines that look like list items, with their ordinal or bullet removed.
fn structured_candidates(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            ORDINAL_PREFIX.is_match(line) || BULLET_PREFIX.is_match(line) || char_len(line) > 10
        })
        .map(|line| {
            let without_ordinal = ORDINAL_PREFIX.replace(line, "");
            BULLET_PREFIX.replace(&without_ordinal, "").into_owned()
        })
        .filter(|cleaned| char_len(cleaned) > 5)
        .collect()
}

fn sentence_candidates(raw: &str) -> Vec<String> {
    SENTENCE_END
        .split(raw)
        .map(str::trim)
        .filter(|sentence| char_len(sentence) > 10)
        .map(str::to_owned)
        .collect()
}

/// Split an assistant reply into at most [`MAX_STEPS`] steps for `pain_location`.
///
/// Numbered, bulleted or long-enough lines are preferred; when none qualify the
/// text is cut into sentences instead. An empty result is valid and means
/// there is nothing to run.
pub fn extract(raw: &str, pain_location: PainLocation) -> Vec<InstructionStep> {
    let mut candidates = structured_candidates(raw);
    if candidates.is_empty() {
        candidates = sentence_candidates(raw);
    }

    candidates
        .into_iter()
        .take(MAX_STEPS)
        .enumerate()
        .map(|(i, text)| InstructionStep::new(text, pain_location, i + 1))
        .collect()
}

/// Estimate how long an instruction should run, in seconds.
///
/// An explicit "<n> seconds/minutes" wins over keywords. A stated duration of
/// zero (or one too large to represent) falls back to the default so every
/// step runs for a positive time.
pub fn infer_duration(text: &str) -> u32 {
    if let Some(caps) = TIMED.captures(text) {
        let value = caps[1].parse::<u32>().ok();
        let unit = caps[2].to_lowercase();
        let secs = if unit.starts_with("min") {
            value.and_then(|v| v.checked_mul(60))
        } else {
            value
        };
        return match secs {
            Some(secs) if secs > 0 => secs,
            _ => DEFAULT_STEP_SECS,
        };
    }

    let lower = text.to_lowercase();
    if lower.contains("hold") {
        HOLD_SECS
    } else if lower.contains("repeat") {
        REPEAT_SECS
    } else if lower.contains("stretch") {
        STRETCH_SECS
    } else if lower.contains("position") {
        POSITION_SECS
    } else {
        DEFAULT_STEP_SECS
    }
}
