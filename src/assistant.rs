//! Response generation for chat messages.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::catalog::{self, Routine};
use crate::error::{LimberError, Result};
use crate::pain::PainLocation;

/// Produces the free-text reply the extractor turns into steps.
pub trait Assistant {
    fn respond(&mut self, message: &str, location: PainLocation) -> Result<String>;
}

/// Answers from the embedded routine catalog, picking one of the region's
/// replies at random.
#[derive(Debug)]
pub struct ScriptedAssistant {
    routines: Vec<Routine>,
    rng: StdRng,
}

impl ScriptedAssistant {
    pub fn new() -> Result<Self> {
        Ok(Self {
            routines: catalog::routines()?,
            rng: StdRng::from_entropy(),
        })
    }

    /// Deterministic variant choice, for tests and reproducible demos.
    pub fn seeded(seed: u64) -> Result<Self> {
        Ok(Self {
            routines: catalog::routines()?,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn replies_for(&self, location: PainLocation) -> &[String] {
        replies_in(&self.routines, location)
    }
}

fn replies_in(routines: &[Routine], location: PainLocation) -> &[String] {
    routines
        .iter()
        .find(|r| r.location == location)
        .map(|r| r.replies.as_slice())
        .unwrap_or_default()
}

impl Assistant for ScriptedAssistant {
    fn respond(&mut self, _message: &str, location: PainLocation) -> Result<String> {
        let replies = match replies_in(&self.routines, location) {
            [] => replies_in(&self.routines, PainLocation::General),
            replies => replies,
        };
        let reply = replies
            .choose(&mut self.rng)
            .ok_or_else(|| LimberError::Assistant(format!("no routine for {location}")))?;
        Ok(reply.clone())
    }
}
