use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

use crate::sequencer::Completion;

/// How long the completion banner stays up.
pub const CELEBRATION_DURATION: Duration = Duration::from_secs(4);

const CONFETTI_SYMBOLS: [char; 6] = ['*', '+', '✦', '•', '✓', 'o'];
const CONFETTI_COLORS: usize = 7;
const GRAVITY: f64 = 15.0;

/// Banner shown after a finished sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Celebration {
    pub points: u32,
    pub exercises: usize,
    /// Display name of the region the routine addressed.
    pub kind: &'static str,
    shown_at: Duration,
}

impl Celebration {
    pub fn from_completion(completion: &Completion, shown_at: Duration) -> Self {
        Self {
            points: completion.points_awarded,
            exercises: completion.step_count,
            kind: completion.pain_location.display_name(),
            shown_at,
        }
    }

    pub fn is_active(&self, now: Duration) -> bool {
        now < self.shown_at + CELEBRATION_DURATION
    }

    pub fn headline(&self) -> String {
        format!(
            "+{} points! {} exercises of {} complete",
            self.points, self.exercises, self.kind
        )
    }
}

/// One piece of confetti
#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
    pub age: f64,
    pub max_age: f64,
}

impl Particle {
    fn new<R: Rng>(x: f64, y: f64, rng: &mut R) -> Self {
        Self {
            x,
            y,
            vel_x: rng.gen_range(-3.0..3.0),
            vel_y: rng.gen_range(-4.0..-1.0),
            symbol: *CONFETTI_SYMBOLS.choose(rng).unwrap_or(&'*'),
            color_index: rng.gen_range(0..CONFETTI_COLORS),
            age: 0.0,
            max_age: rng.gen_range(2.0..4.0),
        }
    }

    fn update(&mut self, dt: f64) -> bool {
        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        self.vel_y += GRAVITY * dt;
        self.age += dt;
        self.age < self.max_age
    }
}

/// Particle burst drawn behind the banner. Skipped when reduced motion is on.
#[derive(Debug, Default)]
pub struct Confetti {
    pub particles: Vec<Particle>,
    width: f64,
    height: f64,
}

impl Confetti {
    pub fn burst<R: Rng>(&mut self, width: u16, height: u16, count: usize, rng: &mut R) {
        self.width = width as f64;
        self.height = height as f64;
        let center_x = self.width / 2.0;
        let center_y = self.height / 2.0;

        self.particles.clear();
        for _ in 0..count {
            let x = center_x + rng.gen_range(-15.0..15.0);
            let y = center_y + rng.gen_range(-8.0..8.0);
            self.particles.push(Particle::new(x, y, rng));
        }
    }

    /// Advance by `dt` seconds, dropping dead and off-screen particles.
    pub fn update(&mut self, dt: f64) {
        let buffer = 5.0;
        let (width, height) = (self.width, self.height);
        self.particles.retain_mut(|p| {
            let alive = p.update(dt);
            let off_screen = p.y > height + buffer || p.x < -buffer || p.x > width + buffer;
            alive && !off_screen
        });
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}
