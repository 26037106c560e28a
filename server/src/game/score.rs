use shared::constants::{CAPTURE_BONUS, SCORE_INTERVAL};

/// A team's score: a proximity value that only ratchets upward between
/// captures, plus capture and loss counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    value: f32,
    captures: u32,
    losses: u32,
    timer: f32,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn captures(&self) -> u32 {
        self.captures
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn total(&self) -> f32 {
        CAPTURE_BONUS * (self.captures as f32 - self.losses as f32) + self.value
    }

    /// Keeps the larger of the current value and `candidate`.
    pub fn offer(&mut self, candidate: f32) {
        self.value = self.value.max(candidate);
    }

    pub fn record_capture(&mut self) {
        self.value = 0.0;
        self.captures += 1;
    }

    pub fn record_loss(&mut self) {
        self.losses += 1;
    }

    /// Advances the scoring timer. Returns true once per elapsed interval.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.timer += dt;
        if self.timer > SCORE_INTERVAL {
            self.timer = 0.0;
            return true;
        }
        false
    }
}
