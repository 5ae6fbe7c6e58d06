//! Cosmetic progress while a song is being generated.
//!
//! The endpoint reports no progress, so the bar is simulated: quick early
//! growth that flattens out and parks at 99% until the request resolves.

use rand::Rng;
use std::time::Duration;

pub const PROGRESS_TICK: Duration = Duration::from_millis(400);
pub const MESSAGE_TICK: Duration = Duration::from_millis(2500);

const CEILING: f32 = 99.0;

pub const STATUS_MESSAGES: &[&str] = &[
    "গানের কথা সাজানো হচ্ছে…",
    "সুরের কাঠামো তৈরি হচ্ছে…",
    "ছন্দ আর তাল মেলানো হচ্ছে…",
    "বাদ্যযন্ত্র বাছাই করা হচ্ছে…",
    "স্থায়ী আর স্তবক গোছানো হচ্ছে…",
    "শেষ ছোঁয়া দেওয়া হচ্ছে…",
];

#[derive(Debug, Clone, Default)]
pub struct ProgressSimulator {
    value: f32,
    message_index: usize,
}

impl ProgressSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn percent(&self) -> u16 {
        self.value.round().clamp(0.0, 100.0) as u16
    }

    pub fn message(&self) -> &'static str {
        STATUS_MESSAGES[self.message_index % STATUS_MESSAGES.len()]
    }

    pub fn tick(&mut self) -> f32 {
        let roll = rand::rng().random_range(0.0..1.0);
        self.advance(roll)
    }

    /// Advances by a step scaled by `roll` (expected in `0.0..1.0`).
    pub fn advance(&mut self, roll: f32) -> f32 {
        if self.value >= CEILING {
            return self.value;
        }
        let roll = roll.clamp(0.0, 1.0);
        let step = if self.value < 30.0 {
            4.0 + roll * 6.0
        } else if self.value < 70.0 {
            1.5 + roll * 3.0
        } else if self.value < 90.0 {
            0.5 + roll
        } else {
            0.1 + roll * 0.2
        };
        self.value = (self.value + step).min(CEILING);
        self.value
    }

    pub fn rotate_message(&mut self) -> &'static str {
        self.message_index = (self.message_index + 1) % STATUS_MESSAGES.len();
        self.message()
    }

    pub fn complete(&mut self) {
        self.value = 100.0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
