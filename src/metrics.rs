use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One mismatched reference position, recorded at completion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub position: usize,
    pub expected: char,
    /// `None` when the position was never typed
    pub actual: Option<char>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Correct characters per minute
    pub speed: u32,
    /// Percentage of reference positions typed correctly, one decimal place
    pub accuracy: f64,
    pub error_count: usize,
    pub errors: Vec<ErrorRecord>,
}

impl Metrics {
    pub fn is_perfect(&self) -> bool {
        self.error_count == 0
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Scores the final input against the reference.
///
/// Only the first `reference.len()` typed characters are considered.
pub fn compute(reference: &[char], input: &[char], elapsed: Duration) -> Metrics {
    let mut correct_chars = 0usize;
    let mut errors = Vec::new();

    for (position, &expected) in reference.iter().enumerate() {
        let actual = input.get(position).copied();
        if actual == Some(expected) {
            correct_chars += 1;
        } else {
            errors.push(ErrorRecord {
                position,
                expected,
                actual,
            });
        }
    }

    let accuracy = if reference.is_empty() {
        100.0
    } else {
        round1(correct_chars as f64 / reference.len() as f64 * 100.0)
    };

    let elapsed_minutes = elapsed.as_secs_f64() / 60.0;
    let speed = if elapsed_minutes > 0.0 {
        (correct_chars as f64 / elapsed_minutes).round() as u32
    } else {
        0
    };

    Metrics {
        speed,
        accuracy,
        error_count: errors.len(),
        errors,
    }
}

pub fn compute_str(reference: &str, input: &str, elapsed: Duration) -> Metrics {
    let reference: Vec<char> = reference.chars().collect();
    let input: Vec<char> = input.chars().collect();
    compute(&reference, &input, elapsed)
}
