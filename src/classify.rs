use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum_macros::Display)]
pub enum CharStatus {
    Pending,
    Correct,
    Incorrect,
}

/// Per-character view of the input against the reference text
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Classification {
    pub statuses: Vec<CharStatus>,
    pub is_valid_prefix: bool,
}

impl Classification {
    pub fn correct_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s == CharStatus::Correct)
            .count()
    }

    pub fn incorrect_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s == CharStatus::Incorrect)
            .count()
    }
}

/// Classifies every reference position against the typed input.
///
/// Statuses always have the reference's length; input typed past the end of
/// the reference only affects `is_valid_prefix`.
pub fn classify(reference: &[char], input: &[char]) -> Classification {
    let statuses = reference
        .iter()
        .enumerate()
        .map(|(idx, expected)| match input.get(idx) {
            None => CharStatus::Pending,
            Some(typed) if typed == expected => CharStatus::Correct,
            Some(_) => CharStatus::Incorrect,
        })
        .collect();

    Classification {
        statuses,
        is_valid_prefix: reference.starts_with(input),
    }
}

pub fn classify_str(reference: &str, input: &str) -> Classification {
    let reference: Vec<char> = reference.chars().collect();
    let input: Vec<char> = input.chars().collect();
    classify(&reference, &input)
}
