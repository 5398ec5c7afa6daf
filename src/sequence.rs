//! Sequence numbering for numbered content.
//!
//! Each content type owns one monotonically increasing counter. A number is
//! handed out exactly once: it is never reassigned on update and never reused
//! after a soft delete, because the counter only moves forward.

use std::collections::HashMap;

use crate::error::AppError;

/// SequenceKind
///
/// The content types that carry a human-facing sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    AptitudeQuestion,
    CoreConcept,
}

impl SequenceKind {
    /// Key of the counter row in `sequence_counters`.
    pub const fn counter_name(&self) -> &'static str {
        match self {
            SequenceKind::AptitudeQuestion => "aptitude_question",
            SequenceKind::CoreConcept => "core_concept",
        }
    }

    pub const fn table(&self) -> &'static str {
        match self {
            SequenceKind::AptitudeQuestion => "aptitude_questions",
            SequenceKind::CoreConcept => "core_concepts",
        }
    }

    pub const fn column(&self) -> &'static str {
        match self {
            SequenceKind::AptitudeQuestion => "question_number",
            SequenceKind::CoreConcept => "concept_number",
        }
    }

    /// Name of the unique constraint guarding the number column.
    pub const fn constraint(&self) -> &'static str {
        match self {
            SequenceKind::AptitudeQuestion => "aptitude_questions_question_number_key",
            SequenceKind::CoreConcept => "core_concepts_concept_number_key",
        }
    }

    /// The retryable error surfaced when the uniqueness backstop trips.
    pub fn conflict(&self) -> AppError {
        let noun = match self {
            SequenceKind::AptitudeQuestion => "Question",
            SequenceKind::CoreConcept => "Concept",
        };
        tracing::warn!(sequence = self.counter_name(), "sequence number collision");
        AppError::conflict(format!("{noun} number already exists, please retry"))
    }
}

/// SequenceCounters
///
/// In-process counters for the in-memory repository. Callers hold the store's
/// write lock while calling `next`, which makes read-and-increment atomic.
#[derive(Debug, Default)]
pub struct SequenceCounters {
    values: HashMap<SequenceKind, i64>,
}

impl SequenceCounters {
    /// Returns the next number for `kind`. On first use the counter is seeded
    /// from `highest_existing`, the largest number ever stored for that kind.
    pub fn next(&mut self, kind: SequenceKind, highest_existing: impl FnOnce() -> i64) -> i64 {
        let value = self.values.entry(kind).or_insert_with(highest_existing);
        *value += 1;
        *value
    }

    pub fn current(&self, kind: SequenceKind) -> i64 {
        self.values.get(&kind).copied().unwrap_or(0)
    }
}
