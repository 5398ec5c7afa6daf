use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::pagination::{PageRequest, SortOrder};

// --- Shared enumerations for numbered content (aptitude questions, core concepts) ---

/// Difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| AppError::validation("Invalid difficulty. Must be Easy, Medium, or Hard"))
    }
}

/// ContentStatus
///
/// Publication state. New items start as `Draft`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[ts(export)]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub const ALL: [ContentStatus; 3] = [
        ContentStatus::Draft,
        ContentStatus::Published,
        ContentStatus::Archived,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "Draft",
            ContentStatus::Published => "Published",
            ContentStatus::Archived => "Archived",
        }
    }
}

impl FromStr for ContentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                AppError::validation("Invalid status. Must be Draft, Published, or Archived")
            })
    }
}

/// UserSummary
///
/// The populated form of a `createdBy`/`updatedBy` reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

// --- Listing ---

/// ContentSortField
///
/// Whitelisted sort keys for numbered content. `Number` is the sequence number
/// and `Category` the grouping field (topic or subject).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Number,
    Difficulty,
    Category,
}

/// ContentFilter
///
/// A fully validated list request for numbered content.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub page: PageRequest,
    pub search: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<ContentStatus>,
    pub category: Option<String>,
    pub sort_by: ContentSortField,
    pub sort_order: SortOrder,
}

/// Parses an optional enum-valued query parameter; blank means absent.
pub fn parse_optional<T: FromStr<Err = AppError>>(raw: Option<&str>) -> Result<Option<T>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

// --- Stats & bulk operations ---

/// ContentStats
///
/// Overview counters for the active items of one content type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ContentStats {
    pub total: i64,
    pub published: i64,
    pub draft: i64,
    pub archived: i64,
    pub by_difficulty: BTreeMap<String, i64>,
    /// Counts keyed by topic (aptitude) or subject (core concepts).
    pub by_category: BTreeMap<String, i64>,
}

impl ContentStats {
    /// Accumulates one active item into the counters.
    pub fn record(&mut self, status: ContentStatus, difficulty: Difficulty, category: &str) {
        self.record_group(status, difficulty, category, 1);
    }

    /// Accumulates `count` items sharing the same status, difficulty and category.
    pub fn record_group(
        &mut self,
        status: ContentStatus,
        difficulty: Difficulty,
        category: &str,
        count: i64,
    ) {
        self.total += count;
        match status {
            ContentStatus::Draft => self.draft += count,
            ContentStatus::Published => self.published += count,
            ContentStatus::Archived => self.archived += count,
        }
        *self
            .by_difficulty
            .entry(difficulty.as_str().to_string())
            .or_default() += count;
        *self.by_category.entry(category.to_string()).or_default() += count;
    }
}

/// BulkStatusRequest
///
/// Payload for `PATCH /<resource>/bulk/status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct BulkStatusRequest {
    #[validate(length(min = 1, message = "ids must be a non-empty array"))]
    pub ids: Vec<Uuid>,
    pub status: String,
}

/// BulkStatusResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BulkStatusResponse {
    pub success: bool,
    pub message: String,
    pub modified_count: u64,
}

/// Trims each tag and drops blanks.
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_membership() {
        assert_eq!("Published".parse::<ContentStatus>().unwrap(), ContentStatus::Published);
        assert!("published".parse::<ContentStatus>().is_err());
        assert!("Deleted".parse::<ContentStatus>().is_err());
    }

    #[test]
    fn test_parse_optional_treats_blank_as_absent() {
        assert_eq!(parse_optional::<Difficulty>(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_optional::<Difficulty>(Some("Hard")).unwrap(),
            Some(Difficulty::Hard)
        );
        assert!(parse_optional::<Difficulty>(Some("Impossible")).is_err());
    }

    #[test]
    fn test_stats_record() {
        let mut stats = ContentStats::default();
        stats.record(ContentStatus::Draft, Difficulty::Easy, "Math");
        stats.record(ContentStatus::Published, Difficulty::Easy, "Logic");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.draft, 1);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.by_difficulty["Easy"], 2);
        assert_eq!(stats.by_category["Math"], 1);
    }
}
