use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    content::{
        ContentFilter, ContentSortField, ContentStatus, Difficulty, UserSummary, clean_tags,
        parse_optional,
    },
    pagination::{PageRequest, SortOrder, normalize_search},
};

/// CoreConcept
///
/// A numbered study note for a core CS subject (DBMS, OS, networks, ...).
/// Shares the numbering and soft-delete contracts of `AptitudeQuestion`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CoreConcept {
    pub id: Uuid,
    pub concept_number: i64,
    pub title: String,
    pub subject: String,
    pub description: String,
    pub content: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub status: ContentStatus,
    pub created_by: Option<UserSummary>,
    pub updated_by: Option<UserSummary>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CoreConceptDraft
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct CoreConceptDraft {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub content: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub status: ContentStatus,
}

impl CoreConcept {
    pub fn draft(&self) -> CoreConceptDraft {
        CoreConceptDraft {
            title: self.title.clone(),
            subject: self.subject.clone(),
            description: self.description.clone(),
            content: self.content.clone(),
            difficulty: self.difficulty,
            tags: self.tags.clone(),
            status: self.status,
        }
    }
}

/// CreateConceptRequest
///
/// Input payload for `POST /core-concepts`. `difficulty` defaults to Medium.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateConceptRequest {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub content: String,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: Option<String>,
}

impl CreateConceptRequest {
    pub fn into_draft(self) -> AppResult<CoreConceptDraft> {
        let (Some(title), Some(subject), Some(description)) =
            (self.title, self.subject, self.description)
        else {
            return Err(AppError::validation(
                "Title, subject and description are required",
            ));
        };

        let draft = CoreConceptDraft {
            title: title.trim().to_string(),
            subject: subject.trim().to_string(),
            description: description.trim().to_string(),
            content: self.content,
            difficulty: parse_optional(self.difficulty.as_deref())?.unwrap_or(Difficulty::Medium),
            tags: clean_tags(self.tags),
            status: parse_optional(self.status.as_deref())?.unwrap_or_default(),
        };
        draft.validate()?;
        Ok(draft)
    }
}

/// UpdateConceptRequest
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateConceptRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl UpdateConceptRequest {
    pub fn merge_into(self, mut draft: CoreConceptDraft) -> AppResult<CoreConceptDraft> {
        if let Some(title) = self.title {
            draft.title = title.trim().to_string();
        }
        if let Some(subject) = self.subject {
            draft.subject = subject.trim().to_string();
        }
        if let Some(description) = self.description {
            draft.description = description.trim().to_string();
        }
        if let Some(content) = self.content {
            draft.content = content;
        }
        if let Some(difficulty) = self.difficulty {
            draft.difficulty = difficulty.parse()?;
        }
        if let Some(tags) = self.tags {
            draft.tags = clean_tags(tags);
        }
        if let Some(status) = self.status {
            draft.status = status.parse()?;
        }
        draft.validate()?;
        Ok(draft)
    }
}

/// ConceptListQuery
///
/// Raw query parameters for `GET /core-concepts`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ConceptListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Case-insensitive match on title, description or subject.
    pub search: Option<String>,
    pub difficulty: Option<String>,
    pub status: Option<String>,
    pub subject: Option<String>,
    /// One of `createdAt`, `updatedAt`, `conceptNumber`, `difficulty`, `subject`.
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ConceptListQuery {
    pub fn into_filter(self) -> AppResult<ContentFilter> {
        let sort_by = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") | Some("createdAt") => ContentSortField::CreatedAt,
            Some("updatedAt") => ContentSortField::UpdatedAt,
            Some("conceptNumber") => ContentSortField::Number,
            Some("difficulty") => ContentSortField::Difficulty,
            Some("subject") => ContentSortField::Category,
            Some(other) => {
                return Err(AppError::validation(format!(
                    "Cannot sort concepts by '{other}'"
                )));
            }
        };

        Ok(ContentFilter {
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref())?,
            search: normalize_search(self.search),
            difficulty: parse_optional(self.difficulty.as_deref())?,
            status: parse_optional(self.status.as_deref())?,
            category: normalize_search(self.subject),
            sort_by,
            sort_order: SortOrder::parse(self.sort_order.as_deref())?,
        })
    }
}
