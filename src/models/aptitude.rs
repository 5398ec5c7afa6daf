use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
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

/// AnswerOption
///
/// One of the four option keys of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }
}

impl FromStr for AnswerOption {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            "D" => Ok(AnswerOption::D),
            _ => Err(AppError::validation("Correct answer must be A, B, C, or D")),
        }
    }
}

/// QuestionOptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub struct QuestionOptions {
    #[validate(length(min = 1, message = "Option A is required"))]
    pub a: String,
    #[validate(length(min = 1, message = "Option B is required"))]
    pub b: String,
    #[validate(length(min = 1, message = "Option C is required"))]
    pub c: String,
    #[validate(length(min = 1, message = "Option D is required"))]
    pub d: String,
}

impl QuestionOptions {
    pub fn trimmed(self) -> Self {
        Self {
            a: self.a.trim().to_string(),
            b: self.b.trim().to_string(),
            c: self.c.trim().to_string(),
            d: self.d.trim().to_string(),
        }
    }
}

/// AptitudeQuestion
///
/// A numbered multiple-choice question. `question_number` is assigned once, on
/// creation, and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AptitudeQuestion {
    pub id: Uuid,
    pub question_number: i64,
    pub question: String,
    pub options: QuestionOptions,
    pub correct_answer: AnswerOption,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub topic: String,
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

/// AptitudeDraft
///
/// The client-editable content of a question. Create builds one from the
/// request; update merges the request into the stored one. Either way it is
/// validated before reaching the repository.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct AptitudeDraft {
    #[validate(length(min = 1, message = "Question text is required"))]
    pub question: String,
    #[validate(nested)]
    pub options: QuestionOptions,
    pub correct_answer: AnswerOption,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    #[validate(length(min = 1, message = "Topic is required"))]
    pub topic: String,
    pub tags: Vec<String>,
    pub status: ContentStatus,
}

impl AptitudeQuestion {
    pub fn draft(&self) -> AptitudeDraft {
        AptitudeDraft {
            question: self.question.clone(),
            options: self.options.clone(),
            correct_answer: self.correct_answer,
            explanation: self.explanation.clone(),
            difficulty: self.difficulty,
            topic: self.topic.clone(),
            tags: self.tags.clone(),
            status: self.status,
        }
    }
}

// --- Request payloads ---

/// CreateAptitudeRequest
///
/// Input payload for `POST /aptitude`. Enumerated fields are carried as strings
/// so membership failures produce a readable 400.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateAptitudeRequest {
    pub question: Option<String>,
    pub options: Option<QuestionOptions>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub difficulty: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: Option<String>,
}

impl CreateAptitudeRequest {
    pub fn into_draft(self) -> AppResult<AptitudeDraft> {
        let (Some(question), Some(options), Some(correct_answer), Some(difficulty), Some(topic)) = (
            self.question,
            self.options,
            self.correct_answer,
            self.difficulty,
            self.topic,
        ) else {
            return Err(AppError::validation(
                "Question, options, correctAnswer, difficulty and topic are required",
            ));
        };

        let draft = AptitudeDraft {
            question: question.trim().to_string(),
            options: options.trimmed(),
            correct_answer: correct_answer.parse()?,
            explanation: self.explanation.filter(|e| !e.trim().is_empty()),
            difficulty: difficulty.parse()?,
            topic: topic.trim().to_string(),
            tags: clean_tags(self.tags),
            status: parse_optional(self.status.as_deref())?.unwrap_or_default(),
        };
        draft.validate()?;
        Ok(draft)
    }
}

/// UpdateAptitudeRequest
///
/// Partial update payload for `PUT /aptitude/{id}`; present fields replace the
/// stored ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateAptitudeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<QuestionOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl UpdateAptitudeRequest {
    pub fn merge_into(self, mut draft: AptitudeDraft) -> AppResult<AptitudeDraft> {
        if let Some(question) = self.question {
            draft.question = question.trim().to_string();
        }
        if let Some(options) = self.options {
            draft.options = options.trimmed();
        }
        if let Some(answer) = self.correct_answer {
            draft.correct_answer = answer.parse()?;
        }
        if let Some(explanation) = self.explanation {
            draft.explanation = Some(explanation).filter(|e| !e.trim().is_empty());
        }
        if let Some(difficulty) = self.difficulty {
            draft.difficulty = difficulty.parse()?;
        }
        if let Some(topic) = self.topic {
            draft.topic = topic.trim().to_string();
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

// --- Listing ---

/// AptitudeListQuery
///
/// Raw query parameters for `GET /aptitude`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AptitudeListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Case-insensitive match on question, topic or explanation.
    pub search: Option<String>,
    pub difficulty: Option<String>,
    pub status: Option<String>,
    pub topic: Option<String>,
    /// One of `createdAt`, `updatedAt`, `questionNumber`, `difficulty`, `topic`.
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl AptitudeListQuery {
    pub fn into_filter(self) -> AppResult<ContentFilter> {
        let sort_by = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") | Some("createdAt") => ContentSortField::CreatedAt,
            Some("updatedAt") => ContentSortField::UpdatedAt,
            Some("questionNumber") => ContentSortField::Number,
            Some("difficulty") => ContentSortField::Difficulty,
            Some("topic") => ContentSortField::Category,
            Some(other) => {
                return Err(AppError::validation(format!(
                    "Cannot sort questions by '{other}'"
                )));
            }
        };

        Ok(ContentFilter {
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref())?,
            search: normalize_search(self.search),
            difficulty: parse_optional(self.difficulty.as_deref())?,
            status: parse_optional(self.status.as_deref())?,
            category: normalize_search(self.topic),
            sort_by,
            sort_order: SortOrder::parse(self.sort_order.as_deref())?,
        })
    }
}
