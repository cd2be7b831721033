use crate::survey::{Question, QuestionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Raw survey session row; `answers` and `history` are JSONB columns.
#[derive(Debug, Clone, FromRow)]
pub struct SurveySessionRow {
    pub id: i64,
    pub user_id: i64,
    pub survey_key: String,
    pub status: String,
    pub current_question_id: Option<String>,
    pub answers: serde_json::Value,
    pub history: serde_json::Value,
    pub version: i32,
    pub back_used: bool,
    pub awarded_promo_code_id: Option<i64>,
    pub report_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-facing view of a question, flattened from the definition.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionPayload {
    pub id: String,
    pub kind: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_select: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
}

impl From<&Question> for QuestionPayload {
    fn from(q: &Question) -> Self {
        let (kind, options, min, max, max_select, max_len) = match &q.kind {
            QuestionKind::Slider { min, max } => {
                ("slider", None, Some(*min), Some(*max), None, None)
            }
            QuestionKind::Single { options } => {
                ("single", Some(options.clone()), None, None, None, None)
            }
            QuestionKind::Multi {
                options,
                max_select,
            } => ("multi", Some(options.clone()), None, None, *max_select, None),
            QuestionKind::Text { max_len } => ("text", None, None, None, None, Some(*max_len)),
        };
        Self {
            id: q.id.clone(),
            kind: kind.to_string(),
            prompt: q.prompt.clone(),
            options,
            min,
            max,
            max_select,
            max_len,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SurveyStateResponse {
    pub survey_key: String,
    pub status: String,
    pub version: i32,
    pub back_used: bool,
    pub answered_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awarded_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    pub question_id: String,
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    pub version: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BackRequest {
    pub version: i32,
}
