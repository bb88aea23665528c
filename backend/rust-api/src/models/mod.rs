use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of school subjects a question can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    Toan,
    Van,
    Anh,
    Ly,
    Hoa,
    Sinh,
    Su,
    Dia,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Toan => "Toan",
            Subject::Van => "Van",
            Subject::Anh => "Anh",
            Subject::Ly => "Ly",
            Subject::Hoa => "Hoa",
            Subject::Sinh => "Sinh",
            Subject::Su => "Su",
            Subject::Dia => "Dia",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multi,
    Boolean,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Single => "single",
            QuestionType::Multi => "multi",
            QuestionType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub content: String,
    #[serde(rename = "isCorrect", default)]
    pub is_correct: bool,
}

/// Stored question body. The shape is intentionally loose: single/multi
/// questions carry `answers`, boolean questions carry `isTrue`. Grading
/// validates that the fields required by the question's type are
/// actually present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionContent {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnswerOption>>,
    #[serde(rename = "isTrue", default, skip_serializing_if = "Option::is_none")]
    pub is_true: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: i64,
    pub subject: Subject,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: QuestionContent,
    #[serde(default)]
    pub ai_check: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client-facing view of an answer option. Deliberately has no
/// correctness field, so the answer key cannot be serialized by
/// accident.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAnswer {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedContent {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<SanitizedAnswer>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQuestion {
    pub id: i64,
    pub subject: Subject,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: SanitizedContent,
}

impl Question {
    /// Strips the answer key (`isCorrect` / `isTrue`) for serving.
    pub fn sanitize(&self) -> SanitizedQuestion {
        SanitizedQuestion {
            id: self.id,
            subject: self.subject,
            question_type: self.question_type,
            content: SanitizedContent {
                question: self.content.question.clone(),
                answers: self.content.answers.as_ref().map(|answers| {
                    answers
                        .iter()
                        .map(|a| SanitizedAnswer {
                            content: a.content.clone(),
                        })
                        .collect()
                }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAnswerRequest {
    pub question_id: i64,
    #[serde(default)]
    pub selected_index: Option<i64>,
    #[serde(default)]
    pub selected_indices: Option<Vec<i64>>,
    #[serde(default)]
    pub answer: Option<bool>,
    #[serde(default)]
    pub skipped: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub content: QuestionContent,
    #[serde(default)]
    pub subject: Option<Subject>,
    #[serde(rename = "type", default)]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub ai_check: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuestionsQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(rename = "pageSize", default)]
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: mongodb::bson::oid::ObjectId,
    pub username: String,
    pub password: String,
    pub role: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            username: user.username,
            role: user.role,
        }
    }
}

pub mod telemetry;
