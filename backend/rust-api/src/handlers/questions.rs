use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middlewares::auth::JwtClaims;
use crate::models::{CreateQuestionRequest, ListQuestionsQuery, Question, QuestionType};
use crate::services::{classifier::ClassifierService, question_bank::QuestionBank, AppState};

/// POST /admin/questions - admin-only. With `ai_check` the classifier
/// decides subject and type, overriding whatever the client sent.
pub async fn create_question(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Json(req): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.question.trim().is_empty() {
        return Err(ApiError::Validation(
            "'content.question' must not be empty".to_string(),
        ));
    }

    let (subject, question_type) = if req.ai_check {
        let classifier = ClassifierService::new(state.config.classifier_url.clone());
        classifier.classify(&req.content).await?
    } else {
        let subject = req.subject.ok_or_else(|| {
            ApiError::Validation("'subject' is required when ai_check=false".to_string())
        })?;
        let question_type = req.question_type.ok_or_else(|| {
            ApiError::Validation("'type' is required when ai_check=false".to_string())
        })?;
        (subject, question_type)
    };

    validate_content_shape(question_type, &req.content)?;

    let bank = QuestionBank::new(state.mongo.clone());
    let question = bank
        .create(
            subject,
            question_type,
            req.content,
            req.ai_check,
            Some(claims.sub.clone()),
        )
        .await
        .map_err(ApiError::storage)?;

    tracing::info!(
        question_id = question.id,
        created_by = %claims.username,
        "question created by admin"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "question": question_view(&question) })),
    ))
}

/// GET /admin/questions?page=&pageSize= - paginated listing, newest
/// first, answer keys included (admin view).
pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuestionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10);

    if page < 1 || page_size < 1 {
        return Err(ApiError::Validation(
            "page and pageSize must be integers >= 1".to_string(),
        ));
    }

    let bank = QuestionBank::new(state.mongo.clone());
    let (questions, total) = bank
        .list(page, page_size)
        .await
        .map_err(ApiError::storage)?;

    let formatted: Vec<serde_json::Value> = questions.iter().map(list_entry).collect();

    Ok(Json(json!({
        "page": page,
        "pageSize": page_size,
        "total": total,
        "questions": formatted,
    })))
}

fn validate_content_shape(
    question_type: QuestionType,
    content: &crate::models::QuestionContent,
) -> Result<(), ApiError> {
    match question_type {
        QuestionType::Single | QuestionType::Multi => {
            let answers = content.answers.as_deref().ok_or_else(|| {
                ApiError::Validation(
                    "single/multi questions require 'content.answers'".to_string(),
                )
            })?;
            if answers.is_empty() {
                return Err(ApiError::Validation(
                    "'content.answers' must not be empty".to_string(),
                ));
            }
            if question_type == QuestionType::Single {
                let correct = answers.iter().filter(|a| a.is_correct).count();
                if correct != 1 {
                    return Err(ApiError::Validation(format!(
                        "single questions need exactly one correct answer, found {}",
                        correct
                    )));
                }
            }
        }
        QuestionType::Boolean => {
            if content.is_true.is_none() {
                return Err(ApiError::Validation(
                    "boolean questions require 'content.isTrue'".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn question_view(question: &Question) -> serde_json::Value {
    json!({
        "id": question.id,
        "subject": question.subject,
        "type": question.question_type,
        "content": question.content,
        "ai_check": question.ai_check,
    })
}

// Admin listing flattens the content: single/multi expose the answers
// array, boolean exposes the stored truth value.
fn list_entry(question: &Question) -> serde_json::Value {
    let answers = match question.question_type {
        QuestionType::Single | QuestionType::Multi => {
            json!(question.content.answers.clone().unwrap_or_default())
        }
        QuestionType::Boolean => json!(question.content.is_true),
    };

    json!({
        "id": question.id,
        "subject": question.subject,
        "type": question.question_type,
        "question": question.content.question,
        "answers": answers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerOption, QuestionContent};

    fn content(answers: Option<Vec<AnswerOption>>, is_true: Option<bool>) -> QuestionContent {
        QuestionContent {
            question: "q".to_string(),
            answers,
            is_true,
        }
    }

    #[test]
    fn single_requires_exactly_one_correct_answer() {
        let two_correct = content(
            Some(vec![
                AnswerOption {
                    content: "a".into(),
                    is_correct: true,
                },
                AnswerOption {
                    content: "b".into(),
                    is_correct: true,
                },
            ]),
            None,
        );
        assert!(validate_content_shape(QuestionType::Single, &two_correct).is_err());
        assert!(validate_content_shape(QuestionType::Multi, &two_correct).is_ok());
    }

    #[test]
    fn boolean_requires_is_true() {
        let missing = content(None, None);
        assert!(validate_content_shape(QuestionType::Boolean, &missing).is_err());
        let present = content(None, Some(false));
        assert!(validate_content_shape(QuestionType::Boolean, &present).is_ok());
    }

    #[test]
    fn choice_types_require_answers() {
        let missing = content(None, None);
        assert!(validate_content_shape(QuestionType::Multi, &missing).is_err());
    }
}
