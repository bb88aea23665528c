//! Pure grading engine. No I/O, no shared state: given a question's
//! stored answer key and a candidate submission, produces a verdict.
//! The verdict carries the correct answer only when the submission was
//! wrong, so a client never learns more than its own mistake cost.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::ApiError;
use crate::models::{CheckAnswerRequest, QuestionContent, QuestionType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Single { index: i64 },
    Multi { indices: Vec<i64> },
    Boolean { answer: bool },
}

impl Submission {
    /// Extracts the submission field matching the question's type.
    /// A shape mismatch (wrong or missing field) is a validation error.
    pub fn from_request(
        question_type: QuestionType,
        req: &CheckAnswerRequest,
    ) -> Result<Self, ApiError> {
        match question_type {
            QuestionType::Single => req
                .selected_index
                .map(|index| Submission::Single { index })
                .ok_or_else(|| {
                    ApiError::Validation(
                        "questions of type 'single' require 'selectedIndex' (number)".to_string(),
                    )
                }),
            QuestionType::Multi => req
                .selected_indices
                .clone()
                .map(|indices| Submission::Multi { indices })
                .ok_or_else(|| {
                    ApiError::Validation(
                        "questions of type 'multi' require 'selectedIndices' (number[])"
                            .to_string(),
                    )
                }),
            QuestionType::Boolean => req
                .answer
                .map(|answer| Submission::Boolean { answer })
                .ok_or_else(|| {
                    ApiError::Validation(
                        "questions of type 'boolean' require 'answer' (boolean)".to_string(),
                    )
                }),
        }
    }
}

/// Grading result. At most one of the `correct*` feedback fields is
/// populated, and only when `correct == false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub correct: bool,
    #[serde(rename = "correctAnswer", skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<Option<i64>>,
    #[serde(rename = "correctIndices", skip_serializing_if = "Option::is_none")]
    pub correct_indices: Option<Vec<i64>>,
    #[serde(rename = "correctValue", skip_serializing_if = "Option::is_none")]
    pub correct_value: Option<bool>,
}

impl Verdict {
    pub fn correct() -> Self {
        Self {
            correct: true,
            correct_answer: None,
            correct_indices: None,
            correct_value: None,
        }
    }

    /// Used for skipped questions: no grading happened, no feedback.
    pub fn incorrect() -> Self {
        Self {
            correct: false,
            correct_answer: None,
            correct_indices: None,
            correct_value: None,
        }
    }

    fn wrong_single(correct_index: Option<i64>) -> Self {
        Self {
            correct: false,
            correct_answer: Some(correct_index),
            correct_indices: None,
            correct_value: None,
        }
    }

    fn wrong_multi(correct_indices: Vec<i64>) -> Self {
        Self {
            correct: false,
            correct_answer: None,
            correct_indices: Some(correct_indices),
            correct_value: None,
        }
    }

    fn wrong_boolean(correct_value: bool) -> Self {
        Self {
            correct: false,
            correct_answer: None,
            correct_indices: None,
            correct_value: Some(correct_value),
        }
    }
}

/// Grades one submission against the stored answer key. Deterministic:
/// identical inputs always produce identical verdicts.
pub fn grade(
    question_type: QuestionType,
    content: &QuestionContent,
    submission: &Submission,
) -> Result<Verdict, ApiError> {
    match (question_type, submission) {
        (QuestionType::Single, Submission::Single { index }) => grade_single(content, *index),
        (QuestionType::Multi, Submission::Multi { indices }) => grade_multi(content, indices),
        (QuestionType::Boolean, Submission::Boolean { answer }) => grade_boolean(content, *answer),
        _ => Err(ApiError::Validation(
            "submission does not match the question's type".to_string(),
        )),
    }
}

fn grade_single(content: &QuestionContent, index: i64) -> Result<Verdict, ApiError> {
    let answers = content.answers.as_deref().ok_or_else(|| {
        ApiError::MalformedQuestion("single-choice question has no answers".to_string())
    })?;

    if index < 0 || index >= answers.len() as i64 {
        return Err(ApiError::Validation(format!(
            "selectedIndex {} is out of range (0..{})",
            index,
            answers.len()
        )));
    }

    if answers[index as usize].is_correct {
        return Ok(Verdict::correct());
    }

    // If no answer is flagged correct the data is buggy; report null
    // rather than failing the request.
    let correct_index = answers
        .iter()
        .position(|a| a.is_correct)
        .map(|i| i as i64);

    Ok(Verdict::wrong_single(correct_index))
}

fn grade_multi(content: &QuestionContent, indices: &[i64]) -> Result<Verdict, ApiError> {
    let answers = content.answers.as_deref().ok_or_else(|| {
        ApiError::MalformedQuestion("multi-choice question has no answers".to_string())
    })?;

    let correct_set: BTreeSet<i64> = answers
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_correct)
        .map(|(i, _)| i as i64)
        .collect();

    // Order-independent, duplicates collapsed.
    let selected_set: BTreeSet<i64> = indices.iter().copied().collect();

    if selected_set == correct_set {
        Ok(Verdict::correct())
    } else {
        Ok(Verdict::wrong_multi(correct_set.into_iter().collect()))
    }
}

fn grade_boolean(content: &QuestionContent, answer: bool) -> Result<Verdict, ApiError> {
    let correct_value = content.is_true.ok_or_else(|| {
        ApiError::MalformedQuestion("boolean question has no 'isTrue' field".to_string())
    })?;

    if answer == correct_value {
        Ok(Verdict::correct())
    } else {
        Ok(Verdict::wrong_boolean(correct_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerOption;

    fn answers(flags: &[bool]) -> QuestionContent {
        QuestionContent {
            question: "q".to_string(),
            answers: Some(
                flags
                    .iter()
                    .enumerate()
                    .map(|(i, &is_correct)| AnswerOption {
                        content: format!("option {}", i),
                        is_correct,
                    })
                    .collect(),
            ),
            is_true: None,
        }
    }

    fn boolean(is_true: Option<bool>) -> QuestionContent {
        QuestionContent {
            question: "q".to_string(),
            answers: None,
            is_true,
        }
    }

    #[test]
    fn single_correct_choice() {
        let content = answers(&[false, true, false, false]);
        let verdict = grade(
            QuestionType::Single,
            &content,
            &Submission::Single { index: 1 },
        )
        .unwrap();
        assert_eq!(verdict, Verdict::correct());
    }

    #[test]
    fn single_wrong_choice_reports_correct_index() {
        let content = answers(&[false, true, false, false]);
        let verdict = grade(
            QuestionType::Single,
            &content,
            &Submission::Single { index: 0 },
        )
        .unwrap();
        assert!(!verdict.correct);
        assert_eq!(verdict.correct_answer, Some(Some(1)));
    }

    #[test]
    fn single_out_of_range_index_is_rejected() {
        let content = answers(&[true, false]);
        for index in [-1, 2, 100] {
            let err = grade(
                QuestionType::Single,
                &content,
                &Submission::Single { index },
            )
            .unwrap_err();
            assert_eq!(err.kind(), "validation_error");
        }
    }

    #[test]
    fn single_with_no_flagged_answer_reports_null() {
        let content = answers(&[false, false, false]);
        let verdict = grade(
            QuestionType::Single,
            &content,
            &Submission::Single { index: 2 },
        )
        .unwrap();
        assert!(!verdict.correct);
        assert_eq!(verdict.correct_answer, Some(None));
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("\"correctAnswer\":null"));
    }

    #[test]
    fn multi_exact_set_match_in_any_order() {
        let content = answers(&[true, false, false, true]);
        for indices in [vec![0, 3], vec![3, 0], vec![3, 0, 3, 0]] {
            let verdict = grade(
                QuestionType::Multi,
                &content,
                &Submission::Multi { indices },
            )
            .unwrap();
            assert_eq!(verdict, Verdict::correct());
        }
    }

    #[test]
    fn multi_partial_selection_reports_full_correct_set() {
        let content = answers(&[true, false, false, true]);
        let verdict = grade(
            QuestionType::Multi,
            &content,
            &Submission::Multi { indices: vec![0] },
        )
        .unwrap();
        assert!(!verdict.correct);
        assert_eq!(verdict.correct_indices, Some(vec![0, 3]));
    }

    #[test]
    fn multi_superset_is_wrong() {
        let content = answers(&[true, false, true]);
        let verdict = grade(
            QuestionType::Multi,
            &content,
            &Submission::Multi {
                indices: vec![0, 1, 2],
            },
        )
        .unwrap();
        assert!(!verdict.correct);
    }

    #[test]
    fn multi_with_zero_correct_answers() {
        let content = answers(&[false, false]);
        let verdict = grade(
            QuestionType::Multi,
            &content,
            &Submission::Multi { indices: vec![] },
        )
        .unwrap();
        assert!(verdict.correct);
    }

    #[test]
    fn boolean_grading() {
        let content = boolean(Some(true));
        let wrong = grade(
            QuestionType::Boolean,
            &content,
            &Submission::Boolean { answer: false },
        )
        .unwrap();
        assert!(!wrong.correct);
        assert_eq!(wrong.correct_value, Some(true));

        let right = grade(
            QuestionType::Boolean,
            &content,
            &Submission::Boolean { answer: true },
        )
        .unwrap();
        assert_eq!(right, Verdict::correct());
    }

    #[test]
    fn boolean_without_key_is_malformed() {
        let content = boolean(None);
        let err = grade(
            QuestionType::Boolean,
            &content,
            &Submission::Boolean { answer: true },
        )
        .unwrap_err();
        assert_eq!(err.kind(), "malformed_question");
    }

    #[test]
    fn grading_is_idempotent() {
        let content = answers(&[false, true]);
        let submission = Submission::Single { index: 0 };
        let a = grade(QuestionType::Single, &content, &submission).unwrap();
        let b = grade(QuestionType::Single, &content, &submission).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn verdict_json_omits_unused_feedback_fields() {
        let json = serde_json::to_string(&Verdict::correct()).unwrap();
        assert_eq!(json, "{\"correct\":true}");
    }

    #[test]
    fn submission_extraction_validates_shape() {
        let req: CheckAnswerRequest =
            serde_json::from_str(r#"{"questionId":1,"answer":true}"#).unwrap();
        assert!(Submission::from_request(QuestionType::Single, &req).is_err());
        assert!(Submission::from_request(QuestionType::Boolean, &req).is_ok());
    }
}
