use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{QuestionContent, QuestionType, Subject};

/// Opaque text -> {subject, type} classifier, reached over HTTP. Used
/// only on the admin question-creation path when `ai_check` is set.
pub struct ClassifierService {
    http_client: Client,
    classifier_url: String,
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    content: &'a QuestionContent,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    subject: Subject,
    #[serde(rename = "type")]
    question_type: QuestionType,
}

impl ClassifierService {
    pub fn new(classifier_url: String) -> Self {
        Self {
            http_client: Client::new(),
            classifier_url,
        }
    }

    /// Classification failures never panic the create path; the caller
    /// surfaces them as a `classification_failed` response.
    pub async fn classify(
        &self,
        content: &QuestionContent,
    ) -> Result<(Subject, QuestionType), ApiError> {
        let response = self
            .http_client
            .post(&self.classifier_url)
            .json(&ClassifyRequest { content })
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "classifier request failed");
                ApiError::ClassificationFailed
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "classifier returned an error status");
            return Err(ApiError::ClassificationFailed);
        }

        // Deserializing into the closed enums is the validation: an
        // unknown subject or type is a classification failure.
        let parsed: ClassifyResponse = response.json().await.map_err(|err| {
            tracing::warn!(error = %err, "classifier returned an unparsable reply");
            ApiError::ClassificationFailed
        })?;

        Ok((parsed.subject, parsed.question_type))
    }
}
