use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use crate::models::{Question, QuestionContent, QuestionType, Subject};

const QUESTIONS_COLLECTION: &str = "questions";
const COUNTERS_COLLECTION: &str = "counters";

/// Mongo-backed question bank. Questions use numeric ids handed out by
/// an atomic counter document, so ids are unique and monotonically
/// increasing across concurrent creates.
pub struct QuestionBank {
    mongo: Database,
}

impl QuestionBank {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> Collection<Question> {
        self.mongo.collection(QUESTIONS_COLLECTION)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Question>> {
        self.collection()
            .find_one(doc! { "_id": id })
            .await
            .context("Failed to query question by id")
    }

    pub async fn find_all_ids(&self) -> Result<Vec<i64>> {
        let mut cursor = self
            .mongo
            .collection::<Document>(QUESTIONS_COLLECTION)
            .find(doc! {})
            .projection(doc! { "_id": 1 })
            .await
            .context("Failed to query question ids")?;

        let mut ids = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            let id = doc
                .get_i64("_id")
                .or_else(|_| doc.get_i32("_id").map(|v| v as i64))
                .context("Question document has non-numeric _id")?;
            ids.push(id);
        }

        Ok(ids)
    }

    pub async fn count(&self) -> Result<u64> {
        self.collection()
            .count_documents(doc! {})
            .await
            .context("Failed to count questions")
    }

    pub async fn create(
        &self,
        subject: Subject,
        question_type: QuestionType,
        content: QuestionContent,
        ai_check: bool,
        created_by: Option<String>,
    ) -> Result<Question> {
        let id = self.next_id().await?;

        let question = Question {
            id,
            subject,
            question_type,
            content,
            ai_check,
            created_by,
            created_at: Utc::now(),
        };

        self.collection()
            .insert_one(&question)
            .await
            .context("Failed to insert question")?;

        tracing::info!(question_id = id, "Question created");

        Ok(question)
    }

    /// Newest first, page is 1-based.
    pub async fn list(&self, page: i64, page_size: i64) -> Result<(Vec<Question>, u64)> {
        let skip = (page - 1) * page_size;

        let mut cursor = self
            .collection()
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .skip(skip as u64)
            .limit(page_size)
            .await
            .context("Failed to list questions")?;

        let mut questions = Vec::new();
        while let Some(question) = cursor.try_next().await? {
            questions.push(question);
        }

        let total = self.count().await?;

        Ok((questions, total))
    }

    // Atomic counter: one findAndModify per create, upserting the
    // counter document on first use.
    async fn next_id(&self) -> Result<i64> {
        let counters = self.mongo.collection::<Document>(COUNTERS_COLLECTION);

        let updated = counters
            .find_one_and_update(
                doc! { "_id": QUESTIONS_COLLECTION },
                doc! { "$inc": { "seq": 1i64 } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .context("Failed to advance question id counter")?
            .ok_or_else(|| anyhow!("Counter upsert returned no document"))?;

        updated
            .get_i64("seq")
            .or_else(|_| updated.get_i32("seq").map(|v| v as i64))
            .context("Counter document has non-numeric seq")
    }
}
