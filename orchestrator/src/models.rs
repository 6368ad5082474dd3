use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::{Answer, Step};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileReference {
    pub id: i32,
    pub title: Option<String>,
    pub file_name: Option<String>,
    pub web_link: Option<String>,
    pub reference_id: String,
    pub created_at: DateTime<Utc>,
}

/// A chunk of text handed between the retriever, graders and generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

// Ingestion service payloads
#[derive(Debug, Deserialize)]
pub struct Extraction {
    #[serde(default)]
    pub passages: Vec<Passage>,
}

#[derive(Debug, Deserialize)]
pub struct Passage {
    #[serde(default)]
    pub text: String,
    pub page: Option<i64>,
}

// API Request/Response models
#[derive(Debug, Deserialize)]
pub struct UploadLinkRequest {
    pub title: Option<String>,
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub result: String,
    pub reference_id: String,
    pub title: Option<String>,
    pub passages_count: usize,
}

#[derive(Debug, Serialize)]
pub struct FileDetails {
    #[serde(flatten)]
    pub reference: FileReference,
    pub chunks: Vec<Document>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionParams {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SragResponse {
    pub question: String,
    pub answer: String,
    pub status: String,
    pub steps: usize,
    #[serde(default)]
    pub trace: Vec<Step>,
}

impl SragResponse {
    /// A cached answer echoed back with the caller's own wording of the question.
    pub fn asked_as(mut self, question: &str) -> Self {
        self.question = question.to_string();
        self
    }
}

impl From<Answer> for SragResponse {
    fn from(answer: Answer) -> Self {
        Self {
            status: answer.outcome.status().to_string(),
            question: answer.question,
            answer: answer.answer,
            steps: answer.trace.len(),
            trace: answer.trace,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RagResponse {
    pub reference_id: String,
    pub question: String,
    pub answer: String,
    pub sources: usize,
}
