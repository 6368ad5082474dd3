// Graders: binary yes/no classifiers backed by the chat model

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::generator::format_context;
use super::llm::ChatModel;
use super::{ClassifyAnswer, ClassifyHallucination, ClassifyRelevance};
use crate::metrics;
use crate::models::Document;

const RELEVANCE_SYSTEM: &str = "You grade whether a retrieved document is relevant to a user question. \
A document is relevant if it shares keywords or meaning with the question; the goal is only to drop \
clearly unrelated retrievals. Reply with JSON {\"binary_score\": \"yes\"} or {\"binary_score\": \"no\"}.";

const HALLUCINATION_SYSTEM: &str = "You grade whether an answer is grounded in a set of documents. \
\"yes\" means every claim in the answer is supported by the documents. \"no\" means it is not. \
Reply with JSON {\"binary_score\": \"yes\"} or {\"binary_score\": \"no\"}.";

const ANSWER_SYSTEM: &str = "You grade whether an answer addresses and resolves a question. \
Reply with JSON {\"binary_score\": \"yes\"} or {\"binary_score\": \"no\"}.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Yes,
    No,
}

#[derive(Deserialize)]
struct BinaryScore {
    binary_score: String,
}

impl Grade {
    pub fn is_yes(self) -> bool {
        self == Grade::Yes
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Yes => "yes",
            Grade::No => "no",
        }
    }

    /// Decodes a model reply. Accepts `{"binary_score": "..."}` (optionally inside a
    /// code fence) or a bare yes/no; anything else is `No`.
    pub fn from_response(raw: &str) -> Self {
        let body = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let decoded = match serde_json::from_str::<BinaryScore>(body) {
            Ok(score) => Self::from_word(&score.binary_score),
            Err(_) => Self::from_word(body),
        };

        decoded.unwrap_or_else(|| {
            warn!(reply = %raw, "Unreadable grade, treating as no");
            Grade::No
        })
    }

    fn from_word(word: &str) -> Option<Self> {
        let word = word
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
            .to_ascii_lowercase();
        match word.as_str() {
            "yes" => Some(Grade::Yes),
            "no" => Some(Grade::No),
            _ => None,
        }
    }
}

pub struct RelevanceGrader {
    llm: Arc<dyn ChatModel>,
}

impl RelevanceGrader {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ClassifyRelevance for RelevanceGrader {
    async fn classify_relevance(&self, question: &str, document: &str) -> Result<Grade> {
        let prompt = format!("Retrieved document:\n\n{document}\n\nUser question: {question}");
        let grade = Grade::from_response(&self.llm.complete_json(RELEVANCE_SYSTEM, &prompt).await?);
        debug!("Relevance grader: {}", grade.as_str());
        metrics::record_grade("relevance", grade);
        Ok(grade)
    }
}

/// `Yes` means the generation IS grounded in the documents.
pub struct HallucinationGrader {
    llm: Arc<dyn ChatModel>,
}

impl HallucinationGrader {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ClassifyHallucination for HallucinationGrader {
    async fn classify_hallucination(&self, documents: &[Document], generation: &str) -> Result<Grade> {
        let prompt = format!(
            "Documents:\n{}\n\nLLM generation: {generation}",
            format_context(documents)
        );
        let grade = Grade::from_response(&self.llm.complete_json(HALLUCINATION_SYSTEM, &prompt).await?);
        debug!("Hallucination grader: grounded={}", grade.as_str());
        metrics::record_grade("hallucination", grade);
        Ok(grade)
    }
}

pub struct AnswerGrader {
    llm: Arc<dyn ChatModel>,
}

impl AnswerGrader {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ClassifyAnswer for AnswerGrader {
    async fn classify_answer_quality(&self, question: &str, generation: &str) -> Result<Grade> {
        let prompt = format!("User question:\n\n{question}\n\nLLM generation: {generation}");
        let grade = Grade::from_response(&self.llm.complete_json(ANSWER_SYSTEM, &prompt).await?);
        debug!("Answer grader: {}", grade.as_str());
        metrics::record_grade("answer", grade);
        Ok(grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    struct CannedModel {
        reply: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedModel {
        fn replying(reply: &'static str) -> Arc<Self> {
            Arc::new(Self { reply: Some(reply), prompts: Mutex::new(Vec::new()) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { reply: None, prompts: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            self.reply
                .map(str::to_string)
                .ok_or_else(|| anyhow!("model unavailable"))
        }
    }

    #[test]
    fn decodes_structured_scores() {
        assert_eq!(Grade::from_response(r#"{"binary_score": "yes"}"#), Grade::Yes);
        assert_eq!(Grade::from_response(r#"{"binary_score": "no"}"#), Grade::No);
        assert_eq!(Grade::from_response(r#"{"binary_score": "YES"}"#), Grade::Yes);
        assert_eq!(
            Grade::from_response("```json\n{\"binary_score\": \"yes\"}\n```"),
            Grade::Yes
        );
    }

    #[test]
    fn decodes_bare_words() {
        assert_eq!(Grade::from_response("Yes."), Grade::Yes);
        assert_eq!(Grade::from_response(" no "), Grade::No);
    }

    #[test]
    fn unreadable_replies_fail_closed() {
        assert_eq!(Grade::from_response(""), Grade::No);
        assert_eq!(Grade::from_response("maybe"), Grade::No);
        assert_eq!(Grade::from_response(r#"{"binary_score": "probably"}"#), Grade::No);
        assert_eq!(Grade::from_response(r#"{"score": "yes"}"#), Grade::No);
    }

    #[tokio::test]
    async fn hallucination_yes_means_grounded() {
        let grader = HallucinationGrader::new(CannedModel::replying(r#"{"binary_score": "yes"}"#));
        let documents = vec![Document::new("Paris is the capital of France.")];

        let grade = grader
            .classify_hallucination(&documents, "The capital of France is Paris.")
            .await
            .unwrap();

        assert_eq!(grade, Grade::Yes);
        assert!(grade.is_yes(), "a yes from the hallucination grader marks a grounded answer");
    }

    #[tokio::test]
    async fn hallucination_prompt_carries_documents_and_generation() {
        let model = CannedModel::replying("no");
        let grader = HallucinationGrader::new(model.clone());
        let documents = vec![Document::new("first fact"), Document::new("second fact")];

        let grade = grader.classify_hallucination(&documents, "made up").await.unwrap();

        assert_eq!(grade, Grade::No);
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("first fact"));
        assert!(prompts[0].contains("second fact"));
        assert!(prompts[0].contains("made up"));
    }

    #[tokio::test]
    async fn relevance_grader_surfaces_model_failures() {
        let grader = RelevanceGrader::new(CannedModel::failing());
        assert!(grader.classify_relevance("question", "document").await.is_err());
    }

    #[tokio::test]
    async fn answer_grader_reads_structured_reply() {
        let grader = AnswerGrader::new(CannedModel::replying(r#"{"binary_score":"no"}"#));
        let grade = grader
            .classify_answer_quality("What is Rust?", "I like turtles.")
            .await
            .unwrap();
        assert_eq!(grade, Grade::No);
    }
}
