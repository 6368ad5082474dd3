use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::models::Document;

pub mod doc_store;
pub mod generator;
pub mod grader;
pub mod llm;
pub mod retriever;
pub mod rewriter;
pub mod web_search;

pub use grader::Grade;

// Redis channel for finished corrective RAG runs
pub const SRAG_EVENTS_CHANNEL: &str = "srag:events";

#[async_trait]
pub trait Retrieve: Send + Sync {
    async fn retrieve(&self, question: &str) -> Result<Vec<Document>>;
}

/// Retrieval restricted to chosen references, for single-pass answers.
#[async_trait]
pub trait RetrieveWithin: Send + Sync {
    async fn retrieve_within(&self, question: &str, reference_ids: &[String]) -> Result<Vec<Document>>;
}

#[async_trait]
pub trait ClassifyRelevance: Send + Sync {
    async fn classify_relevance(&self, question: &str, document: &str) -> Result<Grade>;
}

#[async_trait]
pub trait ClassifyHallucination: Send + Sync {
    /// `Grade::Yes` means the generation is grounded in `documents`.
    async fn classify_hallucination(&self, documents: &[Document], generation: &str) -> Result<Grade>;
}

#[async_trait]
pub trait ClassifyAnswer: Send + Sync {
    async fn classify_answer_quality(&self, question: &str, generation: &str) -> Result<Grade>;
}

#[async_trait]
pub trait RewriteQuery: Send + Sync {
    async fn rewrite_query(&self, question: &str) -> Result<String>;
}

#[async_trait]
pub trait SearchWeb: Send + Sync {
    async fn web_search(&self, question: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, question: &str, documents: &[Document]) -> Result<String>;
}

/// The capabilities the corrective RAG loop is wired from.
#[derive(Clone)]
pub struct Agents {
    pub retriever: Arc<dyn Retrieve>,
    pub relevance: Arc<dyn ClassifyRelevance>,
    pub hallucination: Arc<dyn ClassifyHallucination>,
    pub answer: Arc<dyn ClassifyAnswer>,
    pub rewriter: Arc<dyn RewriteQuery>,
    pub web_search: Arc<dyn SearchWeb>,
    pub generator: Arc<dyn Generate>,
}

impl Agents {
    pub fn new(
        config: &Config,
        llm: Arc<dyn llm::ChatModel>,
        retriever: Arc<retriever::RetrieverAgent>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            retriever,
            relevance: Arc::new(grader::RelevanceGrader::new(llm.clone())),
            hallucination: Arc::new(grader::HallucinationGrader::new(llm.clone())),
            answer: Arc::new(grader::AnswerGrader::new(llm.clone())),
            rewriter: Arc::new(rewriter::QueryRewriter::new(llm.clone())),
            web_search: Arc::new(web_search::WebSearchAgent::new(http, config)),
            generator: Arc::new(generator::Generator::new(llm)),
        }
    }
}
