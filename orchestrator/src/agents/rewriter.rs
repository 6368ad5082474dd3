// Query Rewriter: reformulates a question for vector-store retrieval

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::llm::ChatModel;
use super::RewriteQuery;

const REWRITE_SYSTEM: &str = "You rewrite questions into a better version optimized for vector-store \
retrieval. Reason about the underlying semantic intent. Reply with the improved question only.";

pub struct QueryRewriter {
    llm: Arc<dyn ChatModel>,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RewriteQuery for QueryRewriter {
    async fn rewrite_query(&self, question: &str) -> Result<String> {
        let prompt = format!("Here is the initial question:\n\n{question}\n\nFormulate an improved question.");
        let rewritten = self.llm.complete(REWRITE_SYSTEM, &prompt).await?;
        let rewritten = rewritten.trim().trim_matches('"').trim().to_string();

        info!("Rewriter: '{}' -> '{}'", question, rewritten);
        Ok(rewritten)
    }
}
