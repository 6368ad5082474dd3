// Generator: answers a question from the current document set

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::llm::ChatModel;
use super::Generate;
use crate::models::Document;

const GENERATE_SYSTEM: &str = "You are an assistant for question-answering tasks. Answer the question \
using only the retrieved context. If the context does not contain the answer, say that you don't know. \
Use five sentences maximum and keep the answer concise.";

pub struct Generator {
    llm: Arc<dyn ChatModel>,
}

impl Generator {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

/// Joins document contents into one context block, one blank line between documents.
pub fn format_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|document| document.content.trim())
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Generate for Generator {
    async fn generate(&self, question: &str, documents: &[Document]) -> Result<String> {
        info!("Generator: answering from {} documents", documents.len());

        let prompt = format!(
            "Context:\n{}\n\nQuestion: {question}\n\nAnswer:",
            format_context(documents)
        );
        let answer = self.llm.complete(GENERATE_SYSTEM, &prompt).await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for Recorder {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            Ok("  Rust was first released in 2015.\n".to_string())
        }
    }

    #[test]
    fn context_skips_blank_documents() {
        let documents = vec![
            Document::new("alpha"),
            Document::new("   "),
            Document::new(" beta "),
        ];
        assert_eq!(format_context(&documents), "alpha\n\nbeta");
    }

    #[tokio::test]
    async fn generation_is_trimmed_and_prompt_holds_context() {
        let recorder = Arc::new(Recorder::default());
        let generator = Generator::new(recorder.clone());

        let answer = generator
            .generate("When was Rust released?", &[Document::new("Rust 1.0 shipped in May 2015.")])
            .await
            .unwrap();

        assert_eq!(answer, "Rust was first released in 2015.");
        let prompts = recorder.prompts.lock().unwrap();
        assert!(prompts[0].contains("Rust 1.0 shipped in May 2015."));
        assert!(prompts[0].contains("When was Rust released?"));
    }
}
