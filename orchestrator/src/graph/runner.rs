// Drives a question through the corrective RAG states until it is answered or gives up

use futures::future::join_all;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use super::state::{transition, Event, SessionState, Step, Verdict};
use super::{Answer, LoopLimits, Outcome};
use crate::agents::web_search::snippets_to_document;
use crate::agents::{Agents, Grade};
use crate::error::PipelineError;
use crate::metrics;
use crate::models::Document;

pub struct CorrectiveRag {
    agents: Agents,
    limits: LoopLimits,
}

impl CorrectiveRag {
    pub fn new(agents: Agents, limits: LoopLimits) -> Self {
        Self { agents, limits }
    }

    pub fn agents(&self) -> &Agents {
        &self.agents
    }

    /// Runs the loop for one question. Every call starts from a fresh session, so
    /// concurrent questions never share retry budgets.
    #[instrument(skip(self))]
    pub async fn answer(&self, question: &str) -> Result<Answer, PipelineError> {
        let result = self.drive(question).await;
        match &result {
            Ok(answer) => metrics::record_outcome(answer.outcome),
            Err(_) => metrics::record_run("failed"),
        }
        result
    }

    async fn drive(&self, question: &str) -> Result<Answer, PipelineError> {
        let deadline = Instant::now() + self.limits.deadline;
        let mut session = SessionState::new(question);
        let mut trace = Vec::new();
        let mut step = Step::Retrieve;

        let outcome = loop {
            let event = match timeout_at(deadline, self.run_step(step, &mut session)).await {
                Ok(Ok(Some(event))) => event,
                Ok(Ok(None)) => break Outcome::Useful,
                Ok(Err(err)) => return Err(err),
                Err(_) => break Outcome::DeadlineExceeded,
            };
            trace.push(step);
            metrics::record_step(step);

            step = transition(&mut session, event, &self.limits);
            debug!(next = step.as_str(), retrieval_attempts = session.retrieval_attempts, "Transition");

            if step == Step::Generate
                && session.generation_attempts >= self.limits.max_generation_attempts
            {
                break Outcome::GenerationLimit;
            }
            if step != Step::Done && trace.len() >= self.limits.max_steps as usize {
                break Outcome::StepLimit;
            }
        };

        if outcome != Outcome::Useful {
            warn!(outcome = outcome.as_str(), steps = trace.len(), "Giving up on question");
        }

        match session.generation {
            Some(answer) => Ok(Answer {
                question: question.to_string(),
                answer,
                outcome,
                trace,
            }),
            None => Err(PipelineError::NoAnswer { steps: trace.len() }),
        }
    }

    /// Executes one state. `None` means the terminal state was reached.
    async fn run_step(
        &self,
        step: Step,
        session: &mut SessionState,
    ) -> Result<Option<Event>, PipelineError> {
        let event = match step {
            Step::Retrieve => {
                let documents = self
                    .agents
                    .retriever
                    .retrieve(&session.question)
                    .await
                    .map_err(PipelineError::Retrieval)?;
                info!("Retrieved {} candidate documents", documents.len());
                session.documents = documents;
                Event::Retrieved
            }
            Step::GradeDocuments => {
                let candidates = std::mem::take(&mut session.documents);
                session.documents = self.grade_documents(&session.question, candidates).await;
                info!("{} documents graded relevant", session.documents.len());
                Event::Graded { relevant: session.documents.len() }
            }
            Step::Generate => {
                let generation = self
                    .agents
                    .generator
                    .generate(&session.question, &session.documents)
                    .await
                    .map_err(PipelineError::Generation)?;
                let verdict = self.judge(&session.question, &session.documents, &generation).await;
                session.generation = Some(generation);
                Event::Judged(verdict)
            }
            Step::TransformQuery => {
                match self.agents.rewriter.rewrite_query(&session.question).await {
                    Ok(rewritten) if !rewritten.trim().is_empty() => session.question = rewritten,
                    Ok(_) => warn!("Rewriter returned an empty question, keeping the current one"),
                    Err(err) => warn!("Rewriter failed, keeping the current question: {:#}", err),
                }
                Event::Rewritten
            }
            Step::WebSearch => {
                let snippets = self
                    .agents
                    .web_search
                    .web_search(&session.question)
                    .await
                    .map_err(PipelineError::WebSearch)?;
                info!("Falling back to web search ({} snippets)", snippets.len());
                session.documents = vec![snippets_to_document(&snippets)];
                Event::Searched
            }
            Step::Done => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Grades all candidates concurrently and keeps the relevant ones in retrieval order.
    /// A failed grade excludes the document.
    async fn grade_documents(&self, question: &str, candidates: Vec<Document>) -> Vec<Document> {
        let grades = join_all(
            candidates
                .iter()
                .map(|document| self.agents.relevance.classify_relevance(question, &document.content)),
        )
        .await;

        candidates
            .into_iter()
            .zip(grades)
            .filter_map(|(document, grade)| match grade {
                Ok(Grade::Yes) => Some(document),
                Ok(Grade::No) => None,
                Err(err) => {
                    warn!("Relevance grader failed, excluding document: {:#}", err);
                    None
                }
            })
            .collect()
    }

    async fn judge(&self, question: &str, documents: &[Document], generation: &str) -> Verdict {
        let grounded = self
            .agents
            .hallucination
            .classify_hallucination(documents, generation)
            .await
            .unwrap_or_else(|err| {
                warn!("Hallucination grader failed, treating as not grounded: {:#}", err);
                Grade::No
            });
        if !grounded.is_yes() {
            info!("Generation is not grounded in the documents, regenerating");
            return Verdict::NotSupported;
        }

        let addresses = self
            .agents
            .answer
            .classify_answer_quality(question, generation)
            .await
            .unwrap_or_else(|err| {
                warn!("Answer grader failed, treating as not useful: {:#}", err);
                Grade::No
            });
        if addresses.is_yes() {
            Verdict::Useful
        } else {
            info!("Generation does not address the question, rewriting");
            Verdict::NotUseful
        }
    }
}
