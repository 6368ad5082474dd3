//! Corrective (self-grading) RAG loop.
//!
//! A question moves through `Retrieve -> GradeDocuments -> Generate` and loops back
//! when the graders reject what it found: an empty relevant set rewrites the question
//! (up to `max_retrieval_attempts`, then falls back to web search), an ungrounded answer
//! is regenerated from the same documents, and a grounded but unhelpful answer
//! rewrites the question.

use std::time::Duration;

use serde::Serialize;

pub mod runner;
pub mod state;

pub use runner::CorrectiveRag;
pub use state::{transition, Event, SessionState, Step, Verdict};

#[derive(Debug, Clone, Copy)]
pub struct LoopLimits {
    pub max_retrieval_attempts: u32,
    /// Consecutive ungrounded generations tolerated over one document set.
    pub max_generation_attempts: u32,
    pub max_steps: u32,
    pub deadline: Duration,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            max_retrieval_attempts: 2,
            max_generation_attempts: 3,
            max_steps: 24,
            deadline: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Useful,
    DeadlineExceeded,
    StepLimit,
    GenerationLimit,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Useful => "useful",
            Outcome::DeadlineExceeded => "deadline_exceeded",
            Outcome::StepLimit => "step_limit",
            Outcome::GenerationLimit => "generation_limit",
        }
    }

    /// Caller-facing status: either `useful` or `gave_up`.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Useful => "useful",
            _ => "gave_up",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The question as submitted, not the last rewrite.
    pub question: String,
    pub answer: String,
    pub outcome: Outcome,
    pub trace: Vec<Step>,
}
