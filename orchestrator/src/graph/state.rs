// Session state and transition table of the corrective RAG loop

use serde::{Deserialize, Serialize};

use super::LoopLimits;
use crate::models::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Retrieve,
    GradeDocuments,
    Generate,
    TransformQuery,
    WebSearch,
    Done,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Retrieve => "retrieve",
            Step::GradeDocuments => "grade_documents",
            Step::Generate => "generate",
            Step::TransformQuery => "transform_query",
            Step::WebSearch => "web_search",
            Step::Done => "done",
        }
    }
}

/// How a generation fared against the hallucination and answer graders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not grounded in the documents; regenerate from the same documents.
    NotSupported,
    /// Grounded and addresses the question.
    Useful,
    /// Grounded but off target; rewrite the question.
    NotUseful,
}

/// What a completed step reports back. Each event belongs to exactly one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// `Retrieve` finished.
    Retrieved,
    /// `GradeDocuments` kept `relevant` documents.
    Graded { relevant: usize },
    /// `TransformQuery` finished.
    Rewritten,
    /// `WebSearch` replaced the documents.
    Searched,
    /// `Generate` produced and graded an answer.
    Judged(Verdict),
}

/// Per-question state. Owned by a single run, never shared.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub question: String,
    pub documents: Vec<Document>,
    pub generation: Option<String>,
    pub retrieval_attempts: u32,
    pub generation_attempts: u32,
}

impl SessionState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }
}

/// Next step after `event`, updating the retry counters on `session`.
pub fn transition(session: &mut SessionState, event: Event, limits: &LoopLimits) -> Step {
    match event {
        Event::Retrieved => Step::GradeDocuments,
        Event::Graded { relevant } if relevant > 0 => {
            session.generation_attempts = 0;
            Step::Generate
        }
        Event::Graded { .. } if session.retrieval_attempts < limits.max_retrieval_attempts => {
            session.retrieval_attempts += 1;
            Step::TransformQuery
        }
        Event::Graded { .. } => {
            session.retrieval_attempts = 0;
            Step::WebSearch
        }
        Event::Rewritten => Step::Retrieve,
        Event::Searched => {
            session.generation_attempts = 0;
            Step::Generate
        }
        Event::Judged(Verdict::NotSupported) => {
            session.generation_attempts += 1;
            Step::Generate
        }
        Event::Judged(Verdict::Useful) => Step::Done,
        Event::Judged(Verdict::NotUseful) => Step::TransformQuery,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max_retrieval_attempts: u32) -> LoopLimits {
        LoopLimits { max_retrieval_attempts, ..LoopLimits::default() }
    }

    #[test]
    fn retrieval_always_moves_to_grading() {
        let mut session = SessionState::new("q");
        assert_eq!(transition(&mut session, Event::Retrieved, &budget(2)), Step::GradeDocuments);
    }

    #[test]
    fn relevant_documents_go_to_generation() {
        let mut session = SessionState::new("q");
        session.generation_attempts = 2;
        session.retrieval_attempts = 1;

        assert_eq!(transition(&mut session, Event::Graded { relevant: 1 }, &budget(2)), Step::Generate);
        assert_eq!(session.generation_attempts, &budget(0));
        assert_eq!(session.retrieval_attempts, &budget(1));
    }

    #[test]
    fn empty_grading_rewrites_until_budget_then_searches() {
        let mut session = SessionState::new("q");

        assert_eq!(transition(&mut session, Event::Graded { relevant: 0 }, &budget(2)), Step::TransformQuery);
        assert_eq!(session.retrieval_attempts, &budget(1));
        assert_eq!(transition(&mut session, Event::Graded { relevant: 0 }, &budget(2)), Step::TransformQuery);
        assert_eq!(session.retrieval_attempts, &budget(2));
        assert_eq!(transition(&mut session, Event::Graded { relevant: 0 }, &budget(2)), Step::WebSearch);
        assert_eq!(session.retrieval_attempts, &budget(0));
    }

    #[test]
    fn zero_budget_searches_immediately() {
        let mut session = SessionState::new("q");
        assert_eq!(transition(&mut session, Event::Graded { relevant: 0 }, &budget(0)), Step::WebSearch);
    }

    #[test]
    fn rewrite_returns_to_retrieval_and_search_to_generation() {
        let mut session = SessionState::new("q");
        assert_eq!(transition(&mut session, Event::Rewritten, &budget(2)), Step::Retrieve);
        assert_eq!(transition(&mut session, Event::Searched, &budget(2)), Step::Generate);
    }

    #[test]
    fn verdicts_route_generation() {
        let mut session = SessionState::new("q");

        assert_eq!(
            transition(&mut session, Event::Judged(Verdict::NotSupported), &budget(2)),
            Step::Generate
        );
        assert_eq!(session.generation_attempts, &budget(1));
        assert_eq!(transition(&mut session, Event::Judged(Verdict::Useful), &budget(2)), Step::Done);
        assert_eq!(
            transition(&mut session, Event::Judged(Verdict::NotUseful), &budget(2)),
            Step::TransformQuery
        );
    }

    #[test]
    fn not_useful_does_not_spend_retrieval_budget() {
        let mut session = SessionState::new("q");
        transition(&mut session, Event::Judged(Verdict::NotUseful), &budget(2));
        assert_eq!(session.retrieval_attempts, &budget(0));
    }
}
