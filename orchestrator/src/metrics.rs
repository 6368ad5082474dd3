use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

use crate::agents::Grade;
use crate::graph::{Outcome, Step};

lazy_static! {
    static ref SRAG_RUNS: IntCounterVec = register_int_counter_vec!(
        "srag_runs_total",
        "Corrective RAG runs by terminal outcome",
        &["outcome"]
    )
    .expect("srag_runs_total registers once");
    static ref SRAG_STEPS: IntCounterVec = register_int_counter_vec!(
        "srag_steps_total",
        "Corrective RAG states entered",
        &["step"]
    )
    .expect("srag_steps_total registers once");
    static ref SRAG_GRADES: IntCounterVec = register_int_counter_vec!(
        "srag_grades_total",
        "Grader decisions",
        &["grader", "grade"]
    )
    .expect("srag_grades_total registers once");
}

pub fn record_run(outcome: &str) {
    SRAG_RUNS.with_label_values(&[outcome]).inc();
}

pub fn record_outcome(outcome: Outcome) {
    record_run(outcome.as_str());
}

pub fn record_step(step: Step) {
    SRAG_STEPS.with_label_values(&[step.as_str()]).inc();
}

pub fn record_grade(grader: &str, grade: Grade) {
    SRAG_GRADES.with_label_values(&[grader, grade.as_str()]).inc();
}
