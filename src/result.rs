use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SubmitError;
use crate::metrics::Metrics;

/// Where the text of a test came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestType {
    Premade,
    Generated,
    WordList,
    Custom,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Caller-supplied tags forwarded with the result. The engine never reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub test_id: String,
    pub test_type: TestType,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub wpm: u32,
    pub accuracy: u32,
    pub error_count: usize,
    pub time_taken_secs: u32,
    pub characters_typed: usize,
    pub test_id: String,
}

impl TestResult {
    pub fn assemble(metrics: &Metrics, test_id: impl Into<String>) -> Self {
        Self {
            wpm: metrics.wpm,
            accuracy: metrics.accuracy,
            error_count: metrics.error_count,
            time_taken_secs: metrics.elapsed_secs,
            characters_typed: metrics.characters_typed,
            test_id: test_id.into(),
        }
    }
}

/// What a [`ResultSink`] receives once a test finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(flatten)]
    pub result: TestResult,
    pub test_type: TestType,
    pub difficulty: Difficulty,
    pub completed_at: DateTime<Local>,
}

impl Submission {
    pub fn new(
        result: TestResult,
        metadata: &ResultMetadata,
        completed_at: DateTime<Local>,
    ) -> Self {
        Self {
            result,
            test_type: metadata.test_type,
            difficulty: metadata.difficulty,
            completed_at,
        }
    }
}

/// Destination for finished results.
///
/// Delivery is fire-and-forget from the engine's side: an error is reported
/// back to the caller but never changes the state of the finished test.
pub trait ResultSink {
    fn submit(&mut self, submission: &Submission) -> Result<(), SubmitError>;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn submit(&mut self, submission: &Submission) -> Result<(), SubmitError> {
        (**self).submit(submission)
    }
}

/// Keeps submissions in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub submissions: Vec<Submission>,
}

impl ResultSink for MemorySink {
    fn submit(&mut self, submission: &Submission) -> Result<(), SubmitError> {
        self.submissions.push(submission.clone());
        Ok(())
    }
}
