use chrono::Local;
use tracing::{debug, info, warn};

use crate::error::SubmitError;
use crate::key::KeyStroke;
use crate::result::{ResultMetadata, ResultSink, Submission, TestResult};
use crate::segmenter::TargetText;
use crate::session::{KeyOutcome, SessionSnapshot, Status, TestSession};
use crate::text_source::TextSupply;
use crate::time_series::WpmSample;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// Not started yet.
    Idle,
    Running,
    Suspended,
    /// Stopped for good; ticks are ignored from here on.
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FinalizeTrigger {
    TimerExhausted,
    LastWordCommitted,
    FinishRequested,
}

/// Outcome of the one and only finalization of a test.
#[derive(Debug)]
pub struct Finalized {
    pub trigger: FinalizeTrigger,
    pub result: TestResult,
    /// Kept so the caller can retry delivery after a failure.
    pub submission: Submission,
    pub delivery: Result<(), SubmitError>,
}

#[derive(Debug)]
pub struct KeyResponse {
    pub outcome: KeyOutcome,
    pub finalized: Option<Finalized>,
}

/// Drives a [`TestSession`] through waiting, running, paused and finished,
/// owns its countdown and makes sure it is finalized exactly once.
///
/// Time only moves when [`TestController::tick`] is called, one second per
/// call, so any tick source can drive it.
#[derive(Debug)]
pub struct TestController<S: ResultSink> {
    session: TestSession,
    metadata: ResultMetadata,
    timer: TimerState,
    samples: Vec<WpmSample>,
    sink: S,
}

impl<S: ResultSink> TestController<S> {
    pub fn new(words: TargetText, time_limit_secs: u32, metadata: ResultMetadata, sink: S) -> Self {
        Self {
            session: TestSession::new(words, time_limit_secs),
            metadata,
            timer: TimerState::Idle,
            samples: Vec::new(),
            sink,
        }
    }

    /// Build from a text supply. `time_limit_secs` wins over the supply's
    /// recommendation when given.
    pub fn from_supply(
        supply: TextSupply,
        time_limit_secs: Option<u32>,
        default_limit: u32,
        metadata: ResultMetadata,
        sink: S,
    ) -> Self {
        let limit = supply.time_limit(time_limit_secs, default_limit);
        Self::new(supply.words, limit, metadata, sink)
    }

    /// Abandon the current test, stopping its countdown, and load another
    /// in its place.
    pub fn restart(&mut self, words: TargetText, time_limit_secs: u32, metadata: ResultMetadata) {
        if self.session.status() != Status::Finished {
            info!(test_id = %self.metadata.test_id, "test abandoned");
        }
        self.timer = TimerState::Idle;
        self.session = TestSession::new(words, time_limit_secs);
        self.metadata = metadata;
        self.samples.clear();
    }

    pub fn session(&self) -> &TestSession {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        self.session.snapshot()
    }

    pub fn status(&self) -> Status {
        self.session.status()
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer
    }

    pub fn metadata(&self) -> &ResultMetadata {
        &self.metadata
    }

    pub fn samples(&self) -> &[WpmSample] {
        &self.samples
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn handle_key(&mut self, stroke: KeyStroke) -> KeyResponse {
        let outcome = self.session.handle_key(stroke);
        let finalized = match outcome {
            KeyOutcome::Started => {
                info!(
                    test_id = %self.metadata.test_id,
                    words = self.session.words().len(),
                    limit = self.session.time_limit_secs(),
                    "test started"
                );
                self.timer = TimerState::Running;
                None
            }
            KeyOutcome::LastWordCommitted { .. } => {
                self.finalize(FinalizeTrigger::LastWordCommitted)
            }
            _ => None,
        };
        KeyResponse { outcome, finalized }
    }

    /// Advance the countdown by one second. Ignored unless running.
    pub fn tick(&mut self) -> Option<Finalized> {
        if self.timer != TimerState::Running || self.session.status() != Status::Running {
            return None;
        }
        let remaining = self.session.tick_second();
        self.samples.push(WpmSample::from_metrics(&self.session.metrics()));
        if remaining == 0 {
            self.finalize(FinalizeTrigger::TimerExhausted)
        } else {
            None
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.session.pause() {
            self.timer = TimerState::Suspended;
            debug!(remaining = self.session.time_remaining_secs(), "test paused");
            true
        } else {
            debug!(status = %self.session.status(), "ignoring pause");
            false
        }
    }

    pub fn resume(&mut self) -> bool {
        if self.session.resume() {
            self.timer = TimerState::Running;
            debug!(remaining = self.session.time_remaining_secs(), "test resumed");
            true
        } else {
            debug!(status = %self.session.status(), "ignoring resume");
            false
        }
    }

    /// Pause when running, resume when paused.
    pub fn toggle_pause(&mut self) -> bool {
        match self.session.status() {
            Status::Running => self.pause(),
            Status::Paused => self.resume(),
            _ => false,
        }
    }

    /// End the test now, as if time had run out.
    pub fn finish(&mut self) -> Option<Finalized> {
        match self.session.status() {
            Status::Running | Status::Paused => self.finalize(FinalizeTrigger::FinishRequested),
            status => {
                debug!(%status, "ignoring finish");
                None
            }
        }
    }

    fn finalize(&mut self, trigger: FinalizeTrigger) -> Option<Finalized> {
        if !self.session.begin_finalize() {
            debug!(%trigger, "already finalized");
            return None;
        }
        self.timer = TimerState::Stopped;

        if let Some(correct) = self.session.commit_pending() {
            debug!(correct, "committed in-progress word");
        }
        let metrics = self.session.metrics();
        self.session.complete_finalize();

        let result = TestResult::assemble(&metrics, self.metadata.test_id.as_str());
        let submission = Submission::new(result.clone(), &self.metadata, Local::now());
        let delivery = self.sink.submit(&submission);
        match &delivery {
            Ok(()) => info!(
                %trigger,
                wpm = result.wpm,
                accuracy = result.accuracy,
                errors = result.error_count,
                "test finished"
            ),
            Err(e) => warn!(%trigger, error = %e, "test finished but result was not recorded"),
        }

        Some(Finalized {
            trigger,
            result,
            submission,
            delivery,
        })
    }

    /// Drop the test without finishing it, stopping the countdown, and hand
    /// back the sink.
    pub fn abandon(mut self) -> S {
        self.timer = TimerState::Stopped;
        if self.session.status() != Status::Finished {
            info!(test_id = %self.metadata.test_id, "test abandoned");
        }
        self.sink
    }
}
