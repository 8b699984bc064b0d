use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::key::{Key, KeyStroke};
use crate::metrics::{char_marks, CharMark, Metrics};
use crate::segmenter::TargetText;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Waiting,
    Running,
    Paused,
    Finished,
}

/// What a keystroke did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Started,
    Typed,
    Erased,
    WordCommitted { index: usize, correct: bool },
    /// The previous word was un-committed back into the input buffer.
    WordReopened { index: usize },
    /// The final word was committed; the test should now be finalized.
    LastWordCommitted { correct: bool },
}

/// Mutable state of one typing test.
///
/// `current_word_index == completed_words.len()` holds in every reachable
/// state, and every index in `word_errors` is below `current_word_index`.
#[derive(Debug, Clone)]
pub struct TestSession {
    status: Status,
    words: TargetText,
    current_word_index: usize,
    current_input: String,
    completed_words: Vec<String>,
    word_errors: BTreeSet<usize>,
    time_limit_secs: u32,
    time_remaining_secs: u32,
    finalizing: bool,
}

impl TestSession {
    pub fn new(words: TargetText, time_limit_secs: u32) -> Self {
        Self {
            status: Status::Waiting,
            words,
            current_word_index: 0,
            current_input: String::new(),
            completed_words: Vec::new(),
            word_errors: BTreeSet::new(),
            time_limit_secs,
            time_remaining_secs: time_limit_secs,
            finalizing: false,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn words(&self) -> &TargetText {
        &self.words
    }

    pub fn current_word_index(&self) -> usize {
        self.current_word_index
    }

    pub fn current_input(&self) -> &str {
        &self.current_input
    }

    pub fn completed_words(&self) -> &[String] {
        &self.completed_words
    }

    pub fn word_errors(&self) -> &BTreeSet<usize> {
        &self.word_errors
    }

    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    pub fn time_remaining_secs(&self) -> u32 {
        self.time_remaining_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.time_limit_secs - self.time_remaining_secs
    }

    pub fn is_finalizing(&self) -> bool {
        self.finalizing
    }

    fn all_words_committed(&self) -> bool {
        self.current_word_index >= self.words.len()
    }

    pub fn handle_key(&mut self, stroke: KeyStroke) -> KeyOutcome {
        if stroke.modifiers.is_chord() {
            debug!(?stroke, "rejecting chorded key");
            return KeyOutcome::Ignored;
        }
        if self.finalizing {
            return KeyOutcome::Ignored;
        }

        match self.status {
            Status::Waiting => {
                if stroke.key == Key::Enter {
                    self.status = Status::Running;
                    KeyOutcome::Started
                } else {
                    KeyOutcome::Ignored
                }
            }
            Status::Running if self.all_words_committed() => KeyOutcome::Ignored,
            Status::Running => self.handle_running_key(stroke.key),
            Status::Paused | Status::Finished => KeyOutcome::Ignored,
        }
    }

    fn handle_running_key(&mut self, key: Key) -> KeyOutcome {
        match key {
            Key::Enter => KeyOutcome::Ignored,
            Key::Char(c) => {
                self.current_input.push(c);
                KeyOutcome::Typed
            }
            // a leading space cannot commit an empty word
            Key::Space if self.current_input.is_empty() => KeyOutcome::Ignored,
            Key::Space => {
                let index = self.current_word_index;
                let correct = self.commit_current();
                if self.all_words_committed() {
                    KeyOutcome::LastWordCommitted { correct }
                } else {
                    KeyOutcome::WordCommitted { index, correct }
                }
            }
            Key::Backspace => {
                if self.current_input.pop().is_some() {
                    return KeyOutcome::Erased;
                }
                match self.completed_words.pop() {
                    Some(previous) => {
                        self.current_word_index -= 1;
                        self.current_input = previous;
                        self.word_errors.remove(&self.current_word_index);
                        KeyOutcome::WordReopened {
                            index: self.current_word_index,
                        }
                    }
                    None => KeyOutcome::Ignored,
                }
            }
        }
    }

    fn commit_current(&mut self) -> bool {
        let index = self.current_word_index;
        let typed = std::mem::take(&mut self.current_input);
        let correct = self.words.get(index).is_some_and(|target| *target == typed);
        if !correct {
            self.word_errors.insert(index);
        }
        debug!(index, correct, "word committed");
        self.completed_words.push(typed);
        self.current_word_index += 1;
        correct
    }

    /// Commit a partially typed word as if space had been pressed.
    /// Returns whether it matched, or `None` when nothing was pending.
    pub(crate) fn commit_pending(&mut self) -> Option<bool> {
        if self.current_input.is_empty() || self.all_words_committed() {
            return None;
        }
        Some(self.commit_current())
    }

    pub(crate) fn pause(&mut self) -> bool {
        if self.status == Status::Running && !self.finalizing {
            self.status = Status::Paused;
            true
        } else {
            false
        }
    }

    pub(crate) fn resume(&mut self) -> bool {
        if self.status == Status::Paused && !self.finalizing {
            self.status = Status::Running;
            true
        } else {
            false
        }
    }

    /// Count one second off the clock, returning what remains.
    pub(crate) fn tick_second(&mut self) -> u32 {
        self.time_remaining_secs = self.time_remaining_secs.saturating_sub(1);
        self.time_remaining_secs
    }

    /// Check-and-set the finalize guard. Only the first caller gets `true`.
    pub(crate) fn begin_finalize(&mut self) -> bool {
        if self.finalizing || self.status == Status::Finished {
            return false;
        }
        self.finalizing = true;
        true
    }

    pub(crate) fn complete_finalize(&mut self) {
        self.status = Status::Finished;
        self.finalizing = false;
    }

    pub fn metrics(&self) -> Metrics {
        Metrics::compute(self)
    }

    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot {
            status: self.status,
            words: self.words.words(),
            current_word_index: self.current_word_index,
            current_input: &self.current_input,
            completed_words: &self.completed_words,
            word_errors: &self.word_errors,
            time_limit_secs: self.time_limit_secs,
            time_remaining_secs: self.time_remaining_secs,
            live: self.metrics(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordState {
    Pending,
    Active,
    Correct,
    Incorrect,
}

/// Read-only view of a session for renderers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot<'a> {
    pub status: Status,
    pub words: &'a [String],
    pub current_word_index: usize,
    pub current_input: &'a str,
    pub completed_words: &'a [String],
    pub word_errors: &'a BTreeSet<usize>,
    pub time_limit_secs: u32,
    pub time_remaining_secs: u32,
    pub live: Metrics,
}

impl SessionSnapshot<'_> {
    pub fn word_state(&self, index: usize) -> WordState {
        if index < self.current_word_index {
            if self.word_errors.contains(&index) {
                WordState::Incorrect
            } else {
                WordState::Correct
            }
        } else if index == self.current_word_index {
            WordState::Active
        } else {
            WordState::Pending
        }
    }

    /// Character marks for word `index`: target characters overlaid with what
    /// was typed for it, followed by any overtyped extras.
    pub fn word_marks(&self, index: usize) -> Vec<(char, CharMark)> {
        let Some(target) = self.words.get(index) else {
            return Vec::new();
        };
        let typed = match index.cmp(&self.current_word_index) {
            std::cmp::Ordering::Less => Some(self.completed_words[index].as_str()),
            std::cmp::Ordering::Equal => Some(self.current_input),
            std::cmp::Ordering::Greater => None,
        };
        match typed {
            Some(typed) => char_marks(target, typed, index < self.current_word_index),
            None => target.chars().map(|c| (c, CharMark::Pending)).collect(),
        }
    }
}
