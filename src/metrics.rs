//! Live and final scoring.
//!
//! Every figure is derived from what was actually typed, never from the
//! target text, and the same formulas serve the live display and the final
//! result:
//!
//! * characters typed: all typed words joined by single spaces
//! * gross wpm: `round(chars / 5 / elapsed_minutes)`, 0 when no time elapsed
//! * accuracy: `round(correct / chars * 100)` in `[0, 100]`, 0 when nothing typed
//! * error count: number of committed words that did not match

use itertools::Itertools;
use serde::Serialize;

use crate::session::TestSession;

const CHARS_PER_WORD: f64 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub wpm: u32,
    pub accuracy: u32,
    pub error_count: usize,
    pub characters_typed: usize,
    pub correct_characters: usize,
    pub elapsed_secs: u32,
}

impl Metrics {
    pub fn compute(session: &TestSession) -> Self {
        Self::from_parts(
            session.words(),
            session.completed_words(),
            session.current_input(),
            session.word_errors().len(),
            session.elapsed_secs(),
        )
    }

    pub fn from_parts(
        targets: &[String],
        completed: &[String],
        current_input: &str,
        error_count: usize,
        elapsed_secs: u32,
    ) -> Self {
        let characters_typed = characters_typed(completed, current_input);
        let correct_characters = correct_characters(targets, completed, current_input);
        Self {
            wpm: gross_wpm(characters_typed, elapsed_secs),
            accuracy: accuracy(correct_characters, characters_typed),
            error_count,
            characters_typed,
            correct_characters,
            elapsed_secs,
        }
    }
}

/// Gross characters produced: every typed word, right or wrong, plus one
/// separator between consecutive words.
pub fn characters_typed(completed: &[String], current_input: &str) -> usize {
    completed
        .iter()
        .map(String::as_str)
        .chain((!current_input.is_empty()).then_some(current_input))
        .join(" ")
        .chars()
        .count()
}

/// Positional matches between each typed word and its target, up to the
/// shorter of the two. Missing and extra characters never count.
///
/// `current_input` is scored against the word after the committed ones, so
/// the live figure covers the same characters as [`characters_typed`].
pub fn correct_characters(
    targets: &[String],
    completed: &[String],
    current_input: &str,
) -> usize {
    completed
        .iter()
        .map(String::as_str)
        .chain((!current_input.is_empty()).then_some(current_input))
        .zip(targets)
        .map(|(typed, target)| {
            typed
                .chars()
                .zip(target.chars())
                .filter(|(a, b)| a == b)
                .count()
        })
        .sum()
}

pub fn gross_wpm(characters_typed: usize, elapsed_secs: u32) -> u32 {
    if elapsed_secs == 0 {
        return 0;
    }
    let minutes = f64::from(elapsed_secs) / 60.0;
    finite_or_zero((characters_typed as f64 / CHARS_PER_WORD / minutes).round())
}

pub fn accuracy(correct_characters: usize, characters_typed: usize) -> u32 {
    if characters_typed == 0 {
        return 0;
    }
    let pct = (correct_characters as f64 / characters_typed as f64 * 100.0).round();
    if pct.is_finite() {
        pct.clamp(0.0, 100.0) as u32
    } else {
        0
    }
}

fn finite_or_zero(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// How one displayed character of a word should be shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CharMark {
    Correct,
    Incorrect,
    /// Target character never typed in a committed word.
    Missing,
    /// Typed beyond the end of the target word.
    Extra,
    /// Not reached yet in the active or an upcoming word.
    Pending,
}

/// Overlay `typed` on `target` position by position. Target characters are
/// reported for in-range positions; overtyped characters follow as `Extra`.
pub fn char_marks(target: &str, typed: &str, committed: bool) -> Vec<(char, CharMark)> {
    let mut typed_chars = typed.chars();
    let mut marks: Vec<(char, CharMark)> = target
        .chars()
        .map(|t| {
            let mark = match typed_chars.next() {
                Some(c) if c == t => CharMark::Correct,
                Some(_) => CharMark::Incorrect,
                None if committed => CharMark::Missing,
                None => CharMark::Pending,
            };
            (t, mark)
        })
        .collect();
    marks.extend(typed_chars.map(|c| (c, CharMark::Extra)));
    marks
}
