use std::ops::Deref;
use std::sync::Arc;

use crate::error::EngineError;

/// Ordered, immutable sequence of words a test is typed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetText {
    words: Arc<[String]>,
}

impl TargetText {
    /// Build from words that are already clean (non-empty, no whitespace).
    pub fn from_words<I, S>(words: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        if words.is_empty() {
            return Err(EngineError::InvalidInput("text contains no words".into()));
        }
        if let Some(idx) = words
            .iter()
            .position(|w| w.is_empty() || w.chars().any(char::is_whitespace))
        {
            return Err(EngineError::InvalidInput(format!(
                "word {idx} is empty or contains whitespace"
            )));
        }
        Ok(Self {
            words: words.into(),
        })
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// The words joined back into the text they came from.
    pub fn to_text(&self) -> String {
        self.words.join(" ")
    }
}

impl Deref for TargetText {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.words
    }
}

/// Split `text` into words on single spaces.
///
/// Runs of spaces are not merged and nothing is trimmed: cleaning the text is
/// the supplier's job, so a text that would produce an empty word is refused.
/// An empty target word could never be completed, since space on empty input
/// commits nothing.
pub fn segment(text: &str) -> Result<TargetText, EngineError> {
    if text.is_empty() {
        return Err(EngineError::InvalidInput("text is empty".into()));
    }
    TargetText::from_words(text.split(' '))
}
