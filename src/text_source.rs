use cgisf_lib::cgisf;
use include_dir::{include_dir, Dir};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineError;
use crate::result::{Difficulty, ResultMetadata, TestType};
use crate::segmenter::{segment, TargetText};

static TEXT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/texts");

/// A ready-to-type text handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSupply {
    pub test_type: TestType,
    pub test_id: String,
    pub words: TargetText,
    pub recommended_time_limit_secs: Option<u32>,
}

impl TextSupply {
    /// An explicit limit wins, then the text's recommendation, then `default`.
    pub fn time_limit(&self, explicit: Option<u32>, default: u32) -> u32 {
        explicit
            .or(self.recommended_time_limit_secs)
            .unwrap_or(default)
    }

    pub fn metadata(&self, difficulty: Difficulty) -> ResultMetadata {
        ResultMetadata {
            test_id: self.test_id.clone(),
            test_type: self.test_type,
            difficulty,
        }
    }
}

/// Produces texts for new tests.
pub trait TextSource {
    fn next_text(&mut self, difficulty: Difficulty) -> Result<TextSupply, EngineError>;
}

fn read_embedded<T: for<'de> Deserialize<'de>>(file_name: &str) -> Result<T, EngineError> {
    let file = TEXT_DIR
        .get_file(file_name)
        .ok_or_else(|| EngineError::InvalidInput(format!("{file_name} is not bundled")))?;
    let contents = file
        .contents_utf8()
        .ok_or_else(|| EngineError::InvalidInput(format!("{file_name} is not utf-8")))?;
    serde_json::from_str(contents)
        .map_err(|e| EngineError::InvalidInput(format!("{file_name}: {e}")))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Passage {
    pub id: String,
    pub difficulty: Difficulty,
    pub text: String,
    pub time_limit_secs: Option<u32>,
}

/// Pre-made passages bundled with the binary.
pub struct CatalogTextSource {
    passages: Vec<Passage>,
    rng: StdRng,
}

impl CatalogTextSource {
    pub fn bundled() -> Result<Self, EngineError> {
        Ok(Self::with_passages(read_embedded("passages.json")?))
    }

    pub fn with_passages(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }
}

impl TextSource for CatalogTextSource {
    fn next_text(&mut self, difficulty: Difficulty) -> Result<TextSupply, EngineError> {
        let candidates: Vec<&Passage> = self
            .passages
            .iter()
            .filter(|p| p.difficulty == difficulty)
            .collect();
        let passage = candidates.choose(&mut self.rng).ok_or_else(|| {
            EngineError::InvalidInput(format!("no {difficulty} passages in catalog"))
        })?;
        debug!(id = %passage.id, "picked passage");
        Ok(TextSupply {
            test_type: TestType::Premade,
            test_id: passage.id.clone(),
            words: segment(&passage.text)?,
            recommended_time_limit_secs: passage.time_limit_secs,
        })
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct WordList {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl WordList {
    pub fn bundled(name: &str) -> Result<Self, EngineError> {
        read_embedded(&format!("{name}.json"))
    }
}

/// Random words from a word list. Difficulty bounds word length.
pub struct WordListTextSource {
    list: WordList,
    number_of_words: usize,
    rng: StdRng,
}

impl WordListTextSource {
    pub fn new(list: WordList, number_of_words: usize) -> Self {
        Self {
            list,
            number_of_words,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn max_word_len(difficulty: Difficulty) -> usize {
        match difficulty {
            Difficulty::Easy => 5,
            Difficulty::Medium => 8,
            Difficulty::Hard => usize::MAX,
        }
    }
}

impl TextSource for WordListTextSource {
    fn next_text(&mut self, difficulty: Difficulty) -> Result<TextSupply, EngineError> {
        let max_len = Self::max_word_len(difficulty);
        let pool: Vec<&String> = self
            .list
            .words
            .iter()
            .filter(|w| w.chars().count() <= max_len)
            .collect();
        if pool.is_empty() {
            return Err(EngineError::InvalidInput(format!(
                "word list {} has no {difficulty} words",
                self.list.name
            )));
        }
        // words may repeat when more are asked for than the pool holds
        let words: Vec<String> = (0..self.number_of_words.max(1))
            .filter_map(|_| pool.choose(&mut self.rng).map(|w| w.to_string()))
            .collect();
        Ok(TextSupply {
            test_type: TestType::WordList,
            test_id: Uuid::new_v4().to_string(),
            words: TargetText::from_words(words)?,
            recommended_time_limit_secs: None,
        })
    }
}

/// Randomly generated grammatical sentences.
pub struct GeneratedTextSource {
    rng: StdRng,
}

impl Default for GeneratedTextSource {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl GeneratedTextSource {
    fn sentence_count(difficulty: Difficulty) -> usize {
        match difficulty {
            Difficulty::Easy => 2,
            Difficulty::Medium => 4,
            Difficulty::Hard => 6,
        }
    }
}

impl TextSource for GeneratedTextSource {
    fn next_text(&mut self, difficulty: Difficulty) -> Result<TextSupply, EngineError> {
        let rng = &mut self.rng;
        let text = (0..Self::sentence_count(difficulty))
            .map(|_| {
                cgisf(
                    rng.gen_range(1..3),
                    rng.gen_range(1..3),
                    rng.gen_range(1..5),
                    rng.gen_bool(0.5),
                    rng.gen_range(1..3),
                    rng.gen_bool(0.5),
                )
            })
            .collect::<Vec<String>>()
            .join(" ");
        // generator output may carry stray spacing; hand over clean words only
        let words = text.split_whitespace().map(str::to_string);
        Ok(TextSupply {
            test_type: TestType::Generated,
            test_id: Uuid::new_v4().to_string(),
            words: TargetText::from_words(words)?,
            recommended_time_limit_secs: None,
        })
    }
}

/// A single user-supplied text, reused for every test.
#[derive(Debug)]
pub struct CustomTextSource {
    words: TargetText,
}

impl CustomTextSource {
    pub fn new(text: &str) -> Result<Self, EngineError> {
        Ok(Self {
            words: segment(text)?,
        })
    }
}

impl TextSource for CustomTextSource {
    fn next_text(&mut self, _difficulty: Difficulty) -> Result<TextSupply, EngineError> {
        Ok(TextSupply {
            test_type: TestType::Custom,
            test_id: Uuid::new_v4().to_string(),
            words: self.words.clone(),
            recommended_time_limit_secs: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn bundled_catalog_covers_every_difficulty() {
        let mut source = CatalogTextSource::bundled().unwrap().seeded(7);
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let supply = source.next_text(difficulty).unwrap();
            assert_eq!(supply.test_type, TestType::Premade);
            assert!(supply.test_id.starts_with(&difficulty.to_string()));
            assert!(supply.recommended_time_limit_secs.is_some());
            assert!(!supply.words.is_empty());
        }
    }

    #[test]
    fn every_bundled_passage_segments_cleanly() {
        let source = CatalogTextSource::bundled().unwrap();
        for p in source.passages() {
            assert!(segment(&p.text).is_ok(), "passage {} is not clean", p.id);
        }
    }

    #[test]
    fn catalog_without_matching_difficulty_fails() {
        let mut source = CatalogTextSource::with_passages(vec![Passage {
            id: "only".into(),
            difficulty: Difficulty::Easy,
            text: "a b".into(),
            time_limit_secs: None,
        }]);
        assert_matches!(
            source.next_text(Difficulty::Hard),
            Err(EngineError::InvalidInput(_))
        );
    }

    #[test]
    fn bundled_word_list_loads() {
        let list = WordList::bundled("english").unwrap();
        assert_eq!(list.name, "english");
        assert_eq!(list.size as usize, list.words.len());
    }

    #[test]
    fn missing_word_list_is_an_error() {
        assert_matches!(
            WordList::bundled("klingon"),
            Err(EngineError::InvalidInput(_))
        );
    }

    #[test]
    fn word_list_respects_count_and_length() {
        let list = WordList::bundled("english").unwrap();
        let mut source = WordListTextSource::new(list, 25).seeded(42);
        let supply = source.next_text(Difficulty::Easy).unwrap();
        assert_eq!(supply.words.len(), 25);
        assert!(supply.words.iter().all(|w| w.chars().count() <= 5));
        assert_eq!(supply.test_type, TestType::WordList);
    }

    #[test]
    fn word_list_without_short_words_fails() {
        let list = WordList {
            name: "long".into(),
            size: 1,
            words: vec!["extraordinary".into()],
        };
        let mut source = WordListTextSource::new(list, 5);
        assert_matches!(
            source.next_text(Difficulty::Easy),
            Err(EngineError::InvalidInput(_))
        );
    }

    #[test]
    fn generated_text_is_clean() {
        let mut source = GeneratedTextSource::default();
        let supply = source.next_text(Difficulty::Medium).unwrap();
        assert_eq!(supply.test_type, TestType::Generated);
        assert!(supply.words.iter().all(|w| !w.is_empty()));
        assert!(segment(&supply.words.to_text()).is_ok());
    }

    #[test]
    fn custom_text_is_reused() {
        let mut source = CustomTextSource::new("hello world").unwrap();
        let a = source.next_text(Difficulty::Easy).unwrap();
        let b = source.next_text(Difficulty::Hard).unwrap();
        assert_eq!(a.words, b.words);
        assert_ne!(a.test_id, b.test_id);
    }

    #[test]
    fn custom_text_must_be_clean() {
        assert_matches!(
            CustomTextSource::new("hello  world"),
            Err(EngineError::InvalidInput(_))
        );
    }

    #[test]
    fn supply_metadata_forwards_ids() {
        let mut source = CustomTextSource::new("hi").unwrap();
        let supply = source.next_text(Difficulty::Easy).unwrap();
        let meta = supply.metadata(Difficulty::Easy);
        assert_eq!(meta.test_id, supply.test_id);
        assert_eq!(meta.test_type, TestType::Custom);
    }
}
