//! Property-based invariant tests for the typing engine.
//!
//! Verifies, over random interleavings of keys, ticks and pause toggles:
//! 1. The word index always equals the number of committed words
//! 2. Every recorded error index is below the word index
//! 3. Remaining time never exceeds the limit and elapsed + remaining == limit
//! 4. At most one result is ever submitted
//! 5. Accuracy stays within 0..=100
//! 6. Chorded keystrokes never change the session

use keystride::{
    key::{Key, KeyStroke, Modifiers},
    lifecycle::TestController,
    result::{Difficulty, MemorySink, ResultMetadata, TestType},
    session::Status,
    TargetText,
};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Step {
    Key(KeyStroke),
    Tick,
    TogglePause,
    Finish,
}

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        6 => prop::sample::select(vec!['a', 'b', 'c', 'x', 'é']).prop_map(Key::Char),
        2 => Just(Key::Space),
        2 => Just(Key::Backspace),
        1 => Just(Key::Enter),
    ]
}

fn arb_modifiers() -> impl Strategy<Value = Modifiers> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(shift, ctrl, alt, meta)| Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        },
    )
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        12 => arb_key().prop_map(|k| Step::Key(KeyStroke::plain(k))),
        1 => (arb_key(), arb_modifiers()).prop_map(|(k, m)| Step::Key(KeyStroke::new(k, m))),
        3 => Just(Step::Tick),
        1 => Just(Step::TogglePause),
        1 => Just(Step::Finish),
    ]
}

fn arb_words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[abc]{1,4}", 1..6)
}

fn controller(words: Vec<String>, limit: u32) -> TestController<MemorySink> {
    TestController::new(
        TargetText::from_words(words).unwrap(),
        limit,
        ResultMetadata {
            test_id: "prop".into(),
            test_type: TestType::Generated,
            difficulty: Difficulty::Easy,
        },
        MemorySink::default(),
    )
}

fn check_invariants(c: &TestController<MemorySink>) -> Result<(), TestCaseError> {
    let s = c.session();
    prop_assert_eq!(s.current_word_index(), s.completed_words().len());
    prop_assert!(s.word_errors().iter().all(|&i| i < s.current_word_index()));
    prop_assert!(s.time_remaining_secs() <= s.time_limit_secs());
    prop_assert_eq!(s.elapsed_secs() + s.time_remaining_secs(), s.time_limit_secs());
    prop_assert!(s.metrics().accuracy <= 100);
    prop_assert!(c.sink().submissions.len() <= 1);
    prop_assert!(!s.is_finalizing());
    Ok(())
}

proptest! {
    #[test]
    fn session_invariants_hold(
        words in arb_words(),
        limit in 0u32..8,
        steps in prop::collection::vec(arb_step(), 0..80),
    ) {
        let mut c = controller(words, limit);
        c.handle_key(KeyStroke::plain(Key::Enter));
        let mut finalized = 0;

        for step in steps {
            let done = match step {
                Step::Key(stroke) => c.handle_key(stroke).finalized,
                Step::Tick => c.tick(),
                Step::TogglePause => {
                    c.toggle_pause();
                    None
                }
                Step::Finish => c.finish(),
            };
            finalized += usize::from(done.is_some());
            check_invariants(&c)?;
        }

        prop_assert!(finalized <= 1);
        prop_assert_eq!(finalized, c.sink().submissions.len());
        prop_assert_eq!(finalized == 1, c.status() == Status::Finished);
    }

    #[test]
    fn chorded_keys_change_nothing(
        words in arb_words(),
        prefix in "[abc ]{0,10}",
        key in arb_key(),
        alt in any::<bool>(),
    ) {
        let mut c = controller(words, 30);
        c.handle_key(KeyStroke::plain(Key::Enter));
        for stroke in KeyStroke::typed(&prefix) {
            c.handle_key(stroke);
        }
        if c.status() != Status::Running {
            return Ok(());
        }
        let before_input = c.session().current_input().to_string();
        let before_index = c.session().current_word_index();

        let modifiers = Modifiers {
            ctrl: !alt,
            alt,
            ..Modifiers::NONE
        };
        let response = c.handle_key(KeyStroke::new(key, modifiers));

        prop_assert!(response.finalized.is_none());
        prop_assert_eq!(c.session().current_input(), before_input.as_str());
        prop_assert_eq!(c.session().current_word_index(), before_index);
    }
}
