use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use keystride::{
    key::KeyStroke,
    lifecycle::{FinalizeTrigger, Finalized, TestController},
    result::{Difficulty, MemorySink, ResultMetadata, TestType},
    runtime::{EngineEvent, FixedTicker, Runner, TestEventSource},
    session::Status,
    TargetText,
};

fn controller(words: &[&str], limit: u32) -> TestController<MemorySink> {
    TestController::new(
        TargetText::from_words(words.iter().copied()).unwrap(),
        limit,
        ResultMetadata {
            test_id: "headless".into(),
            test_type: TestType::Custom,
            difficulty: Difficulty::Easy,
        },
        MemorySink::default(),
    )
}

fn key(code: KeyCode) -> EngineEvent {
    EngineEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

/// Drive a tiny event loop until the test finalizes or the step budget runs out.
fn drive(
    runner: &Runner<TestEventSource, FixedTicker>,
    c: &mut TestController<MemorySink>,
    max_steps: u32,
) -> Option<Finalized> {
    for _ in 0..max_steps {
        let finalized = match runner.step() {
            EngineEvent::Tick => c.tick(),
            EngineEvent::Resize => None,
            EngineEvent::Key(event) => KeyStroke::from_key_event(&event)
                .and_then(|stroke| c.handle_key(stroke).finalized),
        };
        if finalized.is_some() {
            return finalized;
        }
    }
    None
}

// Verifies that a minimal typing flow completes via Runner/TestEventSource.
#[test]
fn headless_typing_flow_completes() {
    let mut c = controller(&["hi"], 30);
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    for code in [
        KeyCode::Enter,
        KeyCode::Char('h'),
        KeyCode::Char('i'),
        KeyCode::Char(' '),
    ] {
        tx.send(key(code)).unwrap();
    }

    let finalized = drive(&runner, &mut c, 100).expect("typing the text finishes the test");
    assert_eq!(finalized.trigger, FinalizeTrigger::LastWordCommitted);
    assert_eq!(c.status(), Status::Finished);
    assert_eq!(c.sink().submissions.len(), 1);
    assert!(finalized.result.accuracy <= 100);
}

#[test]
fn headless_timer_runs_out() {
    let mut c = controller(&["never", "typed"], 3);
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(2)),
    );
    tx.send(key(KeyCode::Enter)).unwrap();
    tx.send(key(KeyCode::Char('n'))).unwrap();

    let finalized = drive(&runner, &mut c, 100).expect("ticks exhaust the timer");
    assert_eq!(finalized.trigger, FinalizeTrigger::TimerExhausted);
    assert_eq!(finalized.result.time_taken_secs, 3);
    assert_eq!(c.session().completed_words(), ["n"]);
    assert_eq!(c.samples().len(), 3);
}

#[test]
fn headless_ctrl_chords_are_rejected() {
    let mut c = controller(&["ab"], 30);
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_secs(10)),
    );
    tx.send(key(KeyCode::Enter)).unwrap();
    tx.send(EngineEvent::Key(KeyEvent::new(
        KeyCode::Char('a'),
        KeyModifiers::CONTROL,
    )))
    .unwrap();
    tx.send(key(KeyCode::Char('a'))).unwrap();

    for _ in 0..3 {
        if let EngineEvent::Key(event) = runner.step() {
            if let Some(stroke) = KeyStroke::from_key_event(&event) {
                c.handle_key(stroke);
            }
        }
    }
    assert_eq!(c.session().current_input(), "a");
}
