mod ui;

use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
};

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use keystride::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    error::{EngineError, SubmitError},
    history::SqliteResultStore,
    key::KeyStroke,
    lifecycle::{Finalized, TestController},
    result::{Difficulty, ResultSink, TestType},
    runtime::{CrosstermEventSource, EngineEvent, EngineEventSource, FixedTicker, Runner, Ticker},
    session::{KeyOutcome, Status},
    telemetry,
    text_source::{
        CatalogTextSource, CustomTextSource, GeneratedTextSource, TextSource, TextSupply,
        WordList, WordListTextSource,
    },
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use time_humanize::{Accuracy, HumanTime, Tense};
use tracing::{info, warn};

/// typing test with live wpm and accuracy
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing test: pick a text, press Enter, type until the words or the time run out, and get a scored result saved to your local history."
)]
pub struct Cli {
    /// number of seconds to run test (defaults to the text's recommendation, then config)
    #[clap(short = 's', long)]
    time: Option<u32>,

    /// difficulty of the text
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// where the text comes from
    #[clap(long, value_enum)]
    source: Option<TestType>,

    /// number of words for word-list tests
    #[clap(short = 'w', long)]
    number_of_words: Option<usize>,

    /// custom prompt to use (single-space separated)
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// print recent results and exit
    #[clap(long)]
    history: bool,

    /// export all results as csv to this path and exit
    #[clap(long)]
    export: Option<PathBuf>,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(t) = self.time {
            config.time_limit_secs = t;
        }
        if let Some(d) = self.difficulty {
            config.difficulty = d;
        }
        if let Some(s) = self.source {
            config.source = s;
        }
        if let Some(n) = self.number_of_words {
            config.number_of_words = n;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Typing,
    Results,
}

/// What the event loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    Continue,
    /// The countdown (re)started; line ticks up with it.
    Realign,
    Quit,
}

pub struct App {
    pub config: Config,
    pub state: AppState,
    pub controller: TestController<SqliteResultStore>,
    pub supply: TextSupply,
    pub last: Option<Finalized>,
    pub notice: Option<String>,
    pub personal_best: Option<u32>,
    source: Box<dyn TextSource>,
    time_override: Option<u32>,
}

fn build_source(config: &Config, prompt: Option<&str>) -> Result<Box<dyn TextSource>, EngineError> {
    if let Some(p) = prompt {
        return Ok(Box::new(CustomTextSource::new(p)?));
    }
    Ok(match config.source {
        TestType::Premade => Box::new(CatalogTextSource::bundled()?),
        TestType::Generated => Box::new(GeneratedTextSource::default()),
        TestType::WordList => Box::new(WordListTextSource::new(
            WordList::bundled("english")?,
            config.number_of_words,
        )),
        TestType::Custom => {
            return Err(EngineError::InvalidInput("custom source requires --prompt".into()))
        }
    })
}

fn open_store() -> Result<SqliteResultStore, SubmitError> {
    let Some(path) = AppDirs::results_db_path() else {
        warn!("no state directory, results will not outlive this run");
        return SqliteResultStore::open_in_memory();
    };
    SqliteResultStore::open(&path).or_else(|e| {
        warn!(path = %path.display(), error = %e, "falling back to in-memory results");
        SqliteResultStore::open_in_memory()
    })
}

impl App {
    pub fn new(
        config: Config,
        mut source: Box<dyn TextSource>,
        store: SqliteResultStore,
        time_override: Option<u32>,
    ) -> Result<Self, EngineError> {
        let supply = source.next_text(config.difficulty)?;
        let personal_best = store.personal_best(None).ok().flatten();
        let controller = TestController::from_supply(
            supply.clone(),
            time_override,
            config.time_limit_secs,
            supply.metadata(config.difficulty),
            store,
        );
        Ok(Self {
            config,
            state: AppState::Typing,
            controller,
            supply,
            last: None,
            notice: None,
            personal_best,
            source,
            time_override,
        })
    }

    /// Abandon the current test and set up another, on the same text or a new one.
    pub fn reset(&mut self, same_text: bool) {
        let supply = if same_text {
            Ok(self.supply.clone())
        } else {
            self.source.next_text(self.config.difficulty)
        };
        let supply = match supply {
            Ok(s) => s,
            Err(e) => {
                self.notice = Some(format!("could not load a new text: {e}"));
                return;
            }
        };

        let limit = supply.time_limit(self.time_override, self.config.time_limit_secs);
        let metadata = supply.metadata(self.config.difficulty);
        self.controller.restart(supply.words.clone(), limit, metadata);
        self.personal_best = self.controller.sink().personal_best(None).ok().flatten();
        self.supply = supply;
        self.last = None;
        self.notice = None;
        self.state = AppState::Typing;
    }

    fn on_finished(&mut self, finalized: Finalized) {
        self.notice = finalized
            .delivery
            .as_ref()
            .err()
            .map(|e| format!("result not saved ({e}), press (s) to retry"));
        self.last = Some(finalized);
        self.state = AppState::Results;
    }

    fn retry_save(&mut self) {
        let Some(last) = self.last.as_mut() else {
            return;
        };
        if last.delivery.is_ok() {
            return;
        }
        last.delivery = self.controller.sink_mut().submit(&last.submission);
        self.notice = match &last.delivery {
            Ok(()) => Some("result saved".to_string()),
            Err(e) => Some(format!("result still not saved ({e}), press (s) to retry")),
        };
    }

    pub fn on_tick(&mut self) {
        if let Some(finalized) = self.controller.tick() {
            self.on_finished(finalized);
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind == KeyEventKind::Release {
            return Flow::Continue;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c')) {
            return Flow::Quit;
        }

        match self.state {
            AppState::Typing => match key.code {
                KeyCode::Tab => {
                    if self.controller.toggle_pause()
                        && self.controller.status() == Status::Running
                    {
                        return Flow::Realign;
                    }
                }
                KeyCode::Char('d') if ctrl => {
                    if let Some(finalized) = self.controller.finish() {
                        self.on_finished(finalized);
                    }
                }
                KeyCode::Left => self.reset(true),
                KeyCode::Right => self.reset(false),
                _ => {
                    if let Some(stroke) = KeyStroke::from_key_event(&key) {
                        let response = self.controller.handle_key(stroke);
                        if let Some(finalized) = response.finalized {
                            self.on_finished(finalized);
                        } else if response.outcome == KeyOutcome::Started {
                            return Flow::Realign;
                        }
                    }
                }
            },
            AppState::Results => match key.code {
                KeyCode::Char('r') | KeyCode::Left => self.reset(true),
                KeyCode::Char('n') | KeyCode::Right => self.reset(false),
                KeyCode::Char('s') => self.retry_save(),
                _ => {}
            },
        }
        Flow::Continue
    }
}

fn print_history(store: &SqliteResultStore) -> Result<(), Box<dyn Error>> {
    let rows = store.recent(20)?;
    if rows.is_empty() {
        println!("no results yet");
        return Ok(());
    }
    for r in rows {
        let age = (Local::now() - r.completed_at).to_std().unwrap_or_default();
        println!(
            "{:>4} wpm  {:>3}% acc  {:>2} err  {:>3}s  {:<9} {:<6}  {}",
            r.wpm,
            r.accuracy,
            r.error_count,
            r.time_taken_secs,
            r.test_type,
            r.difficulty,
            HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past),
        );
    }
    if let Some(best) = store.personal_best(None)? {
        println!("\npersonal best: {best} wpm");
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let _log_guard = AppDirs::log_dir().and_then(|dir| telemetry::init_tracing(&dir).ok());

    let store = open_store()?;

    if cli.history {
        return print_history(&store);
    }
    if let Some(path) = &cli.export {
        let file = std::fs::File::create(path)?;
        let n = store.export_csv(file)?;
        println!("exported {n} results to {}", path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply_to(&mut config);

    let source = match build_source(&config, cli.prompt.as_deref()) {
        Ok(s) => s,
        Err(e) => Cli::command().error(ErrorKind::InvalidValue, e.to_string()).exit(),
    };
    let mut app = match App::new(config, source, store, cli.time) {
        Ok(app) => app,
        Err(e) => Cli::command().error(ErrorKind::InvalidValue, e.to_string()).exit(),
    };
    info!(source = %app.config.source, difficulty = %app.config.difficulty, "starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::every_second());
    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = config_store.save(&app.config) {
        warn!(error = %e, "could not save config");
    }

    outcome
}

fn start_tui<B: Backend, E: EngineEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            EngineEvent::Tick => app.on_tick(),
            EngineEvent::Resize => {}
            EngineEvent::Key(key) => match app.on_key(key) {
                Flow::Quit => break,
                Flow::Realign => runner.realign(),
                Flow::Continue => {}
            },
        }
    }

    Ok(())
}
