// Library surface for the typing-test engine and its collaborators.
// The terminal front end in main.rs only consumes what is exported here.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod history;
pub mod key;
pub mod lifecycle;
pub mod metrics;
pub mod result;
pub mod runtime;
pub mod segmenter;
pub mod session;
pub mod telemetry;
pub mod text_source;
pub mod time_series;
pub mod util;

pub use error::{EngineError, SubmitError};
pub use key::{Key, KeyStroke, Modifiers};
pub use lifecycle::{Finalized, TestController};
pub use result::{ResultSink, Submission, TestResult};
pub use segmenter::{segment, TargetText};
pub use session::{SessionSnapshot, Status, TestSession};
