pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod progress;
pub mod scanner;
pub mod storage;
pub mod tally;

pub use config::AppConfig;
pub use engine::{Aggregate, RunReport, RunStatus, SubjectFailure, TallyEngine};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter, TracingReporter};
pub use tally::{DailyCount, DayKey, ScanSummary};
