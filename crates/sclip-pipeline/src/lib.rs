//! Clip selection and rendering pipeline.
//!
//! Glue lives in the binary; this crate owns the selector, configuration,
//! the ranking-response cache, transcript resolution and the per-clip
//! orchestration.

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod selector;
pub mod transcribe;

pub use config::{load_dotenv, load_file_config, FileConfig, Settings};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{print_summary, run_clips, ClipOutcome, RunContext};
pub use selector::{
    select_manual, select_ranked, SelectError, SelectionDiagnostic, SelectorConfig,
};
