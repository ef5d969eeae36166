//! Frame sampling and sequential analysis pipeline.
//!
//! This crate provides:
//! - The analysis session (video, collection, state, storyboard)
//! - A generation-tagged reducer for collection updates
//! - The `Idle -> Analyzing -> Complete` run state machine
//! - A single-worker queue shared by batch frames and ad-hoc captures
//! - The batch orchestrator, ad-hoc capture and storyboard step

pub mod capture;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod reducer;
pub mod session;
pub mod state_machine;
pub mod storyboard;

pub use config::{PipelineConfig, ALLOWED_FRAME_COUNTS};
pub use error::{PipelineError, PipelineResult};
pub use logging::RunLogger;
pub use orchestrator::Pipeline;
pub use queue::AnalysisQueue;
pub use reducer::{CollectionUpdate, Generation};
pub use session::{ActiveVideo, AnalysisSession};
pub use state_machine::{RunStateMachine, RunTicket};
