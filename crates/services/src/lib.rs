#![forbid(unsafe_code)]

pub mod activity;
pub mod error;
pub mod feedback;
pub mod report;

pub use lab_core::Clock;

pub use activity::{
    ActivityLoopService, ActivityProgress, ActivitySession, Stage, StageInput, Submission,
};
pub use error::{ActivityError, ExportError, FeedbackError};
pub use feedback::{AiFeedbackService, FeedbackConfig, FeedbackProvider, ScriptedFeedback};
pub use report::ReportExporter;
