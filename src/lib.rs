//! Video Text Extractor - A Rust CLI client for turning video URLs into text
//!
//! This library validates video URLs against a list of supported platforms, sends them to
//! a transcription backend over HTTP, and keeps a bounded local history of saved results.

pub mod backend;
pub mod cli;
pub mod config;
pub mod controller;
pub mod history;
pub mod output;
pub mod platforms;
pub mod utils;

pub use backend::{HttpBackend, TranscriptionBackend};
pub use cli::{Cli, Commands, HistoryCommands, OutputFormat};
pub use config::Config;
pub use controller::{ExtractionController, ExtractionResult, SubmitOutcome};
pub use history::{HistoryRecord, HistoryStore};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failures surfaced to the user by the extraction workflow
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Please enter a valid video URL (got: {0:?}). Run `vtextract platforms` to see supported sites.")]
    InvalidInput(String),

    #[error("Failed to extract text from video. Network error. Please check your connection.")]
    TransportFailure,

    #[error("Failed to extract text from video. Video not found or not accessible.")]
    NotFound,

    #[error("Failed to extract text from video. Please try again or check if the video URL is valid.")]
    Unclassified,
}
