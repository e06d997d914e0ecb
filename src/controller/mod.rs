use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::backend::{BackendFailure, BackendResponse, TranscriptionBackend};
use crate::history::HistoryRecord;
use crate::platforms;
use crate::ExtractionError;

pub mod progress;

use progress::{ProgressConfig, ProgressFeed, ProgressSnapshot};

pub const DEFAULT_LANGUAGE: &str = "Unknown";
pub const DEFAULT_TITLE: &str = "Unknown Title";
pub const ERROR_LANGUAGE: &str = "Error occurred";
pub const ERROR_TITLE: &str = "Error";

/// Lifecycle of the extraction workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Idle,
    Validating,
    InFlight,
    Success,
    Failed,
}

/// Text and metadata shown for one extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Transcribed text (empty when the backend returned none)
    pub text: String,

    /// Detected language
    pub language: String,

    /// Video title
    pub title: String,

    /// When the result was produced
    pub retrieved_at: DateTime<Utc>,

    /// Backend summary, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Video duration in seconds, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl ExtractionResult {
    /// Build a result from a successful backend response
    pub fn from_response(response: BackendResponse, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            text: response.text.unwrap_or_default(),
            language: response.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            title: response.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            retrieved_at,
            summary: response.summary,
            duration_secs: response.duration,
        }
    }

    /// Build the error display for a failed extraction
    pub fn from_error(error: &ExtractionError, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            text: error.to_string(),
            language: ERROR_LANGUAGE.to_string(),
            title: ERROR_TITLE.to_string(),
            retrieved_at,
            summary: None,
            duration_secs: None,
        }
    }
}

/// How the displayed result came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayOutcome {
    Succeeded,
    Failed,
    Restored,
}

/// What the user currently sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayedExtraction {
    /// URL the result belongs to
    pub url: String,

    pub result: ExtractionResult,

    pub outcome: DisplayOutcome,
}

/// Result of a submit action
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Input missing or not accepted, nothing was sent
    Disabled,

    /// A request is already outstanding, nothing was sent
    Busy,

    /// The request settled into a display
    Settled(DisplayedExtraction),
}

fn is_not_found(failure: &BackendFailure) -> bool {
    matches!(failure.status, Some(404) | Some(410))
}

fn is_transport(failure: &BackendFailure) -> bool {
    failure.transport
}

/// Map a backend failure to a user-facing error.
///
/// Rules are checked in order, first match wins.
pub fn classify(failure: &BackendFailure) -> ExtractionError {
    let rules: [(fn(&BackendFailure) -> bool, ExtractionError); 2] = [
        (is_not_found, ExtractionError::NotFound),
        (is_transport, ExtractionError::TransportFailure),
    ];

    rules
        .into_iter()
        .find(|(matches, _)| matches(failure))
        .map(|(_, error)| error)
        .unwrap_or(ExtractionError::Unclassified)
}

struct ControllerInner {
    state: ControllerState,
    input: String,
    submit_enabled: bool,
    display: Option<DisplayedExtraction>,
}

impl ControllerInner {
    fn input_accepted(&self) -> bool {
        let url = self.input.trim();
        !url.is_empty() && platforms::accepts(url)
    }
}

fn lock_inner(inner: &Mutex<ControllerInner>) -> MutexGuard<'_, ControllerInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Held for the whole `InFlight` period of a submit.
///
/// If the submit future is dropped before settling, the controller returns
/// to `Idle` and the progress feed is marked settled.
struct InFlightGuard<'a> {
    inner: &'a Mutex<ControllerInner>,
    progress: &'a watch::Sender<ProgressSnapshot>,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(inner: &'a Mutex<ControllerInner>, progress: &'a watch::Sender<ProgressSnapshot>) -> Self {
        Self {
            inner,
            progress,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut inner = lock_inner(self.inner);
        if inner.state == ControllerState::InFlight {
            tracing::warn!("Extraction abandoned before the backend responded");
            inner.state = ControllerState::Idle;
            inner.submit_enabled = inner.input_accepted();
        }
        drop(inner);

        self.progress.send_modify(|snapshot| {
            snapshot.percent = 100.0;
            snapshot.settled = true;
        });
    }
}

/// Drives one extraction at a time against a transcription backend
pub struct ExtractionController<B: TranscriptionBackend> {
    backend: B,
    progress_config: ProgressConfig,
    progress: Arc<watch::Sender<ProgressSnapshot>>,
    inner: Mutex<ControllerInner>,
}

impl<B: TranscriptionBackend> ExtractionController<B> {
    pub fn new(backend: B, progress_config: ProgressConfig) -> Self {
        let (progress, _) = watch::channel(ProgressSnapshot::starting());

        Self {
            backend,
            progress_config,
            progress: Arc::new(progress),
            inner: Mutex::new(ControllerInner {
                state: ControllerState::Idle,
                input: String::new(),
                submit_enabled: false,
                display: None,
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Receive progress snapshots for the current and future requests
    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.subscribe()
    }

    pub async fn state(&self) -> ControllerState {
        lock_inner(&self.inner).state
    }

    pub async fn input(&self) -> String {
        lock_inner(&self.inner).input.clone()
    }

    pub async fn submit_enabled(&self) -> bool {
        lock_inner(&self.inner).submit_enabled
    }

    pub async fn display(&self) -> Option<DisplayedExtraction> {
        lock_inner(&self.inner).display.clone()
    }

    /// Record new input and re-evaluate whether submit is allowed.
    ///
    /// Submit stays disabled while a request is outstanding.
    pub async fn set_input(&self, input: &str) -> bool {
        let mut inner = lock_inner(&self.inner);
        inner.input = input.to_string();

        if inner.state == ControllerState::Idle {
            inner.state = ControllerState::Validating;
        }

        let valid = inner.input_accepted();
        inner.submit_enabled = valid && inner.state != ControllerState::InFlight;

        tracing::debug!("Input changed (valid: {}, state: {:?})", valid, inner.state);
        inner.submit_enabled
    }

    /// Submit the current input to the backend.
    ///
    /// Never fails: backend errors settle into a `Failed` display.
    pub async fn submit(&self) -> SubmitOutcome {
        let url = {
            let mut inner = lock_inner(&self.inner);

            if inner.state == ControllerState::InFlight {
                tracing::debug!("Submit ignored, a request is already in flight");
                return SubmitOutcome::Busy;
            }

            let url = inner.input.trim().to_string();
            if url.is_empty() || !platforms::accepts(&url) {
                inner.submit_enabled = false;
                return SubmitOutcome::Disabled;
            }

            inner.state = ControllerState::InFlight;
            inner.submit_enabled = false;
            inner.display = None;
            url
        };

        let guard = InFlightGuard::new(&self.inner, &self.progress);

        tracing::info!("Extracting text from: {}", url);
        let feed = ProgressFeed::start(&self.progress_config, Arc::clone(&self.progress));
        let response = self.backend.extract(&url).await;
        feed.finish().await;

        let retrieved_at = Utc::now();
        let (state, displayed) = match response {
            Ok(response) => {
                tracing::info!("Extraction succeeded for: {}", url);
                let displayed = DisplayedExtraction {
                    url,
                    result: ExtractionResult::from_response(response, retrieved_at),
                    outcome: DisplayOutcome::Succeeded,
                };
                (ControllerState::Success, displayed)
            }
            Err(failure) => {
                let error = classify(&failure);
                tracing::warn!(
                    status = ?failure.status,
                    transport = failure.transport,
                    kind = ?error,
                    "Extraction failed: {}",
                    failure
                );
                let displayed = DisplayedExtraction {
                    url,
                    result: ExtractionResult::from_error(&error, retrieved_at),
                    outcome: DisplayOutcome::Failed,
                };
                (ControllerState::Failed, displayed)
            }
        };

        {
            let mut inner = lock_inner(&self.inner);
            inner.state = state;
            inner.display = Some(displayed.clone());
            inner.submit_enabled = inner.input_accepted();
        }
        guard.disarm();

        SubmitOutcome::Settled(displayed)
    }

    /// Show a saved record without calling the backend.
    ///
    /// Returns false while a request is in flight.
    pub async fn restore(&self, record: &HistoryRecord) -> bool {
        let mut inner = lock_inner(&self.inner);

        if inner.state == ControllerState::InFlight {
            tracing::debug!("Restore ignored, a request is in flight");
            return false;
        }

        inner.input = record.url.clone();
        inner.submit_enabled = platforms::accepts(record.url.trim());
        inner.state = ControllerState::Success;
        inner.display = Some(DisplayedExtraction {
            url: record.url.clone(),
            result: ExtractionResult {
                text: record.text.clone(),
                language: record.language.clone(),
                title: record.title.clone(),
                retrieved_at: record.timestamp,
                summary: None,
                duration_secs: None,
            },
            outcome: DisplayOutcome::Restored,
        });

        tracing::debug!("Restored history record {}", record.id);
        true
    }
}
