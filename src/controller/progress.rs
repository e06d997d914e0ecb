use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Status labels shown while a request is outstanding, in display order
pub const PHASES: [&str; 6] = [
    "Downloading video...",
    "Extracting audio...",
    "Processing with Whisper...",
    "Detecting language...",
    "Generating transcription...",
    "Finalizing...",
];

/// Settings for the synthetic progress feed
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Time between ticks
    pub tick_interval: Duration,

    /// Ceiling after which the display is forced to 100%
    pub timeout: Duration,

    /// Upper bound (exclusive) of the random increment per tick
    pub max_increment: f64,

    /// Highest value reached before the request settles
    pub cap: f64,

    /// Fixed RNG seed for reproducible feeds
    pub seed: Option<u64>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(800),
            timeout: Duration::from_millis(10_000),
            max_increment: 15.0,
            cap: 90.0,
            seed: None,
        }
    }
}

/// One observation of the progress feed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Percentage in [0, 100]
    pub percent: f64,

    /// Current phase label
    pub phase: &'static str,

    /// True once the request has settled
    pub settled: bool,
}

impl ProgressSnapshot {
    pub fn starting() -> Self {
        Self {
            percent: 0.0,
            phase: PHASES[0],
            settled: false,
        }
    }
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self::starting()
    }
}

/// Phase label for a percentage, `None` once past the last phase
pub fn phase_for(percent: f64) -> Option<&'static str> {
    let index = ((percent / 100.0) * PHASES.len() as f64).floor();
    if index < 0.0 {
        return None;
    }
    PHASES.get(index as usize).copied()
}

/// Add one increment, never decreasing and never passing the cap
fn advance(percent: f64, increment: f64, cap: f64) -> f64 {
    (percent + increment.max(0.0)).min(cap)
}

/// A running progress feed.
///
/// The ticking task stops when the feed is finished or dropped.
pub struct ProgressFeed {
    cancel: CancellationToken,
    handle: Option<JoinHandle<ProgressSnapshot>>,
    sink: Arc<watch::Sender<ProgressSnapshot>>,
}

impl ProgressFeed {
    /// Reset the sink and start ticking
    pub fn start(config: &ProgressConfig, sink: Arc<watch::Sender<ProgressSnapshot>>) -> Self {
        let cancel = CancellationToken::new();
        sink.send_replace(ProgressSnapshot::starting());

        let handle = tokio::spawn(run_feed(config.clone(), Arc::clone(&sink), cancel.clone()));

        Self {
            cancel,
            handle: Some(handle),
            sink,
        }
    }

    /// Stop ticking and publish the final 100% snapshot.
    ///
    /// Nothing is published on the sink after this returns.
    pub async fn finish(mut self) {
        self.cancel.cancel();

        let phase = match self.handle.take() {
            Some(handle) => match handle.await {
                Ok(last) => last.phase,
                Err(e) => {
                    tracing::warn!("Progress task ended abnormally: {}", e);
                    self.sink.borrow().phase
                }
            },
            None => self.sink.borrow().phase,
        };

        self.sink.send_replace(ProgressSnapshot {
            percent: 100.0,
            phase,
            settled: true,
        });
    }
}

impl Drop for ProgressFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Send a snapshot unless the feed was cancelled.
///
/// The check runs under the channel lock, so a tick racing with cancellation
/// cannot overwrite the settled snapshot published afterwards.
fn publish(
    sink: &watch::Sender<ProgressSnapshot>,
    cancel: &CancellationToken,
    snapshot: ProgressSnapshot,
) {
    sink.send_if_modified(|current| {
        if cancel.is_cancelled() {
            return false;
        }
        *current = snapshot;
        true
    });
}

async fn run_feed(
    config: ProgressConfig,
    sink: Arc<watch::Sender<ProgressSnapshot>>,
    cancel: CancellationToken,
) -> ProgressSnapshot {
    let mut rng = match config.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };

    let start = tokio::time::Instant::now();
    let mut interval = tokio::time::interval_at(start + config.tick_interval, config.tick_interval);
    let deadline = tokio::time::sleep_until(start + config.timeout);
    tokio::pin!(deadline);

    let mut snapshot = ProgressSnapshot::starting();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = &mut deadline => {
                tracing::debug!("Progress timeout reached, forcing 100%");
                snapshot.percent = 100.0;
                publish(&sink, &cancel, snapshot);
                break;
            }
            _ = interval.tick() => {
                snapshot.percent = advance(snapshot.percent, rng.f64() * config.max_increment, config.cap);
                if let Some(phase) = phase_for(snapshot.percent) {
                    snapshot.phase = phase;
                }
                publish(&sink, &cancel, snapshot);
            }
        }
    }

    snapshot
}
