//! Utilities to track the progression and the outcome of a sync run

use std::fmt::{Display, Error, Formatter};

use serde::Serialize;

/// An event that happens during a sync run
#[derive(Clone, Debug)]
pub enum SyncEvent {
    /// Sync has not started
    NotStarted,
    /// Sync has just started but no occurrence is handled yet
    Started,
    /// Sync is in progress.
    InProgress { brigade: String, items_done_already: usize, details: String },
    /// Sync is finished
    Finished { success: bool },
}

impl Display for SyncEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SyncEvent::NotStarted => write!(f, "Not started"),
            SyncEvent::Started => write!(f, "Sync has started..."),
            SyncEvent::InProgress { brigade, items_done_already, details } =>
                write!(f, "[{}] {} ({} done)...", brigade, details, items_done_already),
            SyncEvent::Finished { success } => match success {
                true => write!(f, "Sync successfully finished"),
                false => write!(f, "Sync finished with errors"),
            },
        }
    }
}

impl Default for SyncEvent {
    fn default() -> Self {
        Self::NotStarted
    }
}

/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<SyncEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<SyncEvent>;

/// Create a feedback channel, that can be used to retrieve the current progress of a sync operation
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(SyncEvent::default())
}

/// The aggregated result of one orchestrator invocation.
///
/// The caller (usually the cron binary) renders it to the log stream and derives the
/// process exit code from [`SyncRun::is_success`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SyncRun {
    pub created: u32,
    pub skipped: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

impl SyncRun {
    /// A run succeeded when nothing failed and no configuration error was recorded
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }
}

impl Display for SyncRun {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "created {}, skipped {}, failed {}", self.created, self.skipped, self.failed)
    }
}

/// A structure that tracks the counters and the errors that happen during a sync
pub struct SyncReporter {
    run: SyncRun,
    items_done: usize,
    feedback_channel: Option<FeedbackSender>,
}

impl SyncReporter {
    pub fn new() -> Self {
        Self { run: SyncRun::default(), items_done: 0, feedback_channel: None }
    }

    pub fn new_with_feedback_channel(channel: FeedbackSender) -> Self {
        Self { run: SyncRun::default(), items_done: 0, feedback_channel: Some(channel) }
    }

    pub fn is_success(&self) -> bool {
        self.run.is_success()
    }

    pub fn into_run(self) -> SyncRun {
        self.run
    }

    pub fn items_done(&self) -> usize {
        self.items_done
    }

    /// Record a successful creation
    pub fn created(&mut self, text: &str) {
        log::info!("{}", text);
        self.run.created += 1;
        self.items_done += 1;
    }

    /// Record an occurrence that needed no work
    pub fn skipped(&mut self, text: &str) {
        log::debug!("{}", text);
        self.run.skipped += 1;
        self.items_done += 1;
    }

    /// Record several skipped occurrences at once
    pub fn skipped_many(&mut self, count: u32, text: &str) {
        log::debug!("{}", text);
        self.run.skipped += count;
    }

    /// Record several creations at once (used by the attendance pull, where the remote
    /// call covers the whole batch)
    pub fn created_many(&mut self, count: u32, text: &str) {
        log::info!("{}", text);
        self.run.created += count;
    }

    /// Record a failed occurrence. The summary ends up in the run's error list
    pub fn failed(&mut self, summary: String) {
        log::error!("{}", summary);
        self.run.failed += 1;
        self.items_done += 1;
        self.run.errors.push(summary);
    }

    /// Record several occurrences as failed under a single error line
    /// (used when a run is aborted early)
    pub fn failed_many(&mut self, count: u32, summary: String) {
        log::error!("{}", summary);
        self.run.failed += count;
        self.run.errors.push(summary);
    }

    /// Record an error that is not tied to one occurrence (configuration, local store).
    /// It fails the run without touching the per-item counters
    pub fn error(&mut self, text: String) {
        log::error!("{}", text);
        self.run.errors.push(text);
    }

    /// Log an info
    pub fn info(&mut self, text: &str) {
        log::info!("{}", text);
    }

    /// Log a debug message
    pub fn debug(&mut self, text: &str) {
        log::debug!("{}", text);
    }

    /// Send an event as a feedback to the listener (if any).
    pub fn feedback(&mut self, event: SyncEvent) {
        self.feedback_channel
            .as_ref()
            .map(|sender| sender.send(event));
    }
}
