use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Stages of a sampling run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SamplerStage {
    #[default]
    Idle,
    Discovering,
    DetectingTemplates,
    Categorizing,
    Selecting,
    Budgeting,
    Persisting,
    Done,
    Failed,
}

impl SamplerStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SamplerStage::Done | SamplerStage::Failed)
    }
}

/// A progress notification pushed to the surrounding application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: SamplerStage,
    pub message: String,
    pub completed: usize,
    pub total: Option<usize>,
}

/// One-way progress sink. Sending never blocks and delivery failures are ignored.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A reporter that drops every event
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create a reporter and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(
        &self,
        stage: SamplerStage,
        message: impl Into<String>,
        completed: usize,
        total: Option<usize>,
    ) {
        let Some(sender) = &self.sender else {
            return;
        };
        let event = ProgressEvent {
            stage,
            message: message.into(),
            completed,
            total,
        };
        if sender.send(event).is_err() {
            ::log::trace!("Progress receiver dropped, event discarded");
        }
    }
}
