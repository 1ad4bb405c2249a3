//! Sequence state and run report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a [`Sequence`](super::Sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    /// The graph has not been computed yet.
    Unbuilt,
    /// The graph is cached and no run is in progress.
    Built,
    /// Actions are being invoked.
    Running,
    /// The last run completed every action.
    Done,
    /// The last run aborted on an error.
    Failed,
}

/// One executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRun {
    /// Group of the executed method.
    pub group: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Key the return value was published under, if any.
    pub published: Option<String>,
}

/// Outcome of a successful [`Sequence::run`](super::Sequence::run).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceReport {
    /// Executed actions in execution order.
    pub actions: Vec<ActionRun>,
}

impl SequenceReport {
    /// Groups of the executed actions, in order.
    pub fn groups(&self) -> Vec<&str> {
        self.actions.iter().map(|run| run.group.as_str()).collect()
    }

    /// Keys published during the run, in order.
    pub fn published_keys(&self) -> Vec<&str> {
        self.actions.iter().filter_map(|run| run.published.as_deref()).collect()
    }
}
