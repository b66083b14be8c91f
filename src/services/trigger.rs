use serde::Serialize;
use std::collections::HashSet;

/// Lifecycle of related-title aggregation for the current source id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    /// Waiting for a visibility signal or for the source item to resolve
    Idle,
    /// Signalled; aggregation may start
    Armed,
    /// Aggregation is running for the current id
    Running,
    /// Processed; never restarts for this id
    Done,
}

/// Admits aggregation at most once per source id
///
/// Owned by one view session. `processed` remembers every id that finished so a revisit
/// never restarts, and `in_progress` keeps two near-simultaneous signals from launching two
/// pipelines for the same id.
#[derive(Debug)]
pub struct LazyTrigger {
    current: Option<String>,
    state: TriggerState,
    processed: HashSet<String>,
    in_progress: HashSet<String>,
}

impl Default for LazyTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl LazyTrigger {
    pub fn new() -> Self {
        Self {
            current: None,
            state: TriggerState::Idle,
            processed: HashSet::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.processed.contains(id)
    }

    /// Makes `id` the current source id
    ///
    /// Switching ids abandons whatever was running for the previous one. An id that was
    /// already processed lands directly in [`TriggerState::Done`].
    pub fn set_source(&mut self, id: &str) -> TriggerState {
        if self.current.as_deref() == Some(id) {
            return self.state;
        }

        self.abandon();
        self.current = Some(id.to_string());
        self.state = if self.processed.contains(id) {
            TriggerState::Done
        } else {
            TriggerState::Idle
        };
        self.state
    }

    /// `Idle → Armed`; any other state is left untouched
    pub fn arm(&mut self) -> TriggerState {
        if self.state == TriggerState::Idle && self.current.is_some() {
            self.state = TriggerState::Armed;
        }
        self.state
    }

    /// `Armed → Running`, returning the id to aggregate
    ///
    /// Returns `None` unless this call is the one that starts the pipeline.
    pub fn try_start(&mut self) -> Option<String> {
        if self.state != TriggerState::Armed {
            return None;
        }
        let id = self.current.clone()?;

        if self.processed.contains(&id) {
            self.state = TriggerState::Done;
            return None;
        }
        if !self.in_progress.insert(id.clone()) {
            return None;
        }

        self.state = TriggerState::Running;
        Some(id)
    }

    /// `Running → Done` for `id`
    ///
    /// Returns whether the result should be published; a result for an id that is no
    /// longer current is stale and must be dropped.
    pub fn complete(&mut self, id: &str) -> bool {
        self.in_progress.remove(id);
        if !self.is_running(id) {
            return false;
        }

        self.processed.insert(id.to_string());
        self.state = TriggerState::Done;
        true
    }

    /// `Running → Idle` after a failed run, leaving `id` eligible for another attempt
    pub fn fail(&mut self, id: &str) -> bool {
        self.in_progress.remove(id);
        if !self.is_running(id) {
            return false;
        }

        self.state = TriggerState::Idle;
        true
    }

    /// Drops a pending or running cycle for the current id without marking it processed
    pub fn abandon(&mut self) {
        if let Some(id) = self.current.as_deref() {
            self.in_progress.remove(id);
        }
        if matches!(self.state, TriggerState::Armed | TriggerState::Running) {
            self.state = TriggerState::Idle;
        }
    }

    /// Forgets the current id; the processed set survives for the session's lifetime
    pub fn teardown(&mut self) {
        self.abandon();
        self.current = None;
        self.state = TriggerState::Idle;
    }

    fn is_running(&self, id: &str) -> bool {
        self.state == TriggerState::Running && self.current.as_deref() == Some(id)
    }
}
