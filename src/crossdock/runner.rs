//! Runs one behavior and collects the entries it records.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::crossdock::entry::{Entry, Status};
use crate::crossdock::params::{Params, BEHAVIOR_PARAM};

/// Marker returned by [`T::fatal`]; propagate it with `?` to stop the behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fatal;

/// Recorder handed to a behavior.
///
/// Cheap to clone; all clones append to the same entry list.
#[derive(Debug, Clone)]
pub struct T {
    params: Arc<Params>,
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl T {
    pub fn new(params: Params) -> Self {
        Self {
            params: Arc::new(params),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Name of the behavior being run, or `""` when absent.
    pub fn behavior(&self) -> &str {
        self.param(BEHAVIOR_PARAM)
    }

    /// Parameter value, or `""` when absent.
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn success(&self, output: impl Into<String>) {
        self.put(Entry::new(Status::Passed, output));
    }

    pub fn error(&self, output: impl Into<String>) {
        self.put(Entry::new(Status::Failed, output));
    }

    pub fn skip(&self, output: impl Into<String>) {
        self.put(Entry::new(Status::Skipped, output));
    }

    /// Record a failure and return the marker that aborts the behavior.
    pub fn fatal(&self, output: impl Into<String>) -> Fatal {
        self.error(output);
        Fatal
    }

    pub fn put(&self, entry: Entry) {
        tracing::debug!(status = ?entry.status, output = %entry.output, "Entry recorded");
        self.lock().push(entry);
    }

    /// Snapshot of the entries recorded so far.
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Entry>> {
        // A panicking behavior can poison the lock; the entries are still valid.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Run `behavior` against `params` and return every entry it recorded.
pub async fn run<F, Fut>(params: Params, behavior: F) -> Vec<Entry>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<(), Fatal>>,
{
    let t = T::new(params);
    if behavior(t.clone()).await.is_err() {
        tracing::debug!(behavior = %t.behavior(), "Behavior aborted");
    }
    t.entries()
}
