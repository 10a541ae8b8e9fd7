use std::thread;
use std::time::Duration;

use crate::io::store::{ListStore, StoreError, TaskStore};
use crate::model::config::StoreConfig;
use crate::model::list::{List, ListId, ListPatch};
use crate::model::task::{Task, TaskPatch};

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        RetryPolicy {
            max_attempts: config.retry_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Wraps a store and retries calls that fail with a transient error.
/// Non-transient errors are returned on the first failure.
#[derive(Debug)]
pub struct Retrying<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> Retrying<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Retrying { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn run<T>(
        &mut self,
        op: &'static str,
        mut f: impl FnMut(&mut S) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 1;
        loop {
            match f(&mut self.inner) {
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        op,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "store call failed, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

impl<S: TaskStore> TaskStore for Retrying<S> {
    fn fetch_tasks(&mut self) -> Result<Vec<Task>, StoreError> {
        self.run("fetch_tasks", |s| s.fetch_tasks())
    }

    fn create_task(&mut self, task: &Task) -> Result<Task, StoreError> {
        self.run("create_task", |s| s.create_task(task))
    }

    fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        self.run("update_task", |s| s.update_task(id, patch))
    }

    fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        self.run("delete_task", |s| s.delete_task(id))
    }
}

impl<S: ListStore> ListStore for Retrying<S> {
    fn fetch_lists(&mut self) -> Result<Vec<List>, StoreError> {
        self.run("fetch_lists", |s| s.fetch_lists())
    }

    fn create_list(&mut self, list: &List) -> Result<List, StoreError> {
        self.run("create_list", |s| s.create_list(list))
    }

    fn update_list(&mut self, id: ListId, patch: &ListPatch) -> Result<List, StoreError> {
        self.run("update_list", |s| s.update_list(id, patch))
    }

    fn delete_list(&mut self, id: ListId) -> Result<(), StoreError> {
        self.run("delete_list", |s| s.delete_list(id))
    }
}
