//! Pending navigation jobs and cooperative cancellation.
//!
//! A navigation that needs remote data runs as a job in one
//! [`JobCategory`]. The [`JobRegistry`] keeps at most one job per category:
//! registering a new one cancels the old one's token (last request wins).
//! Results are only applied if their [`JobTicket`] is still current, so a
//! cancelled job that finishes anyway can never reach the stack.
//!
//! Suspension points race the token with [`or_cancel`].

use crate::{debug_log, trace_log};
use futures::future::{self, Either};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::pin;
use tokio_util::sync::CancellationToken;

/// Independent lanes of asynchronous navigation work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobCategory {
    /// Course/group/user lookups, with tab and quiz checks.
    CanvasContextLookup,
    /// Module item sequence and sibling lookups.
    ModuleProgression,
    /// LTI launch url lookups.
    LtiLaunch,
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobCategory::CanvasContextLookup => "context-lookup",
            JobCategory::ModuleProgression => "module-progression",
            JobCategory::LtiLaunch => "lti-launch",
        };
        f.write_str(name)
    }
}

/// Proof of registration for one job.
#[derive(Debug, Clone)]
pub struct JobTicket {
    category: JobCategory,
    id: u64,
    token: CancellationToken,
}

impl JobTicket {
    pub fn category(&self) -> JobCategory {
        self.category
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Token checked at every suspension point of this job.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this job.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct ActiveJob {
    id: u64,
    token: CancellationToken,
}

/// At-most-one-job-per-category registry, scoped to one host.
#[derive(Debug, Default)]
pub struct JobRegistry {
    active: HashMap<JobCategory, ActiveJob>,
    next_id: u64,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job, cancelling the active job of the same category.
    pub fn begin(&mut self, category: JobCategory) -> JobTicket {
        self.next_id += 1;
        let id = self.next_id;
        let token = CancellationToken::new();
        if let Some(previous) = self.active.insert(
            category,
            ActiveJob {
                id,
                token: token.clone(),
            },
        ) {
            debug_log!(
                "Job {} ({}) supersedes job {}",
                id,
                category,
                previous.id
            );
            previous.token.cancel();
        } else {
            trace_log!("Job {} ({}) started", id, category);
        }
        JobTicket {
            category,
            id,
            token,
        }
    }

    /// Check if a ticket's job is still the active, uncancelled job of its
    /// category.
    pub fn is_current(&self, ticket: &JobTicket) -> bool {
        !ticket.is_cancelled()
            && self
                .active
                .get(&ticket.category)
                .is_some_and(|job| job.id == ticket.id)
    }

    /// Retire a job once its result has been applied or discarded.
    pub fn finish(&mut self, ticket: &JobTicket) {
        if self
            .active
            .get(&ticket.category)
            .is_some_and(|job| job.id == ticket.id)
        {
            self.active.remove(&ticket.category);
        }
    }

    /// Cancel every pending job. Called on host teardown.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.active.len();
        for (category, job) in self.active.drain() {
            debug_log!("Cancelling job {} ({})", job.id, category);
            job.token.cancel();
        }
        count
    }

    /// Check if a category has a job in flight.
    pub fn is_active(&self, category: JobCategory) -> bool {
        self.active.contains_key(&category)
    }

    /// Number of jobs in flight.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

/// Returned by [`or_cancel`] when the token fired first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Race a future against a cancellation token.
///
/// An already-cancelled token wins without polling the future.
pub async fn or_cancel<F>(fut: F, token: &CancellationToken) -> Result<F::Output, Cancelled>
where
    F: Future,
{
    if token.is_cancelled() {
        return Err(Cancelled);
    }
    let fut = pin!(fut);
    let cancelled = pin!(token.cancelled());
    match future::select(fut, cancelled).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(((), _)) => Err(Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;

    #[test]
    fn test_begin_cancels_same_category() {
        let mut registry = JobRegistry::new();
        let first = registry.begin(JobCategory::CanvasContextLookup);
        let second = registry.begin(JobCategory::CanvasContextLookup);

        assert!(first.is_cancelled());
        assert!(!registry.is_current(&first));
        assert!(registry.is_current(&second));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_categories_are_independent() {
        let mut registry = JobRegistry::new();
        let lookup = registry.begin(JobCategory::CanvasContextLookup);
        let lti = registry.begin(JobCategory::LtiLaunch);

        assert!(registry.is_current(&lookup));
        assert!(registry.is_current(&lti));
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_finish_only_retires_own_job() {
        let mut registry = JobRegistry::new();
        let first = registry.begin(JobCategory::ModuleProgression);
        let second = registry.begin(JobCategory::ModuleProgression);

        registry.finish(&first);
        assert!(registry.is_active(JobCategory::ModuleProgression));

        registry.finish(&second);
        assert!(!registry.is_active(JobCategory::ModuleProgression));
    }

    #[test]
    fn test_cancel_all() {
        let mut registry = JobRegistry::new();
        let a = registry.begin(JobCategory::CanvasContextLookup);
        let b = registry.begin(JobCategory::LtiLaunch);

        assert_eq!(registry.cancel_all(), 2);
        assert!(a.is_cancelled() && b.is_cancelled());
        assert!(!registry.is_current(&a));
    }

    #[test]
    fn test_or_cancel_completes() {
        let token = CancellationToken::new();
        let result = pollster::block_on(or_cancel(async { 42 }, &token));
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_or_cancel_pre_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = pollster::block_on(or_cancel(async { 42 }, &token));
        assert_eq!(result, Err(Cancelled));
    }

    #[tokio::test]
    async fn test_or_cancel_wakes_on_cancel() {
        let token = CancellationToken::new();
        let (_tx, rx) = oneshot::channel::<u32>();
        let canceller = token.clone();

        let (result, ()) = futures::join!(or_cancel(rx, &token), async move {
            canceller.cancel();
        });
        assert_eq!(result, Err(Cancelled));
    }
}
