//! Syncer - runs push and pull requests as serializable transactions.
//!
//! Every request gets exactly one transaction per attempt. An attempt that
//! fails for any reason is rolled back; an attempt that fails with
//! [`Error::TransactionConflict`] is run again with exponential backoff until
//! `max_attempts` is reached. The optional request deadline covers all
//! attempts; when it fires the in-flight transaction is dropped, which rolls
//! it back.

use crate::{
    error::Result, process_pull, process_push, ClientInfo, Cookie, Error, Handler, Mutation,
    PullResponse, PushOutcome, Registry, Store, Transaction,
};
use std::future::Future;
use std::time::Duration;
use tracing::Instrument;

/// Tuning for a [`Syncer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Client group creation policy
    pub registry: Registry,
    /// Total attempts per request, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub retry_backoff: Duration,
    /// Upper bound for the delay between retries
    pub max_retry_backoff: Duration,
    /// Deadline for a whole request, retries included
    pub request_timeout: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            max_attempts: 5,
            retry_backoff: Duration::from_millis(10),
            max_retry_backoff: Duration::from_secs(1),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl SyncConfig {
    /// Sets whether unknown client groups are created on push.
    pub fn with_create_on_push(mut self, enabled: bool) -> Self {
        self.registry.create_on_push = enabled;
        self
    }

    /// Sets whether unknown client groups are created on pull.
    pub fn with_create_on_pull(mut self, enabled: bool) -> Self {
        self.registry.create_on_pull = enabled;
        self
    }

    /// Sets the total number of attempts per request. Values below 1 count as 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the initial and maximum retry delay.
    pub fn with_retry_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.retry_backoff = initial;
        self.max_retry_backoff = max;
        self
    }

    /// Sets the request deadline, `None` to disable it.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.retry_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_retry_backoff)
    }
}

/// Entry point for push and pull requests.
pub struct Syncer<S, H> {
    store: S,
    handler: H,
    config: SyncConfig,
}

impl<S, H> Syncer<S, H>
where
    S: Store,
    H: Handler<S::Tx>,
{
    /// Create a syncer with default configuration.
    pub fn new(store: S, handler: H) -> Self {
        Self {
            store,
            handler,
            config: SyncConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Apply a batch of mutations for `info.client_group_id`.
    pub async fn push(&self, info: &ClientInfo, mutations: &[Mutation]) -> Result<PushOutcome> {
        let span = tracing::info_span!(
            "push",
            client_group_id = %info.client_group_id,
            mutations = mutations.len()
        );
        let outcome = self
            .bounded(self.retrying("push", move || self.push_once(info, mutations)))
            .instrument(span)
            .await?;

        tracing::info!(
            client_group_id = %info.client_group_id,
            applied = outcome.applied,
            skipped = outcome.skipped,
            "push committed"
        );
        Ok(outcome)
    }

    /// Compute what changed for `info.client_group_id` since `cookie`.
    pub async fn pull(&self, info: &ClientInfo, cookie: &Cookie) -> Result<PullResponse> {
        let span = tracing::info_span!("pull", client_group_id = %info.client_group_id);
        self.bounded(self.retrying("pull", move || self.pull_once(info, cookie)))
            .instrument(span)
            .await
    }

    async fn push_once(&self, info: &ClientInfo, mutations: &[Mutation]) -> Result<PushOutcome> {
        let mut tx = self.store.begin().await?;
        let result =
            process_push(&mut tx, &self.config.registry, &self.handler, info, mutations).await;
        finish(tx, result).await
    }

    async fn pull_once(&self, info: &ClientInfo, cookie: &Cookie) -> Result<PullResponse> {
        let mut tx = self.store.begin().await?;
        let result = process_pull(&mut tx, &self.config.registry, &self.handler, info, cookie).await;
        finish(tx, result).await
    }

    async fn retrying<T, F, Fut>(&self, kind: &'static str, mut attempt_once: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match attempt_once().await {
                Err(err) if err.is_conflict() && attempt < self.config.max_attempts => {
                    let delay = self.config.backoff(attempt);
                    tracing::debug!(
                        kind,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "serialization conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_conflict() => {
                    tracing::warn!(kind, attempt, "serialization conflict, giving up");
                    return Err(err);
                }
                other => return other,
            }
        }
    }

    async fn bounded<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                tracing::warn!(timeout_ms = limit.as_millis() as u64, "request deadline exceeded");
                Error::Timeout
            })?,
            None => work.await,
        }
    }
}

/// Commit on success, roll back on failure.
async fn finish<Tx: Transaction, T>(tx: Tx, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
