//! Refresh cycle: resolve the period, bulk-load its days, fetch the
//! leaderboard aggregate, and report the outcome into the [`Store`].
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

use crate::fetcher_traits::{AggregateFetcher, BulkLoader};
use crate::period::{self, Period};
use crate::store::{Applied, RefreshPayload, RequestToken, Store};

pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("{0}")]
    Upstream(String),
    #[error("An unknown error occurred")]
    Unknown,
}

impl From<anyhow::Error> for RefreshError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        if message.trim().is_empty() {
            Self::Unknown
        } else {
            Self::Upstream(message)
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub token: RequestToken,
    pub applied: Applied,
    pub records: usize,
}

pub struct RefreshController<S> {
    sources: Arc<S>,
    store: Store,
}

impl<S> RefreshController<S>
where
    S: BulkLoader + AggregateFetcher + Send + Sync + 'static,
{
    pub fn new(sources: Arc<S>, store: Store) -> Self {
        Self { sources, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run one refresh cycle for `period`. Both fetches run in order; the
    /// first failure ends the cycle and is reported as the cycle's failure.
    #[allow(dead_code)]
    pub async fn refresh(&self, period: Period) -> Result<RefreshOutcome, RefreshError> {
        let token = self.store.start(period).await;
        self.run(token, period)
            .instrument(refresh_span(period, token))
            .await
    }

    async fn run(
        &self,
        token: RequestToken,
        period: Period,
    ) -> Result<RefreshOutcome, RefreshError> {
        let started = Instant::now();
        let res = self.fetch(period).await;
        let ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("refund_dashboard_refresh_duration_ms").record(ms);

        match res {
            Ok(payload) => {
                let records = payload.records.len();
                let applied = self.store.succeed(token, payload).await;
                record_outcome("success", applied);
                if applied == Applied::Applied {
                    metrics::gauge!("refund_dashboard_records_loaded").set(records as f64);
                    info!(records, elapsed_ms = ms, "refresh complete");
                }
                Ok(RefreshOutcome {
                    token,
                    applied,
                    records,
                })
            }
            Err(err) => {
                let err = RefreshError::from(err);
                let applied = self.store.fail(token, err.to_string()).await;
                record_outcome("failure", applied);
                warn!(error = %err, "refresh failed");
                Err(err)
            }
        }
    }

    async fn fetch(&self, period: Period) -> anyhow::Result<RefreshPayload> {
        let dates = period::resolve_now(period);
        let records = self.sources.load_days(&dates).await?;
        let leaderboard = self.sources.fetch_aggregate().await?;
        Ok(RefreshPayload {
            records,
            leaderboard,
        })
    }

    /// Start a refresh now and finish it on its own task. The state is
    /// already `Loading` when this returns; the outcome is published through
    /// the store.
    pub async fn spawn_refresh(self: &Arc<Self>, period: Period) -> JoinHandle<()> {
        let token = self.store.start(period).await;
        self.launch(token, period)
    }

    /// Select `period`. Refreshes only when it differs from the current one;
    /// the comparison and the start happen under one store lock.
    pub async fn change_period(self: &Arc<Self>, period: Period) -> Option<JoinHandle<()>> {
        let token = self.store.select(period).await?;
        info!(to = %period, "period changed");
        Some(self.launch(token, period))
    }

    fn launch(self: &Arc<Self>, token: RequestToken, period: Period) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(
            async move {
                // Failure is already logged and stored.
                let _ = this.run(token, period).await;
            }
            .instrument(refresh_span(period, token)),
        )
    }
}

fn refresh_span(period: Period, token: RequestToken) -> tracing::Span {
    tracing::info_span!("refresh", period = %period, token = token.get())
}

fn record_outcome(outcome: &'static str, applied: Applied) {
    if applied == Applied::Stale {
        metrics::counter!("refund_dashboard_stale_responses_total").increment(1);
        info!(outcome, "discarding superseded refresh result");
    }
    metrics::counter!("refund_dashboard_refresh_total", "outcome" => outcome).increment(1);
}
