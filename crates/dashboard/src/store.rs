//! Dashboard state as an explicit state machine.
//!
//! The state changes through exactly three transitions: `start`, `succeed`
//! and `fail`. Every `start` issues a new [`RequestToken`]; a completion that
//! carries an older token than the latest issued one is discarded, so a slow
//! refresh for a previous period cannot overwrite newer data.
use chrono::{DateTime, Utc};
use common::types::{LeaderboardEntry, RefundRecord};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::period::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    Idle,
    Loading { token: RequestToken },
    Ready { loaded_at: DateTime<Utc> },
    Failed,
}

impl RefreshStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Ready { .. } => "ready",
            Self::Failed => "failed",
        }
    }
}

/// What a successful refresh publishes.
#[derive(Debug, Clone, Default)]
pub struct RefreshPayload {
    pub records: Vec<RefundRecord>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Stale,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    period: Period,
    status: RefreshStatus,
    records: Arc<Vec<RefundRecord>>,
    leaderboard: Arc<Vec<LeaderboardEntry>>,
    error: Option<String>,
    last_token: u64,
}

impl DashboardState {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            status: RefreshStatus::Idle,
            records: Arc::default(),
            leaderboard: Arc::default(),
            error: None,
            last_token: 0,
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn status(&self) -> &RefreshStatus {
        &self.status
    }

    pub fn records(&self) -> &Arc<Vec<RefundRecord>> {
        &self.records
    }

    pub fn leaderboard(&self) -> &Arc<Vec<LeaderboardEntry>> {
        &self.leaderboard
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Begin a refresh for `period`. Previously loaded data stays visible
    /// until the refresh completes.
    pub fn start(&mut self, period: Period) -> RequestToken {
        self.last_token += 1;
        let token = RequestToken(self.last_token);
        self.period = period;
        self.status = RefreshStatus::Loading { token };
        self.error = None;
        token
    }

    /// Switch to `period` and start its refresh. `None` when it is already
    /// the selected period.
    pub fn select(&mut self, period: Period) -> Option<RequestToken> {
        (self.period != period).then(|| self.start(period))
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.last_token
    }

    pub fn succeed(&mut self, token: RequestToken, payload: RefreshPayload) -> Applied {
        if !self.is_current(token) {
            return Applied::Stale;
        }
        self.records = Arc::new(payload.records);
        self.leaderboard = Arc::new(payload.leaderboard);
        self.error = None;
        self.status = RefreshStatus::Ready {
            loaded_at: Utc::now(),
        };
        Applied::Applied
    }

    pub fn fail(&mut self, token: RequestToken, message: String) -> Applied {
        if !self.is_current(token) {
            return Applied::Stale;
        }
        self.error = Some(message);
        self.status = RefreshStatus::Failed;
        Applied::Applied
    }
}

/// Shared handle to the dashboard state. Clone is cheap.
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<DashboardState>>,
}

impl Store {
    pub fn new(period: Period) -> Self {
        Self {
            inner: Arc::new(RwLock::new(DashboardState::new(period))),
        }
    }

    pub async fn start(&self, period: Period) -> RequestToken {
        self.inner.write().await.start(period)
    }

    pub async fn select(&self, period: Period) -> Option<RequestToken> {
        self.inner.write().await.select(period)
    }

    pub async fn succeed(&self, token: RequestToken, payload: RefreshPayload) -> Applied {
        self.inner.write().await.succeed(token, payload)
    }

    pub async fn fail(&self, token: RequestToken, message: String) -> Applied {
        self.inner.write().await.fail(token, message)
    }

    /// Cloned view of the current state; record collections are shared, not copied.
    pub async fn snapshot(&self) -> DashboardState {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(v: &str) -> RefundRecord {
        RefundRecord::new(v, vec![("refund_value_eth".to_string(), v.to_string())])
    }

    fn payload(values: &[&str]) -> RefreshPayload {
        RefreshPayload {
            records: values.iter().map(|v| record(v)).collect(),
            leaderboard: vec![],
        }
    }

    #[test]
    fn test_initial_state_is_idle() {
        let state = DashboardState::new(Period::ThisMonth);
        assert_eq!(state.status(), &RefreshStatus::Idle);
        assert!(state.records().is_empty());
        assert!(state.error().is_none());
    }

    #[test]
    fn test_start_then_success() {
        let mut state = DashboardState::new(Period::ThisMonth);
        let token = state.start(Period::ThisWeek);
        assert_eq!(state.status(), &RefreshStatus::Loading { token });
        assert_eq!(state.period(), Period::ThisWeek);

        assert_eq!(state.succeed(token, payload(&["1.0", "2.0"])), Applied::Applied);
        assert!(matches!(state.status(), RefreshStatus::Ready { .. }));
        assert_eq!(state.records().len(), 2);
    }

    #[test]
    fn test_failure_keeps_previous_records() {
        let mut state = DashboardState::new(Period::ThisMonth);
        let first = state.start(Period::ThisMonth);
        state.succeed(first, payload(&["1.0"]));

        let second = state.start(Period::Today);
        assert_eq!(state.fail(second, "csv host down".to_string()), Applied::Applied);
        assert_eq!(state.status(), &RefreshStatus::Failed);
        assert_eq!(state.error(), Some("csv host down"));
        assert_eq!(state.records().len(), 1);
    }

    #[test]
    fn test_start_clears_previous_error() {
        let mut state = DashboardState::new(Period::ThisMonth);
        let t = state.start(Period::ThisMonth);
        state.fail(t, "boom".to_string());
        state.start(Period::ThisMonth);
        assert!(state.error().is_none());
    }

    #[test]
    fn test_tokens_are_monotonic() {
        let mut state = DashboardState::new(Period::ThisMonth);
        let a = state.start(Period::Today);
        let b = state.start(Period::ThisWeek);
        assert!(b > a);
        assert_eq!(b.get(), a.get() + 1);
    }

    #[test]
    fn test_stale_success_is_discarded() {
        let mut state = DashboardState::new(Period::ThisMonth);
        let old = state.start(Period::ThisMonth);
        let new = state.start(Period::Today);

        assert_eq!(state.succeed(new, payload(&["5.0"])), Applied::Applied);
        assert_eq!(state.succeed(old, payload(&["1.0", "2.0", "3.0"])), Applied::Stale);
        assert_eq!(state.records().len(), 1);
        assert_eq!(state.period(), Period::Today);
    }

    #[test]
    fn test_stale_failure_is_discarded() {
        let mut state = DashboardState::new(Period::ThisMonth);
        let old = state.start(Period::ThisMonth);
        let new = state.start(Period::Today);
        assert_eq!(state.fail(old, "late".to_string()), Applied::Stale);
        assert_eq!(state.status(), &RefreshStatus::Loading { token: new });
        assert!(state.error().is_none());
    }

    #[test]
    fn test_select_starts_only_on_change() {
        let mut state = DashboardState::new(Period::ThisMonth);
        assert_eq!(state.select(Period::ThisMonth), None);
        assert_eq!(state.status(), &RefreshStatus::Idle);

        let token = state.select(Period::Today).unwrap();
        assert_eq!(state.period(), Period::Today);
        assert_eq!(state.status(), &RefreshStatus::Loading { token });
        assert_eq!(state.select(Period::Today), None);
        assert!(state.is_current(token));
    }

    #[tokio::test]
    async fn test_store_snapshot_reflects_transitions() {
        let store = Store::new(Period::ThisMonth);
        let token = store.start(Period::ThisWeek).await;
        assert_eq!(store.snapshot().await.status().as_str(), "loading");
        store.succeed(token, payload(&["0.1"])).await;
        let snap = store.snapshot().await;
        assert_eq!(snap.status().as_str(), "ready");
        assert_eq!(snap.records()[0].refund_value_eth, "0.1");
    }
}
