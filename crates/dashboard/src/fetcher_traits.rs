use anyhow::Result;
use common::types::{LeaderboardEntry, RefundRecord};
use rust_decimal::Decimal;

/// Loads the refund records for an ordered list of `YYYY-MM-DD` days.
/// Resolves once every day has been ingested.
pub trait BulkLoader {
    fn load_days(
        &self,
        dates: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<RefundRecord>>> + Send;
}

/// Fetches the precomputed leaderboard aggregate.
pub trait AggregateFetcher {
    fn fetch_aggregate(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<LeaderboardEntry>>> + Send;
}

pub trait PriceFetcher {
    fn eth_usd_price(&self) -> impl std::future::Future<Output = Result<Decimal>> + Send;
}

/// Everything the dashboard needs from upstream.
pub trait Sources: BulkLoader + AggregateFetcher + PriceFetcher + Send + Sync + 'static {}

impl<T> Sources for T where T: BulkLoader + AggregateFetcher + PriceFetcher + Send + Sync + 'static {}
