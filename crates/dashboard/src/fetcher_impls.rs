use anyhow::Result;
use common::sources::{classify_api_error, RefundSources};
use common::types::{LeaderboardEntry, RefundRecord};
use rust_decimal::Decimal;
use std::time::Instant;

use super::fetcher_traits::{AggregateFetcher, BulkLoader, PriceFetcher};

/// Record latency and outcome of one upstream call.
fn observe<T>(source: &'static str, start: Instant, res: &Result<T>) {
    let ms = start.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("refund_dashboard_source_latency_ms", "source" => source).record(ms);
    match res {
        Ok(_) => {
            metrics::counter!("refund_dashboard_source_requests_total", "source" => source, "status" => "ok").increment(1);
        }
        Err(e) => {
            metrics::counter!("refund_dashboard_source_requests_total", "source" => source, "status" => "error").increment(1);
            metrics::counter!(
                "refund_dashboard_source_errors_total",
                "source" => source,
                "kind" => classify_api_error(e).as_str()
            )
            .increment(1);
        }
    }
}

impl BulkLoader for RefundSources {
    async fn load_days(&self, dates: &[String]) -> Result<Vec<RefundRecord>> {
        let mut records = Vec::new();
        for date in dates {
            let start = Instant::now();
            let res = self.fetch_day_csv(date).await;
            observe("refund_csv", start, &res);
            match res? {
                Some(day) => {
                    tracing::debug!(date = %date, rows = day.len(), "loaded refund csv");
                    records.extend(day);
                }
                None => tracing::warn!(date = %date, "no refund csv for day; skipping"),
            }
        }
        Ok(records)
    }
}

impl AggregateFetcher for RefundSources {
    async fn fetch_aggregate(&self) -> Result<Vec<LeaderboardEntry>> {
        let start = Instant::now();
        let res = self.fetch_leaderboard().await;
        observe("leaderboard", start, &res);
        res
    }
}

impl PriceFetcher for RefundSources {
    async fn eth_usd_price(&self) -> Result<Decimal> {
        let start = Instant::now();
        let res = self.fetch_eth_usd().await;
        observe("eth_usd", start, &res);
        res
    }
}
