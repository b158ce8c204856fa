//! ETH/USD quote for the transactions table. Looked up while rendering,
//! never part of a refresh cycle.
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::fetcher_traits::PriceFetcher;

pub struct PriceCache<P> {
    fetcher: Arc<P>,
    ttl: Duration,
    last: Mutex<Option<(Decimal, Instant)>>,
}

impl<P: PriceFetcher + Send + Sync> PriceCache<P> {
    pub fn new(fetcher: Arc<P>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            last: Mutex::new(None),
        }
    }

    /// Current quote, or `None` when the lookup fails and nothing fresh is cached.
    pub async fn eth_usd(&self) -> Option<Decimal> {
        let mut last = self.last.lock().await;
        if let Some((price, at)) = *last {
            if at.elapsed() < self.ttl {
                return Some(price);
            }
        }
        match self.fetcher.eth_usd_price().await {
            Ok(price) => {
                *last = Some((price, Instant::now()));
                Some(price)
            }
            Err(e) => {
                tracing::warn!(error = %e, "ETH/USD lookup failed; rendering without USD values");
                None
            }
        }
    }
}

/// `eth * price` rounded to cents, formatted with a dollar sign.
pub fn usd_display(eth: Decimal, price: Decimal) -> String {
    format!("${:.2}", (eth * price).round_dp(2))
}
