//! HTTP clients for the three upstream sources: daily refund CSV files,
//! the analytical database holding the leaderboard aggregate, and the ETH/USD
//! spot price.
use crate::config;
use crate::types::{
    ClickhouseJson, LeaderboardEntry, RefundRecord, SpotPriceResponse, REFUND_VALUE_COLUMN,
};
use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::debug;

pub struct RefundSources {
    client: reqwest::Client,
    csv_base_url: String,
    clickhouse_url: String,
    clickhouse_user: Option<String>,
    clickhouse_password: Option<String>,
    leaderboard_query: String,
    price_url: String,
}

impl RefundSources {
    pub fn new(cfg: &config::Sources) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            csv_base_url: cfg.csv_base_url.trim_end_matches('/').to_string(),
            clickhouse_url: cfg.clickhouse_url.trim_end_matches('/').to_string(),
            clickhouse_user: cfg.clickhouse_user.clone(),
            clickhouse_password: cfg.clickhouse_password.clone(),
            leaderboard_query: cfg.leaderboard_query.trim().to_string(),
            price_url: cfg.price_url.clone(),
        })
    }

    pub fn day_csv_url(&self, date: &str) -> String {
        format!("{}/{date}.csv", self.csv_base_url)
    }

    pub fn clickhouse_url(&self) -> &str {
        &self.clickhouse_url
    }

    pub fn price_url(&self) -> &str {
        &self.price_url
    }

    /// Fetch one day's CSV. `Ok(None)` means the host has no file for that day.
    pub async fn fetch_day_csv(&self, date: &str) -> Result<Option<Vec<RefundRecord>>> {
        let url = self.day_csv_url(date);
        debug!(url = %url, "fetching refund csv");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch refunds for {date}"))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            bail!("refund csv for {date} returned HTTP {status}");
        }

        let body = resp.bytes().await?;
        let records = parse_refund_csv(&body)
            .with_context(|| format!("failed to parse refund csv for {date}"))?;
        Ok(Some(records))
    }

    pub async fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let query = format!("{} FORMAT JSON", self.leaderboard_query.trim_end_matches(';'));
        let mut req = self.client.post(&self.clickhouse_url).body(query);
        if let Some(user) = &self.clickhouse_user {
            req = req.basic_auth(user, self.clickhouse_password.as_deref());
        }

        let resp = req
            .send()
            .await
            .context("failed to query leaderboard")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("leaderboard query returned HTTP {status}: {}", body.trim());
        }

        let body = resp.text().await?;
        let parsed: ClickhouseJson<LeaderboardEntry> =
            serde_json::from_str(&body).context("failed to decode leaderboard rows")?;
        Ok(parsed.data)
    }

    pub async fn fetch_eth_usd(&self) -> Result<Decimal> {
        let resp = self
            .client
            .get(&self.price_url)
            .send()
            .await
            .context("failed to fetch ETH/USD price")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("price endpoint returned HTTP {status}");
        }
        let body: SpotPriceResponse = resp.json().await.context("failed to decode price")?;
        Ok(body.data.amount)
    }
}

/// Parse a refund CSV body. The header row is required and must contain
/// `refund_value_eth`.
pub fn parse_refund_csv(body: &[u8]) -> Result<Vec<RefundRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(body);
    let headers = reader.headers().context("failed to read csv headers")?.clone();
    if !headers.iter().any(|h| h == REFUND_VALUE_COLUMN) {
        bail!("csv header has no {REFUND_VALUE_COLUMN} column");
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.context("failed to parse csv record")?;
        if let Some(rec) = RefundRecord::from_row(headers.iter(), row.iter()) {
            records.push(rec);
        }
    }
    Ok(records)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Timeout,
    Connect,
    Status,
    Decode,
    Other,
}

impl ApiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Status => "status",
            Self::Decode => "decode",
            Self::Other => "other",
        }
    }
}

/// Coarse error class for metric labels.
pub fn classify_api_error(err: &anyhow::Error) -> ApiErrorKind {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            if e.is_timeout() {
                return ApiErrorKind::Timeout;
            }
            if e.is_connect() {
                return ApiErrorKind::Connect;
            }
            if e.is_status() {
                return ApiErrorKind::Status;
            }
            if e.is_decode() {
                return ApiErrorKind::Decode;
            }
        }
        if cause.is::<csv::Error>() || cause.is::<serde_json::Error>() {
            return ApiErrorKind::Decode;
        }
    }
    if err.to_string().contains("HTTP ") {
        return ApiErrorKind::Status;
    }
    ApiErrorKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources_config() -> config::Sources {
        config::Sources {
            csv_base_url: "https://refunds.example.org/daily/".to_string(),
            clickhouse_url: "http://localhost:8123/".to_string(),
            clickhouse_user: None,
            clickhouse_password: None,
            leaderboard_query: "SELECT 1;".to_string(),
            price_url: "https://example.org/price".to_string(),
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn test_day_csv_url_strips_trailing_slash() {
        let sources = RefundSources::new(&sources_config()).unwrap();
        assert_eq!(
            sources.day_csv_url("2024-03-01"),
            "https://refunds.example.org/daily/2024-03-01.csv"
        );
        assert_eq!(sources.clickhouse_url(), "http://localhost:8123");
    }

    #[test]
    fn test_parse_refund_csv() {
        let body = b"block_number,tx_hash,refund_value_eth\n100,0xaa,0.5\n101,0xbb,1.25\n";
        let records = parse_refund_csv(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].refund_value_eth, "1.25");
        assert_eq!(records[0].get("tx_hash"), Some("0xaa"));
    }

    #[test]
    fn test_parse_refund_csv_header_only() {
        let records = parse_refund_csv(b"tx_hash,refund_value_eth\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_refund_csv_missing_column() {
        let err = parse_refund_csv(b"tx_hash,value\n0xaa,1\n").unwrap_err();
        assert!(err.to_string().contains("refund_value_eth"));
    }

    #[test]
    fn test_parse_refund_csv_ragged_row_is_error() {
        assert!(parse_refund_csv(b"tx_hash,refund_value_eth\n0xaa\n").is_err());
    }

    #[test]
    fn test_classify_status_message() {
        let err = anyhow::anyhow!("refund csv for 2024-01-01 returned HTTP 500 Internal Server Error");
        assert_eq!(classify_api_error(&err), ApiErrorKind::Status);
    }

    #[test]
    fn test_classify_decode_error() {
        let json_err = serde_json::from_str::<u64>("nope").unwrap_err();
        let err = anyhow::Error::from(json_err).context("failed to decode leaderboard rows");
        assert_eq!(classify_api_error(&err), ApiErrorKind::Decode);
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(
            classify_api_error(&anyhow::anyhow!("boom")),
            ApiErrorKind::Other
        );
    }
}
