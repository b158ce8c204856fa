use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Column that every refund row must carry; it drives the ranking.
pub const REFUND_VALUE_COLUMN: &str = "refund_value_eth";

/// One refunded transaction from a daily CSV file.
///
/// Only `refund_value_eth` is interpreted. Every column of the source row,
/// including the refund value, is kept in source order for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRecord {
    pub refund_value_eth: String,
    pub columns: Vec<(String, String)>,
}

impl RefundRecord {
    pub fn new(refund_value_eth: impl Into<String>, columns: Vec<(String, String)>) -> Self {
        Self {
            refund_value_eth: refund_value_eth.into(),
            columns,
        }
    }

    /// Build a record from a header row and a data row of equal width.
    /// Returns `None` when the row has no `refund_value_eth` column.
    pub fn from_row<'a>(
        headers: impl IntoIterator<Item = &'a str>,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Option<Self> {
        let columns: Vec<(String, String)> = headers
            .into_iter()
            .zip(values)
            .map(|(h, v)| (h.trim().to_string(), v.to_string()))
            .collect();
        let refund_value_eth = columns
            .iter()
            .find(|(h, _)| h == REFUND_VALUE_COLUMN)?
            .1
            .clone();
        Some(Self {
            refund_value_eth,
            columns,
        })
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(h, _)| h == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(h, _)| h.as_str())
    }
}

/// Aggregate leaderboard row from the analytical database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeaderboardEntry {
    pub recipient: String,
    #[serde(deserialize_with = "de_string_any")]
    pub total_refund_eth: String,
    #[serde(deserialize_with = "de_u64_any")]
    pub refund_count: u64,
}

/// `FORMAT JSON` envelope returned by the analytical database HTTP interface.
#[derive(Debug, Deserialize)]
pub struct ClickhouseJson<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub rows: Option<u64>,
}

/// Spot price body: `{"data":{"amount":"2345.67","base":"ETH","currency":"USD"}}`.
#[derive(Debug, Deserialize)]
pub struct SpotPriceResponse {
    pub data: SpotPrice,
}

#[derive(Debug, Deserialize)]
pub struct SpotPrice {
    pub amount: Decimal,
    pub base: Option<String>,
    pub currency: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Num(serde_json::Number),
}

// The database quotes 64-bit integers and decimals by default; accept both shapes.
fn de_string_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Num(n) => n.to_string(),
    })
}

fn de_u64_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
        StringOrNumber::Num(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("not an unsigned integer: {n}"))),
    }
}
