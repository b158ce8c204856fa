//! View models for dashboard templates.
//! Typed structs the templates render; display strings are computed here so
//! templates stay free of logic.
use common::types::{LeaderboardEntry, RefundRecord};
use rust_decimal::Decimal;

use crate::period::Period;
use crate::price::usd_display;
use crate::store::{DashboardState, RefreshStatus};
use crate::view::{self, Page, Tab};

/// Accent colors cycled across table rows (CSS custom properties).
pub const ROW_COLORS: [&str; 10] = [
    "--hero-6", "--hero-7", "--hero-8", "--hero-9", "--hero-10", "--hero-11", "--hero-12",
    "--hero-13", "--hero-14", "--hero-15",
];

const PAGER_WIDTH: usize = 7;

pub fn row_color(index: usize) -> String {
    ROW_COLORS[index % ROW_COLORS.len()].to_string()
}

pub fn shorten_address(addr: &str) -> String {
    if addr.len() > 12 && addr.is_ascii() {
        format!("{}..{}", &addr[..6], &addr[addr.len() - 4..])
    } else {
        addr.to_string()
    }
}

pub struct TabLink {
    pub tab: String,
    pub label: String,
    pub active: bool,
}

pub fn tab_links(active: Tab) -> Vec<TabLink> {
    [Tab::Transactions, Tab::Leaderboard]
        .into_iter()
        .map(|t| TabLink {
            tab: t.as_str().to_string(),
            label: t.label().to_string(),
            active: t == active,
        })
        .collect()
}

pub struct PeriodOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub fn period_options(selected: Period) -> Vec<PeriodOption> {
    Period::ALL
        .into_iter()
        .map(|p| PeriodOption {
            value: p.as_str().to_string(),
            label: p.label().to_string(),
            selected: p == selected,
        })
        .collect()
}

pub struct TransactionRow {
    pub rank: usize,
    pub cells: Vec<String>,
    /// Empty when no price is available.
    pub usd: String,
    pub color: String,
}

pub struct PageLink {
    pub number: usize,
    pub active: bool,
}

pub struct PagerView {
    pub current: usize,
    pub total: usize,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    pub pages: Vec<PageLink>,
    pub summary: String,
}

impl PagerView {
    pub fn from_page(page: &Page<'_>) -> Self {
        let summary = if page.rows.is_empty() {
            format!("0 of {}", page.total_records)
        } else {
            format!(
                "{}-{} of {}",
                page.offset + 1,
                page.offset + page.rows.len(),
                page.total_records
            )
        };
        Self {
            current: page.number,
            total: page.total_pages,
            prev: page.has_prev().then(|| page.number - 1),
            next: page.has_next().then(|| page.number + 1),
            pages: view::pager_window(page.number, page.total_pages, PAGER_WIDTH)
                .into_iter()
                .map(|n| PageLink {
                    number: n,
                    active: n == page.number,
                })
                .collect(),
            summary,
        }
    }
}

pub struct TransactionsView {
    pub periods: Vec<PeriodOption>,
    pub columns: Vec<String>,
    pub rows: Vec<TransactionRow>,
    pub show_usd: bool,
    pub pager: PagerView,
}

impl TransactionsView {
    pub fn build(page: &Page<'_>, period: Period, eth_usd: Option<Decimal>) -> Self {
        let columns: Vec<String> = page
            .rows
            .first()
            .map(|r| r.column_names().map(str::to_string).collect())
            .unwrap_or_default();

        let rows = page
            .rows
            .iter()
            .enumerate()
            .map(|(i, rec)| transaction_row(rec, &columns, page.offset + i, eth_usd))
            .collect();

        Self {
            periods: period_options(period),
            columns,
            rows,
            show_usd: eth_usd.is_some(),
            pager: PagerView::from_page(page),
        }
    }
}

fn transaction_row(
    rec: &RefundRecord,
    columns: &[String],
    index: usize,
    eth_usd: Option<Decimal>,
) -> TransactionRow {
    let cells = columns
        .iter()
        .map(|c| rec.get(c).unwrap_or_default().to_string())
        .collect();
    let usd = match (eth_usd, view::refund_value(rec)) {
        (Some(price), Some(eth)) => usd_display(eth, price),
        _ => String::new(),
    };
    TransactionRow {
        rank: index + 1,
        cells,
        usd,
        color: row_color(index),
    }
}

pub struct LeaderboardRow {
    pub rank: usize,
    pub recipient: String,
    pub recipient_short: String,
    pub total_refund_eth: String,
    pub refund_count: u64,
    pub color: String,
}

pub fn leaderboard_rows(entries: &[LeaderboardEntry]) -> Vec<LeaderboardRow> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| LeaderboardRow {
            rank: i + 1,
            recipient: e.recipient.clone(),
            recipient_short: shorten_address(&e.recipient),
            total_refund_eth: e.total_refund_eth.clone(),
            refund_count: e.refund_count,
            color: row_color(i),
        })
        .collect()
}

/// Refresh status strip.
pub struct StatusView {
    pub state: String,
    pub period_label: String,
    pub loading: bool,
    pub error: Option<String>,
    pub records: usize,
    pub leaderboard_rows: usize,
    pub loaded_at: Option<String>,
}

impl StatusView {
    pub fn from_state(state: &DashboardState) -> Self {
        let loaded_at = match state.status() {
            RefreshStatus::Ready { loaded_at } => {
                Some(loaded_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            }
            _ => None,
        };
        Self {
            state: state.status().as_str().to_string(),
            period_label: state.period().label().to_string(),
            loading: matches!(state.status(), RefreshStatus::Loading { .. }),
            error: state.error().map(str::to_string),
            records: state.records().len(),
            leaderboard_rows: state.leaderboard().len(),
            loaded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RefreshPayload;
    use std::str::FromStr;

    fn rec(hash: &str, value: &str) -> RefundRecord {
        RefundRecord::new(
            value,
            vec![
                ("tx_hash".to_string(), hash.to_string()),
                ("refund_value_eth".to_string(), value.to_string()),
            ],
        )
    }

    #[test]
    fn test_shorten_address() {
        assert_eq!(shorten_address("0xabcdef1234567890"), "0xabcd..7890");
        assert_eq!(shorten_address("0x123"), "0x123");
    }

    #[test]
    fn test_row_colors_cycle() {
        assert_eq!(row_color(0), "--hero-6");
        assert_eq!(row_color(9), "--hero-15");
        assert_eq!(row_color(10), "--hero-6");
    }

    #[test]
    fn test_tab_links_mark_active() {
        let links = tab_links(Tab::Leaderboard);
        assert_eq!(links.len(), 2);
        assert!(!links[0].active);
        assert!(links[1].active);
        assert_eq!(links[0].label, "Recent Transactions");
    }

    #[test]
    fn test_transactions_view_ranks_continue_across_pages() {
        let records: Vec<_> = (0..30).map(|i| rec(&format!("0x{i}"), "1.0")).collect();
        let page = view::paginate(&records, 2);
        let tv = TransactionsView::build(&page, Period::ThisWeek, None);
        assert_eq!(tv.rows.len(), 5);
        assert_eq!(tv.rows[0].rank, 26);
        assert_eq!(tv.columns, vec!["tx_hash", "refund_value_eth"]);
        assert!(!tv.show_usd);
        assert_eq!(tv.pager.summary, "26-30 of 30");
        assert_eq!(tv.pager.prev, Some(1));
        assert_eq!(tv.pager.next, None);
        assert!(tv.periods.iter().any(|p| p.selected && p.value == "this_week"));
    }

    #[test]
    fn test_transactions_view_with_price() {
        let records = vec![rec("0xaa", "0.5")];
        let page = view::paginate(&records, 1);
        let tv = TransactionsView::build(&page, Period::Today, Decimal::from_str("2000").ok());
        assert!(tv.show_usd);
        assert_eq!(tv.rows[0].usd, "$1000.00");
    }

    #[test]
    fn test_empty_page_summary() {
        let page = view::paginate(&[], 1);
        let pager = PagerView::from_page(&page);
        assert_eq!(pager.summary, "0 of 0");
        assert!(pager.pages.is_empty());
    }

    #[test]
    fn test_status_view_reports_error_and_counts() {
        let mut state = DashboardState::new(Period::ThisMonth);
        let t = state.start(Period::ThisMonth);
        state.succeed(
            t,
            RefreshPayload {
                records: vec![rec("0xaa", "1")],
                leaderboard: vec![],
            },
        );
        let ok = StatusView::from_state(&state);
        assert_eq!(ok.state, "ready");
        assert_eq!(ok.records, 1);
        assert!(ok.loaded_at.is_some());

        let t = state.start(Period::Today);
        state.fail(t, "leaderboard query returned HTTP 500".to_string());
        let failed = StatusView::from_state(&state);
        assert_eq!(failed.state, "failed");
        assert_eq!(failed.error.as_deref(), Some("leaderboard query returned HTTP 500"));
        assert_eq!(failed.period_label, "Today");
    }
}
