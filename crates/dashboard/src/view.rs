//! Transaction table pipeline: rank by refund value, cut into pages, and
//! track which tab is showing.
use common::types::RefundRecord;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::cmp::Ordering;
use std::str::FromStr;

pub const PAGE_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Transactions,
    Leaderboard,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Leaderboard => "leaderboard",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Transactions => "Recent Transactions",
            Self::Leaderboard => "Leaderboard",
        }
    }
}

/// Tab and page the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    tab: Tab,
    page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            tab: Tab::default(),
            page: 1,
        }
    }
}

impl ViewState {
    pub fn new(tab: Tab, page: usize) -> Self {
        Self {
            tab,
            page: page.max(1),
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Changing tabs always starts over at page 1, even when re-selecting
    /// the active tab.
    pub fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Pull the page back to the last one when the record set has shrunk,
    /// e.g. after switching to a shorter period.
    pub fn clamp_page(&mut self, total_pages: usize) {
        self.page = self.page.min(total_pages.max(1));
    }
}

/// Numeric refund value. Plain and scientific notation are accepted.
pub fn refund_value(record: &RefundRecord) -> Option<Decimal> {
    let raw = record.refund_value_eth.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Ordering key for a refund value: the float carries the magnitude, the
/// decimal separates values the float rounds together. `None` when the value
/// is not a number at all.
fn sort_key(record: &RefundRecord) -> Option<(f64, Option<Decimal>)> {
    let exact = refund_value(record);
    let approx = record
        .refund_value_eth
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .or_else(|| exact.and_then(|d| d.to_f64()))?;
    Some((approx, exact))
}

fn by_refund_desc(a: &RefundRecord, b: &RefundRecord) -> Ordering {
    match (sort_key(a), sort_key(b)) {
        (Some((xf, xd)), Some((yf, yd))) => yf.total_cmp(&xf).then_with(|| yd.cmp(&xd)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// New sequence ranked by refund value, largest first. Equal values keep
/// their input order; unparseable values go last.
pub fn sort_by_refund(records: &[RefundRecord]) -> Vec<RefundRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(by_refund_desc);
    sorted
}

pub fn total_pages(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE)
}

/// One page of an already sorted record set.
#[derive(Debug)]
pub struct Page<'a> {
    pub number: usize,
    pub total_pages: usize,
    pub total_records: usize,
    /// Index of the first row within the full sorted set.
    pub offset: usize,
    pub rows: &'a [RefundRecord],
}

impl Page<'_> {
    pub fn has_prev(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

/// Page `page` (1-based) of `sorted`. Page 0 reads as page 1; pages past the
/// end are empty.
pub fn paginate(sorted: &[RefundRecord], page: usize) -> Page<'_> {
    let number = page.max(1);
    let start = (number - 1).saturating_mul(PAGE_SIZE).min(sorted.len());
    let end = start.saturating_add(PAGE_SIZE).min(sorted.len());
    Page {
        number,
        total_pages: total_pages(sorted.len()),
        total_records: sorted.len(),
        offset: start,
        rows: &sorted[start..end],
    }
}

/// Page numbers to show in the pager: a window of `width` pages around
/// `current`, clamped to `1..=total`.
pub fn pager_window(current: usize, total: usize, width: usize) -> Vec<usize> {
    if total == 0 || width == 0 {
        return Vec::new();
    }
    let width = width.min(total);
    let half = width / 2;
    let first = current
        .saturating_sub(half)
        .max(1)
        .min(total - width + 1);
    (first..first + width).collect()
}
