//! Date-scoped sales reporting.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use bookshop_core::Money;

use crate::sale::Sale;

/// Half-open UTC interval `[start, end)` covering one calendar day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The UTC day `date 00:00:00` up to (not including) the next midnight.
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = date
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// A sale joined with the current catalogue entry of the book it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    pub sale: Sale,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl ReportLine {
    pub fn line_total(&self) -> Money {
        self.sale.line_total()
    }
}

impl AsRef<Sale> for ReportLine {
    fn as_ref(&self) -> &Sale {
        &self.sale
    }
}

/// Aggregate figures over a set of sales.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    /// Number of sale records (transactions).
    pub count: usize,
    /// Total copies sold.
    pub units_sold: i64,
    /// Σ unit price × quantity, exact in cents.
    pub revenue: Money,
}

impl SalesSummary {
    /// Revenue per transaction, zero for an empty report.
    pub fn average_transaction(&self) -> Money {
        self.revenue.div_rounded(self.count as i64)
    }
}

/// Totals saturate at the `i64` range rather than overflow.
pub fn summarize<S: AsRef<Sale>>(sales: &[S]) -> SalesSummary {
    sales.iter().map(AsRef::as_ref).fold(SalesSummary::default(), |acc, sale| SalesSummary {
        count: acc.count + 1,
        units_sold: acc.units_sold.saturating_add(sale.quantity()),
        revenue: acc.revenue + sale.line_total(),
    })
}

/// Human-readable summary block shown above the report table.
pub fn render_summary(date: NaiveDate, summary: &SalesSummary) -> String {
    format!(
        "Report for {}\nTotal Sales: {}\nTotal Transactions: {}\nBooks Sold: {}\nAverage Transaction: {}",
        date.format("%A, %B %d, %Y"),
        summary.revenue,
        summary.count,
        summary.units_sold,
        summary.average_transaction(),
    )
}
