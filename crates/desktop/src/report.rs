//! Sales report view: one UTC day of sales, its summary and CSV export.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};
use tracing::{error, info};

use bookshop_sales::{ReportLine, SalesSummary, default_file_name, render_summary, summarize, write_csv};

use crate::state::Ledger;
use crate::types::Notice;

pub struct SalesReport {
    ledger: Arc<Ledger>,
    date: NaiveDate,
    lines: Vec<ReportLine>,
    summary: SalesSummary,
}

impl SalesReport {
    pub fn new(ledger: Arc<Ledger>, date: NaiveDate) -> Self {
        Self {
            ledger,
            date,
            lines: Vec::new(),
            summary: SalesSummary::default(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn lines(&self) -> &[ReportLine] {
        &self.lines
    }

    pub fn summary(&self) -> SalesSummary {
        self.summary
    }

    /// Switch to `date` and reload.
    pub async fn set_date(&mut self, date: NaiveDate) -> Option<Notice> {
        self.date = date;
        self.load().await
    }

    pub async fn today(&mut self) -> Option<Notice> {
        self.set_date(Utc::now().date_naive()).await
    }

    /// Reload the selected day. A failed load leaves an empty report behind.
    pub async fn load(&mut self) -> Option<Notice> {
        match self.ledger.sales_by_date(self.date).await {
            Ok(lines) => {
                self.summary = summarize(&lines);
                self.lines = lines;
                None
            }
            Err(e) => {
                self.lines.clear();
                self.summary = SalesSummary::default();
                Some(Notice::from_ledger("Sales Report", &e))
            }
        }
    }

    pub fn can_export(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn summary_text(&self) -> String {
        render_summary(self.date, &self.summary)
    }

    pub fn default_file_name(&self) -> String {
        default_file_name(self.date)
    }

    /// Write the loaded report to `path`, creating or truncating it. Times are shown
    /// in `tz`.
    pub fn export_to<Tz>(&self, path: &Path, tz: &Tz) -> Notice
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        if !self.can_export() {
            return Notice::error("No Data", "No sales data to export.");
        }

        match self.write_csv_file(path, tz) {
            Ok(()) => {
                info!(path = %path.display(), rows = self.lines.len(), "sales report exported");
                Notice::info(
                    "Export Successful",
                    format!("Sales report exported successfully to:\n{}", path.display()),
                )
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!(path = %path.display(), error = %reason, "sales report export failed");
                Notice::error("Export Error", format!("Error exporting CSV: {reason}"))
            }
        }
    }

    fn write_csv_file<Tz>(&self, path: &Path, tz: &Tz) -> anyhow::Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let file = File::create(path).with_context(|| format!("failed to create {path:?}"))?;
        write_csv(BufWriter::new(file), &self.lines, tz)
            .with_context(|| format!("failed to write {path:?}"))
    }
}
