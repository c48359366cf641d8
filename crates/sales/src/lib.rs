//! Sales domain module.
//!
//! Sale recording rules, date-scoped reporting and CSV export, implemented purely as
//! deterministic domain logic (no IO beyond writing to a caller-supplied sink).

pub mod export;
pub mod report;
pub mod sale;

pub use export::{CSV_HEADER, CsvRow, default_file_name, escape_field, to_csv_string, write_csv};
pub use report::{DayWindow, ReportLine, SalesSummary, render_summary, summarize};
pub use sale::{Sale, SaleRequest, sell};
