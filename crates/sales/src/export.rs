//! CSV export of a sales report.
//!
//! Rows are rendered through [`CsvRow`]'s `Display` impl, one line per sale, after a
//! fixed header that is always written (an empty report is a header-only file).
//! Dates and times are shown in the viewer's time zone; amounts use two decimals.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};

use chrono::{NaiveDate, TimeZone};

use crate::report::ReportLine;

pub const CSV_HEADER: &str = "Book Title,Author,ISBN,Sale Price,Sale Date,Sale Time,Quantity,Total";

const DATE_FORMAT: &str = "%d-%m-%Y";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Quote `field` if it contains a comma, quote, CR or LF, doubling inner quotes.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Formats a single report line as a CSV row (without line terminator).
pub struct CsvRow<'a, Tz: TimeZone> {
    line: &'a ReportLine,
    tz: &'a Tz,
}

impl<'a, Tz: TimeZone> CsvRow<'a, Tz> {
    pub fn new(line: &'a ReportLine, tz: &'a Tz) -> Self {
        Self { line, tz }
    }
}

impl<Tz> fmt::Display for CsvRow<'_, Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sale = &self.line.sale;
        let local = sale.sold_at().with_timezone(self.tz);
        write!(
            f,
            "{},{},{},{},{},{},{},{}",
            escape_field(&self.line.title),
            escape_field(&self.line.author),
            escape_field(&self.line.isbn),
            sale.unit_price(),
            local.format(DATE_FORMAT),
            local.format(TIME_FORMAT),
            sale.quantity(),
            sale.line_total(),
        )
    }
}

/// Write the header and one row per line to `out` as UTF-8.
pub fn write_csv<W, Tz>(mut out: W, lines: &[ReportLine], tz: &Tz) -> io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    writeln!(out, "{CSV_HEADER}")?;
    for line in lines {
        writeln!(out, "{}", CsvRow::new(line, tz))?;
    }
    out.flush()
}

pub fn to_csv_string<Tz>(lines: &[ReportLine], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut csv = String::with_capacity(CSV_HEADER.len() + 1 + lines.len() * 96);
    csv.push_str(CSV_HEADER);
    csv.push('\n');
    for line in lines {
        csv.push_str(&CsvRow::new(line, tz).to_string());
        csv.push('\n');
    }
    csv
}

/// Suggested file name for the report of `date`: `SalesReport_dd-MM-yyyy.csv`.
pub fn default_file_name(date: NaiveDate) -> String {
    format!("SalesReport_{}.csv", date.format(DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::summarize;
    use crate::sale::Sale;
    use bookshop_core::{BookId, Money, SaleId};
    use chrono::{FixedOffset, Utc};
    use proptest::prelude::*;

    fn line(title: &str, author: &str, cents: i64, quantity: i64) -> ReportLine {
        ReportLine {
            sale: Sale::restore(
                SaleId::new(),
                BookId::new(),
                format!("{title} by {author} (978-0061120084)"),
                Money::from_cents(cents),
                quantity,
                Utc.with_ymd_and_hms(2025, 8, 11, 22, 15, 9).unwrap(),
                None,
            ),
            title: title.to_string(),
            author: author.to_string(),
            isbn: "978-0061120084".to_string(),
        }
    }

    /// Minimal RFC 4180 reader used to check what the writer produced.
    fn parse_csv(text: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut row = Vec::new();
        let mut field = String::new();
        let mut quoted = false;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match (quoted, c) {
                (true, '"') if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                (true, '"') => quoted = false,
                (true, c) => field.push(c),
                (false, '"') => quoted = true,
                (false, ',') => row.push(std::mem::take(&mut field)),
                (false, '\n') => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                (false, c) => field.push(c),
            }
        }
        if !field.is_empty() || !row.is_empty() {
            row.push(field);
            rows.push(row);
        }
        rows
    }

    #[test]
    fn escaping_rules() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field(""), "");
        assert_eq!(escape_field("Lee, Harper"), "\"Lee, Harper\"");
        assert_eq!(escape_field("The \"Best\""), "\"The \"\"Best\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_field("cr\rhere"), "\"cr\rhere\"");
    }

    #[test]
    fn empty_report_is_header_only() {
        assert_eq!(to_csv_string(&[], &Utc), format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn row_uses_viewer_time_zone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let csv = to_csv_string(&[line("To Kill a Mockingbird", "Harper Lee", 849, 3)], &tz);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("To Kill a Mockingbird,Harper Lee,978-0061120084,8.49,12-08-2025,00:15:09,3,25.47")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn writer_and_string_agree() {
        let lines = vec![line("A, B", "C \"D\"", 100, 1), line("E", "F", 250, 4)];
        let mut buf = Vec::new();
        write_csv(&mut buf, &lines, &Utc).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), to_csv_string(&lines, &Utc));
    }

    #[test]
    fn file_name_uses_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert_eq!(default_file_name(date), "SalesReport_01-08-2025.csv");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: re-reading an export recovers every quantity and the revenue
        /// total, whatever punctuation the titles contain.
        #[test]
        fn export_reparses_to_same_totals(
            items in prop::collection::vec(
                ("[a-zA-Z ,\"\n]{1,20}", 1i64..100_000, 1i64..20),
                0..20,
            )
        ) {
            let lines: Vec<ReportLine> = items
                .iter()
                .map(|(title, cents, q)| line(title, "Anon", *cents, *q))
                .collect();
            let rows = parse_csv(&to_csv_string(&lines, &Utc));

            prop_assert_eq!(rows.len(), lines.len() + 1);
            prop_assert_eq!(rows[0].join(","), CSV_HEADER);

            let mut units = 0i64;
            let mut revenue = Money::ZERO;
            for (row, (title, _, _)) in rows[1..].iter().zip(&items) {
                prop_assert_eq!(row.len(), 8);
                prop_assert_eq!(&row[0], title);
                units += row[6].parse::<i64>().unwrap();
                revenue += row[7].parse::<Money>().unwrap();
            }

            let summary = summarize(&lines);
            prop_assert_eq!(units, summary.units_sold);
            prop_assert_eq!(revenue, summary.revenue);
        }
    }
}
