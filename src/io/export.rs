use anyhow::Result;
use std::io::Write;

use crate::application::{MonthCount, PeriodStats, RecordPage};
use crate::domain::format_timestamp;

/// Write a history page as CSV, newest record first. Returns the rows written.
pub fn export_page_csv<W: Write>(page: &RecordPage, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "id",
        "kind",
        "date_time",
        "amount_cents",
        "currency",
        "key",
        "description",
        "payment_method",
        "recurring",
    ])?;

    for record in &page.records {
        csv_writer.write_record(&[
            record.id.to_string(),
            record.kind.to_string(),
            format_timestamp(record.date_time),
            record.amount_cents.to_string(),
            record.currency.clone(),
            record.group_key.clone(),
            record.description.clone().unwrap_or_default(),
            record.payment_method.clone().unwrap_or_default(),
            record.recurring.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(page.records.len())
}

/// Write a stats breakdown as CSV.
pub fn export_breakdown_csv<W: Write>(stats: &PeriodStats, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([stats.kind.group_field(), "total_cents", "count"])?;
    for group in &stats.breakdown {
        csv_writer.write_record(&[
            group.key.clone(),
            group.total.to_string(),
            group.count.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(stats.breakdown.len())
}

/// Write a month listing as CSV.
pub fn export_months_csv<W: Write>(months: &[MonthCount], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(["offset_month", "month", "count"])?;
    for month in months {
        csv_writer.write_record(&[
            month.offset_month.to_string(),
            month.month_label.clone(),
            month.count.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(months.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{parse_timestamp, Record, RecordKind};

    fn sample_page() -> RecordPage {
        RecordPage {
            kind: RecordKind::Expense,
            records: vec![Record {
                id: 7,
                kind: RecordKind::Expense,
                amount_cents: 1250,
                date_time: parse_timestamp("2024-03-02T08:15:00").unwrap(),
                description: Some("Coffee, large".into()),
                group_key: "food".into(),
                payment_method: None,
                recurring: false,
                currency: "EUR".into(),
                is_trashed: false,
            }],
            has_more: false,
            offset_month: 0,
            month_label: "March 2024".into(),
        }
    }

    #[test]
    fn test_export_page_csv() {
        let mut out = Vec::new();
        let rows = export_page_csv(&sample_page(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(rows, 1);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "id,kind,date_time,amount_cents,currency,key,description,payment_method,recurring"
        );
        assert_eq!(
            lines[1],
            "7,expense,2024-03-02T08:15:00.000,1250,EUR,food,\"Coffee, large\",,false"
        );
    }

    #[test]
    fn test_export_months_csv() {
        let months = vec![MonthCount {
            offset_month: 2,
            month_label: "April 2024".into(),
            count: 3,
        }];
        let mut out = Vec::new();
        export_months_csv(&months, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "offset_month,month,count\n2,April 2024,3\n");
    }
}
