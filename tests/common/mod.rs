// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDateTime;
use spendwise::application::FinanceService;
use spendwise::domain::{parse_timestamp, Clock, NewRecord, Record};
use tempfile::TempDir;

/// The pinned "now" for every test service: Saturday, June 15 2024, 14:30.
pub const NOW: &str = "2024-06-15T14:30:00";

/// Helper to create a test service with a temporary database and a fixed clock
pub async fn test_service() -> Result<(FinanceService, TempDir)> {
    test_service_at(NOW).await
}

pub async fn test_service_at(now: &str) -> Result<(FinanceService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = FinanceService::init(db_path.to_str().unwrap())
        .await?
        .with_clock(Clock::Fixed(at(now)));
    Ok((service, temp_dir))
}

/// Helper to parse a local timestamp like "2024-06-15T14:30:00" or with millis
pub fn at(s: &str) -> NaiveDateTime {
    parse_timestamp(s).unwrap()
}

/// Record an expense of `cents` in `category` at `when`
pub async fn expense(
    service: &FinanceService,
    cents: i64,
    category: &str,
    when: &str,
) -> Result<Record> {
    Ok(service
        .add_record(NewRecord::expense(cents, at(when), category))
        .await?)
}

/// Record an income of `cents` from `source` at `when`
pub async fn income(
    service: &FinanceService,
    cents: i64,
    source: &str,
    when: &str,
) -> Result<Record> {
    Ok(service
        .add_record(NewRecord::income(cents, at(when), source))
        .await?)
}

pub fn ids(records: &[Record]) -> Vec<i64> {
    records.iter().map(|r| r.id).collect()
}
