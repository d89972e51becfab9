use serde::{Deserialize, Serialize};

use crate::domain::{Cents, DateRange, Period, Record, RecordKind};
use crate::storage::GroupTotal;

/// Summary statistics for one record kind over a period, or over all time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub kind: RecordKind,
    /// None for "all time"
    pub period: Option<Period>,
    /// The range actually filtered on. None only for "all time" with no data.
    pub range: Option<DateRange>,
    pub total: Cents,
    pub count: i64,
    pub avg_per_day: Cents,
    pub max: Cents,
    pub min: Cents,
    /// Grouped by category (expenses) or source (incomes), largest total first
    pub breakdown: Vec<GroupTotal>,
    pub top_key: Option<String>,
}

/// Expense and income stats for the same period side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub expenses: PeriodStats,
    pub incomes: PeriodStats,
    pub net: Cents,
}

/// One calendar month of records, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub kind: RecordKind,
    pub records: Vec<Record>,
    /// True when live records exist before this month
    pub has_more: bool,
    pub offset_month: u32,
    pub month_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub offset_month: u32,
    pub month_label: String,
    pub count: i64,
}

/// An entry of the period picker: a two-line label and the period it selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodOption {
    pub period: Period,
    pub title: String,
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailablePeriods {
    pub months: Vec<PeriodOption>,
    pub years: Vec<PeriodOption>,
}
