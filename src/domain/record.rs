use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Cents;

pub type RecordId = i64;

/// Which of the two record collections a record lives in.
/// Expenses are grouped by category, incomes by source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Expense,
    Income,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Expense, RecordKind::Income];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Expense => "expense",
            RecordKind::Income => "income",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "expense" | "expenses" => Some(RecordKind::Expense),
            "income" | "incomes" => Some(RecordKind::Income),
            _ => None,
        }
    }

    /// Backing table.
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Expense => "expenses",
            RecordKind::Income => "incomes",
        }
    }

    /// Column the breakdown groups by.
    pub fn group_field(&self) -> &'static str {
        match self {
            RecordKind::Expense => "category",
            RecordKind::Income => "source",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted expense or income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub kind: RecordKind,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    /// When the transaction happened, in local wall-clock time
    pub date_time: NaiveDateTime,
    pub description: Option<String>,
    /// Category key for expenses, source key for incomes
    pub group_key: String,
    /// Expenses only
    pub payment_method: Option<String>,
    /// Incomes only
    pub recurring: bool,
    pub currency: String,
    pub is_trashed: bool,
}

/// Payload for creating a record, also used to overwrite an existing one.
/// It carries neither the id nor the trashed flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub kind: RecordKind,
    pub amount_cents: Cents,
    pub date_time: NaiveDateTime,
    pub group_key: String,
    pub description: Option<String>,
    pub payment_method: Option<String>,
    pub recurring: bool,
    /// None means "use the configured default currency"
    pub currency: Option<String>,
}

impl NewRecord {
    pub fn new(
        kind: RecordKind,
        amount_cents: Cents,
        date_time: NaiveDateTime,
        group_key: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            amount_cents,
            date_time,
            group_key: group_key.into(),
            description: None,
            payment_method: None,
            recurring: false,
            currency: None,
        }
    }

    pub fn expense(amount_cents: Cents, date_time: NaiveDateTime, category: impl Into<String>) -> Self {
        Self::new(RecordKind::Expense, amount_cents, date_time, category)
    }

    pub fn income(amount_cents: Cents, date_time: NaiveDateTime, source: impl Into<String>) -> Self {
        Self::new(RecordKind::Income, amount_cents, date_time, source)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    pub fn with_recurring(mut self, recurring: bool) -> Self {
        self.recurring = recurring;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}
