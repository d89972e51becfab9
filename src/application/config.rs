use chrono::NaiveDateTime;

use crate::domain::Clock;

pub const DEFAULT_DATABASE: &str = "spendwise.db";
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Runtime settings for a service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: String,
    /// Applied to new records that don't name a currency
    pub default_currency: String,
    pub verbose: bool,
    /// Pin "now" instead of reading the system clock
    pub now: Option<NaiveDateTime>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.into(),
            default_currency: DEFAULT_CURRENCY.into(),
            verbose: false,
            now: None,
        }
    }
}

impl AppConfig {
    pub fn clock(&self) -> Clock {
        match self.now {
            Some(instant) => Clock::Fixed(instant),
            None => Clock::System,
        }
    }

    /// URL that creates the database file when missing.
    pub fn create_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database)
    }

    pub fn connect_url(&self) -> String {
        format!("sqlite:{}", self.database)
    }
}
