use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};

use crate::application::{
    AppConfig, AvailablePeriods, FinanceService, MonthCount, PeriodOption, PeriodStats,
    RecordPage, DEFAULT_CURRENCY, DEFAULT_DATABASE,
};
use crate::domain::{
    format_cents, parse_cents, parse_timestamp, NewRecord, Period, Record, RecordKind,
};
use crate::io::export::{export_breakdown_csv, export_months_csv, export_page_csv};

/// Spendwise - expense and income tracking
#[derive(Parser)]
#[command(name = "spendwise")]
#[command(about = "Track expenses and incomes, browse them month by month, and see period statistics")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SPENDWISE_DB", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Currency for records that don't name one
    #[arg(long = "currency", env = "SPENDWISE_CURRENCY", default_value = DEFAULT_CURRENCY)]
    pub default_currency: String,

    /// Pin the current time (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    #[arg(long, global = true)]
    pub now: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Record an expense or an income
    Add {
        /// Record kind: expense, income
        kind: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Category (expenses) or source (incomes)
        key: String,

        #[command(flatten)]
        details: RecordDetails,
    },

    /// Overwrite an existing record. Omitted details keep their stored values
    Edit {
        /// Record kind: expense, income
        kind: String,

        /// Record ID
        id: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Category (expenses) or source (incomes)
        key: String,

        #[command(flatten)]
        details: RecordDetails,
    },

    /// Move a record to the trash
    Delete {
        /// Record kind: expense, income
        kind: String,

        /// Record ID
        id: String,
    },

    /// Move every record of a category or source to the trash
    TrashGroup {
        /// Record kind: expense, income
        kind: String,

        /// Category (expenses) or source (incomes)
        key: String,
    },

    /// Show a single record, trashed or not
    Show {
        /// Record kind: expense, income
        kind: String,

        /// Record ID
        id: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Statistics for a period (all time when --period is omitted)
    Stats {
        /// Record kind: expense, income
        kind: String,

        #[command(flatten)]
        period: PeriodArgs,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Expenses, incomes and net for a period
    Overview {
        #[command(flatten)]
        period: PeriodArgs,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// One month of records, newest first
    History {
        /// Record kind: expense, income
        kind: String,

        /// Months before the current one (0 = this month)
        #[arg(short, long, default_value = "0")]
        offset: u32,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Months that hold records, with counts
    Months {
        /// Record kind: expense, income
        kind: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Months and years that can be selected for statistics
    Periods {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(clap::Args)]
pub struct RecordDetails {
    /// Date of the record (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS, defaults to now)
    #[arg(long)]
    pub date: Option<String>,

    /// Description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Payment method (expenses only)
    #[arg(long)]
    pub payment_method: Option<String>,

    /// Mark as recurring (incomes only)
    #[arg(long)]
    pub recurring: bool,

    /// Currency code (defaults to the configured currency)
    #[arg(short, long)]
    pub currency: Option<String>,
}

#[derive(clap::Args)]
pub struct PeriodArgs {
    /// Period: today, week, month, year
    #[arg(short, long)]
    pub period: Option<String>,

    /// Periods before the current one (ignored for today)
    #[arg(short, long, default_value = "0")]
    pub offset: u32,
}

impl RecordDetails {
    /// Fill omitted details from a stored record. Currency stays unset so the
    /// store keeps its own.
    fn or_existing(self, existing: &Record) -> Self {
        Self {
            date: self.date,
            description: self.description.or_else(|| existing.description.clone()),
            payment_method: self
                .payment_method
                .or_else(|| existing.payment_method.clone()),
            recurring: self.recurring || existing.recurring,
            currency: self.currency,
        }
    }
}

impl PeriodArgs {
    fn resolve(&self) -> Result<Option<Period>> {
        self.period
            .as_deref()
            .map(|kind| FinanceService::parse_period(kind, self.offset))
            .transpose()
            .map_err(Into::into)
    }
}

impl Cli {
    fn config(&self) -> Result<AppConfig> {
        let now = self
            .now
            .as_deref()
            .map(parse_datetime)
            .transpose()
            .context("Invalid --now")?;
        Ok(AppConfig {
            database: self.database.clone(),
            default_currency: self.default_currency.clone(),
            verbose: self.verbose,
            now,
        })
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config()?;
        crate::init_tracing(config.verbose);

        if let Commands::Init = self.command {
            FinanceService::from_config(&config, true).await?;
            println!("Database initialized: {}", config.database);
            return Ok(());
        }

        let service = FinanceService::from_config(&config, false)
            .await
            .with_context(|| {
                format!(
                    "Cannot open {} (run `spendwise init` first)",
                    config.database
                )
            })?;

        match self.command {
            Commands::Init => {}

            Commands::Add {
                kind,
                amount,
                key,
                details,
            } => {
                let kind = FinanceService::parse_record_kind(&kind)?;
                let record = build_record(kind, &amount, key, details, service.now())?;
                let saved = service.add_record(record).await?;
                println!(
                    "Recorded {} #{}: {} {} ({})",
                    saved.kind,
                    saved.id,
                    format_cents(saved.amount_cents),
                    saved.currency,
                    saved.group_key
                );
            }

            Commands::Edit {
                kind,
                id,
                amount,
                key,
                details,
            } => {
                let kind = FinanceService::parse_record_kind(&kind)?;
                let id = FinanceService::parse_record_id(&id)?;
                let existing = service.get_record(kind, id).await?;
                let details = details.or_existing(&existing);
                let record = build_record(kind, &amount, key, details, existing.date_time)?;
                let saved = service.update_record(kind, id, record).await?;
                println!("Updated {} #{}", saved.kind, saved.id);
            }

            Commands::Delete { kind, id } => {
                let kind = FinanceService::parse_record_kind(&kind)?;
                let id = FinanceService::parse_record_id(&id)?;
                service.delete_record(kind, id).await?;
                println!("Trashed {} #{}", kind, id);
            }

            Commands::TrashGroup { kind, key } => {
                let kind = FinanceService::parse_record_kind(&kind)?;
                let trashed = service.delete_group(kind, &key).await?;
                println!("Trashed {} {} record(s) under '{}'", trashed, kind, key);
            }

            Commands::Show { kind, id, format } => {
                let kind = FinanceService::parse_record_kind(&kind)?;
                let id = FinanceService::parse_record_id(&id)?;
                let record = service.get_record(kind, id).await?;
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&record)?),
                    _ => print_record_detail(&record),
                }
            }

            Commands::Stats {
                kind,
                period,
                format,
            } => {
                let kind = FinanceService::parse_record_kind(&kind)?;
                let stats = service.get_stats(kind, period.resolve()?).await?;
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&stats)?),
                    "csv" => {
                        export_breakdown_csv(&stats, std::io::stdout())?;
                    }
                    _ => print_stats(&stats),
                }
            }

            Commands::Overview { period, format } => {
                let overview = service.get_overview(period.resolve()?).await?;
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&overview)?),
                    _ => {
                        print_stats(&overview.expenses);
                        println!();
                        print_stats(&overview.incomes);
                        println!();
                        println!("{}", "=".repeat(44));
                        println!("{:<25} {:>18}", "Net", format_cents(overview.net));
                    }
                }
            }

            Commands::History {
                kind,
                offset,
                format,
            } => {
                let kind = FinanceService::parse_record_kind(&kind)?;
                let page = service.get_page(kind, offset).await?;
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&page)?),
                    "csv" => {
                        export_page_csv(&page, std::io::stdout())?;
                    }
                    _ => print_page(&page),
                }
            }

            Commands::Months { kind, format } => {
                let kind = FinanceService::parse_record_kind(&kind)?;
                let months = service.list_months_with_counts(kind).await?;
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&months)?),
                    "csv" => {
                        export_months_csv(&months, std::io::stdout())?;
                    }
                    _ => print_months(&months),
                }
            }

            Commands::Periods { format } => {
                let periods = service.list_available_periods().await?;
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&periods)?),
                    _ => print_periods(&periods),
                }
            }
        }

        Ok(())
    }
}

/// `default_date` applies when `--date` is omitted.
fn build_record(
    kind: RecordKind,
    amount: &str,
    key: String,
    details: RecordDetails,
    default_date: NaiveDateTime,
) -> Result<NewRecord> {
    let amount_cents = parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")?;
    let date_time = match details.date {
        Some(date_str) => parse_datetime(&date_str).with_context(|| {
            format!(
                "Invalid date format '{}'. Use YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS",
                date_str
            )
        })?,
        None => default_date,
    };

    let mut record = NewRecord::new(kind, amount_cents, date_time, key)
        .with_recurring(details.recurring);
    if let Some(desc) = details.description {
        record = record.with_description(desc);
    }
    if let Some(method) = details.payment_method {
        record = record.with_payment_method(method);
    }
    if let Some(currency) = details.currency {
        record = record.with_currency(currency.to_uppercase());
    }
    Ok(record)
}

/// Accepts a bare date (midnight) or a full local timestamp.
fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow::anyhow!("Invalid date"));
    }
    parse_timestamp(&s.replacen(' ', "T", 1))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .context("Expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn print_record_detail(record: &Record) {
    println!("{} #{}", capitalize(record.kind.as_str()), record.id);
    println!("  Amount:      {} {}", format_cents(record.amount_cents), record.currency);
    println!("  Date:        {}", record.date_time.format("%Y-%m-%d %H:%M:%S"));
    println!("  {:<13}{}", format!("{}:", capitalize(record.kind.group_field())), record.group_key);
    if let Some(desc) = &record.description {
        println!("  Description: {}", desc);
    }
    if let Some(method) = &record.payment_method {
        println!("  Payment:     {}", method);
    }
    if record.recurring {
        println!("  Recurring:   yes");
    }
    if record.is_trashed {
        println!("  Status:      deleted");
    }
}

fn print_stats(stats: &PeriodStats) {
    let title = match stats.period {
        Some(period) => format!("{} statistics ({})", capitalize(stats.kind.as_str()), period),
        None => format!("{} statistics (all time)", capitalize(stats.kind.as_str())),
    };
    println!("{}", title);
    if let Some(range) = stats.range {
        println!(
            "Period: {} to {}",
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d")
        );
    }
    println!();
    println!("Total:        {:>15}", format_cents(stats.total));
    println!("Count:        {:>15}", stats.count);
    println!("Avg per day:  {:>15}", format_cents(stats.avg_per_day));
    println!("Max:          {:>15}", format_cents(stats.max));
    println!("Min:          {:>15}", format_cents(stats.min));

    if !stats.breakdown.is_empty() {
        println!();
        println!(
            "{:<20} {:>12} {:>8}",
            stats.kind.group_field().to_uppercase(),
            "TOTAL",
            "COUNT"
        );
        println!("{}", "-".repeat(42));
        for group in &stats.breakdown {
            println!(
                "{:<20} {:>12} {:>8}",
                truncate(&group.key, 20),
                format_cents(group.total),
                group.count
            );
        }
    }
    if let Some(top) = &stats.top_key {
        println!();
        println!("Top {}: {}", stats.kind.group_field(), top);
    }
}

fn print_page(page: &RecordPage) {
    println!("{} ({} records)", page.month_label, page.records.len());
    if page.records.is_empty() {
        println!("No {} records this month.", page.kind);
    } else {
        println!(
            "{:>6} {:<17} {:>12} {:<5} {:<15} DESCRIPTION",
            "ID", "DATE", "AMOUNT", "CCY", "KEY"
        );
        println!("{}", "-".repeat(75));
        for record in &page.records {
            println!(
                "{:>6} {:<17} {:>12} {:<5} {:<15} {}",
                record.id,
                record.date_time.format("%Y-%m-%d %H:%M"),
                format_cents(record.amount_cents),
                record.currency,
                truncate(&record.group_key, 15),
                truncate(record.description.as_deref().unwrap_or(""), 30)
            );
        }
    }
    if page.has_more {
        println!();
        println!("Older records: --offset {}", page.offset_month + 1);
    }
}

fn print_months(months: &[MonthCount]) {
    if months.is_empty() {
        println!("No records found.");
        return;
    }
    println!("{:>6} {:<20} {:>8}", "OFFSET", "MONTH", "COUNT");
    println!("{}", "-".repeat(36));
    for month in months {
        println!(
            "{:>6} {:<20} {:>8}",
            month.offset_month, month.month_label, month.count
        );
    }
}

fn print_periods(periods: &AvailablePeriods) {
    fn line(option: &PeriodOption) -> String {
        match &option.subtitle {
            Some(sub) => format!("{:>6}  {} {}", option.period.offset, option.title, sub),
            None => format!("{:>6}  {}", option.period.offset, option.title),
        }
    }

    if periods.months.is_empty() && periods.years.is_empty() {
        println!("No records found.");
        return;
    }
    println!("Months:");
    for option in &periods.months {
        println!("{}", line(option));
    }
    println!();
    println!("Years:");
    for option in &periods.years {
        println!("{}", line(option));
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_forms() {
        assert_eq!(
            parse_datetime("2024-03-05").unwrap(),
            parse_timestamp("2024-03-05T00:00:00").unwrap()
        );
        assert_eq!(
            parse_datetime("2024-03-05 18:30:15").unwrap(),
            parse_timestamp("2024-03-05T18:30:15").unwrap()
        );
        assert_eq!(
            parse_datetime("2024-03-05T18:30").unwrap(),
            parse_timestamp("2024-03-05T18:30:00").unwrap()
        );
        assert!(parse_datetime("05/03/2024").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("groceries", 15), "groceries");
        assert_eq!(truncate("a very long description", 10), "a very ...");
    }

    #[test]
    fn test_cli_parses_stats_command() {
        let cli = Cli::try_parse_from([
            "spendwise", "--now", "2024-06-15", "stats", "expense", "--period", "month",
            "--offset", "2",
        ])
        .unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.now, Some(parse_timestamp("2024-06-15T00:00:00").unwrap()));
        match cli.command {
            Commands::Stats { kind, period, .. } => {
                assert_eq!(kind, "expense");
                assert_eq!(period.resolve().unwrap(), Some(Period::month(2)));
            }
            _ => panic!("expected stats command"),
        }
    }

    #[test]
    fn test_global_currency_flag() {
        let cli = Cli::try_parse_from([
            "spendwise", "--currency", "USD", "--verbose", "add", "expense", "12.50", "food",
            "--currency", "gbp",
        ])
        .unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.default_currency, "USD");
        assert!(config.verbose);
        match cli.command {
            Commands::Add { details, .. } => {
                assert_eq!(details.currency.as_deref(), Some("gbp"));
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn test_edit_keeps_omitted_details() {
        let existing = Record {
            id: 7,
            kind: RecordKind::Expense,
            amount_cents: 1000,
            date_time: parse_timestamp("2024-03-05T18:30:00").unwrap(),
            description: Some("Lunch".into()),
            group_key: "food".into(),
            payment_method: Some("card".into()),
            recurring: false,
            currency: "USD".into(),
            is_trashed: false,
        };
        let details = RecordDetails {
            date: None,
            description: None,
            payment_method: Some("cash".into()),
            recurring: false,
            currency: None,
        }
        .or_existing(&existing);

        let record =
            build_record(RecordKind::Expense, "12", "food".into(), details, existing.date_time)
                .unwrap();
        assert_eq!(record.date_time, existing.date_time);
        assert_eq!(record.description.as_deref(), Some("Lunch"));
        assert_eq!(record.payment_method.as_deref(), Some("cash"));
        assert_eq!(record.currency, None);
        assert_eq!(record.amount_cents, 1200);
    }
}
