use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::domain::{
    div_round, months_between, years_between, Clock, DateRange, NewRecord, Period, PeriodKind,
    Record, RecordId, RecordKind,
};
use crate::storage::Repository;

use super::{
    AppConfig, AppError, AvailablePeriods, MonthCount, Overview, PeriodOption, PeriodStats,
    RecordPage, DEFAULT_CURRENCY,
};

/// Default upper bound on buckets visited by one discovery walk. Hitting it
/// means the clock or the data is off, and is reported instead of looping on.
pub const MAX_DISCOVERY_STEPS: usize = 6000;

/// Application service providing statistics, history pages, period discovery
/// and record bookkeeping. This is the primary interface for any client.
pub struct FinanceService {
    repo: Repository,
    clock: Clock,
    default_currency: String,
    discovery_limit: usize,
}

/// Calendar granularity a discovery walk steps through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Month,
    Year,
}

impl Bucket {
    fn period(self, offset: u32) -> Period {
        match self {
            Bucket::Month => Period::month(offset),
            Bucket::Year => Period::year(offset),
        }
    }

    /// Offset of the bucket holding `then`.
    fn offset_of(self, now: NaiveDateTime, then: NaiveDateTime) -> i64 {
        match self {
            Bucket::Month => months_between(now, then),
            Bucket::Year => years_between(now, then),
        }
    }
}

/// A bucket that holds at least one live record.
struct FilledBucket {
    period: Period,
    range: DateRange,
    count: i64,
}

impl FinanceService {
    /// Create a new service with the given repository, using the system clock.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            clock: Clock::System,
            default_currency: DEFAULT_CURRENCY.to_string(),
            discovery_limit: MAX_DISCOVERY_STEPS,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Cap on buckets a single discovery walk may visit.
    pub fn with_discovery_limit(mut self, steps: usize) -> Self {
        self.discovery_limit = steps;
        self
    }

    /// Initialize a database at the given path, creating it if needed.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let config = AppConfig {
            database: database_path.to_string(),
            ..AppConfig::default()
        };
        let repo = Repository::init(&config.create_url()).await?;
        Ok(Self::new(repo))
    }

    /// Open the configured database, creating and migrating it when `create` is set.
    pub async fn from_config(config: &AppConfig, create: bool) -> Result<Self, AppError> {
        let repo = if create {
            Repository::init(&config.create_url()).await?
        } else {
            Repository::connect(&config.connect_url()).await?
        };
        Ok(Self::new(repo)
            .with_clock(config.clock())
            .with_default_currency(config.default_currency.clone()))
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn parse_record_id(raw: &str) -> Result<RecordId, AppError> {
        raw.trim()
            .parse::<RecordId>()
            .map_err(|_| AppError::InvalidRecordId(raw.to_string()))
    }

    pub fn parse_record_kind(raw: &str) -> Result<RecordKind, AppError> {
        RecordKind::from_str(raw).ok_or_else(|| AppError::UnsupportedRecordKind(raw.to_string()))
    }

    pub fn parse_period(kind: &str, offset: u32) -> Result<Period, AppError> {
        let kind =
            PeriodKind::from_str(kind).ok_or_else(|| AppError::UnsupportedPeriod(kind.to_string()))?;
        Ok(Period::new(kind, offset))
    }

    // ========================
    // Record operations
    // ========================

    /// Record a new expense or income.
    pub async fn add_record(&self, record: NewRecord) -> Result<Record, AppError> {
        Self::validate(&record)?;
        let currency = self.currency_for(&record);
        let id = self.repo.insert_record(&record, currency).await?;
        info!(kind = %record.kind, id, amount = record.amount_cents, "record added");
        self.get_record(record.kind, id).await
    }

    /// Get a record by id. Trashed records are returned too, flagged as such.
    pub async fn get_record(&self, kind: RecordKind, id: RecordId) -> Result<Record, AppError> {
        self.repo
            .get_record(kind, id)
            .await?
            .ok_or(AppError::RecordNotFound { kind, id })
    }

    /// Overwrite a live record's fields. The id and trashed flag are kept, and
    /// so is the stored currency when the update doesn't name one.
    pub async fn update_record(
        &self,
        kind: RecordKind,
        id: RecordId,
        record: NewRecord,
    ) -> Result<Record, AppError> {
        if record.kind != kind {
            return Err(AppError::RecordKindMismatch {
                expected: kind,
                actual: record.kind,
            });
        }
        Self::validate(&record)?;

        let updated = self
            .repo
            .update_record(id, &record, record.currency.as_deref())
            .await?;
        if updated == 0 {
            return Err(AppError::RecordNotFound { kind, id });
        }
        info!(kind = %kind, id, "record updated");
        self.get_record(kind, id).await
    }

    /// Soft-delete a live record.
    pub async fn delete_record(&self, kind: RecordKind, id: RecordId) -> Result<(), AppError> {
        if self.repo.soft_delete_record(kind, id).await? == 0 {
            return Err(AppError::RecordNotFound { kind, id });
        }
        info!(kind = %kind, id, "record trashed");
        Ok(())
    }

    /// Soft-delete every live record filed under a category or source.
    /// Returns how many records were trashed.
    pub async fn delete_group(&self, kind: RecordKind, key: &str) -> Result<u64, AppError> {
        let trashed = self.repo.soft_delete_by_group(kind, key).await?;
        info!(kind = %kind, key, trashed, "group trashed");
        Ok(trashed)
    }

    fn validate(record: &NewRecord) -> Result<(), AppError> {
        if record.amount_cents <= 0 {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }
        if record.group_key.trim().is_empty() {
            return Err(AppError::MissingKey {
                kind: record.kind,
                field: record.kind.group_field(),
            });
        }
        Ok(())
    }

    fn currency_for<'a>(&'a self, record: &'a NewRecord) -> &'a str {
        record.currency.as_deref().unwrap_or(&self.default_currency)
    }

    // ========================
    // Statistics
    // ========================

    /// Summary statistics for a period, or for all time when `period` is None.
    pub async fn get_stats(
        &self,
        kind: RecordKind,
        period: Option<Period>,
    ) -> Result<PeriodStats, AppError> {
        self.stats_at(kind, period, self.now()).await
    }

    /// Expense and income statistics for the same period, queried concurrently.
    pub async fn get_overview(&self, period: Option<Period>) -> Result<Overview, AppError> {
        let now = self.now();
        let (expenses, incomes) = tokio::try_join!(
            self.stats_at(RecordKind::Expense, period, now),
            self.stats_at(RecordKind::Income, period, now),
        )?;
        let net = incomes.total - expenses.total;
        Ok(Overview {
            expenses,
            incomes,
            net,
        })
    }

    async fn stats_at(
        &self,
        kind: RecordKind,
        period: Option<Period>,
        now: NaiveDateTime,
    ) -> Result<PeriodStats, AppError> {
        // All time spans the oldest to the newest live record
        let range = match period {
            Some(period) => Some(period.resolve(now)?),
            None => self.repo.date_span(kind).await?,
        };

        let aggregate = self.repo.aggregate(kind, range.as_ref()).await?;
        let breakdown = self.repo.breakdown(kind, range.as_ref()).await?;

        let days = range.map(|r| r.inclusive_days()).unwrap_or(0);
        let avg_per_day = if days > 0 {
            div_round(aggregate.total, days)
        } else {
            0
        };
        let top_key = breakdown.first().map(|group| group.key.clone());

        debug!(
            kind = %kind,
            period = ?period,
            count = aggregate.count,
            total = aggregate.total,
            days,
            "stats computed"
        );

        Ok(PeriodStats {
            kind,
            period,
            range,
            total: aggregate.total,
            count: aggregate.count,
            avg_per_day,
            max: aggregate.max,
            min: aggregate.min,
            breakdown,
            top_key,
        })
    }

    // ========================
    // History
    // ========================

    /// One calendar month of records, `offset_month` months before this one.
    /// Empty months still produce a page; callers skip them if they want.
    pub async fn get_page(
        &self,
        kind: RecordKind,
        offset_month: u32,
    ) -> Result<RecordPage, AppError> {
        let range = Period::month(offset_month).resolve(self.now())?;
        let records = self.repo.list_in_range(kind, &range).await?;
        let has_more = self.repo.exists_before(kind, range.start).await?;

        debug!(kind = %kind, offset_month, records = records.len(), has_more, "page loaded");

        Ok(RecordPage {
            kind,
            records,
            has_more,
            offset_month,
            month_label: range.month_label(),
        })
    }

    // ========================
    // Period discovery
    // ========================

    /// Months that hold records of `kind`, newest first, with their record counts.
    pub async fn list_months_with_counts(
        &self,
        kind: RecordKind,
    ) -> Result<Vec<MonthCount>, AppError> {
        let buckets = self.walk_buckets(&[kind], Bucket::Month, self.now()).await?;
        Ok(buckets
            .into_iter()
            .map(|bucket| MonthCount {
                offset_month: bucket.period.offset,
                month_label: bucket.range.month_label(),
                count: bucket.count,
            })
            .collect())
    }

    /// Months and years holding an expense or an income, newest first.
    pub async fn list_available_periods(&self) -> Result<AvailablePeriods, AppError> {
        let now = self.now();
        let months = self
            .walk_buckets(&RecordKind::ALL, Bucket::Month, now)
            .await?;
        let years = self
            .walk_buckets(&RecordKind::ALL, Bucket::Year, now)
            .await?;

        Ok(AvailablePeriods {
            months: months.iter().map(month_option).collect(),
            years: years.iter().map(year_option).collect(),
        })
    }

    /// Walk backwards from the current bucket, jumping straight to the bucket
    /// of the next older record each time, until nothing older is left.
    async fn walk_buckets(
        &self,
        kinds: &[RecordKind],
        bucket: Bucket,
        now: NaiveDateTime,
    ) -> Result<Vec<FilledBucket>, AppError> {
        let mut filled = Vec::new();
        let mut offset: u32 = 0;

        for _ in 0..self.discovery_limit {
            let period = bucket.period(offset);
            let range = period.resolve(now)?;

            let mut count = 0;
            let mut older: Option<NaiveDateTime> = None;
            for &kind in kinds {
                count += self.repo.count_in_range(kind, &range).await?;
                if let Some(instant) = self.repo.newest_before(kind, range.start).await? {
                    older = Some(older.map_or(instant, |current| current.max(instant)));
                }
            }

            if count > 0 {
                filled.push(FilledBucket {
                    period,
                    range,
                    count,
                });
            }

            let Some(older) = older else {
                debug!(bucket = ?bucket, found = filled.len(), "discovery finished");
                return Ok(filled);
            };

            let next = u32::try_from(bucket.offset_of(now, older)).unwrap_or(u32::MAX);
            offset = next.max(offset.saturating_add(1));
        }

        warn!(bucket = ?bucket, steps = self.discovery_limit, "discovery step limit reached");
        Err(AppError::DiscoveryLimitExceeded {
            steps: self.discovery_limit,
        })
    }
}

fn month_option(bucket: &FilledBucket) -> PeriodOption {
    if bucket.period.offset == 0 {
        return PeriodOption {
            period: bucket.period,
            title: "This".into(),
            subtitle: Some("Month".into()),
        };
    }
    PeriodOption {
        period: bucket.period,
        title: bucket.range.start.format("%b").to_string(),
        subtitle: Some(bucket.range.start.format("%Y").to_string()),
    }
}

fn year_option(bucket: &FilledBucket) -> PeriodOption {
    if bucket.period.offset == 0 {
        return PeriodOption {
            period: bucket.period,
            title: "This".into(),
            subtitle: Some("Year".into()),
        };
    }
    PeriodOption {
        period: bucket.period,
        title: bucket.range.start.year().to_string(),
        subtitle: None,
    }
}
