use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::domain::{
    format_timestamp, parse_timestamp, Cents, DateRange, NewRecord, Record, RecordId, RecordKind,
};

use super::MIGRATION_001_INITIAL;

/// Summary numbers over a filtered record set. All zero when the set is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordAggregate {
    pub total: Cents,
    pub count: i64,
    pub max: Cents,
    pub min: Cents,
}

/// One row of a category/source breakdown.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: Cents,
    pub count: i64,
}

/// Repository for persisting and querying expense and income records.
/// Both kinds share one code path; the kind picks the table and group column.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL over a single connection.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run more than once.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Record writes
    // ========================

    /// Insert a record and return its assigned id.
    pub async fn insert_record(&self, record: &NewRecord, currency: &str) -> Result<RecordId> {
        let created_at = format_timestamp(Local::now().naive_local());
        let date_time = format_timestamp(record.date_time);

        let query = match record.kind {
            RecordKind::Expense => sqlx::query(
                r#"
                INSERT INTO expenses (amount_cents, date_time, description, category, payment_method, currency, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.amount_cents)
            .bind(&date_time)
            .bind(&record.description)
            .bind(&record.group_key)
            .bind(&record.payment_method),
            RecordKind::Income => sqlx::query(
                r#"
                INSERT INTO incomes (amount_cents, date_time, description, source, recurring, currency, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.amount_cents)
            .bind(&date_time)
            .bind(&record.description)
            .bind(&record.group_key)
            .bind(record.recurring),
        };

        let result = query
            .bind(currency)
            .bind(&created_at)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to save {}", record.kind))?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrite every editable field of a live record. A `None` currency
    /// keeps the stored one.
    /// Returns the number of rows touched (0 when missing or trashed).
    pub async fn update_record(
        &self,
        id: RecordId,
        record: &NewRecord,
        currency: Option<&str>,
    ) -> Result<u64> {
        let date_time = format_timestamp(record.date_time);

        let query = match record.kind {
            RecordKind::Expense => sqlx::query(
                r#"
                UPDATE expenses
                SET amount_cents = ?, date_time = ?, description = ?, category = ?, payment_method = ?, currency = COALESCE(?, currency)
                WHERE id = ? AND is_trashed = 0
                "#,
            )
            .bind(record.amount_cents)
            .bind(&date_time)
            .bind(&record.description)
            .bind(&record.group_key)
            .bind(&record.payment_method),
            RecordKind::Income => sqlx::query(
                r#"
                UPDATE incomes
                SET amount_cents = ?, date_time = ?, description = ?, source = ?, recurring = ?, currency = COALESCE(?, currency)
                WHERE id = ? AND is_trashed = 0
                "#,
            )
            .bind(record.amount_cents)
            .bind(&date_time)
            .bind(&record.description)
            .bind(&record.group_key)
            .bind(record.recurring),
        };

        let result = query
            .bind(currency)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update {}", record.kind))?;

        Ok(result.rows_affected())
    }

    /// Mark a live record as trashed.
    pub async fn soft_delete_record(&self, kind: RecordKind, id: RecordId) -> Result<u64> {
        let sql = format!(
            "UPDATE {} SET is_trashed = 1 WHERE id = ? AND is_trashed = 0",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {}", kind))?;
        Ok(result.rows_affected())
    }

    /// Trash every live record in a category (expenses) or source (incomes).
    pub async fn soft_delete_by_group(&self, kind: RecordKind, key: &str) -> Result<u64> {
        let sql = format!(
            "UPDATE {} SET is_trashed = 1 WHERE {} = ? AND is_trashed = 0",
            kind.table(),
            kind.group_field()
        );
        let result = sqlx::query(&sql)
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {} records by {}", kind, kind.group_field()))?;
        Ok(result.rows_affected())
    }

    // ========================
    // Record reads
    // ========================

    /// Get a record by id, trashed or not.
    pub async fn get_record(&self, kind: RecordKind, id: RecordId) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            select_columns(kind),
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {}", kind))?;

        row.map(|row| Self::row_to_record(kind, &row)).transpose()
    }

    /// Live records inside the range, newest first.
    pub async fn list_in_range(&self, kind: RecordKind, range: &DateRange) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE is_trashed = 0 AND date_time >= ? AND date_time <= ? ORDER BY date_time DESC, id DESC",
            select_columns(kind),
            kind.table()
        );
        let rows = sqlx::query(&sql)
            .bind(format_timestamp(range.start))
            .bind(format_timestamp(range.end))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} records", kind))?;

        rows.iter()
            .map(|row| Self::row_to_record(kind, row))
            .collect()
    }

    /// Timestamps of the oldest and newest live records, if any exist.
    pub async fn date_span(&self, kind: RecordKind) -> Result<Option<DateRange>> {
        let oldest = self.edge_timestamp(kind, "ASC").await?;
        let newest = self.edge_timestamp(kind, "DESC").await?;
        Ok(oldest.zip(newest).map(|(start, end)| DateRange::new(start, end)))
    }

    async fn edge_timestamp(
        &self,
        kind: RecordKind,
        direction: &'static str,
    ) -> Result<Option<NaiveDateTime>> {
        let sql = format!(
            "SELECT date_time FROM {} WHERE is_trashed = 0 ORDER BY date_time {} LIMIT 1",
            kind.table(),
            direction
        );
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to find {} date span", kind))?;

        row.map(|row| Self::row_timestamp(&row, "date_time"))
            .transpose()
    }

    /// Total, count, max and min over live records, optionally restricted to a range.
    pub async fn aggregate(
        &self,
        kind: RecordKind,
        range: Option<&DateRange>,
    ) -> Result<RecordAggregate> {
        let sql = format!(
            r#"
            SELECT
                COALESCE(SUM(amount_cents), 0) as total,
                COUNT(*) as count,
                COALESCE(MAX(amount_cents), 0) as max_amount,
                COALESCE(MIN(amount_cents), 0) as min_amount
            FROM {}
            WHERE {}
            "#,
            kind.table(),
            live_filter(range)
        );
        let row = bind_range(sqlx::query(&sql), range)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to aggregate {} records", kind))?;

        Ok(RecordAggregate {
            total: row.get("total"),
            count: row.get("count"),
            max: row.get("max_amount"),
            min: row.get("min_amount"),
        })
    }

    /// Per-group totals, largest total first.
    pub async fn breakdown(
        &self,
        kind: RecordKind,
        range: Option<&DateRange>,
    ) -> Result<Vec<GroupTotal>> {
        let sql = format!(
            r#"
            SELECT {group} as group_key, SUM(amount_cents) as total, COUNT(*) as count
            FROM {table}
            WHERE {filter}
            GROUP BY {group}
            ORDER BY total DESC, group_key ASC
            "#,
            group = kind.group_field(),
            table = kind.table(),
            filter = live_filter(range)
        );
        let rows = bind_range(sqlx::query(&sql), range)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to group {} records", kind))?;

        Ok(rows
            .iter()
            .map(|row| GroupTotal {
                key: row.get("group_key"),
                total: row.get("total"),
                count: row.get("count"),
            })
            .collect())
    }

    /// Number of live records inside the range.
    pub async fn count_in_range(&self, kind: RecordKind, range: &DateRange) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) as count FROM {} WHERE {}",
            kind.table(),
            live_filter(Some(range))
        );
        let row = bind_range(sqlx::query(&sql), Some(range))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {} records", kind))?;
        Ok(row.get("count"))
    }

    /// Whether any live record is strictly older than `before`.
    pub async fn exists_before(&self, kind: RecordKind, before: NaiveDateTime) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE is_trashed = 0 AND date_time < ?) as found",
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(format_timestamp(before))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to probe older {} records", kind))?;
        Ok(row.get::<i32, _>("found") != 0)
    }

    /// Timestamp of the newest live record strictly older than `before`.
    pub async fn newest_before(
        &self,
        kind: RecordKind,
        before: NaiveDateTime,
    ) -> Result<Option<NaiveDateTime>> {
        let sql = format!(
            "SELECT date_time FROM {} WHERE is_trashed = 0 AND date_time < ? ORDER BY date_time DESC LIMIT 1",
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(format_timestamp(before))
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to find older {} records", kind))?;

        row.map(|row| Self::row_timestamp(&row, "date_time"))
            .transpose()
    }

    fn row_timestamp(row: &SqliteRow, column: &str) -> Result<NaiveDateTime> {
        let raw: String = row.get(column);
        parse_timestamp(&raw).with_context(|| format!("Invalid timestamp: {}", raw))
    }

    fn row_to_record(kind: RecordKind, row: &SqliteRow) -> Result<Record> {
        Ok(Record {
            id: row.get("id"),
            kind,
            amount_cents: row.get("amount_cents"),
            date_time: Self::row_timestamp(row, "date_time")?,
            description: row.get("description"),
            group_key: row.get("group_key"),
            payment_method: row.get("payment_method"),
            recurring: row.get::<i32, _>("recurring") != 0,
            currency: row.get("currency"),
            is_trashed: row.get::<i32, _>("is_trashed") != 0,
        })
    }
}

/// Column list mapping either table onto the shape of `Record`.
fn select_columns(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Expense => {
            "id, amount_cents, date_time, description, category AS group_key, payment_method, 0 AS recurring, currency, is_trashed"
        }
        RecordKind::Income => {
            "id, amount_cents, date_time, description, source AS group_key, NULL AS payment_method, recurring, currency, is_trashed"
        }
    }
}

/// WHERE clause for live records, with placeholders for the range when given.
fn live_filter(range: Option<&DateRange>) -> &'static str {
    match range {
        Some(_) => "is_trashed = 0 AND date_time >= ? AND date_time <= ?",
        None => "is_trashed = 0",
    }
}

fn bind_range<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    range: Option<&DateRange>,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match range {
        Some(range) => query
            .bind(format_timestamp(range.start))
            .bind(format_timestamp(range.end)),
        None => query,
    }
}
