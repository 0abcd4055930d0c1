//! Query builder for stored readings.
//!
//! # Example
//!
//! ```
//! use gasmon_store::{ReadingQuery, Store};
//! use time::{Duration, OffsetDateTime};
//!
//! let store = Store::open_in_memory()?;
//! let an_hour_ago = OffsetDateTime::now_utc() - Duration::hours(1);
//!
//! // Last hour's alerts, newest first
//! let query = ReadingQuery::new()
//!     .since(an_hour_ago)
//!     .alerts_only()
//!     .limit(20);
//!
//! let readings = store.query_readings(&query)?;
//! assert!(readings.is_empty());
//! # Ok::<(), gasmon_store::Error>(())
//! ```

use time::OffsetDateTime;

use crate::store::to_micros;

/// Fluent query builder for [`Store::query_readings`](crate::Store::query_readings).
///
/// By default, queries return results ordered by `created_at` descending
/// (newest first), ties broken by insertion order.
#[derive(Debug, Default, Clone)]
pub struct ReadingQuery {
    /// Filter readings created at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Filter readings created at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Only readings with the alert flag set.
    pub alerts_only: bool,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by created_at descending (newest first).
    pub newest_first: bool,
}

impl ReadingQuery {
    /// Create a new query with default settings.
    ///
    /// Default behavior:
    /// - No time range filter
    /// - No limit (all matching records)
    /// - Ordered by newest first
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Filter to readings created at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to readings created at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Only include readings that raised an alert.
    pub fn alerts_only(mut self) -> Self {
        self.alerts_only = true;
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first (ascending by `created_at`).
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(since) = self.since {
            conditions.push("created_at >= ?");
            params.push(Box::new(to_micros(since)));
        }

        if let Some(until) = self.until {
            conditions.push("created_at <= ?");
            params.push(Box::new(to_micros(until)));
        }

        if self.alerts_only {
            conditions.push("alert_flag = 1");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT {} FROM readings {} ORDER BY created_at {order}, seq {order}",
            crate::store::READING_COLUMNS,
            where_clause,
        );

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        sql
    }
}
