//! SQLite store handle.
//!
//! The handle is constructed explicitly at the start of a command and passed
//! by reference into every stage; there is no global connection. Methods
//! that need a transaction (chunk inserts, forecast replacement) take
//! `&mut self`; reads take `&self`.

pub mod loader;
pub mod schema;

pub use loader::*;

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, params};

use crate::domain::{
    EtlJobLog, EtlLogRow, ForecastPoint, KNOWN_CATEGORIES, KNOWN_STATES, SalesFact,
};
use crate::error::EtlError;

/// Database path used when neither the CLI flag nor the environment sets one.
pub const DEFAULT_DB_PATH: &str = "retail.db";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, EtlError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open the store at `$RETAIL_DB_PATH`, falling back to `retail.db`.
    pub fn open_from_env() -> Result<Self, EtlError> {
        dotenvy::dotenv().ok();
        let path =
            std::env::var("RETAIL_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        Self::open(Path::new(&path))
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, EtlError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Create all tables and indexes. Idempotent.
    pub fn init_schema(&self) -> Result<(), EtlError> {
        self.conn.execute_batch(schema::SCHEMA_SQL)?;
        Ok(())
    }

    /// Seed the static code-mapping tables. Idempotent.
    pub fn seed_mappings(&self) -> Result<(), EtlError> {
        for (code, name, full) in KNOWN_STATES {
            self.conn.execute(
                "INSERT OR IGNORE INTO state_mapping (state_code, state_name, state_full_name)
                 VALUES (?1, ?2, ?3)",
                params![code, name, full],
            )?;
        }
        for (code, name, description) in KNOWN_CATEGORIES {
            self.conn.execute(
                "INSERT OR IGNORE INTO category_mapping (category_code, category_name, category_description)
                 VALUES (?1, ?2, ?3)",
                params![code, name, description],
            )?;
        }
        Ok(())
    }

    // --- facts ---

    pub fn fact_count(&self) -> Result<i64, EtlError> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM retail_sales", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Insert one chunk of facts inside a single transaction.
    pub fn insert_facts(&mut self, facts: &[SalesFact]) -> Result<usize, EtlError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO retail_sales
                   (sale_date, category, state, turnover_millions, month_name, year,
                    growth_rate_yoy, data_source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for fact in facts {
                stmt.execute(params![
                    fact.sale_date,
                    fact.category,
                    fact.state,
                    fact.turnover,
                    fact.month_name,
                    fact.year,
                    fact.growth_rate_yoy,
                    fact.data_source,
                ])?;
            }
        }
        tx.commit()?;
        Ok(facts.len())
    }

    /// All facts for one (category, state), ordered by date ascending.
    pub fn facts_for_scope(
        &self,
        category: &str,
        state: &str,
    ) -> Result<Vec<SalesFact>, EtlError> {
        let mut stmt = self.conn.prepare(
            "SELECT sale_date, category, state, turnover_millions, month_name, year,
                    growth_rate_yoy, data_source
             FROM retail_sales
             WHERE category = ?1 AND state = ?2
             ORDER BY sale_date",
        )?;
        let rows = stmt.query_map(params![category, state], |row| {
            Ok(SalesFact {
                sale_date: row.get(0)?,
                category: row.get(1)?,
                state: row.get(2)?,
                turnover: row.get(3)?,
                month_name: row.get(4)?,
                year: row.get(5)?,
                growth_rate_yoy: row.get(6)?,
                data_source: row.get(7)?,
            })
        })?;
        let mut facts = Vec::new();
        for row in rows {
            facts.push(row?);
        }
        Ok(facts)
    }

    /// Every (category, state) pair with at least `min` stored months.
    pub fn scopes_with_min_history(&self, min: usize) -> Result<Vec<(String, String)>, EtlError> {
        let mut stmt = self.conn.prepare(
            "SELECT category, state
             FROM retail_sales
             GROUP BY category, state
             HAVING COUNT(*) >= ?1
             ORDER BY category, state",
        )?;
        let rows = stmt.query_map(params![min as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut scopes = Vec::new();
        for row in rows {
            scopes.push(row?);
        }
        Ok(scopes)
    }

    /// Count of distinct (category, state) pairs with any facts.
    pub fn scope_count(&self) -> Result<i64, EtlError> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT DISTINCT category, state FROM retail_sales)",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Min/max stored sale dates, or `None` for an empty fact table.
    pub fn fact_date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>, EtlError> {
        let range: (Option<NaiveDate>, Option<NaiveDate>) = self.conn.query_row(
            "SELECT MIN(sale_date), MAX(sale_date) FROM retail_sales",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(match range {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        })
    }

    // --- forecasts ---

    pub fn forecast_count(&self) -> Result<i64, EtlError> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM sales_forecasts", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Replace all forecast rows for (category, state, model_name) with the
    /// new horizon, atomically.
    ///
    /// Delete and insert share one transaction so the scope never has zero
    /// visible forecasts mid-run.
    pub fn replace_forecasts(
        &mut self,
        category: &str,
        state: &str,
        model_name: &str,
        points: &[ForecastPoint],
    ) -> Result<(), EtlError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM sales_forecasts WHERE category = ?1 AND state = ?2 AND model_name = ?3",
            params![category, state, model_name],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sales_forecasts
                   (forecast_date, category, state, predicted_turnover, lower_bound,
                    upper_bound, confidence_interval, model_name, model_version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for point in points {
                stmt.execute(params![
                    point.forecast_date,
                    point.category,
                    point.state,
                    point.predicted_turnover,
                    point.lower_bound,
                    point.upper_bound,
                    point.confidence_level,
                    point.model_name,
                    point.model_version,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn forecast_count_for_scope(
        &self,
        category: &str,
        state: &str,
        model_name: &str,
    ) -> Result<i64, EtlError> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM sales_forecasts
             WHERE category = ?1 AND state = ?2 AND model_name = ?3",
            params![category, state, model_name],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    // --- audit trail ---

    pub fn log_job(&self, log: &EtlJobLog) -> Result<(), EtlError> {
        self.conn.execute(
            "INSERT INTO etl_logs
               (job_name, status, records_processed, records_inserted, records_updated,
                error_message, execution_time_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                log.job_name,
                log.status.as_str(),
                log.records_processed as i64,
                log.records_inserted as i64,
                log.records_updated as i64,
                log.error_message,
                log.execution_time_seconds,
            ],
        )?;
        Ok(())
    }

    /// Most recent audit rows, newest first.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<EtlLogRow>, EtlError> {
        let mut stmt = self.conn.prepare(
            "SELECT job_name, status, records_inserted, completed_at
             FROM etl_logs
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(EtlLogRow {
                job_name: row.get(0)?,
                status: row.get(1)?,
                records_inserted: row.get(2)?,
                completed_at: row.get(3)?,
            })
        })?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    // --- stored-data quality scans ---

    /// (sale_date, category, state, count) for every stored duplicate key.
    pub fn stored_duplicate_keys(&self) -> Result<Vec<(String, String, String, i64)>, EtlError> {
        let mut stmt = self.conn.prepare(
            "SELECT sale_date, category, state, COUNT(*) AS n
             FROM retail_sales
             GROUP BY sale_date, category, state
             HAVING n > 1
             ORDER BY n DESC, sale_date",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Stored facts with turnover <= 0.
    pub fn stored_nonpositive_count(&self) -> Result<i64, EtlError> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM retail_sales WHERE turnover_millions <= 0",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Stored facts with a null date or turnover.
    pub fn stored_null_count(&self) -> Result<i64, EtlError> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM retail_sales
             WHERE sale_date IS NULL OR turnover_millions IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}
