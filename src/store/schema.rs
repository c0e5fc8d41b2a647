//! Store schema.
//! Tables: retail_sales, sales_forecasts, state_mapping, category_mapping, etl_logs

pub const SCHEMA_SQL: &str = r#"
-- Clean monthly facts. Natural key (sale_date, category, state) is enforced
-- by the loader's quality gate rather than a UNIQUE constraint.
CREATE TABLE IF NOT EXISTS retail_sales (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sale_date TEXT NOT NULL,
    category TEXT NOT NULL,
    state TEXT NOT NULL,
    turnover_millions REAL NOT NULL,
    month_name TEXT NOT NULL,
    year INTEGER NOT NULL,
    growth_rate_yoy REAL,
    data_source TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_retail_sales_key ON retail_sales(sale_date, category, state);
CREATE INDEX IF NOT EXISTS idx_retail_sales_scope ON retail_sales(category, state);

-- Forecast horizon rows; one run per (category, state, model_name) fully
-- replaces the previous rows for that scope.
CREATE TABLE IF NOT EXISTS sales_forecasts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    forecast_date TEXT NOT NULL,
    category TEXT NOT NULL,
    state TEXT NOT NULL,
    predicted_turnover REAL NOT NULL,
    lower_bound REAL NOT NULL,
    upper_bound REAL NOT NULL,
    confidence_interval REAL NOT NULL,
    model_name TEXT NOT NULL,
    model_version TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_forecasts_scope ON sales_forecasts(category, state, model_name);

-- Static reference data joined at query time.
CREATE TABLE IF NOT EXISTS state_mapping (
    state_code TEXT PRIMARY KEY,
    state_name TEXT NOT NULL,
    state_full_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS category_mapping (
    category_code TEXT PRIMARY KEY,
    category_name TEXT NOT NULL,
    category_description TEXT
);

-- Append-only audit trail.
CREATE TABLE IF NOT EXISTS etl_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_name TEXT NOT NULL,
    status TEXT NOT NULL,
    records_processed INTEGER NOT NULL,
    records_inserted INTEGER NOT NULL,
    records_updated INTEGER NOT NULL,
    error_message TEXT,
    execution_time_seconds REAL NOT NULL,
    completed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_etl_logs_completed ON etl_logs(completed_at DESC);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_every_table() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('retail_sales', 'sales_forecasts', 'state_mapping', 'category_mapping', 'etl_logs')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
    }
}
