//! Batch loader: pre-insert quality gate and chunked inserts.
//!
//! The gate is a hard precondition on the whole incoming batch: any
//! violation rejects the batch with the specific failed checks and nothing
//! is inserted. Whether to proceed regardless is the caller's decision
//! (`--force` at the CLI). Chunk failures during the insert phase are
//! counted and skipped up to a tolerance, then the run aborts.

use std::collections::HashSet;

use crate::domain::SalesFact;
use crate::error::{EtlError, QualityIssue};
use crate::store::Store;

/// Rows per insert chunk when the CLI does not override it.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Failed chunks tolerated before the load aborts.
const MAX_FAILED_CHUNKS: usize = 5;

/// Result of one load run, including the before/after verification counts.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub records_before: i64,
    pub records_after: i64,
    pub inserted: usize,
    pub failed_chunks: usize,
}

/// Check the whole batch before any insert.
///
/// Checks: finite turnover, positive turnover, unique
/// (sale_date, category, state) natural keys. Every failed check is
/// reported, not just the first.
pub fn quality_gate(facts: &[SalesFact]) -> Result<(), EtlError> {
    let mut issues = Vec::new();

    let nonfinite = facts.iter().filter(|f| !f.turnover.is_finite()).count();
    if nonfinite > 0 {
        issues.push(QualityIssue {
            check: "turnover_finite",
            detail: format!("{nonfinite} rows with non-finite turnover"),
        });
    }

    let nonpositive = facts
        .iter()
        .filter(|f| f.turnover.is_finite() && f.turnover <= 0.0)
        .count();
    if nonpositive > 0 {
        issues.push(QualityIssue {
            check: "turnover_positive",
            detail: format!("{nonpositive} rows with non-positive turnover"),
        });
    }

    let mut seen = HashSet::new();
    let mut duplicates = 0usize;
    for fact in facts {
        if !seen.insert((fact.sale_date, fact.category.clone(), fact.state.clone())) {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        issues.push(QualityIssue {
            check: "natural_key_unique",
            detail: format!("{duplicates} duplicate (sale_date, category, state) rows"),
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(EtlError::QualityGate(issues))
    }
}

/// Load facts in sequential chunks, verifying the store count before and
/// after. The quality gate must have passed (or been explicitly overridden)
/// before calling.
pub fn load_facts(
    store: &mut Store,
    facts: &[SalesFact],
    batch_size: usize,
) -> Result<LoadOutcome, EtlError> {
    let records_before = store.fact_count()?;
    let batch_size = batch_size.max(1);

    let mut inserted = 0usize;
    let mut failed_chunks = 0usize;

    for (chunk_idx, chunk) in facts.chunks(batch_size).enumerate() {
        match store.insert_facts(chunk) {
            Ok(n) => {
                inserted += n;
                tracing::debug!(chunk = chunk_idx, rows = n, "chunk inserted");
            }
            Err(e) => {
                failed_chunks += 1;
                tracing::warn!(chunk = chunk_idx, error = %e, "chunk insert failed");
                if failed_chunks > MAX_FAILED_CHUNKS {
                    tracing::error!(failed_chunks, "too many failed chunks, aborting load");
                    return Err(e);
                }
            }
        }
    }

    let records_after = store.fact_count()?;
    tracing::info!(
        before = records_before,
        after = records_after,
        inserted,
        failed_chunks,
        "load complete"
    );

    Ok(LoadOutcome {
        records_before,
        records_after,
        inserted,
        failed_chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fact(month: u32, category: &str, state: &str, turnover: f64) -> SalesFact {
        let sale_date = NaiveDate::from_ymd_opt(2024, month, 1).unwrap();
        SalesFact {
            sale_date,
            category: category.to_string(),
            state: state.to_string(),
            turnover,
            month_name: sale_date.format("%B").to_string(),
            year: 2024,
            growth_rate_yoy: None,
            data_source: "ABS_RT".to_string(),
        }
    }

    fn test_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    #[test]
    fn gate_accepts_a_clean_batch() {
        let facts = vec![
            fact(1, "20", "AUS", 100.0),
            fact(2, "20", "AUS", 110.0),
            fact(1, "20", "1", 40.0),
        ];
        assert!(quality_gate(&facts).is_ok());
    }

    #[test]
    fn gate_rejects_duplicates_without_inserting() {
        let store = test_store();
        let facts = vec![fact(1, "20", "AUS", 100.0), fact(1, "20", "AUS", 100.0)];

        let err = quality_gate(&facts).unwrap_err();
        let EtlError::QualityGate(issues) = &err else {
            panic!("expected quality gate error, got {err}");
        };
        assert!(issues.iter().any(|i| i.check == "natural_key_unique"));

        // The caller never reaches load_facts on a gate failure.
        assert_eq!(store.fact_count().unwrap(), 0);
    }

    #[test]
    fn gate_rejects_negative_turnover() {
        let facts = vec![fact(1, "20", "AUS", -5.0)];
        let err = quality_gate(&facts).unwrap_err();
        let EtlError::QualityGate(issues) = &err else {
            panic!("expected quality gate error, got {err}");
        };
        assert!(issues.iter().any(|i| i.check == "turnover_positive"));
    }

    #[test]
    fn gate_reports_every_failed_check() {
        let facts = vec![
            fact(1, "20", "AUS", -5.0),
            fact(2, "20", "AUS", f64::NAN),
            fact(3, "20", "AUS", 10.0),
            fact(3, "20", "AUS", 10.0),
        ];
        let err = quality_gate(&facts).unwrap_err();
        let EtlError::QualityGate(issues) = err else {
            panic!("expected quality gate error");
        };
        let checks: Vec<&str> = issues.iter().map(|i| i.check).collect();
        assert!(checks.contains(&"turnover_finite"));
        assert!(checks.contains(&"turnover_positive"));
        assert!(checks.contains(&"natural_key_unique"));
    }

    #[test]
    fn load_inserts_in_chunks_and_verifies_counts() {
        let mut store = test_store();
        let facts: Vec<SalesFact> = (1..=12).map(|m| fact(m, "20", "AUS", 100.0)).collect();

        let outcome = load_facts(&mut store, &facts, 5).unwrap();
        assert_eq!(outcome.records_before, 0);
        assert_eq!(outcome.records_after, 12);
        assert_eq!(outcome.inserted, 12);
        assert_eq!(outcome.failed_chunks, 0);
    }

    #[test]
    fn load_handles_zero_batch_size() {
        let mut store = test_store();
        let facts = vec![fact(1, "20", "AUS", 100.0)];
        let outcome = load_facts(&mut store, &facts, 0).unwrap();
        assert_eq!(outcome.inserted, 1);
    }
}
