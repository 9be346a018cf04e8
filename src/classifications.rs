use std::thread;
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::classifier::{classify, ClassifierConfig, ClassifierContext};
use crate::db::enum_column;
use crate::error::{CostwiseError, Result};
use crate::models::{
    Classification, ClassificationBasis, CostNature, CostType, StoredClassification, Transaction,
    TransactionType,
};
use crate::patterns::load_patterns;
use crate::profile::get_profile;
use crate::rules::list_custom_rules;
use crate::transactions::{expenses, get_transaction, unclassified_expenses};

const RETRY_PAUSE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Updated,
    /// An automatic result was discarded because the row is a manual override.
    KeptManualOverride,
}

/// Read the classification columns starting at `offset`:
/// cost_type, cost_nature, confidence, basis, basis_detail.
pub(crate) fn classification_from_row(row: &Row, offset: usize) -> rusqlite::Result<Classification> {
    let kind: String = row.get(offset + 3)?;
    let basis = ClassificationBasis::from_parts(&kind, row.get(offset + 4)?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(offset + 3, Type::Text, Box::new(e)))?;
    Ok(Classification {
        cost_type: enum_column(row, offset)?,
        cost_nature: enum_column(row, offset + 1)?,
        confidence: row.get(offset + 2)?,
        basis,
    })
}

pub fn get_classification(conn: &Connection, transaction_id: i64) -> Result<Option<StoredClassification>> {
    let stored = conn
        .query_row(
            "SELECT cost_type, cost_nature, confidence, basis, basis_detail, origin \
             FROM classifications WHERE transaction_id = ?1",
            [transaction_id],
            |row| {
                let classification = classification_from_row(row, 0)?;
                let origin: String = row.get(5)?;
                Ok(if origin == "manual" {
                    StoredClassification::ManualOverride(classification)
                } else {
                    StoredClassification::Automatic(classification)
                })
            },
        )
        .optional()?;
    Ok(stored)
}

/// Upsert a classification keyed by transaction id. Automatic writes never
/// replace a manual override.
pub fn save(conn: &Connection, transaction_id: i64, stored: &StoredClassification) -> Result<SaveOutcome> {
    let txn = get_transaction(conn, transaction_id)?
        .ok_or(CostwiseError::UnknownTransaction(transaction_id))?;
    if txn.txn_type != TransactionType::Expense {
        return Err(CostwiseError::NotExpense(transaction_id));
    }

    let existing = get_classification(conn, transaction_id)?;
    if !stored.is_manual() && existing.as_ref().is_some_and(StoredClassification::is_manual) {
        debug!(transaction_id, "keeping manual override");
        return Ok(SaveOutcome::KeptManualOverride);
    }

    let c = stored.classification();
    let written = conn.execute(
        "INSERT INTO classifications \
         (transaction_id, cost_type, cost_nature, confidence, basis, basis_detail, origin, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now')) \
         ON CONFLICT(transaction_id) DO UPDATE SET \
         cost_type = excluded.cost_type, cost_nature = excluded.cost_nature, \
         confidence = excluded.confidence, basis = excluded.basis, \
         basis_detail = excluded.basis_detail, origin = excluded.origin, \
         updated_at = excluded.updated_at \
         WHERE classifications.origin = 'automatic' OR excluded.origin = 'manual'",
        rusqlite::params![
            transaction_id,
            c.cost_type.as_str(),
            c.cost_nature.as_str(),
            c.confidence.clamp(0.0, 1.0),
            c.basis.kind(),
            c.basis.detail(),
            stored.origin(),
        ],
    )?;

    Ok(match (existing, written) {
        (_, 0) => SaveOutcome::KeptManualOverride,
        (None, _) => SaveOutcome::Inserted,
        (Some(_), _) => SaveOutcome::Updated,
    })
}

/// Record a user's own classification. Always wins over automatic results.
pub fn set_manual_classification(
    conn: &Connection,
    transaction_id: i64,
    cost_type: CostType,
    cost_nature: CostNature,
) -> Result<SaveOutcome> {
    save(
        conn,
        transaction_id,
        &StoredClassification::ManualOverride(Classification {
            cost_type,
            cost_nature,
            confidence: 1.0,
            basis: ClassificationBasis::Manual,
        }),
    )
}

/// Hand a manually classified transaction back to automatic classification.
/// The stored values stay until the next reclassification replaces them.
pub fn clear_manual_override(conn: &Connection, transaction_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE classifications SET origin = 'automatic', updated_at = datetime('now') \
         WHERE transaction_id = ?1 AND origin = 'manual'",
        [transaction_id],
    )?;
    Ok(changed == 1)
}

// ---------------------------------------------------------------------------
// Bulk classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct BulkOptions {
    pub workers: usize,
    pub save_attempts: u32,
    pub classifier: ClassifierConfig,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            save_attempts: 2,
            classifier: ClassifierConfig::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BulkReport {
    pub classified: usize,
    pub kept_manual: usize,
    pub failed: Vec<(i64, String)>,
}

/// Classify every expense that has no classification yet. Safe to re-run.
pub fn classify_all(conn: &Connection, options: &BulkOptions) -> Result<BulkReport> {
    let pending = unclassified_expenses(conn)?;
    run_batch(conn, &pending, options)
}

/// Re-run automatic classification over every expense. Manual overrides are
/// left untouched.
pub fn reclassify_all(conn: &Connection, options: &BulkOptions) -> Result<BulkReport> {
    let all = expenses(conn)?;
    run_batch(conn, &all, options)
}

fn run_batch(conn: &Connection, txns: &[Transaction], options: &BulkOptions) -> Result<BulkReport> {
    let profile = get_profile(conn)?;
    let rules = match &profile {
        Some(p) => list_custom_rules(conn, Some(&p.category))?,
        None => Vec::new(),
    };
    let patterns = load_patterns(conn, profile.as_ref().map(|p| p.category.as_str()))?;
    let ctx = ClassifierContext::new(profile.as_ref(), &rules, &patterns).with_config(options.classifier);

    if profile.is_none() && !txns.is_empty() {
        warn!("no business profile set, falling back to keyword classification");
    }

    let results = classify_parallel(txns, &ctx, options.workers);
    let mut report = BulkReport::default();
    for (txn, result) in txns.iter().zip(results) {
        let outcome = match result {
            Some(classification) => save_with_retry(
                conn,
                txn.id,
                &StoredClassification::Automatic(classification),
                options.save_attempts,
            ),
            None => Err(CostwiseError::InvalidInput("classification worker panicked".to_string())),
        };
        match outcome {
            Ok(SaveOutcome::KeptManualOverride) => report.kept_manual += 1,
            Ok(_) => report.classified += 1,
            Err(e) => {
                warn!(transaction_id = txn.id, error = %e, "failed to classify transaction");
                report.failed.push((txn.id, e.to_string()));
            }
        }
    }

    info!(
        classified = report.classified,
        kept_manual = report.kept_manual,
        failed = report.failed.len(),
        "bulk classification finished"
    );
    Ok(report)
}

/// Classify on scoped worker threads. Results line up with `txns`; a `None`
/// marks a transaction whose worker died.
fn classify_parallel(txns: &[Transaction], ctx: &ClassifierContext, workers: usize) -> Vec<Option<Classification>> {
    if txns.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, txns.len());
    let chunk_size = txns.len().div_ceil(workers);

    thread::scope(|scope| {
        let handles: Vec<_> = txns
            .chunks(chunk_size)
            .map(|part| {
                let handle = scope.spawn(move || {
                    part.iter()
                        .map(|t| Some(classify(&t.description, t.amount, &t.category, ctx)))
                        .collect::<Vec<_>>()
                });
                (part.len(), handle)
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|(len, handle)| handle.join().unwrap_or_else(|_| vec![None; len]))
            .collect()
    })
}

fn save_with_retry(
    conn: &Connection,
    transaction_id: i64,
    stored: &StoredClassification,
    attempts: u32,
) -> Result<SaveOutcome> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match save(conn, transaction_id, stored) {
            Err(CostwiseError::Db(e)) if attempt < attempts && is_transient(&e) => {
                debug!(transaction_id, attempt, error = %e, "retrying classification save");
                thread::sleep(RETRY_PAUSE * attempt);
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Lock contention clears on its own; anything else fails the same way again.
fn is_transient(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}
