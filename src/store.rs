//! In-memory bill store.
//!
//! Bills live only in process memory (re-seeded from `BILLS_DIR` on startup);
//! the store is shared across handlers via `Arc<RwLock<...>>`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A bill record extracted from one uploaded PDF document.
/// Immutable after extraction.
#[derive(Debug, Clone)]
pub struct BillRecord {
    pub id: Uuid,
    /// First day of the billing period.
    pub billing_start: NaiveDate,
    /// Last day of the billing period (inclusive).
    pub billing_end: NaiveDate,
    /// Total energy used over the period.
    pub kwh_used: i64,
    /// Total amount due in dollars.
    pub total_cost: Decimal,
    /// Name of the uploaded file this record was extracted from.
    pub source_file: String,
    pub uploaded_at: DateTime<Utc>,
}

impl BillRecord {
    /// Number of days in the billing period (inclusive of both endpoints).
    pub fn period_days(&self) -> i64 {
        (self.billing_end - self.billing_start).num_days() + 1
    }
}

/// Outcome of inserting a bill into the store.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A bill covering the same billing period is already stored.
    DuplicatePeriod,
}

/// Shared in-memory collection of parsed bills.
#[derive(Debug, Clone, Default)]
pub struct BillStore {
    bills: Arc<RwLock<Vec<BillRecord>>>,
}

impl BillStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bill. A bill with the same (start, end) period is rejected
    /// so re-uploading the same document doesn't skew the training table.
    pub async fn insert(&self, bill: BillRecord) -> InsertOutcome {
        let mut bills = self.bills.write().await;
        let duplicate = bills
            .iter()
            .any(|b| b.billing_start == bill.billing_start && b.billing_end == bill.billing_end);
        if duplicate {
            return InsertOutcome::DuplicatePeriod;
        }
        bills.push(bill);
        InsertOutcome::Inserted
    }

    /// All bills, sorted by billing start date.
    pub async fn list(&self) -> Vec<BillRecord> {
        let mut bills = self.bills.read().await.clone();
        bills.sort_by_key(|b| b.billing_start);
        bills
    }

    pub async fn get(&self, id: Uuid) -> Option<BillRecord> {
        self.bills.read().await.iter().find(|b| b.id == id).cloned()
    }

    /// Remove a bill by id. Returns whether a bill was removed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut bills = self.bills.write().await;
        let before = bills.len();
        bills.retain(|b| b.id != id);
        bills.len() < before
    }

    pub async fn count(&self) -> usize {
        self.bills.read().await.len()
    }
}
