//! Transaction storage
//!
//! This module provides the TransactionStore component that holds the
//! append-only history of committed transactions, indexed by id and by their
//! unique reference.
//!
//! # Reference reservation
//!
//! A reference is claimed before its transaction is journaled, so two
//! concurrent commits can never produce the same reference. If the commit
//! fails the reservation is released and nothing else is recorded.
//!
//! # Duplicate Handling
//!
//! Records are never replaced: if an id is stored twice (journal replay of a
//! record already present), only the first occurrence is kept.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::ids::{generate_unique, timestamped_reference};
use super::ledger_store::UniqueIndex;
use crate::types::{BankError, BankResult, Transaction, TransactionFilter, TransactionId};

#[derive(Debug, Default)]
pub struct TransactionStore {
    transactions: DashMap<TransactionId, Transaction>,
    references: UniqueIndex<TransactionId>,
    next_id: AtomicU64,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and a unique `TRX` reference for a transaction about
    /// to be committed
    pub fn reserve(
        &self,
        now: DateTime<Utc>,
        attempts: u32,
    ) -> BankResult<(TransactionId, String)> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = generate_unique(
            "transaction reference",
            attempts,
            || timestamped_reference("TRX", now, 6),
            |candidate| self.references.claim(candidate, id),
        )?;
        Ok((id, reference))
    }

    /// Give back a reservation whose transaction was never committed
    pub fn release(&self, reference: &str) {
        self.references.release(reference);
    }

    /// Store a committed transaction (first occurrence wins)
    pub fn store(&self, transaction: Transaction) {
        self.next_id.fetch_max(transaction.id, Ordering::SeqCst);
        self.references
            .set(&transaction.reference, transaction.id);
        self.transactions
            .entry(transaction.id)
            .or_insert(transaction);
    }

    pub fn get(&self, id: TransactionId) -> BankResult<Transaction> {
        self.transactions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BankError::not_found("Transaction", id))
    }

    pub fn get_by_reference(&self, reference: &str) -> BankResult<Transaction> {
        let reference = reference.trim().to_uppercase();
        let id = self
            .references
            .get(&reference)
            .ok_or_else(|| BankError::not_found("Transaction", &reference))?;
        self.get(id)
    }

    /// Matching transactions, newest first
    ///
    /// At most `filter.limit` records, or `default_limit` when the filter has
    /// none.
    pub fn list(&self, filter: &TransactionFilter, default_limit: usize) -> Vec<Transaction> {
        let mut matching: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        matching.truncate(filter.limit.unwrap_or(default_limit));
        matching
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
