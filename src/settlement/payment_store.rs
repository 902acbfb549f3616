//! Payment storage
//!
//! Payments are kept per id behind their own mutex, with unique indexes on
//! the receipt number and on the caller's idempotency key. Like the account
//! ledger, a receipt or key is claimed before the payment is journaled and
//! released again if the journal write fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::core::ledger_store::{lock, UniqueIndex};
use crate::types::{BankError, BankResult, Payment, PaymentFilter, PaymentId};

/// One atomic change of the settlement engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PaymentEvent {
    Settled { payment: Payment },
    Reversed { payment: Payment },
}

#[derive(Debug, Default)]
pub struct PaymentStore {
    payments: DashMap<PaymentId, Arc<Mutex<Payment>>>,
    receipts: UniqueIndex<PaymentId>,
    idempotency_keys: UniqueIndex<PaymentId>,
    next_id: AtomicU64,
}

impl PaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> PaymentId {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn receipts(&self) -> &UniqueIndex<PaymentId> {
        &self.receipts
    }

    pub fn idempotency_keys(&self) -> &UniqueIndex<PaymentId> {
        &self.idempotency_keys
    }

    /// Publish a committed payment (new or rebuilt from the journal)
    pub fn put(&self, payment: Payment) {
        self.next_id.fetch_max(payment.id, Ordering::SeqCst);
        self.receipts.set(&payment.receipt, payment.id);
        if let Some(key) = &payment.idempotency_key {
            self.idempotency_keys.set(key, payment.id);
        }
        let existing = self.payments.get(&payment.id).map(|e| Arc::clone(e.value()));
        match existing {
            Some(handle) => *lock(&handle) = payment,
            None => {
                self.payments
                    .insert(payment.id, Arc::new(Mutex::new(payment)));
            }
        }
    }

    fn handle(&self, id: PaymentId) -> BankResult<Arc<Mutex<Payment>>> {
        self.payments
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BankError::not_found("Payment", id))
    }

    pub fn get(&self, id: PaymentId) -> BankResult<Payment> {
        let handle = self.handle(id)?;
        let payment = lock(&handle).clone();
        Ok(payment)
    }

    /// Payment by receipt number, ignoring case
    pub fn get_by_receipt(&self, receipt: &str) -> BankResult<Payment> {
        let receipt = receipt.trim().to_uppercase();
        let id = self
            .receipts
            .get(&receipt)
            .ok_or_else(|| BankError::not_found("Payment", &receipt))?;
        self.get(id)
    }

    /// Run `f` on a copy of the payment under its lock; the copy replaces the
    /// stored payment only if `f` succeeds
    pub fn with_lock<R>(
        &self,
        id: PaymentId,
        f: impl FnOnce(&mut Payment) -> BankResult<R>,
    ) -> BankResult<R> {
        let handle = self.handle(id)?;
        let mut guard = lock(&handle);
        let mut working = guard.clone();
        let result = f(&mut working)?;
        *guard = working;
        Ok(result)
    }

    /// Matching payments, newest first
    pub fn list(&self, filter: &PaymentFilter, default_limit: usize) -> Vec<Payment> {
        let mut matching: Vec<Payment> = self
            .payments
            .iter()
            .map(|entry| lock(entry.value()).clone())
            .filter(|payment| filter.matches(payment))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matching.truncate(filter.limit.unwrap_or(default_limit));
        matching
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}
