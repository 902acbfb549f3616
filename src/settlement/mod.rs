//! Bill-payment settlement
//!
//! [`BillPayments`] settles bills against the service catalog: it checks the
//! service and the amount, adds the service fee and records a COMPLETED
//! payment with a unique `BP` receipt. Settlement is immediate; there is no
//! provider round-trip.
//!
//! The engine keeps its own journal, separate from the account ledger. A
//! payment may carry the id of the paying account and the reference of the
//! ledger transaction that funded it, but the two engines never write to
//! each other.

pub mod catalog;
pub mod payment_store;

use std::sync::Arc;

use tracing::{error, info, warn};

pub use catalog::Catalog;
pub use payment_store::{PaymentEvent, PaymentStore};

use crate::config::EngineConfig;
use crate::core::ids::{generate_unique, timestamped_reference};
use crate::core::traits::{Clock, Journal};
use crate::types::money::validate_amount;
use crate::types::{
    BankError, BankResult, Category, Payment, PaymentFilter, PaymentId, PaymentStatus, Provider,
    Service, SettleRequest,
};

pub struct BillPayments {
    catalog: Catalog,
    store: PaymentStore,
    journal: Arc<dyn Journal<PaymentEvent>>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl std::fmt::Debug for BillPayments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillPayments")
            .field("payments", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl BillPayments {
    pub fn new(
        config: EngineConfig,
        catalog: Catalog,
        journal: Arc<dyn Journal<PaymentEvent>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            store: PaymentStore::new(),
            journal,
            clock,
            config,
        }
    }

    /// Rebuild payments from journaled events, oldest first
    pub fn restore(&self, events: impl IntoIterator<Item = PaymentEvent>) {
        let mut count = 0usize;
        for event in events {
            count += 1;
            match event {
                PaymentEvent::Settled { payment } | PaymentEvent::Reversed { payment } => {
                    self.store.put(payment)
                }
            }
        }
        info!(events = count, "payments restored from journal");
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn categories(&self) -> Vec<Category> {
        self.catalog.categories()
    }

    pub fn providers(&self, category: Option<&str>) -> Vec<Provider> {
        self.catalog.providers(category)
    }

    pub fn services(&self, provider: Option<&str>) -> Vec<Service> {
        self.catalog.services(provider)
    }

    fn record(&self, event: &PaymentEvent) -> BankResult<()> {
        self.journal.append(event).inspect_err(|e| {
            error!(error = %e, "payment journal append failed");
        })
    }

    /// Payment already settled under an idempotency key
    fn replayed(&self, key: &str) -> Option<BankResult<Payment>> {
        let id = self.store.idempotency_keys().get(key)?;
        // Claimed but not yet published: another settlement with the same key
        // is still in flight
        Some(
            self.store
                .get(id)
                .map_err(|_| BankError::conflict("Payment", "idempotency_key", key)),
        )
    }

    /// Service that may be paid right now
    fn payable_service(&self, code: &str) -> BankResult<(&Service, &Provider)> {
        let service = self
            .catalog
            .service(code)
            .ok_or_else(|| BankError::ServiceNotFound {
                service: code.to_string(),
                reason: "not found",
            })?;
        let provider = self
            .catalog
            .provider(&service.provider)
            .filter(|p| p.active)
            .filter(|_| service.active)
            .ok_or_else(|| BankError::ServiceNotFound {
                service: code.to_string(),
                reason: "is not available",
            })?;
        Ok((service, provider))
    }

    /// Settle one bill
    ///
    /// # Arguments
    ///
    /// * `request` - Service code (any case), external reference, base amount
    ///   and the optional detail, paying account and idempotency key
    ///
    /// # Returns
    ///
    /// The COMPLETED payment with `total = amount + fee` and a new receipt,
    /// or, when the idempotency key was already used, the payment first
    /// settled with it
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No service has the code, or it or its provider is inactive (`ServiceNotFound`)
    /// - The provider requires a reference and none was given (`Validation`)
    /// - The amount is not positive or has more than two decimals (`Validation`)
    /// - The amount differs from a fixed amount or lies outside the bounds (`OutOfBounds`)
    /// - No unique receipt could be generated (`Exhausted`)
    /// - The journal cannot be written (`Storage`)
    pub fn settle(&self, request: SettleRequest) -> BankResult<Payment> {
        let code = request.service.trim().to_uppercase();
        let idempotency_key = match request.idempotency_key.as_deref().map(str::trim) {
            Some("") => return Err(BankError::validation("idempotency_key", "must not be empty")),
            Some(key) => Some(key.to_string()),
            None => None,
        };
        if let Some(key) = &idempotency_key {
            if let Some(previous) = self.replayed(key) {
                info!(key = %key, "settlement replayed by idempotency key");
                return previous;
            }
        }

        let result = self.settle_new(&code, request, idempotency_key);
        result.inspect_err(|e| warn!(service = %code, error = %e, "settlement rejected"))
    }

    fn settle_new(
        &self,
        code: &str,
        request: SettleRequest,
        idempotency_key: Option<String>,
    ) -> BankResult<Payment> {
        let (service, provider) = self.payable_service(code)?;

        let reference = request.reference.trim().to_string();
        if provider.requires_reference && reference.is_empty() {
            return Err(BankError::validation(
                "reference",
                format!("{} requires a reference", provider.name),
            ));
        }

        let amount = validate_amount("amount", request.amount)?;
        if let Some(fixed) = service.fixed_amount {
            if !service.allows_variable_amount && amount != fixed {
                return Err(BankError::out_of_bounds(
                    code,
                    amount,
                    format!("fixed amount {}", fixed),
                ));
            }
        }
        if let Some(min) = service.min_amount {
            if amount < min {
                return Err(BankError::out_of_bounds(code, amount, format!("minimum {}", min)));
            }
        }
        if let Some(max) = service.max_amount {
            if amount > max {
                return Err(BankError::out_of_bounds(code, amount, format!("maximum {}", max)));
            }
        }
        let total = amount
            .checked_add(service.fee)
            .ok_or_else(|| BankError::out_of_bounds(code, amount, "total overflows"))?;

        let id = self.store.next_id();
        if let Some(key) = &idempotency_key {
            if !self.store.idempotency_keys().claim(key, id) {
                return self
                    .replayed(key)
                    .unwrap_or_else(|| Err(BankError::conflict("Payment", "idempotency_key", key)));
            }
        }

        let now = self.clock.now();
        let receipt = generate_unique(
            "receipt",
            self.config.max_generation_attempts,
            || timestamped_reference("BP", now, 8),
            |candidate| self.store.receipts().claim(candidate, id),
        );
        let receipt = match receipt {
            Ok(receipt) => receipt,
            Err(e) => {
                if let Some(key) = &idempotency_key {
                    self.store.idempotency_keys().release(key);
                }
                return Err(e);
            }
        };

        let payment = Payment {
            id,
            receipt,
            service: service.code.clone(),
            service_name: service.name.clone(),
            provider: provider.code.clone(),
            reference,
            amount,
            fee: service.fee,
            total,
            status: PaymentStatus::Completed,
            detail: request
                .detail
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| format!("Pago de {}", service.name)),
            account: request.account,
            transaction_reference: request.transaction_reference,
            idempotency_key,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.record(&PaymentEvent::Settled {
            payment: payment.clone(),
        }) {
            self.store.receipts().release(&payment.receipt);
            if let Some(key) = &payment.idempotency_key {
                self.store.idempotency_keys().release(key);
            }
            return Err(e);
        }

        self.store.put(payment.clone());
        info!(
            receipt = %payment.receipt,
            service = %payment.service,
            reference = %payment.reference,
            amount = %payment.amount,
            total = %payment.total,
            "payment settled"
        );
        Ok(payment)
    }

    /// Reverse a COMPLETED payment
    pub fn reverse(&self, receipt: &str) -> BankResult<Payment> {
        let id = self.store.get_by_receipt(receipt)?.id;
        let now = self.clock.now();
        let reversed = self.store.with_lock(id, |payment| {
            if payment.status != PaymentStatus::Completed {
                return Err(BankError::validation(
                    "status",
                    format!(
                        "payment {} is {} and cannot be reversed",
                        payment.receipt,
                        payment.status.as_str()
                    ),
                ));
            }
            payment.status = PaymentStatus::Reversed;
            payment.updated_at = now;
            self.record(&PaymentEvent::Reversed {
                payment: payment.clone(),
            })?;
            Ok(payment.clone())
        })?;
        info!(receipt = %reversed.receipt, total = %reversed.total, "payment reversed");
        Ok(reversed)
    }

    pub fn get_payment(&self, id: PaymentId) -> BankResult<Payment> {
        self.store.get(id)
    }

    pub fn get_by_receipt(&self, receipt: &str) -> BankResult<Payment> {
        self.store.get_by_receipt(receipt)
    }

    /// Matching payments, newest first
    pub fn list_payments(&self, filter: &PaymentFilter) -> Vec<Payment> {
        self.store.list(filter, self.config.list_limit)
    }
}
