//! Integration tests of the library facade
//!
//! These tests drive a [`Bank`] the way an embedding service would: from
//! several threads at once, against a journal that can fail, and with a
//! clock the test controls. They check that:
//! - Money is neither created nor destroyed by transfers
//! - A failed journal append leaves no visible effect
//! - Competing debits on one account never overdraw it
//! - A withdrawal code pays out at most once, and never after expiry
//! - Bill payments settle with their fee and honor idempotency keys

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use rstest::rstest;
    use rust_banking_engine::config::EngineConfig;
    use rust_banking_engine::core::{Clock, Journal, LedgerEvent, ManualClock, MemoryJournal, Opening};
    use rust_banking_engine::settlement::PaymentEvent;
    use rust_banking_engine::types::{
        AccountId, Actor, BankResult, CheckingTerms, CodeState, Contact, ErrorKind, NaturalProfile,
        PersonId, SavingsTerms, SettleRequest, TransactionFilter, TransactionType,
    };
    use rust_banking_engine::{Bank, BankError};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    /// Journal that fails every append while `failing` is set
    #[derive(Debug, Default)]
    struct FlakyJournal {
        inner: MemoryJournal<LedgerEvent>,
        failing: AtomicBool,
    }

    impl Journal<LedgerEvent> for FlakyJournal {
        fn append(&self, event: &LedgerEvent) -> BankResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(BankError::storage("disk full"));
            }
            self.inner.append(event)
        }
    }

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn config() -> EngineConfig {
        EngineConfig {
            secret_memory_kib: 64,
            secret_iterations: 1,
            ..EngineConfig::default()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap()
    }

    fn bank_with(journal: Arc<FlakyJournal>, clock: Arc<ManualClock>) -> Bank {
        Bank::with_parts(
            config(),
            journal,
            Arc::new(MemoryJournal::<PaymentEvent>::new()),
            clock as Arc<dyn Clock>,
        )
        .unwrap()
    }

    fn bank() -> Bank {
        bank_with(
            Arc::new(FlakyJournal::default()),
            Arc::new(ManualClock::new(start())),
        )
    }

    fn customer(bank: &Bank, n: u32) -> PersonId {
        let profile = NaturalProfile {
            national_id: format!("17000000{:02}", n),
            first_name: "Ana".to_string(),
            last_name: format!("Cliente {}", n),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 31).unwrap(),
            gender: None,
            marital_status: None,
            occupation: None,
            nationality: String::new(),
            address: None,
        };
        let contact = Contact {
            phone: "0999999999".to_string(),
            email: format!("cliente{}@example.com", n),
            net_worth: Decimal::ZERO,
        };
        bank.persons()
            .register_natural(profile, contact, None)
            .unwrap()
            .id
    }

    fn savings(bank: &Bank, owner: PersonId, deposit: &str) -> AccountId {
        bank.accounts()
            .open_savings(owner, Opening::with_deposit(dec(deposit)), SavingsTerms::default())
            .unwrap()
            .id
    }

    fn total_balance(bank: &Bank) -> Decimal {
        bank.all_accounts().iter().map(|a| a.balance).sum()
    }

    #[test]
    fn test_concurrent_transfers_conserve_money() {
        let bank = Arc::new(bank());
        let owner = customer(&bank, 1);
        let ids: Vec<AccountId> = (0..4).map(|_| savings(&bank, owner, "1000.00")).collect();
        let before = total_balance(&bank);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let bank = Arc::clone(&bank);
                let ids = ids.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        let from = ids[(t + i) % ids.len()];
                        let to = ids[(t + i + 1 + t % 3) % ids.len()];
                        let _ = bank.engine().transfer(from, to, dec("7.25"), "");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(total_balance(&bank), before);
        assert!(bank.all_accounts().iter().all(|a| a.balance >= Decimal::ZERO));
    }

    #[test]
    fn test_failed_journal_append_leaves_no_trace() {
        let journal = Arc::new(FlakyJournal::default());
        let bank = bank_with(journal.clone(), Arc::new(ManualClock::new(start())));
        let owner = customer(&bank, 1);
        let a = savings(&bank, owner, "100.00");
        let b = savings(&bank, owner, "0");
        let transactions_before = bank
            .engine()
            .list_transactions(&TransactionFilter::default())
            .len();

        journal.failing.store(true, Ordering::SeqCst);
        let err = bank.engine().transfer(a, b, dec("40.00"), "rent").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        let err = bank.codes().issue(a, dec("10.00")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);

        assert_eq!(bank.engine().query_balance(a).unwrap(), dec("100.00"));
        assert_eq!(bank.engine().query_balance(b).unwrap(), Decimal::ZERO);
        assert!(bank.codes().list(a).is_empty());
        assert_eq!(
            bank.engine()
                .list_transactions(&TransactionFilter::default())
                .len(),
            transactions_before
        );

        journal.failing.store(false, Ordering::SeqCst);
        bank.engine().transfer(a, b, dec("40.00"), "rent").unwrap();
        assert_eq!(bank.engine().query_balance(b).unwrap(), dec("40.00"));
    }

    #[rstest]
    #[case::savings(None)]
    #[case::checking_with_overdraft(Some("50.00"))]
    fn test_competing_withdrawals_never_overdraw(#[case] overdraft: Option<&str>) {
        let bank = Arc::new(bank());
        let owner = customer(&bank, 1);
        let id = match overdraft {
            None => savings(&bank, owner, "100.00"),
            Some(overdraft) => {
                let terms = CheckingTerms {
                    authorized_overdraft: dec(overdraft),
                    ..CheckingTerms::default()
                };
                bank.accounts()
                    .open_checking(owner, Opening::with_deposit(dec("50.00")), terms)
                    .unwrap()
                    .id
            }
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bank = Arc::clone(&bank);
                thread::spawn(move || bank.engine().withdraw(id, dec("100.00"), Actor::Teller))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::InsufficientFunds));
        let expected = match overdraft {
            None => Decimal::ZERO,
            Some(_) => dec("-50.00"),
        };
        assert_eq!(bank.engine().query_balance(id).unwrap(), expected);
    }

    #[test]
    fn test_withdrawal_code_redeems_once_under_contention() {
        let bank = Arc::new(bank());
        let owner = customer(&bank, 1);
        let id = savings(&bank, owner, "500.00");
        let code = bank.codes().issue(id, dec("60.00")).unwrap();
        assert_eq!(code.code.len(), 6);

        let handles: Vec<_> = (0..6u32)
            .map(|terminal| {
                let bank = Arc::clone(&bank);
                let value = code.code.clone();
                thread::spawn(move || bank.codes().redeem(&value, terminal))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(bank.engine().query_balance(id).unwrap(), dec("440.00"));
        let stored = bank.codes().get(&code.code).unwrap();
        assert_eq!(stored.state, CodeState::Used);
        assert!(stored.terminal.is_some());
    }

    #[test]
    fn test_withdrawal_code_expires() {
        let clock = Arc::new(ManualClock::new(start()));
        let bank = bank_with(Arc::new(FlakyJournal::default()), clock.clone());
        let owner = customer(&bank, 1);
        let id = savings(&bank, owner, "100.00");
        let code = bank.codes().issue(id, dec("20.00")).unwrap();
        assert_eq!(code.validity_minutes(), 10);

        clock.advance(Duration::seconds(601));
        let err = bank.codes().redeem(&code.code, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expired);
        assert_eq!(bank.codes().get(&code.code).unwrap().state, CodeState::Expired);

        let err = bank.codes().redeem(&code.code, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(bank.engine().query_balance(id).unwrap(), dec("100.00"));
    }

    #[test]
    fn test_card_withdrawal_flow() {
        let bank = bank();
        let owner = customer(&bank, 1);
        let id = savings(&bank, owner, "300.00");
        let issued = bank
            .cards()
            .issue_debit(id, "Ana Cliente", "4321", None)
            .unwrap();
        assert_eq!(issued.number.len(), 16);
        assert!(issued.card.number.ends_with(&issued.number[12..]));

        let tx = bank
            .cards()
            .withdraw(&issued.number, "4321", dec("80.00"), 12)
            .unwrap();
        assert_eq!(tx.tx_type, TransactionType::Withdrawal);
        assert_eq!(tx.card, Some(issued.card.id));
        assert_eq!(tx.terminal, Some(12));

        let err = bank
            .cards()
            .withdraw(&issued.number, "0000", dec("1.00"), 12)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredential);

        bank.cards().block(issued.card.id).unwrap();
        let err = bank
            .cards()
            .withdraw(&issued.number, "4321", dec("1.00"), 12)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CardBlocked);
        assert_eq!(bank.engine().query_balance(id).unwrap(), dec("220.00"));
    }

    #[test]
    fn test_settle_bill_payment() {
        let bank = bank();
        let request = SettleRequest::new("EEQ_LUZ", "1234567", dec("45.50"))
            .with_idempotency_key("order-77");

        let payment = bank.payments().settle(request.clone()).unwrap();
        assert_eq!(payment.fee, dec("0.50"));
        assert_eq!(payment.total, dec("46.00"));
        assert!(payment.receipt.starts_with("BP"));

        let again = bank.payments().settle(request).unwrap();
        assert_eq!(again, payment);

        let err = bank
            .payments()
            .settle(SettleRequest::new("EEQ_LUZ", "1234567", dec("2500.00")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        let err = bank
            .payments()
            .settle(SettleRequest::new("NOPE", "1", dec("1.00")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceNotFound);
    }
}
