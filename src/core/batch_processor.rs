//! Batch processing of replayed teller operations
//!
//! This module provides the `BatchProcessor` struct, which runs a batch of
//! teller operations concurrently while keeping the result identical to a
//! sequential run.
//!
//! # Design
//!
//! A batch is split into groups of operations that share no account. A
//! transfer ties its two accounts together, so the groups are the connected
//! components of the accounts touched by the batch. Groups run as separate
//! tokio tasks; the operations of one group run in file order.
//!
//! ```text
//! batch: d(1) t(1->2) d(3) w(2) d(4) t(4->3)
//! groups: [d(1) t(1->2) w(2)]  [d(3) d(4) t(4->3)]
//! ```
//!
//! Because no two groups touch the same account, the final balances do not
//! depend on how the tasks interleave.

use std::collections::HashMap;

use tracing::error;

use super::engine::BalanceEngine;
use crate::types::{AccountId, BankResult, TellerOperation, Transaction};

/// Result of processing a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was processed
    pub operation: TellerOperation,

    /// The committed transaction or the rejection
    pub result: BankResult<Transaction>,
}

/// Root of `id` in the account forest, compressing the path on the way
fn find(parent: &mut HashMap<AccountId, AccountId>, id: AccountId) -> AccountId {
    let mut root = id;
    while let Some(&next) = parent.get(&root) {
        if next == root {
            break;
        }
        root = next;
    }

    let mut current = id;
    while current != root {
        let next = parent.get(&current).copied().unwrap_or(root);
        parent.insert(current, root);
        current = next;
    }
    parent.entry(root).or_insert(root);
    root
}

fn union(parent: &mut HashMap<AccountId, AccountId>, a: AccountId, b: AccountId) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        parent.insert(root_a, root_b);
    }
}

/// Batch processor with account-based partitioning
///
/// Cloneable and shared across tokio tasks; clones share the same engine.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: BalanceEngine,
}

impl BatchProcessor {
    pub fn new(engine: BalanceEngine) -> Self {
        Self { engine }
    }

    /// Split a batch into groups that share no account
    ///
    /// # Guarantees
    ///
    /// - Each operation appears in exactly one group
    /// - Operations keep their original relative order inside a group
    /// - Groups are ordered by their first operation in the batch
    pub fn partition_by_accounts(&self, batch: Vec<TellerOperation>) -> Vec<Vec<TellerOperation>> {
        let mut parent = HashMap::new();
        for operation in &batch {
            let mut accounts = operation.accounts();
            if let Some(first) = accounts.next() {
                find(&mut parent, first);
                for other in accounts {
                    union(&mut parent, first, other);
                }
            }
        }

        let mut group_of_root: HashMap<AccountId, usize> = HashMap::new();
        let mut groups: Vec<Vec<TellerOperation>> = Vec::new();
        for operation in batch {
            let root = find(&mut parent, operation.account);
            let index = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[index].push(operation);
        }
        groups
    }

    /// Apply a group of operations one after another
    ///
    /// Rejections are captured in the results and do not stop the group.
    /// Blocks on account locks and journal writes.
    pub fn process_group(&self, operations: Vec<TellerOperation>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(operations.len());
        for operation in operations {
            let result = self.engine.apply(&operation);
            results.push(ProcessingResult { operation, result });
        }
        results
    }

    /// Process a batch, one blocking tokio task per independent group
    ///
    /// Groups run on the blocking pool since they take mutexes and write the
    /// journal. Results are returned group by group, in group order.
    pub async fn process_batch(&self, batch: Vec<TellerOperation>) -> Vec<ProcessingResult> {
        let groups = self.partition_by_accounts(batch);

        let mut tasks = Vec::with_capacity(groups.len());
        for operations in groups {
            let processor = self.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                processor.process_group(operations)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(e) => error!(error = %e, "replay task failed"),
            }
        }
        results
    }
}
