//! Balance Aggregator
//!
//! Rebuilds one entity's cached balance from its full ledger history. The
//! ledger is the source of truth; the snapshot is a disposable rollup that can
//! be recomputed at any time with the same result.

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{BalanceSnapshot, EntityType, LedgerEntry};
use crate::repos::{LedgerStore, SnapshotStore};

/// Sum of signed amounts, folded in `occurred_at` then `id` order
///
/// Decimal addition is exact, so the result does not depend on the order the
/// entries arrive in; the fixed fold order keeps any future running-balance
/// output deterministic.
pub fn compute_balance(entries: &[LedgerEntry]) -> Decimal {
    let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    ordered
        .into_iter()
        .fold(Decimal::ZERO, |balance, entry| balance + entry.amount)
}

/// Recalculate an entity's balance and upsert its snapshot, stamped with the
/// local wall clock
pub async fn recalculate(
    ledger: &dyn LedgerStore,
    snapshots: &dyn SnapshotStore,
    entity_type: EntityType,
    entity_id: i64,
) -> LedgerResult<BalanceSnapshot> {
    recalculate_at(
        ledger,
        snapshots,
        entity_type,
        entity_id,
        Local::now().naive_local(),
    )
    .await
}

/// Recalculate with an explicit `last_recalculated_at` stamp
///
/// # Errors
/// * `NotFound` - the entity does not exist
/// * `Storage` - the ledger read or snapshot write failed; when the read fails
///   the existing snapshot is left untouched
pub async fn recalculate_at(
    ledger: &dyn LedgerStore,
    snapshots: &dyn SnapshotStore,
    entity_type: EntityType,
    entity_id: i64,
    now: NaiveDateTime,
) -> LedgerResult<BalanceSnapshot> {
    if ledger.find_entity(entity_type, entity_id).await?.is_none() {
        return Err(LedgerError::NotFound {
            entity_type,
            entity_id,
        });
    }

    let entries = ledger.list_entries(entity_type, entity_id).await?;
    let balance = compute_balance(&entries);

    tracing::debug!(
        entity_type = %entity_type,
        entity_id = entity_id,
        entry_count = entries.len(),
        balance = %balance,
        "Computed balance from ledger"
    );

    let snapshot = BalanceSnapshot {
        entity_id,
        entity_type,
        balance,
        last_recalculated_at: now,
    };

    snapshots.upsert_snapshot(&snapshot).await?;

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;
    use chrono::NaiveDate;

    fn entry(id: i64, day: u32, amount: i64) -> LedgerEntry {
        LedgerEntry {
            id,
            entity_type: EntityType::Customer,
            entity_id: 1,
            kind: if amount >= 0 {
                EntryKind::Sale
            } else {
                EntryKind::Payment
            },
            amount: Decimal::from(amount),
            occurred_at: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            related_invoice_id: None,
        }
    }

    #[test]
    fn test_compute_balance_empty_is_zero() {
        assert_eq!(compute_balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_compute_balance_sale_payment_sale() {
        let entries = vec![entry(1, 1, 100), entry(2, 2, -40), entry(3, 3, 25)];
        assert_eq!(compute_balance(&entries), Decimal::from(85));
    }

    #[test]
    fn test_compute_balance_ignores_arrival_order() {
        let forward = vec![entry(1, 1, 100), entry(2, 2, -40), entry(3, 3, 25)];
        let shuffled = vec![entry(3, 3, 25), entry(1, 1, 100), entry(2, 2, -40)];
        assert_eq!(compute_balance(&forward), compute_balance(&shuffled));
    }

    #[test]
    fn test_compute_balance_keeps_cents_exact() {
        let mut entries = Vec::new();
        for id in 0..10 {
            let mut e = entry(id, 1, 0);
            e.amount = Decimal::new(10, 2); // 0.10
            entries.push(e);
        }
        assert_eq!(compute_balance(&entries), Decimal::ONE);
    }
}
