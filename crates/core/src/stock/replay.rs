//! Ledger replay.
//!
//! The balance store is a cache over the ledger: replaying a site's entries
//! in commit order through the costing engine reproduces every balance
//! exactly. This backs both the audit property tests and the recovery path
//! that rebuilds a corrupted cache.
//!
//! The bootstrap flag is reconstructed from document boundaries: the flag is
//! evaluated once per request, before any line, as "does the site have any
//! ledger rows at all" — so every entry belonging to the site's first-ever
//! document replays with the flag off, and every later document replays with
//! it on. Replay therefore needs the site's *full* ledger, not just one
//! pair's rows.

use std::collections::HashMap;

use strata_shared::types::{ItemId, SiteId, StockDocumentId};

use super::costing::{CostedPosition, CostingEngine};
use super::entry::{DocumentType, StockEntry};

/// A balance position reconstructed from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuiltBalance {
    /// The reconstructed position.
    pub position: CostedPosition,
    /// Document type of the last entry that touched the pair.
    pub last_document_type: DocumentType,
    /// Document id of the last entry that touched the pair.
    pub last_document_id: StockDocumentId,
}

/// Rebuilds every balance of a site ledger.
///
/// `entries` must be the full ledger of the site(s) concerned, in commit
/// order. Entries from several sites may be mixed (an Outward Transfer
/// document produces rows at two sites); each site's bootstrap boundary is
/// tracked separately.
#[must_use]
pub fn rebuild_site_balances(
    entries: &[StockEntry],
) -> HashMap<(SiteId, ItemId), RebuiltBalance> {
    let mut first_document: HashMap<SiteId, StockDocumentId> = HashMap::new();
    let mut balances: HashMap<(SiteId, ItemId), RebuiltBalance> = HashMap::new();

    for entry in entries {
        let site_first = *first_document
            .entry(entry.site_id)
            .or_insert(entry.document_id);
        let site_has_history = site_first != entry.document_id;

        let key = (entry.site_id, entry.item_id);
        let prior = balances.get(&key).map(|rebuilt| rebuilt.position);

        let position = if let Some(qty) = entry.received_qty {
            CostingEngine::receive(prior.as_ref(), qty, entry.unit_rate, site_has_history)
        } else if let Some(qty) = entry.issued_qty {
            match entry.document_type {
                DocumentType::StockAdjustment => {
                    CostingEngine::issue_at_rate(prior.as_ref(), qty, entry.unit_rate)
                }
                _ => CostingEngine::issue_at_average(prior.as_ref(), qty),
            }
        } else {
            // A row with neither quantity carries no effect.
            continue;
        };

        balances.insert(
            key,
            RebuiltBalance {
                position,
                last_document_type: entry.document_type,
                last_document_id: entry.document_id,
            },
        );
    }

    balances
}

/// Rebuilds one pair's balance from the site ledger.
///
/// Returns `None` when the pair has no ledger history.
#[must_use]
pub fn rebuild_pair(
    entries: &[StockEntry],
    site_id: SiteId,
    item_id: ItemId,
) -> Option<RebuiltBalance> {
    rebuild_site_balances(entries).remove(&(site_id, item_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use strata_shared::types::StockEntryId;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 20).unwrap()
    }

    fn receive(
        site_id: SiteId,
        item_id: ItemId,
        document_id: StockDocumentId,
        document_type: DocumentType,
        qty: Decimal,
        rate: Decimal,
    ) -> StockEntry {
        StockEntry {
            id: StockEntryId::new(),
            site_id,
            item_id,
            entry_date: date(),
            document_type,
            document_id,
            received_qty: Some(qty),
            issued_qty: None,
            unit_rate: rate,
        }
    }

    fn issue(
        site_id: SiteId,
        item_id: ItemId,
        document_id: StockDocumentId,
        document_type: DocumentType,
        qty: Decimal,
        rate: Decimal,
    ) -> StockEntry {
        StockEntry {
            id: StockEntryId::new(),
            site_id,
            item_id,
            entry_date: date(),
            document_type,
            document_id,
            received_qty: None,
            issued_qty: Some(qty),
            unit_rate: rate,
        }
    }

    #[test]
    fn test_replay_receive_average_consume() {
        let site_id = SiteId::new();
        let item_id = ItemId::new();
        let doc1 = StockDocumentId::new();
        let doc2 = StockDocumentId::new();
        let doc3 = StockDocumentId::new();

        let entries = vec![
            receive(site_id, item_id, doc1, DocumentType::OpeningStock, dec!(100), dec!(10)),
            receive(site_id, item_id, doc2, DocumentType::InwardReceipt, dec!(50), dec!(16)),
            issue(site_id, item_id, doc3, DocumentType::DailyConsumption, dec!(30), dec!(12)),
        ];

        let rebuilt = rebuild_pair(&entries, site_id, item_id).unwrap();
        assert_eq!(rebuilt.position.closing_stock, dec!(120));
        assert_eq!(rebuilt.position.closing_value, dec!(1440.00));
        assert_eq!(rebuilt.position.unit_rate, dec!(12));
        assert_eq!(rebuilt.last_document_type, DocumentType::DailyConsumption);
        assert_eq!(rebuilt.last_document_id, doc3);
    }

    #[test]
    fn test_replay_bootstraps_whole_first_document() {
        // Two receive rows for the same item inside the site's first-ever
        // document: both replay with the bootstrap flag off, so the second
        // discards the first.
        let site_id = SiteId::new();
        let item_id = ItemId::new();
        let doc1 = StockDocumentId::new();

        let entries = vec![
            receive(site_id, item_id, doc1, DocumentType::OpeningStock, dec!(10), dec!(5)),
            receive(site_id, item_id, doc1, DocumentType::OpeningStock, dec!(10), dec!(7)),
        ];

        let rebuilt = rebuild_pair(&entries, site_id, item_id).unwrap();
        assert_eq!(rebuilt.position.closing_stock, dec!(10));
        assert_eq!(rebuilt.position.closing_value, dec!(70.00));
        assert_eq!(rebuilt.position.unit_rate, dec!(7));
    }

    #[test]
    fn test_replay_adjustment_issue_uses_entry_rate() {
        let site_id = SiteId::new();
        let item_id = ItemId::new();
        let doc1 = StockDocumentId::new();
        let doc2 = StockDocumentId::new();

        let entries = vec![
            receive(site_id, item_id, doc1, DocumentType::OpeningStock, dec!(5), dec!(10)),
            issue(site_id, item_id, doc2, DocumentType::StockAdjustment, dec!(8), dec!(10)),
        ];

        let rebuilt = rebuild_pair(&entries, site_id, item_id).unwrap();
        assert_eq!(rebuilt.position.closing_stock, dec!(-3));
        assert_eq!(rebuilt.position.closing_value, dec!(-30.00));
        assert_eq!(rebuilt.position.unit_rate, dec!(10));
    }

    #[test]
    fn test_replay_tracks_sites_independently() {
        // A transfer document is the destination site's first-ever document,
        // so its receive row bootstraps there even though the source site
        // already has history.
        let source_site_id = SiteId::new();
        let dest_site_id = SiteId::new();
        let item_id = ItemId::new();
        let doc1 = StockDocumentId::new();
        let doc2 = StockDocumentId::new();

        let entries = vec![
            receive(source_site_id, item_id, doc1, DocumentType::OpeningStock, dec!(100), dec!(10)),
            issue(source_site_id, item_id, doc2, DocumentType::OutwardTransfer, dec!(40), dec!(10)),
            receive(dest_site_id, item_id, doc2, DocumentType::OutwardTransfer, dec!(40), dec!(10)),
        ];

        let balances = rebuild_site_balances(&entries);
        let source = &balances[&(source_site_id, item_id)];
        assert_eq!(source.position.closing_stock, dec!(60));
        assert_eq!(source.position.closing_value, dec!(600.00));

        let dest = &balances[&(dest_site_id, item_id)];
        assert_eq!(dest.position.closing_stock, dec!(40));
        assert_eq!(dest.position.closing_value, dec!(400.00));
        assert_eq!(dest.position.unit_rate, dec!(10));
    }

    #[test]
    fn test_replay_of_unknown_pair_is_none() {
        assert!(rebuild_pair(&[], SiteId::new(), ItemId::new()).is_none());
    }
}
