//! Balance store reads and cache rebuild.
//!
//! Balances are only ever written by the movement repository (in lockstep
//! with the ledger) and by `rebuild_site`, the audit/recovery path that
//! reconstructs the cache from the ledger.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use strata_core::stock::rebuild_site_balances;
use strata_shared::types::{ItemId, SiteId};

use crate::entities::{stock_balances, stock_documents};
use crate::repositories::ledger::load_site_entries;

/// Read access to the balance store, plus the rebuild path.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the current balance for a (site, item) pair, if any.
    pub async fn get(
        &self,
        site_id: SiteId,
        item_id: ItemId,
    ) -> Result<Option<strata_core::stock::StockBalance>, DbErr> {
        let model = stock_balances::Entity::find()
            .filter(stock_balances::Column::SiteId.eq(site_id.into_inner()))
            .filter(stock_balances::Column::ItemId.eq(item_id.into_inner()))
            .one(&self.db)
            .await?;
        Ok(model.as_ref().map(balance_from_model))
    }

    /// Lists all balances of a site (the site stock report source).
    pub async fn list_for_site(
        &self,
        site_id: SiteId,
    ) -> Result<Vec<strata_core::stock::StockBalance>, DbErr> {
        let models = stock_balances::Entity::find()
            .filter(stock_balances::Column::SiteId.eq(site_id.into_inner()))
            .order_by_asc(stock_balances::Column::ItemId)
            .all(&self.db)
            .await?;
        Ok(models.iter().map(balance_from_model).collect())
    }

    /// Rebuilds every balance of a site from its ledger, in one transaction.
    ///
    /// Replays the site's full ledger through the costing engine and
    /// overwrites the cached rows. Returns the number of balances written.
    /// Normal operation never needs this; it exists for audit and recovery
    /// from cache corruption.
    pub async fn rebuild_site(&self, site_id: SiteId) -> Result<usize, DbErr> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let entries = load_site_entries(&txn, site_id.into_inner()).await?;
        let rebuilt = rebuild_site_balances(&entries);

        let mut written = 0usize;
        for (&(site, item), balance) in &rebuilt {
            // The audit tag points at the movement that last touched the pair.
            let document = stock_documents::Entity::find_by_id(
                balance.last_document_id.into_inner(),
            )
            .one(&txn)
            .await?;
            let last_movement = document.map_or_else(
                || balance.last_document_type.to_string(),
                |doc| format!("{} {}", balance.last_document_type, doc.document_code),
            );

            let existing = stock_balances::Entity::find()
                .filter(stock_balances::Column::SiteId.eq(site.into_inner()))
                .filter(stock_balances::Column::ItemId.eq(item.into_inner()))
                .one(&txn)
                .await?;

            match existing {
                Some(row) => {
                    let version = row.version + 1;
                    let mut active: stock_balances::ActiveModel = row.into();
                    active.closing_stock = Set(balance.position.closing_stock);
                    active.closing_value = Set(balance.position.closing_value);
                    active.unit_rate = Set(balance.position.unit_rate);
                    active.last_movement = Set(last_movement);
                    active.version = Set(version);
                    active.updated_at = Set(now.into());
                    active.update(&txn).await?;
                }
                None => {
                    stock_balances::ActiveModel {
                        id: Set(Uuid::now_v7()),
                        site_id: Set(site.into_inner()),
                        item_id: Set(item.into_inner()),
                        closing_stock: Set(balance.position.closing_stock),
                        closing_value: Set(balance.position.closing_value),
                        unit_rate: Set(balance.position.unit_rate),
                        last_movement: Set(last_movement),
                        version: Set(0),
                        updated_at: Set(now.into()),
                    }
                    .insert(&txn)
                    .await?;
                }
            }
            written += 1;
        }

        txn.commit().await?;
        tracing::info!(site_id = %site_id, balances = written, "rebuilt stock balances from ledger");
        Ok(written)
    }
}

/// Maps a balance row to the core domain balance.
pub(crate) fn balance_from_model(
    model: &stock_balances::Model,
) -> strata_core::stock::StockBalance {
    strata_core::stock::StockBalance {
        site_id: SiteId::from_uuid(model.site_id),
        item_id: ItemId::from_uuid(model.item_id),
        closing_stock: model.closing_stock,
        closing_value: model.closing_value,
        unit_rate: model.unit_rate,
        last_movement: model.last_movement.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_from_model() {
        let model = stock_balances::Model {
            id: Uuid::now_v7(),
            site_id: Uuid::now_v7(),
            item_id: Uuid::now_v7(),
            closing_stock: dec!(120),
            closing_value: dec!(1440.00),
            unit_rate: dec!(12),
            last_movement: "DAILY CONSUMPTION DC-0007".to_string(),
            version: 3,
            updated_at: Utc::now().into(),
        };
        let balance = balance_from_model(&model);

        assert_eq!(balance.site_id.into_inner(), model.site_id);
        assert_eq!(balance.item_id.into_inner(), model.item_id);
        assert_eq!(balance.closing_stock, dec!(120));
        assert_eq!(balance.closing_value, dec!(1440.00));
        assert_eq!(balance.unit_rate, dec!(12));
        assert!(balance.is_value_consistent());
    }
}
