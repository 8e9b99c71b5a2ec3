//! Movement submission: the transaction coordinator.
//!
//! Every submitted movement is validated and planned in `strata-core`, then
//! committed as one database transaction spanning the document header, its
//! detail lines, the ledger appends, and the balance upserts. A failure at
//! any point aborts the whole movement; nothing is partially written.
//!
//! Lost updates on the balance read-modify-write are prevented by the
//! optimistic `version` column: the balances are read before planning, and
//! every update asserts the version it read. A failed assertion surfaces as
//! [`MovementError::ConcurrentModification`]; the engine does not retry —
//! callers resubmit the movement in full.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use strata_core::stock::{
    BalanceUpdate, CostedPosition, DailyConsumptionInput, InwardReceiptInput, MovementPlan,
    OpeningStockInput, OutwardTransferInput, StockAdjustmentInput, StockLedgerError,
    StockLedgerService,
};
use strata_shared::types::{ItemId, SiteId, StockEntryId};

use crate::entities::{items, sites, stock_balances, stock_document_lines, stock_documents, stock_entries};

/// Error types for movement submission.
#[derive(Debug, thiserror::Error)]
pub enum MovementError {
    /// Movement failed validation or planning.
    #[error(transparent)]
    Ledger(#[from] StockLedgerError),

    /// Site not found.
    #[error("Site not found: {0}")]
    SiteNotFound(Uuid),

    /// Item not found.
    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    /// Conflicting concurrent balance update.
    #[error("Concurrent balance update for site {site_id}, item {item_id}, please retry")]
    ConcurrentModification {
        /// The site of the contested balance row.
        site_id: Uuid,
        /// The item of the contested balance row.
        item_id: Uuid,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl MovementError {
    /// Returns the stable machine-readable code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(err) => err.error_code(),
            Self::SiteNotFound(_) => "SITE_NOT_FOUND",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if resubmitting the movement may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

/// A balance row as read before planning.
#[derive(Debug, Clone, Copy)]
struct LoadedBalance {
    row_id: Uuid,
    version: i64,
    position: CostedPosition,
}

/// A committed movement.
#[derive(Debug, Clone)]
pub struct PostedMovement {
    /// The created document header.
    pub document: stock_documents::Model,
    /// The appended ledger rows, in commit order.
    pub entries: Vec<stock_entries::Model>,
}

/// The transaction coordinator for stock movements.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    db: DatabaseConnection,
}

impl MovementRepository {
    /// Creates a new movement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Submits a Daily Consumption movement.
    pub async fn submit_daily_consumption(
        &self,
        input: DailyConsumptionInput,
    ) -> Result<PostedMovement, MovementError> {
        self.ensure_site(input.site_id).await?;
        self.ensure_items(input.lines.iter().map(|line| line.item_id))
            .await?;

        let loaded = self
            .load_balances(&[input.site_id], input.lines.iter().map(|line| line.item_id))
            .await?;
        let plan = StockLedgerService::plan_daily_consumption(&input, balance_lookup(&loaded))?;
        self.commit_plan(plan, &loaded).await
    }

    /// Submits an Opening Stock movement.
    pub async fn submit_opening_stock(
        &self,
        input: OpeningStockInput,
    ) -> Result<PostedMovement, MovementError> {
        self.ensure_site(input.site_id).await?;
        self.ensure_items(input.lines.iter().map(|line| line.item_id))
            .await?;

        // The bootstrap probe runs once, before any line is processed.
        let site_has_history = self.site_has_ledger_history(input.site_id).await?;
        let loaded = self
            .load_balances(&[input.site_id], input.lines.iter().map(|line| line.item_id))
            .await?;
        let plan = StockLedgerService::plan_opening_stock(
            &input,
            site_has_history,
            balance_lookup(&loaded),
        )?;
        self.commit_plan(plan, &loaded).await
    }

    /// Submits an Inward Receipt movement.
    pub async fn submit_inward_receipt(
        &self,
        input: InwardReceiptInput,
    ) -> Result<PostedMovement, MovementError> {
        self.ensure_site(input.site_id).await?;
        self.ensure_items(input.lines.iter().map(|line| line.item_id))
            .await?;

        let site_has_history = self.site_has_ledger_history(input.site_id).await?;
        let loaded = self
            .load_balances(&[input.site_id], input.lines.iter().map(|line| line.item_id))
            .await?;
        let plan = StockLedgerService::plan_inward_receipt(
            &input,
            site_has_history,
            balance_lookup(&loaded),
        )?;
        self.commit_plan(plan, &loaded).await
    }

    /// Submits a Stock Adjustment movement.
    pub async fn submit_stock_adjustment(
        &self,
        input: StockAdjustmentInput,
    ) -> Result<PostedMovement, MovementError> {
        self.ensure_site(input.site_id).await?;
        self.ensure_items(input.lines.iter().map(|line| line.item_id))
            .await?;

        let site_has_history = self.site_has_ledger_history(input.site_id).await?;
        let loaded = self
            .load_balances(&[input.site_id], input.lines.iter().map(|line| line.item_id))
            .await?;
        let plan = StockLedgerService::plan_stock_adjustment(
            &input,
            site_has_history,
            balance_lookup(&loaded),
        )?;
        self.commit_plan(plan, &loaded).await
    }

    /// Submits an Outward Transfer movement.
    ///
    /// The one movement touching two sites: the issue at the source and the
    /// receive at the destination commit in the same transaction, so either
    /// both balances move or neither does.
    pub async fn submit_outward_transfer(
        &self,
        input: OutwardTransferInput,
    ) -> Result<PostedMovement, MovementError> {
        self.ensure_site(input.source_site_id).await?;
        self.ensure_site(input.dest_site_id).await?;
        self.ensure_items(input.lines.iter().map(|line| line.item_id))
            .await?;

        let dest_site_has_history = self.site_has_ledger_history(input.dest_site_id).await?;
        let loaded = self
            .load_balances(
                &[input.source_site_id, input.dest_site_id],
                input.lines.iter().map(|line| line.item_id),
            )
            .await?;
        let plan = StockLedgerService::plan_outward_transfer(
            &input,
            dest_site_has_history,
            balance_lookup(&loaded),
        )?;
        self.commit_plan(plan, &loaded).await
    }

    /// The bootstrap probe: does this site have any ledger rows at all?
    pub async fn site_has_ledger_history(
        &self,
        site_id: SiteId,
    ) -> Result<bool, MovementError> {
        let row = stock_entries::Entity::find()
            .filter(stock_entries::Column::SiteId.eq(site_id.into_inner()))
            .one(&self.db)
            .await?;
        Ok(row.is_some())
    }

    /// Fails with a referential error if the site does not exist.
    async fn ensure_site(&self, site_id: SiteId) -> Result<(), MovementError> {
        let site = sites::Entity::find_by_id(site_id.into_inner())
            .one(&self.db)
            .await?;
        if site.is_none() {
            return Err(MovementError::SiteNotFound(site_id.into_inner()));
        }
        Ok(())
    }

    /// Fails with a referential error if any item does not exist.
    async fn ensure_items<I>(&self, item_ids: I) -> Result<(), MovementError>
    where
        I: Iterator<Item = ItemId>,
    {
        let mut unique: Vec<Uuid> = item_ids.map(ItemId::into_inner).collect();
        unique.sort_unstable();
        unique.dedup();
        if unique.is_empty() {
            // The planner rejects empty movements; nothing to resolve here.
            return Ok(());
        }

        let found: HashSet<Uuid> = items::Entity::find()
            .filter(items::Column::Id.is_in(unique.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();

        for id in unique {
            if !found.contains(&id) {
                return Err(MovementError::ItemNotFound(id));
            }
        }
        Ok(())
    }

    /// Reads the balance rows a movement may touch, with their versions.
    async fn load_balances<I>(
        &self,
        site_ids: &[SiteId],
        item_ids: I,
    ) -> Result<HashMap<(SiteId, ItemId), LoadedBalance>, MovementError>
    where
        I: Iterator<Item = ItemId>,
    {
        let sites: Vec<Uuid> = site_ids.iter().copied().map(SiteId::into_inner).collect();
        let items: Vec<Uuid> = item_ids.map(ItemId::into_inner).collect();
        if items.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = stock_balances::Entity::find()
            .filter(stock_balances::Column::SiteId.is_in(sites))
            .filter(stock_balances::Column::ItemId.is_in(items))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    (SiteId::from_uuid(row.site_id), ItemId::from_uuid(row.item_id)),
                    LoadedBalance {
                        row_id: row.id,
                        version: row.version,
                        position: CostedPosition {
                            closing_stock: row.closing_stock,
                            closing_value: row.closing_value,
                            unit_rate: row.unit_rate,
                        },
                    },
                )
            })
            .collect())
    }

    /// Commits a plan: document header + lines + ledger rows + balances,
    /// all-or-nothing.
    async fn commit_plan(
        &self,
        plan: MovementPlan,
        loaded: &HashMap<(SiteId, ItemId), LoadedBalance>,
    ) -> Result<PostedMovement, MovementError> {
        let txn = self.db.begin().await?;
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        let document = stock_documents::ActiveModel {
            id: Set(plan.document.id.into_inner()),
            document_code: Set(plan.document.document_code.clone()),
            document_type: Set(plan.document.document_type.to_string()),
            site_id: Set(plan.document.site_id.into_inner()),
            dest_site_id: Set(plan.document.dest_site_id.map(SiteId::into_inner)),
            entry_date: Set(plan.document.entry_date),
            total_amount: Set(plan.document.total_amount),
            remarks: Set(plan.document.remarks.clone()),
            created_by: Set(plan.document.created_by.into_inner()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for line in &plan.lines {
            stock_document_lines::ActiveModel {
                id: Set(Uuid::now_v7()),
                document_id: Set(document.id),
                item_id: Set(line.item_id.into_inner()),
                received_qty: Set(line.received_qty),
                issued_qty: Set(line.issued_qty),
                rate: Set(line.rate),
                amount: Set(line.amount),
                remark: Set(line.remark.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        let mut entries = Vec::with_capacity(plan.entries.len());
        for planned in &plan.entries {
            // posting_seq stays unset; the database sequence assigns it.
            let inserted = stock_entries::ActiveModel {
                id: Set(StockEntryId::new().into_inner()),
                site_id: Set(planned.site_id.into_inner()),
                item_id: Set(planned.item_id.into_inner()),
                entry_date: Set(planned.entry_date),
                document_type: Set(planned.document_type.to_string()),
                document_id: Set(document.id),
                received_qty: Set(planned.received_qty),
                issued_qty: Set(planned.issued_qty),
                unit_rate: Set(planned.unit_rate),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            entries.push(inserted);
        }

        for update in &plan.balances {
            apply_balance_update(&txn, update, loaded, now).await?;
        }

        txn.commit().await?;

        tracing::info!(
            document_code = %document.document_code,
            document_type = %document.document_type,
            entries = entries.len(),
            "stock movement committed"
        );

        Ok(PostedMovement { document, entries })
    }
}

/// Balance lookup over the pre-read rows, for the core planners.
fn balance_lookup(
    loaded: &HashMap<(SiteId, ItemId), LoadedBalance>,
) -> impl Fn(SiteId, ItemId) -> Option<CostedPosition> + '_ {
    |site_id, item_id| {
        loaded
            .get(&(site_id, item_id))
            .map(|balance| balance.position)
    }
}

/// Upserts one balance row, asserting the version read before planning.
async fn apply_balance_update(
    txn: &DatabaseTransaction,
    update: &BalanceUpdate,
    loaded: &HashMap<(SiteId, ItemId), LoadedBalance>,
    now: sea_orm::prelude::DateTimeWithTimeZone,
) -> Result<(), MovementError> {
    match loaded.get(&(update.site_id, update.item_id)) {
        Some(existing) => {
            let result = stock_balances::Entity::update_many()
                .col_expr(
                    stock_balances::Column::ClosingStock,
                    Expr::value(update.closing_stock),
                )
                .col_expr(
                    stock_balances::Column::ClosingValue,
                    Expr::value(update.closing_value),
                )
                .col_expr(stock_balances::Column::UnitRate, Expr::value(update.unit_rate))
                .col_expr(
                    stock_balances::Column::LastMovement,
                    Expr::value(update.last_movement.clone()),
                )
                .col_expr(
                    stock_balances::Column::Version,
                    Expr::value(existing.version + 1),
                )
                .col_expr(stock_balances::Column::UpdatedAt, Expr::value(now))
                .filter(stock_balances::Column::Id.eq(existing.row_id))
                .filter(stock_balances::Column::Version.eq(existing.version))
                .exec(txn)
                .await?;

            // Zero rows means another movement updated the balance between
            // our read and this write; abort so the caller resubmits.
            if result.rows_affected == 0 {
                return Err(MovementError::ConcurrentModification {
                    site_id: update.site_id.into_inner(),
                    item_id: update.item_id.into_inner(),
                });
            }
        }
        None => {
            stock_balances::ActiveModel {
                id: Set(Uuid::now_v7()),
                site_id: Set(update.site_id.into_inner()),
                item_id: Set(update.item_id.into_inner()),
                closing_stock: Set(update.closing_stock),
                closing_value: Set(update.closing_value),
                unit_rate: Set(update.unit_rate),
                last_movement: Set(update.last_movement.clone()),
                version: Set(0),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MovementError::SiteNotFound(Uuid::nil()).error_code(),
            "SITE_NOT_FOUND"
        );
        assert_eq!(
            MovementError::Ledger(StockLedgerError::EmptyMovement).error_code(),
            "EMPTY_MOVEMENT"
        );
        assert_eq!(
            MovementError::ConcurrentModification {
                site_id: Uuid::nil(),
                item_id: Uuid::nil(),
            }
            .error_code(),
            "CONCURRENT_MODIFICATION"
        );
    }

    #[test]
    fn test_only_concurrency_errors_are_retryable() {
        assert!(
            MovementError::ConcurrentModification {
                site_id: Uuid::nil(),
                item_id: Uuid::nil(),
            }
            .is_retryable()
        );
        assert!(!MovementError::SiteNotFound(Uuid::nil()).is_retryable());
        assert!(!MovementError::Ledger(StockLedgerError::EmptyMovement).is_retryable());
    }
}
