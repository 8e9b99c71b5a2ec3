//! Stock ledger queries.
//!
//! The ledger is append-only; this repository only reads. Entries are always
//! returned in `posting_seq` order — the commit order replay depends on.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use strata_core::stock::{DocumentType, StockEntry};
use strata_shared::types::{ItemId, SiteId, StockDocumentId, StockEntryId};

use crate::entities::stock_entries;

/// Read access to the stock ledger.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the full ledger of a site in commit order.
    pub async fn entries_for_site(&self, site_id: SiteId) -> Result<Vec<StockEntry>, DbErr> {
        load_site_entries(&self.db, site_id.into_inner()).await
    }

    /// Returns one pair's ledger history in commit order (the audit view).
    pub async fn entries_for_pair(
        &self,
        site_id: SiteId,
        item_id: ItemId,
    ) -> Result<Vec<StockEntry>, DbErr> {
        let models = stock_entries::Entity::find()
            .filter(stock_entries::Column::SiteId.eq(site_id.into_inner()))
            .filter(stock_entries::Column::ItemId.eq(item_id.into_inner()))
            .order_by_asc(stock_entries::Column::PostingSeq)
            .all(&self.db)
            .await?;
        models.iter().map(entry_from_model).collect()
    }
}

/// Loads a site's full ledger in commit order over any connection, so the
/// rebuild path can read inside its own transaction.
pub(crate) async fn load_site_entries<C: ConnectionTrait>(
    conn: &C,
    site_id: Uuid,
) -> Result<Vec<StockEntry>, DbErr> {
    let models = stock_entries::Entity::find()
        .filter(stock_entries::Column::SiteId.eq(site_id))
        .order_by_asc(stock_entries::Column::PostingSeq)
        .all(conn)
        .await?;
    models.iter().map(entry_from_model).collect()
}

/// Maps a ledger row to the core domain entry.
pub(crate) fn entry_from_model(model: &stock_entries::Model) -> Result<StockEntry, DbErr> {
    let document_type = model
        .document_type
        .parse::<DocumentType>()
        .map_err(DbErr::Type)?;

    Ok(StockEntry {
        id: StockEntryId::from_uuid(model.id),
        site_id: SiteId::from_uuid(model.site_id),
        item_id: ItemId::from_uuid(model.item_id),
        entry_date: model.entry_date,
        document_type,
        document_id: StockDocumentId::from_uuid(model.document_id),
        received_qty: model.received_qty,
        issued_qty: model.issued_qty,
        unit_rate: model.unit_rate,
    })
}
