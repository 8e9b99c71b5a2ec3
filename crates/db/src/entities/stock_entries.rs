//! `SeaORM` Entity for the stock_entries table — the ledger.
//!
//! Append-only: no UPDATE or DELETE is ever issued against this table.
//! `posting_seq` is a database sequence that totally orders commits; replay
//! reads entries in `posting_seq` order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub posting_seq: i64,
    pub site_id: Uuid,
    pub item_id: Uuid,
    pub entry_date: Date,
    pub document_type: String,
    pub document_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))", nullable)]
    pub received_qty: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))", nullable)]
    pub issued_qty: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub unit_rate: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sites::Entity",
        from = "Column::SiteId",
        to = "super::sites::Column::Id"
    )]
    Site,
    #[sea_orm(
        belongs_to = "super::items::Entity",
        from = "Column::ItemId",
        to = "super::items::Column::Id"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::stock_documents::Entity",
        from = "Column::DocumentId",
        to = "super::stock_documents::Column::Id"
    )]
    Document,
}

impl Related<super::sites::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::stock_documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
