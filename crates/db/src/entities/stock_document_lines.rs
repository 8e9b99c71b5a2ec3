//! `SeaORM` Entity for the stock_document_lines table.
//!
//! The submitted detail lines, stored verbatim for audit. Costing reads the
//! ledger rows, not these.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_document_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub document_id: Uuid,
    pub item_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub received_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub issued_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub amount: Decimal,
    pub remark: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_documents::Entity",
        from = "Column::DocumentId",
        to = "super::stock_documents::Column::Id"
    )]
    Document,
    #[sea_orm(
        belongs_to = "super::items::Entity",
        from = "Column::ItemId",
        to = "super::items::Column::Id"
    )]
    Item,
}

impl Related<super::stock_documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
