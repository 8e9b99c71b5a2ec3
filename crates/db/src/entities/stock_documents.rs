//! `SeaORM` Entity for the stock_documents table.
//!
//! One header per submitted movement. `dest_site_id` is populated for
//! Outward Transfer documents only.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub document_code: String,
    pub document_type: String,
    pub site_id: Uuid,
    pub dest_site_id: Option<Uuid>,
    pub entry_date: Date,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub total_amount: Decimal,
    pub remarks: Option<String>,
    pub created_by: Uuid,
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
    #[sea_orm(has_many = "super::stock_document_lines::Entity")]
    Lines,
    #[sea_orm(has_many = "super::stock_entries::Entity")]
    StockEntries,
}

impl Related<super::stock_document_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::stock_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
