//! `SeaORM` Entity for the stock_balances table — the derived cache.
//!
//! One row per (site, item) pair, unique-indexed. `version` is the
//! optimistic concurrency column: every upsert asserts the version it read.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub site_id: Uuid,
    pub item_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub closing_stock: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub closing_value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub unit_rate: Decimal,
    pub last_movement: String,
    pub version: i64,
    pub updated_at: DateTimeWithTimeZone,
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

impl ActiveModelBehavior for ActiveModel {}
