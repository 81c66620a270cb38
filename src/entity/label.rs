//! Expected AI detection label entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "labels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub item_name_id: i64,
    pub label: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inspection_item_name::Entity",
        from = "Column::ItemNameId",
        to = "super::inspection_item_name::Column::Id"
    )]
    ItemName,
}

impl Related<super::inspection_item_name::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItemName.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
