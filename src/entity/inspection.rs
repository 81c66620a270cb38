//! Inspection entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inspections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub inspection_name_id: i64,
    pub worksheet_code: String,
    pub receipt_confirmation_date: i32,
    /// YYYYMMDD
    pub inspection_date: i32,
    pub status: i16,
    pub evidence_id: Option<i16>,
    pub company_code: String,
    /// Image linkage exports so far, saturating at 9
    pub send_count: i16,
    pub is_send: bool,
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inspection_name::Entity",
        from = "Column::InspectionNameId",
        to = "super::inspection_name::Column::Id"
    )]
    InspectionName,
    #[sea_orm(has_many = "super::inspection_item::Entity")]
    Items,
}

impl Related<super::inspection_name::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InspectionName.def()
    }
}

impl Related<super::inspection_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
