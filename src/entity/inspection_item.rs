//! Inspection item entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::models::Progress;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inspection_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub inspection_id: i64,
    /// NULL for items added on the device without a master entry
    pub item_name_id: Option<i64>,
    pub item_name: String,
    pub taken_dt: Option<DateTimeUtc>,
    /// "bucket/key" of the current image
    pub image_path: Option<String>,
    /// Verdict label: OK, NG or the analysis-failed label
    pub ai_result: Option<String>,
    pub ng_comment: Option<String>,
    pub detected_model: Option<String>,
    pub detected_serial_number: Option<String>,
    pub edited_model: Option<String>,
    pub edited_serial_number: Option<String>,
    pub progress: i16,
    /// Incremented by every update; updates are conditional on the previous value
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Decoded progress. Unknown codes read as the initial state.
    pub fn progress(&self) -> Progress {
        Progress::from_i16(self.progress).unwrap_or(Progress::INITIAL)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inspection::Entity",
        from = "Column::InspectionId",
        to = "super::inspection::Column::Id"
    )]
    Inspection,
    #[sea_orm(
        belongs_to = "super::inspection_item_name::Entity",
        from = "Column::ItemNameId",
        to = "super::inspection_item_name::Column::Id"
    )]
    ItemName,
}

impl Related<super::inspection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inspection.def()
    }
}

impl Related<super::inspection_item_name::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItemName.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
