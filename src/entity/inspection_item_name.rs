//! Inspection item master entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::models::{AnalysisType, ItemMaster};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inspection_item_names")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub inspection_name_id: i64,
    pub item_name: String,
    /// 1 OCR, 2 AI, 3 none
    pub analysis_type: i16,
    pub api_url: Option<String>,
    pub master_image: Option<String>,
    pub auth_token: Option<String>,
    pub shoot_type: Option<i16>,
}

impl From<Model> for ItemMaster {
    fn from(m: Model) -> Self {
        ItemMaster {
            item_name_id: m.id,
            inspection_name_id: m.inspection_name_id,
            item_name: m.item_name,
            analysis_type: AnalysisType::from_i16(m.analysis_type),
            api_url: m.api_url,
            master_image: m.master_image,
            auth_token: m.auth_token,
            shoot_type: m.shoot_type,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::label::Entity")]
    Labels,
}

impl Related<super::label::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Labels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
