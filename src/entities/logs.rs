use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A stored log record. Serialized as-is in API responses, so field names
/// follow the column names.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub level: String,
    pub message: String,
    pub resource_id: Option<String>,
    pub timestamp: DateTimeUtc,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub commit: Option<String>,
    pub metadata: Option<Json>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
