use sea_orm::entity::prelude::*;

/// Webhook target configured for one event (at most one per event).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "webhook_endpoints")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub event_id: Uuid,
    pub url: String,
    /// Set together with `auth_header_value`, or both null.
    pub auth_header_name: Option<String>,
    pub auth_header_value: Option<String>,
    /// JSON array of subscribed notification kinds, e.g. `["registration_confirmed"]`.
    pub event_types: Json,
    pub is_active: bool,
    pub consecutive_failure_periods: i32,
    /// Start of the current failure observation window; null while healthy.
    pub last_failure_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::webhook_deliveries::Entity")]
    WebhookDeliveries,
}

impl Related<super::webhook_deliveries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WebhookDeliveries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
