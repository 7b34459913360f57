use anyhow::{Context as _, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    UpdateMany, sea_query::Expr,
};
use uuid::Uuid;

use rsvp_domain::pagination::{Page, PageRequest};
use rsvp_webhooks_schema::{webhook_deliveries, webhook_endpoints};

use crate::domain::repository::{DeliveryRepository, EndpointRepository};
use crate::domain::types::{
    AuthHeader, DeliveryStatus, DeliveryUpdate, FailureTracking, NotificationKind,
    WebhookDelivery, WebhookEndpoint,
};
use crate::error::WebhooksServiceError;

// ── Endpoint repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEndpointRepository {
    pub db: DatabaseConnection,
}

impl EndpointRepository for DbEndpointRepository {
    async fn find_by_event_id(
        &self,
        event_id: Uuid,
    ) -> Result<Option<WebhookEndpoint>, WebhooksServiceError> {
        let model = webhook_endpoints::Entity::find()
            .filter(webhook_endpoints::Column::EventId.eq(event_id))
            .one(&self.db)
            .await
            .context("find webhook endpoint by event id")?;
        Ok(model.map(endpoint_from_model))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEndpoint>, WebhooksServiceError> {
        let model = webhook_endpoints::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find webhook endpoint by id")?;
        Ok(model.map(endpoint_from_model))
    }

    async fn compare_and_set_failure_tracking(
        &self,
        id: Uuid,
        expected: &FailureTracking,
        next: &FailureTracking,
    ) -> Result<bool, WebhooksServiceError> {
        let mut query = webhook_endpoints::Entity::update_many()
            .col_expr(webhook_endpoints::Column::IsActive, Expr::value(next.is_active))
            .col_expr(
                webhook_endpoints::Column::ConsecutiveFailurePeriods,
                Expr::value(next.consecutive_failure_periods as i32),
            )
            .col_expr(
                webhook_endpoints::Column::LastFailureAt,
                Expr::value(next.last_failure_at),
            )
            .col_expr(webhook_endpoints::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(webhook_endpoints::Column::Id.eq(id))
            .filter(webhook_endpoints::Column::IsActive.eq(expected.is_active))
            .filter(
                webhook_endpoints::Column::ConsecutiveFailurePeriods
                    .eq(expected.consecutive_failure_periods as i32),
            );
        query = match expected.last_failure_at {
            Some(at) => query.filter(webhook_endpoints::Column::LastFailureAt.eq(at)),
            None => query.filter(webhook_endpoints::Column::LastFailureAt.is_null()),
        };
        let result = query
            .exec(&self.db)
            .await
            .context("compare-and-set endpoint failure tracking")?;
        Ok(result.rows_affected == 1)
    }

    async fn reset_failure_tracking(&self, id: Uuid) -> Result<(), WebhooksServiceError> {
        reset_endpoint(id)
            .exec(&self.db)
            .await
            .context("reset endpoint failure tracking")?;
        Ok(())
    }
}

/// Single-statement reset of the failure counter and window.
fn reset_endpoint(id: Uuid) -> UpdateMany<webhook_endpoints::Entity> {
    webhook_endpoints::Entity::update_many()
        .col_expr(
            webhook_endpoints::Column::ConsecutiveFailurePeriods,
            Expr::value(0),
        )
        .col_expr(
            webhook_endpoints::Column::LastFailureAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(webhook_endpoints::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(webhook_endpoints::Column::Id.eq(id))
}

fn endpoint_from_model(model: webhook_endpoints::Model) -> WebhookEndpoint {
    let auth_header =
        match AuthHeader::from_parts(model.auth_header_name, model.auth_header_value) {
            Ok(header) => header,
            Err(_) => {
                tracing::warn!(
                    webhook_id = %model.id,
                    "endpoint has a half-configured auth header, sending without it"
                );
                None
            }
        };
    WebhookEndpoint {
        id: model.id,
        event_id: model.event_id,
        url: model.url,
        auth_header,
        event_types: event_types_from_json(model.id, model.event_types),
        is_active: model.is_active,
        consecutive_failure_periods: model.consecutive_failure_periods.max(0) as u32,
        last_failure_at: model.last_failure_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn event_types_from_json(webhook_id: Uuid, value: serde_json::Value) -> Vec<NotificationKind> {
    let Some(items) = value.as_array() else {
        tracing::warn!(%webhook_id, "endpoint event_types is not a JSON array");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let kind = item.as_str().and_then(NotificationKind::parse);
            if kind.is_none() {
                tracing::debug!(%webhook_id, event_type = %item, "ignoring unknown event type");
            }
            kind
        })
        .collect()
}

// ── Delivery repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDeliveryRepository {
    pub db: DatabaseConnection,
}

impl DeliveryRepository for DbDeliveryRepository {
    async fn create(&self, delivery: &WebhookDelivery) -> Result<(), WebhooksServiceError> {
        webhook_deliveries::ActiveModel {
            id: Set(delivery.id),
            webhook_id: Set(delivery.webhook_id),
            event_type: Set(delivery.event_type.as_str().to_owned()),
            payload: Set(delivery.payload.clone()),
            status: Set(delivery.status.as_str().to_owned()),
            status_code: Set(delivery.status_code.map(i32::from)),
            response_body: Set(delivery.response_body.clone()),
            error_message: Set(delivery.error_message.clone()),
            retry_count: Set(delivery.retry_count as i32),
            next_retry_at: Set(delivery.next_retry_at),
            created_at: Set(delivery.created_at),
            updated_at: Set(delivery.updated_at),
        }
        .insert(&self.db)
        .await
        .context("create webhook delivery")?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookDelivery>, WebhooksServiceError> {
        let model = webhook_deliveries::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find webhook delivery by id")?;
        Ok(model.map(delivery_from_model).transpose()?)
    }

    async fn claim(
        &self,
        delivery: &WebhookDelivery,
        lease_until: DateTime<Utc>,
    ) -> Result<bool, WebhooksServiceError> {
        let mut query = webhook_deliveries::Entity::update_many()
            .col_expr(
                webhook_deliveries::Column::Status,
                Expr::value(DeliveryStatus::Pending.as_str()),
            )
            .col_expr(
                webhook_deliveries::Column::NextRetryAt,
                Expr::value(Some(lease_until)),
            )
            .col_expr(webhook_deliveries::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(webhook_deliveries::Column::Id.eq(delivery.id))
            .filter(webhook_deliveries::Column::Status.eq(delivery.status.as_str()))
            .filter(webhook_deliveries::Column::RetryCount.eq(delivery.retry_count as i32));
        query = match delivery.next_retry_at {
            Some(at) => query.filter(webhook_deliveries::Column::NextRetryAt.eq(at)),
            None => query.filter(webhook_deliveries::Column::NextRetryAt.is_null()),
        };
        let result = query
            .exec(&self.db)
            .await
            .context("claim webhook delivery")?;
        Ok(result.rows_affected == 1)
    }

    async fn update(
        &self,
        id: Uuid,
        claimed_retry_count: u32,
        update: &DeliveryUpdate,
    ) -> Result<bool, WebhooksServiceError> {
        let applied = record_attempt(id, claimed_retry_count, update)
            .exec(&self.db)
            .await
            .context("update webhook delivery")?
            .rows_affected
            == 1;
        Ok(applied)
    }

    async fn complete_with_endpoint_reset(
        &self,
        id: Uuid,
        claimed_retry_count: u32,
        update: &DeliveryUpdate,
        webhook_id: Uuid,
    ) -> Result<bool, WebhooksServiceError> {
        let completed = self
            .db
            .transaction::<_, bool, sea_orm::DbErr>(|txn| {
                let attempt = record_attempt(id, claimed_retry_count, update);
                Box::pin(async move {
                    if attempt.exec(txn).await?.rows_affected != 1 {
                        return Ok(false);
                    }
                    reset_endpoint(webhook_id).exec(txn).await?;
                    Ok(true)
                })
            })
            .await
            .context("complete webhook delivery and reset endpoint")?;
        Ok(completed)
    }

    async fn list_due(
        &self,
        now: DateTime<Utc>,
        max_retries: u32,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>, WebhooksServiceError> {
        let models = webhook_deliveries::Entity::find()
            .filter(webhook_deliveries::Column::Status.is_in([
                DeliveryStatus::Failed.as_str(),
                DeliveryStatus::Pending.as_str(),
            ]))
            .filter(webhook_deliveries::Column::RetryCount.lt(max_retries as i32))
            .filter(webhook_deliveries::Column::NextRetryAt.lte(now))
            .order_by_asc(webhook_deliveries::Column::NextRetryAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list due webhook deliveries")?;
        Ok(models
            .into_iter()
            .map(delivery_from_model)
            .collect::<anyhow::Result<_>>()?)
    }

    async fn list_terminal_failures(
        &self,
        webhook_id: Uuid,
        max_retries: u32,
        page: PageRequest,
    ) -> Result<Page<WebhookDelivery>, WebhooksServiceError> {
        let page = page.clamped();
        let query = webhook_deliveries::Entity::find()
            .filter(webhook_deliveries::Column::WebhookId.eq(webhook_id))
            .filter(webhook_deliveries::Column::Status.eq(DeliveryStatus::Failed.as_str()))
            .filter(webhook_deliveries::Column::RetryCount.gte(max_retries as i32));

        let total = query
            .clone()
            .count(&self.db)
            .await
            .context("count terminal webhook deliveries")?;
        let models = query
            .order_by_desc(webhook_deliveries::Column::CreatedAt)
            .order_by_desc(webhook_deliveries::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list terminal webhook deliveries")?;

        let items = models
            .into_iter()
            .map(delivery_from_model)
            .collect::<anyhow::Result<_>>()?;
        Ok(Page { items, total })
    }
}

/// Outcome write for a claimed attempt, conditioned on the claim still
/// holding.
fn record_attempt(
    id: Uuid,
    claimed_retry_count: u32,
    update: &DeliveryUpdate,
) -> UpdateMany<webhook_deliveries::Entity> {
    webhook_deliveries::Entity::update_many()
        .col_expr(
            webhook_deliveries::Column::Status,
            Expr::value(update.status.as_str()),
        )
        .col_expr(
            webhook_deliveries::Column::StatusCode,
            Expr::value(update.status_code.map(i32::from)),
        )
        .col_expr(
            webhook_deliveries::Column::ResponseBody,
            Expr::value(update.response_body.clone()),
        )
        .col_expr(
            webhook_deliveries::Column::ErrorMessage,
            Expr::value(update.error_message.clone()),
        )
        .col_expr(
            webhook_deliveries::Column::RetryCount,
            Expr::value(update.retry_count as i32),
        )
        .col_expr(
            webhook_deliveries::Column::NextRetryAt,
            Expr::value(update.next_retry_at),
        )
        .col_expr(webhook_deliveries::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(webhook_deliveries::Column::Id.eq(id))
        .filter(webhook_deliveries::Column::Status.eq(DeliveryStatus::Pending.as_str()))
        .filter(webhook_deliveries::Column::RetryCount.eq(claimed_retry_count as i32))
}

fn delivery_from_model(model: webhook_deliveries::Model) -> anyhow::Result<WebhookDelivery> {
    let event_type = NotificationKind::parse(&model.event_type)
        .ok_or_else(|| anyhow!("delivery {} has unknown event type {}", model.id, model.event_type))?;
    let status = DeliveryStatus::parse(&model.status)
        .ok_or_else(|| anyhow!("delivery {} has unknown status {}", model.id, model.status))?;
    Ok(WebhookDelivery {
        id: model.id,
        webhook_id: model.webhook_id,
        event_type,
        payload: model.payload,
        status,
        status_code: model.status_code.and_then(|code| u16::try_from(code).ok()),
        response_body: model.response_body,
        error_message: model.error_message,
        retry_count: model.retry_count.max(0) as u32,
        next_retry_at: model.next_retry_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}
