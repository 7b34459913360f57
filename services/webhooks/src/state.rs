use sea_orm::DatabaseConnection;

use crate::domain::policy::WebhookPolicy;
use crate::infra::db::{DbDeliveryRepository, DbEndpointRepository};
use crate::infra::http::HttpDeliveryTransport;
use crate::usecase::dispatch::DispatchUseCase;
use crate::usecase::retry::ProcessRetriesUseCase;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub transport: HttpDeliveryTransport,
    pub policy: WebhookPolicy,
}

impl AppState {
    pub fn endpoint_repo(&self) -> DbEndpointRepository {
        DbEndpointRepository {
            db: self.db.clone(),
        }
    }

    pub fn delivery_repo(&self) -> DbDeliveryRepository {
        DbDeliveryRepository {
            db: self.db.clone(),
        }
    }

    pub fn dispatcher(
        &self,
    ) -> DispatchUseCase<DbEndpointRepository, DbDeliveryRepository, HttpDeliveryTransport> {
        DispatchUseCase {
            endpoints: self.endpoint_repo(),
            deliveries: self.delivery_repo(),
            transport: self.transport.clone(),
            policy: self.policy,
        }
    }

    /// Shared by the HTTP trigger and the background sweep loop.
    pub fn retry_sweeper(
        &self,
    ) -> ProcessRetriesUseCase<DbEndpointRepository, DbDeliveryRepository, HttpDeliveryTransport>
    {
        ProcessRetriesUseCase {
            endpoints: self.endpoint_repo(),
            deliveries: self.delivery_repo(),
            transport: self.transport.clone(),
            policy: self.policy,
        }
    }
}
