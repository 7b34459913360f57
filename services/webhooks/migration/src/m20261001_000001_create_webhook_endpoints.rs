use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WebhookEndpoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WebhookEndpoints::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WebhookEndpoints::EventId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(WebhookEndpoints::Url).string().not_null())
                    .col(ColumnDef::new(WebhookEndpoints::AuthHeaderName).string())
                    .col(ColumnDef::new(WebhookEndpoints::AuthHeaderValue).string())
                    .col(
                        ColumnDef::new(WebhookEndpoints::EventTypes)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WebhookEndpoints::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(WebhookEndpoints::ConsecutiveFailurePeriods)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(WebhookEndpoints::LastFailureAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(WebhookEndpoints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WebhookEndpoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // Auth header name and value are set together or not at all.
                    .check(
                        Expr::expr(Expr::col(WebhookEndpoints::AuthHeaderName).is_null())
                            .eq(Expr::col(WebhookEndpoints::AuthHeaderValue).is_null()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WebhookEndpoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WebhookEndpoints {
    Table,
    Id,
    EventId,
    Url,
    AuthHeaderName,
    AuthHeaderValue,
    EventTypes,
    IsActive,
    ConsecutiveFailurePeriods,
    LastFailureAt,
    CreatedAt,
    UpdatedAt,
}
