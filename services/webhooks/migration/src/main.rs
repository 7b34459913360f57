use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(rsvp_webhooks_migration::Migrator).await;
}
