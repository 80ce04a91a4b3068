use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    // A single connection keeps the in-memory database alive and shared
    // across the whole test.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}
