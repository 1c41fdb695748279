// Database connection and initialization

use diesel::Connection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::AsyncMysqlConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::Rocket;
use rocket_db_pools::diesel::MysqlPool;
use rocket_db_pools::Database;

use crate::config::AppConfig;

/// Database connection pool for the election store
#[derive(Database)]
#[database("voting_db")]
pub struct VotingDB(MysqlPool);

// Embed migrations from the migrations directory
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run pending database migrations
pub async fn run_migrations(rocket: Rocket<rocket::Build>) -> Rocket<rocket::Build> {
    // MigrationHarness is synchronous, so run it in a blocking task over a
    // dedicated connection wrapped for sync use.
    let result: Result<Vec<String>, String> = rocket::tokio::task::spawn_blocking(move || {
        let database_url = AppConfig::load().database_url;

        let mut conn: AsyncConnectionWrapper<AsyncMysqlConnection> =
            AsyncConnectionWrapper::establish(&database_url)
                .map_err(|e| format!("Failed to establish connection: {}", e))?;

        let versions = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| format!("Failed to run migrations: {}", e))?
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<String>>();

        Ok(versions)
    })
    .await
    .expect("Migration task panicked");

    match result {
        Ok(versions) => {
            if versions.is_empty() {
                println!("✅ Database is up to date");
            } else {
                println!("✅ Applied {} migration(s):", versions.len());
                for version in versions {
                    println!("   - {}", version);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            panic!("Database migration failed");
        }
    }

    rocket
}
