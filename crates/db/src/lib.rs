use std::str::FromStr;

use sqlx::{
    Error, Pool, Sqlite, SqlitePool,
    sqlite::SqliteConnectOptions,
};
use utils::assets::asset_dir;

pub mod models;
pub mod services;

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    pub async fn new() -> Result<DBService, Error> {
        let database_url = match std::env::var("CONFMGR_DB_PATH") {
            Ok(path) => format!("sqlite://{}", path),
            Err(_) => format!(
                "sqlite://{}",
                asset_dir().join("db.sqlite").to_string_lossy()
            ),
        };
        Self::new_with_url(&database_url).await
    }

    /// Open a database at an explicit URL and run migrations. Tests point
    /// this at a throwaway file for isolation.
    pub async fn new_with_url(database_url: &str) -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("database ready at {}", database_url);
        Ok(DBService { pool })
    }
}
