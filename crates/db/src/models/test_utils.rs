use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use super::conference::{Conference, CreateConference};

pub(crate) async fn setup_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:?cache=shared")
        .expect("invalid sqlite config")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to open sqlite memory db");

    // Same DDL the migrations apply; IF NOT EXISTS makes concurrent test
    // setup on the shared-cache database safe.
    sqlx::raw_sql(include_str!("../../migrations/20250301000000_init.sql"))
        .execute(&pool)
        .await
        .expect("schema bootstrap failed");

    pool
}

pub(crate) async fn seed_conference(pool: &SqlitePool, name: &str) -> Conference {
    Conference::create(
        pool,
        &CreateConference {
            name: name.to_string(),
            description: format!("{} test conference", name),
            chair_ids: vec![],
            member_ids: vec![],
        },
    )
    .await
    .expect("failed to seed conference")
}
