use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::services::AuthService;

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Issue a session for a user and return the opaque token. Only the
    /// SHA-256 hash of the token is stored.
    pub async fn issue(pool: &SqlitePool, user_id: Uuid) -> Result<String, sqlx::Error> {
        let token = AuthService::generate_session_token();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(AuthService::hash_session_token(&token))
        .bind(now)
        .bind(now + Duration::days(30))
        .execute(pool)
        .await?;
        Ok(token)
    }

    /// Resolve a raw token to its session, ignoring expired rows.
    pub async fn find_by_token(
        pool: &SqlitePool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(AuthService::hash_session_token(token))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn revoke(pool: &SqlitePool, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(AuthService::hash_session_token(token))
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        test_utils::setup_test_pool,
        user::{CreateUser, Role, User},
    };

    #[tokio::test]
    async fn issue_find_revoke() {
        let pool = setup_test_pool().await;
        let user = User::create(
            &pool,
            &CreateUser {
                username: "bob".into(),
                password: "pw".into(),
                full_name: "Bob".into(),
                roles: vec![Role::Author],
            },
        )
        .await
        .unwrap();

        let token = Session::issue(&pool, user.id).await.unwrap();
        let session = Session::find_by_token(&pool, &token).await.unwrap().unwrap();
        assert_eq!(session.user_id, user.id);

        assert!(Session::find_by_token(&pool, "bogus").await.unwrap().is_none());

        Session::revoke(&pool, &token).await.unwrap();
        assert!(Session::find_by_token(&pool, &token).await.unwrap().is_none());
    }
}
