use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::services::AuthService;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("User not found")]
    NotFound,
    #[error("Username already taken")]
    DuplicateUsername,
    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

/// Roles a principal can hold. A user may carry several at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Author,
    PcMember,
    PcChair,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Author => write!(f, "AUTHOR"),
            Role::PcMember => write!(f, "PC_MEMBER"),
            Role::PcChair => write!(f, "PC_CHAIR"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTHOR" => Ok(Role::Author),
            "PC_MEMBER" => Ok(Role::PcMember),
            "PC_CHAIR" => Ok(Role::PcChair),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub roles: String, // JSON array of Role
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    /// Parse the roles column from JSON
    pub fn roles_parsed(&self) -> Vec<Role> {
        serde_json::from_str(&self.roles).unwrap_or_default()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles_parsed().contains(&role)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Load a batch of users by id. The result may be shorter than `ids` when
    /// some do not exist; callers compare lengths to detect that.
    pub async fn find_by_ids(pool: &SqlitePool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!("SELECT * FROM users WHERE id IN ({})", placeholders);
        let mut q = sqlx::query_as::<_, User>(&query);
        for id in ids {
            q = q.bind(id);
        }
        q.fetch_all(pool).await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateUser) -> Result<Self, UserError> {
        let id = Uuid::new_v4();
        let password_hash = AuthService::hash_password(&data.password)?;
        let roles_json =
            serde_json::to_string(&data.roles).expect("role list always serializes");
        let now = Utc::now();

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, password_hash, full_name, roles, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.username)
        .bind(&password_hash)
        .bind(&data.full_name)
        .bind(&roles_json)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => UserError::DuplicateUsername,
            _ => UserError::Database(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::setup_test_pool;

    #[test]
    fn role_round_trips_through_display() {
        for role in [Role::Author, Role::PcMember, Role::PcChair] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("REVIEWER".parse::<Role>().is_err());
    }

    #[tokio::test]
    async fn create_parses_roles_and_rejects_duplicates() {
        let pool = setup_test_pool().await;
        let data = CreateUser {
            username: "alice".into(),
            password: "s3cret".into(),
            full_name: "Alice Doe".into(),
            roles: vec![Role::Author, Role::PcChair],
        };

        let user = User::create(&pool, &data).await.unwrap();
        assert_eq!(user.roles_parsed(), vec![Role::Author, Role::PcChair]);
        assert!(user.has_role(Role::PcChair));
        assert!(!user.has_role(Role::PcMember));

        let err = User::create(&pool, &data).await.unwrap_err();
        assert!(matches!(err, UserError::DuplicateUsername));
    }
}
