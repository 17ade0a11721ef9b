use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConferenceError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Conference not found")]
    NotFound,
    #[error("A conference with this name already exists")]
    DuplicateName,
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: ConferenceState,
        to: ConferenceState,
    },
    #[error("Conference can only be deleted in the CREATED state, current state is {0}")]
    NotDeletable(ConferenceState),
    #[error("Conference was modified concurrently, reload and retry")]
    VersionConflict,
}

/// Conference lifecycle phase. Phases only ever advance one step at a time
/// along the declared order; FINAL is terminal.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConferenceState {
    Created,
    Submission,
    Assignment,
    Review,
    Decision,
    FinalSubmission,
    Final,
}

impl ConferenceState {
    /// The unique next phase, or None from the terminal phase.
    pub fn successor(self) -> Option<ConferenceState> {
        match self {
            ConferenceState::Created => Some(ConferenceState::Submission),
            ConferenceState::Submission => Some(ConferenceState::Assignment),
            ConferenceState::Assignment => Some(ConferenceState::Review),
            ConferenceState::Review => Some(ConferenceState::Decision),
            ConferenceState::Decision => Some(ConferenceState::FinalSubmission),
            ConferenceState::FinalSubmission => Some(ConferenceState::Final),
            ConferenceState::Final => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successor().is_none()
    }

    /// Strict one-step advance check. Skips, regressions and self-loops are
    /// all invalid, even when intermediate phases have no remaining work.
    pub fn validate_transition(self, target: ConferenceState) -> Result<(), ConferenceError> {
        if self.successor() == Some(target) {
            Ok(())
        } else {
            Err(ConferenceError::InvalidTransition {
                from: self,
                to: target,
            })
        }
    }
}

impl std::fmt::Display for ConferenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConferenceState::Created => write!(f, "CREATED"),
            ConferenceState::Submission => write!(f, "SUBMISSION"),
            ConferenceState::Assignment => write!(f, "ASSIGNMENT"),
            ConferenceState::Review => write!(f, "REVIEW"),
            ConferenceState::Decision => write!(f, "DECISION"),
            ConferenceState::FinalSubmission => write!(f, "FINAL_SUBMISSION"),
            ConferenceState::Final => write!(f, "FINAL"),
        }
    }
}

impl std::str::FromStr for ConferenceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(ConferenceState::Created),
            "SUBMISSION" => Ok(ConferenceState::Submission),
            "ASSIGNMENT" => Ok(ConferenceState::Assignment),
            "REVIEW" => Ok(ConferenceState::Review),
            "DECISION" => Ok(ConferenceState::Decision),
            "FINAL_SUBMISSION" => Ok(ConferenceState::FinalSubmission),
            "FINAL" => Ok(ConferenceState::Final),
            _ => Err(format!("Invalid conference state: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Conference {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub state: ConferenceState,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConference {
    pub name: String,
    pub description: String,
    pub chair_ids: Vec<Uuid>,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

impl Conference {
    /// Create a conference with its chair and committee membership in one
    /// transaction. Role validation of the ids happens in the workflow layer.
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateConference,
    ) -> Result<Self, ConferenceError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let conference = sqlx::query_as::<_, Conference>(
            r#"
            INSERT INTO conferences (id, name, description, state, version, created_at, updated_at)
            VALUES (?, ?, ?, 'CREATED', 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ConferenceError::DuplicateName
            }
            _ => ConferenceError::Database(e),
        })?;

        for user_id in &data.chair_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO conference_chairs (conference_id, user_id) VALUES (?, ?)",
            )
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        for user_id in &data.member_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO conference_members (conference_id, user_id) VALUES (?, ?)",
            )
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(conference)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conference>("SELECT * FROM conferences WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conference>("SELECT * FROM conferences ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    /// Case-insensitive substring search over name and description.
    pub async fn search(
        pool: &SqlitePool,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conference>(
            r#"
            SELECT * FROM conferences
            WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%' COLLATE NOCASE)
              AND (?2 IS NULL OR description LIKE '%' || ?2 || '%' COLLATE NOCASE)
            ORDER BY name ASC
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_all(pool)
        .await
    }

    /// Conferences that have reached the terminal phase, for the public
    /// proceedings listing.
    pub async fn find_final(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conference>(
            "SELECT * FROM conferences WHERE state = 'FINAL' ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Write a new phase with an optimistic version check. Zero rows affected
    /// after a successful load means a concurrent writer got there first.
    pub async fn advance_state(
        conn: &mut SqliteConnection,
        id: Uuid,
        new_state: ConferenceState,
        expected_version: i64,
    ) -> Result<(), ConferenceError> {
        let result = sqlx::query(
            r#"
            UPDATE conferences
            SET state = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(new_state)
        .bind(Utc::now())
        .bind(id)
        .bind(expected_version)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ConferenceError::VersionConflict);
        }
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM conferences WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn chair_ids(pool: &SqlitePool, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM conference_chairs WHERE conference_id = ?")
                .bind(id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(u,)| u).collect())
    }

    pub async fn member_ids(pool: &SqlitePool, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM conference_members WHERE conference_id = ?")
                .bind(id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(u,)| u).collect())
    }

    pub async fn add_chairs(
        pool: &SqlitePool,
        id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        for user_id in user_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO conference_chairs (conference_id, user_id) VALUES (?, ?)",
            )
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    pub async fn add_members(
        pool: &SqlitePool,
        id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        for user_id in user_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO conference_members (conference_id, user_id) VALUES (?, ?)",
            )
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        }
        Ok(())
    }
}
