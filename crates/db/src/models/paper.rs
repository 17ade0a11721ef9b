use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PaperError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Paper not found")]
    NotFound,
    #[error("Paper with this title already exists")]
    DuplicateTitle,
    #[error("Paper was modified concurrently, reload and retry")]
    VersionConflict,
    #[error("Maximum number of reviewers already assigned")]
    CapacityExceeded,
    #[error("Reviewer is already assigned to this paper")]
    ReviewerAlreadyAssigned,
}

/// Paper lifecycle state. WITHDRAWN is not represented here: withdrawal
/// deletes the row.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaperState {
    Created,
    Submitted,
    Reviewed,
    Rejected,
    Approved,
    Accepted,
    FinalSubmitted,
}

impl std::fmt::Display for PaperState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaperState::Created => write!(f, "CREATED"),
            PaperState::Submitted => write!(f, "SUBMITTED"),
            PaperState::Reviewed => write!(f, "REVIEWED"),
            PaperState::Rejected => write!(f, "REJECTED"),
            PaperState::Approved => write!(f, "APPROVED"),
            PaperState::Accepted => write!(f, "ACCEPTED"),
            PaperState::FinalSubmitted => write!(f, "FINAL_SUBMITTED"),
        }
    }
}

impl std::str::FromStr for PaperState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(PaperState::Created),
            "SUBMITTED" => Ok(PaperState::Submitted),
            "REVIEWED" => Ok(PaperState::Reviewed),
            "REJECTED" => Ok(PaperState::Rejected),
            "APPROVED" => Ok(PaperState::Approved),
            "ACCEPTED" => Ok(PaperState::Accepted),
            "FINAL_SUBMITTED" => Ok(PaperState::FinalSubmitted),
            _ => Err(format!("Invalid paper state: {}", s)),
        }
    }
}

/// Accepted document formats for paper content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "application/x-latex")]
    Latex,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Pdf => write!(f, "application/pdf"),
            ContentType::Latex => write!(f, "application/x-latex"),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application/pdf" => Ok(ContentType::Pdf),
            "application/x-latex" => Ok(ContentType::Latex),
            _ => Err(format!("Unsupported content type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Paper {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub title: String,
    #[sqlx(rename = "abstract")]
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(skip_serializing)]
    pub content: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub addressing_comments: Option<String>,
    pub state: PaperState,
    pub version: i64,
    pub authors: String,    // JSON array of usernames
    pub co_authors: String, // JSON array of usernames
    pub reviewers: String,  // JSON array of assigned reviewer names
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaper {
    pub conference_id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub content: Option<Vec<u8>>,
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub co_authors: Vec<String>,
}

/// One appended review entry: a reviewer identity paired with a score and/or
/// a comment. Append-only, no dedup per reviewer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaperReview {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub reviewer: String,
    pub score: Option<i64>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Paper {
    pub fn authors_parsed(&self) -> Vec<String> {
        serde_json::from_str(&self.authors).unwrap_or_default()
    }

    pub fn co_authors_parsed(&self) -> Vec<String> {
        serde_json::from_str(&self.co_authors).unwrap_or_default()
    }

    pub fn reviewers_parsed(&self) -> Vec<String> {
        serde_json::from_str(&self.reviewers).unwrap_or_default()
    }

    pub async fn create(pool: &SqlitePool, data: &CreatePaper) -> Result<Self, PaperError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let authors = serde_json::to_string(&data.authors).expect("string list serializes");
        let co_authors = serde_json::to_string(&data.co_authors).expect("string list serializes");

        sqlx::query_as::<_, Paper>(
            r#"
            INSERT INTO papers (
                id, conference_id, title, abstract, content, content_type,
                state, version, authors, co_authors, reviewers, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'CREATED', 0, ?, ?, '[]', ?, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.conference_id)
        .bind(&data.title)
        .bind(&data.abstract_text)
        .bind(&data.content)
        .bind(data.content_type.map(|ct| ct.to_string()))
        .bind(&authors)
        .bind(&co_authors)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => PaperError::DuplicateTitle,
            _ => PaperError::Database(e),
        })
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Paper>("SELECT * FROM papers WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_conference(
        pool: &SqlitePool,
        conference_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Paper>(
            "SELECT * FROM papers WHERE conference_id = ? ORDER BY title ASC",
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await
    }

    /// Papers visible without authentication: approved or better.
    pub async fn find_published(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Paper>(
            r#"
            SELECT * FROM papers
            WHERE state IN ('APPROVED', 'FINAL_SUBMITTED', 'ACCEPTED')
            ORDER BY title ASC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Papers where the given username appears as author or co-author.
    pub async fn find_by_author(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let needle = serde_json::to_string(username).expect("string serializes");
        sqlx::query_as::<_, Paper>(
            r#"
            SELECT * FROM papers
            WHERE authors LIKE '%' || ?1 || '%' OR co_authors LIKE '%' || ?1 || '%'
            ORDER BY title ASC
            "#,
        )
        .bind(needle)
        .fetch_all(pool)
        .await
    }

    /// Papers assigned to the given reviewer. The reviewers column is a JSON
    /// list of usernames, so the needle is matched in its encoded form.
    pub async fn find_by_reviewer(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let needle = serde_json::to_string(username).expect("string serializes");
        sqlx::query_as::<_, Paper>(
            r#"
            SELECT * FROM papers
            WHERE reviewers LIKE '%' || ?1 || '%'
            ORDER BY title ASC
            "#,
        )
        .bind(needle)
        .fetch_all(pool)
        .await
    }

    /// Case-insensitive substring search over title and abstract.
    pub async fn search(
        pool: &SqlitePool,
        title: Option<&str>,
        abstract_text: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Paper>(
            r#"
            SELECT * FROM papers
            WHERE (?1 IS NULL OR title LIKE '%' || ?1 || '%' COLLATE NOCASE)
              AND (?2 IS NULL OR abstract LIKE '%' || ?2 || '%' COLLATE NOCASE)
            ORDER BY title ASC
            "#,
        )
        .bind(title)
        .bind(abstract_text)
        .fetch_all(pool)
        .await
    }

    /// Store submitted content and move to SUBMITTED, version-checked.
    pub async fn record_submission(
        pool: &SqlitePool,
        id: Uuid,
        content: &[u8],
        content_type: ContentType,
        expected_version: i64,
    ) -> Result<(), PaperError> {
        let result = sqlx::query(
            r#"
            UPDATE papers
            SET content = ?, content_type = ?, state = 'SUBMITTED',
                version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(content)
        .bind(content_type.to_string())
        .bind(Utc::now())
        .bind(id)
        .bind(expected_version)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PaperError::VersionConflict);
        }
        Ok(())
    }

    /// Store the camera-ready content plus the note describing how reviewer
    /// comments were addressed, and move to FINAL_SUBMITTED.
    pub async fn record_final_submission(
        pool: &SqlitePool,
        id: Uuid,
        content: &[u8],
        content_type: ContentType,
        addressing_comments: &str,
        expected_version: i64,
    ) -> Result<(), PaperError> {
        let result = sqlx::query(
            r#"
            UPDATE papers
            SET content = ?, content_type = ?, addressing_comments = ?,
                state = 'FINAL_SUBMITTED', version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(content)
        .bind(content_type.to_string())
        .bind(addressing_comments)
        .bind(Utc::now())
        .bind(id)
        .bind(expected_version)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PaperError::VersionConflict);
        }
        Ok(())
    }

    /// Version-checked state write for decision operations.
    pub async fn set_state(
        pool: &SqlitePool,
        id: Uuid,
        state: PaperState,
        expected_version: i64,
    ) -> Result<(), PaperError> {
        let result = sqlx::query(
            r#"
            UPDATE papers
            SET state = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(state)
        .bind(Utc::now())
        .bind(id)
        .bind(expected_version)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PaperError::VersionConflict);
        }
        Ok(())
    }

    /// Replace the assigned-reviewer list, version-checked. Cap enforcement
    /// happens in the workflow layer before this write.
    pub async fn update_reviewers(
        pool: &SqlitePool,
        id: Uuid,
        reviewers: &[String],
        expected_version: i64,
    ) -> Result<(), PaperError> {
        let reviewers_json = serde_json::to_string(reviewers).expect("string list serializes");
        let result = sqlx::query(
            r#"
            UPDATE papers
            SET reviewers = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&reviewers_json)
        .bind(Utc::now())
        .bind(id)
        .bind(expected_version)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PaperError::VersionConflict);
        }
        Ok(())
    }

    pub async fn update_co_authors(
        pool: &SqlitePool,
        id: Uuid,
        co_authors: &[String],
        expected_version: i64,
    ) -> Result<(), PaperError> {
        let co_authors_json = serde_json::to_string(co_authors).expect("string list serializes");
        let result = sqlx::query(
            r#"
            UPDATE papers
            SET co_authors = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&co_authors_json)
        .bind(Utc::now())
        .bind(id)
        .bind(expected_version)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PaperError::VersionConflict);
        }
        Ok(())
    }

    /// Withdrawal: destructive removal of the paper and its reviews.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM papers WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn append_review(
        pool: &SqlitePool,
        paper_id: Uuid,
        reviewer: &str,
        score: Option<i64>,
        comment: Option<&str>,
    ) -> Result<PaperReview, sqlx::Error> {
        sqlx::query_as::<_, PaperReview>(
            r#"
            INSERT INTO paper_reviews (id, paper_id, reviewer, score, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(paper_id)
        .bind(reviewer)
        .bind(score)
        .bind(comment)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn reviews(
        pool: &SqlitePool,
        paper_id: Uuid,
    ) -> Result<Vec<PaperReview>, sqlx::Error> {
        sqlx::query_as::<_, PaperReview>(
            "SELECT * FROM paper_reviews WHERE paper_id = ? ORDER BY created_at ASC",
        )
        .bind(paper_id)
        .fetch_all(pool)
        .await
    }

    /// Batch disposition pass for conference finalization, run inside the
    /// caller's transaction: camera-ready papers are accepted, approved
    /// papers that never reached final submission forfeit acceptance, and
    /// everything else keeps its state.
    pub async fn finalize_dispositions(
        conn: &mut SqliteConnection,
        conference_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE papers
            SET state = 'ACCEPTED', version = version + 1, updated_at = ?
            WHERE conference_id = ? AND state = 'FINAL_SUBMITTED'
            "#,
        )
        .bind(now)
        .bind(conference_id)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            UPDATE papers
            SET state = 'REJECTED', version = version + 1, updated_at = ?
            WHERE conference_id = ? AND state = 'APPROVED'
            "#,
        )
        .bind(now)
        .bind(conference_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// A paper holding content must carry a content type and vice versa.
    pub fn content_fields_consistent(content: &Option<Vec<u8>>, content_type: &Option<ContentType>) -> bool {
        content.is_some() == content_type.is_some()
    }
}
