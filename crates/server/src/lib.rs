pub mod error;
pub mod middleware;
pub mod routes;

use db::DBService;
use services::services::workflow::WorkflowService;

/// Shared handler state: the database handle plus the workflow engine
/// built on top of it.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    workflow: WorkflowService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let db = DBService::new().await?;
        Ok(Self::with_db(db))
    }

    pub fn with_db(db: DBService) -> Self {
        let workflow = WorkflowService::new(&db);
        Self { db, workflow }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn workflow(&self) -> &WorkflowService {
        &self.workflow
    }
}
