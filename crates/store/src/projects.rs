//! Project registry: the flat list of campaign projects.
//!
//! Projects are bookkeeping around sessions, not part of the staleness
//! model; the registry is a plain JSON array rewritten atomically as a
//! whole, the same way the session file is.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use storyloom_core::types::{mint_id, now, Timestamp};
use storyloom_core::CoreError;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::file::write_atomic;

const PROJECTS_FILE: &str = "projects.json";

/// One campaign project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default = "now", with = "storyloom_core::types::ts")]
    pub created_at: Timestamp,
    #[serde(default = "now", with = "storyloom_core::types::ts")]
    pub updated_at: Timestamp,
}

/// Persistent list of projects.
pub struct ProjectStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ProjectStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            dir: config.data_dir.clone(),
            write_lock: Mutex::new(()),
        }
    }

    /// All projects, in stored order.
    pub async fn list(&self) -> Result<Vec<Project>, StoreError> {
        self.read_all().await
    }

    /// Look up one project.
    pub async fn get(&self, project_id: &str) -> Result<Project, StoreError> {
        self.read_all()
            .await?
            .into_iter()
            .find(|project| project.id == project_id)
            .ok_or_else(|| CoreError::not_found("project", project_id).into())
    }

    /// Create a project with a fresh id. The title must be non-empty.
    pub async fn create(&self, title: &str) -> Result<Project, StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::Validation(
                "title is required and must be a non-empty string".to_string(),
            )
            .into());
        }

        let _guard = self.write_lock.lock().await;
        let mut projects = self.read_all().await?;
        let created = now();
        let project = Project {
            id: mint_id("project"),
            title: title.to_string(),
            created_at: created,
            updated_at: created,
        };
        projects.push(project.clone());
        self.write_all(&projects).await?;
        info!(project_id = %project.id, title = %project.title, "project created");
        Ok(project)
    }

    /// Delete a project, returning the removed record.
    pub async fn delete(&self, project_id: &str) -> Result<Project, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut projects = self.read_all().await?;
        let position = projects
            .iter()
            .position(|project| project.id == project_id)
            .ok_or_else(|| CoreError::not_found("project", project_id))?;
        let removed = projects.remove(position);
        self.write_all(&projects).await?;
        info!(project_id = %removed.id, "project deleted");
        Ok(removed)
    }

    async fn read_all(&self) -> Result<Vec<Project>, StoreError> {
        match fs::read(self.dir.join(PROJECTS_FILE)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_all(&self, projects: &[Project]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(projects)?;
        write_atomic(&self.dir, PROJECTS_FILE, bytes).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
