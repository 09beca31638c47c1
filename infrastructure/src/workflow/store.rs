//! File-backed workflow catalog
//!
//! One definition per `*.toml` or `*.json` file in a directory. Files that
//! fail to parse or validate are skipped with a warning so one broken
//! definition does not hide the others.

use super::definition::WorkflowDefinition;
use async_trait::async_trait;
use chatflow_application::{WorkflowCatalog, WorkflowError, WorkflowSummary};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct FileWorkflowStore {
    dir: PathBuf,
}

impl FileWorkflowStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All valid definitions, ordered by file name. A missing directory
    /// holds no workflows.
    pub async fn load_all(&self) -> Result<Vec<WorkflowDefinition>, WorkflowError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "Workflow directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(WorkflowError::Storage(format!("{}: {}", self.dir.display(), e))),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WorkflowError::Storage(e.to_string()))?
        {
            let path = entry.path();
            if matches!(path.extension().and_then(|e| e.to_str()), Some("toml" | "json")) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut definitions = Vec::new();
        let mut ids = HashSet::new();
        for path in paths {
            match Self::load_file(&path).await {
                Ok(definition) => {
                    if !ids.insert(definition.id.clone()) {
                        warn!(
                            path = %path.display(),
                            id = %definition.id,
                            "Duplicate workflow id, skipping"
                        );
                        continue;
                    }
                    definitions.push(definition);
                }
                Err(e) => warn!(path = %path.display(), "Skipping workflow: {}", e),
            }
        }
        Ok(definitions)
    }

    /// Definition with the given id
    pub async fn get(&self, id: &str) -> Result<WorkflowDefinition, WorkflowError> {
        self.load_all()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }

    async fn load_file(path: &Path) -> Result<WorkflowDefinition, WorkflowError> {
        let invalid = |message: String| WorkflowError::InvalidDefinition {
            id: path.display().to_string(),
            message,
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| WorkflowError::Storage(format!("{}: {}", path.display(), e)))?;

        let definition: WorkflowDefinition = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            _ => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
        };

        definition.validate().map_err(|message| WorkflowError::InvalidDefinition {
            id: definition.id.clone(),
            message,
        })?;
        Ok(definition)
    }
}

#[async_trait]
impl WorkflowCatalog for FileWorkflowStore {
    async fn list(&self) -> Result<Vec<WorkflowSummary>, WorkflowError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .map(|d| WorkflowSummary {
                id: d.id,
                name: d.name,
                description: d.description,
                input_schema: d.input_schema,
            })
            .collect())
    }
}
