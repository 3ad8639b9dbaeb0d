use crate::error::{FamilyResult, LayoutWarning};
use crate::graph::RelationStore;
use crate::types::{Person, RelationEdge};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// People and relations exported from the archive database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilySnapshot {
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub relations: Vec<RelationEdge>,
}

impl FamilySnapshot {
    /// Load a snapshot from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading family snapshot from: {:?}", path);

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read family snapshot from {:?}", path))?;

        let snapshot = Self::from_json(&content)
            .with_context(|| format!("Failed to parse family snapshot {:?}", path))?;

        info!(
            "Successfully loaded snapshot with {} people and {} relations",
            snapshot.persons.len(),
            snapshot.relations.len()
        );
        Ok(snapshot)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: FamilySnapshot = serde_json::from_str(content)?;
        Ok(snapshot)
    }

    /// Strict store: any dangling relation is an error
    pub fn into_store(self) -> FamilyResult<RelationStore> {
        RelationStore::build(self.persons, self.relations)
    }

    /// Lenient store: dangling relations are skipped and reported
    pub fn into_partial_store(self) -> FamilyResult<(RelationStore, Vec<LayoutWarning>)> {
        RelationStore::build_partial(self.persons, self.relations)
    }
}
