//! JSON file rule persistence
//!
//! The whole rule set lives in one document:
//!
//! ```json
//! {
//!   "version": 3,
//!   "rules": [ { "id": "...", "priority": 1, "condition": { "type": "threshold", ... } } ]
//! }
//! ```
//!
//! Saves write a sibling temp file and rename it over the target, so a
//! crash mid-write leaves the previous document intact. A missing file
//! loads as an empty rule set at version 0.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use core_kernel::{DomainPort, PortError};

use crate::ports::RulePersistence;
use crate::store::RuleSet;

/// Stores the rule set as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileRulePersistence {
    path: PathBuf,
}

impl JsonFileRulePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "rules.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DomainPort for JsonFileRulePersistence {}

#[async_trait]
impl RulePersistence for JsonFileRulePersistence {
    async fn load(&self) -> Result<RuleSet, PortError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Rule file absent, starting empty");
                return Ok(RuleSet::default());
            }
            Err(e) => return Err(PortError::io(&self.path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            PortError::transformation(format!(
                "invalid rule file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn save(&self, rules: &RuleSet) -> Result<(), PortError> {
        let body = serde_json::to_vec_pretty(rules)
            .map_err(|e| PortError::transformation(format!("cannot encode rules: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::io(parent, e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &body)
            .await
            .map_err(|e| PortError::io(&temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| PortError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            version = rules.version(),
            rules = rules.len(),
            "Saved rule file"
        );
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "json_file"
    }
}
