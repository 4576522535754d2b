//! Source entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team's selection of containers inside an installation to be indexed
///
/// Unique by `(team_id, name)`. An empty `selected_containers` list means
/// "all reachable containers".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub provider_type: String,
    /// Provider-specific settings, opaque to the core
    pub config: serde_json::Value,
    pub installation_id: String,
    pub selected_containers: Vec<String>,
    pub enabled: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Containers a sync fans out over
    ///
    /// The empty string stands for the provider's default container when
    /// nothing was selected explicitly.
    pub fn containers(&self) -> Vec<String> {
        if self.selected_containers.is_empty() {
            vec![String::new()]
        } else {
            self.selected_containers.clone()
        }
    }
}
