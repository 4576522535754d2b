//! Engine deployer port

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A deployable application package: services definition plus schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationPackage {
    pub services_xml: String,
    pub schema: String,
}

/// Result of a deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployOutcome {
    pub schema_version: u32,
    pub cluster_info: Option<serde_json::Value>,
}

/// Deploys schema changes to the external engine
#[async_trait]
pub trait VespaDeployer: Send + Sync {
    /// Fetch the schema of the currently deployed package, if any
    async fn current_schema(&self) -> Result<Option<String>>;

    /// Deploy a package, replacing the active one
    async fn deploy(&self, package: &ApplicationPackage) -> Result<DeployOutcome>;

    async fn health_check(&self) -> Result<()>;
}
