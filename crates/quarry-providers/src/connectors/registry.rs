//! Connector registry and factory
//!
//! Builders form a closed set registered at startup; adding a provider
//! is a code change, never a dynamic load. The factory resolves a
//! source's installation, wires a token provider over its credentials
//! and asks the builder for a container-scoped connector.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use quarry_domain::entities::Source;
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{
    Connector, ConnectorBuilder, ConnectorFactory, InstallationStore, OAuthExchanger,
    ProviderConfigStore, TokenProvider,
};

use crate::connectors::token::OAuthTokenProvider;

/// Startup-registered builder set
#[derive(Default)]
pub struct ConnectorRegistry {
    builders: HashMap<String, Arc<dyn ConnectorBuilder>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder; last registration for a type wins
    pub fn register(&mut self, builder: Arc<dyn ConnectorBuilder>) {
        debug!(provider = builder.provider_type(), "connector builder registered");
        self.builders
            .insert(builder.provider_type().to_string(), builder);
    }

    pub fn get(&self, provider_type: &str) -> Option<Arc<dyn ConnectorBuilder>> {
        self.builders.get(provider_type).cloned()
    }

    pub fn provider_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.builders.keys().cloned().collect();
        types.sort();
        types
    }
}

/// Factory resolving sources through the registry
pub struct RegistryConnectorFactory {
    registry: Arc<ConnectorRegistry>,
    installations: Arc<dyn InstallationStore>,
    configs: Arc<dyn ProviderConfigStore>,
    exchanger: Arc<dyn OAuthExchanger>,
    /// One refresh gate per installation, shared across connectors
    refresh_gates: DashMap<String, Arc<Mutex<()>>>,
}

impl RegistryConnectorFactory {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        installations: Arc<dyn InstallationStore>,
        configs: Arc<dyn ProviderConfigStore>,
        exchanger: Arc<dyn OAuthExchanger>,
    ) -> Self {
        Self {
            registry,
            installations,
            configs,
            exchanger,
            refresh_gates: DashMap::new(),
        }
    }

    fn gate_for(&self, installation_id: &str) -> Arc<Mutex<()>> {
        self.refresh_gates
            .entry(installation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn token_provider(&self, installation_id: &str) -> Arc<OAuthTokenProvider> {
        Arc::new(OAuthTokenProvider::new(
            installation_id,
            self.installations.clone(),
            self.configs.clone(),
            self.exchanger.clone(),
            self.gate_for(installation_id),
        ))
    }

    async fn build(
        &self,
        provider_type: &str,
        installation_id: &str,
        container_id: &str,
    ) -> Result<Arc<dyn Connector>> {
        let builder = self
            .registry
            .get(provider_type)
            .ok_or_else(|| Error::connector_not_found(provider_type))?;
        // Resolve the installation up front so a dangling reference
        // fails here, not on first use.
        let installation = self.installations.get(installation_id).await?;
        if installation.provider_type != provider_type {
            return Err(Error::invalid_input(format!(
                "installation {} belongs to provider {}",
                installation_id, installation.provider_type
            )));
        }
        builder.build(self.token_provider(installation_id), container_id)
    }
}

#[async_trait]
impl ConnectorFactory for RegistryConnectorFactory {
    async fn create(&self, source: &Source, container_id: &str) -> Result<Arc<dyn Connector>> {
        let connector = self
            .build(&source.provider_type, &source.installation_id, container_id)
            .await?;
        connector.validate_config(source)?;
        self.installations
            .update_last_used(&source.installation_id)
            .await?;
        Ok(connector)
    }

    async fn create_for_installation(
        &self,
        installation_id: &str,
        container_id: &str,
    ) -> Result<Arc<dyn Connector>> {
        let installation = self.installations.get(installation_id).await?;
        self.build(&installation.provider_type, installation_id, container_id)
            .await
    }

    async fn force_refresh(&self, installation_id: &str) -> Result<()> {
        self.token_provider(installation_id)
            .force_refresh()
            .await
            .map(|_| ())
    }
}
