//! Installation and provider-config stores
//!
//! Credentials never sit in a row as plaintext: secrets are sealed
//! through the SecretBox on every write and opened again only when a
//! full entity is materialised for the core.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use quarry_domain::entities::{
    Installation, InstallationSecrets, InstallationSummary, ProviderConfig, ProviderSecrets,
};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{InstallationStore, ProviderConfigStore, SealedSecret, SecretBox};

/// Installation row with its secrets sealed
struct SealedInstallation {
    row: Installation,
    sealed_secrets: SealedSecret,
}

/// Installation store sealing secrets at rest
pub struct InMemoryInstallationStore {
    installations: DashMap<String, SealedInstallation>,
    secret_box: Arc<dyn SecretBox>,
}

impl InMemoryInstallationStore {
    pub fn new(secret_box: Arc<dyn SecretBox>) -> Self {
        Self {
            installations: DashMap::new(),
            secret_box,
        }
    }

    fn seal(&self, secrets: &InstallationSecrets) -> Result<SealedSecret> {
        let plaintext = serde_json::to_vec(secrets)?;
        self.secret_box.seal(&plaintext)
    }

    fn open(&self, entry: &SealedInstallation) -> Result<Installation> {
        let plaintext = self.secret_box.open(&entry.sealed_secrets)?;
        let secrets: InstallationSecrets = serde_json::from_slice(&plaintext)
            .map_err(|_| Error::internal("sealed secret failed authentication"))?;
        let mut installation = entry.row.clone();
        installation.secrets = secrets;
        Ok(installation)
    }
}

#[async_trait]
impl InstallationStore for InMemoryInstallationStore {
    async fn save(&self, installation: &Installation) -> Result<()> {
        let conflict = self.installations.iter().any(|e| {
            e.row.provider_type == installation.provider_type
                && e.row.account_id == installation.account_id
                && e.row.id != installation.id
        });
        if conflict {
            return Err(Error::already_exists(format!(
                "installation {}/{}",
                installation.provider_type, installation.account_id
            )));
        }

        let sealed_secrets = self.seal(&installation.secrets)?;
        let mut row = installation.clone();
        row.secrets = InstallationSecrets::default();
        self.installations.insert(
            row.id.clone(),
            SealedInstallation {
                row,
                sealed_secrets,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Installation> {
        let entry = self
            .installations
            .get(id)
            .ok_or_else(|| Error::not_found(format!("installation {}", id)))?;
        self.open(&entry)
    }

    async fn get_by_account_id(&self, provider: &str, account_id: &str) -> Result<Installation> {
        let id = self
            .installations
            .iter()
            .find(|e| e.row.provider_type == provider && e.row.account_id == account_id)
            .map(|e| e.row.id.clone())
            .ok_or_else(|| {
                Error::not_found(format!("installation {}/{}", provider, account_id))
            })?;
        self.get(&id).await
    }

    async fn get_by_provider(&self, provider: &str) -> Result<Vec<Installation>> {
        let ids: Vec<String> = self
            .installations
            .iter()
            .filter(|e| e.row.provider_type == provider)
            .map(|e| e.row.id.clone())
            .collect();
        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            result.push(self.get(&id).await?);
        }
        Ok(result)
    }

    async fn list(&self) -> Result<Vec<InstallationSummary>> {
        // Summaries come straight from the sealed rows; no decryption
        Ok(self
            .installations
            .iter()
            .map(|e| e.row.summary())
            .collect())
    }

    async fn update_secrets(
        &self,
        id: &str,
        secrets: &InstallationSecrets,
        oauth_expiry: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let sealed_secrets = self.seal(secrets)?;
        let mut entry = self
            .installations
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("installation {}", id)))?;
        entry.sealed_secrets = sealed_secrets;
        entry.row.oauth_expiry = oauth_expiry;
        Ok(())
    }

    async fn update_last_used(&self, id: &str) -> Result<()> {
        let mut entry = self
            .installations
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("installation {}", id)))?;
        entry.row.last_used_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.installations
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("installation {}", id)))
    }
}

/// Provider-config row with app credentials sealed
struct SealedProviderConfig {
    row: ProviderConfig,
    sealed_secrets: SealedSecret,
}

/// Provider config store sealing the OAuth app credentials
pub struct InMemoryProviderConfigStore {
    configs: DashMap<String, SealedProviderConfig>,
    secret_box: Arc<dyn SecretBox>,
}

impl InMemoryProviderConfigStore {
    pub fn new(secret_box: Arc<dyn SecretBox>) -> Self {
        Self {
            configs: DashMap::new(),
            secret_box,
        }
    }

    fn open(&self, entry: &SealedProviderConfig) -> Result<ProviderConfig> {
        let plaintext = self.secret_box.open(&entry.sealed_secrets)?;
        let secrets: ProviderSecrets = serde_json::from_slice(&plaintext)
            .map_err(|_| Error::internal("sealed secret failed authentication"))?;
        let mut config = entry.row.clone();
        config.secrets = secrets;
        Ok(config)
    }
}

#[async_trait]
impl ProviderConfigStore for InMemoryProviderConfigStore {
    async fn save(&self, config: &ProviderConfig) -> Result<()> {
        let plaintext = serde_json::to_vec(&config.secrets)?;
        let sealed_secrets = self.secret_box.seal(&plaintext)?;
        let mut row = config.clone();
        row.secrets = ProviderSecrets::default();
        self.configs.insert(
            row.provider_type.clone(),
            SealedProviderConfig {
                row,
                sealed_secrets,
            },
        );
        Ok(())
    }

    async fn get(&self, provider_type: &str) -> Result<ProviderConfig> {
        let entry = self
            .configs
            .get(provider_type)
            .ok_or_else(|| Error::not_found(format!("provider config {}", provider_type)))?;
        self.open(&entry)
    }

    async fn list(&self) -> Result<Vec<ProviderConfig>> {
        let keys: Vec<String> = self.configs.iter().map(|e| e.row.provider_type.clone()).collect();
        let mut result = Vec::with_capacity(keys.len());
        for key in keys {
            result.push(self.get(&key).await?);
        }
        Ok(result)
    }

    async fn delete(&self, provider_type: &str) -> Result<()> {
        self.configs
            .remove(provider_type)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("provider config {}", provider_type)))
    }
}
