//! Settings, engine-config and schedule stores

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use quarry_domain::entities::{AiSettings, ScheduledTask, Settings, VespaConfig};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{
    ScheduleStore, SealedSecret, SecretBox, SettingsStore, VespaConfigStore,
};

/// AI settings row with API keys sealed out of band
struct SealedAiSettings {
    settings: AiSettings,
    embedding_key: Option<SealedSecret>,
    llm_key: Option<SealedSecret>,
}

/// Settings store; AI provider keys go through the SecretBox
pub struct InMemorySettingsStore {
    settings: DashMap<String, Settings>,
    ai: DashMap<String, SealedAiSettings>,
    secret_box: Arc<dyn SecretBox>,
}

impl InMemorySettingsStore {
    pub fn new(secret_box: Arc<dyn SecretBox>) -> Self {
        Self {
            settings: DashMap::new(),
            ai: DashMap::new(),
            secret_box,
        }
    }

    fn seal_key(&self, key: &Option<String>) -> Result<Option<SealedSecret>> {
        match key {
            Some(key) => Ok(Some(self.secret_box.seal(key.as_bytes())?)),
            None => Ok(None),
        }
    }

    fn open_key(&self, sealed: &Option<SealedSecret>) -> Result<Option<String>> {
        match sealed {
            Some(sealed) => {
                let plaintext = self.secret_box.open(sealed)?;
                String::from_utf8(plaintext)
                    .map(Some)
                    .map_err(|_| Error::internal("sealed secret failed authentication"))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn save(&self, settings: &Settings) -> Result<()> {
        self.settings
            .insert(settings.team_id.clone(), settings.clone());
        Ok(())
    }

    async fn get(&self, team_id: &str) -> Result<Settings> {
        Ok(self
            .settings
            .get(team_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| Settings::for_team(team_id)))
    }

    async fn save_ai(&self, team_id: &str, ai: &AiSettings) -> Result<()> {
        let embedding_key =
            self.seal_key(&ai.embedding.as_ref().and_then(|c| c.api_key.clone()))?;
        let llm_key = self.seal_key(&ai.llm.as_ref().and_then(|c| c.api_key.clone()))?;

        let mut stored = ai.clone();
        if let Some(embedding) = stored.embedding.as_mut() {
            embedding.api_key = None;
        }
        if let Some(llm) = stored.llm.as_mut() {
            llm.api_key = None;
        }
        self.ai.insert(
            team_id.to_string(),
            SealedAiSettings {
                settings: stored,
                embedding_key,
                llm_key,
            },
        );
        Ok(())
    }

    async fn get_ai(&self, team_id: &str) -> Result<AiSettings> {
        let entry = match self.ai.get(team_id) {
            Some(entry) => entry,
            None => return Ok(AiSettings::default()),
        };
        let mut settings = entry.settings.clone();
        if let Some(embedding) = settings.embedding.as_mut() {
            embedding.api_key = self.open_key(&entry.embedding_key)?;
        }
        if let Some(llm) = settings.llm.as_mut() {
            llm.api_key = self.open_key(&entry.llm_key)?;
        }
        Ok(settings)
    }
}

/// Singleton engine configuration row
#[derive(Default)]
pub struct InMemoryVespaConfigStore {
    config: Mutex<Option<VespaConfig>>,
}

impl InMemoryVespaConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VespaConfigStore for InMemoryVespaConfigStore {
    async fn save(&self, config: &VespaConfig) -> Result<()> {
        *self.config.lock().await = Some(config.clone());
        Ok(())
    }

    async fn get(&self) -> Result<VespaConfig> {
        Ok(self.config.lock().await.clone().unwrap_or_default())
    }
}

/// Recurring schedule rows
#[derive(Default)]
pub struct InMemoryScheduleStore {
    schedules: DashMap<String, ScheduledTask>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn save(&self, task: &ScheduledTask) -> Result<()> {
        self.schedules.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<ScheduledTask> {
        self.schedules
            .get(id)
            .map(|t| t.clone())
            .ok_or_else(|| Error::not_found(format!("schedule {}", id)))
    }

    async fn list(&self) -> Result<Vec<ScheduledTask>> {
        Ok(self.schedules.iter().map(|t| t.clone()).collect())
    }

    async fn update_next_run(
        &self,
        id: &str,
        last_run: DateTime<Utc>,
        next_run: DateTime<Utc>,
    ) -> Result<()> {
        let mut task = self
            .schedules
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("schedule {}", id)))?;
        task.last_run = Some(last_run);
        task.next_run = next_run;
        Ok(())
    }
}
