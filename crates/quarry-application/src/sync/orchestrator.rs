//! Sync orchestrator
//!
//! Runs the per-source pipeline: acquire the source lock, fetch changes
//! from the connector, normalise and chunk, embed when available, then
//! persist in document -> chunk -> engine order and advance the cursor.
//! A poison document is skipped and counted; transient trouble fails the
//! run and lets the task queue re-drive it with backoff.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunking::Chunker;
use crate::normalise::NormaliserRegistry;
use crate::runtime::{AiHandles, RuntimeCapabilities};
use quarry_domain::constants::{
    CONNECTOR_FETCH_TIMEOUT, EMBED_BATCH_RETRIES, EMBED_BATCH_SIZE, EMBED_BATCH_TIMEOUT,
    EMBED_RETRY_BASE, INDEX_BATCH_TIMEOUT, SYNC_LOCK_EXTEND_EVERY, SYNC_LOCK_TTL,
};
use quarry_domain::entities::{AuthContext, Chunk, Document, Source, SyncState, SyncStatus};
use quarry_domain::error::{Error, ErrorKind, Result};
use quarry_domain::ids::new_id;
use quarry_domain::ports::{
    ChunkStore, Connector, ConnectorFactory, DistributedLock, DocumentStore, SearchEngine,
    SettingsStore, SourceStore, SyncStateStore,
};
use quarry_domain::value_objects::{Change, CursorMap, DocumentMeta, SyncResult, SyncStats};

/// Outcome of one container pass
enum ContainerOutcome {
    Finished { next_cursor: String },
    Cancelled,
}

pub struct SyncOrchestrator {
    sources: Arc<dyn SourceStore>,
    sync_states: Arc<dyn SyncStateStore>,
    documents: Arc<dyn DocumentStore>,
    chunks: Arc<dyn ChunkStore>,
    engine: Arc<dyn SearchEngine>,
    factory: Arc<dyn ConnectorFactory>,
    lock: Arc<dyn DistributedLock>,
    settings: Arc<dyn SettingsStore>,
    registry: Arc<NormaliserRegistry>,
    chunker: Chunker,
    capabilities: Arc<RuntimeCapabilities>,
    ai: Arc<AiHandles>,
    /// Cancel flags of currently running syncs, keyed by source id
    active: DashMap<String, CancellationToken>,
}

impl SyncOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: Arc<dyn SourceStore>,
        sync_states: Arc<dyn SyncStateStore>,
        documents: Arc<dyn DocumentStore>,
        chunks: Arc<dyn ChunkStore>,
        engine: Arc<dyn SearchEngine>,
        factory: Arc<dyn ConnectorFactory>,
        lock: Arc<dyn DistributedLock>,
        settings: Arc<dyn SettingsStore>,
        registry: Arc<NormaliserRegistry>,
        chunker: Chunker,
        capabilities: Arc<RuntimeCapabilities>,
        ai: Arc<AiHandles>,
    ) -> Self {
        Self {
            sources,
            sync_states,
            documents,
            chunks,
            engine,
            factory,
            lock,
            settings,
            registry,
            chunker,
            capabilities,
            ai,
            active: DashMap::new(),
        }
    }

    /// Sync one source end to end
    ///
    /// Returns `SyncInProgress` when another worker holds the source
    /// lock. A cancelled run reports a failed result rather than an
    /// error, so the task that carried it is not redelivered.
    pub async fn sync_source(&self, source_id: &str) -> Result<SyncResult> {
        let lock_name = format!("sync:{}", source_id);
        let lease = self
            .lock
            .acquire(&lock_name, SYNC_LOCK_TTL)
            .await?
            .ok_or_else(|| Error::sync_in_progress(source_id))?;

        // Keep the lock alive while the pipeline runs
        let extender = {
            let lock = self.lock.clone();
            let lease = lease.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(SYNC_LOCK_EXTEND_EVERY);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if lock.extend(&lease, SYNC_LOCK_TTL).await.is_err() {
                        break;
                    }
                }
            })
        };

        let cancel = CancellationToken::new();
        self.active.insert(source_id.to_string(), cancel.clone());

        let result = self.run_pipeline(source_id, &cancel).await;

        // Release on every exit path, then drop the cancel handle
        self.active.remove(source_id);
        extender.abort();
        if let Err(e) = self.lock.release(&lease).await {
            warn!(source_id, error = %e, "sync lock release failed");
        }
        result
    }

    /// Sync every enabled source of a team, sequentially
    pub async fn sync_all(&self, team_id: &str) -> Result<Vec<SyncResult>> {
        let sources = self.sources.list(team_id).await?;
        let mut results = Vec::with_capacity(sources.len());
        for source in sources.iter().filter(|s| s.enabled) {
            match self.sync_source(&source.id).await {
                Ok(result) => results.push(result),
                Err(e) if e.kind() == ErrorKind::SyncInProgress => {
                    debug!(source_id = %source.id, "skipping, sync already running");
                }
                Err(e) => results.push(SyncResult {
                    source_id: source.id.clone(),
                    status: SyncStatus::Failed,
                    stats: SyncStats::default(),
                    error: Some(e.to_string()),
                    took_ms: 0,
                }),
            }
        }
        Ok(results)
    }

    pub async fn get_sync_state(&self, ctx: &AuthContext, source_id: &str) -> Result<SyncState> {
        let source = self.sources.get(source_id).await?;
        if source.team_id != ctx.team_id {
            return Err(Error::not_found(format!("source {}", source_id)));
        }
        self.sync_states.get(source_id).await
    }

    pub async fn list_sync_states(&self, ctx: &AuthContext) -> Result<Vec<SyncState>> {
        let sources = self.sources.list(&ctx.team_id).await?;
        let mut states = Vec::new();
        for source in sources {
            if let Ok(state) = self.sync_states.get(&source.id).await {
                states.push(state);
            }
        }
        Ok(states)
    }

    /// Signal a running sync to stop at the next document boundary
    ///
    /// Returns whether a running sync was signalled. Non-blocking; the
    /// lock is released by the sync itself once it reaches a boundary.
    pub fn cancel_sync(&self, source_id: &str) -> bool {
        match self.active.get(source_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn run_pipeline(&self, source_id: &str, cancel: &CancellationToken) -> Result<SyncResult> {
        let started = Instant::now();
        let source = self.sources.get(source_id).await?;
        if !source.enabled {
            return Ok(SyncResult {
                source_id: source_id.to_string(),
                status: SyncStatus::Completed,
                stats: SyncStats::default(),
                error: None,
                took_ms: started.elapsed().as_millis() as u64,
            });
        }

        let mut state = match self.sync_states.get(source_id).await {
            Ok(state) => state,
            Err(e) if e.kind() == ErrorKind::NotFound => SyncState::new(source_id),
            Err(e) => return Err(e),
        };
        state.status = SyncStatus::Running;
        state.started_at = Some(Utc::now());
        state.error = None;
        self.sync_states.save(&state).await?;
        info!(source_id, provider = %source.provider_type, "sync started");

        let containers = source.containers();
        let mut cursors = CursorMap::decode(&state.cursor, &containers[0]);
        let mut stats = SyncStats::default();
        let mut cancelled = false;

        for container in &containers {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match self
                .sync_container(&source, container, cursors.get(container), cancel, &mut stats)
                .await
            {
                Ok(ContainerOutcome::Finished { next_cursor }) => {
                    cursors.set(container, next_cursor);
                }
                Ok(ContainerOutcome::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    return self.fail_sync(state, stats, e).await;
                }
            }
        }

        let now = Utc::now();
        if cancelled {
            // Persisted documents stay; the cursor does not move.
            state.status = SyncStatus::Failed;
            state.error = Some("cancelled".to_string());
            state.stats = stats;
            state.completed_at = Some(now);
            self.sync_states.save(&state).await?;
            info!(source_id, "sync cancelled");
            return Ok(SyncResult {
                source_id: source_id.to_string(),
                status: SyncStatus::Failed,
                stats,
                error: Some("cancelled".to_string()),
                took_ms: started.elapsed().as_millis() as u64,
            });
        }

        let interval = self
            .settings
            .get(&source.team_id)
            .await
            .map(|s| s.sync_interval)
            .unwrap_or(quarry_domain::constants::DEFAULT_SYNC_INTERVAL);
        state.cursor = cursors.encode()?;
        state.stats = stats;
        state.status = SyncStatus::Completed;
        state.error = None;
        state.completed_at = Some(now);
        state.last_sync_at = Some(now);
        state.next_sync_at =
            Some(now + ChronoDuration::from_std(interval).unwrap_or_else(|_| ChronoDuration::hours(1)));
        self.sync_states.save(&state).await?;
        info!(
            source_id,
            added = stats.documents_added,
            updated = stats.documents_updated,
            deleted = stats.documents_deleted,
            chunks = stats.chunks_indexed,
            errors = stats.errors,
            "sync completed"
        );

        Ok(SyncResult {
            source_id: source_id.to_string(),
            status: SyncStatus::Completed,
            stats,
            error: None,
            took_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Record a failed run and propagate the error to the task queue
    async fn fail_sync(
        &self,
        mut state: SyncState,
        stats: SyncStats,
        error: Error,
    ) -> Result<SyncResult> {
        state.status = SyncStatus::Failed;
        state.error = Some(error.to_string());
        state.stats = stats;
        state.completed_at = Some(Utc::now());
        if let Err(save_err) = self.sync_states.save(&state).await {
            warn!(source_id = %state.source_id, error = %save_err, "failed to persist sync failure");
        }
        warn!(source_id = %state.source_id, error = %error, "sync failed");
        Err(error)
    }

    /// One container: build connector, fetch, apply every change
    async fn sync_container(
        &self,
        source: &Source,
        container: &str,
        cursor: Option<&str>,
        cancel: &CancellationToken,
        stats: &mut SyncStats,
    ) -> Result<ContainerOutcome> {
        let connector = self.build_connector(source, container).await?;

        let batch = match timeout(
            CONNECTOR_FETCH_TIMEOUT,
            connector.fetch_changes(source, cursor),
        )
        .await
        {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => return Err(self.classify_fetch_error(source, e).await),
            Err(_) => {
                return Err(Error::retryable(format!(
                    "change fetch for {} timed out",
                    source.id
                )));
            }
        };
        debug!(source_id = %source.id, container, changes = batch.changes.len(), "changes fetched");

        for change in &batch.changes {
            if cancel.is_cancelled() {
                return Ok(ContainerOutcome::Cancelled);
            }
            match self.apply_change(source, change, stats).await {
                Ok(()) => {}
                // Transient backend trouble fails the run; anything else
                // is a poison document and the sync moves on.
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(source_id = %source.id, external_id = change.external_id(),
                        error = %e, "skipping poison document");
                    stats.errors += 1;
                }
            }
        }

        Ok(ContainerOutcome::Finished {
            next_cursor: batch.next_cursor,
        })
    }

    async fn build_connector(
        &self,
        source: &Source,
        container: &str,
    ) -> Result<Arc<dyn Connector>> {
        let connector = self.factory.create(source, container).await?;
        connector.validate_config(source)?;
        Ok(connector)
    }

    /// One forced refresh on auth rejection, then give up
    ///
    /// A successful refresh turns the failure retryable so the queue
    /// re-drives the sync with the new token; a second rejection stays
    /// `Unauthorized` for the operator.
    async fn classify_fetch_error(&self, source: &Source, error: Error) -> Error {
        if error.kind() != ErrorKind::Unauthorized && error.kind() != ErrorKind::TokenExpired {
            return error;
        }
        warn!(source_id = %source.id, "provider rejected token, forcing one refresh");
        match self.factory.force_refresh(&source.installation_id).await {
            Ok(()) => Error::retryable("credentials refreshed, retrying sync"),
            Err(refresh_err) => {
                warn!(source_id = %source.id, error = %refresh_err, "forced refresh failed");
                error
            }
        }
    }

    async fn apply_change(
        &self,
        source: &Source,
        change: &Change,
        stats: &mut SyncStats,
    ) -> Result<()> {
        match change {
            Change::Added { document, content } => {
                self.upsert_document(source, document, content, stats).await?;
                stats.documents_added += 1;
            }
            Change::Modified { document, content } => {
                self.upsert_document(source, document, content, stats).await?;
                stats.documents_updated += 1;
            }
            Change::Deleted { external_id } => {
                if self.delete_document(source, external_id).await? {
                    stats.documents_deleted += 1;
                }
            }
        }
        Ok(())
    }

    /// Normalise, chunk, embed and persist one document
    ///
    /// Persistence order is document row, chunk rows, engine writes, so
    /// a reader can never observe a chunk without its document.
    async fn upsert_document(
        &self,
        source: &Source,
        meta: &DocumentMeta,
        content: &str,
        stats: &mut SyncStats,
    ) -> Result<()> {
        let text = self.registry.normalise(content, &meta.mime_type)?;
        let now = Utc::now();

        let (doc_id, created_at) = match self
            .documents
            .get_by_external_id(&source.id, &meta.external_id)
            .await
        {
            Ok(existing) => (existing.id, existing.created_at),
            Err(e) if e.kind() == ErrorKind::NotFound => (new_id(), now),
            Err(e) => return Err(e),
        };

        let document = Document {
            id: doc_id.clone(),
            source_id: source.id.clone(),
            external_id: meta.external_id.clone(),
            path: meta.path.clone(),
            title: meta.title.clone(),
            mime_type: meta.mime_type.clone(),
            metadata: meta.metadata.clone(),
            created_at,
            updated_at: meta.updated_at.unwrap_or(now),
            indexed_at: Some(now),
        };

        let mut chunks: Vec<Chunk> = self
            .chunker
            .chunk(&text)
            .into_iter()
            .map(|piece| Chunk {
                id: Chunk::chunk_id(&doc_id, piece.position),
                document_id: doc_id.clone(),
                source_id: source.id.clone(),
                content: piece.content,
                embedding: None,
                position: piece.position,
                start_char: piece.start_char,
                end_char: piece.end_char,
            })
            .collect();

        self.embed_chunks(&mut chunks, stats).await;

        self.documents.save(&document).await?;
        self.chunks.save_batch(&doc_id, &chunks).await?;
        match timeout(INDEX_BATCH_TIMEOUT, self.engine.index(&document, &chunks)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(Error::retryable("engine index batch timed out")),
        }
        stats.chunks_indexed += chunks.len() as u64;
        Ok(())
    }

    /// Remove a document everywhere; engine first so stale hits die
    async fn delete_document(&self, source: &Source, external_id: &str) -> Result<bool> {
        let document = match self
            .documents
            .get_by_external_id(&source.id, external_id)
            .await
        {
            Ok(document) => document,
            // Deleting something never ingested is a no-op, not poison
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        self.engine.delete_by_document(&document.id).await?;
        self.chunks.delete_by_document(&document.id).await?;
        self.documents.delete(&document.id).await?;
        Ok(true)
    }

    /// Embed chunk batches; a batch that keeps failing leaves its chunks
    /// without vectors and counts one error, the sync continues
    async fn embed_chunks(&self, chunks: &mut [Chunk], stats: &mut SyncStats) {
        if !self.capabilities.embedding_available() {
            return;
        }
        let embedder = match self.ai.embedder() {
            Some(embedder) => embedder,
            None => return,
        };

        for batch in chunks.chunks_mut(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let mut vectors = None;
            let mut delay = EMBED_RETRY_BASE;

            for attempt in 0..=EMBED_BATCH_RETRIES {
                if attempt > 0 {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                match timeout(EMBED_BATCH_TIMEOUT, embedder.embed(&texts)).await {
                    Ok(Ok(result)) if result.len() == texts.len() => {
                        vectors = Some(result);
                        break;
                    }
                    Ok(Ok(result)) => {
                        warn!(
                            expected = texts.len(),
                            got = result.len(),
                            "embedder returned mismatched batch"
                        );
                    }
                    Ok(Err(e)) => {
                        debug!(attempt, error = %e, "embedding batch failed");
                    }
                    Err(_) => {
                        debug!(attempt, "embedding batch timed out");
                    }
                }
            }

            match vectors {
                Some(vectors) => {
                    for (chunk, vector) in batch.iter_mut().zip(vectors) {
                        chunk.embedding = Some(vector);
                    }
                }
                None => stats.errors += 1,
            }
        }
    }
}
