//! Source, sync-state, document and chunk stores

use async_trait::async_trait;
use dashmap::DashMap;

use quarry_domain::entities::{Chunk, Document, Source, SyncState};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{ChunkStore, DocumentStore, SourceStore, SyncStateStore};

/// Source rows, unique by `(team_id, name)`
#[derive(Default)]
pub struct InMemorySourceStore {
    sources: DashMap<String, Source>,
}

impl InMemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceStore for InMemorySourceStore {
    async fn save(&self, source: &Source) -> Result<()> {
        let conflict = self.sources.iter().any(|s| {
            s.team_id == source.team_id && s.name == source.name && s.id != source.id
        });
        if conflict {
            return Err(Error::already_exists(format!("source {}", source.name)));
        }
        self.sources.insert(source.id.clone(), source.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Source> {
        self.sources
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found(format!("source {}", id)))
    }

    async fn get_by_name(&self, team_id: &str, name: &str) -> Result<Source> {
        self.sources
            .iter()
            .find(|s| s.team_id == team_id && s.name == name)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found(format!("source {}", name)))
    }

    async fn list(&self, team_id: &str) -> Result<Vec<Source>> {
        Ok(self
            .sources
            .iter()
            .filter(|s| s.team_id == team_id)
            .map(|s| s.clone())
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("source {}", id)))
    }
}

/// Sync state rows, 1:1 with sources
#[derive(Default)]
pub struct InMemorySyncStateStore {
    states: DashMap<String, SyncState>,
}

impl InMemorySyncStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncStateStore for InMemorySyncStateStore {
    async fn save(&self, state: &SyncState) -> Result<()> {
        self.states.insert(state.source_id.clone(), state.clone());
        Ok(())
    }

    async fn get(&self, source_id: &str) -> Result<SyncState> {
        self.states
            .get(source_id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found(format!("sync state {}", source_id)))
    }

    async fn list(&self) -> Result<Vec<SyncState>> {
        Ok(self.states.iter().map(|s| s.clone()).collect())
    }

    async fn delete(&self, source_id: &str) -> Result<()> {
        self.states.remove(source_id);
        Ok(())
    }
}

/// Document rows, unique by `(source_id, external_id)`
///
/// Upserts keep the row id stable so chunk references survive updates.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<String, Document>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn save(&self, document: &Document) -> Result<bool> {
        let existing = self
            .documents
            .iter()
            .find(|d| {
                d.source_id == document.source_id && d.external_id == document.external_id
            })
            .map(|d| (d.id.clone(), d.created_at));

        match existing {
            Some((id, created_at)) => {
                let mut updated = document.clone();
                updated.id = id.clone();
                updated.created_at = created_at;
                self.documents.insert(id, updated);
                Ok(false)
            }
            None => {
                self.documents
                    .insert(document.id.clone(), document.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Document> {
        self.documents
            .get(id)
            .map(|d| d.clone())
            .ok_or_else(|| Error::not_found(format!("document {}", id)))
    }

    async fn get_by_external_id(&self, source_id: &str, external_id: &str) -> Result<Document> {
        self.documents
            .iter()
            .find(|d| d.source_id == source_id && d.external_id == external_id)
            .map(|d| d.clone())
            .ok_or_else(|| Error::not_found(format!("document {}", external_id)))
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Document>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.documents.get(id).map(|d| d.clone()))
            .collect())
    }

    async fn list_by_source(&self, source_id: &str) -> Result<Vec<Document>> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.source_id == source_id)
            .map(|d| d.clone())
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("document {}", id)))
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<u64> {
        let before = self.documents.len();
        self.documents.retain(|_, d| d.source_id != source_id);
        Ok((before - self.documents.len()) as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.documents.len() as u64)
    }
}

/// Chunk rows grouped by document; replacement is per-document atomic
#[derive(Default)]
pub struct InMemoryChunkStore {
    by_document: DashMap<String, Vec<Chunk>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn save_batch(&self, document_id: &str, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            if chunk.document_id != document_id {
                return Err(Error::invalid_input(format!(
                    "chunk {} belongs to document {}",
                    chunk.id, chunk.document_id
                )));
            }
            if chunk.start_char > chunk.end_char {
                return Err(Error::invalid_input(format!(
                    "chunk {} has inverted offsets",
                    chunk.id
                )));
            }
        }
        // One insert replaces the whole set: all-or-nothing per document
        self.by_document
            .insert(document_id.to_string(), chunks.to_vec());
        Ok(())
    }

    async fn get_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let mut chunks = self
            .by_document
            .get(document_id)
            .map(|c| c.clone())
            .unwrap_or_default();
        chunks.sort_by_key(|c| c.position);
        Ok(chunks)
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<u64> {
        Ok(self
            .by_document
            .remove(document_id)
            .map(|(_, chunks)| chunks.len() as u64)
            .unwrap_or(0))
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<u64> {
        let doc_ids: Vec<String> = self
            .by_document
            .iter()
            .filter(|e| e.value().iter().any(|c| c.source_id == source_id))
            .map(|e| e.key().clone())
            .collect();
        let mut removed = 0;
        for doc_id in doc_ids {
            removed += self.delete_by_document(&doc_id).await?;
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.by_document.iter().map(|c| c.len() as u64).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quarry_domain::ids::new_id;

    fn document(source_id: &str, external_id: &str) -> Document {
        let now = Utc::now();
        Document {
            id: new_id(),
            source_id: source_id.into(),
            external_id: external_id.into(),
            path: format!("/{}", external_id),
            title: external_id.into(),
            mime_type: "text/plain".into(),
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
            indexed_at: None,
        }
    }

    fn chunk(document_id: &str, position: u32) -> Chunk {
        Chunk {
            id: Chunk::chunk_id(document_id, position),
            document_id: document_id.into(),
            source_id: "src1".into(),
            content: "text".into(),
            embedding: None,
            position,
            start_char: 0,
            end_char: 4,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_row_id_and_created_at() {
        let store = InMemoryDocumentStore::new();
        let first = document("src1", "doc-1");
        assert!(store.save(&first).await.unwrap());

        let mut second = document("src1", "doc-1");
        second.title = "renamed".into();
        assert!(!store.save(&second).await.unwrap());

        let fetched = store.get_by_external_id("src1", "doc-1").await.unwrap();
        assert_eq!(fetched.id, first.id);
        assert_eq!(fetched.created_at, first.created_at);
        assert_eq!(fetched.title, "renamed");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_batch_replaces_previous_chunks() {
        let store = InMemoryChunkStore::new();
        store
            .save_batch("doc1", &[chunk("doc1", 0), chunk("doc1", 1), chunk("doc1", 2)])
            .await
            .unwrap();
        store
            .save_batch("doc1", &[chunk("doc1", 0)])
            .await
            .unwrap();
        assert_eq!(store.get_by_document("doc1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn batch_for_wrong_document_is_rejected() {
        let store = InMemoryChunkStore::new();
        assert!(store
            .save_batch("doc1", &[chunk("doc2", 0)])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn delete_by_source_sweeps_all_documents() {
        let store = InMemoryChunkStore::new();
        store.save_batch("doc1", &[chunk("doc1", 0)]).await.unwrap();
        store.save_batch("doc2", &[chunk("doc2", 0), chunk("doc2", 1)]).await.unwrap();
        assert_eq!(store.delete_by_source("src1").await.unwrap(), 3);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn source_name_uniqueness_per_team() {
        let store = InMemorySourceStore::new();
        let now = Utc::now();
        let make = |id: &str, team: &str, name: &str| Source {
            id: id.into(),
            team_id: team.into(),
            name: name.into(),
            provider_type: "github".into(),
            config: serde_json::json!({}),
            installation_id: "ins1".into(),
            selected_containers: vec![],
            enabled: true,
            created_by: "u1".into(),
            created_at: now,
            updated_at: now,
        };
        store.save(&make("s1", "team1", "repo")).await.unwrap();
        assert!(store.save(&make("s2", "team1", "repo")).await.is_err());
        store.save(&make("s3", "team2", "repo")).await.unwrap();
    }
}
