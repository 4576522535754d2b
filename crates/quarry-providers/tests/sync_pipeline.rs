//! End-to-end sync pipeline scenarios over in-memory backends

mod common;

use std::sync::Arc;

use chrono::Utc;

use common::{added, two_chunk_content, TestPlatform};
use quarry_application::services::OAuthCoordinator;
use quarry_application::sync::SyncWorker;
use quarry_domain::entities::{
    AuthContext, AuthMethod, Installation, InstallationSecrets, Role, SyncStatus, Task,
    TaskStatus, TaskType,
};
use quarry_domain::error::{Error, ErrorKind};
use quarry_domain::ports::{
    ChangeBatch, ChunkStore, DocumentStore, InstallationStore, SearchEngine, SyncStateStore,
    TaskQueue,
};
use quarry_infrastructure::oauth_state::MokaStateStore;

fn admin_ctx() -> AuthContext {
    AuthContext {
        user_id: "usr-admin".into(),
        email: "admin@quarry.dev".into(),
        role: Role::Admin,
        team_id: "team1".into(),
        session_id: "ses1".into(),
    }
}

async fn seed_api_key_installation(platform: &TestPlatform, id: &str) {
    platform
        .installations
        .save(&Installation {
            id: id.into(),
            name: "Memory".into(),
            provider_type: "memory".into(),
            auth_method: AuthMethod::ApiKey,
            account_id: "acct".into(),
            secrets: InstallationSecrets {
                api_key: Some("k1".into()),
                ..Default::default()
            },
            oauth_expiry: None,
            scopes: vec![],
            created_at: Utc::now(),
            last_used_at: None,
        })
        .await
        .unwrap();
}

// OAuth install through the coordinator, then the first sync of the new
// source: three added documents, two chunks each.
#[tokio::test]
async fn oauth_install_and_first_sync() {
    let platform = TestPlatform::new();
    platform.seed_provider_config("memory").await;

    let coordinator = OAuthCoordinator::new(
        platform.provider_configs.clone(),
        platform.installations.clone(),
        Arc::new(MokaStateStore::new()),
        Arc::new(common::ScriptedExchanger),
    );
    let outcome = coordinator
        .authorize(&admin_ctx(), "memory", None, "https://quarry.local")
        .await
        .unwrap();
    let installation = coordinator
        .callback("c1", &outcome.state, None)
        .await
        .unwrap();
    assert_eq!(installation.account_id, "u1");

    // The stored credentials really round-tripped through the box
    let full = platform.installations.get(&installation.id).await.unwrap();
    assert_eq!(full.secrets.access_token.as_deref(), Some("a1"));
    assert_eq!(full.secrets.refresh_token.as_deref(), Some("r1"));

    platform
        .seed_source("src1", "memory", &installation.id, vec!["octocat/repo".into()])
        .await;
    platform.memory_builder.script(
        "octocat/repo",
        vec![Ok(ChangeBatch {
            changes: vec![
                added("doc-1", &two_chunk_content()),
                added("doc-2", &two_chunk_content()),
                added("doc-3", &two_chunk_content()),
            ],
            next_cursor: "cursor-1".into(),
        })],
    );

    let result = platform.orchestrator.sync_source("src1").await.unwrap();
    assert_eq!(result.status, SyncStatus::Completed);
    assert_eq!(result.stats.documents_added, 3);
    assert_eq!(result.stats.chunks_indexed, 6);
    assert_eq!(result.stats.errors, 0);

    let state = platform.sync_states.get("src1").await.unwrap();
    assert_eq!(state.cursor, "cursor-1");
    assert_eq!(state.status, SyncStatus::Completed);

    assert_eq!(platform.documents.count().await.unwrap(), 3);
    assert_eq!(platform.chunks.count().await.unwrap(), 6);
    assert_eq!(platform.engine.indexed_chunks().await.unwrap(), 6);
}

// Transient failure on the first delivery, success on the redelivery.
#[tokio::test]
async fn task_retry_with_backoff() {
    let platform = TestPlatform::new();
    seed_api_key_installation(&platform, "ins1").await;
    platform
        .seed_source("src1", "memory", "ins1", vec!["repo".into()])
        .await;
    platform.memory_builder.script(
        "repo",
        vec![
            Err(Error::retryable("connection reset by provider")),
            Ok(ChangeBatch {
                changes: vec![added("doc-1", "recovered")],
                next_cursor: "c1".into(),
            }),
        ],
    );

    let worker = Arc::new(SyncWorker::new(
        platform.queue.clone(),
        platform.orchestrator.clone(),
        1,
    ));
    let task = Task::new(
        TaskType::SyncSource,
        "team1",
        serde_json::json!({"source_id": "src1"}),
    );
    platform.queue.enqueue(task.clone()).await.unwrap();

    // First delivery fails and is re-scheduled with backoff.
    let delivered = platform.queue.dequeue().await.unwrap();
    worker.handle(delivered).await;
    let retried = platform.queue.get_task(&task.id).await.unwrap();
    assert_eq!(retried.status, TaskStatus::Pending);
    assert_eq!(retried.attempts, 1);
    let delay = retried.scheduled_for - Utc::now();
    assert!(delay >= chrono::Duration::seconds(1));
    assert!(delay <= chrono::Duration::seconds(4));

    // Wait out the backoff; the redelivery succeeds.
    let redelivered = platform
        .queue
        .dequeue_with_timeout(std::time::Duration::from_secs(5))
        .await
        .unwrap()
        .expect("task should come back after backoff");
    worker.handle(redelivered).await;

    let done = platform.queue.get_task(&task.id).await.unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.attempts, 2);
    assert_eq!(
        platform.sync_states.get("src1").await.unwrap().status,
        SyncStatus::Completed
    );
}

// Cancellation after four documents: persisted work stays, the cursor
// does not move, and a re-run re-delivers everything idempotently.
#[tokio::test]
async fn cancellation_mid_batch_keeps_cursor() {
    let platform = TestPlatform::new();
    seed_api_key_installation(&platform, "ins1").await;
    platform
        .seed_source("src1", "memory", "ins1", vec!["repo".into()])
        .await;

    let mut state = platform.sync_states.get("src1").await.unwrap();
    state.cursor = "cursor-0".into();
    platform.sync_states.save(&state).await.unwrap();

    let ten_docs = |batch_cursor: &str| ChangeBatch {
        changes: (1..=10)
            .map(|i| added(&format!("doc-{}", i), &format!("document body {}", i)))
            .collect(),
        next_cursor: batch_cursor.into(),
    };
    platform
        .memory_builder
        .script("repo", vec![Ok(ten_docs("cursor-1")), Ok(ten_docs("cursor-1"))]);

    // Cancel through the public API once the fourth document lands.
    let orchestrator = platform.orchestrator.clone();
    platform.documents.set_hook(Box::new(move |saves| {
        if saves == 4 {
            orchestrator.cancel_sync("src1");
        }
    }));

    let result = platform.orchestrator.sync_source("src1").await.unwrap();
    assert_eq!(result.status, SyncStatus::Failed);
    assert_eq!(result.error.as_deref(), Some("cancelled"));

    let state = platform.sync_states.get("src1").await.unwrap();
    assert_eq!(state.status, SyncStatus::Failed);
    assert_eq!(state.error.as_deref(), Some("cancelled"));
    assert_eq!(state.cursor, "cursor-0");
    assert_eq!(platform.documents.count().await.unwrap(), 4);

    // Re-run: the remaining six arrive, the first four upsert as no-ops.
    platform.documents.set_hook(Box::new(|_| {}));
    let rerun = platform.orchestrator.sync_source("src1").await.unwrap();
    assert_eq!(rerun.status, SyncStatus::Completed);
    assert_eq!(platform.documents.count().await.unwrap(), 10);
    assert_eq!(
        platform.sync_states.get("src1").await.unwrap().cursor,
        "cursor-1"
    );
}

// While one sync holds the source lock, every concurrent caller gets
// SyncInProgress; the lock frees once the first sync finishes. The
// blocking hook needs real worker threads.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_syncs_are_mutually_exclusive() {
    let platform = TestPlatform::new();
    seed_api_key_installation(&platform, "ins1").await;
    platform
        .seed_source("src1", "memory", "ins1", vec!["repo".into()])
        .await;
    platform.memory_builder.script(
        "repo",
        vec![Ok(ChangeBatch {
            changes: vec![added("doc-1", "body")],
            next_cursor: "c1".into(),
        })],
    );

    // Gate the pipeline: hold it open on the first document save until
    // the concurrent caller has observed the held lock.
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let entered = Arc::new(tokio::sync::Semaphore::new(0));
    {
        let gate = gate.clone();
        let entered = entered.clone();
        platform.documents.set_hook(Box::new(move |_| {
            entered.add_permits(1);
            // Block the pipeline thread until the test releases it
            while gate.try_acquire().is_err() {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
        }));
    }

    let first = {
        let orchestrator = platform.orchestrator.clone();
        tokio::spawn(async move { orchestrator.sync_source("src1").await })
    };
    let permit = entered.acquire().await.unwrap();
    permit.forget();

    let err = platform.orchestrator.sync_source("src1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyncInProgress);

    gate.add_permits(1);
    let result = first.await.unwrap().unwrap();
    assert_eq!(result.status, SyncStatus::Completed);

    // Lock released: the next sync goes through (no new changes).
    let second = platform.orchestrator.sync_source("src1").await.unwrap();
    assert_eq!(second.status, SyncStatus::Completed);
    assert_eq!(second.stats.documents_added, 0);
}
