//! In-memory stand-ins for the reconciler's evidence sources.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rendertrack_core::job_state::JobState;
use rendertrack_core::normalizer::StatusPayload;
use rendertrack_core::types::Timestamp;
use rendertrack_reconciler::{
    ArtifactProbe, JobRecord, JobStore, Reconciler, ReconcilerConfig, RecordUpdate,
    RenderStatusSource, StoreError,
};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Job store kept in a `Vec` so listing order is insertion order.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<JobRecord>>,
    pub fail_listing: Mutex<bool>,
    pub fail_reads_for: Mutex<Vec<String>>,
    pub writes: AtomicUsize,
}

impl MemoryStore {
    pub fn insert(&self, record: JobRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn get(&self, uid: &str) -> JobRecord {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.uid == uid)
            .cloned()
            .unwrap_or_else(|| panic!("no record {uid}"))
    }

    pub fn set_state(&self, uid: &str, state: JobState) {
        let mut records = self.records.lock().unwrap();
        if let Some(r) = records.iter_mut().find(|r| r.uid == uid) {
            r.state = state;
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn list_non_terminal_uids(&self) -> Result<Vec<String>, StoreError> {
        if *self.fail_listing.lock().unwrap() {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.state.is_terminal())
            .map(|r| r.uid.clone())
            .collect())
    }

    async fn get_record(&self, uid: &str) -> Result<Option<JobRecord>, StoreError> {
        if self.fail_reads_for.lock().unwrap().iter().any(|u| u == uid) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.uid == uid)
            .cloned())
    }

    async fn update_record(&self, uid: &str, update: &RecordUpdate) -> Result<bool, StoreError> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.uid == uid) else {
            return Ok(false);
        };
        if record.state.is_terminal() {
            return Ok(false);
        }
        record.state = update.state;
        record.progress = update.progress;
        if let Some(path) = &update.output_path {
            record.output_path = Some(path.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

/// Render service answering from a uid -> body table. Unlisted uids are
/// absent, as are non-object bodies.
#[derive(Default)]
pub struct ScriptedUpstream {
    bodies: Mutex<HashMap<String, Value>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedUpstream {
    pub fn respond(&self, uid: &str, body: Value) {
        self.bodies.lock().unwrap().insert(uid.to_string(), body);
    }

    pub fn stall(&self, uid: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(uid.to_string(), delay);
    }

    pub fn forget(&self, uid: &str) {
        self.bodies.lock().unwrap().remove(uid);
    }

    pub fn calls_for(&self, uid: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == uid).count()
    }
}

#[async_trait]
impl RenderStatusSource for ScriptedUpstream {
    async fn fetch_status(&self, uid: &str) -> Option<StatusPayload> {
        self.calls.lock().unwrap().push(uid.to_string());
        let delay = self.delays.lock().unwrap().get(uid).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let body = self.bodies.lock().unwrap().get(uid).cloned()?;
        StatusPayload::from_json(&body)
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeProbe {
    sizes: Mutex<HashMap<String, u64>>,
    pub probes: AtomicUsize,
}

impl FakeProbe {
    pub fn put(&self, path: &str, size: u64) {
        self.sizes.lock().unwrap().insert(path.to_string(), size);
    }
}

#[async_trait]
impl ArtifactProbe for FakeProbe {
    async fn stat_size(&self, path: &str) -> Option<u64> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.sizes.lock().unwrap().get(path).copied()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub const MIB: u64 = 1024 * 1024;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub upstream: Arc<ScriptedUpstream>,
    pub probe: Arc<FakeProbe>,
    pub reconciler: Reconciler,
    pub now: Timestamp,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        let upstream = Arc::new(ScriptedUpstream::default());
        let probe = Arc::new(FakeProbe::default());
        let reconciler = Reconciler::new(store.clone(), upstream.clone(), probe.clone(), config);
        Self {
            store,
            upstream,
            probe,
            reconciler,
            now: Utc::now(),
        }
    }

    /// Insert a job submitted `age_secs` before `self.now`.
    pub fn add_job(&self, uid: &str, state: JobState, progress: f64, age_secs: i64) {
        self.store.insert(JobRecord {
            uid: uid.to_string(),
            state,
            progress,
            submitted_at: self.now - chrono::Duration::seconds(age_secs),
            output_path: Some(format!("/renders/{uid}.mp4")),
        });
    }
}
