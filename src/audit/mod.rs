//! Decision log
//!
//! Every allocation decision is recorded with a digest of its payload so the
//! record can later be checked for tampering. Records live in memory only,
//! and the oldest record is evicted once the log reaches its capacity.

use crate::models::{Allocation, AllocationPlan, Confidence, Sentiment, Verdict};
use crate::error::AgentError;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// The decision fields covered by the digest.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPayload {
    pub sentiment: Sentiment,
    pub confidence: Confidence,
    pub allocation: Allocation,
    pub transaction_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub decision_id: Uuid,
    #[serde(flatten)]
    pub payload: DecisionPayload,
    pub digest: String,
}

impl DecisionRecord {
    pub fn new(verdict: &Verdict, plan: &AllocationPlan) -> Self {
        let payload = DecisionPayload {
            sentiment: verdict.sentiment(),
            confidence: verdict.confidence(),
            allocation: plan.allocation.clone(),
            transaction_count: plan.transactions.len(),
            timestamp: verdict.timestamp(),
        };
        let digest = compute_payload_digest(&payload);

        Self {
            decision_id: Uuid::new_v4(),
            payload,
            digest,
        }
    }
}

pub const DEFAULT_DECISION_LOG_CAPACITY: usize = 1000;

#[derive(Default)]
struct Records {
    by_id: HashMap<Uuid, DecisionRecord>,
    /// Insertion order, oldest first
    order: VecDeque<Uuid>,
}

/// Decision trail storage, bounded to `capacity` records
pub struct DecisionLog {
    records: Arc<RwLock<Records>>,
    capacity: usize,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Records::default())),
            capacity: DEFAULT_DECISION_LOG_CAPACITY,
        }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(AgentError::ConfigError(
                "decision log capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            records: Arc::new(RwLock::new(Records::default())),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store a decision record, evicting the oldest when full
    pub async fn record(&self, record: DecisionRecord) -> Result<Uuid> {
        let decision_id = record.decision_id;
        let mut records = self.records.write().await;

        if records.by_id.insert(decision_id, record).is_none() {
            records.order.push_back(decision_id);
        }
        while records.order.len() > self.capacity {
            if let Some(evicted) = records.order.pop_front() {
                records.by_id.remove(&evicted);
            }
        }

        Ok(decision_id)
    }

    pub async fn get(&self, decision_id: Uuid) -> Result<Option<DecisionRecord>> {
        let records = self.records.read().await;
        Ok(records.by_id.get(&decision_id).cloned())
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All retained records, oldest first
    pub async fn list(&self) -> Result<Vec<DecisionRecord>> {
        let records = self.records.read().await;

        let mut items: Vec<_> = records.by_id.values().cloned().collect();
        items.sort_by_key(|r| r.payload.timestamp);

        Ok(items)
    }

    /// Verify a record's integrity via hash
    pub async fn verify_integrity(&self, decision_id: Uuid) -> Result<bool> {
        let records = self.records.read().await;

        Ok(records
            .by_id
            .get(&decision_id)
            .map(|record| compute_payload_digest(&record.payload) == record.digest)
            .unwrap_or(false))
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA256 of the payload's JSON encoding.
/// Uses zero-copy streaming serialization into hasher
pub fn compute_payload_digest(payload: &DecisionPayload) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), payload).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
