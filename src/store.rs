use std::sync::Arc;

use tokio::sync::RwLock;

use crate::types::{NetworkRecord, ScanResult};

/// Holds the records of the most recent successful scan.
///
/// Starts empty. Each successful scan swaps the whole slot; nothing is merged.
#[derive(Debug, Clone, Default)]
pub struct ScanStore {
    inner: Arc<RwLock<Option<Arc<Vec<NetworkRecord>>>>>,
}

impl ScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored records. Concurrent writers: last one wins.
    pub async fn replace(&self, records: Vec<NetworkRecord>) {
        *self.inner.write().await = Some(Arc::new(records));
    }

    /// Store the records of `result` if the scan succeeded; returns whether it did.
    pub async fn apply(&self, result: &ScanResult) -> bool {
        if !result.success {
            return false;
        }
        self.replace(result.records.clone()).await;
        true
    }

    pub async fn snapshot(&self) -> Option<Arc<Vec<NetworkRecord>>> {
        self.inner.read().await.clone()
    }

    /// True before the first successful scan, or after one that found nothing.
    pub async fn is_empty(&self) -> bool {
        self.inner
            .read()
            .await
            .as_ref()
            .map_or(true, |records| records.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(vpc: &str) -> NetworkRecord {
        NetworkRecord {
            region: "eu-west-1".into(),
            vpc_id: vpc.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn starts_empty() {
        let store = ScanStore::new();
        assert!(store.is_empty().await);
        assert!(store.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn replace_swaps_whole_slot() {
        let store = ScanStore::new();
        store.replace(vec![record("vpc-1"), record("vpc-2")]).await;
        store.replace(vec![record("vpc-3")]).await;
        let snap = store.snapshot().await.unwrap();
        assert_eq!(snap.as_slice(), &[record("vpc-3")]);
    }

    #[tokio::test]
    async fn failed_scan_leaves_previous_records() {
        let store = ScanStore::new();
        store.replace(vec![record("vpc-1")]).await;
        assert!(!store.apply(&ScanResult::failed("boom")).await);
        assert_eq!(store.snapshot().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn snapshot_survives_later_replace() {
        let store = ScanStore::new();
        store.replace(vec![record("vpc-1")]).await;
        let before = store.snapshot().await.unwrap();
        store.replace(vec![record("vpc-2")]).await;
        assert_eq!(before[0].vpc_id, "vpc-1");
    }
}
