//! In-memory store — tests and ephemeral identities.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use vp_proto::GroupState;

use crate::{error::StoreError, store::GroupStore};

/// Cheap to clone (Arc internally).
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, GroupState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GroupStore for MemoryStore {
    async fn get(&self, group_id: &str) -> Result<Option<GroupState>, StoreError> {
        Ok(self.inner.read().await.get(group_id).cloned())
    }

    async fn put(&self, state: &GroupState) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .insert(state.group_id.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, group_id: &str) -> Result<(), StoreError> {
        self.inner.write().await.remove(group_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let store = MemoryStore::new();
        let state = GroupState::new_created(
            "team".into(),
            vp_crypto::blind::blind("team"),
            "alice".into(),
            BTreeSet::from(["bob".to_string()]),
        );

        store.put(&state).await.unwrap();
        let loaded = store.get("team").await.unwrap().unwrap();
        assert_eq!(loaded.my_chain_key, state.my_chain_key);
        assert_eq!(store.list().await.unwrap(), vec!["team".to_string()]);

        store.delete("team").await.unwrap();
        assert!(store.get("team").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_previous_state() {
        let store = MemoryStore::new();
        let mut state = GroupState::new_created(
            "team".into(),
            vp_crypto::blind::blind("team"),
            "alice".into(),
            BTreeSet::new(),
        );
        store.put(&state).await.unwrap();
        let old_key = state.my_chain_key.clone();

        state.rotate_own_keys();
        store.put(&state).await.unwrap();

        let loaded = store.get("team").await.unwrap().unwrap();
        assert_ne!(loaded.my_chain_key, old_key);
    }
}
