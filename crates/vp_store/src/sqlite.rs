//! SQLite-backed store via sqlx.
//!
//! # Encryption strategy
//! SQLite does not natively encrypt. The serialized `GroupState` (which
//! holds chain keys and the group-local signing secret) is stored as
//! XChaCha20-Poly1305 ciphertext, base64-encoded, under a caller-
//! supplied 32-byte key. Only the group id and a timestamp are plain.
//!
//! `put` is a single upsert statement, so readers never observe a
//! half-written row and a failed put leaves the old row authoritative.

use std::path::Path;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use zeroize::ZeroizeOnDrop;

use vp_proto::GroupState;

use crate::{error::StoreError, store::GroupStore};

const STORE_AAD: &[u8] = b"vp-store-v1";

/// 32-byte at-rest encryption key. Zeroized on drop. How the caller
/// obtains it (keyring, password KDF) is outside the store contract.
#[derive(Clone, ZeroizeOnDrop)]
pub struct StoreKey(pub [u8; 32]);

/// Cheap to clone (pool is Arc internally).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    key: StoreKey,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and run migrations.
    ///
    /// WAL journal mode is configured at connection time, not inside a
    /// migration — SQLite forbids changing journal_mode inside the
    /// transaction sqlx wraps each migration in.
    pub async fn open(db_path: &Path, key: StoreKey) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self { pool, key })
    }

    fn encrypt_state(&self, state: &GroupState) -> Result<String, StoreError> {
        let json = serde_json::to_vec(state)?;
        let ct = vp_crypto::aead::encrypt(&self.key.0, &json, STORE_AAD)?;
        Ok(URL_SAFE_NO_PAD.encode(&ct))
    }

    fn decrypt_state(&self, b64: &str) -> Result<GroupState, StoreError> {
        let ct = URL_SAFE_NO_PAD
            .decode(b64)
            .map_err(vp_crypto::CryptoError::Base64Decode)?;
        let json = vp_crypto::aead::decrypt(&self.key.0, &ct, STORE_AAD)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

impl GroupStore for SqliteStore {
    async fn get(&self, group_id: &str) -> Result<Option<GroupState>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT state_enc FROM groups WHERE group_id = ? LIMIT 1")
                .bind(group_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(enc,)| self.decrypt_state(&enc)).transpose()
    }

    async fn put(&self, state: &GroupState) -> Result<(), StoreError> {
        let enc = self.encrypt_state(state)?;
        sqlx::query(
            "INSERT INTO groups (group_id, state_enc, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(group_id) DO UPDATE SET state_enc = excluded.state_enc, \
             updated_at = excluded.updated_at",
        )
        .bind(&state.group_id)
        .bind(&enc)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        tracing::debug!(target: "vp_store", group_id = %state.group_id, "group state persisted");
        Ok(())
    }

    async fn delete(&self, group_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM groups WHERE group_id = ?")
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT group_id FROM groups ORDER BY group_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::*;

    fn tmp_db() -> PathBuf {
        PathBuf::from(format!("/tmp/vp-store-test-{}.db", Uuid::new_v4()))
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    #[tokio::test]
    async fn roundtrip_and_overwrite() {
        let path = tmp_db();
        let store = SqliteStore::open(&path, StoreKey([42u8; 32]))
            .await
            .expect("open store");

        let mut state = GroupState::new_created(
            "team".into(),
            vp_crypto::blind::blind("team"),
            "alice".into(),
            BTreeSet::from(["bob".to_string()]),
        );
        store.put(&state).await.unwrap();

        let loaded = store.get("team").await.unwrap().unwrap();
        assert_eq!(loaded.my_chain_key, state.my_chain_key);
        assert!(loaded.members.contains("bob"));

        state.rotate_own_keys();
        store.put(&state).await.unwrap();
        let reloaded = store.get("team").await.unwrap().unwrap();
        assert_eq!(reloaded.my_chain_key, state.my_chain_key);

        store.delete("team").await.unwrap();
        assert!(store.get("team").await.unwrap().is_none());

        cleanup(&path);
    }

    #[tokio::test]
    async fn state_is_opaque_at_rest() {
        let path = tmp_db();
        let store = SqliteStore::open(&path, StoreKey([7u8; 32]))
            .await
            .expect("open store");

        let state = GroupState::new_created(
            "ops".into(),
            vp_crypto::blind::blind("ops"),
            "alice".into(),
            BTreeSet::new(),
        );
        store.put(&state).await.unwrap();

        let raw: (String,) = sqlx::query_as("SELECT state_enc FROM groups WHERE group_id = 'ops'")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        // The stored blob must not leak the serialized chain key.
        assert!(!raw.0.contains(&state.my_chain_key.to_b64()));

        // Wrong key cannot read it back.
        let wrong = SqliteStore {
            pool: store.pool.clone(),
            key: StoreKey([8u8; 32]),
        };
        assert!(wrong.get("ops").await.is_err());

        cleanup(&path);
    }
}
