//! SQLite-backed face store.
//!
//! Every operation opens a connection, runs a single statement, and closes
//! it — no transaction ever spans two store calls. Embeddings are persisted
//! as a JSON array of floats so the table stays portable and inspectable.

use lookout_core::{Embedding, KnownFace, EMBEDDING_DIM};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

/// Handle to the known-faces table. Cheap to clone; holds only the path.
#[derive(Clone)]
pub struct FaceStore {
    path: PathBuf,
}

impl FaceStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(&self) -> Result<Connection, StoreError> {
        Ok(Connection::open(&self.path)?)
    }

    /// Idempotently create the backing table. Safe on every process start.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS known_faces (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                embedding TEXT NOT NULL
            )",
            [],
        )?;
        tracing::debug!(path = %self.path.display(), "face store initialized");
        Ok(())
    }

    /// All rows in storage (insertion) order.
    ///
    /// A row whose embedding does not decode to exactly [`EMBEDDING_DIM`]
    /// floats is a corruption condition and fails the whole read.
    pub fn list(&self) -> Result<Vec<KnownFace>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT id, name, embedding FROM known_faces")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut faces = Vec::new();
        for row in rows {
            let (id, name, encoded) = row?;
            let values: Vec<f32> =
                serde_json::from_str(&encoded).map_err(|e| StoreError::CorruptRow {
                    id,
                    reason: e.to_string(),
                })?;
            if values.len() != EMBEDDING_DIM {
                return Err(StoreError::CorruptRow {
                    id,
                    reason: format!("embedding has {} values, expected {EMBEDDING_DIM}", values.len()),
                });
            }
            faces.push(KnownFace {
                id,
                name,
                embedding: Embedding::new(values),
            });
        }
        Ok(faces)
    }

    /// Id/name projection for listings; skips embedding decoding entirely.
    pub fn list_entries(&self) -> Result<Vec<(i64, String)>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT id, name FROM known_faces")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Append a new face, returning its assigned id.
    pub fn insert(&self, name: &str, embedding: &Embedding) -> Result<i64, StoreError> {
        let encoded = serde_json::to_string(&embedding.values)
            .expect("Vec<f32> serialization cannot fail");
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO known_faces (name, embedding) VALUES (?1, ?2)",
            rusqlite::params![name, encoded],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(id, name, "face registered");
        Ok(id)
    }

    /// Remove the row with this id. Deleting a non-existent id is a silent
    /// no-op, not an error.
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.open()?;
        let affected = conn.execute("DELETE FROM known_faces WHERE id = ?1", [id])?;
        tracing::info!(id, affected, "face deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, FaceStore) {
        let dir = TempDir::new().unwrap();
        let store = FaceStore::new(dir.path().join("faces.db"));
        store.initialize().unwrap();
        (dir, store)
    }

    fn embedding(seed: f32) -> Embedding {
        Embedding::new((0..EMBEDDING_DIM).map(|i| seed + i as f32 * 0.001).collect())
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_dir, store) = test_store();
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_insert_assigns_monotonic_ids() {
        let (_dir, store) = test_store();
        let a = store.insert("alice", &embedding(0.1)).unwrap();
        let b = store.insert("bob", &embedding(0.2)).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let (_dir, store) = test_store();
        store.insert("alice", &embedding(0.1)).unwrap();
        store.insert("bob", &embedding(0.2)).unwrap();
        let names: Vec<String> = store.list().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_embedding_roundtrip_is_exact() {
        let (_dir, store) = test_store();
        let original = embedding(-1.5);
        store.insert("alice", &original).unwrap();
        let loaded = store.list().unwrap().remove(0);
        assert_eq!(loaded.embedding.values, original.values);
    }

    #[test]
    fn test_delete_removes_row() {
        let (_dir, store) = test_store();
        let id = store.insert("alice", &embedding(0.1)).unwrap();
        store.delete(id).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete_nonexistent_is_noop() {
        let (_dir, store) = test_store();
        store.insert("alice", &embedding(0.1)).unwrap();
        store.delete(9999).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_rejects_wrong_length_embedding() {
        let (_dir, store) = test_store();
        let conn = Connection::open(store.path.clone()).unwrap();
        conn.execute(
            "INSERT INTO known_faces (name, embedding) VALUES ('bad', '[1.0, 2.0]')",
            [],
        )
        .unwrap();
        assert!(matches!(
            store.list(),
            Err(StoreError::CorruptRow { .. })
        ));
    }

    #[test]
    fn test_list_rejects_malformed_json() {
        let (_dir, store) = test_store();
        let conn = Connection::open(store.path.clone()).unwrap();
        conn.execute(
            "INSERT INTO known_faces (name, embedding) VALUES ('bad', 'not json')",
            [],
        )
        .unwrap();
        assert!(matches!(
            store.list(),
            Err(StoreError::CorruptRow { .. })
        ));
    }

    #[test]
    fn test_list_entries_projection() {
        let (_dir, store) = test_store();
        let id = store.insert("alice", &embedding(0.1)).unwrap();
        let entries = store.list_entries().unwrap();
        assert_eq!(entries, vec![(id, "alice".to_string())]);
    }
}
