use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};

use crate::core::kv::KvStore;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("imaginehub");

/// Persistent store for the native server, backed by an embedded redb file.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let db = Database::create(path)?;

        // Create the table up front so reads never see a missing table.
        let write_txn = db.begin_write()?;
        {
            let _table = write_txn.open_table(TABLE)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "opened redb store");
        Ok(Self { db: Arc::new(db) })
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE)?;
        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kv::KvStoreExt;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.set_json("user:1", &"ada").unwrap();
            store.set("gone", b"x").unwrap();
            store.delete("gone").unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get_json::<String>("user:1").unwrap().as_deref(), Some("ada"));
        assert_eq!(store.get("gone").unwrap(), None);
    }
}
