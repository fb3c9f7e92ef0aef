use serde::Deserialize;

use crate::entry::{Collection, Entry};
use crate::error::StoreError;
use crate::logger;
use crate::storage::Storage;

pub const DEFAULT_STORAGE_KEY: &str = "form-data";

/// Durable CRUD over the application collection.
pub trait Store {
    /// Current collection. Never fails: missing or unreadable storage is empty.
    fn load(&mut self) -> Collection;
    /// Inserts under the next free id and returns it.
    fn create(&mut self, entry: Entry) -> Result<u64, StoreError>;
    /// Replaces an existing entry. Unknown ids change nothing.
    fn update(&mut self, id: u64, entry: Entry) -> Result<(), StoreError>;
    /// Removes the persisted collection.
    fn clear(&mut self) -> Result<(), StoreError>;
}

// Payload layouts accepted on read. `Pairs` is what gets written.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Pairs(Vec<(u64, Entry)>),
    Legacy(Vec<Entry>),
}

/// Keeps the whole collection under a single storage key.
pub struct JobStore<S: Storage> {
    storage: S,
    key: String,
    cache: Option<Collection>,
}

impl<S: Storage> JobStore<S> {
    pub fn new(storage: S, key: &str) -> Self {
        Self {
            storage,
            key: key.to_string(),
            cache: None,
        }
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[cfg(test)]
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn read(&self) -> Collection {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Collection::new(),
            Err(e) => {
                logger::warn(&format!("load: failed to read \"{}\": {:#}", self.key, e));
                return Collection::new();
            }
        };

        match serde_json::from_str::<Payload>(&raw) {
            Ok(Payload::Pairs(pairs)) => {
                let (collection, dropped) = Collection::from_pairs(pairs);
                if dropped > 0 {
                    logger::warn(&format!("load: dropped {} entries with duplicate ids", dropped));
                }
                collection
            }
            Ok(Payload::Legacy(entries)) => {
                logger::log(&format!("load: migrating {} entries without ids", entries.len()));
                let pairs = entries
                    .into_iter()
                    .enumerate()
                    .map(|(i, e)| (i as u64, e))
                    .collect();
                Collection::from_pairs(pairs).0
            }
            Err(e) => {
                logger::warn(&format!("load: ignoring malformed \"{}\": {}", self.key, e));
                Collection::new()
            }
        }
    }

    fn current(&mut self) -> &Collection {
        if self.cache.is_none() {
            self.cache = Some(self.read());
        }
        self.cache.get_or_insert_with(Collection::new)
    }

    // The cache only moves forward once the write has landed.
    fn commit(&mut self, next: Collection) -> Result<(), StoreError> {
        let json = serde_json::to_string(&next)?;
        self.storage
            .set_item(&self.key, &json)
            .map_err(|e| StoreError::Write {
                key: self.key.clone(),
                reason: format!("{:#}", e),
            })?;
        self.cache = Some(next);
        Ok(())
    }
}

impl<S: Storage> Store for JobStore<S> {
    fn load(&mut self) -> Collection {
        self.current().clone()
    }

    fn create(&mut self, entry: Entry) -> Result<u64, StoreError> {
        let mut next = self.current().clone();
        let id = next.next_id();
        next.push(id, entry);
        let total = next.len();
        self.commit(next)?;
        logger::log(&format!("create: stored application {} ({} total)", id, total));
        Ok(id)
    }

    fn update(&mut self, id: u64, entry: Entry) -> Result<(), StoreError> {
        let mut next = self.current().clone();
        if !next.replace(id, entry) {
            return Err(StoreError::UnknownId(id));
        }
        self.commit(next)?;
        logger::log(&format!("update: stored application {}", id));
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.storage
            .remove_item(&self.key)
            .map_err(|e| StoreError::Write {
                key: self.key.clone(),
                reason: format!("{:#}", e),
            })?;
        self.cache = Some(Collection::new());
        logger::log(&format!("clear: removed \"{}\"", self.key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::SqliteStorage;

    fn acme() -> Entry {
        Entry::new("Acme", "Engineer", "Applied", "2024-01-10")
    }

    fn globex() -> Entry {
        Entry::new("Globex", "Analyst", "Interview", "2024-02-01")
    }

    fn store() -> JobStore<MemoryStorage> {
        JobStore::new(MemoryStorage::default(), DEFAULT_STORAGE_KEY)
    }

    #[test]
    fn load_on_empty_storage_is_empty() {
        assert!(store().load().is_empty());
    }

    #[test]
    fn create_assigns_pre_insert_size() {
        let mut store = store();
        store.load();
        assert_eq!(store.create(acme()).unwrap(), 0);
        assert_eq!(store.create(globex()).unwrap(), 1);

        let loaded = store.load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(0), Some(&acme()));
        assert_eq!(loaded.get(1), Some(&globex()));
    }

    #[test]
    fn create_rewrites_full_collection() {
        let mut store = store();
        store.create(acme()).unwrap();
        store.create(globex()).unwrap();

        let raw = store.storage().items.get(DEFAULT_STORAGE_KEY).unwrap();
        let pairs: Vec<(u64, Entry)> = serde_json::from_str(raw).unwrap();
        assert_eq!(pairs, vec![(0, acme()), (1, globex())]);
        assert_eq!(store.storage().writes, 2);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut store = store();
        store.create(acme()).unwrap();
        store.create(globex()).unwrap();

        let mut changed = acme();
        changed.status = "Interview".to_string();
        store.update(0, changed.clone()).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.pairs()[0], (0, changed));
    }

    #[test]
    fn update_unknown_id_is_a_no_op() {
        let mut store = store();
        store.create(acme()).unwrap();
        let writes = store.storage().writes;

        let err = store.update(5, globex()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownId(5)));
        assert_eq!(store.storage().writes, writes);
        assert_eq!(store.load().get(0), Some(&acme()));
    }

    #[test]
    fn failed_write_leaves_collection_unchanged() {
        let mut store = store();
        store.create(acme()).unwrap();
        store.storage_mut().fail_writes = true;

        let err = store.create(globex()).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(store.load().len(), 1);

        let err = store.update(0, globex()).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(store.load().get(0), Some(&acme()));
    }

    #[test]
    fn malformed_payload_loads_empty() {
        let storage = MemoryStorage::with_item(DEFAULT_STORAGE_KEY, "{not json");
        let mut store = JobStore::new(storage, DEFAULT_STORAGE_KEY);
        assert!(store.load().is_empty());

        // Entries missing a field are malformed too.
        let storage = MemoryStorage::with_item(DEFAULT_STORAGE_KEY, r#"[[0,{"company":"Acme"}]]"#);
        let mut store = JobStore::new(storage, DEFAULT_STORAGE_KEY);
        assert!(store.load().is_empty());

        // The next write replaces the garbage.
        assert_eq!(store.create(acme()).unwrap(), 0);
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn legacy_payload_gets_positional_ids() {
        let legacy = serde_json::to_string(&vec![acme(), globex()]).unwrap();
        let storage = MemoryStorage::with_item(DEFAULT_STORAGE_KEY, &legacy);
        let mut store = JobStore::new(storage, DEFAULT_STORAGE_KEY);

        let loaded = store.load();
        assert_eq!(loaded.pairs(), &[(0, acme()), (1, globex())]);
        assert_eq!(store.create(acme()).unwrap(), 2);
    }

    #[test]
    fn load_is_lazy_and_cached() {
        let mut store = store();
        store.create(acme()).unwrap();
        // Out-of-band edits are not seen once the collection is cached.
        store
            .storage_mut()
            .items
            .insert(DEFAULT_STORAGE_KEY.to_string(), "[]".to_string());
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn clear_is_scoped_and_idempotent() {
        let mut storage = MemoryStorage::default();
        storage.items.insert("theme".to_string(), "dark".to_string());
        let mut store = JobStore::new(storage, DEFAULT_STORAGE_KEY);
        store.create(acme()).unwrap();

        store.clear().unwrap();
        let once = store.load();
        store.clear().unwrap();
        let twice = store.load();

        assert!(once.is_empty());
        assert_eq!(once, twice);
        assert!(!store.storage().items.contains_key(DEFAULT_STORAGE_KEY));
        assert_eq!(store.storage().items.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(store.create(globex()).unwrap(), 0);
    }

    #[test]
    fn sqlite_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.db");

        let mut store = JobStore::new(SqliteStorage::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
        store.create(acme()).unwrap();
        drop(store);

        let mut store = JobStore::new(SqliteStorage::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
        assert_eq!(store.load().pairs(), &[(0, acme())]);
    }
}
