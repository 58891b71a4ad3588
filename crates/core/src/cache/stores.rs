//! Named store management on top of [`CacheDb`].
//!
//! A store is a row in `cache_stores`; its records cascade away when the
//! row is deleted. Opening is idempotent.

use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::names::StoreNaming;
use crate::Error;

/// Handle to one named store.
#[derive(Clone, Debug)]
pub struct CacheStore {
    pub(crate) db: CacheDb,
    pub(crate) name: String,
}

impl CacheStore {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CacheDb {
    /// Open (creating on first call) the store called `name`.
    pub async fn open_named(&self, name: &str) -> Result<CacheStore, Error> {
        self.create_store(name.to_string(), None).await
    }

    /// Handle to the store called `name` without creating it.
    ///
    /// Reads through a handle to a missing store see no records; writes fail
    /// with [`Error::UnknownStore`].
    pub fn store(&self, name: &str) -> CacheStore {
        CacheStore { db: self.clone(), name: name.to_string() }
    }

    async fn create_store(&self, name: String, version: Option<u64>) -> Result<CacheStore, Error> {
        let version = version
            .map(i64::try_from)
            .transpose()
            .map_err(|_| Error::InvalidInput(format!("store version out of range for {name}")))?;
        let row_name = name.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, version, created_at) VALUES (?1, ?2, ?3)",
                    params![row_name, version, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(CacheStore { db: self.clone(), name })
    }

    /// Names of every store in the database, sorted.
    pub async fn list_store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all of its records.
    ///
    /// Returns true if the store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

/// Stores namespaced by build version under one application id.
#[derive(Clone, Debug)]
pub struct VersionedCache {
    db: CacheDb,
    naming: StoreNaming,
}

impl VersionedCache {
    pub fn new(db: CacheDb, naming: StoreNaming) -> Self {
        Self { db, naming }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn naming(&self) -> &StoreNaming {
        &self.naming
    }

    /// Open (creating on first call) the store for `version`.
    pub async fn open(&self, version: u64) -> Result<CacheStore, Error> {
        self.db.create_store(self.naming.format(version), Some(version)).await
    }

    pub async fn list_store_names(&self) -> Result<Vec<String>, Error> {
        self.db.list_store_names().await
    }

    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.db.delete_store(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheRecord;

    async fn cache() -> VersionedCache {
        let db = CacheDb::open_in_memory().await.unwrap();
        VersionedCache::new(db, StoreNaming::new("app").unwrap())
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let cache = cache().await;
        let first = cache.open(5).await.unwrap();
        first
            .put("/", &CacheRecord::new(200, Vec::new(), b"home".to_vec()))
            .await
            .unwrap();

        let second = cache.open(5).await.unwrap();
        assert_eq!(second.name(), "app-5");
        assert!(second.get("/").await.unwrap().is_some());
        assert_eq!(cache.list_store_names().await.unwrap(), vec!["app-5".to_string()]);
    }

    #[tokio::test]
    async fn test_store_handle_does_not_recreate_deleted_store() {
        let cache = cache().await;
        cache.open(4).await.unwrap();
        cache.open(5).await.unwrap();
        assert!(cache.delete("app-4").await.unwrap());

        let handle = cache.db().store("app-4");

        assert!(handle.get("/").await.unwrap().is_none());
        assert_eq!(handle.len().await.unwrap(), 0);
        assert!(matches!(
            handle.put("/", &CacheRecord::new(200, Vec::new(), b"x".to_vec())).await,
            Err(Error::UnknownStore(_))
        ));
        assert_eq!(cache.list_store_names().await.unwrap(), vec!["app-5".to_string()]);
    }

    #[tokio::test]
    async fn test_open_rejects_version_beyond_i64() {
        let cache = cache().await;
        assert!(matches!(cache.open(u64::MAX).await, Err(Error::InvalidInput(_))));
        assert!(cache.list_store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_store_names_sorted() {
        let cache = cache().await;
        cache.open(5).await.unwrap();
        cache.open(4).await.unwrap();
        cache.db().open_named("app-unrelatedname").await.unwrap();

        assert_eq!(
            cache.list_store_names().await.unwrap(),
            vec!["app-4".to_string(), "app-5".to_string(), "app-unrelatedname".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_store_cascades_records() {
        let cache = cache().await;
        let store = cache.open(4).await.unwrap();
        store
            .put("/x", &CacheRecord::new(200, Vec::new(), b"x".to_vec()))
            .await
            .unwrap();

        assert!(cache.delete("app-4").await.unwrap());
        assert!(!cache.delete("app-4").await.unwrap());

        let reopened = cache.open(4).await.unwrap();
        assert!(reopened.get("/x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_backed_stores_shared_between_handles() {
        let dir = std::env::temp_dir().join(format!("offline-core-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shared.sqlite");
        let _ = std::fs::remove_file(&path);

        let naming = StoreNaming::new("app").unwrap();
        let v4 = VersionedCache::new(CacheDb::open(&path).await.unwrap(), naming.clone());
        let v5 = VersionedCache::new(CacheDb::open(&path).await.unwrap(), naming);

        v4.open(4).await.unwrap();
        v5.open(5).await.unwrap();

        assert_eq!(
            v5.list_store_names().await.unwrap(),
            vec!["app-4".to_string(), "app-5".to_string()]
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
