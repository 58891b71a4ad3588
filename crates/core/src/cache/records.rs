//! Response snapshots and their per-store CRUD operations.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

use super::hash::compute_body_digest;
use super::stores::CacheStore;
use crate::Error;

/// An immutable snapshot of a successful response.
///
/// Records are never edited in place; a later fetch of the same key
/// replaces the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub body_sha256: String,
    pub fetched_at: String,
}

impl CacheRecord {
    /// Snapshot a response body, stamping it with the current time.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        let body_sha256 = compute_body_digest(&body);
        Self { status, headers, body, body_sha256, fetched_at: chrono::Utc::now().to_rfc3339() }
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether the body still matches the digest taken when it was stored.
    pub fn is_intact(&self) -> bool {
        compute_body_digest(&self.body) == self.body_sha256
    }
}

impl CacheStore {
    /// Look up the record stored under `key`.
    ///
    /// Returns None if this store has no record for the key.
    pub async fn get(&self, key: &str) -> Result<Option<CacheRecord>, Error> {
        let store = self.name.clone();
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<CacheRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body, body_sha256, fetched_at
                     FROM cache_records WHERE store_name = ?1 AND resource_key = ?2",
                )?;

                let result = stmt.query_row(params![store, key], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                });

                let (status, headers_json, body, body_sha256, fetched_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::CorruptRecord(format!("{store}:{key}: {e}")))?;

                Ok(Some(CacheRecord { status, headers, body, body_sha256, fetched_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the record stored under `key`.
    ///
    /// Fails with `Error::UnknownStore` if the store was deleted after it
    /// was opened.
    pub async fn put(&self, key: &str, record: &CacheRecord) -> Result<(), Error> {
        let store = self.name.clone();
        let key = key.to_string();
        let record = record.clone();
        let headers_json = serde_json::to_string(&record.headers)
            .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)",
                    params![store],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::UnknownStore(store));
                }

                conn.execute(
                    "INSERT INTO cache_records (
                        store_name, resource_key, status, headers_json, body, body_sha256, fetched_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(store_name, resource_key) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        body_sha256 = excluded.body_sha256,
                        fetched_at = excluded.fetched_at",
                    params![
                        &store,
                        &key,
                        record.status,
                        &headers_json,
                        &record.body,
                        &record.body_sha256,
                        &record.fetched_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the record stored under `key`.
    ///
    /// Returns true if a record was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        let store = self.name.clone();
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_records WHERE store_name = ?1 AND resource_key = ?2",
                    params![store, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Resource keys held by this store, sorted.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT resource_key FROM cache_records WHERE store_name = ?1 ORDER BY resource_key")?;
                let keys = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of records in this store.
    pub async fn len(&self) -> Result<usize, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_records WHERE store_name = ?1",
                    params![store],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}
