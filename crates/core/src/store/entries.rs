//! Stored response CRUD operations.
//!
//! Provides functions for writing and reading the response snapshots held
//! inside a bucket. Entries are never deleted individually; they go away
//! with their bucket.

use super::connection::BucketStore;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response snapshot stored in a bucket.
///
/// Headers are kept as ordered name/value pairs so the snapshot can be
/// replayed to a caller unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl BucketStore {
    /// Insert or update an entry in the named bucket.
    ///
    /// Uses UPSERT semantics on (bucket, key). Fails if the bucket does not
    /// exist; buckets are created by install, never implicitly.
    pub async fn put_entry(&self, bucket: &str, entry: &StoredResponse) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let entry = entry.clone();
        let headers_json =
            serde_json::to_string(&entry.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                    bucket, key, method, url, status, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(bucket, key) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        bucket,
                        entry.key,
                        entry.method,
                        entry.url,
                        entry.status,
                        headers_json,
                        entry.body,
                        entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry from the named bucket by key.
    ///
    /// Returns None if the key doesn't exist in that bucket.
    pub async fn get_entry(&self, bucket: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, method, url, status, headers_json, body, stored_at
                FROM entries WHERE bucket = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![bucket, key], |row| {
                    let headers_json: String = row.get(4)?;
                    Ok(StoredResponse {
                        key: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get(3)?,
                        headers: serde_json::from_str(&headers_json).unwrap_or_default(),
                        body: row.get(5)?,
                        stored_at: row.get(6)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the named bucket.
    pub async fn count_entries(&self, bucket: &str) -> Result<u64, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE bucket = ?1",
                    params![bucket],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
