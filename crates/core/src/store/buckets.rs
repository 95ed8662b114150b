//! Bucket lifecycle operations.
//!
//! A bucket is the unit of cache versioning. Install creates and populates
//! one; activate deletes every other one. Individual entries are never
//! evicted, only whole buckets.

use super::connection::BucketStore;
use crate::Error;
use tokio_rusqlite::params;

impl BucketStore {
    /// Create a bucket if it doesn't already exist.
    pub async fn create_bucket(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all existing buckets.
    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every bucket whose name differs from `keep`, entries included.
    ///
    /// Runs as a single statement; entry rows go with their bucket via
    /// cascading deletion. Returns the number of deleted buckets.
    pub async fn delete_buckets_except(&self, keep: &str) -> Result<u64, Error> {
        let keep = keep.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = conn.execute("DELETE FROM buckets WHERE name != ?1", params![keep])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
