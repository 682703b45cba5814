//! Cache entry operations within a namespace.
//!
//! Entries are keyed by full request URL. Each write runs in its own SQLite
//! transaction, so a write is either fully visible or not at all, and
//! concurrent writes to the same key resolve as last-write-wins.

use super::hash::compute_digest;
use super::namespaces::Namespace;
use crate::{Error, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub response: Response,
    /// SHA-256 of the body, hex encoded.
    pub digest: String,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
}

fn write_err(err: rusqlite::Error) -> Error {
    Error::CacheWrite(err.to_string())
}

impl Namespace {
    /// Look up the entry stored under `url`.
    ///
    /// Returns `None` on a miss, and also when the stored body no longer
    /// matches its digest.
    pub async fn match_url(&self, url: &str) -> Result<Option<CacheEntry>, Error> {
        let name = self.name.clone();
        let url = url.to_string();
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, headers_json, body, opaque, digest, stored_at
                     FROM entries WHERE namespace = ?1 AND url = ?2",
                )?;

                let result = stmt.query_row(params![name, url], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, i32>(4)? == 1,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                let (url, status, headers_json, body, opaque, digest, stored_at) = match result {
                    Ok(r) => r,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::InvalidInput(format!("corrupt headers for {url}: {e}")))?;
                let status = u16::try_from(status).unwrap_or_default();
                let response = Response { status, headers, body: Bytes::from(body), opaque };

                Ok(Some(CacheEntry { url, response, digest, stored_at }))
            })
            .await
            .map_err(Error::from)?;

        match row {
            Some(entry) if compute_digest(&entry.response.body) != entry.digest => {
                tracing::warn!(namespace = %self.name, url = %entry.url, "cache entry failed digest check; treating as miss");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Read-only existence probe. Never loads the body.
    pub async fn contains(&self, url: &str) -> Result<bool, Error> {
        let name = self.name.clone();
        let url = url.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM entries WHERE namespace = ?1 AND url = ?2)",
                    params![name, url],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response under `url`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheWrite`] when the quota would be exceeded, when the
    /// namespace has been retired, or when the write itself fails. Callers
    /// serving a response should log and carry on.
    pub async fn put(&self, url: &str, response: &Response) -> Result<(), Error> {
        self.put_all(vec![(url.to_string(), response.clone())]).await
    }

    /// Store several responses in one transaction. Either all are written or none.
    pub async fn put_all(&self, items: Vec<(String, Response)>) -> Result<(), Error> {
        self.write_batch(items, false).await
    }

    /// Store a version's critical assets and mark the namespace installed, atomically.
    ///
    /// Only installed namespaces are eligible to serve after a restart.
    pub async fn seal_install(&self, items: Vec<(String, Response)>) -> Result<(), Error> {
        self.write_batch(items, true).await
    }

    async fn write_batch(&self, items: Vec<(String, Response)>, seal: bool) -> Result<(), Error> {
        if let Some((url, _)) = items.iter().find(|(_, r)| !r.is_cacheable()) {
            return Err(Error::InvalidInput(format!("refusing to cache non-cacheable response for {url}")));
        }
        if items.is_empty() && !seal {
            return Ok(());
        }

        let name = self.name.clone();
        let quota = self.db.quota_bytes;
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction().map_err(write_err)?;

                let exists: bool = tx
                    .query_row("SELECT EXISTS(SELECT 1 FROM namespaces WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })
                    .map_err(write_err)?;
                if !exists {
                    return Err(Error::CacheWrite(format!("namespace {name} no longer exists")));
                }

                for (url, response) in &items {
                    let headers_json =
                        serde_json::to_string(&response.headers).map_err(|e| Error::CacheWrite(e.to_string()))?;
                    tx.execute(
                        "INSERT INTO entries (
                            namespace, url, status, headers_json, body, opaque, digest, size, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        ON CONFLICT(namespace, url) DO UPDATE SET
                            status = excluded.status,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            opaque = excluded.opaque,
                            digest = excluded.digest,
                            size = excluded.size,
                            stored_at = excluded.stored_at",
                        params![
                            &name,
                            url,
                            response.status as i64,
                            headers_json,
                            &response.body[..],
                            response.opaque as i32,
                            compute_digest(&response.body),
                            response.body.len() as i64,
                            &stored_at,
                        ],
                    )
                    .map_err(write_err)?;
                }

                if let Some(quota) = quota {
                    let usage: i64 = tx
                        .query_row(
                            "SELECT COALESCE(SUM(size), 0) FROM entries WHERE namespace = ?1",
                            params![name],
                            |row| row.get(0),
                        )
                        .map_err(write_err)?;
                    if usage as u64 > quota {
                        return Err(Error::CacheWrite(format!(
                            "quota exceeded for {name}: {usage} bytes > {quota}"
                        )));
                    }
                }

                if seal {
                    tx.execute(
                        "UPDATE namespaces SET installed_at = ?1 WHERE name = ?2",
                        params![&stored_at, &name],
                    )
                    .map_err(write_err)?;
                }

                tx.commit().map_err(write_err)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a single entry. Returns whether it existed.
    pub async fn delete_entry(&self, url: &str) -> Result<bool, Error> {
        let name = self.name.clone();
        let url = url.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE namespace = ?1 AND url = ?2", params![name, url])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All stored URLs, in key order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE namespace = ?1 ORDER BY url ASC")?;
                let keys = stmt
                    .query_map(params![name], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Total body bytes stored in this namespace.
    pub async fn usage_bytes(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let usage: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(size), 0) FROM entries WHERE namespace = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(usage as u64)
            })
            .await
            .map_err(Error::from)
    }
}
