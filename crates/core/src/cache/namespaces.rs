//! Versioned cache partitions.
//!
//! A namespace is identified by a deployment version string. Opening one
//! creates it if needed; deleting one drops all of its entries. Reads already
//! materialized from a namespace are unaffected by a later delete.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

/// Handle to a single cache namespace.
#[derive(Clone, Debug)]
pub struct Namespace {
    pub(crate) db: CacheDb,
    pub(crate) name: String,
}

impl Namespace {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }
}

impl CacheDb {
    /// Open a namespace, creating it if it does not exist.
    pub async fn open_namespace(&self, name: &str) -> Result<Namespace, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("namespace name must not be empty".into()));
        }
        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
                    params![owned, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Namespace { db: self.clone(), name: name.to_string() })
    }

    /// Get a handle to an existing namespace without creating it.
    pub async fn existing_namespace(&self, name: &str) -> Result<Option<Namespace>, Error> {
        if self.has_namespace(name).await? {
            Ok(Some(Namespace { db: self.clone(), name: name.to_string() }))
        } else {
            Ok(None)
        }
    }

    pub async fn has_namespace(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM namespaces WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether `name` exists and finished its install.
    pub async fn is_installed(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let installed: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM namespaces WHERE name = ?1 AND installed_at IS NOT NULL)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(installed)
            })
            .await
            .map_err(Error::from)
    }

    /// Most recently installed namespace. Namespaces whose install never
    /// completed are skipped.
    pub async fn latest_installed(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM namespaces WHERE installed_at IS NOT NULL
                     ORDER BY installed_at DESC, created_at DESC, name DESC LIMIT 1",
                )?;
                let mut rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                Ok(rows.next().transpose()?)
            })
            .await
            .map_err(Error::from)
    }

    /// List all namespace names, oldest first.
    pub async fn namespaces(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM namespaces ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a namespace and all of its entries.
    ///
    /// Returns whether anything was deleted. Deleting an absent namespace is a no-op.
    pub async fn delete_namespace(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE namespace = ?1", params![name])?;
                let count = tx.execute("DELETE FROM namespaces WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_namespace() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let ns = db.open_namespace("v1").await.unwrap();
        assert_eq!(ns.name(), "v1");
        assert_eq!(db.namespaces().await.unwrap(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_namespace("v1").await.unwrap();
        db.open_namespace("v1").await.unwrap();
        assert_eq!(db.namespaces().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_empty_name_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(matches!(db.open_namespace("").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete_namespace() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_namespace("v1").await.unwrap();
        db.open_namespace("v2").await.unwrap();

        assert!(db.delete_namespace("v1").await.unwrap());
        assert!(!db.delete_namespace("v1").await.unwrap());
        assert_eq!(db.namespaces().await.unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_existing_namespace() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.existing_namespace("v1").await.unwrap().is_none());
        db.open_namespace("v1").await.unwrap();
        assert!(db.existing_namespace("v1").await.unwrap().is_some());
        assert!(!db.has_namespace("v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_latest_installed_skips_incomplete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.latest_installed().await.unwrap(), None);

        db.open_namespace("v1").await.unwrap().seal_install(Vec::new()).await.unwrap();
        db.open_namespace("v2").await.unwrap();

        assert_eq!(db.latest_installed().await.unwrap().as_deref(), Some("v1"));
        assert!(db.is_installed("v1").await.unwrap());
        assert!(!db.is_installed("v2").await.unwrap());
    }
}
