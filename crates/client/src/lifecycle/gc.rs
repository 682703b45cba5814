//! Version garbage collection.

use shellcache_core::{CacheDb, Error};

/// Delete every namespace except `current`.
///
/// Returns the retired namespace names. Idempotent: a second run retires
/// nothing. Entries already read from a retired namespace stay valid in the
/// caller's hands; only future lookups stop seeing them.
pub async fn collect_garbage(db: &CacheDb, current: &str) -> Result<Vec<String>, Error> {
    let mut retired = Vec::new();
    for name in db.namespaces().await? {
        if name == current {
            continue;
        }
        if db.delete_namespace(&name).await? {
            retired.push(name);
        }
    }

    if !retired.is_empty() {
        tracing::info!(current, retired = ?retired, "retired stale cache namespaces");
    }

    Ok(retired)
}
