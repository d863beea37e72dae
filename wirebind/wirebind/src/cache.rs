//! Process-wide schema cache.
//!
//! Bound graphs are built once per type name and reused by every later
//! call. Building happens outside the write lock (it is pure and touches
//! no shared state), and a first-build race is resolved first-writer-wins:
//! losers drop their graph and adopt the installed one. A reader can never
//! observe a partially bound entry, and entries are never evicted or
//! mutated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use crate::{bind::Schema, error::BindError, spec::StructSpec};

static CACHE: OnceLock<RwLock<HashMap<Arc<str>, Arc<Schema>>>> = OnceLock::new();
static BIND_COUNT: AtomicUsize = AtomicUsize::new(0);

fn cache() -> &'static RwLock<HashMap<Arc<str>, Arc<Schema>>> {
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Number of successful graph builds performed by this process. A repeated
/// call for an already-cached type leaves this unchanged.
pub fn schema_bind_count() -> usize {
    BIND_COUNT.load(Ordering::Relaxed)
}

impl Schema {
    /// Return the cached graph for `spec`'s name, binding it on first use.
    ///
    /// The cache keys on the root name only; callers own name uniqueness.
    /// A bind failure caches nothing, so a corrected description binds
    /// cleanly on the next call.
    pub fn bind(spec: &StructSpec) -> Result<Arc<Self>, BindError> {
        {
            let map = cache().read().expect("schema cache lock poisoned");
            if let Some(schema) = map.get(&spec.name) {
                return Ok(schema.clone());
            }
        }

        let built = Arc::new(Self::bind_uncached(spec)?);
        BIND_COUNT.fetch_add(1, Ordering::Relaxed);

        let mut map = cache().write().expect("schema cache lock poisoned");
        let entry = map.entry(spec.name.clone()).or_insert_with(|| {
            log::debug!("bound schema '{}'", spec.name);
            built.clone()
        });
        Ok(entry.clone())
    }
}
