use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Result of a create-if-absent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The mapping was written
    Created,
    /// A mapping with the same short path already exists and was left untouched
    Conflict,
}

/// Storage for short path → long URL mappings
///
/// Implementations report store failures as `Err` instead of folding them into
/// "not found", so each handler decides how to degrade.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Look up the long URL for `short_path`.
    ///
    /// # Returns
    /// * `Ok(Some(url))` - Mapping found
    /// * `Ok(None)` - No mapping for this short path
    /// * `Err(_)` - The store could not be queried
    async fn fetch(&self, short_path: &str) -> Result<Option<String>>;

    /// Atomically create `short_path → long_url` unless the key already exists.
    /// Existing mappings are never overwritten.
    async fn create(&self, short_path: &str, long_url: &str) -> Result<CreateOutcome>;

    /// Verify the store is reachable
    async fn health_check(&self) -> Result<()>;
}

/// In-memory link store backed by `DashMap`
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    links: DashMap<String, String>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.links.len()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn fetch(&self, short_path: &str) -> Result<Option<String>> {
        Ok(self.links.get(short_path).map(|url| url.value().clone()))
    }

    async fn create(&self, short_path: &str, long_url: &str) -> Result<CreateOutcome> {
        // The entry guard holds the shard lock, so check and insert are one step.
        match self.links.entry(short_path.to_string()) {
            Entry::Occupied(_) => Ok(CreateOutcome::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(long_url.to_string());
                tracing::debug!("Created in-memory link: {}", short_path);
                Ok(CreateOutcome::Created)
            }
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
