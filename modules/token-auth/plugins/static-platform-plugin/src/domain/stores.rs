use std::collections::{HashMap, HashSet};

use token_auth_sdk::platform::{CertificateStore, StoreHandle};
use token_auth_sdk::{PlatformError, StoreName, Thumbprint};

use super::codes::CRYPT_E_NOT_FOUND;
use super::stats::StatsRecorder;

/// Fixed store contents.
pub struct StaticCertificateStore {
    contents: HashMap<StoreName, HashSet<Thumbprint>>,
    unavailable: HashSet<StoreName>,
    stats: StatsRecorder,
}

impl StaticCertificateStore {
    pub(crate) fn new(
        contents: HashMap<StoreName, HashSet<Thumbprint>>,
        unavailable: HashSet<StoreName>,
        stats: StatsRecorder,
    ) -> Self {
        Self {
            contents,
            unavailable,
            stats,
        }
    }
}

struct StaticStoreHandle<'a> {
    store: StoreName,
    entries: Option<&'a HashSet<Thumbprint>>,
    stats: &'a StatsRecorder,
}

impl StoreHandle for StaticStoreHandle<'_> {
    fn contains(&self, thumbprint: &Thumbprint) -> bool {
        self.entries.is_some_and(|entries| entries.contains(thumbprint))
    }
}

impl Drop for StaticStoreHandle<'_> {
    fn drop(&mut self) {
        self.stats.update(|s| s.store_handles_open -= 1);
        tracing::trace!(store = %self.store, "store closed");
    }
}

impl CertificateStore for StaticCertificateStore {
    fn open(&self, store: StoreName) -> Result<Box<dyn StoreHandle + '_>, PlatformError> {
        if self.unavailable.contains(&store) {
            return Err(PlatformError::new(
                "open_store",
                CRYPT_E_NOT_FOUND,
                format!("store '{store}' is unavailable"),
            ));
        }

        self.stats.update(|s| {
            s.store_handles_opened += 1;
            s.store_handles_open += 1;
        });
        tracing::trace!(%store, "store opened");
        Ok(Box::new(StaticStoreHandle {
            store,
            entries: self.contents.get(&store),
            stats: &self.stats,
        }))
    }
}
