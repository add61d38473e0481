//! Viewer settings persisted to the key-value store.

use std::fmt;
use std::sync::Arc;

use mangashelf_model::{ViewerSettings, ViewerSettingsPatch};
use tokio::sync::RwLock;

use crate::storage::KeyValueStore;

/// Storage key of the settings blob.
pub const SETTINGS_KEY: &str = "pdfViewerSettings";

/// Owns the in-memory settings record and its persisted copy.
///
/// Last writer wins; mutations are serialized by the internal lock.
pub struct SettingsStore {
    storage: Arc<dyn KeyValueStore>,
    defaults: ViewerSettings,
    current: RwLock<ViewerSettings>,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl SettingsStore {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        defaults: ViewerSettings,
    ) -> Self {
        Self {
            storage,
            current: RwLock::new(defaults.clone()),
            defaults,
        }
    }

    pub fn defaults(&self) -> &ViewerSettings {
        &self.defaults
    }

    /// In-memory record as of the last successful load or save.
    pub async fn current(&self) -> ViewerSettings {
        self.current.read().await.clone()
    }

    /// Reads the persisted record and merges it over the defaults.
    ///
    /// Never fails: read or parse errors are logged and the in-memory record
    /// (the defaults, until something loads) is returned unchanged.
    pub async fn load(&self) -> ViewerSettings {
        let mut current = self.current.write().await;
        let raw = match self.storage.get(SETTINGS_KEY).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Error loading viewer settings: {}", e);
                return current.clone();
            }
        };

        let loaded = match raw {
            None => self.defaults.clone(),
            Some(raw) => match serde_json::from_str::<ViewerSettingsPatch>(&raw)
            {
                Ok(patch) => self.defaults.merged(&patch),
                Err(e) => {
                    tracing::error!("Error parsing viewer settings: {}", e);
                    return current.clone();
                }
            },
        };
        *current = loaded.clone();
        loaded
    }

    /// Merges `patch` over the current record and persists the result.
    ///
    /// Returns false and leaves the in-memory record untouched when the
    /// write fails; reporting that to the user is the caller's job.
    pub async fn save(&self, patch: &ViewerSettingsPatch) -> bool {
        let mut current = self.current.write().await;
        let updated = current.merged(patch);

        let json = match serde_json::to_string(&updated) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Error serializing viewer settings: {}", e);
                return false;
            }
        };
        if let Err(e) = self.storage.set(SETTINGS_KEY, &json).await {
            tracing::error!("Error saving viewer settings: {}", e);
            return false;
        }

        tracing::debug!(?updated, "viewer settings saved");
        *current = updated;
        true
    }

    /// Deletes the persisted record and reverts to the defaults.
    pub async fn reset(&self) -> bool {
        let mut current = self.current.write().await;
        if let Err(e) = self.storage.remove(SETTINGS_KEY).await {
            tracing::error!("Error resetting viewer settings: {}", e);
            return false;
        }
        *current = self.defaults.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;
    use std::path::PathBuf;

    fn store_with(kv: &MemoryKvStore) -> SettingsStore {
        SettingsStore::new(
            Arc::new(kv.clone()),
            ViewerSettings::with_library_folder("/library"),
        )
    }

    #[tokio::test]
    async fn load_without_persisted_record_returns_defaults() {
        let kv = MemoryKvStore::new();
        let store = store_with(&kv);
        assert_eq!(store.load().await, *store.defaults());
    }

    #[tokio::test]
    async fn save_merges_instead_of_overwriting() {
        let kv = MemoryKvStore::new();
        let store = store_with(&kv);
        assert!(
            store
                .save(&ViewerSettingsPatch {
                    show_page_indicator: Some(false),
                    ..Default::default()
                })
                .await
        );
        assert!(
            store
                .save(&ViewerSettingsPatch {
                    distance_between_pages: Some(12),
                    ..Default::default()
                })
                .await
        );

        let reloaded = store_with(&kv).load().await;
        assert_eq!(reloaded.distance_between_pages, 12);
        assert!(!reloaded.show_page_indicator);
        assert_eq!(reloaded.default_library_folder, PathBuf::from("/library"));
    }

    #[tokio::test]
    async fn older_blobs_backfill_new_fields_from_defaults() {
        let kv = MemoryKvStore::new();
        kv.insert_raw(
            SETTINGS_KEY,
            r#"{"showPageIndicator": false,
                "defaultPDFFolder": "/sdcard/manga"}"#,
        );
        let loaded = store_with(&kv).load().await;
        assert!(!loaded.show_page_indicator);
        assert_eq!(loaded.distance_between_pages, 0);
        assert_eq!(
            loaded.default_library_folder,
            PathBuf::from("/sdcard/manga")
        );
    }

    #[tokio::test]
    async fn failed_save_keeps_memory_unchanged() {
        let kv = MemoryKvStore::new();
        let store = store_with(&kv);
        kv.set_fail_writes(true);

        let saved = store
            .save(&ViewerSettingsPatch {
                distance_between_pages: Some(40),
                ..Default::default()
            })
            .await;

        assert!(!saved);
        assert_eq!(store.current().await.distance_between_pages, 0);
        assert!(kv.raw(SETTINGS_KEY).is_none());
    }

    #[tokio::test]
    async fn corrupt_blob_falls_back_softly() {
        let kv = MemoryKvStore::new();
        kv.insert_raw(SETTINGS_KEY, "{not json");
        let store = store_with(&kv);
        assert_eq!(store.load().await, *store.defaults());

        kv.set_fail_reads(true);
        assert_eq!(store.load().await, *store.defaults());
    }

    #[tokio::test]
    async fn reset_removes_record_and_restores_defaults() {
        let kv = MemoryKvStore::new();
        let store = store_with(&kv);
        store
            .save(&ViewerSettingsPatch {
                distance_between_pages: Some(8),
                ..Default::default()
            })
            .await;

        assert!(store.reset().await);
        assert!(kv.raw(SETTINGS_KEY).is_none());
        assert_eq!(store.current().await, *store.defaults());
    }

    #[tokio::test]
    async fn failed_reset_reports_false() {
        let kv = MemoryKvStore::new();
        let store = store_with(&kv);
        store
            .save(&ViewerSettingsPatch {
                distance_between_pages: Some(8),
                ..Default::default()
            })
            .await;
        kv.set_fail_writes(true);

        assert!(!store.reset().await);
        assert_eq!(store.current().await.distance_between_pages, 8);
    }
}
