//! Durable key/value storage for client preferences.
//!
//! One file per key under the platform data directory on native targets;
//! the browser's `localStorage` on wasm32, where the page has no filesystem.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create storage directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write to storage: {0}")]
    Write(std::io::Error),

    #[error("Storage is unavailable")]
    Unavailable,
}

#[derive(Clone, Debug)]
pub struct PreferenceStore {
    root: PathBuf,
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new(default_root())
    }
}

fn default_root() -> PathBuf {
    match dirs::data_local_dir() {
        Some(data_dir) => data_dir.join("streamdesk").join("preferences"),
        None => PathBuf::from("cache").join("preferences"),
    }
}

/// Keep keys safe as file names.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect()
}

impl PreferenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    fn file_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.txt", sanitize_key(key)))
    }
}

/// `localStorage` is already scoped to the page's origin, so keys go in bare.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn local_storage_key(key: &str) -> String {
    sanitize_key(key)
}

#[cfg(not(target_arch = "wasm32"))]
impl PreferenceStore {
    pub fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.file_for(key)).ok()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.root).map_err(StorageError::CreateDir)?;
        std::fs::write(self.file_for(key), value).map_err(StorageError::Write)
    }
}

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

#[cfg(target_arch = "wasm32")]
impl PreferenceStore {
    pub fn get(&self, key: &str) -> Option<String> {
        local_storage()?.get_item(&local_storage_key(key)).ok()?
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = local_storage().ok_or(StorageError::Unavailable)?;
        storage
            .set_item(&local_storage_key(key), value)
            .map_err(|_| StorageError::Unavailable)
    }
}
