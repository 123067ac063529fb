//! Process-wide singleton settings.

use std::path::Path;

use super::{JsonFile, StoreError};

/// One settings document with a typed default.
pub struct SettingStore<T> {
    file: JsonFile<T>,
}

impl<T> SettingStore<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Default + Clone,
{
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            file: JsonFile::new(dir, file_name),
        }
    }

    pub fn get(&self) -> Result<T, StoreError> {
        self.file.read(Clone::clone)
    }

    pub fn set(&self, value: T) -> Result<(), StoreError> {
        self.file.update(|current| *current = value)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        self.file.update(f)
    }
}

/// Command prefixes; an empty file means "use the configured defaults".
pub struct PrefixStore {
    file: JsonFile<Vec<char>>,
    defaults: Vec<char>,
}

impl PrefixStore {
    pub fn new(dir: &Path, defaults: Vec<char>) -> Self {
        Self {
            file: JsonFile::new(dir, "prefixes.json"),
            defaults,
        }
    }

    pub fn get(&self) -> Result<Vec<char>, StoreError> {
        self.file.read(|stored| {
            if stored.is_empty() {
                self.defaults.clone()
            } else {
                stored.clone()
            }
        })
    }

    pub fn set(&self, prefixes: Vec<char>) -> Result<(), StoreError> {
        self.file.update(|stored| *stored = prefixes)
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.set(Vec::new())
    }
}
