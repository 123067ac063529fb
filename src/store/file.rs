//! A single JSON document on disk, loaded lazily and written through.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, warn};

use super::StoreError;

/// JSON file holding one value of `T`.
///
/// The parsed value is kept in memory after the first read. Every mutation
/// goes through [`JsonFile::update`], which holds the file's lock for the
/// whole read-modify-write so concurrent updates in this process never lose
/// each other's changes. The in-memory value only changes once the write
/// to disk succeeded.
pub struct JsonFile<T> {
    path: PathBuf,
    state: Mutex<Option<T>>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            path: dir.join(file_name),
            state: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the current value.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, StoreError> {
        let mut slot = self.state.lock();
        let value = self.loaded(&mut slot)?;
        Ok(f(value))
    }

    /// Apply `f` to a copy of the current value, persist it, then publish it.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        let mut slot = self.state.lock();
        let mut next = self.loaded(&mut slot)?.clone();
        let result = f(&mut next);
        self.write(&next)?;
        *slot = Some(next);
        Ok(result)
    }

    fn loaded<'a>(&self, slot: &'a mut Option<T>) -> Result<&'a T, StoreError> {
        let value = match slot.take() {
            Some(value) => value,
            None => self.load()?,
        };
        Ok(slot.insert(value))
    }

    fn load(&self) -> Result<T, StoreError> {
        let raw = match off_worker(|| fs::read_to_string(&self.path)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(T::default());
        }

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Loaded {}", self.path.display());
                Ok(value)
            }
            Err(e) => {
                warn!(
                    "Unreadable store file {} ({}), starting from defaults",
                    self.path.display(),
                    e
                );
                Ok(T::default())
            }
        }
    }

    fn write(&self, value: &T) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        off_worker(|| {
            fs::write(&tmp, json)?;
            fs::rename(&tmp, &self.path)
        })
        .map_err(io_err)
    }
}

/// Run blocking file I/O. On a multi-thread runtime the worker hands its
/// other tasks off first; elsewhere `f` just runs.
fn off_worker<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_missing_file_reads_default() {
        let dir = tempfile::tempdir().unwrap();
        let file: JsonFile<Vec<String>> = JsonFile::new(dir.path(), "list.json");
        assert_eq!(file.read(|v| v.len()).unwrap(), 0);
        assert!(!file.path().exists());
    }

    #[test]
    fn test_update_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let file: JsonFile<HashMap<String, u32>> = JsonFile::new(dir.path(), "counts.json");
        file.update(|m| m.insert("a".into(), 2)).unwrap();

        let reopened: JsonFile<HashMap<String, u32>> = JsonFile::new(dir.path(), "counts.json");
        assert_eq!(reopened.read(|m| m.get("a").copied()).unwrap(), Some(2));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let file: JsonFile<Vec<String>> = JsonFile::new(dir.path(), "bad.json");
        assert!(file.read(|v| v.is_empty()).unwrap());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let file: Arc<JsonFile<HashMap<String, u32>>> =
            Arc::new(JsonFile::new(dir.path(), "counts.json"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let file = Arc::clone(&file);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        file.update(|m| *m.entry("n".into()).or_insert(0) += 1)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let reopened: JsonFile<HashMap<String, u32>> = JsonFile::new(dir.path(), "counts.json");
        assert_eq!(reopened.read(|m| m["n"]).unwrap(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_updates_from_runtime_workers() {
        let dir = tempfile::tempdir().unwrap();
        let file: Arc<JsonFile<HashMap<String, u32>>> =
            Arc::new(JsonFile::new(dir.path(), "counts.json"));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let file = Arc::clone(&file);
                tokio::spawn(async move {
                    for _ in 0..10 {
                        file.update(|m| *m.entry("n".into()).or_insert(0) += 1)
                            .unwrap();
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(file.read(|m| m["n"]).unwrap(), 40);
    }

    #[tokio::test]
    async fn test_update_on_current_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let file: JsonFile<Vec<String>> = JsonFile::new(dir.path(), "list.json");
        file.update(|v| v.push("x".into())).unwrap();
        assert!(file.path().exists());
    }
}
