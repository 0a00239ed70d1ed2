use std::{
    io::ErrorKind,
    marker::PhantomData,
    path::PathBuf,
    sync::Arc,
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Generic JSON file-backed document store.
///
/// Every read loads the complete file and every mutation rewrites it
/// (load, mutate in memory, persist). Mutations on one store are serialized by
/// a mutex so two concurrent read-modify-write cycles cannot lose each other's
/// changes. Saves write a sibling `.tmp` file and rename it over the document,
/// so a reader sees either the previous or the next document, never a torn one.
///
/// Separate processes sharing one file are not coordinated: the last rename wins.
pub struct JsonDocumentStore<T> {
    file_path: PathBuf,
    write_lock: Mutex<()>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonDocumentStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Open the store at `path`. Creates parent directories and writes
    /// `T::default()` when the file is missing. An existing file is left as is.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(ServiceError::storage)?;
            }
        }

        let store = Self { file_path, write_lock: Mutex::new(()), _doc: PhantomData };
        if fs::metadata(&store.file_path).await.is_err() {
            store.write_document(&T::default()).await?;
            debug!(path = %store.file_path.display(), "initialized empty document");
        }
        Ok(Arc::new(store))
    }

    /// Read and parse the whole document. A missing file reads as the default
    /// document; a file that does not parse is `StorageUnavailable`.
    pub async fn load(&self) -> Result<T, ServiceError> {
        match fs::read(&self.file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                warn!(path = %self.file_path.display(), error = %e, "document is not valid JSON");
                ServiceError::StorageUnavailable(format!("{}: {}", self.file_path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(ServiceError::storage(e)),
        }
    }

    /// Apply a mutation to a freshly loaded document and persist the result.
    ///
    /// When `f` fails nothing is written and the error is returned unchanged.
    pub async fn update<F, R>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut T) -> Result<R, ServiceError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        let out = f(&mut doc)?;
        self.write_document(&doc).await?;
        Ok(out)
    }

    async fn write_document(&self, doc: &T) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(doc).map_err(ServiceError::storage)?;
        let tmp = self.temp_path();
        fs::write(&tmp, data).await.map_err(ServiceError::storage)?;
        fs::rename(&tmp, &self.file_path).await.map_err(ServiceError::storage)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}
