use crate::dataset::Dataset;
use crate::error::SalesError;
use crate::loader::Loader;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loaded datasets keyed by source path.
///
/// Entries are never refreshed on their own; call [`DatasetCache::reload`] or
/// [`DatasetCache::invalidate`] when the file on disk changes.
pub struct DatasetCache<L: Loader> {
    loader: L,
    entries: HashMap<PathBuf, Arc<Dataset>>,
}

impl<L: Loader> DatasetCache<L> {
    pub fn new(loader: L) -> Self {
        DatasetCache {
            loader,
            entries: HashMap::new(),
        }
    }

    pub fn get_or_load<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<Dataset>, SalesError> {
        let path = path.as_ref();
        if let Some(dataset) = self.entries.get(path) {
            debug!("cache hit: {:?}", path);
            return Ok(Arc::clone(dataset));
        }
        debug!("cache miss: {:?}", path);
        self.reload(path)
    }

    /// Loads `path` again and replaces the memoized entry. On failure the
    /// previous entry, if any, is dropped as well.
    pub fn reload<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<Dataset>, SalesError> {
        let path = path.as_ref();
        self.entries.remove(path);
        let dataset = Arc::new(self.loader.load(path)?);
        info!("cached {} rows for {:?}", dataset.len(), path);
        self.entries.insert(path.to_path_buf(), Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Returns true when an entry was removed.
    pub fn invalidate<P: AsRef<Path>>(&mut self, path: P) -> bool {
        self.entries.remove(path.as_ref()).is_some()
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
