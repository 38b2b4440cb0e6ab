use crate::config::ServerConfig;
use analytics_columnar::Dataset;
use analytics_storage::Storage;
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("No data loaded")]
pub struct NoDataLoaded;

#[derive(Debug, Default)]
enum WorkingDataset {
    #[default]
    Empty,
    Loaded {
        original: Arc<Dataset>,
        current: Arc<Dataset>,
    },
}

/// The process-wide dataset every data operation reads and replaces.
///
/// Updates are serialized by a writer gate; the computation runs against a
/// snapshot and is published by swapping the `Arc`, so readers never observe a
/// half-applied operation and a failed update publishes nothing.
#[derive(Debug, Default)]
pub struct WorkingSet {
    inner: RwLock<WorkingDataset>,
    writer: Mutex<()>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is loaded; `dataset` becomes both original and current.
    pub fn load(&self, dataset: Dataset) -> Arc<Dataset> {
        let _gate = self.writer.lock().expect("working set writer mutex poisoned");
        let dataset = Arc::new(dataset);
        log::info!(
            "working dataset loaded: {} rows x {} columns",
            dataset.row_count(),
            dataset.column_count()
        );
        *self.inner.write().expect("working set lock poisoned") = WorkingDataset::Loaded {
            original: Arc::clone(&dataset),
            current: Arc::clone(&dataset),
        };
        dataset
    }

    pub fn snapshot(&self) -> Result<Arc<Dataset>, NoDataLoaded> {
        match &*self.inner.read().expect("working set lock poisoned") {
            WorkingDataset::Empty => Err(NoDataLoaded),
            WorkingDataset::Loaded { current, .. } => Ok(Arc::clone(current)),
        }
    }

    pub fn original(&self) -> Result<Arc<Dataset>, NoDataLoaded> {
        match &*self.inner.read().expect("working set lock poisoned") {
            WorkingDataset::Empty => Err(NoDataLoaded),
            WorkingDataset::Loaded { original, .. } => Ok(Arc::clone(original)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_ok()
    }

    /// Derive a new current dataset from the published one.
    pub fn update<E, F>(&self, f: F) -> Result<Arc<Dataset>, E>
    where
        E: From<NoDataLoaded>,
        F: FnOnce(&Dataset) -> Result<Dataset, E>,
    {
        let _gate = self.writer.lock().expect("working set writer mutex poisoned");
        let snapshot = self.snapshot()?;
        let next = Arc::new(f(&snapshot)?);

        let mut inner = self.inner.write().expect("working set lock poisoned");
        if let WorkingDataset::Loaded { current, .. } = &mut *inner {
            *current = Arc::clone(&next);
        }
        log::debug!(
            "working dataset updated: {} rows x {} columns",
            next.row_count(),
            next.column_count()
        );
        Ok(next)
    }

    pub fn clear(&self) {
        let _gate = self.writer.lock().expect("working set writer mutex poisoned");
        *self.inner.write().expect("working set lock poisoned") = WorkingDataset::Empty;
        log::info!("working dataset cleared");
    }
}

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    pub working: WorkingSet,
    pub storage: Storage,
    pub config: ServerConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(storage: Storage, config: ServerConfig) -> SharedState {
        Arc::new(Self {
            working: WorkingSet::new(),
            storage,
            config,
        })
    }

    pub fn preview_rows(&self) -> usize {
        self.config.preview_rows
    }
}
