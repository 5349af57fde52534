//! Load-once artifact cache.
//!
//! Loading parses and validates whole tree ensembles, which costs far more than
//! a prediction, so artifacts are loaded once and then shared read-only. The
//! mutex is held across the load itself: concurrent first callers wait for the
//! one load in flight instead of starting their own.
//!
//! A failed load is not cached; the next caller retries it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::domain::{FeatureContract, IndicatorSchema};
use crate::error::PipelineError;
use crate::io::artifact::{read_model_json, read_scaler_json};
use crate::models::{AffineScaler, TreeEnsemble};

/// Where the artifacts live. `scaler` is `None` when scaling is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: Option<PathBuf>,
}

/// Artifacts validated against one schema.
///
/// `contract` is the feature layout the artifacts were checked against; a
/// pipeline built from them must use a schema with that exact layout.
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub model: Arc<TreeEnsemble>,
    pub scaler: Option<Arc<AffineScaler>>,
    pub model_path: PathBuf,
    pub contract: FeatureContract,
}

/// Read every artifact named in `paths`, checking each against `schema`.
pub fn load_artifacts(paths: &ArtifactPaths, schema: &IndicatorSchema) -> Result<LoadedArtifacts, PipelineError> {
    let model = read_model_json(&paths.model, schema)?;
    let scaler = match &paths.scaler {
        Some(path) => Some(Arc::new(read_scaler_json(path, schema)?)),
        None => None,
    };
    Ok(LoadedArtifacts {
        model: Arc::new(model),
        scaler,
        model_path: paths.model.clone(),
        contract: schema.contract(),
    })
}

struct CacheEntry {
    paths: ArtifactPaths,
    schema: IndicatorSchema,
    artifacts: Arc<LoadedArtifacts>,
}

/// Single-slot cache keyed by artifact paths and schema.
pub struct ArtifactCache {
    slot: Mutex<Option<CacheEntry>>,
    loads: AtomicUsize,
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactCache {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            loads: AtomicUsize::new(0),
        }
    }

    /// Return the cached artifacts, loading them if the slot is empty or holds
    /// artifacts for different paths/schema.
    pub fn get_or_load(
        &self,
        paths: &ArtifactPaths,
        schema: &IndicatorSchema,
    ) -> Result<Arc<LoadedArtifacts>, PipelineError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = slot.as_ref() {
            if entry.paths == *paths && entry.schema == *schema {
                debug!(model = %paths.model.display(), "artifact cache hit");
                return Ok(Arc::clone(&entry.artifacts));
            }
        }

        let artifacts = Arc::new(load_artifacts(paths, schema)?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        *slot = Some(CacheEntry {
            paths: paths.clone(),
            schema: schema.clone(),
            artifacts: Arc::clone(&artifacts),
        });
        Ok(artifacts)
    }

    /// Drop the cached artifacts; the next `get_or_load` reads from disk again.
    pub fn reset(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// Number of successful loads since construction.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

static GLOBAL: ArtifactCache = ArtifactCache::new();

/// Process-wide cache.
pub fn global() -> &'static ArtifactCache {
    &GLOBAL
}
