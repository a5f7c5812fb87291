//! Elliptic dataset processor
//!
//! Runs the full ingest -> normalize -> remap -> align -> scale pipeline over
//! the raw lake files and memoizes the result in memory.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::DatasetConfig;
use crate::data::csv_loader::read_csv;
use crate::data::features::{align, normalize_schema, scale};
use crate::data::labels::{normalize_label_schema, remap_labels};
use crate::error::Result;
use crate::models::{RawFeatureTable, RawLabelTable, TrainingDataset};

/// What `get_full_dataset` does with a previously built result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Return the in-memory result if one exists, build otherwise
    Reuse,
    /// Always rebuild from the raw files and replace the in-memory result
    Rebuild,
}

impl CachePolicy {
    pub fn from_force_rebuild(force_rebuild: bool) -> Self {
        if force_rebuild {
            CachePolicy::Rebuild
        } else {
            CachePolicy::Reuse
        }
    }
}

/// Builds a `TrainingDataset` from the raw Elliptic files
pub struct EllipticProcessor {
    config: DatasetConfig,
    cached: Option<Arc<TrainingDataset>>,
    builds: usize,
}

impl EllipticProcessor {
    pub fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            cached: None,
            builds: 0,
        }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Number of times the pipeline has run on this instance
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Read both raw files into memory
    pub fn ingest<P: AsRef<Path>>(
        &self,
        features_path: P,
        labels_path: P,
    ) -> Result<(RawFeatureTable, RawLabelTable)> {
        info!("Reading features file {:?}", features_path.as_ref());
        let features = read_csv(
            features_path,
            self.config.features_has_header,
            self.config.infer_schema_length,
        )?;

        info!("Reading labels file {:?}", labels_path.as_ref());
        // Every label column is read as text; a late "unknown" must not
        // break a numeric inference over the leading rows
        let labels = read_csv(labels_path, true, Some(0))?;

        info!("Done reading files");
        Ok((RawFeatureTable(features), RawLabelTable(labels)))
    }

    /// Run the whole pipeline over the configured lake files
    pub fn preprocess(&self) -> Result<TrainingDataset> {
        debug!("Start preprocessing elliptic data");
        let columns = &self.config.columns;

        let (features, labels) =
            self.ingest(self.config.features_lake(), self.config.labels_lake())?;

        debug!("Construct column headers");
        let features = normalize_schema(features, columns)?;
        let labels = normalize_label_schema(labels, columns)?;

        debug!("Change label names");
        let labels = remap_labels(labels, columns)?;

        debug!("Align features and labels");
        let aligned = align(features, labels, columns)?;

        debug!("Normalise feature data");
        let (features, labels) = aligned.into_parts();
        let scaled = scale(&features, columns)?;

        debug!("Done preprocessing data");
        TrainingDataset::new(scaled, labels)
    }

    /// Return the training dataset, building it when needed.
    ///
    /// With `force_rebuild == false` a result built earlier by this instance
    /// is returned as-is (same `Arc`) without touching the raw files. With
    /// `force_rebuild == true` the pipeline always runs and the new result
    /// replaces the cached one. Nothing is written to disk here.
    pub fn get_full_dataset(&mut self, force_rebuild: bool) -> Result<Arc<TrainingDataset>> {
        match (CachePolicy::from_force_rebuild(force_rebuild), &self.cached) {
            (CachePolicy::Reuse, Some(cached)) => {
                debug!("Reusing in-memory training data");
                Ok(Arc::clone(cached))
            }
            _ => {
                info!("Building training data");
                let dataset = Arc::new(self.preprocess()?);
                self.builds += 1;
                self.cached = Some(Arc::clone(&dataset));
                Ok(dataset)
            }
        }
    }
}
