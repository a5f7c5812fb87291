//! Dataset configuration
//!
//! Column names, raw input locations and artifact destinations for the
//! Elliptic pipeline. Every component takes a `DatasetConfig` at construction
//! so tests can point the whole pipeline at a scratch directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default raw features file (relative to the dataset root)
pub const DEFAULT_FEATURES_LAKE: &str = "data/lake/elliptic_txs_features.csv";
/// Default raw classes file
pub const DEFAULT_LABELS_LAKE: &str = "data/lake/elliptic_txs_classes.csv";
/// Default processed features artifact
pub const DEFAULT_FEATURES_STORE: &str = "data/store/store_features_processed.csv";
/// Default processed labels artifact
pub const DEFAULT_LABELS_STORE: &str = "data/store/store_labels_processed.csv";

/// Column names used across the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    /// Transaction identifier
    pub id: String,
    /// Discrete time step (never scaled)
    pub time_step: String,
    /// Class column in the labels file
    pub label: String,
    /// Prefix for the anonymized feature columns (`feature_1`, `feature_2`, ...)
    pub feature_prefix: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "txId".to_string(),
            time_step: "timestep".to_string(),
            label: "class".to_string(),
            feature_prefix: "feature_".to_string(),
        }
    }
}

impl ColumnNames {
    /// Name of the `n`-th anonymized feature column (1-based)
    pub fn feature(&self, n: usize) -> String {
        format!("{}{}", self.feature_prefix, n)
    }
}

/// Locations of the two raw source files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LakePaths {
    pub features: PathBuf,
    pub labels: PathBuf,
}

impl Default for LakePaths {
    fn default() -> Self {
        Self {
            features: PathBuf::from(DEFAULT_FEATURES_LAKE),
            labels: PathBuf::from(DEFAULT_LABELS_LAKE),
        }
    }
}

/// Destinations of the persisted feature and label artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub features: PathBuf,
    pub labels: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            features: PathBuf::from(DEFAULT_FEATURES_STORE),
            labels: PathBuf::from(DEFAULT_LABELS_STORE),
        }
    }
}

impl ArtifactPaths {
    /// Build artifact paths from optional overrides.
    ///
    /// Overrides only apply as a pair. If either one is missing, both
    /// destinations fall back to the defaults.
    pub fn from_overrides<P: Into<PathBuf>>(features: Option<P>, labels: Option<P>) -> Self {
        match (features, labels) {
            (Some(features), Some(labels)) => Self {
                features: features.into(),
                labels: labels.into(),
            },
            _ => Self::default(),
        }
    }
}

/// Full configuration for processor and store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Base directory that relative paths are resolved against
    pub root: PathBuf,
    pub lake: LakePaths,
    pub store: ArtifactPaths,
    pub columns: ColumnNames,
    /// Whether the raw features file carries a header row.
    /// The published Elliptic features file does not.
    pub features_has_header: bool,
    /// Rows scanned for schema inference of the features file.
    /// `None` scans the whole file, so a decimal late in an otherwise
    /// integral column still yields a float column.
    pub infer_schema_length: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            lake: LakePaths::default(),
            store: ArtifactPaths::default(),
            columns: ColumnNames::default(),
            features_has_header: false,
            infer_schema_length: None,
        }
    }
}

impl DatasetConfig {
    /// Default configuration rooted at `root`
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Replace the artifact destinations
    pub fn with_store(mut self, store: ArtifactPaths) -> Self {
        self.store = store;
        self
    }

    /// Resolve a possibly relative path against the root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn features_lake(&self) -> PathBuf {
        self.resolve(&self.lake.features)
    }

    pub fn labels_lake(&self) -> PathBuf {
        self.resolve(&self.lake.labels)
    }

    pub fn features_store(&self) -> PathBuf {
        self.resolve(&self.store.features)
    }

    pub fn labels_store(&self) -> PathBuf {
        self.resolve(&self.store.labels)
    }
}
