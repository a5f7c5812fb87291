//! Elliptic forensics - transaction dataset preparation
//!
//! This library provides:
//! - Loading of the raw Elliptic features and classes files
//! - Label remapping (licit = 0, illicit = 1, unknown = -1)
//! - Feature/label alignment and standard scaling
//! - An on-disk artifact cache for the processed dataset
//!
//! # Example
//!
//! ```no_run
//! use elliptic_forensics::{DatasetConfig, EllipticStore};
//!
//! let store = EllipticStore::new(DatasetConfig::default(), false)?;
//! let data = store.get_data();
//! println!("{} labeled transactions", data.len());
//! # Ok::<(), elliptic_forensics::DatasetError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::{ArtifactPaths, ColumnNames, DatasetConfig, LakePaths};
pub use data::{CachePolicy, EllipticProcessor, StandardScaler};
pub use error::{DatasetError, ErrorKind, Result};
pub use models::{DatasetSummary, Label, RawFeatureTable, RawLabelTable, TrainingDataset};
pub use store::{CacheDecision, EllipticStore, MissReason, StoreState};
