//! Durable artifact cache over the processor
//!
//! The store decides exactly once, at construction, whether the processed
//! artifacts on disk can be used or the dataset has to be rebuilt:
//!
//! ```text
//! NotLoaded --hit--------------------------------> LoadedFromCache
//! NotLoaded --miss/forced--> (rebuild + persist) -> Rebuilt
//! ```
//!
//! Both end states are terminal.

use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ColumnNames, DatasetConfig};
use crate::data::csv_loader::{commit_artifact, discard_staged, read_artifact, stage_artifact};
use crate::data::processor::EllipticProcessor;
use crate::error::{DatasetError, Result};
use crate::models::{Label, TrainingDataset};

/// Why the persisted artifacts could not be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    NoFeatureArtifact,
    /// Feature artifact present but its label counterpart is not
    NoLabelArtifact,
}

/// Outcome of the cache check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    Hit,
    Miss(MissReason),
    Forced,
}

impl CacheDecision {
    /// Decide between loading the artifacts and rebuilding.
    ///
    /// A hit requires both artifacts to exist.
    pub fn evaluate(features: &Path, labels: &Path, force_rebuild: bool) -> Self {
        if force_rebuild {
            CacheDecision::Forced
        } else if !features.exists() {
            CacheDecision::Miss(MissReason::NoFeatureArtifact)
        } else if !labels.exists() {
            CacheDecision::Miss(MissReason::NoLabelArtifact)
        } else {
            CacheDecision::Hit
        }
    }

    pub fn is_hit(self) -> bool {
        self == CacheDecision::Hit
    }
}

/// Terminal state of a constructed store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    LoadedFromCache,
    Rebuilt,
}

/// Processed Elliptic dataset, loaded from disk or rebuilt and persisted
#[derive(Debug)]
pub struct EllipticStore {
    data: Arc<TrainingDataset>,
    decision: CacheDecision,
    state: StoreState,
    features_path: PathBuf,
    labels_path: PathBuf,
}

impl EllipticStore {
    /// Open the store described by `config`, rebuilding through a fresh
    /// processor when needed
    pub fn new(config: DatasetConfig, force_rebuild: bool) -> Result<Self> {
        let mut processor = EllipticProcessor::new(config);
        Self::with_processor(&mut processor, force_rebuild)
    }

    /// Open the store using an existing processor (and its configuration)
    pub fn with_processor(processor: &mut EllipticProcessor, force_rebuild: bool) -> Result<Self> {
        let config = processor.config();
        let features_path = config.features_store();
        let labels_path = config.labels_store();
        let columns = config.columns.clone();

        let decision = CacheDecision::evaluate(&features_path, &labels_path, force_rebuild);

        let (data, state) = if decision.is_hit() {
            info!("Load processed data from {:?}", features_path);
            let data = load_artifacts(&features_path, &labels_path, &columns)?;
            (Arc::new(data), StoreState::LoadedFromCache)
        } else {
            match decision {
                CacheDecision::Miss(MissReason::NoLabelArtifact) => warn!(
                    "Feature artifact {:?} exists without labels {:?}; rebuilding",
                    features_path, labels_path
                ),
                CacheDecision::Miss(reason) => info!("No cached artifacts ({:?})", reason),
                _ => {}
            }

            info!("Request dataset with force_rebuild={}", force_rebuild);
            let data = processor.get_full_dataset(force_rebuild)?;
            persist_artifacts(&data, &features_path, &labels_path, &columns)?;
            (data, StoreState::Rebuilt)
        };

        Ok(Self {
            data,
            decision,
            state,
            features_path,
            labels_path,
        })
    }

    /// The dataset established at construction
    pub fn get_data(&self) -> Arc<TrainingDataset> {
        Arc::clone(&self.data)
    }

    pub fn decision(&self) -> CacheDecision {
        self.decision
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn features_path(&self) -> &Path {
        &self.features_path
    }

    pub fn labels_path(&self) -> &Path {
        &self.labels_path
    }
}

/// Write the feature table and label sequence to their artifact paths.
///
/// Both files are staged before either destination is touched. The feature
/// artifact is removed before the labels are published and is renamed into
/// place last, so an interrupted run leaves at worst a lone label artifact,
/// which the next construction treats as a miss.
pub fn persist_artifacts(
    data: &TrainingDataset,
    features_path: &Path,
    labels_path: &Path,
    columns: &ColumnNames,
) -> Result<()> {
    let labels = data.labels_frame(&columns.label)?;

    let features_staged = stage_artifact(data.features(), features_path)?;
    let labels_staged = match stage_artifact(&labels, labels_path) {
        Ok(staged) => staged,
        Err(e) => {
            discard_staged(&features_staged);
            return Err(e);
        }
    };

    let published = remove_artifact(features_path)
        .and_then(|_| {
            info!("Store processed labels: {:?}", labels_path);
            commit_artifact(&labels_staged, labels_path)
        })
        .and_then(|_| {
            info!("Store processed features: {:?}", features_path);
            commit_artifact(&features_staged, features_path)
        });

    if published.is_err() {
        discard_staged(&features_staged);
        discard_staged(&labels_staged);
    }
    published
}

/// Remove a previously persisted artifact, if any
fn remove_artifact(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DatasetError::io(path, e)),
    }
}

/// Load a previously persisted dataset
pub fn load_artifacts(
    features_path: &Path,
    labels_path: &Path,
    columns: &ColumnNames,
) -> Result<TrainingDataset> {
    let features = read_artifact(features_path)?;
    let labels = read_artifact(labels_path)?;

    let label_column = match labels.column(&columns.label) {
        Ok(column) => column.clone(),
        Err(_) => labels
            .get_columns()
            .first()
            .cloned()
            .ok_or(DatasetError::SchemaMismatch {
                expected: 1,
                actual: 0,
            })?,
    };

    let codes = label_column.cast(&DataType::Int32)?;
    let codes: Vec<i32> = codes
        .i32()?
        .into_iter()
        .enumerate()
        .map(|(row, code)| {
            let code = code.ok_or_else(|| DatasetError::MissingValue {
                column: columns.label.clone(),
                row,
            })?;
            // Only licit/illicit rows are ever persisted
            match Label::from_code(code) {
                Some(Label::Licit) | Some(Label::Illicit) => Ok(code),
                _ => Err(DatasetError::InvalidLabelCode { row, code }),
            }
        })
        .collect::<Result<_>>()?;

    TrainingDataset::new(features, codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtifactPaths;
    use crate::data::csv_loader::temp_path;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    const FEATURES: &str = "\
100,1,0.1,10.0,-1.0
101,1,0.2,20.0,0.0
102,2,0.3,10.0,1.0
103,2,0.4,20.0,2.0
104,3,0.5,40.0,3.0
";

    const LABELS: &str = "\
txId,class
100,1
101,2
102,unknown
103,2
104,1
";

    fn write_lake(root: &Path) -> DatasetConfig {
        let config = DatasetConfig::with_root(root);
        let features_path = config.features_lake();
        fs::create_dir_all(features_path.parent().unwrap()).unwrap();
        fs::write(&features_path, FEATURES).unwrap();
        fs::write(config.labels_lake(), LABELS).unwrap();
        config
    }

    fn remove_lake(config: &DatasetConfig) {
        fs::remove_file(config.features_lake()).unwrap();
        fs::remove_file(config.labels_lake()).unwrap();
    }

    #[test]
    fn test_cache_decision() {
        let dir = TempDir::new().unwrap();
        let features = dir.path().join("f.csv");
        let labels = dir.path().join("l.csv");

        assert_eq!(
            CacheDecision::evaluate(&features, &labels, false),
            CacheDecision::Miss(MissReason::NoFeatureArtifact)
        );

        fs::write(&features, "x\n").unwrap();
        assert_eq!(
            CacheDecision::evaluate(&features, &labels, false),
            CacheDecision::Miss(MissReason::NoLabelArtifact)
        );

        fs::write(&labels, "x\n").unwrap();
        assert_eq!(
            CacheDecision::evaluate(&features, &labels, false),
            CacheDecision::Hit
        );
        assert_eq!(
            CacheDecision::evaluate(&features, &labels, true),
            CacheDecision::Forced
        );
    }

    #[test]
    fn test_first_open_rebuilds_and_persists() {
        let dir = TempDir::new().unwrap();
        let config = write_lake(dir.path());
        let store = EllipticStore::new(config.clone(), false).unwrap();

        assert_eq!(store.state(), StoreState::Rebuilt);
        assert_eq!(
            store.decision(),
            CacheDecision::Miss(MissReason::NoFeatureArtifact)
        );
        assert!(config.features_store().exists());
        assert!(config.labels_store().exists());
        assert_eq!(store.get_data().labels(), &[1, 0, 0, 1]);
    }

    #[test]
    fn test_round_trip_through_cache() {
        let dir = TempDir::new().unwrap();
        let config = write_lake(dir.path());
        let built = EllipticStore::new(config.clone(), false).unwrap().get_data();

        // Cache hit must not need the raw files
        remove_lake(&config);
        let cached = EllipticStore::new(config, false).unwrap();

        assert_eq!(cached.state(), StoreState::LoadedFromCache);
        let loaded = cached.get_data();
        assert_eq!(loaded.len(), built.len());
        assert_eq!(loaded.labels(), built.labels());
        assert_eq!(loaded.features().width(), built.features().width());

        let a: Vec<f64> = built
            .features()
            .column("feature_1")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        let b: Vec<f64> = loaded
            .features()
            .column("feature_1")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_get_data_is_stable() {
        let dir = TempDir::new().unwrap();
        let config = write_lake(dir.path());
        let store = EllipticStore::new(config, false).unwrap();

        assert!(Arc::ptr_eq(&store.get_data(), &store.get_data()));
    }

    #[test]
    fn test_force_rebuild_overwrites_stale_artifact() {
        let dir = TempDir::new().unwrap();
        let config = write_lake(dir.path());

        // Stale but well-formed cache with a single row
        let stale = TrainingDataset::new(
            df!("feature_1" => [9.0], "timestep" => [7i64]).unwrap(),
            vec![0],
        )
        .unwrap();
        persist_artifacts(
            &stale,
            &config.features_store(),
            &config.labels_store(),
            &config.columns,
        )
        .unwrap();

        let hit = EllipticStore::new(config.clone(), false).unwrap();
        assert_eq!(hit.state(), StoreState::LoadedFromCache);
        assert_eq!(hit.get_data().len(), 1);

        let forced = EllipticStore::new(config.clone(), true).unwrap();
        assert_eq!(forced.decision(), CacheDecision::Forced);
        assert_eq!(forced.state(), StoreState::Rebuilt);
        assert_eq!(forced.get_data().labels(), &[1, 0, 0, 1]);

        let reloaded = EllipticStore::new(config, false).unwrap();
        assert_eq!(reloaded.state(), StoreState::LoadedFromCache);
        assert_eq!(reloaded.get_data().len(), 4);
    }

    #[test]
    fn test_lone_feature_artifact_triggers_rebuild() {
        let dir = TempDir::new().unwrap();
        let config = write_lake(dir.path());
        EllipticStore::new(config.clone(), false).unwrap();
        fs::remove_file(config.labels_store()).unwrap();

        let store = EllipticStore::new(config.clone(), false).unwrap();
        assert_eq!(
            store.decision(),
            CacheDecision::Miss(MissReason::NoLabelArtifact)
        );
        assert_eq!(store.state(), StoreState::Rebuilt);
        assert!(config.labels_store().exists());
    }

    #[test]
    fn test_override_paths() {
        let dir = TempDir::new().unwrap();
        let store_paths = ArtifactPaths::from_overrides(Some("out/f.csv"), Some("out/l.csv"));
        let config = write_lake(dir.path()).with_store(store_paths);

        let store = EllipticStore::new(config, false).unwrap();
        assert_eq!(store.features_path(), dir.path().join("out/f.csv"));
        assert!(dir.path().join("out/f.csv").exists());
        assert!(dir.path().join("out/l.csv").exists());
        assert!(!dir.path().join("data/store").exists());
    }

    #[test]
    fn test_mismatched_artifacts_rejected() {
        let dir = TempDir::new().unwrap();
        let features = dir.path().join("f.csv");
        let labels = dir.path().join("l.csv");
        fs::write(&features, "index,feature_1,timestep\n0,0.5,1\n1,-0.5,2\n").unwrap();
        fs::write(&labels, "index,class\n0,1\n").unwrap();

        let err = load_artifacts(&features, &labels, &ColumnNames::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    }

    #[test]
    fn test_failed_label_write_keeps_previous_pair() {
        let dir = TempDir::new().unwrap();
        let config = write_lake(dir.path());

        let stale = TrainingDataset::new(
            df!("feature_1" => [9.0, 8.0, 7.0], "timestep" => [7i64, 7, 7]).unwrap(),
            vec![0, 0, 0],
        )
        .unwrap();
        persist_artifacts(
            &stale,
            &config.features_store(),
            &config.labels_store(),
            &config.columns,
        )
        .unwrap();
        let stale_features = fs::read_to_string(config.features_store()).unwrap();

        // Block the labels temp file so staging the labels fails
        let labels_tmp = temp_path(&config.labels_store());
        fs::create_dir(&labels_tmp).unwrap();

        let err = EllipticStore::new(config.clone(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!temp_path(&config.features_store()).exists());
        assert_eq!(
            fs::read_to_string(config.features_store()).unwrap(),
            stale_features
        );

        fs::remove_dir(&labels_tmp).unwrap();
        let reopened = EllipticStore::new(config, false).unwrap();
        assert_eq!(reopened.state(), StoreState::LoadedFromCache);
        assert_eq!(reopened.get_data().labels(), &[0, 0, 0]);
        let feature_1: Vec<f64> = reopened
            .get_data()
            .features()
            .column("feature_1")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(feature_1, vec![9.0, 8.0, 7.0]);
    }

    #[test]
    fn test_cached_labels_must_be_known() {
        let dir = TempDir::new().unwrap();
        let features = dir.path().join("f.csv");
        let labels = dir.path().join("l.csv");
        fs::write(&features, "index,feature_1,timestep\n0,0.5,1\n1,-0.5,2\n").unwrap();

        fs::write(&labels, "index,class\n0,-1\n1,1\n").unwrap();
        let err = load_artifacts(&features, &labels, &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidLabelCode { row: 0, code: -1 }));

        fs::write(&labels, "index,class\n0,0\n1,7\n").unwrap();
        let err = load_artifacts(&features, &labels, &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidLabelCode { row: 1, code: 7 }));
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);

        fs::write(&labels, "index,class\n0,0\n1,1\n").unwrap();
        let loaded = load_artifacts(&features, &labels, &ColumnNames::default()).unwrap();
        assert_eq!(loaded.labels(), &[0, 1]);
    }

    #[test]
    fn test_failed_rebuild_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = write_lake(dir.path());
        fs::write(config.labels_lake(), "txId,class\n100,7\n").unwrap();

        let err = EllipticStore::new(config.clone(), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
        assert!(!config.features_store().exists());
        assert!(!config.labels_store().exists());
    }
}
