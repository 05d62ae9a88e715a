//! Model artifact serialization and deserialization via bincode.

use std::path::Path;

use churn_prep::schema::SCHEMA_VERSION;
use tracing::{debug, info, instrument};

use crate::error::ModelError;
use crate::pipeline::ChurnPipeline;

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 1;

/// Leading fields of every envelope, decoded first so that version
/// mismatches are reported before the payload is touched.
#[derive(serde::Deserialize)]
struct EnvelopeHeader {
    format_version: u32,
    schema_version: u32,
}

/// Versioned envelope for the serialized artifact.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Column schema the pipeline was trained against.
    schema_version: u32,
    /// Candidate name of the persisted model.
    model_name: String,
    /// Width of the transformed feature matrix.
    n_features: usize,
    /// Transformer output column names.
    feature_names: Vec<String>,
    /// The fitted pipeline.
    pipeline: ChurnPipeline,
}

/// A named, persisted pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    model_name: String,
    pipeline: ChurnPipeline,
}

impl ModelArtifact {
    /// Wrap a fitted pipeline under its candidate name.
    #[must_use]
    pub fn new(model_name: impl Into<String>, pipeline: ChurnPipeline) -> Self {
        Self {
            model_name: model_name.into(),
            pipeline,
        }
    }

    /// Candidate name, e.g. `RandomForest`.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// The fitted pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &ChurnPipeline {
        &self.pipeline
    }

    /// Consume the artifact and return its pipeline.
    #[must_use]
    pub fn into_pipeline(self) -> ChurnPipeline {
        self.pipeline
    }

    /// Save the artifact to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::SerializeModel`] | bincode encoding failed |
    /// | [`ModelError::WriteModel`] | file write failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display(), model = %self.model_name))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            schema_version: SCHEMA_VERSION,
            model_name: self.model_name.clone(),
            n_features: self.pipeline.classifier().n_features(),
            feature_names: self.pipeline.feature_names().to_vec(),
            pipeline: self.pipeline.clone(),
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| ModelError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| ModelError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(size_bytes = bytes.len(), "model saved");

        Ok(())
    }

    /// Load an artifact from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::ReadModel`] | file read failed |
    /// | [`ModelError::DeserializeModel`] | bincode decoding failed |
    /// | [`ModelError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`ModelError::IncompatibleSchema`] | schema version mismatch |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| ModelError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let decode_error = |e: bincode::Error| ModelError::DeserializeModel {
            path: path.to_path_buf(),
            source: e,
        };

        let header: EnvelopeHeader = bincode::deserialize(&bytes).map_err(decode_error)?;
        if header.format_version != FORMAT_VERSION {
            return Err(ModelError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: header.format_version,
                path: path.to_path_buf(),
            });
        }
        if header.schema_version != SCHEMA_VERSION {
            return Err(ModelError::IncompatibleSchema {
                expected: SCHEMA_VERSION,
                found: header.schema_version,
                path: path.to_path_buf(),
            });
        }

        let envelope: ModelEnvelope = bincode::deserialize(&bytes).map_err(decode_error)?;

        debug!(
            model = %envelope.model_name,
            n_features = envelope.n_features,
            "model loaded"
        );

        Ok(Self {
            model_name: envelope.model_name,
            pipeline: envelope.pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use churn_prep::ColumnTransformer;
    use tempfile::TempDir;

    use super::*;
    use crate::classifier::ClassifierConfig;
    use crate::pipeline::{ChurnScorer, fit_one};
    use crate::inference::predict_one;
    use crate::testing::{labelled_training_set, raw_customer, raw_telco};
    use crate::tree::DecisionTreeConfig;

    fn artifact() -> ModelArtifact {
        let (x, y) = labelled_training_set(30);
        let pipeline = fit_one(
            &ColumnTransformer::telco(),
            &ClassifierConfig::DecisionTree(DecisionTreeConfig::new()),
            &x,
            &y,
        )
        .unwrap();
        ModelArtifact::new("DecisionTree", pipeline)
    }

    #[test]
    fn save_and_load_preserves_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let original = artifact();
        original.save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.model_name(), "DecisionTree");
        let record = raw_customer();
        assert_eq!(
            loaded.pipeline().predict_proba(&record).unwrap(),
            original.pipeline().predict_proba(&record).unwrap()
        );
    }

    #[test]
    fn loaded_pipeline_scores_concurrently() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        artifact().save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();
        let pipeline = loaded.pipeline();

        let customers = raw_telco(16);
        let records: Vec<_> = (0..customers.n_rows())
            .map(|i| customers.select_rows(&[i]))
            .collect();
        let sequential: Vec<_> = records
            .iter()
            .map(|r| predict_one(pipeline, r).unwrap())
            .collect();

        let concurrent: Vec<Vec<_>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        records
                            .iter()
                            .map(|r| predict_one(pipeline, r).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(concurrent.len(), 4);
        for run in concurrent {
            assert_eq!(run, sequential);
        }
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        artifact().save(&path).unwrap();

        // format_version is the first little-endian u32 of the file.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[..4].copy_from_slice(&99u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = ModelArtifact::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ModelError::IncompatibleModelVersion { expected: FORMAT_VERSION, found: 99, .. }
        ));
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        artifact().save(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            ModelArtifact::load(&path).unwrap_err(),
            ModelError::IncompatibleSchema { found: 7, .. }
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = ModelArtifact::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, ModelError::ReadModel { .. }));
    }

    #[test]
    fn garbage_is_deserialize_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, b"abc").unwrap();
        assert!(matches!(
            ModelArtifact::load(&path).unwrap_err(),
            ModelError::DeserializeModel { .. }
        ));
    }
}
