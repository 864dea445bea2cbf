use std::num::NonZeroUsize;

/// Every tunable of the two pipeline stages, injected explicitly into each
/// stage instead of being read from scattered literals.
///
/// `Default` reproduces the canonical run: the fixed bucket and key names,
/// an 80/20 split at seed 42, a 50-dimensional embedding and a
/// 10-epoch / 256-batch optimization.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bucket holding every blob the pipeline touches.
    pub bucket: String,
    /// Raw interaction log, one event per row.
    pub source_key: String,
    pub train_key: String,
    pub test_key: String,
    pub encoders_key: String,
    pub model_key: String,

    /// Fraction of encoded records held out for validation.
    pub test_fraction: f32,
    /// Seed shared by the partitioner and the trainer's RNG.
    pub seed: u64,

    /// Width of each embedding vector.
    pub embedding_dim: usize,
    /// Widths of the two hidden dense layers.
    pub hidden_dims: [usize; 2],
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    pub learning_rate: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket: "recommender-system-bucket".to_string(),
            source_key: "cleaned_events.csv".to_string(),
            train_key: "processed/train.csv".to_string(),
            test_key: "processed/test.csv".to_string(),
            encoders_key: "processed/encoders.json".to_string(),
            model_key: "processed/ncf_model".to_string(),
            test_fraction: 0.2,
            seed: 42,
            embedding_dim: 50,
            hidden_dims: [128, 64],
            epochs: NonZeroUsize::new(10).unwrap(),
            batch_size: NonZeroUsize::new(256).unwrap(),
            learning_rate: 1e-3,
        }
    }
}
