use log::info;
use ndarray::Array2;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    config::PipelineConfig,
    data::records::Interaction,
    error::{PipelineErr, Result},
    model::{binary_accuracy, Adam, Bce, LossFn, NcfModel, Optimizer},
};

/// Parallel index/label arrays extracted from one dataset split.
#[derive(Debug, Clone)]
pub struct SplitArrays {
    users: Vec<u32>,
    products: Vec<u32>,
    labels: Vec<f32>,
}

impl SplitArrays {
    pub fn from_records(records: &[Interaction]) -> Self {
        Self {
            users: records.iter().map(|r| r.user_id).collect(),
            products: records.iter().map(|r| r.product_id).collect(),
            labels: records.iter().map(|r| r.interaction_strength as f32).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Loss and accuracy scalars reported after one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f32,
    pub valid_loss: f32,
    pub valid_accuracy: f32,
}

/// Runs the supervised optimization loop against (user, product) →
/// interaction-strength triples.
///
/// Training is one pass per epoch over shuffled mini-batches with a
/// validation evaluation after every epoch. There is no early stopping and
/// no mid-run checkpointing: an interrupted run restarts from epoch 0.
/// Diverging or NaN losses are reported, not guarded against.
pub struct Trainer {
    model: NcfModel,
    params: Box<[f32]>,
    grad: Box<[f32]>,
    optimizer: Adam,
    loss_fn: Bce,
    epochs: usize,
    batch_size: usize,
    rng: StdRng,
}

impl Trainer {
    /// Seeds the RNG, initializes the model parameters and sets up the
    /// optimizer state.
    pub fn new(model: NcfModel, cfg: &PipelineConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let params = model.init_params(&mut rng)?;
        let size = params.len();

        Ok(Self {
            grad: vec![0.; size].into_boxed_slice(),
            optimizer: Adam::new(size, cfg.learning_rate),
            loss_fn: Bce::new(),
            epochs: cfg.epochs.get(),
            batch_size: cfg.batch_size.get(),
            rng,
            model,
            params,
        })
    }

    /// Fits the model and returns the per-epoch history.
    ///
    /// # Errors
    /// `EmptyDataset` if either split has no rows; any forward/backward
    /// shape or index error propagates.
    pub fn fit(&mut self, train: &SplitArrays, valid: &SplitArrays) -> Result<Vec<EpochStats>> {
        if train.is_empty() {
            return Err(PipelineErr::EmptyDataset { stage: "the train split" });
        }
        if valid.is_empty() {
            return Err(PipelineErr::EmptyDataset { stage: "the test split" });
        }

        let mut history = Vec::with_capacity(self.epochs);
        let mut order: Vec<usize> = (0..train.len()).collect();

        for epoch in 1..=self.epochs {
            order.shuffle(&mut self.rng);

            let mut total_loss = 0.;
            let mut batches = 0;
            for chunk in order.chunks(self.batch_size) {
                let users: Vec<u32> = chunk.iter().map(|&i| train.users[i]).collect();
                let products: Vec<u32> = chunk.iter().map(|&i| train.products[i]).collect();
                let labels: Vec<f32> = chunk.iter().map(|&i| train.labels[i]).collect();

                total_loss += self.train_batch(&users, &products, labels)?;
                batches += 1;
            }

            let train_loss = total_loss / batches as f32;
            let (valid_loss, valid_accuracy) = self.evaluate(valid)?;
            info!(
                "epoch {epoch}/{}: loss {train_loss:.6}, val_loss {valid_loss:.6}, val_accuracy {valid_accuracy:.4}",
                self.epochs
            );

            history.push(EpochStats { epoch, train_loss, valid_loss, valid_accuracy });
        }

        Ok(history)
    }

    /// One forward/backward/step cycle; returns the batch loss.
    fn train_batch(&mut self, users: &[u32], products: &[u32], labels: Vec<f32>) -> Result<f32> {
        let y = Array2::from_shape_vec((labels.len(), 1), labels).unwrap();

        self.grad.fill(0.);
        let y_pred = self.model.forward(&self.params, users, products)?;
        let loss = self.loss_fn.loss(y_pred, y.view());
        let d_out = self.loss_fn.loss_prime(y_pred, y.view());

        self.model.backward(&self.params, &mut self.grad, d_out, users, products)?;
        self.optimizer.step(&self.grad, &mut self.params);
        Ok(loss)
    }

    /// Forward-only pass over `split`, batched to bound peak memory.
    /// Returns (mean batch loss, sample-weighted accuracy).
    fn evaluate(&mut self, split: &SplitArrays) -> Result<(f32, f32)> {
        let n = split.len();
        let mut total_loss = 0.;
        let mut weighted_hits = 0.;
        let mut batches = 0;

        for start in (0..n).step_by(self.batch_size) {
            let end = (start + self.batch_size).min(n);
            let y = Array2::from_shape_vec((end - start, 1), split.labels[start..end].to_vec()).unwrap();

            let y_pred = self
                .model
                .forward(&self.params, &split.users[start..end], &split.products[start..end])?;
            total_loss += self.loss_fn.loss(y_pred, y.view());
            weighted_hits += binary_accuracy(y_pred, y.view()) * (end - start) as f32;
            batches += 1;
        }

        Ok((total_loss / batches as f32, weighted_hits / n as f32))
    }

    pub fn model(&self) -> &NcfModel {
        &self.model
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Releases the fitted model and its parameter vector for persistence.
    pub fn into_parts(self) -> (NcfModel, Box<[f32]>) {
        (self.model, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn tiny_config(epochs: usize, batch_size: usize) -> PipelineConfig {
        PipelineConfig {
            embedding_dim: 4,
            hidden_dims: [8, 4],
            epochs: NonZeroUsize::new(epochs).unwrap(),
            batch_size: NonZeroUsize::new(batch_size).unwrap(),
            learning_rate: 0.05,
            ..PipelineConfig::default()
        }
    }

    /// A separable toy problem: users 0..2 always hit label 1 with
    /// products 0..2, users 2..4 label 0.
    fn toy_split() -> SplitArrays {
        let mut records = Vec::new();
        for user in 0u32..4 {
            for product in 0u32..4 {
                records.push(Interaction {
                    user_id: user,
                    product_id: product,
                    interaction_strength: if user < 2 { 1.0 } else { 0.0 },
                });
            }
        }
        SplitArrays::from_records(&records)
    }

    #[test]
    fn loss_decreases_on_a_separable_problem() {
        let cfg = tiny_config(30, 4);
        let model = NcfModel::new(4, 4, cfg.embedding_dim, cfg.hidden_dims);
        let mut trainer = Trainer::new(model, &cfg).unwrap();

        let split = toy_split();
        let history = trainer.fit(&split, &split).unwrap();

        assert_eq!(history.len(), 30);
        let first = history.first().unwrap().train_loss;
        let last = history.last().unwrap().train_loss;
        assert!(last < first, "loss did not decrease: {first} -> {last}");
        assert!(history.last().unwrap().valid_accuracy > 0.7);
    }

    #[test]
    fn ragged_final_batch_is_processed() {
        // 16 samples with batch size 5: batches of 5, 5, 5, 1.
        let cfg = tiny_config(1, 5);
        let model = NcfModel::new(4, 4, cfg.embedding_dim, cfg.hidden_dims);
        let mut trainer = Trainer::new(model, &cfg).unwrap();

        let split = toy_split();
        let history = trainer.fit(&split, &split).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].train_loss.is_finite());
    }

    #[test]
    fn fixed_seed_reproduces_the_run() {
        let cfg = tiny_config(3, 4);
        let split = toy_split();

        let mut run = || {
            let model = NcfModel::new(4, 4, cfg.embedding_dim, cfg.hidden_dims);
            let mut trainer = Trainer::new(model, &cfg).unwrap();
            trainer.fit(&split, &split).unwrap()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn empty_split_is_rejected() {
        let cfg = tiny_config(1, 4);
        let model = NcfModel::new(4, 4, cfg.embedding_dim, cfg.hidden_dims);
        let mut trainer = Trainer::new(model, &cfg).unwrap();

        let empty = SplitArrays::from_records(&[]);
        let err = trainer.fit(&empty, &toy_split()).unwrap_err();
        assert!(matches!(err, PipelineErr::EmptyDataset { .. }), "got {err:?}");
    }

    #[test]
    fn out_of_range_index_in_a_split_fails_the_run() {
        let cfg = tiny_config(1, 4);
        let model = NcfModel::new(2, 2, cfg.embedding_dim, cfg.hidden_dims);
        let mut trainer = Trainer::new(model, &cfg).unwrap();

        let bad = SplitArrays::from_records(&[Interaction {
            user_id: 7,
            product_id: 0,
            interaction_strength: 1.0,
        }]);
        let err = trainer.fit(&bad, &bad).unwrap_err();
        assert!(matches!(err, PipelineErr::IndexOutOfRange { .. }), "got {err:?}");
    }
}
