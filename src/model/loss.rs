use ndarray::{Array2, ArrayView2, Zip};

/// Keeps both log terms finite. The interaction-strength label may sit far
/// outside `[0, 1]` (it is a raw epoch timestamp), so only the predicted
/// probability is clamped, never the label.
const P_EPS: f32 = 1e-7;

/// A differentiable training objective over batched predictions.
pub trait LossFn {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;

    /// dL/dy_pred, averaged over the batch.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}

/// Binary cross-entropy over sigmoid outputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bce;

impl Bce {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Bce {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let total: f32 = y_pred
            .iter()
            .zip(y.iter())
            .map(|(&p, &y)| {
                let p = p.clamp(P_EPS, 1. - P_EPS);
                -(y * p.ln() + (1. - y) * (1. - p).ln())
            })
            .sum();

        total / y_pred.len() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len() as f32;
        let mut d = Array2::zeros(y_pred.raw_dim());
        Zip::from(&mut d).and(y_pred).and(y).for_each(|d, &p, &y| {
            let p = p.clamp(P_EPS, 1. - P_EPS);
            *d = ((1. - y) / (1. - p) - y / p) / n;
        });
        d
    }
}

/// Fraction of predictions on the same side of 0.5 as their label.
pub fn binary_accuracy(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    let hits = y_pred
        .iter()
        .zip(y.iter())
        .filter(|&(&p, &y)| (p >= 0.5) == (y >= 0.5))
        .count();

    hits as f32 / y_pred.len() as f32
}
