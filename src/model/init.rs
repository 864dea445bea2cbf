use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::error::{PipelineErr, Result};

/// Fills `params` with samples from `U[low, high)`.
///
/// # Errors
/// `Init` if the range is invalid (low >= high or non-finite).
pub fn uniform<R: Rng>(rng: &mut R, params: &mut [f32], low: f32, high: f32) -> Result<()> {
    let dist = Uniform::new(low, high).map_err(|e| PipelineErr::Init(e.to_string()))?;
    for param in params.iter_mut() {
        *param = dist.sample(rng);
    }
    Ok(())
}

/// Fills `params` with Xavier-uniform samples, bound
/// `sqrt(6 / (fan_in + fan_out))`.
pub fn xavier_uniform<R: Rng>(
    rng: &mut R,
    params: &mut [f32],
    fan_in: usize,
    fan_out: usize,
) -> Result<()> {
    let bound = (6. / (fan_in + fan_out) as f32).sqrt();
    uniform(rng, params, -bound, bound)
}
