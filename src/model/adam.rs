/// Strategy for stepping parameters from their accumulated gradients.
pub trait Optimizer {
    /// Applies one update to `params` from `grad`. Both slices cover the
    /// full flat parameter vector.
    fn step(&mut self, grad: &[f32], params: &mut [f32]);
}

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-7;

/// Adam with bias-corrected first and second moment estimates.
///
/// Moment state is per-run: it starts at zero and is not persisted with
/// the model.
#[derive(Debug)]
pub struct Adam {
    learning_rate: f32,
    t: i32,
    m: Box<[f32]>,
    v: Box<[f32]>,
}

impl Adam {
    pub fn new(len: usize, learning_rate: f32) -> Self {
        Self {
            learning_rate,
            t: 0,
            m: vec![0.; len].into_boxed_slice(),
            v: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, grad: &[f32], params: &mut [f32]) {
        self.t += 1;
        let bc1 = 1. - BETA1.powi(self.t);
        let bc2 = 1. - BETA2.powi(self.t);
        let step_size = self.learning_rate * bc2.sqrt() / bc1;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
            .for_each(|((p, &g), (m, v))| {
                *m = BETA1 * *m + (1. - BETA1) * g;
                *v = BETA2 * *v + (1. - BETA2) * g * g;
                *p -= step_size * *m / (v.sqrt() + EPSILON);
            });
    }
}
