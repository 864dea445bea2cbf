use ndarray::{linalg, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};

/// Activation applied elementwise after a dense layer's affine map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActFn {
    Relu,
    Sigmoid,
}

impl ActFn {
    pub fn f(self, z: f32) -> f32 {
        match self {
            ActFn::Relu => z.max(0.),
            ActFn::Sigmoid => 1. / (1. + (-z).exp()),
        }
    }

    pub fn df(self, z: f32) -> f32 {
        match self {
            ActFn::Relu => {
                if z > 0. {
                    1.
                } else {
                    0.
                }
            }
            ActFn::Sigmoid => {
                let s = 1. / (1. + (-z).exp());
                s * (1. - s)
            }
        }
    }
}

/// A fully connected layer whose weights and biases live in a flat
/// parameter slice, weights first (`dim.0 × dim.1` row-major) then biases.
///
/// The layer caches its forward inputs and pre-activations so the backward
/// pass can be driven from the same instance.
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
    a: Array2<f32>,
}

impl Dense {
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        let empty = Array2::zeros((0, 0));

        Self {
            dim,
            act_fn,
            x: empty.clone(),
            z: empty.clone(),
            a: empty,
        }
    }

    /// Number of scalars this layer reads from the parameter slice.
    pub fn size(&self) -> usize {
        (self.dim.0 + 1) * self.dim.1
    }

    /// (fan-in, fan-out) of the affine map.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Computes `act(x · W + b)` for a `batch × dim.0` input.
    ///
    /// `params` must hold exactly `size()` scalars.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> ArrayView2<'_, f32> {
        let (w, b) = self.view_params(params);

        self.z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut self.z);
        self.z += &b;

        self.x = x.to_owned();

        let Some(act_fn) = self.act_fn else {
            return self.z.view();
        };

        self.a = self.z.mapv(|z| act_fn.f(z));
        self.a.view()
    }

    /// Consumes the upstream delta (dL/da of this layer), accumulates this
    /// layer's weight and bias gradients into `grad`, and returns dL/dx for
    /// the layer below.
    ///
    /// Gradients are added, not overwritten; the caller zeroes `grad`
    /// between optimizer steps.
    pub fn backward(&mut self, params: &[f32], grad: &mut [f32], mut d: Array2<f32>) -> Array2<f32> {
        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad);
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 1.0, &mut dw);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params);
        let mut dx = Array2::zeros((d.nrows(), self.dim.0));
        linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut dx);
        dx
    }

    /// Views the raw parameter slice as this layer's weights and biases.
    fn view_params<'a>(&self, params: &'a [f32]) -> (ArrayView2<'a, f32>, ArrayView1<'a, f32>) {
        let w_size = self.dim.0 * self.dim.1;
        let (w_raw, b_raw) = params.split_at(w_size);
        let weights = ArrayView2::from_shape(self.dim, w_raw).unwrap();
        let biases = ArrayView1::from_shape(self.dim.1, b_raw).unwrap();
        (weights, biases)
    }

    /// Views the raw gradient slice as this layer's delta weights and biases.
    fn view_grad<'a>(&self, grad: &'a mut [f32]) -> (ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>) {
        let w_size = self.dim.0 * self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).unwrap();
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).unwrap();
        (dw, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn forward_is_an_affine_map_without_activation() {
        let mut layer = Dense::new((2, 1), None);
        // w = [[1], [2]], b = [0.5]
        let params = [1., 2., 0.5];
        let x = array![[3., 4.]];

        let y = layer.forward(&params, x.view());
        assert_eq!(y, array![[3. + 8. + 0.5]]);
    }

    #[test]
    fn relu_clamps_negative_preactivations() {
        let mut layer = Dense::new((1, 2), Some(ActFn::Relu));
        // w = [[1, -1]], b = [0, 0]
        let params = [1., -1., 0., 0.];
        let x = array![[2.]];

        let y = layer.forward(&params, x.view());
        assert_eq!(y, array![[2., 0.]]);
    }

    #[test]
    fn sigmoid_output_stays_in_unit_interval() {
        let mut layer = Dense::new((1, 1), Some(ActFn::Sigmoid));
        let params = [10., 0.];

        for x in [-100., -1., 0., 1., 100.] {
            let y = layer.forward(&params, array![[x]].view()).to_owned();
            assert!(y[[0, 0]] > 0. && y[[0, 0]] < 1., "got {}", y[[0, 0]]);
        }
    }

    #[test]
    fn backward_matches_finite_differences() {
        let mut layer = Dense::new((2, 2), Some(ActFn::Sigmoid));
        let mut params = vec![0.3, -0.2, 0.5, 0.1, 0.05, -0.05];
        let x = array![[1., 2.], [0.5, -1.]];

        // Scalar objective: sum of outputs.
        let objective = |layer: &mut Dense, params: &[f32]| -> f32 {
            layer.forward(params, x.view()).sum()
        };

        let mut grad = vec![0.; layer.size()];
        objective(&mut layer, &params);
        layer.backward(&params, &mut grad, Array2::ones((2, 2)));

        let eps = 1e-3;
        for i in 0..params.len() {
            let orig = params[i];
            params[i] = orig + eps;
            let up = objective(&mut layer, &params);
            params[i] = orig - eps;
            let down = objective(&mut layer, &params);
            params[i] = orig;

            let numeric = (up - down) / (2. * eps);
            assert!(
                (grad[i] - numeric).abs() < 1e-2,
                "param {i}: analytic {} vs numeric {numeric}",
                grad[i]
            );
        }
    }

    #[test]
    fn backward_accumulates_instead_of_overwriting() {
        let mut layer = Dense::new((1, 1), None);
        let params = [2., 0.];
        let x = array![[1.]];

        let mut grad = vec![0.; layer.size()];
        layer.forward(&params, x.view());
        layer.backward(&params, &mut grad, array![[1.]]);
        let first = grad.clone();
        layer.forward(&params, x.view());
        layer.backward(&params, &mut grad, array![[1.]]);

        assert_eq!(grad[0], first[0] * 2.);
        assert_eq!(grad[1], first[1] * 2.);
    }
}
