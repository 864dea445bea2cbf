mod adam;
mod init;
mod layers;
mod loss;

pub use adam::{Adam, Optimizer};
pub use layers::{ActFn, Dense};
pub use loss::{binary_accuracy, Bce, LossFn};

use std::ops::Range;

use ndarray::{s, Array2, ArrayView2};
use rand::Rng;

use crate::error::{PipelineErr, Result};

/// Embedding tables start near zero, uniform in `[-0.05, 0.05)`.
const EMBEDDING_INIT_BOUND: f32 = 0.05;

/// The two-tower NCF topology.
///
/// A user embedding table (`n_users × dim`) and a product embedding table
/// (`n_products × dim`) feed a concatenated `2·dim` feature vector through
/// a dense stack ending in a single sigmoid unit, so the output is a
/// propensity score in `(0, 1)`.
///
/// The graph shape is fixed and configuration-driven; parameters live
/// outside the model in one flat `f32` vector laid out
/// `[user table | product table | dense layers]`.
pub struct NcfModel {
    n_users: usize,
    n_products: usize,
    embedding_dim: usize,
    dense: Vec<Dense>,

    // Forward metadata: the concatenated embedding batch, reused by backward.
    concat: Array2<f32>,
}

/// Name, shape and flat-vector range of one parameter tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub range: Range<usize>,
}

impl NcfModel {
    /// Builds the topology for the given table sizes: `2·dim` →
    /// `hidden_dims[0]` (ReLU) → `hidden_dims[1]` (ReLU) → 1 (sigmoid).
    pub fn new(n_users: usize, n_products: usize, embedding_dim: usize, hidden_dims: [usize; 2]) -> Self {
        let dense = vec![
            Dense::new((2 * embedding_dim, hidden_dims[0]), Some(ActFn::Relu)),
            Dense::new((hidden_dims[0], hidden_dims[1]), Some(ActFn::Relu)),
            Dense::new((hidden_dims[1], 1), Some(ActFn::Sigmoid)),
        ];

        Self {
            n_users,
            n_products,
            embedding_dim,
            dense,
            concat: Array2::zeros((0, 0)),
        }
    }

    pub fn n_users(&self) -> usize {
        self.n_users
    }

    pub fn n_products(&self) -> usize {
        self.n_products
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Total scalar parameter count: both embedding tables plus the dense
    /// stack.
    pub fn size(&self) -> usize {
        self.user_table_len() + self.product_table_len() + self.dense_len()
    }

    fn user_table_len(&self) -> usize {
        self.n_users * self.embedding_dim
    }

    fn product_table_len(&self) -> usize {
        self.n_products * self.embedding_dim
    }

    fn dense_len(&self) -> usize {
        self.dense.iter().map(Dense::size).sum()
    }

    /// Allocates and initializes a parameter vector for this topology:
    /// uniform embedding tables, Xavier-uniform dense weights, zero biases.
    pub fn init_params<R: Rng>(&self, rng: &mut R) -> Result<Box<[f32]>> {
        let mut params = vec![0.; self.size()].into_boxed_slice();

        let table_len = self.user_table_len() + self.product_table_len();
        let (tables, mut rest) = params.split_at_mut(table_len);
        init::uniform(rng, tables, -EMBEDDING_INIT_BOUND, EMBEDDING_INIT_BOUND)?;

        for layer in &self.dense {
            let (chunk, tail) = rest.split_at_mut(layer.size());
            let (fan_in, fan_out) = layer.dim();
            init::xavier_uniform(rng, &mut chunk[..fan_in * fan_out], fan_in, fan_out)?;
            rest = tail;
        }

        Ok(params)
    }

    /// Name, shape and range of every parameter tensor, in layout order.
    pub fn layout(&self) -> Vec<TensorSpec> {
        let d = self.embedding_dim;
        let mut specs = Vec::with_capacity(2 + 2 * self.dense.len());
        let mut offset = 0;

        let mut push = |name: String, shape: Vec<usize>, offset: &mut usize| {
            let len: usize = shape.iter().product();
            specs.push(TensorSpec {
                name,
                shape,
                range: *offset..*offset + len,
            });
            *offset += len;
        };

        push("user_embedding".to_string(), vec![self.n_users, d], &mut offset);
        push("product_embedding".to_string(), vec![self.n_products, d], &mut offset);
        for (i, layer) in self.dense.iter().enumerate() {
            let (fan_in, fan_out) = layer.dim();
            push(format!("dense_{i}.weight"), vec![fan_in, fan_out], &mut offset);
            push(format!("dense_{i}.bias"), vec![fan_out], &mut offset);
        }

        specs
    }

    /// Forward pass over a batch of (user, product) index pairs, returning
    /// a `batch × 1` score matrix.
    ///
    /// # Errors
    /// `ShapeMismatch` if the index slices or `params` are mis-sized,
    /// `IndexOutOfRange` if an index exceeds its embedding table.
    pub fn forward(
        &mut self,
        params: &[f32],
        users: &[u32],
        products: &[u32],
    ) -> Result<ArrayView2<'_, f32>> {
        if users.len() != products.len() {
            return Err(PipelineErr::ShapeMismatch {
                what: "batch",
                got: products.len(),
                expected: users.len(),
            });
        }
        if params.len() != self.size() {
            return Err(PipelineErr::ShapeMismatch {
                what: "params",
                got: params.len(),
                expected: self.size(),
            });
        }

        let d = self.embedding_dim;
        let (user_table, params) = params.split_at(self.user_table_len());
        let (product_table, dense_params) = params.split_at(self.product_table_len());

        self.concat = Array2::zeros((users.len(), 2 * d));
        for (row, (&user, &product)) in users.iter().zip(products).enumerate() {
            let user_vec = table_row(user_table, user, d, self.n_users, "user_id")?;
            let product_vec = table_row(product_table, product, d, self.n_products, "product_id")?;

            let mut dst = self.concat.row_mut(row);
            for (dst, &src) in dst.iter_mut().zip(user_vec.iter().chain(product_vec)) {
                *dst = src;
            }
        }

        let mut x = self.concat.view();
        let mut cursor = dense_params;
        for layer in &mut self.dense {
            let (chunk, rest) = cursor.split_at(layer.size());
            x = layer.forward(chunk, x);
            cursor = rest;
        }

        Ok(x)
    }

    /// Backward pass for the most recent `forward` batch. Accumulates into
    /// `grad` (zeroed by the caller between optimizer steps); only the
    /// embedding rows referenced by the batch receive gradient.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d_out: Array2<f32>,
        users: &[u32],
        products: &[u32],
    ) -> Result<()> {
        if grad.len() != self.size() {
            return Err(PipelineErr::ShapeMismatch {
                what: "grad",
                got: grad.len(),
                expected: self.size(),
            });
        }
        if params.len() != self.size() {
            return Err(PipelineErr::ShapeMismatch {
                what: "params",
                got: params.len(),
                expected: self.size(),
            });
        }

        let d = self.embedding_dim;
        let table_len = self.user_table_len() + self.product_table_len();
        let dense_params = &params[table_len..];
        let (table_grad, dense_grad) = grad.split_at_mut(table_len);

        let mut delta = d_out;
        let mut offset = self.dense_len();
        for layer in self.dense.iter_mut().rev() {
            let size = layer.size();
            offset -= size;
            delta = layer.backward(
                &dense_params[offset..offset + size],
                &mut dense_grad[offset..offset + size],
                delta,
            );
        }

        // delta is now batch × 2d: the user half routes to the user table,
        // the product half to the product table.
        let (user_grad, product_grad) = table_grad.split_at_mut(self.user_table_len());
        for (row, (&user, &product)) in users.iter().zip(products).enumerate() {
            let delta_row = delta.row(row);

            let start = user as usize * d;
            for (g, &v) in user_grad[start..start + d].iter_mut().zip(delta_row.slice(s![..d])) {
                *g += v;
            }

            let start = product as usize * d;
            for (g, &v) in product_grad[start..start + d]
                .iter_mut()
                .zip(delta_row.slice(s![d..]))
            {
                *g += v;
            }
        }

        Ok(())
    }
}

/// One embedding vector out of a flat table, bounds-checked.
fn table_row<'a>(
    table: &'a [f32],
    index: u32,
    dim: usize,
    rows: usize,
    kind: &'static str,
) -> Result<&'a [f32]> {
    let row = index as usize;
    if row >= rows {
        return Err(PipelineErr::IndexOutOfRange {
            kind,
            got: index,
            bound: rows,
        });
    }
    Ok(&table[row * dim..(row + 1) * dim])
}
