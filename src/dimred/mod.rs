//! # Dimensionality Reduction
//!
//! Maps high-dimensional word embeddings onto a low-dimensional plane for
//! plotting. Reduction sits behind the [`Reducer`] trait so plotters can be
//! driven by any projection that keeps row order.
//!
//! ## Currently Available
//! - **t-SNE** ([`tsne`]): t-Distributed Stochastic Neighbor Embedding, exact
//!   for small inputs and Barnes-Hut (via `bhtsne`) for larger ones

use ndarray::{Array2, ArrayView2};

pub mod tsne;

pub use tsne::{Tsne, TsneBuilder, TsneMethod};

/// A projection of `n × d` samples onto `n × k` coordinates.
///
/// Implementations must return exactly one output row per input row, in input
/// order.
pub trait Reducer {
    fn output_dim(&self) -> usize;

    fn reduce(&self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>>;
}
