//! # t-SNE
//!
//! t-Distributed Stochastic Neighbor Embedding for visualising word
//! neighbourhoods in two dimensions.
//!
//! Two solvers are available. The exact solver is implemented here and
//! handles any input with at least two rows. The Barnes-Hut solver comes from
//! the `bhtsne` crate and needs `n - 1 >= 3 * perplexity` rows.

use crate::dimred::Reducer;
use crate::utils::ensure_finite;
use anyhow::bail;
use log::info;
use ndarray::{Array2, ArrayView2};

mod exact;

/// Solver selection for [`Tsne`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TsneMethod {
    /// Barnes-Hut when the input is large enough for it, exact otherwise.
    #[default]
    Auto,
    Exact,
    BarnesHut,
}

/// Configured t-SNE reducer.
///
/// Defaults reproduce the settings the plotting site has always used: two
/// output dimensions, perplexity 5.0 and a budget of 500 iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct Tsne {
    output_dim: u8,
    perplexity: f64,
    epochs: usize,
    theta: f64,
    learning_rate: f64,
    random_seed: u64,
    method: TsneMethod,
}

impl Default for Tsne {
    fn default() -> Self {
        TsneBuilder::new().build()
    }
}

impl Tsne {
    pub fn builder() -> TsneBuilder {
        TsneBuilder::new()
    }

    pub fn perplexity(&self) -> f64 {
        self.perplexity
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn method(&self) -> TsneMethod {
        self.method
    }

    /// Whether the Barnes-Hut solver accepts `n_obs` samples at the configured
    /// perplexity.
    pub fn barnes_hut_fits(&self, n_obs: usize) -> bool {
        n_obs > 0 && (n_obs - 1) as f64 >= 3.0 * self.perplexity
    }

    fn resolve_method(&self, n_obs: usize) -> anyhow::Result<TsneMethod> {
        match self.method {
            TsneMethod::Auto => {
                if cfg!(feature = "barnes-hut") && self.barnes_hut_fits(n_obs) {
                    Ok(TsneMethod::BarnesHut)
                } else {
                    Ok(TsneMethod::Exact)
                }
            }
            TsneMethod::BarnesHut => {
                if !self.barnes_hut_fits(n_obs) {
                    bail!(
                        "Barnes-Hut t-SNE needs at least {} samples for perplexity {}, got {}",
                        (3.0 * self.perplexity).ceil() as usize + 1,
                        self.perplexity,
                        n_obs
                    );
                }
                Ok(TsneMethod::BarnesHut)
            }
            TsneMethod::Exact => Ok(TsneMethod::Exact),
        }
    }

    #[cfg(feature = "barnes-hut")]
    fn run_barnes_hut(&self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        let n_obs = x.nrows();
        let n_dim = x.ncols();
        let x = x.as_standard_layout();
        let x_slice = x
            .as_slice()
            .ok_or_else(|| anyhow::anyhow!("Input matrix is not contiguous"))?;

        let x_chunked_slice: Vec<&[f64]> = x_slice.chunks(n_dim).collect();
        let tsne_result = bhtsne::tSNE::new(&x_chunked_slice)
            .embedding_dim(self.output_dim)
            .perplexity(self.perplexity)
            .epochs(self.epochs)
            .learning_rate(self.learning_rate)
            .barnes_hut(self.theta, |sample_a, sample_b| {
                sample_a
                    .iter()
                    .zip(sample_b.iter())
                    .map(|(&a, &b)| num_traits::Float::powi(a - b, 2))
                    .sum::<f64>()
                    .sqrt()
            })
            .embedding();

        let result = Array2::from_shape_vec((n_obs, self.output_dim as usize), tsne_result)?;
        Ok(result)
    }

    #[cfg(not(feature = "barnes-hut"))]
    fn run_barnes_hut(&self, _x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        bail!("Barnes-Hut t-SNE requires the `barnes-hut` feature")
    }
}

impl Reducer for Tsne {
    fn output_dim(&self) -> usize {
        self.output_dim as usize
    }

    fn reduce(&self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        let n_obs = x.nrows();
        let n_dim = x.ncols();

        if n_obs < 2 {
            bail!("t-SNE needs at least 2 samples, got {}", n_obs);
        }
        if n_dim == 0 {
            bail!("t-SNE input has no features");
        }
        if self.output_dim == 0 {
            bail!("t-SNE output dimension must be positive");
        }
        if !(self.perplexity > 0.0) {
            bail!("Perplexity must be positive, got {}", self.perplexity);
        }
        ensure_finite(x)?;
        ensure_distances_representable(x)?;

        let method = self.resolve_method(n_obs)?;
        let embedding = match method {
            TsneMethod::BarnesHut => self.run_barnes_hut(x)?,
            _ => exact::embed(x, self),
        };

        if embedding.dim() != (n_obs, self.output_dim as usize) {
            bail!(
                "t-SNE returned shape {:?}, expected ({}, {})",
                embedding.dim(),
                n_obs,
                self.output_dim
            );
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            bail!("t-SNE did not converge: embedding contains non-finite coordinates");
        }

        info!(
            "{}-d t-SNE embedding of {} samples finished ({:?}, {} epochs)",
            self.output_dim, n_obs, method, self.epochs
        );
        Ok(embedding)
    }
}

/// Pairwise squared distances must stay finite, otherwise affinities turn
/// into NaN.
fn ensure_distances_representable(x: ArrayView2<f64>) -> anyhow::Result<()> {
    let max_abs = x.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let span = 2.0 * max_abs;
    if !(span * span * x.ncols() as f64).is_finite() {
        bail!(
            "Input magnitude {:e} is too large for t-SNE: pairwise squared distances overflow f64",
            max_abs
        );
    }
    Ok(())
}

/// Builder for configuring and creating [`Tsne`] reducers.
///
/// # Example Usage
/// ```ignore
/// let tsne = TsneBuilder::new()
///     .perplexity(5.0)
///     .epochs(500)
///     .method(TsneMethod::Exact)
///     .build();
/// ```
pub struct TsneBuilder {
    output_dim: u8,
    perplexity: f64,
    epochs: usize,
    theta: f64,
    learning_rate: f64,
    random_seed: Option<u64>,
    method: TsneMethod,
}

impl Default for TsneBuilder {
    fn default() -> Self {
        Self {
            output_dim: 2,
            perplexity: 5.0,
            epochs: 500,
            theta: 0.5,
            learning_rate: 500.0,
            random_seed: Some(42),
            method: TsneMethod::default(),
        }
    }
}

impl TsneBuilder {
    /// Creates a new builder with default parameters.
    ///
    /// Default values:
    /// - `output_dim`: 2
    /// - `perplexity`: 5.0
    /// - `epochs`: 500
    /// - `theta`: 0.5
    /// - `learning_rate`: 500.0
    /// - `random_seed`: 42
    /// - `method`: Auto
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_dim(mut self, output_dim: u8) -> Self {
        self.output_dim = output_dim;
        self
    }

    /// Sets the effective number of neighbours each point tries to keep.
    pub fn perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Barnes-Hut accuracy trade-off. Ignored by the exact solver.
    pub fn theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// Gradient step size for both solvers.
    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn method(mut self, method: TsneMethod) -> Self {
        self.method = method;
        self
    }

    pub fn build(self) -> Tsne {
        Tsne {
            output_dim: self.output_dim,
            perplexity: self.perplexity,
            epochs: self.epochs,
            theta: self.theta,
            learning_rate: self.learning_rate,
            random_seed: self.random_seed.unwrap_or(42),
            method: self.method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn clustered_matrix(per_cluster: usize, n_dim: usize) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        let n_obs = per_cluster * 2;
        Array2::from_shape_fn((n_obs, n_dim), |(i, _)| {
            let centre = if i < per_cluster { -10.0 } else { 10.0 };
            centre + rng.random_range(-0.5..0.5)
        })
    }

    #[test]
    fn test_defaults() {
        let tsne = Tsne::default();
        assert_eq!(tsne.output_dim(), 2);
        assert_eq!(tsne.perplexity(), 5.0);
        assert_eq!(tsne.epochs(), 500);
        assert_eq!(tsne.method(), TsneMethod::Auto);
    }

    #[test]
    fn test_method_resolution() {
        let tsne = Tsne::default();
        assert_eq!(tsne.resolve_method(2).unwrap(), TsneMethod::Exact);
        assert!(!tsne.barnes_hut_fits(15));
        assert!(tsne.barnes_hut_fits(16));

        let forced = TsneBuilder::new().method(TsneMethod::BarnesHut).build();
        assert!(forced.resolve_method(4).is_err());
        assert_eq!(forced.resolve_method(50).unwrap(), TsneMethod::BarnesHut);
    }

    #[test]
    fn test_two_rows_reduce_to_two_points() {
        let x = array![[1.0, 0.0, 0.5], [0.0, 1.0, 0.25]];
        let y = Tsne::default().reduce(x.view()).unwrap();

        assert_eq!(y.dim(), (2, 2));
        assert!(y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_exact_is_deterministic_for_a_seed() {
        let x = clustered_matrix(4, 6);
        let tsne = TsneBuilder::new()
            .method(TsneMethod::Exact)
            .epochs(200)
            .random_seed(3)
            .build();

        let a = tsne.reduce(x.view()).unwrap();
        let b = tsne.reduce(x.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let tsne = Tsne::default();
        assert!(tsne.reduce(Array2::<f64>::zeros((1, 3)).view()).is_err());
        assert!(tsne.reduce(Array2::<f64>::zeros((3, 0)).view()).is_err());
        assert!(tsne
            .reduce(array![[1.0, f64::NAN], [0.0, 1.0]].view())
            .is_err());

        let flat = TsneBuilder::new().perplexity(0.0).build();
        assert!(flat.reduce(array![[1.0], [2.0]].view()).is_err());
    }

    #[test]
    fn test_overflowing_magnitude_is_reported_as_input_error() {
        let tsne = Tsne::default();
        let huge = array![[1e160, -1e160], [-1e160, 1e160]];

        let err = tsne.reduce(huge.view()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("too large"), "{}", message);
        assert!(!message.contains("did not converge"), "{}", message);

        let large = array![[1e150, 0.0], [0.0, 1e150]];
        assert!(ensure_distances_representable(large.view()).is_ok());
    }

    #[test]
    fn test_learning_rate_is_configurable() {
        assert_eq!(Tsne::default().learning_rate(), 500.0);
        let tsne = TsneBuilder::new().learning_rate(200.0).build();
        assert_eq!(tsne.learning_rate(), 200.0);
    }

    #[cfg(feature = "barnes-hut")]
    #[test]
    fn test_barnes_hut_shape() {
        let x = clustered_matrix(15, 8);
        let tsne = TsneBuilder::new()
            .method(TsneMethod::BarnesHut)
            .epochs(250)
            .build();

        let y = tsne.reduce(x.view()).unwrap();
        assert_eq!(y.dim(), (30, 2));
    }

    #[cfg(feature = "barnes-hut")]
    #[test]
    fn test_barnes_hut_honours_learning_rate() {
        fn spread(y: &Array2<f64>) -> f64 {
            y.iter().fold(0.0f64, |m, v| m.max(v.abs()))
        }

        let x = clustered_matrix(15, 8);
        let frozen = TsneBuilder::new()
            .method(TsneMethod::BarnesHut)
            .learning_rate(0.0)
            .epochs(250)
            .build();
        let moving = TsneBuilder::new()
            .method(TsneMethod::BarnesHut)
            .epochs(250)
            .build();

        let still = frozen.reduce(x.view()).unwrap();
        let moved = moving.reduce(x.view()).unwrap();

        // Without a step size the points never leave their tiny start positions.
        assert!(
            spread(&still) * 100.0 < spread(&moved),
            "learning rate 0 spread {} vs default spread {}",
            spread(&still),
            spread(&moved)
        );
    }
}
