// Exact O(n²) t-SNE, following van der Maaten & Hinton (2008).
// Works for any sample count >= 2, including inputs too small for Barnes-Hut.

use super::Tsne;
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

const ENTROPY_TOLERANCE: f64 = 1e-5;
const MAX_BISECTION_STEPS: usize = 50;
const EARLY_EXAGGERATION: f64 = 4.0;
const STOP_LYING_EPOCH: usize = 100;
const MOMENTUM_SWITCH_EPOCH: usize = 20;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MIN_GAIN: f64 = 0.01;
const MIN_PROBABILITY: f64 = 1e-12;
const INIT_SCALE: f64 = 1e-4;

pub(super) fn embed(x: ArrayView2<f64>, config: &Tsne) -> Array2<f64> {
    let n_obs = x.nrows();
    let out_dim = config.output_dim as usize;

    let distances = squared_distances(x);
    let mut p = joint_probabilities(&distances, config.perplexity);
    p.mapv_inplace(|v| (v * EARLY_EXAGGERATION).max(MIN_PROBABILITY));

    let mut y = initial_layout(n_obs, out_dim, config.random_seed);
    let mut update = Array2::<f64>::zeros((n_obs, out_dim));
    let mut gains = Array2::<f64>::ones((n_obs, out_dim));

    for epoch in 0..config.epochs {
        let num = student_t_kernel(y.view());
        let total = num.sum();
        let q = num.mapv(|v| (v / total).max(MIN_PROBABILITY));
        let grad = gradient(&p, &q, &num, y.view());

        let momentum = if epoch < MOMENTUM_SWITCH_EPOCH {
            INITIAL_MOMENTUM
        } else {
            FINAL_MOMENTUM
        };

        Zip::from(&mut gains)
            .and(&grad)
            .and(&update)
            .for_each(|gain, &dy, &iy| {
                *gain = if (dy > 0.0) != (iy > 0.0) {
                    *gain + 0.2
                } else {
                    *gain * 0.8
                };
                if *gain < MIN_GAIN {
                    *gain = MIN_GAIN;
                }
            });
        Zip::from(&mut update)
            .and(&gains)
            .and(&grad)
            .for_each(|iy, &gain, &dy| {
                *iy = momentum * *iy - config.learning_rate * gain * dy;
            });

        y += &update;
        if let Some(mean) = y.mean_axis(Axis(0)) {
            y -= &mean;
        }

        if (epoch + 1) % 100 == 0 {
            debug!(
                "t-SNE epoch {}: KL divergence {:.6}",
                epoch + 1,
                kl_divergence(&p, &q)
            );
        }
        if epoch == STOP_LYING_EPOCH {
            p.mapv_inplace(|v| v / EARLY_EXAGGERATION);
        }
    }

    y
}

fn squared_distances(x: ArrayView2<f64>) -> Array2<f64> {
    let n_obs = x.nrows();
    let mut distances = Array2::<f64>::zeros((n_obs, n_obs));
    Zip::indexed(distances.rows_mut()).par_for_each(|i, mut row| {
        let xi = x.row(i);
        for j in 0..n_obs {
            row[j] = xi
                .iter()
                .zip(x.row(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>();
        }
    });
    distances
}

/// Symmetrised, normalised input affinities.
fn joint_probabilities(distances: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n_obs = distances.nrows();
    let target_entropy = perplexity.ln();

    let mut conditional = Array2::<f64>::zeros((n_obs, n_obs));
    Zip::indexed(conditional.rows_mut()).par_for_each(|i, mut row| {
        row.assign(&conditional_row(distances.row(i), i, target_entropy));
    });

    let mut joint = &conditional + &conditional.t();
    let total = joint.sum();
    joint.mapv_inplace(|v| v / total);
    joint
}

/// Binary search on the Gaussian precision of row `i` until its entropy
/// matches `target_entropy`. With too few neighbours the target is
/// unreachable and the last candidate is kept.
fn conditional_row(distances: ArrayView1<f64>, i: usize, target_entropy: f64) -> Array1<f64> {
    let offset = distances
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(_, &d)| d)
        .fold(f64::INFINITY, f64::min);

    let mut beta: f64 = 1.0;
    let mut beta_min = f64::NEG_INFINITY;
    let mut beta_max = f64::INFINITY;
    let (mut entropy, mut row) = entropy_and_row(distances, i, beta, offset);

    for _ in 0..MAX_BISECTION_STEPS {
        let diff = entropy - target_entropy;
        if diff.abs() <= ENTROPY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_infinite() {
                beta * 2.0
            } else {
                (beta + beta_max) / 2.0
            };
        } else {
            beta_max = beta;
            beta = if beta_min.is_infinite() {
                beta / 2.0
            } else {
                (beta + beta_min) / 2.0
            };
        }
        (entropy, row) = entropy_and_row(distances, i, beta, offset);
    }

    row
}

// Distances are shifted by the nearest-neighbour distance so the largest
// kernel value is exp(0); entropy is invariant to the shift.
fn entropy_and_row(
    distances: ArrayView1<f64>,
    i: usize,
    beta: f64,
    offset: f64,
) -> (f64, Array1<f64>) {
    let mut row = Array1::<f64>::zeros(distances.len());
    let mut sum = 0.0f64;
    let mut weighted = 0.0f64;
    for (j, &d) in distances.iter().enumerate() {
        if j == i {
            continue;
        }
        let shifted = d - offset;
        let value = (-shifted * beta).exp();
        row[j] = value;
        sum += value;
        weighted += shifted * value;
    }

    let entropy = sum.ln() + beta * weighted / sum;
    row.mapv_inplace(|v| v / sum);
    (entropy, row)
}

/// Unnormalised Student-t similarities of the embedding, zero on the diagonal.
fn student_t_kernel(y: ArrayView2<f64>) -> Array2<f64> {
    let mut num = squared_distances(y);
    num.mapv_inplace(|d| 1.0 / (1.0 + d));
    num.diag_mut().fill(0.0);
    num
}

fn gradient(p: &Array2<f64>, q: &Array2<f64>, num: &Array2<f64>, y: ArrayView2<f64>) -> Array2<f64> {
    let n_obs = y.nrows();
    let mut grad = Array2::<f64>::zeros(y.raw_dim());
    Zip::indexed(grad.rows_mut()).par_for_each(|i, mut row| {
        let yi = y.row(i);
        for j in 0..n_obs {
            if j == i {
                continue;
            }
            let weight = (p[[i, j]] - q[[i, j]]) * num[[i, j]];
            let yj = y.row(j);
            for k in 0..row.len() {
                row[k] += weight * (yi[k] - yj[k]);
            }
        }
    });
    grad
}

fn kl_divergence(p: &Array2<f64>, q: &Array2<f64>) -> f64 {
    Zip::from(p)
        .and(q)
        .fold(0.0, |acc, &pv, &qv| acc + pv * (pv / qv).ln())
}

/// Small Gaussian starting positions, reproducible for a given seed.
fn initial_layout(n_obs: usize, out_dim: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::from_shape_fn((n_obs, out_dim), |_| {
        let z: f64 = StandardNormal.sample(&mut rng);
        INIT_SCALE * z
    })
}
