//! Isolation forest over a single numeric column.
//!
//! Each tree isolates points by splitting a subsample at uniformly random
//! thresholds; values that are isolated after few splits score close to 1.
//! Trees are grown from a fixed seed so a column always yields the same ids.

use crate::profile::quantile;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

pub const DEFAULT_CONTAMINATION: f64 = 0.1;
pub const DEFAULT_SEED: u64 = 42;
/// Columns with fewer non-missing values never report outliers.
pub const MIN_VALUES: usize = 10;

const TREES: usize = 100;
const MAX_SAMPLES: usize = 256;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IsolationForestParams {
    /// Expected share of outliers; sets the score threshold.
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug)]
enum Node {
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl Node {
    fn grow(values: &mut [f64], depth: usize, limit: usize, rng: &mut StdRng) -> Node {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if depth >= limit || values.len() <= 1 || min >= max {
            return Node::Leaf { size: values.len() };
        }

        let threshold = rng.gen_range(min..max);
        let mut split = 0;
        for i in 0..values.len() {
            if values[i] < threshold {
                values.swap(i, split);
                split += 1;
            }
        }
        let (left, right) = values.split_at_mut(split);
        Node::Split {
            threshold,
            left: Box::new(Node::grow(left, depth + 1, limit, rng)),
            right: Box::new(Node::grow(right, depth + 1, limit, rng)),
        }
    }

    fn path_length(&self, value: f64) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    threshold,
                    left,
                    right,
                } => {
                    node = if value < *threshold { &**left } else { &**right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful binary search tree lookup over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Anomaly score in `(0, 1]` for every value, in input order.
pub fn anomaly_scores(values: &[f64], seed: u64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let sample_size = values.len().min(MAX_SAMPLES);
    let height_limit = (sample_size as f64).log2().ceil() as usize;

    let trees: Vec<Node> = (0..TREES)
        .map(|_| {
            let mut sample: Vec<f64> = index::sample(&mut rng, values.len(), sample_size)
                .into_iter()
                .map(|i| values[i])
                .collect();
            Node::grow(&mut sample, 0, height_limit, &mut rng)
        })
        .collect();

    let normalizer = average_path_length(sample_size).max(f64::MIN_POSITIVE);
    values
        .iter()
        .map(|&v| {
            let mean_depth =
                trees.iter().map(|t| t.path_length(v)).sum::<f64>() / trees.len() as f64;
            2f64.powf(-mean_depth / normalizer)
        })
        .collect()
}

/// Flags for the values whose score lies strictly above the `1 - contamination`
/// quantile of all scores.
pub fn isolation_outliers(values: &[f64], params: IsolationForestParams) -> Vec<bool> {
    if values.len() < MIN_VALUES {
        return vec![false; values.len()];
    }
    let scores = anomaly_scores(values, params.seed);
    let Some(threshold) = quantile(&scores, 1.0 - params.contamination) else {
        return vec![false; values.len()];
    };
    log::debug!("isolation forest threshold {threshold:.4} over {} values", values.len());
    scores.into_iter().map(|s| s > threshold).collect()
}
